//! Peer Wire Protocol
//!
//! The HTTP surface peers speak to each other. Cache values travel as raw
//! response bodies so they stay opaque bytes; only the small acknowledgment
//! payloads are JSON.

use serde::{Deserialize, Serialize};

/// Route prefix for the peer cache service. Group name is the trailing path
/// segment; the key rides in the query string so arbitrary keys survive
/// URL rules.
pub const ENDPOINT_CACHE: &str = "/_cache";

/// Query parameters shared by the get and delete operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyParams {
    pub key: String,
}

/// Acknowledgment for a delete: whether the owning peer had the key.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub value: bool,
}
