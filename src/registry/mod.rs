//! Service Registry
//!
//! Discovery for the cluster. Peers announce themselves under
//! `"{service}/{host}:{port}"` with a leased registration that vanishes when
//! the owner stops heartbeating, and watch the same prefix to learn about
//! everyone else.
//!
//! The [`Registry`] trait is the contract the picker's agent runs against;
//! [`memory::MemoryRegistry`] is the in-process implementation used by
//! single-process clusters and tests.

pub mod agent;
pub mod memory;
pub mod types;

#[cfg(test)]
mod tests;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryRegistry;
pub use types::{LeaseId, RegistryEvent, RegistryWatch};

/// A watchable ordered key-value store with leases.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Stores `key = value` bound to a fresh lease with the given TTL. The
    /// key disappears (with a delete event) when the lease expires.
    async fn put_with_lease(&self, key: &str, value: &str, ttl: Duration) -> Result<LeaseId>;

    /// Refreshes a lease back to its full TTL. Fails once the lease has
    /// expired or been revoked.
    async fn keep_alive(&self, lease: &LeaseId) -> Result<()>;

    /// Drops a lease and deletes every key bound to it.
    async fn revoke(&self, lease: &LeaseId) -> Result<()>;

    /// Current `(key, value)` pairs under the prefix.
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>>;

    /// Subscribes to put/delete events under the prefix. Subscribe before
    /// reading a snapshot so nothing changing in between is lost.
    async fn watch_prefix(&self, prefix: &str) -> Result<RegistryWatch>;
}
