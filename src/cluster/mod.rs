//! Cluster Layer
//!
//! Everything that maps keys to peers and moves cache traffic between them:
//!
//! - **`ring`**: the consistent-hash ring with virtual nodes.
//! - **`picker`**: owns the ring plus one RPC client per live peer, kept in
//!   step with the registry by a background agent.
//! - **`client`**: the HTTP client bound to a single peer.
//! - **`protocol`** / **`handlers`** / **`server`**: the peer-facing HTTP
//!   surface.

pub mod client;
pub mod handlers;
pub mod picker;
pub mod protocol;
pub mod ring;
pub mod server;

#[cfg(test)]
mod tests;

use crate::error::CacheError;

/// Checks a `host:port` peer address: non-empty host, a colon, and a port
/// in [1, 65535].
pub fn validate_peer_addr(addr: &str) -> Result<(), CacheError> {
    let invalid = || CacheError::InvalidArgument(format!("invalid peer address: {:?}", addr));
    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() {
        return Err(invalid());
    }
    match port.parse::<u32>() {
        Ok(p) if (1..=65535).contains(&p) => Ok(()),
        _ => Err(invalid()),
    }
}
