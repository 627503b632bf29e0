use thiserror::Error;

/// Error type shared across the cache core.
///
/// Variants are cloneable so that the result of a single coalesced load can
/// be handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Empty key, empty group name, or a malformed peer address.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No group registered under this name.
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// The user-supplied loader failed; the message is the loader's own.
    #[error("load failed for key {key}: {reason}")]
    Upstream { key: String, reason: String },

    /// A remote peer call failed. The caller never falls back to a local
    /// load on this variant, since that would duplicate ownership of the
    /// key and amplify load on the backing store.
    #[error("peer {addr}: {reason}")]
    Peer { addr: String, reason: String },

    /// Discovery or lease failure. Logged by the picker, which keeps
    /// serving with last-known membership.
    #[error("registry: {0}")]
    Registry(String),
}
