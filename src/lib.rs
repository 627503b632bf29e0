//! Sharded Read-Through Cache Cluster
//!
//! A set of peer processes that together form a read-mostly key/value cache
//! in front of a slow backing store. Each peer owns a deterministic slice of
//! the keyspace via consistent hashing over the live peer set: owned keys
//! are served from memory or populated through a user-supplied loader,
//! foreign keys are forwarded to their owner over HTTP.
//!
//! ## Architecture Modules
//! - **`cache`**: the local storage layer: immutable `ByteView` snapshots,
//!   a byte-accounted LRU, and its lazily-allocated concurrent wrapper.
//! - **`group`**: named cache spaces tying a loader, the local caches, and
//!   the single-flight coordinator together.
//! - **`cluster`**: the consistent-hash ring, the peer picker with one RPC
//!   client per live peer, and the peer-facing HTTP server.
//! - **`registry`**: the discovery plane, defined as a leased, watchable
//!   key-value contract, plus the in-process implementation and the agent
//!   that keeps a picker in step with it.

pub mod cache;
pub mod cluster;
pub mod error;
pub mod group;
pub mod registry;

pub use cache::byteview::ByteView;
pub use cluster::picker::{ClientPicker, PickerConfig};
pub use cluster::server::Server;
pub use error::CacheError;
pub use group::{Group, GroupOptions, Groups, default_groups, get_group, new_group};
pub use registry::{MemoryRegistry, Registry};
