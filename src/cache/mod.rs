//! Local Cache Layer
//!
//! Bounded in-memory storage for one cache space. Three pieces:
//!
//! - **`byteview`**: the immutable value snapshot handed out to callers.
//! - **`lru`**: a byte-accounted LRU map with an eviction callback.
//! - **`concurrent`**: the mutex wrapper that makes the LRU safe to share,
//!   allocating it lazily so empty groups cost nothing.

pub mod byteview;
pub mod concurrent;
pub mod lru;
