use parking_lot::Mutex;

use super::byteview::ByteView;
use super::lru::{EvictionCallback, LruCache};

/// An [`LruCache`] behind a mutex.
///
/// A plain mutex rather than a read-write lock: every lookup promotes the
/// entry, so reads mutate the ordering too. The LRU itself is built on the
/// first insert, so a group that never stores anything never allocates.
pub struct ConcurrentCache {
    max_bytes: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    lru: Option<LruCache>,
    // Held here until the LRU exists, then moved into it.
    on_evicted: Option<EvictionCallback>,
}

impl ConcurrentCache {
    pub fn new(max_bytes: usize) -> Self {
        Self::with_callback(max_bytes, None)
    }

    pub fn with_callback(max_bytes: usize, on_evicted: Option<EvictionCallback>) -> Self {
        Self {
            max_bytes,
            inner: Mutex::new(Inner {
                lru: None,
                on_evicted,
            }),
        }
    }

    pub fn add(&self, key: &str, value: ByteView) {
        let mut inner = self.inner.lock();
        let Inner { lru, on_evicted } = &mut *inner;
        let lru =
            lru.get_or_insert_with(|| LruCache::with_callback(self.max_bytes, on_evicted.take()));
        lru.add(key, value);
    }

    pub fn get(&self, key: &str) -> Option<ByteView> {
        self.inner.lock().lru.as_mut()?.get(key)
    }

    pub fn delete(&self, key: &str) -> bool {
        match self.inner.lock().lru.as_mut() {
            Some(lru) => lru.delete(key),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.as_ref().map_or(0, LruCache::len)
    }

    pub fn used_bytes(&self) -> usize {
        self.inner
            .lock()
            .lru
            .as_ref()
            .map_or(0, LruCache::used_bytes)
    }
}
