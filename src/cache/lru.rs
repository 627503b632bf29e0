use hashlink::LinkedHashMap;

use super::byteview::ByteView;

/// Invoked with the key and value of every entry that leaves the cache,
/// whether evicted by the byte budget or removed explicitly.
pub type EvictionCallback = Box<dyn FnMut(&str, &ByteView) + Send>;

/// Byte-accounted LRU map.
///
/// Every entry is charged `key.len() + value.len()` bytes. When
/// `max_bytes > 0`, an insert that pushes the accounting over the budget
/// evicts from the least-recently-used end until it fits again; an entry
/// larger than the whole budget is admitted and then evicts itself.
/// `max_bytes == 0` disables the bound.
///
/// The backing `LinkedHashMap` keeps insertion order, so the front is the
/// LRU end and the back the MRU end; lookups re-insert to promote.
pub struct LruCache {
    max_bytes: usize,
    used_bytes: usize,
    entries: LinkedHashMap<String, ByteView>,
    on_evicted: Option<EvictionCallback>,
}

impl LruCache {
    pub fn new(max_bytes: usize) -> Self {
        Self::with_callback(max_bytes, None)
    }

    pub fn with_callback(max_bytes: usize, on_evicted: Option<EvictionCallback>) -> Self {
        Self {
            max_bytes,
            used_bytes: 0,
            entries: LinkedHashMap::new(),
            on_evicted,
        }
    }

    /// Looks up a key and promotes it to the MRU end.
    pub fn get(&mut self, key: &str) -> Option<ByteView> {
        let (key, value) = self.entries.remove_entry(key)?;
        let view = value.clone();
        self.entries.insert(key, value);
        Some(view)
    }

    /// Inserts or updates an entry at the MRU end, then evicts until the
    /// byte budget holds.
    pub fn add(&mut self, key: &str, value: ByteView) {
        if let Some(old) = self.entries.remove(key) {
            self.used_bytes -= key.len() + old.len();
        }
        self.used_bytes += key.len() + value.len();
        self.entries.insert(key.to_string(), value);

        while self.max_bytes > 0 && self.used_bytes > self.max_bytes {
            if !self.evict_oldest() {
                break;
            }
        }
    }

    /// Removes an entry, reporting whether it was present. The eviction
    /// callback fires for explicit removals too.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.entries.remove_entry(key) {
            Some((key, value)) => {
                self.used_bytes -= key.len() + value.len();
                if let Some(callback) = self.on_evicted.as_mut() {
                    callback(&key, &value);
                }
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn evict_oldest(&mut self) -> bool {
        match self.entries.pop_front() {
            Some((key, value)) => {
                self.used_bytes -= key.len() + value.len();
                if let Some(callback) = self.on_evicted.as_mut() {
                    callback(&key, &value);
                }
                true
            }
            None => false,
        }
    }
}
