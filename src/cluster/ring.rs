//! Consistent-Hash Ring
//!
//! Maps keys to peer addresses with virtual nodes so that membership changes
//! only move the keys owned by the peer that joined or left.
//!
//! ## Mechanism
//! Each address is hashed `replicas` times (`hash("{i}{addr}")`) onto a
//! `u32` circle. A key is owned by the address at the first position at or
//! after the key's own hash, wrapping at the top of the circle.

use std::collections::HashMap;

/// Hash function over raw bytes. The default is CRC32/IEEE.
pub type HashFn = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

pub const DEFAULT_REPLICAS: usize = 50;

pub struct HashRing {
    replicas: usize,
    hash: HashFn,
    /// Virtual-node positions, kept sorted after every mutation.
    positions: Vec<u32>,
    /// Position -> owning address. On the rare collision the later-added
    /// address wins the slot.
    owners: HashMap<u32, String>,
}

impl HashRing {
    pub fn new() -> Self {
        Self::with_replicas(DEFAULT_REPLICAS)
    }

    pub fn with_replicas(replicas: usize) -> Self {
        Self::with_hasher(replicas, Box::new(|data| crc32fast::hash(data)))
    }

    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        Self {
            replicas: replicas.max(1),
            hash,
            positions: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Inserts an address at `replicas` positions. Re-adding a present
    /// address duplicates its positions; callers guard against that.
    pub fn add(&mut self, addr: &str) {
        for i in 0..self.replicas {
            let position = (self.hash)(format!("{}{}", i, addr).as_bytes());
            self.positions.push(position);
            self.owners.insert(position, addr.to_string());
        }
        self.positions.sort_unstable();
    }

    /// Drops every position owned by `addr`. Unknown addresses are a no-op.
    pub fn remove(&mut self, addr: &str) {
        let owners = &mut self.owners;
        self.positions
            .retain(|position| owners.get(position).map(String::as_str) != Some(addr));
        owners.retain(|_, owner| owner != addr);
    }

    /// The address owning `key`, or None on an empty ring.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.positions.is_empty() {
            return None;
        }
        let h = (self.hash)(key.as_bytes());
        let idx = self.positions.partition_point(|&position| position < h);
        let position = if idx == self.positions.len() {
            self.positions[0]
        } else {
            self.positions[idx]
        };
        self.owners.get(&position).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn positions(&self) -> &[u32] {
        &self.positions
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}
