use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;

use super::types::{LeaseId, RegistryEvent, RegistryWatch};
use super::Registry;

const SWEEP_INTERVAL: Duration = Duration::from_millis(100);
const EVENT_CAPACITY: usize = 256;

/// In-process registry with leases and watchable prefixes.
///
/// Honors the same contract an external registry service would: leased keys
/// disappear once their owner stops heartbeating, and watchers see every
/// put and delete. One instance shared across nodes gives a single process
/// a complete discovery plane, which is how the cluster tests and the demo
/// binary run.
pub struct MemoryRegistry {
    entries: DashMap<String, Entry>,
    leases: DashMap<LeaseId, LeaseState>,
    events: broadcast::Sender<RegistryEvent>,
}

struct Entry {
    value: String,
    lease: LeaseId,
}

struct LeaseState {
    ttl: Duration,
    expires_at: Instant,
}

impl MemoryRegistry {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let registry = Arc::new(Self {
            entries: DashMap::new(),
            leases: DashMap::new(),
            events,
        });

        // The sweeper holds only a weak handle, so dropping the last real
        // reference shuts it down.
        let weak = Arc::downgrade(&registry);
        tokio::spawn(sweep_loop(weak));

        registry
    }

    /// Expires overdue leases and deletes their keys.
    fn sweep(&self) {
        let now = Instant::now();
        let expired: Vec<LeaseId> = self
            .leases
            .iter()
            .filter(|entry| entry.value().expires_at <= now)
            .map(|entry| entry.key().clone())
            .collect();

        for lease in expired {
            tracing::debug!(lease = %lease.0, "lease expired");
            self.drop_lease(&lease);
        }
    }

    fn drop_lease(&self, lease: &LeaseId) {
        self.leases.remove(lease);
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| &entry.value().lease == lease)
            .map(|entry| entry.key().clone())
            .collect();
        for key in keys {
            self.entries.remove(&key);
            let _ = self.events.send(RegistryEvent::Delete { key });
        }
    }
}

async fn sweep_loop(registry: Weak<MemoryRegistry>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let Some(registry) = registry.upgrade() else {
            return;
        };
        registry.sweep();
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn put_with_lease(&self, key: &str, value: &str, ttl: Duration) -> Result<LeaseId> {
        let lease = LeaseId::new();
        self.leases.insert(
            lease.clone(),
            LeaseState {
                ttl,
                expires_at: Instant::now() + ttl,
            },
        );
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                lease: lease.clone(),
            },
        );
        let _ = self.events.send(RegistryEvent::Put {
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(lease)
    }

    async fn keep_alive(&self, lease: &LeaseId) -> Result<()> {
        match self.leases.get_mut(lease) {
            Some(mut state) => {
                let ttl = state.ttl;
                state.expires_at = Instant::now() + ttl;
                Ok(())
            }
            None => Err(anyhow::anyhow!("lease {} is gone", lease.0)),
        }
    }

    async fn revoke(&self, lease: &LeaseId) -> Result<()> {
        self.drop_lease(lease);
        Ok(())
    }

    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let mut pairs: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect();
        pairs.sort();
        Ok(pairs)
    }

    async fn watch_prefix(&self, prefix: &str) -> Result<RegistryWatch> {
        Ok(RegistryWatch::new(prefix, self.events.subscribe()))
    }
}
