use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::client::PeerClient;
use super::ring::{DEFAULT_REPLICAS, HashFn, HashRing};
use super::validate_peer_addr;
use crate::error::CacheError;
use crate::registry::{Registry, agent};

pub const DEFAULT_SERVICE_NAME: &str = "shardcache";
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(5);
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Tuning knobs for a picker.
pub struct PickerConfig {
    /// Registry key prefix this cluster registers and discovers under.
    pub service_name: String,
    /// Virtual nodes per peer on the ring.
    pub replicas: usize,
    /// Ring hash override; CRC32/IEEE when None.
    pub hash: Option<HashFn>,
    /// Registration lease TTL; heartbeats run at half of it.
    pub lease_ttl: Duration,
    /// How often the agent reconciles against a fresh registry snapshot.
    pub resync_interval: Duration,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            replicas: DEFAULT_REPLICAS,
            hash: None,
            lease_ttl: DEFAULT_LEASE_TTL,
            resync_interval: DEFAULT_RESYNC_INTERVAL,
        }
    }
}

/// Selects the owner peer for a key and keeps one RPC client per live peer.
///
/// The ring and the client map sit under one lock and are always mutated
/// together: every address on the ring has a client and vice versa. The
/// only writer is the registry agent; readers are `pick_peer` callers.
pub struct ClientPicker {
    self_addr: String,
    service_name: String,
    lease_ttl: Duration,
    resync_interval: Duration,
    state: RwLock<PickerState>,
    registry: Arc<dyn Registry>,
    shutdown: watch::Sender<bool>,
}

struct PickerState {
    ring: HashRing,
    clients: HashMap<String, Arc<PeerClient>>,
}

impl ClientPicker {
    /// Creates a picker that knows only itself, then spawns the registry
    /// agent to register this node and track the rest of the cluster.
    pub async fn start(
        self_addr: &str,
        registry: Arc<dyn Registry>,
        config: PickerConfig,
    ) -> Result<Arc<Self>, CacheError> {
        validate_peer_addr(self_addr)?;

        let ring = match config.hash {
            Some(hash) => HashRing::with_hasher(config.replicas, hash),
            None => HashRing::with_replicas(config.replicas),
        };
        let (shutdown, _) = watch::channel(false);
        let picker = Arc::new(Self {
            self_addr: self_addr.to_string(),
            service_name: config.service_name,
            lease_ttl: config.lease_ttl,
            resync_interval: config.resync_interval,
            state: RwLock::new(PickerState {
                ring,
                clients: HashMap::new(),
            }),
            registry,
            shutdown,
        });

        picker.set(self_addr);
        agent::spawn(picker.clone());

        Ok(picker)
    }

    /// The owner of `key`: its client plus whether the owner is this node.
    /// None only while the ring is empty.
    pub fn pick_peer(&self, key: &str) -> Option<(Arc<PeerClient>, bool)> {
        let state = self.state.read();
        let addr = state.ring.get(key)?;
        let client = state.clients.get(addr)?.clone();
        let is_self = addr == self.self_addr;
        Some((client, is_self))
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn lease_ttl(&self) -> Duration {
        self.lease_ttl
    }

    pub fn resync_interval(&self) -> Duration {
        self.resync_interval
    }

    /// Addresses currently on the ring, including this node.
    pub fn peers(&self) -> Vec<String> {
        self.state.read().clients.keys().cloned().collect()
    }

    /// Signals the agent tasks to revoke the registration and exit.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    pub(crate) fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    pub(crate) fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub(crate) fn known(&self, addr: &str) -> bool {
        self.state.read().clients.contains_key(addr)
    }

    /// Adds a peer to the ring and the client map. Idempotent.
    pub(crate) fn set(&self, addr: &str) {
        let mut state = self.state.write();
        if state.clients.contains_key(addr) {
            return;
        }
        state.ring.add(addr);
        state
            .clients
            .insert(addr.to_string(), Arc::new(PeerClient::new(addr)));
        tracing::info!(self_addr = %self.self_addr, peer = addr, "peer added");
    }

    /// Drops a peer from the ring and the client map.
    pub(crate) fn remove(&self, addr: &str) {
        let mut state = self.state.write();
        if state.clients.remove(addr).is_none() {
            return;
        }
        state.ring.remove(addr);
        tracing::info!(self_addr = %self.self_addr, peer = addr, "peer removed");
    }
}
