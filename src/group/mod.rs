//! Named Cache Spaces
//!
//! A `Group` ties together everything one cache space needs: the
//! user-supplied loader that fills misses, the byte-bounded local caches, the
//! single-flight coordinator that collapses duplicate loads, and a reference
//! to the peer picker that decides which node owns a key.
//!
//! ## Read path
//! `get` serves from the main cache, then the hot cache, then goes through
//! single-flight: the owner peer is asked over RPC if the key belongs
//! elsewhere, otherwise the loader runs locally and the result is cached.
//!
//! ## Registration
//! Groups live in a `Groups` collection keyed by name; a name can be
//! registered at most once. The process-wide default collection is what the
//! server handlers and the free functions use.

pub mod singleflight;


use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use rand::Rng;

use crate::cache::byteview::ByteView;
use crate::cache::concurrent::ConcurrentCache;
use crate::cache::lru::EvictionCallback;
use crate::cluster::client::PeerClient;
use crate::cluster::picker::ClientPicker;
use crate::error::CacheError;
use singleflight::SingleFlight;

/// Turns a key into the bytes to cache when this peer owns the key and the
/// cache misses.
pub type LoaderFn =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>> + Send + Sync>;

/// Tuning knobs for a group beyond its name and loader.
#[derive(Default)]
pub struct GroupOptions {
    /// Byte budget of the main cache. 0 disables the bound.
    pub cache_bytes: usize,
    /// Invoked for every entry leaving the main cache.
    pub on_evicted: Option<EvictionCallback>,
}

/// One named cache space.
pub struct Group {
    // `LoaderFn` wraps a closure and isn't `Debug`, so `Group` gets a manual
    // impl below that just prints the name.
    name: String,
    loader: LoaderFn,
    main_cache: ConcurrentCache,
    // Holds a slice of remote-fetched values so repeat reads of another
    // peer's hot keys skip the network. Budgeted at 1/8 of the main cache.
    hot_cache: ConcurrentCache,
    flight: SingleFlight,
    picker: RwLock<Option<Arc<ClientPicker>>>,
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group").field("name", &self.name).finish()
    }
}

impl Group {
    fn new(name: &str, options: GroupOptions, loader: LoaderFn) -> Self {
        Self {
            name: name.to_string(),
            loader,
            main_cache: ConcurrentCache::with_callback(options.cache_bytes, options.on_evicted),
            hot_cache: ConcurrentCache::new(options.cache_bytes / 8),
            flight: SingleFlight::new(),
            picker: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wires the group to a picker so foreign keys are forwarded to their
    /// owner instead of loaded locally.
    pub fn register_picker(&self, picker: Arc<ClientPicker>) {
        *self.picker.write() = Some(picker);
    }

    /// Returns the value for `key`, loading or fetching it on a miss.
    pub async fn get(&self, key: &str) -> Result<ByteView, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("key must not be empty".into()));
        }
        if let Some(view) = self.main_cache.get(key) {
            tracing::debug!(group = %self.name, key, "cache hit");
            return Ok(view);
        }
        if let Some(view) = self.hot_cache.get(key) {
            tracing::debug!(group = %self.name, key, "hot cache hit");
            return Ok(view);
        }
        self.load(key).await
    }

    /// Removes `key`, forwarding to the owning peer when it is remote. The
    /// returned bool reports whether the owner had the key; local copies are
    /// purged best-effort either way.
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("key must not be empty".into()));
        }
        if let Some(peer) = self.pick_remote(key) {
            tracing::debug!(group = %self.name, key, peer = peer.addr(), "forwarding delete");
            let removed = peer.delete(&self.name, key).await?;
            self.main_cache.delete(key);
            self.hot_cache.delete(key);
            return Ok(removed);
        }
        let in_main = self.main_cache.delete(key);
        let in_hot = self.hot_cache.delete(key);
        Ok(in_main || in_hot)
    }

    /// Bytes currently accounted in the main cache.
    pub fn used_bytes(&self) -> usize {
        self.main_cache.used_bytes()
    }

    async fn load(&self, key: &str) -> Result<ByteView, CacheError> {
        let (result, shared) = self.flight.run(key, || self.load_once(key)).await;
        if shared {
            tracing::debug!(group = %self.name, key, "joined in-flight load");
        }
        result
    }

    async fn load_once(&self, key: &str) -> Result<ByteView, CacheError> {
        if let Some(peer) = self.pick_remote(key) {
            tracing::debug!(group = %self.name, key, peer = peer.addr(), "fetching from owner");
            let bytes = peer.get(&self.name, key).await?;
            let view = ByteView::new(bytes);
            if rand::thread_rng().gen_range(0..10) == 0 {
                self.hot_cache.add(key, view.clone());
            }
            return Ok(view);
        }
        self.load_local(key).await
    }

    async fn load_local(&self, key: &str) -> Result<ByteView, CacheError> {
        let loaded = (self.loader)(key.to_string())
            .await
            .map_err(|e| CacheError::Upstream {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(group = %self.name, key, bytes = loaded.len(), "loaded from source");
        let view = ByteView::new(loaded);
        self.main_cache.add(key, view.clone());
        Ok(view)
    }

    /// The owner's client, or None when the key is ours (or no picker is
    /// wired up yet) and must be loaded locally.
    fn pick_remote(&self, key: &str) -> Option<Arc<PeerClient>> {
        let picker = self.picker.read().clone()?;
        match picker.pick_peer(key) {
            Some((client, is_self)) if !is_self => Some(client),
            _ => None,
        }
    }
}

/// A collection of groups keyed by name.
///
/// Usually accessed through the process-wide default (see [`new_group`] and
/// [`get_group`]), but instantiable so several nodes can coexist in one
/// process without sharing caches.
pub struct Groups {
    groups: DashMap<String, Arc<Group>>,
}

impl Groups {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            groups: DashMap::new(),
        })
    }

    /// Registers a new group. Fails if the name is empty or already taken.
    pub fn create<F, Fut>(
        &self,
        name: &str,
        cache_bytes: usize,
        loader: F,
    ) -> Result<Arc<Group>, CacheError>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
    {
        self.create_with(
            name,
            GroupOptions {
                cache_bytes,
                on_evicted: None,
            },
            loader,
        )
    }

    pub fn create_with<F, Fut>(
        &self,
        name: &str,
        options: GroupOptions,
        loader: F,
    ) -> Result<Arc<Group>, CacheError>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
    {
        if name.is_empty() {
            return Err(CacheError::InvalidArgument(
                "group name must not be empty".into(),
            ));
        }
        let loader: LoaderFn = Arc::new(move |key: String| {
            Box::pin(loader(key)) as Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>>
        });
        match self.groups.entry(name.to_string()) {
            Entry::Occupied(_) => Err(CacheError::InvalidArgument(format!(
                "group already registered: {}",
                name
            ))),
            Entry::Vacant(slot) => {
                let group = Arc::new(Group::new(name, options, loader));
                slot.insert(group.clone());
                tracing::info!(group = name, "registered cache group");
                Ok(group)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.get(name).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

static DEFAULT_GROUPS: LazyLock<Arc<Groups>> = LazyLock::new(Groups::new);

/// The process-wide group collection.
pub fn default_groups() -> Arc<Groups> {
    DEFAULT_GROUPS.clone()
}

/// Registers a group in the process-wide collection.
pub fn new_group<F, Fut>(name: &str, cache_bytes: usize, loader: F) -> Result<Arc<Group>, CacheError>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
{
    DEFAULT_GROUPS.create(name, cache_bytes, loader)
}

/// Looks up a group in the process-wide collection.
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    DEFAULT_GROUPS.get(name)
}
