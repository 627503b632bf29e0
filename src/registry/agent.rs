//! Registry Agent
//!
//! Two background tasks per picker keep the cluster view honest:
//!
//! - **Registration** announces this node under a leased key and heartbeats
//!   the lease; losing the heartbeat lets the registry expire the node for
//!   everyone else. Shutdown revokes the lease immediately.
//! - **Discovery** watches the service prefix and applies peer joins and
//!   departures to the picker. The watch opens before the initial snapshot
//!   is read, so no change slips between the two; a periodic reconcile
//!   against a fresh snapshot bounds any divergence from a lagged stream.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::cluster::picker::ClientPicker;
use super::types::RegistryEvent;

const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(3);
const WATCH_RETRY_DELAY: Duration = Duration::from_secs(1);

pub(crate) fn spawn(picker: Arc<ClientPicker>) {
    tokio::spawn(register_loop(picker.clone()));
    tokio::spawn(discover_loop(picker));
}

/// Puts this node's key under a lease and keeps the lease alive until
/// shutdown or heartbeat failure.
async fn register_loop(picker: Arc<ClientPicker>) {
    let key = registration_key(&picker);
    let ttl = picker.lease_ttl();

    let lease = match picker
        .registry()
        .put_with_lease(&key, picker.self_addr(), ttl)
        .await
    {
        Ok(lease) => lease,
        Err(e) => {
            tracing::error!(key = %key, "registration failed: {}", e);
            return;
        }
    };
    tracing::info!(key = %key, "registered with the cluster registry");

    let mut shutdown = picker.subscribe_shutdown();
    let mut heartbeat = tokio::time::interval(ttl / 2);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if let Err(e) = picker.registry().keep_alive(&lease).await {
                    tracing::error!(key = %key, "lease heartbeat failed: {}", e);
                    return;
                }
            }
            _ = shutdown.changed() => {
                if let Err(e) = picker.registry().revoke(&lease).await {
                    tracing::warn!(key = %key, "lease revoke failed: {}", e);
                } else {
                    tracing::info!(key = %key, "revoked registration");
                }
                return;
            }
        }
    }
}

/// Tracks peer membership: watch first, seed from a snapshot, then apply
/// events and periodically reconcile.
async fn discover_loop(picker: Arc<ClientPicker>) {
    let prefix = service_prefix(&picker);

    let mut watch = match picker.registry().watch_prefix(&prefix).await {
        Ok(watch) => watch,
        Err(e) => {
            tracing::error!(prefix = %prefix, "cannot watch registry: {}", e);
            return;
        }
    };

    if let Err(e) = resync(&picker, &prefix).await {
        tracing::warn!(prefix = %prefix, "initial peer sync failed: {}", e);
    }

    let mut shutdown = picker.subscribe_shutdown();
    let mut reconcile = tokio::time::interval(picker.resync_interval());
    reconcile.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!(prefix = %prefix, "discovery stopped");
                return;
            }
            event = watch.next() => match event {
                Some(event) => apply_event(&picker, &prefix, event),
                None => {
                    // The stream closed under us; reopen it and resync to
                    // cover the gap.
                    tracing::warn!(prefix = %prefix, "registry watch closed, reopening");
                    tokio::time::sleep(WATCH_RETRY_DELAY).await;
                    match picker.registry().watch_prefix(&prefix).await {
                        Ok(reopened) => {
                            watch = reopened;
                            if let Err(e) = resync(&picker, &prefix).await {
                                tracing::warn!(prefix = %prefix, "post-reopen sync failed: {}", e);
                            }
                        }
                        Err(e) => tracing::error!(prefix = %prefix, "cannot reopen watch: {}", e),
                    }
                }
            },
            _ = reconcile.tick() => {
                if let Err(e) = resync(&picker, &prefix).await {
                    tracing::warn!(prefix = %prefix, "periodic peer sync failed: {}", e);
                }
            }
        }
    }
}

fn apply_event(picker: &ClientPicker, prefix: &str, event: RegistryEvent) {
    match event {
        RegistryEvent::Put { key, .. } => {
            let Some(addr) = trailing_addr(prefix, &key) else {
                return;
            };
            if addr != picker.self_addr() && !picker.known(addr) {
                picker.set(addr);
            }
        }
        RegistryEvent::Delete { key } => {
            let Some(addr) = trailing_addr(prefix, &key) else {
                return;
            };
            if addr != picker.self_addr() && picker.known(addr) {
                picker.remove(addr);
            }
        }
    }
}

/// Reconciles the picker's client map against a registry snapshot: adds
/// whoever is missing, drops whoever vanished. Additive against the watch,
/// so duplicate news is harmless.
async fn resync(picker: &ClientPicker, prefix: &str) -> Result<()> {
    let snapshot =
        tokio::time::timeout(SNAPSHOT_TIMEOUT, picker.registry().get_prefix(prefix)).await??;

    let live: HashSet<String> = snapshot
        .iter()
        .filter_map(|(key, _)| trailing_addr(prefix, key))
        .filter(|addr| *addr != picker.self_addr())
        .map(str::to_string)
        .collect();

    for addr in &live {
        if !picker.known(addr) {
            picker.set(addr);
        }
    }
    for addr in picker.peers() {
        if addr != picker.self_addr() && !live.contains(&addr) {
            picker.remove(&addr);
        }
    }
    Ok(())
}

fn registration_key(picker: &ClientPicker) -> String {
    format!("{}/{}", picker.service_name(), picker.self_addr())
}

fn service_prefix(picker: &ClientPicker) -> String {
    format!("{}/", picker.service_name())
}

fn trailing_addr<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(prefix).filter(|addr| !addr.is_empty())
}
