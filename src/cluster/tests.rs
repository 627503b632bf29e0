#[cfg(test)]
mod tests {
    use crate::cluster::client::PeerClient;
    use crate::cluster::picker::{ClientPicker, PickerConfig};
    use crate::cluster::server::Server;
    use crate::cluster::validate_peer_addr;
    use crate::error::CacheError;
    use crate::group::{Group, Groups};
    use crate::registry::{MemoryRegistry, Registry};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    struct TestNode {
        addr: String,
        group: Arc<Group>,
        picker: Arc<ClientPicker>,
        loads: Arc<AtomicUsize>,
        server: tokio::task::JoinHandle<()>,
    }

    impl TestNode {
        fn stop(&self) {
            self.picker.shutdown();
            self.server.abort();
        }
    }

    /// Brings up one node on an ephemeral port: a group with a counting
    /// loader over the same static score table on every node, a picker with
    /// fast lease/resync timings, and the HTTP server.
    async fn start_node(registry: &Arc<MemoryRegistry>, service: &str) -> TestNode {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let db = Arc::new(HashMap::from([
            ("Tom".to_string(), "630".to_string()),
            ("Jack".to_string(), "589".to_string()),
            ("Sam".to_string(), "567".to_string()),
        ]));
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();

        let groups = Groups::new();
        let group = groups
            .create("scores", 1 << 20, move |key: String| {
                let db = db.clone();
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    db.get(&key)
                        .cloned()
                        .map(String::into_bytes)
                        .ok_or_else(|| anyhow::anyhow!("no record for {}", key))
                }
            })
            .unwrap();

        let picker = ClientPicker::start(
            &addr,
            registry.clone() as Arc<dyn Registry>,
            PickerConfig {
                service_name: service.to_string(),
                lease_ttl: Duration::from_millis(500),
                resync_interval: Duration::from_millis(400),
                ..PickerConfig::default()
            },
        )
        .await
        .unwrap();
        group.register_picker(picker.clone());

        let server = Server::new(&addr, groups).unwrap();
        let handle = tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        TestNode {
            addr,
            group,
            picker,
            loads,
            server: handle,
        }
    }

    async fn wait_for_peer_count(nodes: &[&TestNode], expected: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if nodes.iter().all(|n| n.picker.peers().len() == expected) {
                return;
            }
            if Instant::now() > deadline {
                let views: Vec<usize> = nodes.iter().map(|n| n.picker.peers().len()).collect();
                panic!("peers never converged to {}: {:?}", expected, views);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn total_loads(nodes: &[&TestNode]) -> usize {
        nodes.iter().map(|n| n.loads.load(Ordering::SeqCst)).sum()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sharded_get_loads_once() {
        let registry = MemoryRegistry::new();
        let a = start_node(&registry, "shard-test").await;
        let b = start_node(&registry, "shard-test").await;
        let c = start_node(&registry, "shard-test").await;
        let nodes = [&a, &b, &c];
        wait_for_peer_count(&nodes, 3).await;

        let view = a.group.get("Tom").await.unwrap();
        assert_eq!(view.as_slice(), b"630");
        assert_eq!(total_loads(&nodes), 1, "exactly one node loads the key");

        // A repeat read is served from the owner's cache, wherever it is.
        let again = a.group.get("Tom").await.unwrap();
        assert_eq!(again.as_slice(), b"630");
        assert_eq!(total_loads(&nodes), 1);

        // Different keys may land on different owners, but every read works
        // from any node.
        assert_eq!(b.group.get("Jack").await.unwrap().as_slice(), b"589");
        assert_eq!(c.group.get("Sam").await.unwrap().as_slice(), b"567");

        for node in nodes {
            node.stop();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_forwards_to_owner() {
        let registry = MemoryRegistry::new();
        let a = start_node(&registry, "delete-test").await;
        let b = start_node(&registry, "delete-test").await;
        let nodes = [&a, &b];
        wait_for_peer_count(&nodes, 2).await;

        assert_eq!(a.group.get("Tom").await.unwrap().as_slice(), b"630");
        assert_eq!(total_loads(&nodes), 1);

        // The owner had the key, so the delete reports true; afterwards the
        // next read must hit the loader again.
        assert!(a.group.delete("Tom").await.unwrap());
        assert_eq!(a.group.get("Tom").await.unwrap().as_slice(), b"630");
        assert_eq!(total_loads(&nodes), 2);

        for node in nodes {
            node.stop();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_departed_peer_is_dropped_within_ttl() {
        let registry = MemoryRegistry::new();
        let a = start_node(&registry, "death-test").await;
        let b = start_node(&registry, "death-test").await;
        let c = start_node(&registry, "death-test").await;
        let nodes = [&a, &b, &c];
        wait_for_peer_count(&nodes, 3).await;

        // Find the owner of "Tom" and a survivor to read from.
        let (owner_client, _) = a.picker.pick_peer("Tom").unwrap();
        let owner_addr = owner_client.addr().to_string();
        let owner = nodes.iter().find(|n| n.addr == owner_addr).unwrap();
        let survivor = nodes.iter().find(|n| n.addr != owner_addr).unwrap();

        assert_eq!(survivor.group.get("Tom").await.unwrap().as_slice(), b"630");

        // Take the owner down; its lease revocation (or expiry) must reach
        // the survivors within the TTL.
        owner.stop();
        let survivors: Vec<&TestNode> = nodes
            .iter()
            .copied()
            .filter(|n| n.addr != owner_addr)
            .collect();
        wait_for_peer_count(&survivors, 2).await;

        // Ownership moved; the key is served by whoever owns it now.
        let view = survivor.group.get("Tom").await.unwrap();
        assert_eq!(view.as_slice(), b"630");

        for node in survivors {
            node.stop();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rpc_errors_are_typed() {
        let registry = MemoryRegistry::new();
        let a = start_node(&registry, "rpc-test").await;

        let client = PeerClient::new(&a.addr);

        // Unknown group is an explicit 404, not an empty value.
        let err = client.get("nope", "Tom").await.unwrap_err();
        match err {
            CacheError::Peer { reason, .. } => {
                assert!(reason.contains("404"), "unexpected reason: {}", reason);
                assert!(reason.contains("group not found"));
            }
            other => panic!("expected a peer error, got {:?}", other),
        }

        // Empty key is rejected by the owner with a 400.
        let err = client.get("scores", "").await.unwrap_err();
        match err {
            CacheError::Peer { reason, .. } => {
                assert!(reason.contains("400"), "unexpected reason: {}", reason);
            }
            other => panic!("expected a peer error, got {:?}", other),
        }

        // A healthy call against the same server still works.
        assert_eq!(client.get("scores", "Tom").await.unwrap().as_ref(), b"630");
        assert!(client.delete("scores", "Tom").await.unwrap());

        a.stop();
    }

    #[test]
    fn test_peer_addr_validation() {
        assert!(validate_peer_addr("127.0.0.1:8001").is_ok());
        assert!(validate_peer_addr("cache-7.internal:65535").is_ok());

        for bad in ["", "127.0.0.1", ":8001", "127.0.0.1:", "127.0.0.1:0", "127.0.0.1:70000", "127.0.0.1:port"] {
            assert!(
                validate_peer_addr(bad).is_err(),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_server_rejects_bad_addr() {
        assert!(Server::new("not-an-addr", Groups::new()).is_err());

        let registry = MemoryRegistry::new();
        let result = ClientPicker::start(
            "also-bad",
            registry as Arc<dyn Registry>,
            PickerConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_node_owns_everything() {
        let registry = MemoryRegistry::new();
        let a = start_node(&registry, "solo-test").await;

        // With only itself on the ring, every key is local.
        let (_, is_self) = a.picker.pick_peer("Tom").unwrap();
        assert!(is_self);
        assert_eq!(a.group.get("Tom").await.unwrap().as_slice(), b"630");
        assert_eq!(a.loads.load(Ordering::SeqCst), 1);

        a.stop();
    }
}
