#[cfg(test)]
mod tests {
    use crate::registry::types::RegistryEvent;
    use crate::registry::{MemoryRegistry, Registry};
    use std::time::Duration;

    #[tokio::test]
    async fn test_put_then_prefix_read() {
        let registry = MemoryRegistry::new();

        registry
            .put_with_lease("svc/127.0.0.1:8001", "127.0.0.1:8001", Duration::from_secs(5))
            .await
            .unwrap();
        registry
            .put_with_lease("svc/127.0.0.1:8002", "127.0.0.1:8002", Duration::from_secs(5))
            .await
            .unwrap();
        registry
            .put_with_lease("other/127.0.0.1:9001", "127.0.0.1:9001", Duration::from_secs(5))
            .await
            .unwrap();

        let pairs = registry.get_prefix("svc/").await.unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "svc/127.0.0.1:8001");
        assert_eq!(pairs[1].0, "svc/127.0.0.1:8002");
    }

    #[tokio::test]
    async fn test_watch_sees_put_and_delete() {
        let registry = MemoryRegistry::new();
        // Watch is opened before any mutation, as the agent does.
        let mut watch = registry.watch_prefix("svc/").await.unwrap();

        let lease = registry
            .put_with_lease("svc/127.0.0.1:8001", "127.0.0.1:8001", Duration::from_secs(5))
            .await
            .unwrap();
        registry
            .put_with_lease("noise/127.0.0.1:7000", "x", Duration::from_secs(5))
            .await
            .unwrap();
        registry.revoke(&lease).await.unwrap();

        let first = watch.next().await.unwrap();
        assert_eq!(
            first,
            RegistryEvent::Put {
                key: "svc/127.0.0.1:8001".into(),
                value: "127.0.0.1:8001".into(),
            }
        );
        // The out-of-prefix put is filtered; the next event is the delete.
        let second = watch.next().await.unwrap();
        assert_eq!(
            second,
            RegistryEvent::Delete {
                key: "svc/127.0.0.1:8001".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_lease_expires_without_heartbeat() {
        let registry = MemoryRegistry::new();
        let mut watch = registry.watch_prefix("svc/").await.unwrap();

        registry
            .put_with_lease("svc/127.0.0.1:8001", "127.0.0.1:8001", Duration::from_millis(200))
            .await
            .unwrap();

        // Put arrives first, then the expiry-driven delete.
        assert!(matches!(
            watch.next().await.unwrap(),
            RegistryEvent::Put { .. }
        ));
        let deleted = tokio::time::timeout(Duration::from_secs(2), watch.next())
            .await
            .expect("expiry should emit a delete")
            .unwrap();
        assert_eq!(
            deleted,
            RegistryEvent::Delete {
                key: "svc/127.0.0.1:8001".into(),
            }
        );
        assert!(registry.get_prefix("svc/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keep_alive_extends_lease() {
        let registry = MemoryRegistry::new();
        let lease = registry
            .put_with_lease("svc/127.0.0.1:8001", "127.0.0.1:8001", Duration::from_millis(300))
            .await
            .unwrap();

        for _ in 0..6 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            registry.keep_alive(&lease).await.unwrap();
        }
        // Well past the original TTL, the key must still be there.
        assert_eq!(registry.get_prefix("svc/").await.unwrap().len(), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(registry.get_prefix("svc/").await.unwrap().is_empty());
        assert!(registry.keep_alive(&lease).await.is_err());
    }

    #[tokio::test]
    async fn test_revoke_is_immediate_and_final() {
        let registry = MemoryRegistry::new();
        let lease = registry
            .put_with_lease("svc/a", "a", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(registry.get_prefix("svc/").await.unwrap().len(), 1);

        registry.revoke(&lease).await.unwrap();
        assert!(registry.get_prefix("svc/").await.unwrap().is_empty());
        assert!(registry.keep_alive(&lease).await.is_err());
    }
}
