use tokio::sync::broadcast;

/// Handle to a leased registration. Opaque to callers; minted by the
/// registry on `put_with_lease`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaseId(pub String);

impl LeaseId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for LeaseId {
    fn default() -> Self {
        Self::new()
    }
}

/// A change under a watched prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A key appeared (or was re-put).
    Put { key: String, value: String },
    /// A key vanished, whether revoked or lease-expired.
    Delete { key: String },
}

impl RegistryEvent {
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } => key,
            Self::Delete { key } => key,
        }
    }
}

/// Live event stream for one prefix.
///
/// A lagged subscriber logs and keeps going; the agent's periodic resync
/// covers whatever was missed.
pub struct RegistryWatch {
    prefix: String,
    receiver: broadcast::Receiver<RegistryEvent>,
}

impl RegistryWatch {
    pub fn new(prefix: &str, receiver: broadcast::Receiver<RegistryEvent>) -> Self {
        Self {
            prefix: prefix.to_string(),
            receiver,
        }
    }

    /// The next event under this watch's prefix, or None once the registry
    /// has shut down.
    pub async fn next(&mut self) -> Option<RegistryEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.key().starts_with(&self.prefix) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(prefix = %self.prefix, missed, "watch lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
