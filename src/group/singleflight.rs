use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::cache::byteview::ByteView;
use crate::error::CacheError;

type FlightResult = Result<ByteView, CacheError>;

/// Collapses concurrent loads of the same key into one invocation.
///
/// The first caller for a key becomes the leader and runs the work; everyone
/// arriving while the call is in flight subscribes to its completion and
/// receives the identical result. The entry is removed before the result is
/// published, so a caller arriving afterwards starts a fresh load: results
/// are never cached here.
pub struct SingleFlight {
    calls: Mutex<HashMap<String, broadcast::Sender<FlightResult>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `work` for `key` unless a call is already in flight, in which
    /// case the in-flight result is awaited instead. The bool is true when
    /// the result came from another caller's invocation.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> (FlightResult, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightResult>,
    {
        let waiter = {
            let mut calls = self.calls.lock();
            match calls.get(key) {
                Some(sender) => Some(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    calls.insert(key.to_string(), sender);
                    None
                }
            }
        };

        if let Some(mut receiver) = waiter {
            let result = match receiver.recv().await {
                Ok(result) => result,
                // The leader went away without publishing; report that
                // rather than hang. The next caller starts a fresh load.
                Err(_) => Err(CacheError::Upstream {
                    key: key.to_string(),
                    reason: "in-flight load was dropped before completing".into(),
                }),
            };
            return (result, true);
        }

        // If this future is dropped mid-work the guard clears the entry, so
        // its sender is dropped and waiters wake with an error instead of
        // blocking forever.
        let mut guard = FlightGuard {
            calls: &self.calls,
            key,
            published: false,
        };
        let result = work().await;
        let sender = self.calls.lock().remove(key);
        guard.published = true;
        if let Some(sender) = sender {
            let _ = sender.send(result.clone());
        }
        (result, false)
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

struct FlightGuard<'a> {
    calls: &'a Mutex<HashMap<String, broadcast::Sender<FlightResult>>>,
    key: &'a str,
    published: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.published {
            self.calls.lock().remove(self.key);
        }
    }
}
