use std::time::Duration;

use bytes::Bytes;

use super::protocol::{DeleteResponse, ENDPOINT_CACHE};
use crate::error::CacheError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// RPC handle bound to one peer address.
///
/// One client exists per live peer; the picker creates it when the peer
/// enters the ring and drops it on removal. Failures surface as
/// [`CacheError::Peer`] and are never retried here.
pub struct PeerClient {
    addr: String,
    base_url: String,
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new(addr: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            addr: addr.to_string(),
            base_url: format!("http://{}{}", addr, ENDPOINT_CACHE),
            http,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Fetches the value for `(group, key)` from this peer.
    pub async fn get(&self, group: &str, key: &str) -> Result<Bytes, CacheError> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, group))
            .query(&[("key", key)])
            .send()
            .await
            .map_err(|e| self.peer_error(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .bytes()
                .await
                .map_err(|e| self.peer_error(e.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.peer_error(format!("get returned {}: {}", status, body)))
    }

    /// Asks this peer to drop `(group, key)`; returns whether it was
    /// present there.
    pub async fn delete(&self, group: &str, key: &str) -> Result<bool, CacheError> {
        let response = self
            .http
            .delete(format!("{}/{}", self.base_url, group))
            .query(&[("key", key)])
            .send()
            .await
            .map_err(|e| self.peer_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.peer_error(format!("delete returned {}: {}", status, body)));
        }
        let ack: DeleteResponse = response
            .json()
            .await
            .map_err(|e| self.peer_error(e.to_string()))?;
        Ok(ack.value)
    }

    fn peer_error(&self, reason: String) -> CacheError {
        CacheError::Peer {
            addr: self.addr.clone(),
            reason,
        }
    }
}
