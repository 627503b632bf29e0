use std::sync::Arc;

use axum::Router;
use axum::extract::Extension;
use axum::routing::get;
use tokio::net::TcpListener;

use super::handlers::{handle_delete, handle_get};
use super::protocol::ENDPOINT_CACHE;
use super::validate_peer_addr;
use crate::error::CacheError;
use crate::group::Groups;

/// The peer-facing HTTP server for one node.
///
/// Serves `GET` and `DELETE` under `/_cache/:group` for the given group
/// collection. The address is validated up front; binding happens in
/// [`Server::run`], or callers hand a pre-bound listener to
/// [`Server::serve`].
pub struct Server {
    addr: String,
    groups: Arc<Groups>,
}

impl Server {
    pub fn new(addr: &str, groups: Arc<Groups>) -> Result<Self, CacheError> {
        validate_peer_addr(addr)?;
        Ok(Self {
            addr: addr.to_string(),
            groups,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(
                &format!("{}/:group", ENDPOINT_CACHE),
                get(handle_get).delete(handle_delete),
            )
            .layer(Extension(self.groups.clone()))
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        self.serve(listener).await
    }

    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!("cache server listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}
