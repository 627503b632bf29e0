//! Peer API Handlers
//!
//! Translate the HTTP surface into group calls. Values are returned as raw
//! bodies; errors become a status code plus a plain-text message so the
//! remote side can forward the reason verbatim.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::protocol::{DeleteResponse, KeyParams};
use crate::error::CacheError;
use crate::group::Groups;

pub async fn handle_get(
    Extension(groups): Extension<Arc<Groups>>,
    Path(group): Path<String>,
    Query(params): Query<KeyParams>,
) -> Response {
    tracing::debug!(group = %group, key = %params.key, "rpc get");

    let Some(g) = groups.get(&group) else {
        return not_found(&group);
    };
    match g.get(&params.key).await {
        Ok(view) => (StatusCode::OK, view.to_vec()).into_response(),
        Err(e) => {
            tracing::warn!(group = %group, key = %params.key, "get failed: {}", e);
            (status_for(&e), e.to_string()).into_response()
        }
    }
}

pub async fn handle_delete(
    Extension(groups): Extension<Arc<Groups>>,
    Path(group): Path<String>,
    Query(params): Query<KeyParams>,
) -> Response {
    tracing::debug!(group = %group, key = %params.key, "rpc delete");

    let Some(g) = groups.get(&group) else {
        return not_found(&group);
    };
    match g.delete(&params.key).await {
        Ok(value) => (StatusCode::OK, Json(DeleteResponse { value })).into_response(),
        Err(e) => {
            tracing::warn!(group = %group, key = %params.key, "delete failed: {}", e);
            (status_for(&e), e.to_string()).into_response()
        }
    }
}

fn not_found(group: &str) -> Response {
    let e = CacheError::GroupNotFound(group.to_string());
    (StatusCode::NOT_FOUND, e.to_string()).into_response()
}

fn status_for(e: &CacheError) -> StatusCode {
    match e {
        CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        CacheError::GroupNotFound(_) => StatusCode::NOT_FOUND,
        CacheError::Peer { .. } => StatusCode::BAD_GATEWAY,
        CacheError::Upstream { .. } | CacheError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
