// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! HTTP boundary: maps requests to an origin fetch plus a file export, and export outcomes to
//! responses.

mod body;
mod error;
mod origin;

pub use error::GatewayError;
pub use origin::{CAR_MEDIA_TYPE, CarOrigin, HttpOrigin, OriginResponse};

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::header::{CONTENT_LENGTH, ETAG},
    response::{IntoResponse, Response},
    routing::get,
};
use cid::Cid;
use tokio::io::AsyncBufReadExt as _;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::car::{CarStream, OrderedBlockSource};
use crate::unixfs::export;

pub struct GatewayState {
    pub origin: Arc<dyn CarOrigin>,
    pub default_root: Option<Cid>,
    pub max_block_size: usize,
    /// Parent of every per-request cancellation token.
    pub shutdown: CancellationToken,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/metrics", get(crate::metrics::collect_prometheus_metrics))
        .route("/ipfs/{cid}", get(serve_root))
        .route("/ipfs/{cid}/{*path}", get(serve_path))
        .route("/", get(serve_default_root))
        .route("/{*path}", get(serve_default_path))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn serve_root(State(state): State<Arc<GatewayState>>, Path(cid): Path<String>) -> Response {
    respond(serve(&state, Cid::try_from(cid.as_str()).map_err(Into::into), "").await)
}

async fn serve_path(
    State(state): State<Arc<GatewayState>>,
    Path((cid, path)): Path<(String, String)>,
) -> Response {
    respond(serve(&state, Cid::try_from(cid.as_str()).map_err(Into::into), &path).await)
}

async fn serve_default_root(State(state): State<Arc<GatewayState>>) -> Response {
    respond(serve(&state, state.default_root.ok_or(GatewayError::NoRoot), "").await)
}

async fn serve_default_path(
    State(state): State<Arc<GatewayState>>,
    Path(path): Path<String>,
) -> Response {
    respond(serve(&state, state.default_root.ok_or(GatewayError::NoRoot), &path).await)
}

fn respond(result: Result<Response, GatewayError>) -> Response {
    let response = result.unwrap_or_else(IntoResponse::into_response);
    crate::metrics::record_response(response.status());
    response
}

/// Fetches the archive for `path` below `root` and starts streaming the file found there.
async fn serve(
    state: &GatewayState,
    root: Result<Cid, GatewayError>,
    path: &str,
) -> Result<Response, GatewayError> {
    let root = root?;
    let segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    let path = segments
        .iter()
        .map(|segment| format!("/{segment}"))
        .collect::<String>();

    let mut reader = match state.origin.fetch(root, &segments).await? {
        OriginResponse::Car(reader) => reader,
        OriginResponse::Failed(response) => return Ok(response),
    };
    if reader
        .fill_buf()
        .await
        .map_err(|e| GatewayError::Origin(e.into()))?
        .is_empty()
    {
        return Err(GatewayError::NoBody);
    }

    let car = CarStream::with_max_block_size(reader, state.max_block_size).await?;
    if !car.header.roots.contains(&root) {
        warn!(%root, roots = ?car.header.roots, "requested root is not among the archive roots");
    }

    let cancel = state.shutdown.child_token();
    let entry = export(root, &path, OrderedBlockSource::new(car), cancel.clone()).await?;
    let headers = [
        (CONTENT_LENGTH, entry.size().to_string()),
        (ETAG, format!("\"{}\"", entry.cid)),
    ];
    Ok((headers, body::stream_body(entry, cancel)).into_response())
}
