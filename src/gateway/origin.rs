// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use axum::body::Body;
use axum::response::{IntoResponse as _, Response};
use cid::Cid;
use http::header::{ACCEPT, CONTENT_TYPE};
use tokio::io::AsyncBufRead;
use tracing::{debug, info};
use url::Url;

use super::GatewayError;
use crate::utils::net::{http_client, response_reader};

/// Media type of a depth-first CAR with duplicate blocks, as requested from trustless gateways.
pub const CAR_MEDIA_TYPE: &str = "application/vnd.ipld.car; version=1; order=dfs; dups=y";

pub enum OriginResponse {
    /// The archive body, starting with its header.
    Car(Box<dyn AsyncBufRead + Send + Unpin>),
    /// The origin answered with a non-success status. The response is relayed as is.
    Failed(Response),
}

/// Where CAR archives come from.
#[async_trait]
pub trait CarOrigin: Send + Sync {
    /// Requests the blocks needed to serve `segments` below `root`, in traversal order.
    async fn fetch(&self, root: Cid, segments: &[&str]) -> Result<OriginResponse, GatewayError>;
}

/// A trustless gateway reached over HTTP.
pub struct HttpOrigin {
    base: Url,
    client: reqwest::Client,
}

impl HttpOrigin {
    pub fn new(base: Url, connect_timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!base.cannot_be_a_base(), "invalid origin URL {base}");
        Ok(Self {
            base,
            client: http_client(connect_timeout).context("failed to build the HTTP client")?,
        })
    }

    /// `{origin}/ipfs/{root}/{segments...}?format=car&dag-scope=entity&car-dups=y`
    pub fn car_url(&self, root: Cid, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("invalid origin URL {}", self.base))?
            .pop_if_empty()
            .push("ipfs")
            .push(&root.to_string())
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("format", "car")
            .append_pair("dag-scope", "entity")
            .append_pair("car-dups", "y");
        Ok(url)
    }
}

#[async_trait]
impl CarOrigin for HttpOrigin {
    async fn fetch(&self, root: Cid, segments: &[&str]) -> Result<OriginResponse, GatewayError> {
        let url = self.car_url(root, segments).map_err(GatewayError::Origin)?;
        info!(%url, "fetching archive from origin");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, CAR_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| GatewayError::Origin(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "relaying origin failure");
            let content_type = response.headers().get(CONTENT_TYPE).cloned();
            let mut relayed = Body::from_stream(response.bytes_stream()).into_response();
            *relayed.status_mut() = status;
            if let Some(content_type) = content_type {
                relayed.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            return Ok(OriginResponse::Failed(relayed));
        }
        Ok(OriginResponse::Car(Box::new(response_reader(response))))
    }
}
