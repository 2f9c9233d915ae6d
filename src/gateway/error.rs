// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use tracing::{debug, warn};

use crate::car::FramingError;
use crate::unixfs::ExportError;

/// Failure to start serving a file.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid CID: {0}")]
    InvalidCid(#[from] cid::Error),
    #[error("no root CID given and no default root configured")]
    NoRoot,
    #[error("origin request failed: {0:#}")]
    Origin(anyhow::Error),
    #[error("No body")]
    NoBody,
    #[error("invalid archive: {0}")]
    Framing(#[from] FramingError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidCid(_) => StatusCode::BAD_REQUEST,
            GatewayError::NoRoot => StatusCode::NOT_FOUND,
            GatewayError::Origin(_) | GatewayError::NoBody | GatewayError::Framing(_) => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Export(e) => match e {
                ExportError::PathNotFound { .. } | ExportError::NotAFile { .. } => {
                    StatusCode::NOT_FOUND
                }
                ExportError::UnsupportedNode { .. } => StatusCode::NOT_IMPLEMENTED,
                ExportError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                ExportError::Source(_)
                | ExportError::Decode { .. }
                | ExportError::UnexpectedNode { .. }
                | ExportError::LengthMismatch { .. } => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && !matches!(self, GatewayError::Export(ExportError::Cancelled))
        {
            warn!(%status, "{self}");
        } else {
            debug!(%status, "{self}");
        }
        (status, self.to_string()).into_response()
    }
}
