// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::time::Duration;

use futures::TryStreamExt as _;
use tap::Pipe as _;
use tokio::io::AsyncBufRead;

/// Builds the HTTP client used to reach origins.
pub fn http_client(connect_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(connect_timeout)
        .build()
}

/// Adapts the body of `response` to an [`AsyncBufRead`]. Transport errors surface as
/// [`std::io::Error`]s of kind `Other`.
pub fn response_reader(response: reqwest::Response) -> impl AsyncBufRead + Send + Unpin {
    response
        .bytes_stream()
        .map_err(std::io::Error::other)
        .pipe(Box::pin)
        .pipe(tokio_util::io::StreamReader::new)
}
