// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use axum::{http::StatusCode, response::IntoResponse};
use parking_lot::{RwLock, RwLockWriteGuard};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, histogram::Histogram},
    registry::Registry,
};
use std::sync::LazyLock;
use std::time::Instant;
use tracing::warn;

static DEFAULT_REGISTRY: LazyLock<RwLock<Registry>> = LazyLock::new(Default::default);

pub fn default_registry<'a>() -> RwLockWriteGuard<'a, Registry> {
    DEFAULT_REGISTRY.write()
}

pub static CAR_BLOCKS_VALIDATED: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    default_registry().register(
        "car_blocks_validated",
        "Number of archive blocks that matched their CID",
        metric.clone(),
    );
    metric
});

pub static CONTENT_BYTES: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    default_registry().register(
        "gateway_content_bytes",
        "Number of file content bytes streamed to clients",
        metric.clone(),
    );
    metric
});

pub static RESPONSES: LazyLock<Family<StatusLabel, Counter>> = LazyLock::new(|| {
    let metric = Family::default();
    default_registry().register(
        "gateway_responses",
        "Number of responses by HTTP status",
        metric.clone(),
    );
    metric
});

pub static STREAM_TIME: LazyLock<Histogram> = LazyLock::new(|| {
    let metric = default_histogram();
    default_registry().register(
        "gateway_stream_time",
        "Duration of file content streams in seconds",
        metric.clone(),
    );
    metric
});

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StatusLabel {
    pub status: String,
}

impl From<StatusCode> for StatusLabel {
    fn from(status: StatusCode) -> Self {
        Self {
            status: status.as_u16().to_string(),
        }
    }
}

pub fn record_response(status: StatusCode) {
    RESPONSES.get_or_create(&status.into()).inc();
}

pub async fn collect_prometheus_metrics() -> impl IntoResponse {
    let mut metrics = String::new();
    if let Err(e) =
        prometheus_client::encoding::text::encode_registry(&mut metrics, &DEFAULT_REGISTRY.read())
    {
        warn!("failed to encode the default metrics registry: {e}");
    };
    if let Err(e) = prometheus_client::encoding::text::encode_eof(&mut metrics) {
        warn!("failed to encode metrics eof {e}");
    };
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        metrics,
    )
}

pub fn default_histogram() -> Histogram {
    // Default values from go client(https://github.com/prometheus/client_golang/blob/5d584e2717ef525673736d72cd1d12e304f243d7/prometheus/histogram.go#L68)
    Histogram::new([
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ])
}

pub struct HistogramTimer<'a> {
    histogram: &'a Histogram,
    start: Instant,
}

impl Drop for HistogramTimer<'_> {
    fn drop(&mut self) {
        let duration = Instant::now() - self.start;
        self.histogram.observe(duration.as_secs_f64());
    }
}

pub trait HistogramTimerExt {
    fn start_timer(&self) -> HistogramTimer<'_>;
}

impl HistogramTimerExt for Histogram {
    fn start_timer(&self) -> HistogramTimer<'_> {
        HistogramTimer {
            histogram: self,
            start: Instant::now(),
        }
    }
}
