// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::ffi::OsString;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::runtime::Builder as RuntimeBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli_shared::cli::{CliOpts, GatewayConfig};
use crate::cli_shared::logger;
use crate::gateway::{self, GatewayState, HttpOrigin};

/// CLI structure generated when interacting with the gateway binary
#[derive(Parser)]
#[command(name = "car-gateway", author = env!("CARGO_PKG_AUTHORS"), version, about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[clap(flatten)]
    pub opts: CliOpts,
}

pub fn main<ArgT>(args: impl IntoIterator<Item = ArgT>) -> anyhow::Result<()>
where
    ArgT: Into<OsString> + Clone,
{
    let Cli { opts } = Cli::parse_from(args);
    let cfg = opts.to_config().context("Error parsing config")?;
    if opts.dump_config {
        print!("{}", toml::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let _guards = logger::setup_logger(&opts, &cfg.log);
    if let Some(path) = &opts.config {
        info!("Config loaded: {}", path.display());
    }

    RuntimeBuilder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(cfg.gateway))
}

async fn serve(config: GatewayConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let origin = HttpOrigin::new(config.origin.clone(), config.connect_timeout)?;
    let app = gateway::router(GatewayState {
        origin: Arc::new(origin),
        default_root: config.default_root,
        max_block_size: config.max_block_size,
        shutdown: shutdown.clone(),
    });

    let listener = TcpListener::bind(config.listen_address)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_address))?;
    info!(
        origin = %config.origin,
        default_root = ?config.default_root,
        "listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
            info!("shutting down, cancelling in-flight exports");
            shutdown.cancel();
        })
        .await
        .context("HTTP server failed")
}
