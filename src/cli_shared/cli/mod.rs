// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod config;

pub use config::{Config, GatewayConfig, LogConfig, LogValue};

use std::net::SocketAddr;
use std::path::PathBuf;

use cid::Cid;
use clap::Parser;
use url::Url;

use crate::utils::io::read_toml_file;
use crate::utils::misc::LoggingColor;

/// Options shared by every way of running the gateway. Flags take precedence over the
/// configuration file.
#[derive(Debug, Default, Parser)]
pub struct CliOpts {
    /// A TOML file containing relevant configurations
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Address the HTTP server binds to
    #[arg(long)]
    pub listen_address: Option<SocketAddr>,
    /// Trustless gateway to fetch archives from
    #[arg(long)]
    pub origin: Option<Url>,
    /// Root CID served on paths outside of `/ipfs/`
    #[arg(long)]
    pub root: Option<Cid>,
    /// Directory for hourly rolling log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
    /// Enable or disable colored logging in `stdout`
    #[arg(long, default_value = "auto")]
    pub color: LoggingColor,
    /// Print the effective configuration and exit
    #[arg(long)]
    pub dump_config: bool,
}

impl CliOpts {
    pub fn to_config(&self) -> anyhow::Result<Config> {
        let mut cfg: Config = match &self.config {
            Some(path) => read_toml_file(path)?,
            None => Config::default(),
        };

        if let Some(listen_address) = self.listen_address {
            cfg.gateway.listen_address = listen_address;
        }
        if let Some(origin) = &self.origin {
            cfg.gateway.origin = origin.clone();
        }
        if let Some(root) = self.root {
            cfg.gateway.default_root = Some(root);
        }
        Ok(cfg)
    }
}
