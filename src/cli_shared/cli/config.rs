// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::net::SocketAddr;
use std::time::Duration;

use cid::Cid;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, DurationSeconds, serde_as};
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::car::DEFAULT_MAX_BLOCK_SIZE;

#[serde_as]
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    pub listen_address: SocketAddr,
    /// Trustless gateway the archives are requested from.
    pub origin: Url,
    /// Root served on paths outside of `/ipfs/{cid}`.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_root: Option<Cid>,
    pub max_block_size: usize,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub connect_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([127, 0, 0, 1], 8787)),
            origin: Url::parse("https://frisbii.fly.dev/").expect("infallible"),
            default_root: None,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub filters: Vec<LogValue>,
}

impl LogConfig {
    pub(in crate::cli_shared) fn to_filter_string(&self) -> String {
        self.filters
            .iter()
            .map(|f| format!("{}={}", f.module, f.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filters: vec![
                LogValue::new("axum", LevelFilter::WARN),
                LogValue::new("hyper_util", LevelFilter::WARN),
                LogValue::new("reqwest", LevelFilter::WARN),
                LogValue::new("tower_http", LevelFilter::INFO),
            ],
        }
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct LogValue {
    pub module: String,
    #[serde_as(as = "DisplayFromStr")]
    pub level: LevelFilter,
}

impl LogValue {
    pub fn new(module: &str, level: LevelFilter) -> Self {
        Self {
            module: module.to_string(),
            level,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Default, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub log: LogConfig,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_log_filters() {
        let config = LogConfig::default();
        assert_eq!(
            config.to_filter_string(),
            "axum=warn,hyper_util=warn,reqwest=warn,tower_http=info"
        );
    }

    #[test]
    fn config_round_trip() {
        let config = Config {
            gateway: GatewayConfig {
                default_root: Some(
                    "bafybeiagrjpf2rwth5oylc64czsrz2jm7a4fgo67b2luygqjrivjbswuku"
                        .parse()
                        .unwrap(),
                ),
                ..Default::default()
            },
            ..Default::default()
        };
        let serialized = toml::to_string(&config).unwrap();
        assert_eq!(toml::from_str::<Config>(&serialized).unwrap(), config);
    }

    #[test]
    fn partial_config() {
        let config: Config = toml::from_str(
            r#"
            [gateway]
            origin = "http://127.0.0.1:3000/"
            connect_timeout = 3

            [log]
            filters = [{ module = "car_gateway", level = "debug" }]
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway.origin.as_str(), "http://127.0.0.1:3000/");
        assert_eq!(config.gateway.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.gateway.max_block_size, DEFAULT_MAX_BLOCK_SIZE);
        assert_eq!(config.log.to_filter_string(), "car_gateway=debug");
    }

    #[test]
    fn empty_log_section() {
        let config: Config = toml::from_str("[log]\n").unwrap();
        assert_eq!(config.log, LogConfig::default());
    }
}
