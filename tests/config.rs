// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT
use std::io::Write;

use car_gateway::Config;
use predicates::prelude::*;

pub mod common;
use crate::common::gateway;

fn dumped_config(cmd: &mut assert_cmd::Command) -> Config {
    let output = cmd.arg("--dump-config").assert().success();
    toml::from_str::<Config>(std::str::from_utf8(&output.get_output().stdout).unwrap())
        .expect("Invalid configuration!")
}

#[test]
fn test_dump_config_produces_valid_toml_configuration() {
    assert_eq!(dumped_config(&mut gateway()), Config::default());
}

#[test]
fn test_flags_override_config_file() {
    let mut config_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    config_file
        .write_all(b"[gateway]\nlisten_address = \"0.0.0.0:9999\"\nmax_block_size = 1024\n")
        .expect("Failed writing configuration!");

    let config = dumped_config(
        gateway()
            .arg("--config")
            .arg(config_file.path())
            .arg("--origin")
            .arg("http://127.0.0.1:3000/")
            .arg("--root")
            .arg("bafybeiagrjpf2rwth5oylc64czsrz2jm7a4fgo67b2luygqjrivjbswuku"),
    );
    assert_eq!(config.gateway.listen_address.port(), 9999);
    assert_eq!(config.gateway.max_block_size, 1024);
    assert_eq!(config.gateway.origin.as_str(), "http://127.0.0.1:3000/");
    assert_eq!(
        config.gateway.default_root.map(|root| root.to_string()),
        Some("bafybeiagrjpf2rwth5oylc64czsrz2jm7a4fgo67b2luygqjrivjbswuku".to_owned())
    );
}

#[test]
fn test_malformed_config_file_is_rejected() {
    let mut config_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    config_file
        .write_all(b"[gateway]\nlisten_address = 42\n")
        .unwrap();
    gateway()
        .arg("--config")
        .arg(config_file.path())
        .arg("--dump-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error parsing config"));
}

#[test]
fn test_invalid_root_flag_is_rejected() {
    gateway()
        .arg("--root")
        .arg("not-a-cid")
        .arg("--dump-config")
        .assert()
        .failure();
}
