// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod car;
mod cli_shared;
mod daemon;
mod gateway;
mod metrics;
#[cfg(test)]
mod test_utils;
mod unixfs;
mod utils;

pub use cli_shared::cli::Config;
pub use daemon::main::main as gateway_main;
