// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! UnixFS DAG decoding and single-file export.

mod exporter;
pub(crate) mod hamt;
mod node;
pub(crate) mod pb;

pub use exporter::{Entry, ExportError, export};
pub use hamt::HamtShard;
pub use node::{DecodeError, DirEntry, FileNode, Node, NodeKind};

/// Multicodec of `dag-pb` blocks.
pub const DAG_PB: u64 = 0x70;
/// Multicodec of raw blocks.
pub const IPLD_RAW: u64 = 0x55;
