// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Streaming decoding and validation of content-addressed archives (CAR).
//!
//! Blocks are decoded one frame at a time, validated against their CIDs and handed out in stream
//! order. See <https://ipld.io/specs/transport/car/carv1/> and
//! <https://ipld.io/specs/transport/car/carv2/>.

mod block;
mod header;
mod ordered;
mod stream;

pub use block::{CarBlock, ValidationError};
pub use header::CarV1Header;
pub use ordered::{BlockResolver, BlockSourceError, OrderedBlockSource};
pub use stream::CarStream;

use std::io;

/// Default upper bound on the length of a single block frame.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 4 << 20;

/// The archive is malformed or was cut short.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("invalid CAR header: {0}")]
    InvalidHeader(String),
    #[error("unsupported CAR version {0}")]
    UnsupportedVersion(u64),
    #[error("invalid block CID: {0}")]
    InvalidCid(#[from] cid::Error),
    #[error("malformed CAR frame: {0}")]
    Io(#[from] io::Error),
}
