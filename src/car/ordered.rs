// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use futures::{Stream, StreamExt as _};
use tracing::{debug, warn};

use super::{CarBlock, FramingError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum BlockSourceError {
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The requested block is not the next one in the archive, or the archive has ended.
    #[error("block {cid} not found in the archive")]
    BlockNotFound { cid: Cid, found: Option<Cid> },
}

/// Resolves CIDs to block data.
///
/// Resolution takes `&mut self`: a resolver serves one request at a time, and the next request
/// may only be issued once the previous one has completed.
#[async_trait]
pub trait BlockResolver: Send {
    async fn resolve(&mut self, cid: &Cid) -> Result<Bytes, BlockSourceError>;
}

/// Serves blocks in exactly the order the archive lays them out.
///
/// Trustless gateways emit a depth-first, path-pruned traversal with duplicates, so a walker
/// requesting the blocks it needs will always ask for the next block in the stream. Each request
/// pulls one block, validates it and checks that it is the requested one. Random access is not
/// supported.
pub struct OrderedBlockSource<S> {
    blocks: Pin<Box<S>>,
    resolved: usize,
}

impl<S> OrderedBlockSource<S>
where
    S: Stream<Item = Result<CarBlock, FramingError>>,
{
    pub fn new(blocks: S) -> Self {
        Self {
            blocks: Box::pin(blocks),
            resolved: 0,
        }
    }
}

#[async_trait]
impl<S> BlockResolver for OrderedBlockSource<S>
where
    S: Stream<Item = Result<CarBlock, FramingError>> + Send,
{
    async fn resolve(&mut self, cid: &Cid) -> Result<Bytes, BlockSourceError> {
        let Some(block) = self.blocks.next().await.transpose()? else {
            debug!(%cid, resolved = self.resolved, "archive exhausted");
            return Err(BlockSourceError::BlockNotFound {
                cid: *cid,
                found: None,
            });
        };
        block.validate()?;
        crate::metrics::CAR_BLOCKS_VALIDATED.inc();

        if block.cid != *cid {
            warn!(expected = %cid, found = %block.cid, "archive block out of order");
            return Err(BlockSourceError::BlockNotFound {
                cid: *cid,
                found: Some(block.cid),
            });
        }
        self.resolved += 1;
        Ok(block.data)
    }
}
