// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Resolves a path below a root CID and streams the content of the file found there.
//!
//! The walk is depth-first and requests each block exactly once, in the order a trustless
//! gateway lays out a path-pruned CAR, so it can be driven by an [`OrderedBlockSource`].
//! Sharded directories are walked along the hash path of the segment only.
//!
//! [`OrderedBlockSource`]: crate::car::OrderedBlockSource

use bytes::Bytes;
use cid::Cid;
use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::hamt::{HamtShard, HashBits, MURMUR3_X64_64, Slot};
use super::node::{DecodeError, FileNode, Node, NodeKind};
use crate::car::{BlockResolver, BlockSourceError};
use crate::utils::multihash::IDENTITY;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Source(#[from] BlockSourceError),
    #[error("failed to decode block {cid}: {source}")]
    Decode { cid: Cid, source: DecodeError },
    #[error("path {path} not found")]
    PathNotFound { path: String },
    #[error("{path} is a {kind}, not a file")]
    NotAFile { path: String, kind: NodeKind },
    #[error("cannot traverse {kind} node {cid} while resolving {path}")]
    UnsupportedNode {
        path: String,
        cid: Cid,
        kind: NodeKind,
    },
    #[error("unexpected {kind} node {cid}")]
    UnexpectedNode { cid: Cid, kind: NodeKind },
    #[error("file {cid} declares {expected} bytes, got {actual}")]
    LengthMismatch { cid: Cid, expected: u64, actual: u64 },
    #[error("export cancelled")]
    Cancelled,
}

enum Target {
    File(FileNode),
    Raw(Bytes),
}

/// The file found at the end of a path, ready to be streamed.
pub struct Entry<R> {
    pub path: String,
    pub cid: Cid,
    target: Target,
    resolver: R,
    cancel: CancellationToken,
}

impl<R> std::fmt::Debug for Entry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("path", &self.path)
            .field("cid", &self.cid)
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

/// Walks from `root` along `path` and returns the file found there. An empty path targets the
/// root itself.
///
/// Fails with [`ExportError::PathNotFound`] when a segment is missing, and with
/// [`ExportError::NotAFile`] when the target is a directory or another non-file node. No content
/// block is requested before the target is known to be a file.
pub async fn export<R: BlockResolver>(
    root: Cid,
    path: &str,
    mut resolver: R,
    cancel: CancellationToken,
) -> Result<Entry<R>, ExportError> {
    let mut cid = root;
    let mut node = load_node(&mut resolver, &cid, &cancel).await?;
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        let child = match node {
            Node::Directory(entries) => entries
                .into_iter()
                .find(|entry| entry.name == segment)
                .map(|entry| entry.cid),
            Node::HamtShard(shard) => {
                find_in_shard(shard, cid, segment, path, &mut resolver, &cancel).await?
            }
            _ => None,
        };
        cid = child.ok_or_else(|| ExportError::PathNotFound {
            path: path.to_owned(),
        })?;
        trace!(%cid, segment, "descending");
        node = load_node(&mut resolver, &cid, &cancel).await?;
    }

    let target = match node {
        Node::File(file) => Target::File(file),
        Node::Raw(data) => Target::Raw(data),
        other => {
            return Err(ExportError::NotAFile {
                path: path.to_owned(),
                kind: other.kind(),
            });
        }
    };
    Ok(Entry {
        path: path.to_owned(),
        cid,
        target,
        resolver,
        cancel,
    })
}

/// Looks `name` up in a sharded directory, loading the sub-shards on its hash path.
async fn find_in_shard<R: BlockResolver>(
    mut shard: HamtShard,
    mut cid: Cid,
    name: &str,
    path: &str,
    resolver: &mut R,
    cancel: &CancellationToken,
) -> Result<Option<Cid>, ExportError> {
    let mut hash = HashBits::new(name);
    loop {
        let unsupported = || ExportError::UnsupportedNode {
            path: path.to_owned(),
            cid,
            kind: NodeKind::HamtShard,
        };
        if shard.hash_type != MURMUR3_X64_64 {
            return Err(unsupported());
        }
        // Deeper shards would need the name rehashed
        match shard.slot(name, &mut hash).ok_or_else(unsupported)? {
            Slot::Entry(entry) => return Ok(Some(entry)),
            Slot::Empty => return Ok(None),
            Slot::Shard(next) => {
                trace!(cid = %next, name, "descending into shard");
                cid = next;
                shard = match load_node(resolver, &cid, cancel).await? {
                    Node::HamtShard(shard) => shard,
                    other => {
                        return Err(ExportError::UnexpectedNode {
                            cid,
                            kind: other.kind(),
                        });
                    }
                };
            }
        }
    }
}

impl<R> Entry<R> {
    /// Declared length of the file content.
    pub fn size(&self) -> u64 {
        match &self.target {
            Target::File(file) => file.size,
            Target::Raw(data) => data.len() as u64,
        }
    }
}

impl<R: BlockResolver> Entry<R> {
    /// Streams the file content, chunk by chunk, resolving one block at a time.
    ///
    /// The stream ends without an error once the cancellation token fires. It fails when the
    /// content does not add up to the declared length, as soon as the excess or shortfall shows.
    pub fn content(self) -> impl Stream<Item = Result<Bytes, ExportError>> + Send {
        let mut walk = Walk {
            cid: self.cid,
            expected: self.size(),
            emitted: 0,
            pending: Vec::new(),
            resolver: self.resolver,
            cancel: self.cancel,
        };
        match self.target {
            Target::File(file) => walk.push_file(file),
            Target::Raw(data) => walk.pending.push(Pending::Data(data)),
        }
        futures::stream::try_unfold(walk, |mut walk| async move {
            Ok::<_, ExportError>(walk.next_chunk().await?.map(|chunk| (chunk, walk)))
        })
    }
}

enum Pending {
    Data(Bytes),
    Link(Cid),
}

struct Walk<R> {
    cid: Cid,
    expected: u64,
    emitted: u64,
    // Depth-first work stack, top is next
    pending: Vec<Pending>,
    resolver: R,
    cancel: CancellationToken,
}

impl<R: BlockResolver> Walk<R> {
    fn push_file(&mut self, file: FileNode) {
        self.pending
            .extend(file.links.into_iter().rev().map(Pending::Link));
        self.pending.push(Pending::Data(file.data));
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ExportError> {
        loop {
            if self.cancel.is_cancelled() {
                debug!(cid = %self.cid, emitted = self.emitted, "export cancelled");
                return Ok(None);
            }
            match self.pending.pop() {
                None if self.emitted == self.expected => return Ok(None),
                None => return Err(self.length_mismatch()),
                Some(Pending::Data(data)) if data.is_empty() => {}
                Some(Pending::Data(data)) => {
                    self.emitted = self.emitted.saturating_add(data.len() as u64);
                    if self.emitted > self.expected {
                        return Err(self.length_mismatch());
                    }
                    return Ok(Some(data));
                }
                Some(Pending::Link(cid)) => {
                    let block = load_block(&mut self.resolver, &cid).await?;
                    match decode(&cid, block)? {
                        Node::Raw(data) => self.pending.push(Pending::Data(data)),
                        Node::File(file) => self.push_file(file),
                        other => {
                            return Err(ExportError::UnexpectedNode {
                                cid,
                                kind: other.kind(),
                            });
                        }
                    }
                }
            }
        }
    }

    fn length_mismatch(&self) -> ExportError {
        ExportError::LengthMismatch {
            cid: self.cid,
            expected: self.expected,
            actual: self.emitted,
        }
    }
}

async fn load_node<R: BlockResolver>(
    resolver: &mut R,
    cid: &Cid,
    cancel: &CancellationToken,
) -> Result<Node, ExportError> {
    if cancel.is_cancelled() {
        return Err(ExportError::Cancelled);
    }
    let block = load_block(resolver, cid).await?;
    decode(cid, block)
}

async fn load_block<R: BlockResolver>(resolver: &mut R, cid: &Cid) -> Result<Bytes, ExportError> {
    // Identity blocks are not part of the archive
    if cid.hash().code() == IDENTITY {
        return Ok(Bytes::copy_from_slice(cid.hash().digest()));
    }
    Ok(resolver.resolve(cid).await?)
}

fn decode(cid: &Cid, block: Bytes) -> Result<Node, ExportError> {
    Node::decode(cid, block).map_err(|source| ExportError::Decode { cid: *cid, source })
}
