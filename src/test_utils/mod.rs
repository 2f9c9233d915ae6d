// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use nunny::Vec as NonEmpty;
use quickcheck::{Arbitrary, Gen};
use tokio_util::sync::CancellationToken;

use crate::car::{BlockResolver, BlockSourceError, CarBlock, CarV1Header};
use crate::unixfs::hamt::{MURMUR3_X64_64, slot_prefix};
use crate::unixfs::pb::{PbLink, PbNode, UnixFsData, encode};
use crate::utils::multihash::prelude::*;

pub use crate::unixfs::{DAG_PB, IPLD_RAW};

pub const DAG_CBOR: u64 = 0x71;

impl Arbitrary for CarBlock {
    fn arbitrary(g: &mut Gen) -> CarBlock {
        let data = Vec::<u8>::arbitrary(g);
        let codec = g.choose(&[IPLD_RAW, DAG_PB, DAG_CBOR]).unwrap();
        let code = g
            .choose(&[
                MultihashCode::Sha2_256,
                MultihashCode::Blake2b256,
                MultihashCode::Blake3_256,
            ])
            .unwrap();
        CarBlock {
            cid: Cid::new_v1(*codec, code.digest(&data)),
            data: data.into(),
        }
    }
}

pub fn raw_block(data: &[u8]) -> CarBlock {
    CarBlock {
        cid: Cid::new_v1(IPLD_RAW, MultihashCode::Sha2_256.digest(data)),
        data: Bytes::copy_from_slice(data),
    }
}

/// Raw leaf whose bytes live in the CID itself.
pub fn identity_cid(data: &[u8]) -> Cid {
    Cid::new_v1(IPLD_RAW, MultihashCode::Identity.digest(data))
}

fn dag_pb_block(links: &[(Cid, &str)], unixfs: &UnixFsData) -> CarBlock {
    let hashes = links.iter().map(|(cid, _)| cid.to_bytes()).collect::<Vec<_>>();
    let unixfs = encode(unixfs);
    let node = PbNode {
        links: hashes
            .iter()
            .zip(links)
            .map(|(hash, (_, name))| PbLink {
                hash: Some(hash.as_slice()),
                name: Some(*name),
                tsize: None,
            })
            .collect(),
        data: Some(unixfs.as_slice()),
    };
    let data = encode(&node);
    CarBlock {
        cid: Cid::new_v1(DAG_PB, MultihashCode::Sha2_256.digest(&data)),
        data: data.into(),
    }
}

/// UnixFS file node with inline `data` followed by `children`, each given with its byte length.
pub fn file_block(data: &[u8], children: &[(Cid, u64)], filesize: Option<u64>) -> CarBlock {
    let links = children
        .iter()
        .map(|(cid, _)| (*cid, ""))
        .collect::<Vec<_>>();
    dag_pb_block(
        &links,
        &UnixFsData {
            data_type: Some(2),
            data: (!data.is_empty()).then_some(data),
            filesize,
            blocksizes: children.iter().map(|(_, size)| *size).collect(),
            ..Default::default()
        },
    )
}

pub fn directory_block(entries: &[(&str, Cid)]) -> CarBlock {
    let links = entries
        .iter()
        .map(|(name, cid)| (*cid, *name))
        .collect::<Vec<_>>();
    dag_pb_block(
        &links,
        &UnixFsData {
            data_type: Some(1),
            ..Default::default()
        },
    )
}

/// UnixFS node of a type the exporter does not walk, e.g. `4` for a symlink.
pub fn unixfs_block(data_type: i32, links: &[(&str, Cid)]) -> CarBlock {
    let links = links
        .iter()
        .map(|(name, cid)| (*cid, *name))
        .collect::<Vec<_>>();
    dag_pb_block(
        &links,
        &UnixFsData {
            data_type: Some(data_type),
            ..Default::default()
        },
    )
}

/// HAMT shard node hashing with murmur3. `links` carry their slot prefixes in their names.
pub fn hamt_block(fanout: u64, links: &[(&str, Cid)]) -> CarBlock {
    let links = links
        .iter()
        .map(|(name, cid)| (*cid, *name))
        .collect::<Vec<_>>();
    dag_pb_block(
        &links,
        &UnixFsData {
            data_type: Some(5),
            hash_type: Some(MURMUR3_X64_64),
            fanout: Some(fanout),
            ..Default::default()
        },
    )
}

/// A two-level sharded directory holding `name` as `file`: the root shard links a sub-shard at
/// the slot of the first hash byte, which links `name` at the slot of the second. Returns the
/// blocks in archive order for a lookup of `name`.
pub fn sharded_directory(name: &str, file: Cid) -> Vec<CarBlock> {
    let filler = raw_block(b"filler").cid;
    let first = slot_prefix(name, 256, 0);
    let second = slot_prefix(name, 256, 1);
    let sub = hamt_block(
        256,
        &[
            (format!("{second}{name}").as_str(), file),
            (format!("{second}{name}.bak").as_str(), filler),
        ],
    );
    // Another slot, holding an entry which must not be followed
    let other = if first == "00" { "01" } else { "00" };
    let root = hamt_block(
        256,
        &[
            (first.as_str(), sub.cid),
            (format!("{other}{name}").as_str(), filler),
        ],
    );
    vec![root, sub]
}

/// The blocks a trustless gateway sends for `/{root}/a.png`, where `a.png` is ten bytes split
/// over two raw leaves. Returns the blocks in archive order.
pub fn sample_directory() -> Vec<CarBlock> {
    let first = raw_block(b"01234");
    let second = raw_block(b"56789");
    let file = file_block(b"", &[(first.cid, 5), (second.cid, 5)], Some(10));
    let root = directory_block(&[("a.png", file.cid), ("c.txt", raw_block(b"c").cid)]);
    vec![root, file, first, second]
}

/// Serializes blocks as a CAR archive.
pub struct CarBuilder {
    roots: Option<NonEmpty<Cid>>,
    blocks: Vec<CarBlock>,
}

impl CarBuilder {
    pub fn new(blocks: Vec<CarBlock>) -> Self {
        Self {
            roots: None,
            blocks,
        }
    }

    pub fn with_roots(mut self, roots: NonEmpty<Cid>) -> Self {
        self.roots = Some(roots);
        self
    }

    /// Defaults to the first block as the root.
    pub fn to_car_v1(&self) -> Vec<u8> {
        let roots = self.roots.clone().unwrap_or_else(|| {
            nunny::vec![
                self.blocks
                    .first()
                    .map_or_else(|| raw_block(b"").cid, |block| block.cid)
            ]
        });
        let header = serde_ipld_dagcbor::to_vec(&CarV1Header { roots, version: 1 }).unwrap();
        let mut car = Vec::new();
        let mut buf = unsigned_varint::encode::usize_buffer();
        car.extend_from_slice(unsigned_varint::encode::usize(header.len(), &mut buf));
        car.extend(header);
        for block in &self.blocks {
            block.write(&mut car).unwrap();
        }
        car
    }

    /// Wraps the CARv1 payload in a CARv2 envelope, with `padding` bytes between the CARv2
    /// header and the payload.
    pub fn to_car_v2(&self, padding: usize) -> Vec<u8> {
        let payload = self.to_car_v1();
        let data_offset = (11 + 40 + padding) as u64;
        let mut car = vec![
            0x0a, 0xa1, 0x67, 0x76, 0x65, 0x72, 0x73, 0x69, 0x6f, 0x6e, 0x02,
        ];
        car.extend_from_slice(&[0; 16]); // characteristics
        car.extend_from_slice(&data_offset.to_le_bytes());
        car.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        car.extend_from_slice(&0u64.to_le_bytes()); // index offset
        car.extend(std::iter::repeat_n(0, padding));
        car.extend(payload);
        car
    }
}

/// Counts the calls made to the wrapped resolver, and how many of them came after `cancel` fired.
pub struct CountingResolver<R> {
    inner: R,
    cancel: CancellationToken,
    pub calls: Arc<AtomicUsize>,
    pub calls_after_cancel: Arc<AtomicUsize>,
}

impl<R> CountingResolver<R> {
    pub fn new(inner: R, cancel: CancellationToken) -> Self {
        Self {
            inner,
            cancel,
            calls: Default::default(),
            calls_after_cancel: Default::default(),
        }
    }
}

#[async_trait]
impl<R: BlockResolver> BlockResolver for CountingResolver<R> {
    async fn resolve(&mut self, cid: &Cid) -> Result<Bytes, BlockSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.cancel.is_cancelled() {
            self.calls_after_cancel.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.resolve(cid).await
    }
}
