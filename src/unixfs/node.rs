// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use bytes::Bytes;
use cid::Cid;

use super::hamt::{HamtShard, MAX_FANOUT};
use super::pb::{self, PbLink, PbNode, UnixFsData};
use super::{DAG_PB, IPLD_RAW};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported codec {0:#x}")]
    UnsupportedCodec(u64),
    #[error("invalid protobuf: {0}")]
    Protobuf(#[from] quick_protobuf::Error),
    #[error("dag-pb node carries no UnixFS data")]
    MissingData,
    #[error("unknown UnixFS type {0}")]
    UnknownType(i32),
    #[error("dag-pb link without a hash")]
    MissingLinkHash,
    #[error("invalid link: {0}")]
    InvalidLink(#[from] cid::Error),
    #[error("directory entry {0} has no name")]
    UnnamedEntry(Cid),
    #[error("file node has {links} links but {blocksizes} block sizes")]
    BlockSizesMismatch { links: usize, blocksizes: usize },
    #[error("file node block sizes overflow a 64-bit length")]
    FileSizeOverflow,
    #[error("HAMT shard without a hash type")]
    MissingHashType,
    #[error("invalid HAMT fanout {0}")]
    InvalidFanout(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum NodeKind {
    Directory,
    File,
    Raw,
    Metadata,
    Symlink,
    HamtShard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub cid: Cid,
}

/// A file root or one of its chunks: inline data followed by the content of each link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub data: Bytes,
    pub links: Vec<Cid>,
    pub blocksizes: Vec<u64>,
    /// Declared length of the content: `filesize`, or the inline data plus all block sizes.
    pub size: u64,
}

/// A block interpreted as part of a UnixFS DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Directory(Vec<DirEntry>),
    File(FileNode),
    Raw(Bytes),
    HamtShard(HamtShard),
    /// Recognized, but never walked.
    Other(NodeKind),
}

impl Node {
    /// The kind of node is decided by the CID codec, then by the UnixFS type of `dag-pb` nodes.
    pub fn decode(cid: &Cid, block: Bytes) -> Result<Node, DecodeError> {
        match cid.codec() {
            IPLD_RAW => Ok(Node::Raw(block)),
            DAG_PB => decode_dag_pb(block),
            codec => Err(DecodeError::UnsupportedCodec(codec)),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Directory(_) => NodeKind::Directory,
            Node::File(_) => NodeKind::File,
            Node::Raw(_) => NodeKind::Raw,
            Node::HamtShard(_) => NodeKind::HamtShard,
            Node::Other(kind) => *kind,
        }
    }
}

fn decode_dag_pb(block: Bytes) -> Result<Node, DecodeError> {
    let node: PbNode = pb::decode(&block)?;
    let unixfs: UnixFsData = pb::decode(node.data.ok_or(DecodeError::MissingData)?)?;
    match unixfs.data_type.ok_or(DecodeError::MissingData)? {
        0 | 2 => {
            if unixfs.blocksizes.len() != node.links.len() {
                return Err(DecodeError::BlockSizesMismatch {
                    links: node.links.len(),
                    blocksizes: unixfs.blocksizes.len(),
                });
            }
            let data = unixfs
                .data
                .map(|data| block.slice_ref(data))
                .unwrap_or_default();
            let size = match unixfs.filesize {
                Some(filesize) => filesize,
                None => unixfs
                    .blocksizes
                    .iter()
                    .try_fold(data.len() as u64, |total, size| total.checked_add(*size))
                    .ok_or(DecodeError::FileSizeOverflow)?,
            };
            Ok(Node::File(FileNode {
                data,
                links: node.links.iter().map(link_cid).collect::<Result<_, _>>()?,
                blocksizes: unixfs.blocksizes,
                size,
            }))
        }
        1 => named_entries(&node.links).map(Node::Directory),
        3 => Ok(Node::Other(NodeKind::Metadata)),
        4 => Ok(Node::Other(NodeKind::Symlink)),
        5 => {
            let hash_type = unixfs.hash_type.ok_or(DecodeError::MissingHashType)?;
            let fanout = unixfs.fanout.unwrap_or_default();
            if !fanout.is_power_of_two() || !(2..=MAX_FANOUT).contains(&fanout) {
                return Err(DecodeError::InvalidFanout(fanout));
            }
            Ok(Node::HamtShard(HamtShard {
                hash_type,
                fanout,
                links: named_entries(&node.links)?,
            }))
        }
        other => Err(DecodeError::UnknownType(other)),
    }
}

fn named_entries(links: &[PbLink]) -> Result<Vec<DirEntry>, DecodeError> {
    links
        .iter()
        .map(|link| -> Result<DirEntry, DecodeError> {
            let cid = link_cid(link)?;
            let name = link.name.ok_or(DecodeError::UnnamedEntry(cid))?;
            Ok(DirEntry {
                name: name.to_owned(),
                cid,
            })
        })
        .collect()
}

fn link_cid(link: &PbLink) -> Result<Cid, DecodeError> {
    let hash = link.hash.ok_or(DecodeError::MissingLinkHash)?;
    Ok(Cid::try_from(hash)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::CarBlock;
    use crate::test_utils::*;
    use crate::utils::multihash::prelude::*;

    fn decode(block: &crate::car::CarBlock) -> Result<Node, DecodeError> {
        Node::decode(&block.cid, block.data.clone())
    }

    #[test]
    fn raw_codec() {
        let block = raw_block(b"raw bytes");
        assert_eq!(
            decode(&block).unwrap(),
            Node::Raw(Bytes::from_static(b"raw bytes"))
        );
    }

    #[test]
    fn dag_cbor_is_unsupported() {
        let block = raw_block(b"\xa0");
        let cid = Cid::new_v1(DAG_CBOR, *block.cid.hash());
        assert!(matches!(
            Node::decode(&cid, block.data),
            Err(DecodeError::UnsupportedCodec(DAG_CBOR))
        ));
    }

    #[test]
    fn single_block_file() {
        let cid = Cid::try_from("QmUU2HcUBVSXkfWPUc3WUSeCMrWWeEJTuAgR9uyWBhh9Nf").unwrap();
        let block = hex::decode("0a110802120b68656c6c6f776f726c640a180b").unwrap();
        let Node::File(file) = Node::decode(&cid, block.into()).unwrap() else {
            panic!("expected a file");
        };
        assert_eq!(file.data, Bytes::from_static(b"helloworld\n"));
        assert!(file.links.is_empty());
        assert_eq!(file.size, 11);
    }

    #[test]
    fn chunked_file() {
        let first = raw_block(b"abc");
        let second = raw_block(b"defg");
        let block = file_block(b"xy", &[(first.cid, 3), (second.cid, 4)], None);
        let Node::File(file) = decode(&block).unwrap() else {
            panic!("expected a file");
        };
        assert_eq!(file.links, vec![first.cid, second.cid]);
        assert_eq!(file.blocksizes, vec![3, 4]);
        assert_eq!(file.size, 9);
    }

    #[test]
    fn overflowing_block_sizes() {
        let first = raw_block(b"abc");
        let second = raw_block(b"defg");
        let block = file_block(b"", &[(first.cid, u64::MAX), (second.cid, 1)], None);
        assert!(matches!(decode(&block), Err(DecodeError::FileSizeOverflow)));

        // An explicit filesize is taken as is
        let block = file_block(b"", &[(first.cid, u64::MAX), (second.cid, 1)], Some(7));
        let Node::File(file) = decode(&block).unwrap() else {
            panic!("expected a file");
        };
        assert_eq!(file.size, 7);
    }

    #[test]
    fn directory() {
        let a = raw_block(b"a");
        let b = raw_block(b"b");
        let block = directory_block(&[("a.txt", a.cid), ("b.txt", b.cid)]);
        assert_eq!(
            decode(&block).unwrap(),
            Node::Directory(vec![
                DirEntry {
                    name: "a.txt".into(),
                    cid: a.cid
                },
                DirEntry {
                    name: "b.txt".into(),
                    cid: b.cid
                },
            ])
        );
    }

    #[test]
    fn other_kinds() {
        for (data_type, kind) in [(3, NodeKind::Metadata), (4, NodeKind::Symlink)] {
            let block = unixfs_block(data_type, &[]);
            assert_eq!(decode(&block).unwrap(), Node::Other(kind));
        }
    }

    #[test]
    fn hamt_shard() {
        let child = raw_block(b"child");
        let block = hamt_block(256, &[("4Fa.png", child.cid)]);
        assert_eq!(
            decode(&block).unwrap(),
            Node::HamtShard(HamtShard {
                hash_type: crate::unixfs::hamt::MURMUR3_X64_64,
                fanout: 256,
                links: vec![DirEntry {
                    name: "4Fa.png".into(),
                    cid: child.cid
                }],
            })
        );
    }

    #[test]
    fn invalid_hamt_fanout() {
        for fanout in [0, 1, 100, MAX_FANOUT * 2] {
            let block = hamt_block(fanout, &[]);
            assert!(
                matches!(decode(&block), Err(DecodeError::InvalidFanout(f)) if f == fanout),
                "{fanout}"
            );
        }
    }

    #[test]
    fn unknown_type() {
        let block = unixfs_block(9, &[]);
        assert!(matches!(decode(&block), Err(DecodeError::UnknownType(9))));
    }

    #[test]
    fn missing_unixfs_data() {
        // An empty dag-pb node
        let block = CarBlock {
            cid: Cid::new_v1(DAG_PB, MultihashCode::Sha2_256.digest(b"")),
            data: Bytes::new(),
        };
        assert!(matches!(decode(&block), Err(DecodeError::MissingData)));
    }

    #[test]
    fn block_sizes_mismatch() {
        let child = raw_block(b"child");
        let unixfs = pb::encode(&UnixFsData {
            data_type: Some(2),
            ..Default::default()
        });
        let hash = child.cid.to_bytes();
        let data = pb::encode(&PbNode {
            links: vec![PbLink {
                hash: Some(hash.as_slice()),
                ..Default::default()
            }],
            data: Some(unixfs.as_slice()),
        });
        let cid = Cid::new_v1(DAG_PB, MultihashCode::Sha2_256.digest(&data));
        assert!(matches!(
            Node::decode(&cid, data.into()),
            Err(DecodeError::BlockSizesMismatch {
                links: 1,
                blocksizes: 0
            })
        ));
    }
}
