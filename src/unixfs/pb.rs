// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! `dag-pb` and UnixFS protobuf messages, borrowing from the block they are decoded from.
//!
//! ```proto
//! message PBLink { optional bytes Hash = 1; optional string Name = 2; optional uint64 Tsize = 3; }
//! message PBNode { repeated PBLink Links = 2; optional bytes Data = 1; }
//!
//! message Data {
//!     required DataType Type = 1;
//!     optional bytes Data = 2;
//!     optional uint64 filesize = 3;
//!     repeated uint64 blocksizes = 4;
//!     optional uint64 hashType = 5;
//!     optional uint64 fanout = 6;
//! }
//! ```
//! See <https://ipld.io/specs/codecs/dag-pb/spec/> and <https://specs.ipfs.tech/unixfs/>.

use quick_protobuf::{BytesReader, MessageRead, Result};

#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct PbLink<'a> {
    pub hash: Option<&'a [u8]>,
    pub name: Option<&'a str>,
    pub tsize: Option<u64>,
}

impl<'a> MessageRead<'a> for PbLink<'a> {
    fn from_reader(r: &mut BytesReader, bytes: &'a [u8]) -> Result<Self> {
        let mut msg = Self::default();
        while !r.is_eof() {
            match r.next_tag(bytes) {
                Ok(10) => msg.hash = Some(r.read_bytes(bytes)?),
                Ok(18) => msg.name = Some(r.read_string(bytes)?),
                Ok(24) => msg.tsize = Some(r.read_uint64(bytes)?),
                Ok(t) => {
                    r.read_unknown(bytes, t)?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(msg)
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct PbNode<'a> {
    pub links: Vec<PbLink<'a>>,
    pub data: Option<&'a [u8]>,
}

impl<'a> MessageRead<'a> for PbNode<'a> {
    fn from_reader(r: &mut BytesReader, bytes: &'a [u8]) -> Result<Self> {
        let mut msg = Self::default();
        while !r.is_eof() {
            match r.next_tag(bytes) {
                Ok(10) => msg.data = Some(r.read_bytes(bytes)?),
                Ok(18) => msg.links.push(r.read_message::<PbLink>(bytes)?),
                Ok(t) => {
                    r.read_unknown(bytes, t)?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(msg)
    }
}

/// The UnixFS `Data` message. `data_type` is kept raw so unknown types can be reported.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct UnixFsData<'a> {
    pub data_type: Option<i32>,
    pub data: Option<&'a [u8]>,
    pub filesize: Option<u64>,
    pub blocksizes: Vec<u64>,
    pub hash_type: Option<u64>,
    pub fanout: Option<u64>,
}

impl<'a> MessageRead<'a> for UnixFsData<'a> {
    fn from_reader(r: &mut BytesReader, bytes: &'a [u8]) -> Result<Self> {
        let mut msg = Self::default();
        while !r.is_eof() {
            match r.next_tag(bytes) {
                Ok(8) => msg.data_type = Some(r.read_int32(bytes)?),
                Ok(18) => msg.data = Some(r.read_bytes(bytes)?),
                Ok(24) => msg.filesize = Some(r.read_uint64(bytes)?),
                Ok(32) => msg.blocksizes.push(r.read_uint64(bytes)?),
                // packed encoding of the same field
                Ok(34) => msg
                    .blocksizes
                    .extend(r.read_packed(bytes, |r, bytes| r.read_uint64(bytes))?),
                Ok(40) => msg.hash_type = Some(r.read_uint64(bytes)?),
                Ok(48) => msg.fanout = Some(r.read_uint64(bytes)?),
                Ok(t) => {
                    r.read_unknown(bytes, t)?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(msg)
    }
}

/// Decodes a message spanning the whole of `bytes`.
pub fn decode<'a, M: MessageRead<'a>>(bytes: &'a [u8]) -> Result<M> {
    let mut reader = BytesReader::from_bytes(bytes);
    M::from_reader(&mut reader, bytes)
}


#[cfg(test)]
pub use write::encode;
