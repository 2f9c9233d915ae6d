// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io;

use cid::Cid;
use nunny::Vec as NonEmpty;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt as _};

use super::FramingError;

// Max size of u64 varint
const U64_LEN: usize = 10;

/// Headers only list roots, anything bigger than this is garbage.
const MAX_HEADER_SIZE: u64 = 1 << 20;

pub(super) const CARV2_HEADER_SIZE: usize = 40;
pub(super) const CARV2_PRAGMA_SIZE: usize = 11;

// The pragma of a CARv2, containing the version number.
// This is a valid CARv1 header, with version number of 2 and no root CIDs.
pub(super) const CARV2_PRAGMA: [u8; CARV2_PRAGMA_SIZE] = [
    0x0a, // unit(10)
    0xa1, // map(1)
    0x67, // string(7)
    0x76, 0x65, 0x72, 0x73, 0x69, 0x6f, 0x6e, // "version"
    0x02, // uint(2)
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarV1Header {
    // The roots array must contain one or more CIDs,
    // each of which should be present somewhere in the remainder of the CAR.
    // See <https://ipld.io/specs/transport/car/carv1/#constraints>
    pub roots: NonEmpty<Cid>,
    pub version: u64,
}

impl CarV1Header {
    pub(super) fn decode(frame: &[u8]) -> Result<Self, FramingError> {
        let header: CarV1Header = serde_ipld_dagcbor::from_slice(frame)
            .map_err(|e| FramingError::InvalidHeader(e.to_string()))?;
        if header.version != 1 {
            return Err(FramingError::UnsupportedVersion(header.version));
        }
        Ok(header)
    }
}

/// Only the version is common to every header layout.
#[derive(Deserialize)]
struct CarVersion {
    version: u64,
}

pub(super) fn header_version(frame: &[u8]) -> Result<u64, FramingError> {
    serde_ipld_dagcbor::from_slice::<CarVersion>(frame)
        .map(|header| header.version)
        .map_err(|e| FramingError::InvalidHeader(e.to_string()))
}

/// Location of the CARv1 payload within a CARv2 archive.
///
/// Full CARv2 stream
/// ```nn
/// [pragma][v2 header][opt padding][CARv1][opt padding][opt index]
/// ```
#[derive(Debug, PartialEq, Eq)]
pub(super) struct CarV2Header {
    pub data_offset: u64,
    pub data_size: u64,
}

impl CarV2Header {
    /// The header is a 16-byte characteristics bitfield followed by three little-endian `u64`s:
    /// data offset, data size and index offset. Only the first two are needed to stream the
    /// payload.
    pub(super) fn decode(header: &[u8; CARV2_HEADER_SIZE]) -> Self {
        fn le_u64(bytes: &[u8]) -> u64 {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            u64::from_le_bytes(buf)
        }
        Self {
            data_offset: le_u64(&header[16..24]),
            data_size: le_u64(&header[24..32]),
        }
    }
}

pub(super) async fn read_varint_u64<R: AsyncRead + Unpin>(
    stream: &mut R,
) -> io::Result<(u64, usize)> {
    let mut result: u64 = 0;

    for i in 0..U64_LEN {
        let byte = stream.read_u8().await?;
        result |= u64::from(byte & 0b0111_1111) << (i * 7);

        // If is last byte = leftmost bit is zero
        if byte & 0b1000_0000 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "varint overflows u64",
    ))
}

/// Reads a varint-prefixed header frame, returning it with the number of bytes consumed.
pub(super) async fn read_header_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<(Vec<u8>, u64), FramingError> {
    let (len, varint_len) = read_varint_u64(reader).await?;
    if len > MAX_HEADER_SIZE {
        return Err(FramingError::InvalidHeader(format!(
            "header frame of {len} bytes exceeds {MAX_HEADER_SIZE}"
        )));
    }
    let mut frame = vec![0; len as usize];
    reader.read_exact(&mut frame).await?;
    Ok((frame, varint_len as u64 + len))
}
