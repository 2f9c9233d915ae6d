// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use bytes::{Buf as _, Bytes};
use cid::Cid;

use super::FramingError;
use crate::utils::multihash::prelude::*;

/// A block as laid out in a CAR frame: its CID followed by its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CarBlock {
    pub cid: Cid,
    pub data: Bytes,
}

/// A block does not hash to its CID.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("unsupported multihash code {code:#x} in block {cid}")]
    UnsupportedHash { code: u64, cid: Cid },
    #[error("{code:?} digest mismatch for block {cid}, actual digest {actual}")]
    HashMismatch {
        cid: Cid,
        code: MultihashCode,
        actual: String,
    },
}

impl CarBlock {
    /// Splits a frame body into CID and data. The data is not copied.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<CarBlock, FramingError> {
        let bytes: Bytes = bytes.into();
        let mut cursor = bytes.reader();
        let cid = Cid::read_bytes(&mut cursor)?;
        Ok(CarBlock {
            cid,
            data: cursor.into_inner(),
        })
    }

    /// Re-hashes the data with the function named by the CID and compares digests. Only the
    /// digest is compared, so the CID version and codec play no part.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let expected = self.cid.hash();
        let code = MultihashCode::try_from(expected.code()).map_err(|_| {
            ValidationError::UnsupportedHash {
                code: expected.code(),
                cid: self.cid,
            }
        })?;
        if !code.matches(&self.data, expected) {
            return Err(ValidationError::HashMismatch {
                cid: self.cid,
                code,
                actual: hex::encode(code.digest(&self.data).digest()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
impl CarBlock {
    // Write a varint frame containing the cid and the data
    pub fn write(&self, mut writer: &mut impl std::io::Write) -> std::io::Result<()> {
        let frame_length = self.cid.encoded_len() + self.data.len();
        let mut buf = unsigned_varint::encode::usize_buffer();
        writer.write_all(unsigned_varint::encode::usize(frame_length, &mut buf))?;
        #[allow(clippy::needless_borrows_for_generic_args)]
        self.cid
            .write_bytes(&mut writer)
            .map_err(std::io::Error::other)?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}
