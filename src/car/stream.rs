// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncReadExt as _, Take};
use tokio_util::codec::FramedRead;
use tokio_util::either::Either;
use tracing::debug;
use unsigned_varint::codec::UviBytes;

use super::header::{
    CARV2_HEADER_SIZE, CARV2_PRAGMA, CarV2Header, header_version, read_header_frame,
};
use super::{CarBlock, CarV1Header, DEFAULT_MAX_BLOCK_SIZE, FramingError};

pin_project! {
    /// Stream of CAR blocks, decoded one varint frame at a time. Both CARv1 and CARv2 archives
    /// are accepted; the index of a CARv2 is never read.
    pub struct CarStream<ReaderT> {
        #[pin]
        reader: FramedRead<Either<ReaderT, Take<ReaderT>>, UviBytes>,
        pub header: CarV1Header,
    }
}

impl<ReaderT: AsyncRead + Unpin> CarStream<ReaderT> {
    pub async fn new(reader: ReaderT) -> Result<Self, FramingError> {
        Self::with_max_block_size(reader, DEFAULT_MAX_BLOCK_SIZE).await
    }

    /// Reads the archive header. Frames longer than `max_block_size` are rejected as they are
    /// reached.
    pub async fn with_max_block_size(
        mut reader: ReaderT,
        max_block_size: usize,
    ) -> Result<Self, FramingError> {
        let (frame, consumed) = read_header_frame(&mut reader).await?;
        let (header, reader) = match header_version(&frame)? {
            1 => (CarV1Header::decode(&frame)?, Either::Left(reader)),
            2 => {
                if frame.as_slice() != &CARV2_PRAGMA[1..] {
                    return Err(FramingError::InvalidHeader(
                        "malformed CARv2 pragma".into(),
                    ));
                }
                let mut raw = [0u8; CARV2_HEADER_SIZE];
                reader.read_exact(&mut raw).await?;
                let v2 = CarV2Header::decode(&raw);
                let padding = v2
                    .data_offset
                    .checked_sub(consumed + CARV2_HEADER_SIZE as u64)
                    .ok_or_else(|| {
                        FramingError::InvalidHeader(format!(
                            "CARv2 data offset {} points into the header",
                            v2.data_offset
                        ))
                    })?;
                skip(&mut reader, padding).await?;
                debug!(?v2, "reading CARv2 payload");

                let mut payload = reader.take(v2.data_size);
                let (frame, _) = read_header_frame(&mut payload).await?;
                (CarV1Header::decode(&frame)?, Either::Right(payload))
            }
            version => return Err(FramingError::UnsupportedVersion(version)),
        };

        let mut codec = UviBytes::default();
        codec.set_max_len(max_block_size);
        Ok(CarStream {
            reader: FramedRead::new(reader, codec),
            header,
        })
    }
}

async fn skip<ReaderT: AsyncRead + Unpin>(reader: &mut ReaderT, len: u64) -> io::Result<()> {
    let skipped = tokio::io::copy(&mut reader.take(len), &mut tokio::io::sink()).await?;
    if skipped < len {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

impl<ReaderT: AsyncRead> Stream for CarStream<ReaderT> {
    type Item = Result<CarBlock, FramingError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let item = futures::ready!(this.reader.poll_next(cx));
        Poll::Ready(item.map(|ret| {
            ret.map_err(FramingError::from)
                .and_then(CarBlock::from_bytes)
        }))
    }
}
