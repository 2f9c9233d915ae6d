// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io;
use std::pin::pin;

use axum::body::Body;
use bytes::Bytes;
use futures::StreamExt as _;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::car::BlockResolver;
use crate::metrics::{CONTENT_BYTES, HistogramTimerExt as _, STREAM_TIME};
use crate::unixfs::Entry;

/// Streams the content of `entry` into a response body.
///
/// The export runs on its own task and hands over one chunk at a time, so it only advances as
/// fast as the client reads. Dropping the body, for instance on client disconnect, cancels
/// `cancel`. A block already requested is still awaited, and the export stops before requesting
/// another one.
pub fn stream_body<R>(entry: Entry<R>, cancel: CancellationToken) -> Body
where
    R: BlockResolver + 'static,
{
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(1);
    let guard = cancel.clone().drop_guard();
    tokio::spawn(produce(entry, tx, cancel));

    Body::from_stream(futures::stream::unfold(
        (rx, guard),
        |(mut rx, guard)| async move { rx.recv().await.map(|chunk| (chunk, (rx, guard))) },
    ))
}

async fn produce<R: BlockResolver>(
    entry: Entry<R>,
    tx: mpsc::Sender<io::Result<Bytes>>,
    cancel: CancellationToken,
) {
    let _timer = STREAM_TIME.start_timer();
    let (cid, path) = (entry.cid, entry.path.clone());
    let mut content = pin!(entry.content());
    let mut sent = 0u64;
    loop {
        // The walk checks `cancel` between blocks
        match content.next().await {
            Some(Ok(chunk)) => {
                let len = chunk.len() as u64;
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = tx.send(Ok(chunk)) => if result.is_err() { break },
                }
                sent += len;
                CONTENT_BYTES.inc_by(len);
            }
            Some(Err(e)) => {
                warn!(%cid, %path, sent, "file export failed: {e}");
                let _ = tx.send(Err(io::Error::other(e))).await;
                return;
            }
            None => break,
        }
    }
    if cancel.is_cancelled() {
        debug!(%cid, %path, sent, "file stream cancelled");
    } else {
        debug!(%cid, %path, sent, "file stream complete");
    }
}
