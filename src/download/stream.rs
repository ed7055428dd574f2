//! Parallel chunked stream download.
//!
//! A known-length download is partitioned into ranged requests fanned out
//! over a small worker pool. Workers claim chunk indices from an atomic
//! counter and deliver each chunk through its own single-use channel; a
//! single assembler forwards the chunks to the reader strictly in order, so
//! the consumer sees one contiguous byte stream without the whole payload
//! being buffered. The first failure anywhere closes the stream with that
//! error and cancels every peer.

use crate::error::YtError;
use crate::platform::http::{self, ContextInfo};
use crate::utils::url::set_query_param;
use bytes::Bytes;
use futures_util::StreamExt;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Default chunk size: 10 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;
/// Default worker fan-out.
pub const DEFAULT_MAX_ROUTINES: usize = 10;

/// Ordered byte stream handed to the caller.
pub type VideoStream = StreamReader<ReceiverStream<io::Result<Bytes>>, Bytes>;

/// One claimed byte range `[start, end]` and its delivery slot.
struct ChunkSlot {
    start: u64,
    end: u64,
    sender: Mutex<Option<oneshot::Sender<Bytes>>>,
}

/// Partition `[0, total_size)` into closed ranges of at most `chunk_size`.
pub(crate) fn chunk_ranges(total_size: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < total_size {
        let end = (start + chunk_size - 1).min(total_size - 1);
        ranges.push((start, end));
        start += chunk_size;
    }
    ranges
}

/// Open the stream behind `url`.
///
/// With a known content length the download is chunked; without one a
/// single GET is issued and the reported length comes from the response
/// header (0 when absent).
pub async fn get_stream(
    ctx: ContextInfo,
    url: Url,
    content_length: u64,
    chunk_size: u64,
    max_routines: usize,
) -> Result<(VideoStream, u64), YtError> {
    if content_length == 0 {
        download_once(ctx, url).await
    } else {
        download_chunked(ctx, url, content_length, chunk_size, max_routines).await
    }
}

/// Unknown length: one request, one producer copying the body through.
async fn download_once(ctx: ContextInfo, url: Url) -> Result<(VideoStream, u64), YtError> {
    let response = http::execute(&ctx, ctx.http.get(url)).await?;

    let total = response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);

    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(1);
    let cancel = ctx.cancel.clone();

    tokio::spawn(async move {
        let mut stream = response.bytes_stream();
        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let _ = tx.send(Err(io::Error::other(YtError::Cancelled))).await;
                    return;
                }
                item = stream.next() => item,
            };

            match item {
                Some(Ok(data)) => {
                    if tx.send(Ok(data)).await.is_err() {
                        return;
                    }
                }
                Some(Err(err)) => {
                    let _ = tx.send(Err(io::Error::other(YtError::from(err)))).await;
                    return;
                }
                None => return,
            }
        }
    });

    Ok((StreamReader::new(ReceiverStream::new(rx)), total))
}

/// Known length: ranged fan-out plus in-order assembly.
async fn download_chunked(
    ctx: ContextInfo,
    url: Url,
    content_length: u64,
    chunk_size: u64,
    max_routines: usize,
) -> Result<(VideoStream, u64), YtError> {
    let ranges = chunk_ranges(content_length, chunk_size);
    let chunk_count = ranges.len();
    let max_workers = max_routines.clamp(1, chunk_count.max(1));

    let mut receivers = Vec::with_capacity(chunk_count);
    let mut slots = Vec::with_capacity(chunk_count);
    for (start, end) in ranges {
        let (tx, rx) = oneshot::channel();
        receivers.push(rx);
        slots.push(ChunkSlot {
            start,
            end,
            sender: Mutex::new(Some(tx)),
        });
    }
    let slots = Arc::new(slots);

    // Derived cancellation scope: the first error (or the caller's token)
    // unblocks all peers.
    let scope = ctx.cancel.child_token();
    let first_error: Arc<Mutex<Option<YtError>>> = Arc::new(Mutex::new(None));
    let next_chunk = Arc::new(AtomicUsize::new(0));

    debug!(chunk_count, max_workers, "starting chunked download");

    for worker in 0..max_workers {
        let ctx = ContextInfo {
            cancel: scope.clone(),
            ..ctx.clone()
        };
        let url = url.clone();
        let slots = slots.clone();
        let next_chunk = next_chunk.clone();
        let first_error = first_error.clone();
        let scope = scope.clone();

        tokio::spawn(async move {
            loop {
                if scope.is_cancelled() {
                    return;
                }

                let index = next_chunk.fetch_add(1, Ordering::SeqCst);
                if index >= slots.len() {
                    return;
                }
                let slot = &slots[index];

                match fetch_chunk(&ctx, &url, slot).await {
                    Ok(data) => {
                        let sender = slot.sender.lock().unwrap().take();
                        if let Some(sender) = sender {
                            if sender.send(data).is_err() {
                                // Assembler is gone; nothing left to feed.
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        warn!(worker, chunk = index, error = %err, "chunk download failed");
                        abort(&first_error, &scope, err);
                        return;
                    }
                }
            }
        });
    }

    let (out_tx, out_rx) = mpsc::channel::<io::Result<Bytes>>(1);
    {
        let scope = scope.clone();
        let first_error = first_error.clone();

        tokio::spawn(async move {
            for rx in receivers {
                let data = tokio::select! {
                    biased;
                    _ = scope.cancelled() => {
                        let err = take_error(&first_error);
                        let _ = out_tx.send(Err(io::Error::other(err))).await;
                        return;
                    }
                    result = rx => match result {
                        Ok(data) => data,
                        Err(_) => {
                            // Producer dropped its slot without sending:
                            // it failed and cancelled the scope already.
                            let err = take_error(&first_error);
                            let _ = out_tx.send(Err(io::Error::other(err))).await;
                            return;
                        }
                    },
                };

                if out_tx.send(Ok(data)).await.is_err() {
                    // Reader went away; unblock the workers.
                    scope.cancel();
                    return;
                }
            }
            // Every chunk forwarded in order; dropping out_tx closes the
            // stream cleanly.
        });
    }

    Ok((StreamReader::new(ReceiverStream::new(out_rx)), content_length))
}

/// Record the first error and cancel the shared scope.
fn abort(first_error: &Mutex<Option<YtError>>, scope: &CancellationToken, err: YtError) {
    {
        let mut slot = first_error.lock().unwrap();
        if slot.is_none() {
            *slot = Some(err);
        }
    }
    scope.cancel();
}

fn take_error(first_error: &Mutex<Option<YtError>>) -> YtError {
    first_error
        .lock()
        .unwrap()
        .take()
        .unwrap_or(YtError::Cancelled)
}

/// Fetch one chunk via the `range` query parameter (the service treats it
/// as equivalent to a `Range:` header) and verify the exact byte count.
async fn fetch_chunk(ctx: &ContextInfo, url: &Url, slot: &ChunkSlot) -> Result<Bytes, YtError> {
    let mut chunk_url = url.clone();
    set_query_param(&mut chunk_url, "range", &format!("{}-{}", slot.start, slot.end));

    let response = http::execute(ctx, ctx.http.get(chunk_url)).await?;
    let data = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return Err(YtError::Cancelled),
        result = response.bytes() => result?,
    };

    let expected = (slot.end - slot.start + 1) as usize;
    if data.len() != expected {
        return Err(YtError::Validation(format!(
            "chunk at offset {} has invalid size: expected={} actual={}",
            slot.start,
            expected,
            data.len()
        )));
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::http::test_support::offline_ctx;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const MIB: u64 = 1_048_576;

    fn pattern_body(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    /// Minimal HTTP fixture serving `body`. Honours the `range=<s>-<e>`
    /// query parameter; can fail the chunk starting at `fail_at_offset`
    /// with a 500, and can delay earlier chunks so later ones land first.
    async fn spawn_fixture(
        body: Vec<u8>,
        fail_at_offset: Option<u64>,
        scramble_timing: bool,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = Arc::new(body);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let body = body.clone();

                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let mut read = 0;
                    loop {
                        match socket.read(&mut buf[read..]).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => read += n,
                        }
                        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                        if read == buf.len() {
                            break;
                        }
                    }

                    let head = String::from_utf8_lossy(&buf[..read]).into_owned();
                    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let range = path.split("range=").nth(1).map(|raw| {
                        let raw = raw.split('&').next().unwrap_or(raw);
                        let (s, e) = raw.split_once('-').unwrap_or(("0", "0"));
                        (
                            s.parse::<u64>().unwrap_or(0),
                            e.parse::<u64>().unwrap_or(0),
                        )
                    });

                    let (status, slice) = match range {
                        Some((start, _)) if fail_at_offset == Some(start) => (500, Vec::new()),
                        Some((start, end)) => {
                            let lo = (start as usize).min(body.len());
                            let hi = ((end + 1) as usize).min(body.len());
                            (200, body[lo..hi.max(lo)].to_vec())
                        }
                        None => (200, body.to_vec()),
                    };

                    if scramble_timing {
                        if let Some((start, _)) = range {
                            // Earlier chunks respond slower than later ones.
                            let delay = 150u64.saturating_sub(start / 16_384);
                            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                        }
                    }

                    let reason = if status == 200 { "OK" } else { "Internal Server Error" };
                    let head = format!(
                        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        slice.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(&slice).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{addr}/stream")
    }

    #[test]
    fn test_chunk_ranges_partition() {
        let ranges = chunk_ranges(2_621_440, MIB);
        assert_eq!(
            ranges,
            vec![(0, 1_048_575), (1_048_576, 2_097_151), (2_097_152, 2_621_439)]
        );

        // Exact multiple: no runt chunk.
        assert_eq!(chunk_ranges(2 * MIB, MIB).len(), 2);
        // Smaller than one chunk.
        assert_eq!(chunk_ranges(100, MIB), vec![(0, 99)]);
        // Empty input.
        assert!(chunk_ranges(0, MIB).is_empty());
    }

    #[tokio::test]
    async fn test_chunked_download_matches_source() {
        let body = pattern_body(2_621_440);

        for max_routines in [1usize, 3, 10] {
            let url = spawn_fixture(body.clone(), None, false).await;
            let ctx = offline_ctx();

            let (mut reader, total) = get_stream(
                ctx,
                Url::parse(&url).unwrap(),
                body.len() as u64,
                MIB,
                max_routines,
            )
            .await
            .unwrap();
            assert_eq!(total, body.len() as u64);

            let mut out = Vec::new();
            reader.read_to_end(&mut out).await.unwrap();
            assert_eq!(out.len(), body.len(), "routines={max_routines}");
            assert_eq!(out, body, "routines={max_routines}");
        }
    }

    #[tokio::test]
    async fn test_chunk_order_preserved_under_interleaving() {
        // Later chunks respond faster; output must still be in order.
        let body = pattern_body(2_621_440);
        let url = spawn_fixture(body.clone(), None, true).await;
        let ctx = offline_ctx();

        let (mut reader, _) = get_stream(
            ctx,
            Url::parse(&url).unwrap(),
            body.len() as u64,
            MIB,
            3,
        )
        .await
        .unwrap();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, body);
    }

    #[tokio::test]
    async fn test_unknown_length_single_get() {
        let body = pattern_body(300_000);
        let url = spawn_fixture(body.clone(), None, false).await;
        let ctx = offline_ctx();

        let (mut reader, total) = get_stream(ctx, Url::parse(&url).unwrap(), 0, MIB, 10)
            .await
            .unwrap();
        // Length reported from the Content-Length header.
        assert_eq!(total, body.len() as u64);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, body);
    }

    #[tokio::test]
    async fn test_worker_failure_surfaces_status_error() {
        let body = pattern_body(2_621_440);
        // Second chunk's request answers 500.
        let url = spawn_fixture(body.clone(), Some(MIB), false).await;
        let ctx = offline_ctx();

        let (mut reader, _) = get_stream(
            ctx,
            Url::parse(&url).unwrap(),
            body.len() as u64,
            MIB,
            3,
        )
        .await
        .unwrap();

        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).await.unwrap_err();
        let inner = err.get_ref().expect("wrapped error").to_string();
        assert!(
            inner.contains("unexpected status code: 500"),
            "got: {inner}"
        );
    }

    #[tokio::test]
    async fn test_chunk_size_mismatch_is_validation_error() {
        // Server body shorter than the advertised content length: the last
        // chunk comes back short.
        let body = pattern_body(1_500_000);
        let url = spawn_fixture(body, None, false).await;
        let ctx = offline_ctx();

        let (mut reader, _) = get_stream(ctx, Url::parse(&url).unwrap(), 2_621_440, MIB, 3)
            .await
            .unwrap();

        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).await.unwrap_err();
        let inner = err.get_ref().expect("wrapped error").to_string();
        assert!(inner.contains("invalid size"), "got: {inner}");
    }

    #[tokio::test]
    async fn test_cancellation_mid_stream() {
        let body = pattern_body(2_621_440);
        // Delays keep the first chunk in flight long enough to cancel.
        let url = spawn_fixture(body.clone(), None, true).await;
        let ctx = offline_ctx();
        let cancel = ctx.cancel.clone();

        let (mut reader, _) = get_stream(
            ctx,
            Url::parse(&url).unwrap(),
            body.len() as u64,
            MIB,
            3,
        )
        .await
        .unwrap();

        cancel.cancel();

        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).await.unwrap_err();
        let inner = err.get_ref().expect("wrapped error").to_string();
        assert!(inner.contains("cancelled"), "got: {inner}");
    }
}
