//! Per-stream chunk readers.
//!
//! Each child pipe gets its own spawned task that slices the byte stream
//! into chunks and forwards them over a bounded channel. A chunk is
//! everything up to and including the first `\n` in the buffered data, else
//! everything up to and including the first `\r` (live progress updates),
//! else the remaining bytes once the stream ends.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::exec::command::StreamSource;

/// Bytes drained from the pipe per read call.
const READ_BUF_SIZE: usize = 8 * 1024;

/// Chunks in flight per stream before the reader blocks on the coordinator.
const CHANNEL_DEPTH: usize = 64;

/// Find the end of the next chunk in `buf`, terminator included.
fn scan_chunk(buf: &[u8]) -> Option<usize> {
    if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
        return Some(pos + 1);
    }
    if let Some(pos) = buf.iter().position(|&b| b == b'\r') {
        return Some(pos + 1);
    }
    None
}

/// Spawn the reader task for one output stream.
pub(crate) fn spawn_chunk_reader<R>(
    stream: R,
    src: StreamSource,
) -> (mpsc::Receiver<Vec<u8>>, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    #[cfg(feature = "tracing")]
    let handle = {
        use tracing::Instrument;
        let span = tracing::debug_span!("chunk_reader", stream = %src);
        tokio::spawn(read_chunks(stream, tx).instrument(span))
    };
    #[cfg(not(feature = "tracing"))]
    let handle = {
        let _ = src;
        tokio::spawn(read_chunks(stream, tx))
    };
    (rx, handle)
}

async fn read_chunks<R>(mut stream: R, tx: mpsc::Sender<Vec<u8>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut pending: Vec<u8> = Vec::new();
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                while let Some(end) = scan_chunk(&pending) {
                    let chunk: Vec<u8> = pending.drain(..end).collect();
                    if tx.send(chunk).await.is_err() {
                        // Coordinator stopped servicing this stream.
                        return;
                    }
                }
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_e, "error reading child output stream");
                break;
            }
        }
    }
    // Bytes left without a terminator form the final chunk.
    if !pending.is_empty() {
        let _ = tx.send(pending).await;
    }
}
