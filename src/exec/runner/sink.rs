//! Output destinations and per-stream fan-out.
//!
//! A destination only needs tokio's write/flush capability, so redirect
//! files, console handles and in-memory test buffers all plug in through
//! the same [`ChunkSink`] trait object.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::exec::command::StreamSource;
use crate::exec::error::ExecError;

/// A single output destination for captured chunks.
pub type ChunkSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Ordered fan-out of one stream to its destinations.
///
/// Each chunk is written to every sink in list order and flushed after each
/// write, so long-running children stay observable through redirect files
/// and the console alike. The first write or flush failure aborts with
/// [`ExecError::SinkWrite`]. A fan with no sinks drains chunks by
/// discarding them.
pub struct StreamFan {
    stream: StreamSource,
    sinks: Vec<ChunkSink>,
}

impl StreamFan {
    pub fn new(stream: StreamSource) -> Self {
        StreamFan {
            stream,
            sinks: Vec::new(),
        }
    }

    pub fn push(&mut self, sink: ChunkSink) {
        self.sinks.push(sink);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Write one chunk to every destination in order, flushing per sink.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), ExecError> {
        let stream = self.stream;
        for sink in &mut self.sinks {
            sink.write_all(chunk)
                .await
                .map_err(|source| ExecError::SinkWrite { stream, source })?;
            sink.flush()
                .await
                .map_err(|source| ExecError::SinkWrite { stream, source })?;
        }
        Ok(())
    }

    /// Shut down every sink, closing redirect files.
    ///
    /// Close failures are logged and never override the run result.
    pub async fn close(&mut self) {
        for sink in &mut self.sinks {
            if let Err(_e) = sink.shutdown().await {
                #[cfg(feature = "tracing")]
                tracing::warn!(stream = %self.stream, error = %_e, "failed to close output sink");
            }
        }
    }
}

impl std::fmt::Debug for StreamFan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamFan")
            .field("stream", &self.stream)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Open a redirect target with create-or-truncate semantics.
pub async fn file_sink(path: &str) -> Result<ChunkSink, ExecError> {
    let file = File::create(path)
        .await
        .map_err(|source| ExecError::RedirectOpen {
            path: path.to_owned(),
            source,
        })?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Console destination for the given stream, used when echo is enabled.
pub fn console_sink(stream: StreamSource) -> ChunkSink {
    match stream {
        StreamSource::Stdout => Box::new(BufWriter::new(tokio::io::stdout())),
        StreamSource::Stderr => Box::new(BufWriter::new(tokio::io::stderr())),
    }
}

/// In-memory sink for tests and custom capture.
///
/// The buffer handle from [`contents`](MemorySink::contents) stays readable
/// after the sink itself has been handed to a runner.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of everything written so far.
    pub fn contents(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.buf)
    }
}

impl AsyncWrite for MemorySink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.buf.lock() {
            Ok(mut guard) => {
                guard.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }
            Err(_) => Poll::Ready(Err(io::Error::other("memory sink lock poisoned"))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
