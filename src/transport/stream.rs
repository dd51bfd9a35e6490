use super::{BufferView, InputPipe, OutputPipe, ReadResult, check_advance};
use crate::performance::PooledBuffer;
use crate::{BenchError, Result};
use bytes::Buf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::debug;

const MIN_READ_SIZE: usize = 512;

/// Inbound pipe over any tokio reader
///
/// Received bytes accumulate in one contiguous buffer, so the view handed to
/// the parser is always a single segment. Consumed bytes are dropped from the
/// front; the space is reclaimed the next time the buffer has to grow.
pub struct StreamInput<R> {
    reader: R,
    buffer: PooledBuffer,
    examined: usize,
    eof: bool,
    read_size: usize,
    idle_timeout: Option<Duration>,
    fault: Option<String>,
    completed: bool,
}

impl<R> StreamInput<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R, buffer: PooledBuffer) -> Self {
        let read_size = buffer.capacity().max(MIN_READ_SIZE);
        Self {
            reader,
            buffer,
            examined: 0,
            eof: false,
            read_size,
            idle_timeout: None,
            fault: None,
            completed: false,
        }
    }

    /// Fails a read that waits longer than `idle_timeout` for the peer
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// The error the read side was completed with, if any
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    async fn fill(&mut self) -> Result<usize> {
        self.buffer.reserve(self.read_size);
        let read = self.reader.read_buf(&mut *self.buffer);
        match self.idle_timeout {
            Some(limit) => timeout(limit, read)
                .await
                .map_err(|_| BenchError::Timeout(format!("no data from peer for {limit:?}")))?
                .map_err(BenchError::Io),
            None => read.await.map_err(BenchError::Io),
        }
    }
}

impl<R> InputPipe for StreamInput<R>
where
    R: AsyncRead + Unpin + Send,
{
    fn is_ready(&self) -> bool {
        self.eof || self.examined < self.buffer.len()
    }

    async fn read(&mut self) -> Result<ReadResult> {
        while !self.is_ready() {
            if self.fill().await? == 0 {
                self.eof = true;
            }
        }

        Ok(ReadResult {
            is_completed: self.eof,
        })
    }

    fn buffer(&self) -> BufferView<'_> {
        BufferView::single(&self.buffer)
    }

    fn advance_to(&mut self, consumed: usize, examined: usize) {
        check_advance(consumed, examined, self.buffer.len());
        self.buffer.advance(consumed);
        self.examined = examined - consumed;
    }

    fn complete(&mut self, error: Option<&BenchError>) {
        self.completed = true;
        if let Some(error) = error {
            self.fault = Some(error.to_string());
        }
    }
}

/// Outbound pipe over any tokio writer
///
/// Advanced bytes stay in one buffer until [`flush`](OutputPipe::flush) writes
/// them out in a single `write_all`. The region past the advanced bytes is
/// zero-filled scratch space handed out by `get_span`.
pub struct StreamOutput<W> {
    writer: W,
    buffer: PooledBuffer,
    committed: usize,
    segment_size: usize,
    flushes: u64,
    closed: bool,
}

impl<W> StreamOutput<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// `segment_size` is the smallest region requested from the buffer at a time
    pub fn new(writer: W, buffer: PooledBuffer, segment_size: usize) -> Self {
        Self {
            writer,
            buffer,
            committed: 0,
            segment_size: segment_size.max(1),
            flushes: 0,
            closed: false,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Bytes advanced but not flushed yet
    pub fn pending(&self) -> &[u8] {
        &self.buffer[..self.committed]
    }

    /// Number of flushes that actually wrote bytes
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<W> OutputPipe for StreamOutput<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn get_span(&mut self, size_hint: usize) -> &mut [u8] {
        let needed = size_hint.max(1);
        if self.buffer.len() - self.committed < needed {
            let grow = needed.max(self.segment_size);
            self.buffer.resize(self.committed + grow, 0);
        }
        &mut self.buffer[self.committed..]
    }

    fn advance(&mut self, count: usize) {
        assert!(
            count <= self.buffer.len() - self.committed,
            "advanced {count} bytes past the end of the writable region"
        );
        self.committed += count;
    }

    async fn flush(&mut self) -> Result<()> {
        if self.committed == 0 {
            return Ok(());
        }

        self.writer.write_all(&self.buffer[..self.committed]).await?;
        self.writer.flush().await?;
        self.buffer.clear();
        self.committed = 0;
        self.flushes += 1;
        Ok(())
    }

    async fn complete(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.flush().await {
            debug!(error = %e, "Failed to flush remaining output");
        }
        if let Err(e) = self.writer.shutdown().await {
            debug!(error = %e, "Failed to shut down write side");
        }
    }
}
