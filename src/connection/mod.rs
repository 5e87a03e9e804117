//! Connection: one established duplex stream plus batch send/receive.
//!
//! A [`Connection`] owns its stream exclusively. `send` and `receive` take
//! `&mut self`, so at most one operation per direction can be outstanding. When a
//! reader and a writer must run in different tasks, [`Connection::split`] hands
//! out one [`ConnectionReader`] and one [`ConnectionWriter`]; both observe the same
//! terminal close.
//!
//! ## Lifecycle
//!
//! ```text
//! Established ──close()──▶ Closing ──shutdown──▶ Closed
//! ```
//!
//! [`CloseHandle::close`] can be called from any task. Pending operations race
//! against the close signal and fail with `ConnectionAborted`; later operations
//! fail with `NotConnected`. The owner finishes the transition with
//! [`Connection::close`], which shuts the stream down.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::{ConnectionError, Result};
use crate::protocol::{codec, frame};
use crate::types::Batch;

/// Any duplex byte stream a connection can run over
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + ?Sized> ByteStream for T {}

/// Type-erased stream produced by the transport layer
pub type BoxedStream = Box<dyn ByteStream>;

/// Lifecycle state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Established,
    Closing,
    Closed,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Established,
            1 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

const ESTABLISHED: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// Traffic counters for one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConnectionStats {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// State shared by a connection, its halves and its close handles
#[derive(Debug)]
struct Shared {
    peer: Arc<str>,
    state: AtomicU8,
    closed: CancellationToken,
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

impl Shared {
    fn new(peer: Arc<str>) -> Self {
        Self {
            peer,
            state: AtomicU8::new(ESTABLISHED),
            closed: CancellationToken::new(),
            frames_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        }
    }

    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Start closing; returns true for the call that made the transition.
    fn begin_close(&self) -> bool {
        let first = self
            .state
            .compare_exchange(ESTABLISHED, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.closed.cancel();
        first
    }

    /// Finish closing; returns true for the call that made the transition.
    fn finish_close(&self) -> bool {
        self.state.swap(CLOSED, Ordering::AcqRel) != CLOSED
    }

    fn not_connected() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "connection closed")
    }

    fn aborted() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionAborted, "connection closed locally")
    }

    fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }

    async fn send_on<W>(&self, writer: &mut W, batch: &Batch) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if self.state() != ConnectionState::Established {
            return Err(ConnectionError::write_failed(Self::not_connected()));
        }

        let payload = codec::encode(batch);
        let written = tokio::select! {
            biased;
            _ = self.closed.cancelled() => {
                return Err(ConnectionError::write_failed(Self::aborted()));
            }
            result = frame::write_frame(writer, &payload) => result?,
        };

        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(written as u64, Ordering::Relaxed);
        trace!(peer = %self.peer, records = batch.len(), bytes = written, "Sent batch");
        Ok(())
    }

    async fn receive_on<R>(&self, reader: &mut R) -> Result<Batch>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if self.state() != ConnectionState::Established {
            return Err(ConnectionError::read_failed(Self::not_connected()));
        }

        let body = tokio::select! {
            biased;
            _ = self.closed.cancelled() => {
                return Err(ConnectionError::read_failed(Self::aborted()));
            }
            result = frame::read_frame(reader) => result?,
        };

        let batch = codec::decode(&body)?;

        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add((frame::HEADER_SIZE + body.len()) as u64, Ordering::Relaxed);
        trace!(peer = %self.peer, records = batch.len(), bytes = body.len(), "Received batch");
        Ok(batch)
    }

    async fn shutdown<W>(&self, writer: &mut W)
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.begin_close();
        if let Err(e) = writer.shutdown().await {
            debug!(peer = %self.peer, "Shutdown reported error: {}", e);
        }
        if self.finish_close() {
            let stats = self.stats();
            info!(
                peer = %self.peer,
                frames_sent = stats.frames_sent,
                frames_received = stats.frames_received,
                "Connection closed"
            );
        }
    }
}

/// Cloneable handle that closes a connection from another task.
///
/// Closing wakes any pending `send` or `receive` on the connection.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    shared: Arc<Shared>,
}

impl CloseHandle {
    /// Signal the connection to close. Idempotent.
    pub fn close(&self) {
        if self.shared.begin_close() {
            debug!(peer = %self.shared.peer, "Close requested");
        }
    }

    /// Whether close has been requested or completed
    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    /// Wait until close is requested
    pub async fn closed(&self) {
        self.shared.closed.cancelled().await
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }
}

/// One established duplex stream with framed batch operations
pub struct Connection<S = BoxedStream> {
    stream: S,
    shared: Arc<Shared>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an established stream. `peer` labels the connection in logs.
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        let peer: Arc<str> = peer.into().into();
        debug!(peer = %peer, "Connection established");
        Self { stream, shared: Arc::new(Shared::new(peer)) }
    }

    /// Encode, frame and write one batch.
    ///
    /// Success means the transport accepted the bytes, not that the peer processed
    /// them. Any transport error, including a departed peer, is `WriteFailed`.
    pub async fn send(&mut self, batch: &Batch) -> Result<()> {
        self.shared.send_on(&mut self.stream, batch).await
    }

    /// Read one frame and decode it.
    ///
    /// End of stream and transport errors are `ReadFailed`; a malformed frame or
    /// payload is `ProtocolViolation`.
    pub async fn receive(&mut self) -> Result<Batch> {
        self.shared.receive_on(&mut self.stream).await
    }

    /// Best-effort shutdown of the stream. Idempotent.
    pub async fn close(&mut self) {
        self.shared.shutdown(&mut self.stream).await
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle { shared: Arc::clone(&self.shared) }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn peer(&self) -> &str {
        &self.shared.peer
    }

    pub fn stats(&self) -> ConnectionStats {
        self.shared.stats()
    }

    /// Split into a receive half and a send half sharing one lifecycle.
    pub fn split(self) -> (ConnectionReader<ReadHalf<S>>, ConnectionWriter<WriteHalf<S>>) {
        let (read, write) = tokio::io::split(self.stream);
        (
            ConnectionReader { reader: read, shared: Arc::clone(&self.shared) },
            ConnectionWriter { writer: write, shared: self.shared },
        )
    }
}

/// Receive half of a split connection
pub struct ConnectionReader<R> {
    reader: R,
    shared: Arc<Shared>,
}

impl<R: AsyncRead + Unpin> ConnectionReader<R> {
    pub async fn receive(&mut self) -> Result<Batch> {
        self.shared.receive_on(&mut self.reader).await
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle { shared: Arc::clone(&self.shared) }
    }

    pub fn peer(&self) -> &str {
        &self.shared.peer
    }
}

/// Send half of a split connection
pub struct ConnectionWriter<W> {
    writer: W,
    shared: Arc<Shared>,
}

impl<W: AsyncWrite + Unpin> ConnectionWriter<W> {
    pub async fn send(&mut self, batch: &Batch) -> Result<()> {
        self.shared.send_on(&mut self.writer, batch).await
    }

    /// Close both halves and shut down the write direction.
    pub async fn close(&mut self) {
        self.shared.shutdown(&mut self.writer).await
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle { shared: Arc::clone(&self.shared) }
    }

    pub fn stats(&self) -> ConnectionStats {
        self.shared.stats()
    }
}

#[cfg(test)]
mod tests;
