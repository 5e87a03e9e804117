//! Ingestion loop: the receiving side of one connection
//!
//! Receives batches one at a time and hands each to a [`BatchSink`] in stream
//! order. A closed stream is a normal end; a malformed stream is reported.
//!
//! `receive` has no timeout. A peer that stops sending without closing the
//! transport stalls the loop until the connection is closed from elsewhere, for
//! example through a [`CloseHandle`](crate::connection::CloseHandle).

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::{ConnectionError, IngestError};
use crate::sink::BatchSink;

/// Summary of a finished ingestion loop
#[derive(Debug)]
pub struct IngestSummary {
    pub peer: String,
    pub batches_received: u64,
    pub records_received: u64,
    /// The read failure that ended the stream
    pub ended_by: ConnectionError,
}

/// Receive batches until the stream ends, feeding `sink` in order.
///
/// Returns `Ok` when the peer closes or the connection is closed locally, and
/// `Err` for protocol violations and sink failures. The connection is closed and
/// the sink finished on every path.
pub async fn ingest<S, K>(mut connection: Connection<S>, sink: &mut K) -> Result<IngestSummary, IngestError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    K: BatchSink + ?Sized,
{
    let peer = connection.peer().to_string();
    info!(peer = %peer, "Ingestion started");

    let mut batches_received = 0u64;
    let mut records_received = 0u64;

    let outcome = loop {
        let batch = match connection.receive().await {
            Ok(batch) => batch,
            Err(ConnectionError::ProtocolViolation(source)) => {
                warn!(peer = %peer, "Protocol violation: {}", source);
                break Err(IngestError::Protocol { peer: peer.clone(), source });
            }
            Err(e) => {
                if !e.is_peer_departure() {
                    warn!(peer = %peer, "Unexpected receive error: {}", e);
                }
                debug!(peer = %peer, "Stream ended: {}", e);
                break Ok(e);
            }
        };

        batches_received += 1;
        records_received += batch.len() as u64;

        if let Err(e) = sink.accept(batch).await {
            warn!(peer = %peer, "Sink failed: {}", e);
            break Err(IngestError::Sink(e));
        }
    };

    connection.close().await;
    let finished = sink.finish().await;

    info!(peer = %peer, batches_received, records_received, "Ingestion stopped");

    let ended_by = outcome?;
    finished?;
    Ok(IngestSummary { peer, batches_received, records_received, ended_by })
}
