//! Publisher loop: the sending side of one connection
//!
//! ```text
//! Idle ──▶ Scheduled ──tick──▶ Sending ──ok──▶ Scheduled ──▶ ...
//!              │                   │
//!              └──── cancel ───────┴──── send failed ──▶ Stopped
//! ```
//!
//! Each tick pulls one batch from the shared [`SampleSource`] and sends it. The
//! next tick is scheduled from the previous deadline, so send latency does not
//! shift the cadence. A failed send is the only disconnect detection; there is no
//! heartbeat.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::duration_ms;
use crate::connection::Connection;
use crate::error::{ConfigError, ConnectionError};
use crate::protocol::MAX_FRAME_SIZE;
use crate::protocol::codec::{COUNT_SIZE, RECORD_SIZE};
use crate::source::SampleSource;
use crate::stream::Ticker;

/// Publishing cadence and batch shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Records per tick
    pub batch_size: usize,

    /// Time between ticks
    #[serde(rename = "tick_period_ms", with = "duration_ms")]
    pub tick_period: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self { batch_size: 1, tick_period: Duration::from_secs(1) }
    }
}

impl PublisherConfig {
    /// Largest batch whose encoding fits in one frame
    pub const fn max_batch_size() -> usize {
        (MAX_FRAME_SIZE - COUNT_SIZE) / RECORD_SIZE
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                details: "must be at least 1".to_string(),
            });
        }
        if self.batch_size > Self::max_batch_size() {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                details: format!(
                    "{} records do not fit in one frame; at most {}",
                    self.batch_size,
                    Self::max_batch_size()
                ),
            });
        }
        if self.tick_period.is_zero() {
            return Err(ConfigError::Invalid {
                field: "tick_period_ms",
                details: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Where a publisher loop is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    Idle,
    Scheduled,
    Sending,
    Stopped,
}

/// Why a publisher loop stopped
#[derive(Debug)]
pub enum StopReason {
    /// The stop signal fired
    Cancelled,
    /// The peer went away; a send reported `WriteFailed`
    Disconnected(ConnectionError),
    /// Sending failed for another reason
    Failed(ConnectionError),
}

/// Summary of one finished publisher loop
#[derive(Debug)]
pub struct PublisherReport {
    pub peer: String,
    pub batches_sent: u64,
    pub records_sent: u64,
    pub stop_reason: StopReason,
}

/// Periodic sender for one connection
pub struct Publisher<S> {
    connection: Connection<S>,
    source: Arc<dyn SampleSource>,
    config: PublisherConfig,
    cancel: CancellationToken,
    state: watch::Sender<PublisherState>,
}

impl<S> Publisher<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        connection: Connection<S>,
        source: Arc<dyn SampleSource>,
        config: PublisherConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(PublisherState::Idle);
        Self { connection, source, config, cancel, state }
    }

    /// Observe state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<PublisherState> {
        self.state.subscribe()
    }

    /// State transitions as a stream, starting with the current state
    pub fn state_updates(&self) -> WatchStream<PublisherState> {
        WatchStream::new(self.state.subscribe())
    }

    fn set_state(&self, state: PublisherState) {
        self.state.send_replace(state);
    }

    /// Run until the peer departs or the stop signal fires.
    ///
    /// The connection is always closed before this returns.
    pub async fn run(mut self) -> PublisherReport {
        let peer = self.connection.peer().to_string();
        info!(
            peer = %peer,
            batch_size = self.config.batch_size,
            tick_ms = self.config.tick_period.as_millis() as u64,
            "Publisher started"
        );

        let mut batches_sent = 0u64;
        let mut records_sent = 0u64;

        let ticker = Ticker::new(self.config.tick_period);
        tokio::pin!(ticker);

        let stop_reason = loop {
            self.set_state(PublisherState::Scheduled);

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break StopReason::Cancelled,
                deadline = ticker.as_mut().tick() => {
                    trace!(peer = %peer, ?deadline, "Tick");
                }
            }

            // Tick boundary: honour a stop that raced the timer.
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let batch = self.source.next_batch(self.config.batch_size).await;
            self.set_state(PublisherState::Sending);

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break StopReason::Cancelled,
                result = self.connection.send(&batch) => result,
            };

            match result {
                Ok(()) => {
                    batches_sent += 1;
                    records_sent += batch.len() as u64;
                    debug!(peer = %peer, batches_sent, "Published batch");
                }
                Err(e) if e.is_peer_departure() => {
                    info!(peer = %peer, "Peer disconnected: {}", e);
                    break StopReason::Disconnected(e);
                }
                Err(e) => {
                    warn!(peer = %peer, "Publishing failed: {}", e);
                    break StopReason::Failed(e);
                }
            }
        };

        self.connection.close().await;
        self.set_state(PublisherState::Stopped);
        info!(peer = %peer, batches_sent, records_sent, "Publisher stopped");

        PublisherReport { peer, batches_sent, records_sent, stop_reason }
    }
}
