//! Acceptor side: accept loop plus one publisher task per peer.
//!
//! Every accepted connection gets its own [`Publisher`] on the runtime, so a
//! slow or departed peer never holds up another. All publishers share one
//! [`SampleSource`] and observe the same stop signal.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::publisher::{Publisher, PublisherConfig, PublisherReport, StopReason};
use crate::source::SampleSource;
use crate::transport::{Endpoint, Listener};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// What a server did before it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerReport {
    pub connections_accepted: u64,
    /// Publishers stopped because their peer went away
    pub disconnected: u64,
    /// Publishers stopped by a send error other than peer departure
    pub failed: u64,
    /// Publishers stopped by the stop signal
    pub cancelled: u64,
    /// Batches sent by all finished publishers
    pub batches_sent: u64,
}

impl ServerReport {
    /// Publishers that have stopped for any reason
    pub fn finished(&self) -> u64 {
        self.disconnected + self.failed + self.cancelled
    }

    fn record(&mut self, finished: &PublisherReport) {
        self.batches_sent += finished.batches_sent;
        match finished.stop_reason {
            StopReason::Disconnected(_) => self.disconnected += 1,
            StopReason::Failed(_) => self.failed += 1,
            StopReason::Cancelled => self.cancelled += 1,
        }
    }
}

/// Bound server, ready to accept
pub struct Server {
    listener: Listener,
    source: Arc<dyn SampleSource>,
    publisher: PublisherConfig,
}

impl Server {
    /// Bind the configured endpoint.
    pub async fn bind(config: &ServerConfig, source: Arc<dyn SampleSource>) -> Result<Self> {
        let listener = config.endpoint.bind().await?;
        Ok(Self { listener, source, publisher: config.publisher })
    }

    pub fn local_addr(&self) -> String {
        self.listener.local_addr()
    }

    /// Endpoint a client can dial to reach this server
    pub fn dial_endpoint(&self) -> Option<Endpoint> {
        self.listener.dial_endpoint()
    }

    /// Run the accept loop on the runtime until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> ServerHandle {
        let local_addr = self.local_addr();
        let dial_endpoint = self.dial_endpoint();
        let task = tokio::spawn(self.run(cancel.clone()));
        ServerHandle { local_addr, dial_endpoint, cancel, task }
    }

    /// Accept peers until `cancel` fires, then wait for every publisher to stop.
    pub async fn run(self, cancel: CancellationToken) -> ServerReport {
        let Server { listener, source, publisher } = self;
        let mut publishers = JoinSet::new();
        let mut report = ServerReport::default();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(joined) = publishers.join_next(), if !publishers.is_empty() => {
                    collect(&mut report, joined);
                }
                accepted = listener.accept() => match accepted {
                    Ok(connection) => {
                        report.connections_accepted += 1;
                        info!(peer = %connection.peer(), "Peer accepted");
                        let task = Publisher::new(
                            connection,
                            Arc::clone(&source),
                            publisher,
                            cancel.child_token(),
                        );
                        publishers.spawn(task.run());
                    }
                    Err(e) => {
                        error!("Accept failed: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        info!("Server stopping, {} publisher(s) running", publishers.len());
        drop(listener);

        while let Some(joined) = publishers.join_next().await {
            collect(&mut report, joined);
        }

        info!(connections_accepted = report.connections_accepted, "Server stopped");
        report
    }
}

fn collect(report: &mut ServerReport, joined: Result<PublisherReport, JoinError>) {
    match joined {
        Ok(finished) => {
            debug!(peer = %finished.peer, batches_sent = finished.batches_sent, "Publisher finished");
            report.record(&finished);
        }
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => warn!("Publisher task cancelled: {}", e),
    }
}

/// Running server
pub struct ServerHandle {
    local_addr: String,
    dial_endpoint: Option<Endpoint>,
    cancel: CancellationToken,
    task: JoinHandle<ServerReport>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }

    pub fn dial_endpoint(&self) -> Option<&Endpoint> {
        self.dial_endpoint.as_ref()
    }

    /// Whether the accept loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop accepting, stop every publisher and wait for all of them.
    pub async fn shutdown(self) -> Result<ServerReport, JoinError> {
        self.cancel.cancel();
        self.task.await
    }
}
