//! Dialer side: one connection feeding one ingestion task.

use tokio::task::{JoinError, JoinHandle};
use tracing::info;

use crate::config::ClientConfig;
use crate::connection::{CloseHandle, Connection};
use crate::error::{IngestError, Result, SinkError};
use crate::ingest::{IngestSummary, ingest};
use crate::sink::{BatchSink, ConsoleSink, CsvSink, Tee};

/// Connected client, not yet receiving
pub struct Client {
    connection: Connection,
}

impl Client {
    /// Dial the configured endpoint once.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let connection = config.endpoint.connect().await?;
        Ok(Self { connection })
    }

    pub fn peer(&self) -> &str {
        self.connection.peer()
    }

    /// Start ingesting into `sink` on the runtime.
    pub fn spawn<K>(self, sink: K) -> ClientHandle<K>
    where
        K: BatchSink + 'static,
    {
        let close = self.connection.close_handle();
        let connection = self.connection;
        let task = tokio::spawn(async move {
            let mut sink = sink;
            let result = ingest(connection, &mut sink).await;
            ClientReport { result, sink }
        });
        ClientHandle { close, task }
    }
}

/// Sinks described by `config`: a CSV file, plus the console unless disabled.
pub fn recording_sink(config: &ClientConfig) -> Result<Box<dyn BatchSink>, SinkError> {
    let csv = CsvSink::create_in(&config.output_dir, config.subsecond_unit)?;
    if config.console {
        Ok(Box::new(Tee::new(ConsoleSink::stdout(config.subsecond_unit), csv)))
    } else {
        Ok(Box::new(csv))
    }
}

/// Outcome of a finished ingestion task, with the sink handed back
pub struct ClientReport<K> {
    pub result: Result<IngestSummary, IngestError>,
    pub sink: K,
}

/// Running client
pub struct ClientHandle<K> {
    close: CloseHandle,
    task: JoinHandle<ClientReport<K>>,
}

impl<K> ClientHandle<K> {
    /// Whether ingestion has ended on its own
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the connection is closed by either side.
    pub async fn closed(&self) {
        self.close.closed().await
    }

    /// Close the connection and wait for the ingestion task.
    ///
    /// Closing first wakes a task blocked in `receive`.
    pub async fn stop(self) -> Result<ClientReport<K>, JoinError> {
        info!("Stopping client");
        self.close.close();
        self.task.await
    }

    /// Wait for the stream to end without closing it.
    pub async fn join(self) -> Result<ClientReport<K>, JoinError> {
        self.task.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::transport::Endpoint;
    use crate::types::{Batch, GazeRecord};
    use std::time::Duration;

    async fn bound() -> (crate::transport::Listener, ClientConfig) {
        let listener = Endpoint::tcp("127.0.0.1", 0).bind().await.unwrap();
        let config = ClientConfig { endpoint: listener.dial_endpoint().unwrap(), ..Default::default() };
        (listener, config)
    }

    #[tokio::test]
    async fn stop_wakes_idle_ingestion() {
        let (listener, config) = bound().await;
        let client = Client::connect(&config).await.unwrap();
        let _server_side = listener.accept().await.unwrap();

        let handle = client.spawn(MemorySink::new());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        let report = tokio::time::timeout(Duration::from_secs(1), handle.stop()).await.unwrap().unwrap();
        let summary = report.result.unwrap();
        assert_eq!(summary.batches_received, 0);
        assert!(report.sink.is_finished());
    }

    #[tokio::test]
    async fn join_returns_after_server_closes() {
        let (listener, config) = bound().await;
        let handle = Client::connect(&config).await.unwrap().spawn(MemorySink::new());

        let mut server_side = listener.accept().await.unwrap();
        server_side.send(&Batch::single(GazeRecord { sequence_number: 7, ..Default::default() })).await.unwrap();
        server_side.close().await;

        let report = handle.join().await.unwrap();
        assert_eq!(report.result.unwrap().records_received, 1);
        assert_eq!(report.sink.batches()[0][0].sequence_number, 7);
    }

    #[tokio::test]
    async fn recording_sink_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            output_dir: dir.path().join("saved_data"),
            console: false,
            ..Default::default()
        };

        let mut sink = recording_sink(&config).unwrap();
        sink.accept(Batch::single(GazeRecord::default())).await.unwrap();
        sink.finish().await.unwrap();

        let files: Vec<_> = std::fs::read_dir(&config.output_dir).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn connect_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig { endpoint: Endpoint::unix(dir.path().join("none")), ..Default::default() };
        let err = Client::connect(&config).await.err().unwrap();
        assert!(matches!(err, crate::error::ConnectionError::Connect { .. }));
    }
}
