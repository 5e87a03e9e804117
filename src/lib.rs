//! Length-prefixed record streaming for eye-tracker gaze telemetry.
//!
//! Gazestream moves batches of fixed-layout gaze records from a producer to any
//! number of consumers over a reliable, ordered byte stream (TCP or a Unix
//! domain socket).
//!
//! # Features
//!
//! - **Framing**: 8-byte hex length header, bounded frame size
//! - **Codec**: fixed 37-byte little-endian records, bit-exact floats
//! - **Independent peers**: one publisher task per accepted connection
//! - **Drift-free cadence**: ticks scheduled from the previous deadline
//! - **Recording**: console and timestamped CSV sinks
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gazestream::{Gazestream, MemorySink, ServerConfig, ClientConfig, SyntheticSource};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Gazestream::serve(&ServerConfig::default(), Arc::new(SyntheticSource::default()))
//!         .await?
//!         .spawn(CancellationToken::new());
//!
//!     let client = Gazestream::connect(&ClientConfig::default()).await?.spawn(MemorySink::new());
//!     tokio::time::sleep(std::time::Duration::from_secs(3)).await;
//!
//!     let received = client.stop().await?;
//!     println!("{:?}", received.result?);
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
pub mod types;

// Wire protocol and connections
pub mod connection;
pub mod protocol;
pub mod stream;
pub mod transport;

// Producing side
pub mod publisher;
pub mod server;
pub mod source;

// Consuming side
pub mod client;
pub mod ingest;
pub mod sink;

// Core exports
pub use error::*;
pub use types::*;

pub use config::{ClientConfig, ServerConfig};
pub use connection::{CloseHandle, Connection, ConnectionState, ConnectionStats};
pub use transport::{Endpoint, Listener};

// Role exports
pub use client::{Client, ClientHandle, ClientReport};
pub use ingest::{IngestSummary, ingest};
pub use publisher::{Publisher, PublisherConfig, PublisherReport, PublisherState, StopReason};
pub use server::{Server, ServerHandle, ServerReport};
pub use sink::{BatchSink, ConsoleSink, CsvSink, MemorySink, Tee};
pub use source::{FixedSource, SampleSource, SyntheticSource};

/// Unified entry point for both roles.
///
/// # Examples
///
/// ## Serving synthetic samples
/// ```rust,no_run
/// use std::sync::Arc;
/// use gazestream::{Gazestream, ServerConfig, SyntheticSource};
///
/// #[tokio::main]
/// async fn main() -> gazestream::Result<()> {
///     let server = Gazestream::serve(&ServerConfig::default(), Arc::new(SyntheticSource::default())).await?;
///     println!("Listening on {}", server.local_addr());
///     Ok(())
/// }
/// ```
///
/// ## Receiving
/// ```rust,no_run
/// use gazestream::{ClientConfig, Gazestream};
///
/// #[tokio::main]
/// async fn main() -> gazestream::Result<()> {
///     let client = Gazestream::connect(&ClientConfig::default()).await?;
///     println!("Connected to {}", client.peer());
///     Ok(())
/// }
/// ```
pub struct Gazestream;

impl Gazestream {
    /// Bind a server on the configured endpoint.
    ///
    /// The server does not accept until [`Server::spawn`] or [`Server::run`].
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Bind`] if the endpoint cannot be bound, for
    /// example when the port is in use or the socket directory is not writable.
    pub async fn serve(config: &ServerConfig, source: std::sync::Arc<dyn SampleSource>) -> Result<Server> {
        Server::bind(config, source).await
    }

    /// Connect to a server once. No retry.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Connect`] if the host cannot be resolved or
    /// nothing is listening.
    pub async fn connect(config: &ClientConfig) -> Result<Client> {
        Client::connect(config).await
    }
}
