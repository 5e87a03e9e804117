//! Error types for the gaze record stream.
//!
//! Errors are layered the same way the stream is:
//!
//! - **Frame Errors**: a header that is not a valid length encoding, or a payload
//!   too large to frame
//! - **Codec Errors**: a payload that ends before its declared records, or carries
//!   bytes after them
//! - **Connection Errors**: transport failures on one connection, plus the two
//!   errors above surfaced as a protocol violation
//! - **Ingest Errors**: the faults an ingestion loop reports to its caller
//!
//! ## Peer departure vs. faults
//!
//! A peer that goes away is ordinary: it ends the affected loop and nothing else.
//! A malformed stream is a fault that is reported.
//!
//! ```rust
//! use gazestream::ConnectionError;
//!
//! let gone = ConnectionError::read_failed(std::io::ErrorKind::UnexpectedEof.into());
//! assert!(gone.is_peer_departure());
//! for suggestion in gone.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for connection operations.
pub type Result<T, E = ConnectionError> = std::result::Result<T, E>;

/// Failure to interpret or produce a frame header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FrameError {
    #[error("Malformed frame header {header:?}: {reason}")]
    MalformedHeader { header: String, reason: String },

    #[error("Payload of {len} bytes exceeds maximum frame size of {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },
}

impl FrameError {
    /// Helper constructor for header errors, keeping a printable copy of the raw bytes.
    pub fn malformed_header(raw: &[u8], reason: impl Into<String>) -> Self {
        FrameError::MalformedHeader {
            header: String::from_utf8_lossy(raw).into_owned(),
            reason: reason.into(),
        }
    }
}

/// Failure to decode a batch payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    #[error("Payload truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Payload has {count} trailing bytes after the declared records")]
    TrailingBytes { count: usize },
}

/// A stream that does not follow the wire format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Main error type for connection operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConnectionError {
    #[error("Write to peer failed")]
    WriteFailed {
        #[source]
        source: io::Error,
    },

    #[error("Read from peer failed")]
    ReadFailed {
        #[source]
        source: io::Error,
    },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolError),

    #[error("Failed to bind {endpoint}")]
    Bind {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to connect to {endpoint}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to accept connection")]
    Accept {
        #[source]
        source: io::Error,
    },
}

impl ConnectionError {
    /// Returns whether this error is an ordinary peer departure.
    ///
    /// Peer departure ends only the affected connection and is not reported as a fault.
    pub fn is_peer_departure(&self) -> bool {
        matches!(self, ConnectionError::WriteFailed { .. } | ConnectionError::ReadFailed { .. })
    }

    /// Returns whether this error came from a malformed stream.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, ConnectionError::ProtocolViolation(_))
    }

    /// Returns suggested recovery actions for this error.
    ///
    /// Nothing in the stream retries automatically; these are for the operator.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ConnectionError::WriteFailed { .. } | ConnectionError::ReadFailed { .. } => {
                vec!["Peer closed the connection", "Reconnect if the peer is expected back"]
            }
            ConnectionError::ProtocolViolation(_) => vec![
                "Check that both peers run compatible versions",
                "Capture the stream and inspect the frame headers",
            ],
            ConnectionError::Bind { .. } => vec![
                "Check that the port or socket path is not already in use",
                "Check permissions on the socket directory",
            ],
            ConnectionError::Connect { .. } => vec![
                "Ensure the server is running",
                "Verify host, port or socket path",
            ],
            ConnectionError::Accept { .. } => {
                vec!["Check the process file descriptor limit", "Check system resources"]
            }
        }
    }

    /// Helper constructor for write failures.
    pub fn write_failed(source: io::Error) -> Self {
        ConnectionError::WriteFailed { source }
    }

    /// Helper constructor for read failures.
    pub fn read_failed(source: io::Error) -> Self {
        ConnectionError::ReadFailed { source }
    }
}

impl From<FrameError> for ConnectionError {
    fn from(err: FrameError) -> Self {
        ConnectionError::ProtocolViolation(err.into())
    }
}

impl From<CodecError> for ConnectionError {
    fn from(err: CodecError) -> Self {
        ConnectionError::ProtocolViolation(err.into())
    }
}

/// Failure inside a batch sink.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SinkError {
    #[error("Sink output error: {path}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Sink I/O error")]
    Io(#[from] io::Error),
}

/// Faults surfaced by an ingestion loop.
///
/// Peer departure is not among them: a closed stream ends the loop normally.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IngestError {
    #[error("Malformed stream from {peer}")]
    Protocol {
        peer: String,
        #[source]
        source: ProtocolError,
    },

    #[error("Sink rejected batch")]
    Sink(#[from] SinkError),
}

/// Failure to load configuration.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Config file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Config parse error in {path}: {details}")]
    Parse { path: PathBuf, details: String },

    #[error("Invalid config value for {field}: {details}")]
    Invalid { field: &'static str, details: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn frame_error_messages_carry_header_text(header in "[ -~]{0,8}", reason in ".*") {
            let err = FrameError::malformed_header(header.as_bytes(), reason.clone());
            let msg = err.to_string();
            prop_assert!(msg.contains(&reason));
            prop_assert!(!msg.is_empty());
        }

        #[test]
        fn truncation_message_reports_both_sizes(needed in 1usize..100_000, available in 0usize..100_000) {
            let msg = CodecError::Truncated { needed, available }.to_string();
            prop_assert!(msg.contains(&needed.to_string()));
            prop_assert!(msg.contains(&available.to_string()));
        }
    }

    #[test]
    fn peer_departure_classification() {
        let write = ConnectionError::write_failed(io::ErrorKind::BrokenPipe.into());
        let read = ConnectionError::read_failed(io::ErrorKind::UnexpectedEof.into());
        let violation: ConnectionError = CodecError::TrailingBytes { count: 3 }.into();

        assert!(write.is_peer_departure());
        assert!(read.is_peer_departure());
        assert!(!violation.is_peer_departure());
        assert!(violation.is_protocol_violation());
    }

    #[test]
    fn frame_and_codec_errors_become_protocol_violations() {
        let err: ConnectionError = FrameError::malformed_header(b"zz", "not hex").into();
        assert!(matches!(err, ConnectionError::ProtocolViolation(ProtocolError::Frame(_))));

        let err: ConnectionError = CodecError::Truncated { needed: 8, available: 2 }.into();
        assert!(matches!(err, ConnectionError::ProtocolViolation(ProtocolError::Codec(_))));
    }

    #[test]
    fn source_chain_is_preserved() {
        let err = ConnectionError::Connect {
            endpoint: "tcp://localhost:12345".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        let source = std::error::Error::source(&err).expect("connect error has a source");
        assert_eq!(source.to_string(), "refused");
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<ConnectionError>();
        assert_send_sync_static::<IngestError>();
        assert_send_sync_static::<ConfigError>();
    }

    #[test]
    fn recovery_methods_work() {
        let errors = [
            ConnectionError::write_failed(io::ErrorKind::BrokenPipe.into()),
            ConnectionError::from(FrameError::PayloadTooLarge { len: 10, max: 5 }),
            ConnectionError::Accept { source: io::ErrorKind::Other.into() },
        ];
        for err in &errors {
            let suggestions = err.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }
}
