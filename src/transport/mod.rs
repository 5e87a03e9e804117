//! Acceptor and dialer over TCP or Unix domain sockets.
//!
//! The transport is a deployment choice; both kinds produce the same
//! [`Connection`] and carry identical bytes.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::connection::{BoxedStream, Connection};
use crate::error::{ConnectionError, Result};

/// Default TCP port
pub const DEFAULT_PORT: u16 = 12345;

/// Default host dialed by clients
pub const DEFAULT_HOST: &str = "localhost";

/// Default address servers listen on
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default Unix socket path
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/gazestream/streams";

/// Where to listen or connect
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Endpoint {
    /// TCP host and port
    Tcp { host: String, port: u16 },
    /// Unix domain socket path
    Unix { path: PathBuf },
}

impl Endpoint {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp { host: host.into(), port }
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Interpret a port-or-path command line argument.
    ///
    /// Anything that parses as a port number is TCP on `host`; everything else is a
    /// socket path.
    pub fn from_target(host: &str, target: &str) -> Self {
        match target.parse::<u16>() {
            Ok(port) => Self::tcp(host, port),
            Err(_) => Self::unix(target),
        }
    }

    /// Bind a listener on this endpoint.
    ///
    /// For Unix sockets a stale socket file is removed and the parent directory
    /// created first.
    pub async fn bind(&self) -> Result<Listener> {
        let bind_err = |source| ConnectionError::Bind { endpoint: self.to_string(), source };

        let inner = match self {
            Self::Tcp { host, port } => {
                let listener =
                    TcpListener::bind((host.as_str(), *port)).await.map_err(bind_err)?;
                ListenerKind::Tcp(listener)
            }
            #[cfg(unix)]
            Self::Unix { path } => {
                prepare_socket_path(path).map_err(bind_err)?;
                let listener = tokio::net::UnixListener::bind(path).map_err(bind_err)?;
                ListenerKind::Unix { listener, path: path.clone() }
            }
            #[cfg(not(unix))]
            Self::Unix { .. } => return Err(bind_err(unsupported())),
        };

        let listener = Listener { inner };
        info!("Listening on {}", listener.local_addr());
        Ok(listener)
    }

    /// Resolve and connect once. No retry.
    pub async fn connect(&self) -> Result<Connection> {
        let connect_err = |source| ConnectionError::Connect { endpoint: self.to_string(), source };

        let stream: BoxedStream = match self {
            Self::Tcp { host, port } => {
                let stream =
                    TcpStream::connect((host.as_str(), *port)).await.map_err(connect_err)?;
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY: {}", e);
                }
                Box::new(stream)
            }
            #[cfg(unix)]
            Self::Unix { path } => {
                Box::new(tokio::net::UnixStream::connect(path).await.map_err(connect_err)?)
            }
            #[cfg(not(unix))]
            Self::Unix { .. } => return Err(connect_err(unsupported())),
        };

        info!("Connected to {}", self);
        Ok(Connection::new(stream, self.to_string()))
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::tcp(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
            Self::Unix { path } => write!(f, "unix://{}", path.display()),
        }
    }
}

#[cfg(not(unix))]
fn unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "Unix sockets are not available on this platform")
}

#[cfg(unix)]
fn prepare_socket_path(path: &Path) -> io::Result<()> {
    if path.exists() {
        debug!("Removing stale socket {}", path.display());
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

enum ListenerKind {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix { listener: tokio::net::UnixListener, path: PathBuf },
}

/// Bound listener that accepts connections
pub struct Listener {
    inner: ListenerKind,
}

impl Listener {
    /// Accept the next peer.
    pub async fn accept(&self) -> Result<Connection> {
        match &self.inner {
            ListenerKind::Tcp(listener) => {
                let (stream, addr) =
                    listener.accept().await.map_err(|source| ConnectionError::Accept { source })?;
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                }
                Ok(Connection::new(Box::new(stream) as BoxedStream, format!("tcp://{}", addr)))
            }
            #[cfg(unix)]
            ListenerKind::Unix { listener, path } => {
                let (stream, _addr) =
                    listener.accept().await.map_err(|source| ConnectionError::Accept { source })?;
                Ok(Connection::new(Box::new(stream) as BoxedStream, format!("unix://{}", path.display())))
            }
        }
    }

    /// Printable local address, including the OS-assigned port for port 0
    pub fn local_addr(&self) -> String {
        match &self.inner {
            ListenerKind::Tcp(listener) => match listener.local_addr() {
                Ok(addr) => format!("tcp://{}", addr),
                Err(_) => "tcp://<unknown>".to_string(),
            },
            #[cfg(unix)]
            ListenerKind::Unix { path, .. } => format!("unix://{}", path.display()),
        }
    }

    /// Endpoint a client can dial to reach this listener
    pub fn dial_endpoint(&self) -> Option<Endpoint> {
        match &self.inner {
            ListenerKind::Tcp(listener) => {
                let addr = listener.local_addr().ok()?;
                let host = if addr.ip().is_unspecified() {
                    DEFAULT_HOST.to_string()
                } else {
                    addr.ip().to_string()
                };
                Some(Endpoint::tcp(host, addr.port()))
            }
            #[cfg(unix)]
            ListenerKind::Unix { path, .. } => Some(Endpoint::unix(path.clone())),
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let ListenerKind::Unix { path, .. } = &self.inner {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to remove socket {}: {}", path.display(), e);
            }
        }
    }
}
