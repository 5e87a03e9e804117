//! Server and client configuration
//!
//! Both configs have working defaults and can be loaded from YAML:
//!
//! ```yaml
//! endpoint:
//!   type: unix
//!   path: /tmp/gazestream/streams
//! publisher:
//!   batch_size: 10
//!   tick_period_ms: 100
//! subsecond_unit: nanos
//! ```

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::publisher::PublisherConfig;
use crate::transport::{DEFAULT_BIND_HOST, DEFAULT_PORT, Endpoint};
use crate::types::SubsecondUnit;

/// Default directory for recorded CSV files
pub const DEFAULT_OUTPUT_DIR: &str = "./saved_data";

/// Publishing side configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub endpoint: Endpoint,
    pub publisher: PublisherConfig,
    pub subsecond_unit: SubsecondUnit,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::tcp(DEFAULT_BIND_HOST, DEFAULT_PORT),
            publisher: PublisherConfig::default(),
            subsecond_unit: SubsecondUnit::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = load_yaml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.publisher.validate()
    }
}

/// Receiving side configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    /// Directory for the per-run CSV file
    pub output_dir: PathBuf,
    /// Print each record to stdout
    pub console: bool,
    pub subsecond_unit: SubsecondUnit,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            console: true,
            subsecond_unit: SubsecondUnit::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_yaml(path.as_ref())
    }
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::File { path: path.to_path_buf(), source })?;
    serde_yaml_ng::from_str(&text)
        .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), details: e.to_string() })
}

/// Serde adapter storing a `Duration` as whole milliseconds
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::transport::DEFAULT_SOCKET_PATH;

    #[test]
    fn defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.endpoint, Endpoint::tcp("0.0.0.0", 12345));
        assert_eq!(server.publisher.batch_size, 1);
        assert_eq!(server.publisher.tick_period, Duration::from_secs(1));

        let client = ClientConfig::default();
        assert_eq!(client.endpoint, Endpoint::tcp("localhost", 12345));
        assert_eq!(client.output_dir, PathBuf::from("./saved_data"));
        assert!(client.console);
    }

    #[test]
    fn loads_partial_yaml_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        std::fs::write(
            &path,
            format!(
                "endpoint:\n  type: unix\n  path: {}\npublisher:\n  tick_period_ms: 100\nsubsecond_unit: nanos\n",
                DEFAULT_SOCKET_PATH
            ),
        )
        .unwrap();

        let config = ServerConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.endpoint, Endpoint::unix(DEFAULT_SOCKET_PATH));
        assert_eq!(config.publisher.batch_size, 1);
        assert_eq!(config.publisher.tick_period, Duration::from_millis(100));
        assert_eq!(config.subsecond_unit, SubsecondUnit::Nanos);
    }

    #[test]
    fn invalid_publisher_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        std::fs::write(&path, "publisher:\n  batch_size: 0\n").unwrap();

        let err = ServerConfig::from_yaml_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "batch_size", .. }));
    }

    #[test]
    fn missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ClientConfig::from_yaml_file(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigError::File { .. }));

        let path = dir.path().join("client.yaml");
        std::fs::write(&path, "console: [not, a, bool]\n").unwrap();
        let malformed = ClientConfig::from_yaml_file(&path).unwrap_err();
        assert!(matches!(malformed, ConfigError::Parse { .. }));
    }
}
