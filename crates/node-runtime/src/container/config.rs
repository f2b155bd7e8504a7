//! # Node Configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then `QC_*`
//! environment variables, then command-line flags (applied by `main`).
//!
//! ```toml
//! listen_address = "0.0.0.0:50051"
//! initial_peers = ["10.0.0.2:50051", "10.0.0.3:50051"]
//!
//! [ordering]
//! max_batch_size = 10
//! batch_timeout_ms = 1000
//! ```

use qc_12_ordering_service::{OrderingConfig, OrderingError};
use serde::{Deserialize, Serialize};
use shared_types::Peer;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("failed to read config file {path}: {error}")]
    Io { path: String, error: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error(transparent)]
    Ordering(#[from] OrderingError),
}

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Address the HTTP surface binds to.
    pub listen_address: SocketAddr,
    /// Peers (host:port) that receive every proposal from start.
    pub initial_peers: Vec<String>,
    /// Per-request timeout for outbound proposal sends (ms).
    pub peer_request_timeout_ms: u64,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub ordering: OrderingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([127, 0, 0, 1], 50051)),
            initial_peers: Vec::new(),
            peer_request_timeout_ms: 2_000,
            log_level: "info".to_string(),
            ordering: OrderingConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NodeError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| NodeError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse from a TOML string. Missing keys take their defaults.
    pub fn parse(content: &str) -> Result<Self, NodeError> {
        toml::from_str(content).map_err(|e| NodeError::Parse(e.to_string()))
    }

    /// Apply `QC_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), NodeError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `QC_*` overrides from any key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), NodeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("QC_LISTEN_ADDRESS") {
            self.listen_address = parse_var("QC_LISTEN_ADDRESS", value)?;
        }
        if let Some(value) = lookup("QC_PEERS") {
            self.initial_peers = split_peer_list(&value);
        }
        if let Some(value) = lookup("QC_MAX_BATCH_SIZE") {
            self.ordering.max_batch_size = parse_var("QC_MAX_BATCH_SIZE", value)?;
        }
        if let Some(value) = lookup("QC_BATCH_TIMEOUT_MS") {
            self.ordering.batch_timeout_ms = parse_var("QC_BATCH_TIMEOUT_MS", value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        self.ordering.validate()?;
        Ok(())
    }

    pub fn peers(&self) -> Vec<Peer> {
        self.initial_peers.iter().map(Peer::new).collect()
    }

    pub fn peer_request_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_request_timeout_ms)
    }
}

/// Split a comma-separated `host:port` list, skipping blanks.
pub fn split_peer_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, NodeError> {
    value
        .trim()
        .parse()
        .map_err(|_| NodeError::InvalidEnv { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_12_ordering_service::ShutdownPolicy;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = NodeConfig::parse("").unwrap();
        assert_eq!(config.listen_address, SocketAddr::from(([127, 0, 0, 1], 50051)));
        assert_eq!(config.ordering.max_batch_size, 10);
        assert_eq!(config.ordering.batch_timeout_ms, 1_000);
        assert!(config.initial_peers.is_empty());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = NodeConfig::parse(
            r#"
            listen_address = "0.0.0.0:7000"
            initial_peers = ["10.0.0.2:7000"]

            [ordering]
            max_batch_size = 5
            shutdown_policy = "discard"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_address.port(), 7000);
        assert_eq!(config.peers(), vec![Peer::new("10.0.0.2:7000")]);
        assert_eq!(config.ordering.max_batch_size, 5);
        assert_eq!(config.ordering.batch_timeout_ms, 1_000);
        assert_eq!(config.ordering.shutdown_policy, ShutdownPolicy::Discard);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            NodeConfig::parse("listen_address = 12"),
            Err(NodeError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ordering]\nbatch_timeout_ms = 250").unwrap();

        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.ordering.batch_timeout_ms, 250);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            NodeConfig::load("/definitely/not/here.toml"),
            Err(NodeError::Io { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("QC_LISTEN_ADDRESS", "127.0.0.1:9000"),
            ("QC_PEERS", "a:1, b:2,,"),
            ("QC_MAX_BATCH_SIZE", "3"),
            ("QC_BATCH_TIMEOUT_MS", "50"),
        ]
        .into_iter()
        .collect();

        let mut config = NodeConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.listen_address.port(), 9000);
        assert_eq!(config.initial_peers, vec!["a:1", "b:2"]);
        assert_eq!(config.ordering.max_batch_size, 3);
        assert_eq!(config.ordering.batch_timeout_ms, 50);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = NodeConfig::default();
        let err = config
            .apply_overrides(|k| (k == "QC_MAX_BATCH_SIZE").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::InvalidEnv {
                var: "QC_MAX_BATCH_SIZE",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_bad_ordering_config() {
        let mut config = NodeConfig::default();
        config.ordering.max_batch_size = 0;
        assert!(matches!(config.validate(), Err(NodeError::Ordering(_))));
    }
}
