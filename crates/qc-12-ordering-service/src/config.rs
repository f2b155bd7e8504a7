//! Configuration for the Ordering Service

use crate::domain::errors::OrderingError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens to queued transactions when the service stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Flush the queue into final proposals and propagate them.
    #[default]
    Finalize,
    /// Drop whatever is still queued.
    Discard,
}

/// Ordering configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    /// Queue length that forces an immediate cut; also the proposal size cap
    pub max_batch_size: usize,
    /// Longest an accumulating queue waits before a forced cut (ms)
    pub batch_timeout_ms: u64,
    /// Hard queue bound; submissions beyond it are rejected
    pub queue_capacity: usize,
    /// Largest accepted transaction payload
    pub max_payload_bytes: usize,
    /// Proposals buffered per peer link before that peer starts missing them
    pub peer_queue_depth: usize,
    /// Send attempts per proposal per peer
    pub max_send_attempts: u32,
    /// Pause between send attempts (ms)
    pub retry_backoff_ms: u64,
    pub shutdown_policy: ShutdownPolicy,
    /// How long shutdown waits for peer links to finish (ms)
    pub shutdown_grace_ms: u64,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            batch_timeout_ms: 1_000,
            queue_capacity: 10_000,
            max_payload_bytes: 1024 * 1024,
            peer_queue_depth: 64,
            max_send_attempts: 3,
            retry_backoff_ms: 200,
            shutdown_policy: ShutdownPolicy::Finalize,
            shutdown_grace_ms: 5_000,
        }
    }
}

impl OrderingConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), OrderingError> {
        if self.max_batch_size == 0 {
            return Err(OrderingError::InvalidConfig(
                "max_batch_size must be positive".into(),
            ));
        }
        if self.batch_timeout_ms == 0 {
            return Err(OrderingError::InvalidConfig(
                "batch_timeout_ms must be positive".into(),
            ));
        }
        if self.queue_capacity < self.max_batch_size {
            return Err(OrderingError::InvalidConfig(format!(
                "queue_capacity ({}) must be at least max_batch_size ({})",
                self.queue_capacity, self.max_batch_size
            )));
        }
        if self.peer_queue_depth == 0 {
            return Err(OrderingError::InvalidConfig(
                "peer_queue_depth must be positive".into(),
            ));
        }
        if self.max_send_attempts == 0 {
            return Err(OrderingError::InvalidConfig(
                "max_send_attempts must be positive".into(),
            ));
        }
        Ok(())
    }
}
