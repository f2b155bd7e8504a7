//! Error types for the Ordering Service

use thiserror::Error;

/// The queue is at capacity; the transaction was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Transaction queue full (capacity {capacity})")]
pub struct QueueFull {
    pub capacity: usize,
}

/// Why a submission did not pass the core's own precondition checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("empty payload")]
    EmptyPayload,

    #[error("empty creator account id")]
    EmptyCreator,

    #[error("payload too large: {size} > {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Outcome of a rejected `submit_transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// Transient; the caller may retry with backoff
    #[error(transparent)]
    QueueFull(#[from] QueueFull),

    /// The transaction itself is unacceptable; retrying will not help
    #[error("Malformed transaction: {0}")]
    Malformed(#[from] MalformedReason),

    /// The service has shut down and no longer admits transactions
    #[error("Ordering service stopped")]
    ServiceStopped,
}

impl RejectReason {
    /// Check if the caller should retry later
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::QueueFull(_))
    }
}

/// Failure delivering a proposal to one peer. Never affects other peers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropagationError {
    #[error("Peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    /// Link queue full; the peer is not keeping up
    #[error("Peer {peer} lagging, proposal dropped for it")]
    PeerLagging { peer: String },
}

/// Service-level errors
#[derive(Debug, Error)]
pub enum OrderingError {
    /// Builder invoked with no transactions; a cutter bug, not a runtime condition
    #[error("Attempted to build an empty proposal")]
    EmptyProposalAttempt,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The cutter task panicked or was aborted
    #[error("Cutter task failed: {0}")]
    TaskFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_full_converts_to_reject_reason() {
        let reason: RejectReason = QueueFull { capacity: 3 }.into();
        assert!(reason.is_transient());
        assert_eq!(reason.to_string(), "Transaction queue full (capacity 3)");
    }

    #[test]
    fn test_malformed_is_not_transient() {
        let reason: RejectReason = MalformedReason::PayloadTooLarge { size: 9, max: 4 }.into();
        assert!(!reason.is_transient());
        assert_eq!(
            reason.to_string(),
            "Malformed transaction: payload too large: 9 > 4 bytes"
        );
    }

    #[test]
    fn test_peer_unreachable_display() {
        let err = PropagationError::PeerUnreachable {
            peer: "10.0.0.2:7000".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "Peer 10.0.0.2:7000 unreachable: connection refused"
        );
    }
}
