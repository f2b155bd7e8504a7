//! Outbound Ports (Driven Ports / SPI)
//!
//! What the ordering core needs from the outside: a way to reach peers, a
//! downstream gate to notify, and a clock.

use crate::domain::errors::PropagationError;
use async_trait::async_trait;
use shared_types::{Peer, Proposal, Timestamp};
use std::sync::Arc;

/// Point-to-point delivery of proposals (`SendProposal`).
///
/// Implemented by the network layer. Each call is one attempt; retries are
/// the caller's business and always resend the same proposal.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn send_proposal(&self, peer: &Peer, proposal: &Proposal)
        -> Result<(), PropagationError>;
}

/// Downstream gate notification sink.
///
/// Registered once per service; receives every proposal, in height order,
/// as a push. Must not block.
pub trait ProposalSink: Send + Sync {
    fn on_proposal(&self, proposal: Arc<Proposal>);
}

/// Time source for proposal timestamps.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}
