//! # Proposal Handlers
//!
//! Two sides of a proposal's life on this node:
//!
//! - [`run_gate_consumer`] drains the local gate stream of proposals this
//!   node cut.
//! - [`ProposalInbox`] takes proposals pushed to us by other ordering nodes
//!   (`POST /v1/proposals`) and fans them out to local subscribers.

use qc_12_ordering_service::ProposalStream;
use shared_types::Proposal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Consume the local gate until the ordering service stops.
///
/// Returns the number of proposals seen.
pub async fn run_gate_consumer(mut proposals: ProposalStream) -> u64 {
    let mut seen = 0;
    while let Some(proposal) = proposals.recv().await {
        seen += 1;
        info!(
            height = proposal.height(),
            tx_count = proposal.len(),
            "[gate] Local proposal"
        );
    }
    debug!(seen, "[gate] Proposal stream closed");
    seen
}

/// Receiving side of `SendProposal`.
#[derive(Debug)]
pub struct ProposalInbox {
    sender: broadcast::Sender<Arc<Proposal>>,
    received: AtomicU64,
    last_height: AtomicU64,
}

impl ProposalInbox {
    /// `buffer` is how many proposals a slow subscriber may fall behind.
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self {
            sender,
            received: AtomicU64::new(0),
            last_height: AtomicU64::new(0),
        }
    }

    pub fn accept(&self, proposal: Proposal) {
        let height = proposal.height();
        self.received.fetch_add(1, Ordering::Relaxed);
        let previous = self.last_height.fetch_max(height, Ordering::Relaxed);
        info!(
            height,
            tx_count = proposal.len(),
            out_of_order = height <= previous,
            "[inbox] Proposal received from peer"
        );
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(proposal));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Proposal>> {
        self.sender.subscribe()
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Highest height received so far, 0 if none.
    pub fn last_height(&self) -> u64 {
        self.last_height.load(Ordering::Relaxed)
    }
}
