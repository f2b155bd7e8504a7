//! Metrics collection for the ordering service

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for the ordering service
#[derive(Debug, Default)]
pub struct OrderingMetrics {
    /// Transactions admitted to the queue
    pub transactions_accepted: AtomicU64,

    /// Submissions rejected with `QueueFull`
    pub rejected_queue_full: AtomicU64,

    /// Submissions rejected as malformed
    pub rejected_malformed: AtomicU64,

    /// Submissions after shutdown
    pub rejected_stopped: AtomicU64,

    /// Proposals built
    pub proposals_cut: AtomicU64,

    /// Transactions embedded in proposals
    pub transactions_proposed: AtomicU64,

    /// Proposals a peer never received after all attempts
    pub peer_send_failures: AtomicU64,

    /// Proposals skipped for a peer whose link queue was full
    pub peer_lagging_drops: AtomicU64,
}

/// Point-in-time copy of [`OrderingMetrics`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub transactions_accepted: u64,
    pub rejected_queue_full: u64,
    pub rejected_malformed: u64,
    pub rejected_stopped: u64,
    pub proposals_cut: u64,
    pub transactions_proposed: u64,
    pub peer_send_failures: u64,
    pub peer_lagging_drops: u64,
}

impl OrderingMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.transactions_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self, reason: &crate::RejectReason) {
        let counter = match reason {
            crate::RejectReason::QueueFull(_) => &self.rejected_queue_full,
            crate::RejectReason::Malformed(_) => &self.rejected_malformed,
            crate::RejectReason::ServiceStopped => &self.rejected_stopped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a built proposal
    pub fn record_proposal(&self, tx_count: usize) {
        self.proposals_cut.fetch_add(1, Ordering::Relaxed);
        self.transactions_proposed
            .fetch_add(tx_count as u64, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.peer_send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lagging_drop(&self) {
        self.peer_lagging_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            transactions_accepted: self.transactions_accepted.load(Ordering::Relaxed),
            rejected_queue_full: self.rejected_queue_full.load(Ordering::Relaxed),
            rejected_malformed: self.rejected_malformed.load(Ordering::Relaxed),
            rejected_stopped: self.rejected_stopped.load(Ordering::Relaxed),
            proposals_cut: self.proposals_cut.load(Ordering::Relaxed),
            transactions_proposed: self.transactions_proposed.load(Ordering::Relaxed),
            peer_send_failures: self.peer_send_failures.load(Ordering::Relaxed),
            peer_lagging_drops: self.peer_lagging_drops.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Get average transactions per proposal
    pub fn avg_transactions_per_proposal(&self) -> f64 {
        if self.proposals_cut == 0 {
            return 0.0;
        }
        self.transactions_proposed as f64 / self.proposals_cut as f64
    }
}
