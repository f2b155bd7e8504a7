//! Value objects for the Ordering Service

use serde::{Deserialize, Serialize};

/// Why a cut happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutReason {
    /// Queue length reached `max_batch_size`
    BatchFull,
    /// `batch_timeout` elapsed
    Timeout,
    /// Final flush on shutdown
    Shutdown,
}

impl CutReason {
    /// Whether the cut flushes the whole queue or only full batches
    pub fn flushes_queue(self) -> bool {
        !matches!(self, Self::BatchFull)
    }
}

/// Observable service state.
///
/// ```text
/// Idle ──submit──→ Accumulating ──trigger──→ Cutting ──→ Idle | Accumulating
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Queue empty, timer running
    Idle,
    /// Queue non-empty, below the size threshold
    Accumulating,
    /// Drain, build and propagate in progress
    Cutting,
}

/// Proposal height sequence, starting at 1.
#[derive(Debug)]
pub struct HeightSequence {
    next: u64,
}

impl HeightSequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Height the next proposal will carry.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Consume the current height once a proposal was actually built.
    pub fn advance(&mut self) {
        self.next += 1;
    }
}

impl Default for HeightSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_sequence_starts_at_one() {
        let mut heights = HeightSequence::new();
        assert_eq!(heights.peek(), 1);
        heights.advance();
        heights.advance();
        assert_eq!(heights.peek(), 3);
    }

    #[test]
    fn test_only_batch_full_keeps_partial_tail() {
        assert!(!CutReason::BatchFull.flushes_queue());
        assert!(CutReason::Timeout.flushes_queue());
        assert!(CutReason::Shutdown.flushes_queue());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&ServiceState::Accumulating).unwrap();
        assert_eq!(json, "\"accumulating\"");
    }
}
