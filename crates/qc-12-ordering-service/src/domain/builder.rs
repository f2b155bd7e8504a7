//! # Proposal Builder
//!
//! Turns a drained batch into an immutable `Proposal`. Construction is pure
//! apart from stamping the creation time; transaction order is taken
//! as-is from the queue.

use super::errors::OrderingError;
use crate::ports::outbound::TimeSource;
use shared_types::{Proposal, Transaction};
use std::sync::Arc;

pub struct ProposalBuilder {
    max_batch_size: usize,
    time: Arc<dyn TimeSource>,
}

impl ProposalBuilder {
    pub fn new(max_batch_size: usize, time: Arc<dyn TimeSource>) -> Self {
        Self {
            max_batch_size,
            time,
        }
    }

    /// Build the proposal at `height`.
    ///
    /// # Errors
    /// - `EmptyProposalAttempt` for an empty batch; the cutter never drains
    ///   an empty queue into the builder, so this indicates a bug
    pub fn build(
        &self,
        transactions: Vec<Transaction>,
        height: u64,
    ) -> Result<Proposal, OrderingError> {
        if transactions.is_empty() {
            return Err(OrderingError::EmptyProposalAttempt);
        }
        debug_assert!(transactions.len() <= self.max_batch_size);

        Ok(Proposal::new(height, self.time.now(), transactions))
    }
}

/// Split a drained queue into consecutive batches of at most `max` items.
///
/// Concatenating the result yields the input unchanged.
pub fn split_into_batches(transactions: Vec<Transaction>, max: usize) -> Vec<Vec<Transaction>> {
    let max = max.max(1);
    let mut batches = Vec::with_capacity(transactions.len().div_ceil(max));
    let mut iter = transactions.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(max).collect());
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::mocks::FixedTimeSource;
    use proptest::prelude::*;

    fn txs(n: u64) -> Vec<Transaction> {
        (0..n)
            .map(|i| Transaction::new("carol@test", i, vec![1]))
            .collect()
    }

    #[test]
    fn test_build_stamps_time_and_height() {
        let builder = ProposalBuilder::new(5, Arc::new(FixedTimeSource(1_234)));

        let proposal = builder.build(txs(3), 9).unwrap();

        assert_eq!(proposal.height(), 9);
        assert_eq!(proposal.created_time(), 1_234);
        assert_eq!(proposal.transactions(), txs(3).as_slice());
    }

    #[test]
    fn test_build_rejects_empty_batch() {
        let builder = ProposalBuilder::new(5, Arc::new(FixedTimeSource(0)));
        assert!(matches!(
            builder.build(Vec::new(), 1),
            Err(OrderingError::EmptyProposalAttempt)
        ));
    }

    #[test]
    fn test_split_exact_and_remainder() {
        let sizes: Vec<_> = split_into_batches(txs(12), 5)
            .iter()
            .map(Vec::len)
            .collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        assert!(split_into_batches(Vec::new(), 5).is_empty());
    }

    proptest! {
        #[test]
        fn prop_split_preserves_order_and_bound(n in 0u64..200, max in 1usize..20) {
            let input = txs(n);
            let batches = split_into_batches(input.clone(), max);

            prop_assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= max));
            // Only the last batch may be short
            if let Some((_, full)) = batches.split_last() {
                prop_assert!(full.iter().all(|b| b.len() == max));
            }
            let flat: Vec<_> = batches.into_iter().flatten().collect();
            prop_assert_eq!(flat, input);
        }
    }
}
