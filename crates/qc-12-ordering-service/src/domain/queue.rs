//! # Transaction Queue
//!
//! Bounded FIFO buffer of admitted transactions awaiting a cut.
//!
//! Every operation takes the same short-lived lock, so a drain is
//! indivisible with respect to concurrent submits: a transaction lands
//! either in the drained batch or in the post-drain queue, never both.

use super::errors::{QueueFull, RejectReason};
use parking_lot::Mutex;
use shared_types::Transaction;
use std::collections::VecDeque;

#[derive(Debug, Default)]
struct QueueInner {
    items: VecDeque<Transaction>,
    closed: bool,
}

/// Thread-safe bounded transaction queue.
///
/// INVARIANTS:
/// - Length never exceeds `capacity`; overflow is rejected, never dropped
/// - Drains return transactions in arrival order
/// - No submission succeeds after `close()`
#[derive(Debug)]
pub struct TransactionQueue {
    capacity: usize,
    inner: Mutex<QueueInner>,
}

impl TransactionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(capacity.min(4096)),
                closed: false,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append at the tail.
    ///
    /// Returns the queue length right after the append, which the size
    /// trigger compares against the batch size.
    ///
    /// # Errors
    /// - `QueueFull` if the queue is at capacity (length unchanged)
    /// - `ServiceStopped` once the queue has been closed
    pub fn submit(&self, tx: Transaction) -> Result<usize, RejectReason> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(RejectReason::ServiceStopped);
        }
        if inner.items.len() >= self.capacity {
            return Err(QueueFull {
                capacity: self.capacity,
            }
            .into());
        }
        inner.items.push_back(tx);
        Ok(inner.items.len())
    }

    /// Remove and return everything, in arrival order.
    pub fn drain_all(&self) -> Vec<Transaction> {
        let mut inner = self.inner.lock();
        inner.items.drain(..).collect()
    }

    /// Remove and return at most `limit` transactions from the head.
    pub fn drain_up_to(&self, limit: usize) -> Vec<Transaction> {
        let mut inner = self.inner.lock();
        let n = limit.min(inner.items.len());
        inner.items.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Stop admitting transactions. Already queued ones stay until drained.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn tx(creator: &str, seq: u64) -> Transaction {
        Transaction::new(creator, seq, seq.to_le_bytes().to_vec())
    }

    #[test]
    fn test_fifo_order() {
        let queue = TransactionQueue::new(10);
        for i in 0..5 {
            queue.submit(tx("alice", i)).unwrap();
        }

        let drained = queue.drain_all();

        let seqs: Vec<_> = drained.iter().map(|t| t.created_time).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_submit_reports_new_length() {
        let queue = TransactionQueue::new(10);
        assert_eq!(queue.submit(tx("alice", 0)).unwrap(), 1);
        assert_eq!(queue.submit(tx("alice", 1)).unwrap(), 2);
    }

    #[test]
    fn test_capacity_backpressure() {
        let queue = TransactionQueue::new(2);
        queue.submit(tx("alice", 0)).unwrap();
        queue.submit(tx("alice", 1)).unwrap();

        let result = queue.submit(tx("alice", 2));

        assert_eq!(
            result,
            Err(RejectReason::QueueFull(QueueFull { capacity: 2 }))
        );
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drain_up_to_takes_head() {
        let queue = TransactionQueue::new(10);
        for i in 0..7 {
            queue.submit(tx("alice", i)).unwrap();
        }

        let head = queue.drain_up_to(5);

        assert_eq!(head.len(), 5);
        assert_eq!(head[0].created_time, 0);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.drain_up_to(5).len(), 2);
        assert!(queue.drain_up_to(5).is_empty());
    }

    #[test]
    fn test_closed_queue_rejects() {
        let queue = TransactionQueue::new(10);
        queue.submit(tx("alice", 0)).unwrap();
        queue.close();

        assert_eq!(
            queue.submit(tx("alice", 1)),
            Err(RejectReason::ServiceStopped)
        );
        assert!(queue.is_closed());
        // Already queued work survives the close
        assert_eq!(queue.drain_all().len(), 1);
    }

    #[test]
    fn test_concurrent_submit_and_drain_lose_nothing() {
        let queue = Arc::new(TransactionQueue::new(100_000));
        let submitters: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..1_000 {
                        queue.submit(tx(&format!("sender-{t}"), i)).unwrap();
                    }
                })
            })
            .collect();

        let mut drained = Vec::new();
        while submitters.iter().any(|h| !h.is_finished()) {
            drained.extend(queue.drain_all());
        }
        for handle in submitters {
            handle.join().unwrap();
        }
        drained.extend(queue.drain_all());

        assert_eq!(drained.len(), 4_000);
        let unique: HashSet<_> = drained.iter().map(Transaction::hash).collect();
        assert_eq!(unique.len(), 4_000);

        // Per-sender arrival order survives interleaved drains
        for t in 0..4 {
            let creator = format!("sender-{t}");
            let seqs: Vec<_> = drained
                .iter()
                .filter(|x| x.creator_account_id == creator)
                .map(|x| x.created_time)
                .collect();
            assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
