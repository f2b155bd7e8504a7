//! # Batch Trigger
//!
//! Races the size condition against the periodic timer and yields one
//! `CutReason` at a time to the single cutter task.
//!
//! Size signals go through a `Notify`, which holds at most one pending
//! permit: any number of submitters crossing the threshold before the
//! cutter wakes collapse into one cut.

use crate::domain::value_objects::CutReason;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Submitter-side handle of the size path.
#[derive(Clone, Debug)]
pub struct TriggerHandle {
    max_batch_size: usize,
    batch_full: Arc<Notify>,
}

impl TriggerHandle {
    /// Fire the size path if `queue_len` reached the threshold.
    pub fn observe_len(&self, queue_len: usize) {
        if queue_len >= self.max_batch_size {
            self.batch_full.notify_one();
        }
    }
}

/// Timer and size signal, owned by one ordering service instance.
///
/// The timer lives as long as the trigger: created at service start,
/// gone when the cutter task exits.
#[derive(Debug)]
pub struct BatchTrigger {
    interval: Interval,
    batch_full: Arc<Notify>,
    max_batch_size: usize,
}

impl BatchTrigger {
    /// Must be called from within a tokio runtime.
    ///
    /// The first timeout fires one full period after creation.
    pub fn new(max_batch_size: usize, batch_timeout: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + batch_timeout, batch_timeout);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            batch_full: Arc::new(Notify::new()),
            max_batch_size,
        }
    }

    pub fn handle(&self) -> TriggerHandle {
        TriggerHandle {
            max_batch_size: self.max_batch_size,
            batch_full: Arc::clone(&self.batch_full),
        }
    }

    /// Wait for whichever condition comes first. Cancel-safe.
    pub async fn next(&mut self) -> CutReason {
        tokio::select! {
            _ = self.batch_full.notified() => CutReason::BatchFull,
            _ = self.interval.tick() => CutReason::Timeout,
        }
    }
}
