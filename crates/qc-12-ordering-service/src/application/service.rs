//! Ordering Service
//!
//! Wires queue, trigger, builder and broadcaster together.
//!
//! ## Concurrency
//!
//! - Any number of submitters call [`OrderingHandle::submit_transaction`]
//!   concurrently; each holds the queue lock only for the append.
//! - Exactly one cutter task owns the trigger, builder, height sequence and
//!   broadcaster, so drain → build → propagate is serialized by
//!   construction and racing triggers coalesce instead of queueing.
//! - Propagation only enqueues onto per-peer links; the queue lock is never
//!   held across network I/O.

use crate::application::broadcaster::{Broadcaster, LinkPolicy};
use crate::application::trigger::{BatchTrigger, TriggerHandle};
use crate::config::{OrderingConfig, ShutdownPolicy};
use crate::domain::builder::{split_into_batches, ProposalBuilder};
use crate::domain::errors::{MalformedReason, OrderingError, RejectReason};
use crate::domain::queue::TransactionQueue;
use crate::domain::registry::{PeerRegistry, RegistryUpdate};
use crate::domain::value_objects::{CutReason, HeightSequence, ServiceState};
use crate::metrics::{MetricsSnapshot, OrderingMetrics};
use crate::ports::inbound::OrderingServiceApi;
use crate::ports::outbound::{PeerTransport, ProposalSink, SystemTimeSource, TimeSource};
use parking_lot::Mutex;
use shared_types::{Peer, Transaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// State shared between submitters and the cutter.
struct Shared {
    config: OrderingConfig,
    queue: TransactionQueue,
    registry: PeerRegistry,
    trigger: TriggerHandle,
    metrics: Arc<OrderingMetrics>,
    cutting: AtomicBool,
}

/// Ordering service builder.
///
/// ```rust,ignore
/// let (gate, proposals) = gate_channel();
/// let handle = OrderingService::new(config)
///     .with_peers(peers)
///     .start(transport, Arc::new(gate))?;
/// handle.submit_transaction(tx)?;
/// ```
pub struct OrderingService {
    config: OrderingConfig,
    peers: Vec<Peer>,
    time: Arc<dyn TimeSource>,
}

impl OrderingService {
    pub fn new(config: OrderingConfig) -> Self {
        Self {
            config,
            peers: Vec::new(),
            time: Arc::new(SystemTimeSource),
        }
    }

    /// Initial peer list.
    pub fn with_peers(mut self, peers: Vec<Peer>) -> Self {
        self.peers = peers;
        self
    }

    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.time = time;
        self
    }

    /// Validate the config and spawn the cutter task.
    ///
    /// Must be called from within a tokio runtime. The timer starts now.
    pub fn start(
        self,
        transport: Arc<dyn PeerTransport>,
        gate: Arc<dyn ProposalSink>,
    ) -> Result<OrderingHandle, OrderingError> {
        self.config.validate()?;
        let config = self.config;

        info!(
            max_batch_size = config.max_batch_size,
            batch_timeout_ms = config.batch_timeout_ms,
            queue_capacity = config.queue_capacity,
            peers = self.peers.len(),
            "[ordering] Starting ordering service"
        );

        let metrics = Arc::new(OrderingMetrics::new());
        let trigger = BatchTrigger::new(config.max_batch_size, config.batch_timeout());
        let broadcaster = Broadcaster::new(
            transport,
            LinkPolicy {
                queue_depth: config.peer_queue_depth,
                max_attempts: config.max_send_attempts,
                retry_backoff: config.retry_backoff(),
            },
            Arc::clone(&metrics),
        );

        let shared = Arc::new(Shared {
            queue: TransactionQueue::new(config.queue_capacity),
            registry: PeerRegistry::new(self.peers),
            trigger: trigger.handle(),
            metrics,
            cutting: AtomicBool::new(false),
            config,
        });

        let cutter = Cutter {
            builder: ProposalBuilder::new(shared.config.max_batch_size, self.time),
            shared: Arc::clone(&shared),
            trigger,
            heights: HeightSequence::new(),
            broadcaster,
            gate,
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(cutter.run(shutdown_rx));

        Ok(OrderingHandle {
            shared,
            shutdown_tx: Arc::new(shutdown_tx),
            task: Arc::new(Mutex::new(Some(task))),
        })
    }
}

/// Cloneable handle to a running ordering service.
#[derive(Clone)]
pub struct OrderingHandle {
    shared: Arc<Shared>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl OrderingHandle {
    fn check_well_formed(&self, tx: &Transaction) -> Result<(), MalformedReason> {
        if tx.creator_account_id.is_empty() {
            return Err(MalformedReason::EmptyCreator);
        }
        if tx.payload.is_empty() {
            return Err(MalformedReason::EmptyPayload);
        }
        let max = self.shared.config.max_payload_bytes;
        if tx.payload.len() > max {
            return Err(MalformedReason::PayloadTooLarge {
                size: tx.payload.len(),
                max,
            });
        }
        Ok(())
    }

    fn admit(&self, tx: Transaction) -> Result<(), RejectReason> {
        self.check_well_formed(&tx)?;
        let len = self.shared.queue.submit(tx)?;
        self.shared.trigger.observe_len(len);
        Ok(())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn config(&self) -> &OrderingConfig {
        &self.shared.config
    }

    /// Whether submissions are still admitted.
    pub fn is_accepting(&self) -> bool {
        !self.shared.queue.is_closed()
    }

    /// Stop admitting transactions, apply the shutdown policy and wait for
    /// the cutter to exit. Idempotent.
    pub async fn shutdown(&self) -> Result<(), OrderingError> {
        self.shared.queue.close();
        // Err only means the cutter already exited
        let _ = self.shutdown_tx.send(true);

        let task = self.task.lock().take();
        match task {
            Some(task) => task
                .await
                .map_err(|e| OrderingError::TaskFailed(e.to_string())),
            None => Ok(()),
        }
    }
}

impl OrderingServiceApi for OrderingHandle {
    fn submit_transaction(&self, tx: Transaction) -> Result<(), RejectReason> {
        match self.admit(tx) {
            Ok(()) => {
                self.shared.metrics.record_accepted();
                Ok(())
            }
            Err(reason) => {
                self.shared.metrics.record_rejection(&reason);
                debug!(reason = %reason, "Transaction rejected");
                Err(reason)
            }
        }
    }

    fn on_peer_list_update(&self, new_peers: Vec<Peer>) -> RegistryUpdate {
        let update = self.shared.registry.replace(new_peers);
        info!(
            added = update.added.len(),
            removed = update.removed.len(),
            total = self.shared.registry.len(),
            "[ordering] Peer list updated"
        );
        update
    }

    fn add_peer(&self, peer: Peer) -> bool {
        let address = peer.address.clone();
        let added = self.shared.registry.add(peer);
        if added {
            info!(peer = %address, total = self.shared.registry.len(), "[ordering] Peer added");
        }
        added
    }

    fn remove_peer(&self, address: &str) -> bool {
        let removed = self.shared.registry.remove(address);
        if removed {
            info!(peer = %address, total = self.shared.registry.len(), "[ordering] Peer removed");
        }
        removed
    }

    fn peers(&self) -> Vec<Peer> {
        self.shared.registry.snapshot().to_vec()
    }

    fn state(&self) -> ServiceState {
        if self.shared.cutting.load(Ordering::Acquire) {
            ServiceState::Cutting
        } else if self.shared.queue.is_empty() {
            ServiceState::Idle
        } else {
            ServiceState::Accumulating
        }
    }

    fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }
}

/// The single cut executor.
struct Cutter {
    shared: Arc<Shared>,
    trigger: BatchTrigger,
    builder: ProposalBuilder,
    heights: HeightSequence,
    broadcaster: Broadcaster,
    gate: Arc<dyn ProposalSink>,
}

impl Cutter {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let reason = tokio::select! {
                reason = self.trigger.next() => reason,
                _ = shutdown.changed() => break,
            };
            self.cut(reason);
        }
        self.finish().await;
    }

    fn cut(&mut self, reason: CutReason) {
        self.shared.cutting.store(true, Ordering::Release);

        let max = self.shared.config.max_batch_size;
        let batches = if reason.flushes_queue() {
            split_into_batches(self.shared.queue.drain_all(), max)
        } else {
            // Only the cutter drains, so the queue cannot shrink between
            // the length check and the drain.
            let mut batches = Vec::new();
            while self.shared.queue.len() >= max {
                batches.push(self.shared.queue.drain_up_to(max));
            }
            batches
        };

        if batches.is_empty() {
            trace!(reason = ?reason, "Nothing to cut");
        }
        for batch in batches {
            self.emit(batch, reason);
        }

        self.shared.cutting.store(false, Ordering::Release);
    }

    fn emit(&mut self, batch: Vec<Transaction>, reason: CutReason) {
        debug_assert!(!batch.is_empty(), "cutter produced an empty batch");
        let height = self.heights.peek();
        let proposal = match self.builder.build(batch, height) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                error!(height, error = %e, "[ordering] Proposal build failed");
                return;
            }
        };
        self.heights.advance();
        self.shared.metrics.record_proposal(proposal.len());

        info!(
            height,
            tx_count = proposal.len(),
            reason = ?reason,
            "[ordering] Proposal cut"
        );

        self.gate.on_proposal(Arc::clone(&proposal));

        let peers = self.shared.registry.snapshot();
        let report = self.broadcaster.propagate(&proposal, &peers);
        if !report.lagging.is_empty() {
            warn!(
                height,
                lagging = report.lagging.len(),
                "[ordering] Some peers are lagging"
            );
        }
    }

    async fn finish(mut self) {
        match self.shared.config.shutdown_policy {
            ShutdownPolicy::Finalize => {
                info!(
                    queued = self.shared.queue.len(),
                    "[ordering] Shutdown: flushing queue into final proposals"
                );
                self.cut(CutReason::Shutdown);
            }
            ShutdownPolicy::Discard => {
                let dropped = self.shared.queue.drain_all().len();
                if dropped > 0 {
                    warn!(dropped, "[ordering] Shutdown: discarding queued transactions");
                }
            }
        }

        let grace = self.shared.config.shutdown_grace();
        self.broadcaster.close(grace).await;
        info!(
            last_height = self.heights.peek() - 1,
            "[ordering] Ordering service stopped"
        );
    }
}
