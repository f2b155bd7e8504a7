//! # Broadcaster
//!
//! One long-lived link task per peer. The cutter only enqueues, so a slow
//! or dead peer never holds up the cutter, submitters, or other peers, and
//! each peer receives proposals in height order.

use crate::domain::errors::PropagationError;
use crate::metrics::OrderingMetrics;
use crate::ports::outbound::PeerTransport;
use shared_types::{Peer, Proposal};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Delivery settings shared by every link.
#[derive(Clone, Debug)]
pub struct LinkPolicy {
    pub queue_depth: usize,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

/// Result of handing one proposal to the current peer set.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub enqueued: usize,
    pub lagging: Vec<PropagationError>,
}

struct PeerLink {
    /// Latest identity registered for this address
    peer: Peer,
    sender: mpsc::Sender<Outbound>,
    task: JoinHandle<()>,
}

/// One queued send. Carries the peer so a key update applies to the
/// backlog without restarting the link.
type Outbound = (Peer, Arc<Proposal>);

/// Aborts the wrapped task when dropped.
struct Predecessor(JoinHandle<()>);

impl Drop for Predecessor {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct Broadcaster {
    transport: Arc<dyn PeerTransport>,
    policy: LinkPolicy,
    metrics: Arc<OrderingMetrics>,
    /// Open links by peer address
    links: HashMap<String, PeerLink>,
    /// Links of removed peers still finishing their backlog, by address
    retired: HashMap<String, JoinHandle<()>>,
}

impl Broadcaster {
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        policy: LinkPolicy,
        metrics: Arc<OrderingMetrics>,
    ) -> Self {
        Self {
            transport,
            policy,
            metrics,
            links: HashMap::new(),
            retired: HashMap::new(),
        }
    }

    /// Number of open peer links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Enqueue `proposal` for every peer in `peers`. Never awaits.
    ///
    /// Links are keyed by address. Links for addresses missing from `peers`
    /// are closed; they still deliver what was queued before, and a link
    /// reopened for the same address only starts sending once the old one
    /// has finished.
    pub fn propagate(&mut self, proposal: &Arc<Proposal>, peers: &[Peer]) -> PropagationReport {
        self.retire_absent(peers);

        let mut report = PropagationReport::default();
        for peer in peers {
            if !self.links.contains_key(&peer.address) {
                let predecessor = self.retired.remove(&peer.address);
                let link = self.spawn_link(peer.clone(), predecessor);
                self.links.insert(peer.address.clone(), link);
            }
            let Some(link) = self.links.get_mut(&peer.address) else {
                continue;
            };
            if link.peer != *peer {
                debug!(peer = %peer, "[ordering] Peer identity updated, keeping link");
                link.peer = peer.clone();
            }

            match link.sender.try_send((peer.clone(), Arc::clone(proposal))) {
                Ok(()) => report.enqueued += 1,
                Err(TrySendError::Full(_)) => {
                    self.metrics.record_lagging_drop();
                    warn!(
                        peer = %peer,
                        height = proposal.height(),
                        "[ordering] Peer link full, skipping proposal for this peer"
                    );
                    report.lagging.push(PropagationError::PeerLagging {
                        peer: peer.address.clone(),
                    });
                }
                Err(TrySendError::Closed(outbound)) => {
                    // Link task died; replace it and retry once.
                    error!(peer = %peer, "[ordering] Peer link terminated unexpectedly, respawning");
                    let fresh = self.spawn_link(peer.clone(), None);
                    if fresh.sender.try_send(outbound).is_ok() {
                        report.enqueued += 1;
                    }
                    self.links.insert(peer.address.clone(), fresh);
                }
            }
        }
        report
    }

    fn retire_absent(&mut self, peers: &[Peer]) {
        self.retired.retain(|_, task| !task.is_finished());

        let absent: Vec<String> = self
            .links
            .keys()
            .filter(|address| !peers.iter().any(|p| &p.address == *address))
            .cloned()
            .collect();
        for address in absent {
            if let Some(link) = self.links.remove(&address) {
                info!(peer = %address, "[ordering] Peer left registry, closing link");
                // Dropping the sender lets the task drain and exit. A link
                // reopened before then was chained after this one, so any
                // older entry is covered by this task.
                self.retired.insert(address, link.task);
            }
        }
    }

    fn spawn_link(&self, peer: Peer, predecessor: Option<JoinHandle<()>>) -> PeerLink {
        let (sender, receiver) = mpsc::channel(self.policy.queue_depth);
        let task = tokio::spawn(run_link(
            peer.address.clone(),
            receiver,
            predecessor.map(Predecessor),
            Arc::clone(&self.transport),
            self.policy.clone(),
            Arc::clone(&self.metrics),
        ));
        PeerLink { peer, sender, task }
    }

    /// Close every link and wait up to `grace` for queued sends to finish.
    pub async fn close(mut self, grace: Duration) {
        let mut tasks: Vec<JoinHandle<()>> = self.retired.drain().map(|(_, task)| task).collect();
        tasks.extend(self.links.drain().map(|(_, link)| link.task));

        let abort_handles: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
        let all = async {
            for task in tasks {
                let _ = task.await;
            }
        };
        if tokio::time::timeout(grace, all).await.is_err() {
            warn!(
                grace_ms = grace.as_millis() as u64,
                "[ordering] Peer links did not finish in time, aborting"
            );
            for handle in abort_handles {
                handle.abort();
            }
        }
    }
}

async fn run_link(
    address: String,
    mut receiver: mpsc::Receiver<Outbound>,
    predecessor: Option<Predecessor>,
    transport: Arc<dyn PeerTransport>,
    policy: LinkPolicy,
    metrics: Arc<OrderingMetrics>,
) {
    if let Some(mut previous) = predecessor {
        debug!(peer = %address, "[ordering] Waiting for previous link to drain");
        let _ = (&mut previous.0).await;
    }
    debug!(peer = %address, "[ordering] Peer link started");
    while let Some((peer, proposal)) = receiver.recv().await {
        if let Err(e) = deliver(&peer, &proposal, transport.as_ref(), &policy).await {
            metrics.record_send_failure();
            error!(
                peer = %peer,
                height = proposal.height(),
                attempts = policy.max_attempts,
                error = %e,
                "[ordering] Giving up on proposal for peer"
            );
        }
    }
    debug!(peer = %address, "[ordering] Peer link closed");
}

/// Send the same proposal until it lands or attempts run out.
async fn deliver(
    peer: &Peer,
    proposal: &Proposal,
    transport: &dyn PeerTransport,
    policy: &LinkPolicy,
) -> Result<(), PropagationError> {
    let mut attempt = 1;
    loop {
        match transport.send_proposal(peer, proposal).await {
            Ok(()) => {
                debug!(peer = %peer, height = proposal.height(), attempt, "Proposal delivered");
                return Ok(());
            }
            Err(e) if attempt >= policy.max_attempts => return Err(e),
            Err(e) => {
                warn!(
                    peer = %peer,
                    height = proposal.height(),
                    attempt,
                    error = %e,
                    "Proposal send failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(policy.retry_backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::mocks::MockTransport;
    use shared_types::Transaction;

    fn policy() -> LinkPolicy {
        LinkPolicy {
            queue_depth: 8,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(10),
        }
    }

    fn proposal(height: u64) -> Arc<Proposal> {
        let tx = Transaction::new("erin@test", height, vec![1]);
        Arc::new(Proposal::new(height, 0, vec![tx]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_peer_does_not_affect_others() {
        let transport = Arc::new(MockTransport::new().failing("bad:1"));
        let metrics = Arc::new(OrderingMetrics::new());
        let mut broadcaster = Broadcaster::new(transport.clone(), policy(), metrics.clone());
        let peers = vec![Peer::new("good:1"), Peer::new("bad:1")];

        for height in 1..=3 {
            let report = broadcaster.propagate(&proposal(height), &peers);
            assert_eq!(report.enqueued, 2);
        }
        broadcaster.close(Duration::from_secs(5)).await;

        assert_eq!(transport.heights_for("good:1"), vec![1, 2, 3]);
        assert!(transport.heights_for("bad:1").is_empty());
        assert_eq!(transport.attempts_for("bad:1"), 9);
        assert_eq!(metrics.snapshot().peer_send_failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_resends_same_proposal() {
        let transport = Arc::new(MockTransport::new().flaky("slow:1", 2));
        let metrics = Arc::new(OrderingMetrics::new());
        let mut broadcaster = Broadcaster::new(transport.clone(), policy(), metrics.clone());

        broadcaster.propagate(&proposal(1), &[Peer::new("slow:1")]);
        broadcaster.close(Duration::from_secs(5)).await;

        assert_eq!(transport.heights_for("slow:1"), vec![1]);
        assert_eq!(transport.attempts_for("slow:1"), 3);
        assert_eq!(metrics.snapshot().peer_send_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_peer_link_closed() {
        let transport = Arc::new(MockTransport::new());
        let metrics = Arc::new(OrderingMetrics::new());
        let mut broadcaster = Broadcaster::new(transport.clone(), policy(), metrics);

        broadcaster.propagate(&proposal(1), &[Peer::new("a:1"), Peer::new("b:1")]);
        assert_eq!(broadcaster.link_count(), 2);

        broadcaster.propagate(&proposal(2), &[Peer::new("b:1")]);
        assert_eq!(broadcaster.link_count(), 1);
        broadcaster.close(Duration::from_secs(5)).await;

        // The retired link still delivered its backlog
        assert_eq!(transport.heights_for("a:1"), vec![1]);
        assert_eq!(transport.heights_for("b:1"), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_readded_peer_waits_for_retired_link() {
        let transport = Arc::new(MockTransport::new().slow("a:1", 1, Duration::from_millis(50)));
        let metrics = Arc::new(OrderingMetrics::new());
        let mut broadcaster = Broadcaster::new(transport.clone(), policy(), metrics);
        let peers = [Peer::new("a:1")];

        broadcaster.propagate(&proposal(1), &peers);
        broadcaster.propagate(&proposal(2), &[]);
        assert_eq!(broadcaster.link_count(), 0);
        broadcaster.propagate(&proposal(3), &peers);
        assert_eq!(broadcaster.link_count(), 1);
        broadcaster.close(Duration::from_secs(5)).await;

        assert_eq!(transport.heights_for("a:1"), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_churn_keeps_height_order() {
        let transport = Arc::new(
            MockTransport::new()
                .slow("a:1", 1, Duration::from_millis(80))
                .slow("a:1", 3, Duration::from_millis(40)),
        );
        let metrics = Arc::new(OrderingMetrics::new());
        let mut broadcaster = Broadcaster::new(transport.clone(), policy(), metrics);
        let peers = [Peer::new("a:1")];

        broadcaster.propagate(&proposal(1), &peers);
        broadcaster.propagate(&proposal(2), &[]);
        broadcaster.propagate(&proposal(3), &peers);
        broadcaster.propagate(&proposal(4), &[]);
        broadcaster.propagate(&proposal(5), &peers);
        broadcaster.close(Duration::from_secs(5)).await;

        assert_eq!(transport.heights_for("a:1"), vec![1, 3, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_change_keeps_link() {
        let transport = Arc::new(MockTransport::new().slow("a:1", 1, Duration::from_millis(50)));
        let metrics = Arc::new(OrderingMetrics::new());
        let mut broadcaster = Broadcaster::new(transport.clone(), policy(), metrics);

        broadcaster.propagate(&proposal(1), &[Peer::new("a:1")]);
        let report = broadcaster.propagate(&proposal(2), &[Peer::new("a:1").with_public_key([7; 32])]);
        assert_eq!(report.enqueued, 1);
        assert_eq!(broadcaster.link_count(), 1);
        broadcaster.close(Duration::from_secs(5)).await;

        assert_eq!(transport.heights_for("a:1"), vec![1, 2]);
        assert_eq!(transport.keys_for("a:1"), vec![None, Some([7; 32])]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_link_reports_lagging() {
        let transport = Arc::new(MockTransport::new().failing("stuck:1"));
        let metrics = Arc::new(OrderingMetrics::new());
        let tight = LinkPolicy {
            queue_depth: 1,
            max_attempts: 1,
            retry_backoff: Duration::from_millis(10),
        };
        let mut broadcaster = Broadcaster::new(transport, tight, metrics.clone());
        let peers = [Peer::new("stuck:1")];

        // Nothing yields in between, so the link task never gets to drain
        broadcaster.propagate(&proposal(1), &peers);
        let report = broadcaster.propagate(&proposal(2), &peers);

        assert_eq!(report.enqueued, 0);
        assert_eq!(
            report.lagging,
            vec![PropagationError::PeerLagging {
                peer: "stuck:1".into()
            }]
        );
        assert_eq!(metrics.snapshot().peer_lagging_drops, 1);
        broadcaster.close(Duration::from_secs(1)).await;
    }
}
