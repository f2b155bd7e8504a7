//! Channel-backed gate subscription.
//!
//! The ordering service holds the sending half; the gate owns the
//! `ProposalStream` and never references the service itself.

use crate::ports::outbound::ProposalSink;
use shared_types::Proposal;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

/// Sink half handed to the ordering service.
pub struct ChannelGate {
    sender: mpsc::UnboundedSender<Arc<Proposal>>,
}

/// Gate half: every proposal the service cuts, in height order.
///
/// Ends once the service has shut down.
pub struct ProposalStream {
    inner: UnboundedReceiverStream<Arc<Proposal>>,
}

/// Create a connected gate sink and stream.
pub fn gate_channel() -> (ChannelGate, ProposalStream) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        ChannelGate { sender },
        ProposalStream {
            inner: UnboundedReceiverStream::new(receiver),
        },
    )
}

impl ProposalSink for ChannelGate {
    fn on_proposal(&self, proposal: Arc<Proposal>) {
        let height = proposal.height();
        if self.sender.send(proposal).is_err() {
            warn!(height, "[ordering] Gate stream dropped, proposal not delivered locally");
        }
    }
}

impl ProposalStream {
    /// Next proposal, or `None` after shutdown.
    pub async fn recv(&mut self) -> Option<Arc<Proposal>> {
        self.inner.next().await
    }
}

impl Stream for ProposalStream {
    type Item = Arc<Proposal>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
