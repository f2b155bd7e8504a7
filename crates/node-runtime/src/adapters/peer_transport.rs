//! # HTTP Peer Transport
//!
//! `PeerTransport` over HTTP: one `POST http://{peer}/v1/proposals` with the
//! JSON proposal per attempt.

use async_trait::async_trait;
use qc_12_ordering_service::{PeerTransport, PropagationError};
use shared_types::{Peer, Proposal};
use std::time::Duration;

/// Path peers accept proposals on.
pub const PROPOSALS_PATH: &str = "/v1/proposals";

#[derive(Clone, Debug)]
pub struct HttpPeerTransport {
    client: reqwest::Client,
}

impl HttpPeerTransport {
    /// `timeout` bounds both connecting and the whole request.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    fn url(peer: &Peer) -> String {
        format!("http://{}{}", peer.address, PROPOSALS_PATH)
    }
}

#[async_trait]
impl PeerTransport for HttpPeerTransport {
    async fn send_proposal(
        &self,
        peer: &Peer,
        proposal: &Proposal,
    ) -> Result<(), PropagationError> {
        let unreachable = |e: reqwest::Error| PropagationError::PeerUnreachable {
            peer: peer.address.clone(),
            reason: e.to_string(),
        };

        self.client
            .post(Self::url(peer))
            .json(proposal)
            .send()
            .await
            .map_err(unreachable)?
            .error_for_status()
            .map_err(unreachable)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Transaction;

    #[test]
    fn test_url() {
        assert_eq!(
            HttpPeerTransport::url(&Peer::new("10.0.0.2:50051")),
            "http://10.0.0.2:50051/v1/proposals"
        );
    }

    #[tokio::test]
    async fn test_unreachable_peer_maps_to_error() {
        let transport = HttpPeerTransport::new(Duration::from_millis(200)).unwrap();
        // Port 9 (discard) on localhost is closed in CI containers
        let peer = Peer::new("127.0.0.1:9");
        let proposal = Proposal::new(1, 0, vec![Transaction::new("a", 0, vec![1])]);

        let err = transport.send_proposal(&peer, &proposal).await.unwrap_err();
        assert!(matches!(
            err,
            PropagationError::PeerUnreachable { ref peer, .. } if peer == "127.0.0.1:9"
        ));
    }
}
