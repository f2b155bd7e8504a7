//! # Ordering Node
//!
//! Owns the running pieces of one node: the ordering service, the HTTP
//! server, the local gate consumer and the inbox for peer proposals.
//!
//! ## Startup
//!
//! 1. Validate configuration
//! 2. Bind the listener (fail before anything is spawned)
//! 3. Start the ordering service with the HTTP peer transport
//! 4. Spawn the gate consumer and the HTTP server
//!
//! ## Shutdown
//!
//! The ordering service stops first so the final proposals still go out
//! while the server keeps answering (`503 service_stopped` for late
//! submissions). The server stops last, whether or not the earlier steps
//! succeeded.

use crate::adapters::{build_router, AppState, HttpPeerTransport};
use crate::container::config::NodeConfig;
use crate::handlers::{run_gate_consumer, ProposalInbox};
use anyhow::{Context, Result};
use qc_12_ordering_service::{gate_channel, OrderingHandle, OrderingService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Proposals a slow inbox subscriber may fall behind by.
const INBOX_BUFFER: usize = 1024;

pub struct OrderingNode {
    ordering: OrderingHandle,
    inbox: Arc<ProposalInbox>,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    server: JoinHandle<std::io::Result<()>>,
    gate: JoinHandle<u64>,
}

impl OrderingNode {
    pub async fn start(config: NodeConfig) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.listen_address)
            .await
            .with_context(|| format!("Failed to bind {}", config.listen_address))?;
        let local_addr = listener.local_addr()?;

        let transport = HttpPeerTransport::new(config.peer_request_timeout())
            .context("Failed to build peer HTTP client")?;
        let (gate, proposals) = gate_channel();
        let ordering = OrderingService::new(config.ordering.clone())
            .with_peers(config.peers())
            .start(Arc::new(transport), Arc::new(gate))?;
        let gate = tokio::spawn(run_gate_consumer(proposals));

        let inbox = Arc::new(ProposalInbox::new(INBOX_BUFFER));
        let router = build_router(AppState {
            ordering: ordering.clone(),
            inbox: Arc::clone(&inbox),
        });

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
        });

        info!(
            address = %local_addr,
            peers = config.initial_peers.len(),
            "Ordering node listening"
        );

        Ok(Self {
            ordering,
            inbox,
            local_addr,
            shutdown_tx,
            server,
            gate,
        })
    }

    /// Bound address; differs from the configured one when port 0 was used.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn ordering(&self) -> &OrderingHandle {
        &self.ordering
    }

    pub fn inbox(&self) -> &Arc<ProposalInbox> {
        &self.inbox
    }

    /// Stop ordering, then the server. The server is always stopped, even
    /// when an earlier step fails; the first failure is returned.
    pub async fn shutdown(self) -> Result<()> {
        info!("Initiating graceful shutdown...");

        let ordering = self
            .ordering
            .shutdown()
            .await
            .context("Ordering service failed to stop");
        let gate = self.gate.await.context("Gate consumer did not finish");

        // Err only means the server already exited
        let _ = self.shutdown_tx.send(true);
        let server = match self.server.await.context("HTTP server panicked") {
            Ok(result) => result.context("HTTP server failed"),
            Err(e) => Err(e),
        };

        if let Err(e) = &ordering {
            error!(error = %e, "Ordering shutdown failed");
        }
        ordering?;
        let local_proposals = gate?;
        server?;

        let metrics = self.ordering.metrics();
        info!(
            local_proposals,
            accepted = metrics.transactions_accepted,
            proposed = metrics.transactions_proposed,
            "Shutdown complete"
        );
        Ok(())
    }
}
