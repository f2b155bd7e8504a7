//! # QC-12: Ordering Service
//!
//! Collects client transactions into a bounded FIFO queue, cuts them into
//! height-numbered proposals when either the batch fills or the batch
//! timeout elapses, and pushes every proposal to the local gate and to all
//! registered peers.
//!
//! ## Architecture
//!
//! - **Domain**: TransactionQueue, ProposalBuilder, PeerRegistry, heights
//! - **Ports**: Inbound (OrderingServiceApi) and Outbound (PeerTransport, ProposalSink, TimeSource)
//! - **Application**: BatchTrigger, Broadcaster, and the single cutter task
//! - **Adapters**: Channel-backed gate subscription
//!
//! ## Guarantees
//!
//! - Every accepted transaction lands in exactly one proposal, in
//!   admission order, unless the service is stopped with the discard policy.
//! - Proposal heights start at 1 and increase by one with no gaps.
//! - No proposal is ever empty or larger than `max_batch_size`.
//! - A slow or failing peer never delays submitters, the gate, or other peers.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;

pub use adapters::gate::{gate_channel, ChannelGate, ProposalStream};
pub use application::service::{OrderingHandle, OrderingService};
pub use config::{OrderingConfig, ShutdownPolicy};
pub use domain::errors::*;
pub use domain::registry::RegistryUpdate;
pub use domain::value_objects::{CutReason, ServiceState};
pub use metrics::{MetricsSnapshot, OrderingMetrics};
pub use ports::inbound::OrderingServiceApi;
pub use ports::outbound::{PeerTransport, ProposalSink, SystemTimeSource, TimeSource};
pub use shared_types::{Peer, Proposal, Transaction};
