//! Ports (hexagonal boundaries) for the Ordering Service

pub mod inbound;
pub mod outbound;

pub use inbound::OrderingServiceApi;
pub use outbound::{PeerTransport, ProposalSink, SystemTimeSource, TimeSource};
