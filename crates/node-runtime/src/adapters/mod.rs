//! # Adapters
//!
//! Network-facing implementations: the inbound HTTP surface and the
//! outbound peer transport.

pub mod peer_transport;
pub mod rpc;

pub use peer_transport::HttpPeerTransport;
pub use rpc::{build_router, AppState};
