//! # Handlers
//!
//! Consumers of proposals, local and remote.

pub mod gate;

pub use gate::{run_gate_consumer, ProposalInbox};
