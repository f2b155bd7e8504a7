//! Domain module for the Ordering Service
//!
//! Queue, builder, registry and the value objects shared by the cutter.

pub mod builder;
pub mod errors;
pub mod queue;
pub mod registry;
pub mod value_objects;

pub use builder::{split_into_batches, ProposalBuilder};
pub use errors::*;
pub use queue::TransactionQueue;
pub use registry::{PeerRegistry, RegistryUpdate};
pub use value_objects::*;
