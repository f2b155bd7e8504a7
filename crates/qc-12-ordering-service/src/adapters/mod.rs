//! Adapters for the Ordering Service ports

pub mod gate;

pub use gate::{gate_channel, ChannelGate, ProposalStream};
