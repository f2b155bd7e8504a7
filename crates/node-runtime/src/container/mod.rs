//! # Node Container
//!
//! Configuration and the lifetime of one ordering node.

pub mod config;
pub mod node;

pub use config::{NodeConfig, NodeError};
pub use node::OrderingNode;
