//! # Node Runtime Library
//!
//! Exposes the node's building blocks for tests. The main entry point is
//! the `main.rs` binary.
//!
//! - `container/` - configuration and the running node
//! - `adapters/` - HTTP surface and HTTP peer transport
//! - `handlers/` - local gate consumer and peer proposal inbox

pub mod adapters;
pub mod container;
pub mod handlers;

pub use container::{NodeConfig, NodeError, OrderingNode};
