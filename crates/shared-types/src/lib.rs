//! # Shared Types Crate
//!
//! Entities shared between the network layer and the ordering core.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Transaction`, `Proposal` and `Peer` are
//!   defined once and used on both sides of the RPC boundary.
//! - **Opaque Payloads**: nothing here interprets transaction contents.
//! - **Immutable Proposals**: a `Proposal` exposes read-only accessors.

pub mod entities;

pub use entities::*;
