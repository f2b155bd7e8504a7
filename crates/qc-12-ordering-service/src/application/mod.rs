//! Application layer: trigger, broadcaster and the cutter that drives them.

pub mod broadcaster;
pub mod service;
pub mod trigger;

pub use broadcaster::{Broadcaster, LinkPolicy, PropagationReport};
pub use service::{OrderingHandle, OrderingService};
pub use trigger::{BatchTrigger, TriggerHandle};
