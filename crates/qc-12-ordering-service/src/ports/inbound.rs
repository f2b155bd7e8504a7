//! Inbound Ports (Driving Ports / API)

use crate::domain::errors::RejectReason;
use crate::domain::registry::RegistryUpdate;
use crate::domain::value_objects::ServiceState;
use shared_types::{Peer, Transaction};

/// Primary Ordering Service API, driven by the network layer.
pub trait OrderingServiceApi: Send + Sync {
    /// Admit a transaction (`SendTransaction`).
    ///
    /// The only mutating entry point from the network. Never blocks on
    /// propagation; at most waits for the queue append.
    fn submit_transaction(&self, tx: Transaction) -> Result<(), RejectReason>;

    /// Replace the peer list.
    ///
    /// A broadcast already underway keeps its snapshot; the change applies
    /// from the next proposal on.
    fn on_peer_list_update(&self, new_peers: Vec<Peer>) -> RegistryUpdate;

    /// Register one peer. `false` if its address is already known.
    fn add_peer(&self, peer: Peer) -> bool;

    /// Drop the peer with `address`. `false` if it was not registered.
    fn remove_peer(&self, address: &str) -> bool;

    /// Current peer list.
    fn peers(&self) -> Vec<Peer>;

    fn state(&self) -> ServiceState;

    fn queue_len(&self) -> usize;
}
