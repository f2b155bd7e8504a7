//! # Core Domain Entities
//!
//! Entities exchanged between the network layer and the ordering core.
//!
//! ## Clusters
//!
//! - **Intake**: `Transaction`, `TransactionSignature`
//! - **Ordering**: `Proposal`
//! - **Networking**: `Peer`

use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// Unix time in milliseconds.
pub type Timestamp = u64;

// =============================================================================
// CLUSTER A: INTAKE
// =============================================================================

/// One signature attached to a transaction.
///
/// Signatures are verified upstream; the ordering core only carries them.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    /// Signer's public key.
    pub public_key: PublicKey,
    /// Signature over the transaction payload.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

/// A client transaction as admitted by the network layer.
///
/// Opaque to the ordering core: the payload is never interpreted, only
/// carried in arrival order. The payload travels as base64 on the wire.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Account that created the transaction.
    pub creator_account_id: String,
    /// Creation time reported by the client (ms).
    pub created_time: Timestamp,
    /// Opaque command payload.
    #[serde_as(as = "Base64")]
    pub payload: Vec<u8>,
    /// Signatures over the payload.
    #[serde(default)]
    pub signatures: Vec<TransactionSignature>,
}

impl Transaction {
    /// Create an unsigned transaction.
    pub fn new(
        creator_account_id: impl Into<String>,
        created_time: Timestamp,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            creator_account_id: creator_account_id.into(),
            created_time,
            payload,
            signatures: Vec::new(),
        }
    }

    /// Attach a signature.
    pub fn with_signature(mut self, public_key: PublicKey, signature: Signature) -> Self {
        self.signatures.push(TransactionSignature {
            public_key,
            signature,
        });
        self
    }

    /// Compute the transaction hash.
    ///
    /// Length prefixes keep the encoding unambiguous across field boundaries.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update((self.creator_account_id.len() as u64).to_le_bytes());
        hasher.update(self.creator_account_id.as_bytes());
        hasher.update(self.created_time.to_le_bytes());
        hasher.update((self.payload.len() as u64).to_le_bytes());
        hasher.update(&self.payload);
        for sig in &self.signatures {
            hasher.update(sig.public_key);
            hasher.update(sig.signature);
        }
        hasher.finalize().into()
    }
}

// =============================================================================
// CLUSTER B: ORDERING
// =============================================================================

/// An immutable, ordered batch of transactions cut by an ordering service.
///
/// Fields are private: once built, a proposal is only ever read. Retries
/// resend the same value, never a rebuilt one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    height: u64,
    created_time: Timestamp,
    transactions: Vec<Transaction>,
}

impl Proposal {
    /// Assemble a proposal. Ordering services go through their builder,
    /// which enforces the non-empty and size invariants.
    pub fn new(height: u64, created_time: Timestamp, transactions: Vec<Transaction>) -> Self {
        Self {
            height,
            created_time,
            transactions,
        }
    }

    /// Sequence number of this proposal (strictly increasing per service).
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Time the proposal was cut (ms).
    pub fn created_time(&self) -> Timestamp {
        self.created_time
    }

    /// Transactions in arrival order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

// =============================================================================
// CLUSTER C: NETWORKING
// =============================================================================

/// A participating node that receives proposals.
///
/// Identity inside a peer list is the address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    /// Network address (host:port).
    pub address: String,
    /// Node public key, when known.
    #[serde(default)]
    pub public_key: Option<PublicKey>,
}

impl Peer {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            public_key: None,
        }
    }

    pub fn with_public_key(mut self, public_key: PublicKey) -> Self {
        self.public_key = Some(public_key);
        self
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}
