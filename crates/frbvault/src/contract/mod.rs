//! Key-value contract interface for frbvault.
//!
//! The contract is the only persistence layer. Reads go through a read-only
//! handle; writes carry a [`SignedTx`] produced by the wallet and resolve to a
//! [`TxReceipt`] once durable.

mod memory;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

pub use memory::MemoryContract;
pub use sqlite::{ContractStats, SqliteContract};

/// A write request signed by a wallet account.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedTx {
    /// Account that signed the write.
    pub from: String,
    /// Target key.
    pub key: String,
    /// Bytes to store.
    pub value: Vec<u8>,
    /// Hex signature over sender, key and value.
    pub signature: String,
}

impl SignedTx {
    /// Compute the transaction hash.
    #[must_use]
    pub fn hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.signature.as_bytes());
        hasher.update(self.key.as_bytes());
        hasher.update(&self.value);
        hasher.finalize().to_hex().to_string()
    }
}

impl fmt::Debug for SignedTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedTx")
            .field("from", &self.from)
            .field("key", &self.key)
            .field("value_len", &self.value.len())
            .field("signature", &self.signature)
            .finish()
    }
}

/// Proof that a write was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    /// Transaction hash.
    pub tx_hash: String,
    /// Monotonic sequence number assigned by the contract.
    pub sequence: u64,
    /// When the write was applied.
    pub applied_at: DateTime<Utc>,
}

/// The contract surface frbvault consumes.
#[async_trait]
pub trait KeyValueContract: Send + Sync {
    /// Short name of the backend, for status output.
    fn backend_name(&self) -> &'static str;

    /// Check whether the contract accepts calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend itself can't be reached.
    async fn is_available(&self) -> Result<bool>;

    /// Read the bytes stored under `key`. Absent keys yield an empty vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn get_data(&self, key: &str) -> Result<Vec<u8>>;

    /// Store `tx.value` under `tx.key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the contract rejects the write.
    async fn set_data(&self, tx: SignedTx) -> Result<TxReceipt>;
}
