//! In-memory contract backend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{KeyValueContract, SignedTx, TxReceipt};
use crate::error::{Error, Result};

/// A contract that keeps everything in a map.
///
/// Writes can be made to revert per key, and the whole contract can be marked
/// unavailable, so failure paths can be exercised without a chain.
#[derive(Debug)]
pub struct MemoryContract {
    data: RwLock<HashMap<String, Vec<u8>>>,
    reverting: RwLock<HashSet<String>>,
    available: AtomicBool,
    sequence: AtomicU64,
}

impl Default for MemoryContract {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryContract {
    /// Create an empty, available contract.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            reverting: RwLock::new(HashSet::new()),
            available: AtomicBool::new(true),
            sequence: AtomicU64::new(0),
        }
    }

    /// Mark the contract available or not.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every write to `key` revert until [`Self::clear_reverts`].
    pub async fn revert_writes_to(&self, key: impl Into<String>) {
        self.reverting.write().await.insert(key.into());
    }

    /// Stop reverting writes.
    pub async fn clear_reverts(&self) {
        self.reverting.write().await.clear();
    }

    /// Store bytes directly, bypassing signing.
    pub async fn insert_raw(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.data.write().await.insert(key.into(), value.into());
    }

    /// Number of keys held.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Check whether no keys are held.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueContract for MemoryContract {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn is_available(&self) -> Result<bool> {
        Ok(self.available.load(Ordering::SeqCst))
    }

    async fn get_data(&self, key: &str) -> Result<Vec<u8>> {
        Ok(self.data.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn set_data(&self, tx: SignedTx) -> Result<TxReceipt> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(Error::ContractUnavailable);
        }
        if self.reverting.read().await.contains(&tx.key) {
            return Err(Error::reverted(tx.key, "write refused by contract"));
        }

        let tx_hash = tx.hash();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("memory contract: {} bytes to {} (seq {})", tx.value.len(), tx.key, sequence);
        self.data.write().await.insert(tx.key, tx.value);

        Ok(TxReceipt {
            tx_hash,
            sequence,
            applied_at: Utc::now(),
        })
    }
}
