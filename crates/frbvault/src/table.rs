//! A table emulated on top of the flat key-value contract.
//!
//! One key, `<prefix>_keys`, holds a JSON array with every record id ever
//! created. Each record lives under `<prefix>_<id>`. The index is append-only.
//!
//! [`RecordTable::append_id`] is a plain read-modify-write. Two writers racing
//! on it can drop an id; a compare-and-swap primitive on the contract would
//! slot in there.

use std::sync::Arc;

use tracing::{error, warn};

use crate::contract::{KeyValueContract, TxReceipt};
use crate::error::Result;
use crate::wallet::Wallet;

/// Ordered id list plus keyed blob store.
#[derive(Debug)]
pub struct RecordTable<C: ?Sized> {
    contract: Arc<C>,
    prefix: String,
}

impl<C: ?Sized> Clone for RecordTable<C> {
    fn clone(&self) -> Self {
        Self {
            contract: Arc::clone(&self.contract),
            prefix: self.prefix.clone(),
        }
    }
}

impl<C: KeyValueContract + ?Sized> RecordTable<C> {
    /// Create a table over `contract` using `prefix` for its keys.
    #[must_use]
    pub fn new(contract: Arc<C>, prefix: impl Into<String>) -> Self {
        Self {
            contract,
            prefix: prefix.into(),
        }
    }

    /// The underlying contract.
    #[must_use]
    pub fn contract(&self) -> &Arc<C> {
        &self.contract
    }

    /// Key holding the id index.
    #[must_use]
    pub fn index_key(&self) -> String {
        format!("{}_keys", self.prefix)
    }

    /// Key holding the record with the given id.
    #[must_use]
    pub fn record_key(&self, id: &str) -> String {
        format!("{}_{id}", self.prefix)
    }

    /// Read the id index.
    ///
    /// An empty or unparsable index is logged and treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error only if the contract read itself fails.
    pub async fn read_index(&self) -> Result<Vec<String>> {
        let bytes = self.contract.get_data(&self.index_key()).await?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_slice::<Vec<String>>(&bytes) {
            Ok(ids) => Ok(ids),
            Err(e) => {
                error!("Error parsing {}: {e}", self.index_key());
                Ok(Vec::new())
            }
        }
    }

    /// Append `id` to the index, re-reading it first.
    ///
    /// An id already present is not added twice.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the write fails.
    pub async fn append_id(
        &self,
        wallet: &dyn Wallet,
        from: &str,
        id: &str,
    ) -> Result<Option<TxReceipt>> {
        let mut ids = self.read_index().await?;
        if ids.iter().any(|existing| existing == id) {
            warn!("Id {id} already indexed, skipping index write");
            return Ok(None);
        }
        ids.push(id.to_string());

        let value = serde_json::to_vec(&ids)?;
        let tx = wallet.sign(from, &self.index_key(), value).await?;
        let receipt = self.contract.set_data(tx).await?;
        Ok(Some(receipt))
    }

    /// Fetch the blob stored for `id`. Empty means absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the contract read fails.
    pub async fn get_blob(&self, id: &str) -> Result<Vec<u8>> {
        self.contract.get_data(&self.record_key(id)).await
    }

    /// Store the blob for `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the write fails.
    pub async fn put_blob(
        &self,
        wallet: &dyn Wallet,
        from: &str,
        id: &str,
        value: Vec<u8>,
    ) -> Result<TxReceipt> {
        let tx = wallet.sign(from, &self.record_key(id), value).await?;
        self.contract.set_data(tx).await
    }
}
