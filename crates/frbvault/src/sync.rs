//! The record synchronizer.
//!
//! Reads the record directory from the contract, writes new and updated
//! records back, and keeps an [`AppState`] in step. Every write raises a
//! pending banner, then a success or error banner, and a successful write is
//! followed by a full reload.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::contract::KeyValueContract;
use crate::error::{Error, Result};
use crate::record::{generate_id, Draft, Record, Status, StoredRecord};
use crate::state::AppState;
use crate::table::RecordTable;
use crate::wallet::Wallet;

/// Behaviour knobs for the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Observatories accepted on submit.
    pub observatories: Vec<String>,
    /// Pause before a process/analyze write.
    pub compute_delay: Duration,
    /// Validate status transitions before writing.
    pub enforce_transitions: bool,
    /// Prefix for contract keys.
    pub key_prefix: String,
}

impl SyncSettings {
    /// Take settings from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            observatories: config.workflow.observatories.clone(),
            compute_delay: config.compute_delay(),
            enforce_transitions: config.workflow.enforce_transitions,
            key_prefix: config.contract.key_prefix.clone(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Banner texts for one kind of operation.
struct Messages {
    pending: &'static str,
    success: &'static str,
    failure: &'static str,
}

const SUBMIT_MESSAGES: Messages = Messages {
    pending: "Encrypting FRB data with FHE...",
    success: "FRB data encrypted and submitted securely!",
    failure: "Submission failed",
};

fn advance_messages(next: Status) -> Messages {
    match next {
        Status::Processed => Messages {
            pending: "Processing FRB data with FHE...",
            success: "FHE processing completed successfully!",
            failure: "Processing failed",
        },
        Status::Analyzed => Messages {
            pending: "Analyzing FRB data with FHE...",
            success: "FHE analysis completed successfully!",
            failure: "Analysis failed",
        },
        Status::Raw => Messages {
            pending: "Updating FRB data status...",
            success: "FRB data status updated!",
            failure: "Update failed",
        },
    }
}

fn failure_message(prefix: &str, err: &Error) -> String {
    if err.is_user_rejected() {
        "Transaction rejected by user".to_string()
    } else {
        format!("{prefix}: {err}")
    }
}

/// Keeps application state in step with the contract.
pub struct Synchronizer<C: ?Sized> {
    table: RecordTable<C>,
    wallet: Option<Arc<dyn Wallet>>,
    settings: SyncSettings,
}

impl<C: ?Sized> fmt::Debug for Synchronizer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("wallet", &self.wallet.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<C: KeyValueContract + ?Sized> Synchronizer<C> {
    /// Create a synchronizer with no wallet attached.
    #[must_use]
    pub fn new(contract: Arc<C>, settings: SyncSettings) -> Self {
        Self {
            table: RecordTable::new(contract, settings.key_prefix.clone()),
            wallet: None,
            settings,
        }
    }

    /// Attach a wallet, enabling writes.
    #[must_use]
    pub fn with_wallet(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// The record table this synchronizer works on.
    #[must_use]
    pub fn table(&self) -> &RecordTable<C> {
        &self.table
    }

    /// The active settings.
    #[must_use]
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Connect the wallet and make its first account active.
    ///
    /// The returned receiver yields account changes; feed them to
    /// [`AppState::apply_accounts`].
    ///
    /// # Errors
    ///
    /// Returns a connectivity error if there is no wallet or no account.
    pub async fn connect(&self, state: &mut AppState) -> Result<watch::Receiver<Vec<String>>> {
        let wallet = self.wallet.as_ref().ok_or(Error::WalletNotConnected)?;
        let accounts = wallet.request_accounts().await?;
        state.apply_accounts(&accounts);
        match state.account() {
            Some(account) => info!("Connected as {account}"),
            None => return Err(Error::NoAccounts),
        }
        Ok(wallet.subscribe())
    }

    /// Forget the connected account.
    pub fn disconnect(&self, state: &mut AppState) {
        if let Some(account) = state.account() {
            info!("Disconnected {account}");
        }
        state.set_account(None);
    }

    fn signer<'a>(&'a self, state: &'a AppState) -> Result<(&'a dyn Wallet, &'a str)> {
        let wallet = self.wallet.as_deref().ok_or(Error::WalletNotConnected)?;
        let account = state.account().ok_or(Error::WalletNotConnected)?;
        Ok((wallet, account))
    }

    /// Read every indexed record, newest first.
    ///
    /// Records that are missing, unreadable or corrupt are logged and left
    /// out; they never fail the whole read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractUnavailable`] if the contract is down, or the
    /// underlying error if the index itself can't be read.
    pub async fn fetch_records(&self) -> Result<Vec<Record>> {
        if !self.table.contract().is_available().await? {
            return Err(Error::ContractUnavailable);
        }

        let ids = self.table.read_index().await?;
        let mut seen = HashSet::with_capacity(ids.len());
        let mut records = Vec::with_capacity(ids.len());

        for id in ids {
            if !seen.insert(id.clone()) {
                warn!("Duplicate id {id} in index, ignoring repeat");
                continue;
            }
            let bytes = match self.table.get_blob(&id).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("Error loading data {id}: {e}");
                    continue;
                }
            };
            if bytes.is_empty() {
                warn!("No data stored for {id}, skipping");
                continue;
            }
            match StoredRecord::from_bytes(&bytes) {
                Ok(stored) => records.push(Record::from_stored(id, stored)),
                Err(e) => error!("Error parsing data for {id}: {e}"),
            }
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        debug!("Loaded {} record(s)", records.len());
        Ok(records)
    }

    /// Replace the record list held in `state`, returning the new count.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Self::fetch_records`]; the previous list is
    /// left in place.
    pub async fn refresh(&self, state: &mut AppState) -> Result<usize> {
        state.set_refreshing(true);
        let fetched = self.fetch_records().await;
        state.set_refreshing(false);

        let records = fetched?;
        let count = records.len();
        state.set_records(records);
        Ok(count)
    }

    /// Refresh the record list held in `state`.
    ///
    /// Failures are logged and leave the previous list in place.
    pub async fn load(&self, state: &mut AppState) {
        if let Err(e) = self.refresh(state).await {
            error!("Error loading data: {e}");
        }
    }

    /// Submit a new observation. Returns the new record's id.
    ///
    /// Validation and connectivity are checked before any banner or write.
    /// The record blob is written before the index; if the index write fails
    /// the record is left unindexed.
    ///
    /// # Errors
    ///
    /// Returns validation, connectivity or transaction errors.
    pub async fn submit(&self, state: &mut AppState, draft: Draft) -> Result<String> {
        draft.validate(&self.settings.observatories)?;
        self.signer(state)?;

        state.show_pending(SUBMIT_MESSAGES.pending);
        match self.write_new_record(state, draft).await {
            Ok(id) => {
                info!("Submitted record {id}");
                state.show_success(SUBMIT_MESSAGES.success);
                self.load(state).await;
                Ok(id)
            }
            Err(e) => {
                error!("Submission failed: {e}");
                state.show_error(failure_message(SUBMIT_MESSAGES.failure, &e));
                Err(e)
            }
        }
    }

    async fn write_new_record(&self, state: &AppState, draft: Draft) -> Result<String> {
        let (wallet, account) = self.signer(state)?;
        let id = generate_id();
        let stored = draft.into_stored(&self.settings.observatories, Utc::now().timestamp())?;

        self.table
            .put_blob(wallet, account, &id, stored.to_bytes()?)
            .await?;
        debug!("Record {id} written, updating index");

        if let Err(e) = self.table.append_id(wallet, account, &id).await {
            warn!("Record {id} written but not indexed: {e}");
            return Err(e);
        }
        Ok(id)
    }

    /// Move a raw record to `processed`.
    ///
    /// # Errors
    ///
    /// See [`Self::advance`].
    pub async fn process(&self, state: &mut AppState, id: &str) -> Result<()> {
        self.advance(state, id, Status::Processed).await
    }

    /// Move a processed record to `analyzed`.
    ///
    /// # Errors
    ///
    /// See [`Self::advance`].
    pub async fn analyze(&self, state: &mut AppState, id: &str) -> Result<()> {
        self.advance(state, id, Status::Analyzed).await
    }

    /// Rewrite the stored status of `id` to `next`.
    ///
    /// With transition enforcement on, anything but the single legal next
    /// step fails before the write.
    ///
    /// # Errors
    ///
    /// Returns connectivity errors, [`Error::NotFound`],
    /// [`Error::InvalidTransition`] or transaction errors.
    pub async fn advance(&self, state: &mut AppState, id: &str, next: Status) -> Result<()> {
        self.signer(state)?;
        let messages = advance_messages(next);

        state.show_pending(messages.pending);
        if !self.settings.compute_delay.is_zero() {
            tokio::time::sleep(self.settings.compute_delay).await;
        }

        match self.write_status(state, id, next).await {
            Ok(()) => {
                info!("Record {id} is now {next}");
                state.show_success(messages.success);
                self.load(state).await;
                Ok(())
            }
            Err(e) => {
                error!("{} for {id}: {e}", messages.failure);
                state.show_error(failure_message(messages.failure, &e));
                Err(e)
            }
        }
    }

    async fn write_status(&self, state: &AppState, id: &str, next: Status) -> Result<()> {
        let (wallet, account) = self.signer(state)?;

        let bytes = self.table.get_blob(id).await?;
        if bytes.is_empty() {
            return Err(Error::not_found(id));
        }
        let mut stored = StoredRecord::from_bytes(&bytes)?;

        if self.settings.enforce_transitions {
            stored.status = stored.status.advance_to(next)?;
        } else {
            if !stored.status.can_advance_to(next) {
                warn!("Unchecked status change for {id}: {} -> {next}", stored.status);
            }
            stored.status = next;
        }

        self.table
            .put_blob(wallet, account, id, stored.to_bytes()?)
            .await?;
        Ok(())
    }
}
