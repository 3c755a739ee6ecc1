//! Wallet and signer provider.
//!
//! The wallet supplies accounts, notifies about account changes and signs
//! contract writes. [`LocalWallet`] is a provider backed by a configured
//! account list; it signs with a keyed `blake3` digest, which proves nothing
//! cryptographically but gives every write a stable sender and hash.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::contract::SignedTx;
use crate::error::{Error, Result};

/// A provider of accounts and signatures.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Ask the wallet for its accounts. The first one is the active account.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet refuses to connect.
    async fn request_accounts(&self) -> Result<Vec<String>>;

    /// Subscribe to account changes.
    fn subscribe(&self) -> watch::Receiver<Vec<String>>;

    /// Sign a write of `value` to `key` on behalf of `from`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserRejected`] if the user declines.
    async fn sign(&self, from: &str, key: &str, value: Vec<u8>) -> Result<SignedTx>;
}

/// Wallet backed by a fixed list of local accounts.
#[derive(Debug)]
pub struct LocalWallet {
    accounts: watch::Sender<Vec<String>>,
    reject_signing: AtomicBool,
}

impl LocalWallet {
    /// Create a wallet holding the given accounts.
    #[must_use]
    pub fn new(accounts: Vec<String>) -> Self {
        let (accounts, _) = watch::channel(accounts);
        Self {
            accounts,
            reject_signing: AtomicBool::new(false),
        }
    }

    /// Create a wallet holding a single account.
    #[must_use]
    pub fn with_account(account: impl Into<String>) -> Self {
        Self::new(vec![account.into()])
    }

    /// Replace the account list, notifying subscribers.
    pub fn switch_accounts(&self, accounts: Vec<String>) {
        info!("Wallet accounts changed ({} account(s))", accounts.len());
        self.accounts.send_replace(accounts);
    }

    /// Make every subsequent signature request fail as a user rejection.
    pub fn set_reject_signing(&self, reject: bool) {
        self.reject_signing.store(reject, Ordering::SeqCst);
    }

    fn holds(&self, account: &str) -> bool {
        self.accounts
            .borrow()
            .iter()
            .any(|a| a.eq_ignore_ascii_case(account))
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    async fn request_accounts(&self) -> Result<Vec<String>> {
        let accounts = self.accounts.borrow().clone();
        if accounts.is_empty() {
            return Err(Error::NoAccounts);
        }
        Ok(accounts)
    }

    fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.accounts.subscribe()
    }

    async fn sign(&self, from: &str, key: &str, value: Vec<u8>) -> Result<SignedTx> {
        if self.reject_signing.load(Ordering::SeqCst) {
            return Err(Error::UserRejected);
        }
        if !self.holds(from) {
            return Err(Error::WalletNotConnected);
        }

        let mut hasher = blake3::Hasher::new_derive_key("frbvault local wallet v1");
        hasher.update(from.as_bytes());
        hasher.update(key.as_bytes());
        hasher.update(&value);
        let signature = hasher.finalize().to_hex().to_string();
        debug!("Signed write to {key} as {from}");

        Ok(SignedTx {
            from: from.to_string(),
            key: key.to_string(),
            value,
            signature,
        })
    }
}
