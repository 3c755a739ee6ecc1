//! Application state owned by the caller of the synchronizer.
//!
//! Holds what a dashboard shows: the connected account, the record list and
//! the transaction banner. Operations take `&mut AppState` instead of touching
//! globals.
//!
//! Finished banners carry an expiry but are not removed on their own; the
//! view layer calls [`AppState::clear_expired`] before each render.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::record::{Record, Status};

/// Phase of the transaction banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPhase {
    /// An operation is in flight.
    Pending,
    /// The operation finished.
    Success,
    /// The operation failed.
    Error,
}

/// A status banner shown while and after an operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// Phase shown.
    pub phase: TxPhase,
    /// Message shown.
    pub message: String,
    /// When the banner should disappear. Pending banners never expire.
    pub expires_at: Option<Instant>,
}

/// How long finished banners stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerTimings {
    /// Lifetime of a success banner.
    pub success: Duration,
    /// Lifetime of an error banner.
    pub error: Duration,
}

impl Default for BannerTimings {
    fn default() -> Self {
        Self {
            success: Duration::from_millis(2000),
            error: Duration::from_millis(3000),
        }
    }
}

/// Forward actions a record can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// raw to processed.
    Process,
    /// processed to analyzed.
    Analyze,
}

impl Action {
    /// Status the action moves a record to.
    #[must_use]
    pub fn target(self) -> Status {
        match self {
            Self::Process => Status::Processed,
            Self::Analyze => Status::Analyzed,
        }
    }
}

/// Per-status record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Records awaiting processing.
    pub raw: usize,
    /// Records awaiting analysis.
    pub processed: usize,
    /// Finished records.
    pub analyzed: usize,
}

impl StatusCounts {
    /// Total number of records.
    #[must_use]
    pub fn total(&self) -> usize {
        self.raw + self.processed + self.analyzed
    }

    /// Share of records with `status`, in percent. Zero when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self, status: Status) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let count = match status {
            Status::Raw => self.raw,
            Status::Processed => self.processed,
            Status::Analyzed => self.analyzed,
        };
        count as f64 * 100.0 / total as f64
    }
}

/// Everything the view layer renders.
#[derive(Debug, Default)]
pub struct AppState {
    account: Option<String>,
    records: Vec<Record>,
    refreshing: bool,
    banner: Option<Banner>,
    timings: BannerTimings,
}

impl AppState {
    /// Create empty state with the given banner timings.
    #[must_use]
    pub fn new(timings: BannerTimings) -> Self {
        Self {
            timings,
            ..Self::default()
        }
    }

    /// The connected account, if any.
    #[must_use]
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Set or clear the connected account.
    pub fn set_account(&mut self, account: Option<String>) {
        self.account = account.filter(|a| !a.is_empty());
    }

    /// Apply an account-change notification. The first account becomes active.
    pub fn apply_accounts(&mut self, accounts: &[String]) {
        self.set_account(accounts.first().cloned());
    }

    /// Records, newest first.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Look up a record by id.
    #[must_use]
    pub fn record(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub(crate) fn set_records(&mut self, records: Vec<Record>) {
        self.records = records;
    }

    /// Whether a load is in progress.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub(crate) fn set_refreshing(&mut self, refreshing: bool) {
        self.refreshing = refreshing;
    }

    /// The banner currently shown.
    #[must_use]
    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    /// Show a pending banner.
    pub fn show_pending(&mut self, message: impl Into<String>) {
        self.banner = Some(Banner {
            phase: TxPhase::Pending,
            message: message.into(),
            expires_at: None,
        });
    }

    /// Show a success banner that expires after the success timeout.
    pub fn show_success(&mut self, message: impl Into<String>) {
        self.banner = Some(Banner {
            phase: TxPhase::Success,
            message: message.into(),
            expires_at: Some(Instant::now() + self.timings.success),
        });
    }

    /// Show an error banner that expires after the error timeout.
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.banner = Some(Banner {
            phase: TxPhase::Error,
            message: message.into(),
            expires_at: Some(Instant::now() + self.timings.error),
        });
    }

    /// Drop the banner if it has expired at `now`. Returns whether it was dropped.
    pub fn clear_expired(&mut self, now: Instant) -> bool {
        let expired = self
            .banner
            .as_ref()
            .and_then(|b| b.expires_at)
            .is_some_and(|deadline| now >= deadline);
        if expired {
            self.banner = None;
        }
        expired
    }

    /// Count records per status.
    #[must_use]
    pub fn stats(&self) -> StatusCounts {
        self.records
            .iter()
            .fold(StatusCounts::default(), |mut counts, record| {
                match record.status {
                    Status::Raw => counts.raw += 1,
                    Status::Processed => counts.processed += 1,
                    Status::Analyzed => counts.analyzed += 1,
                }
                counts
            })
    }

    /// Actions the connected account may take on `record`.
    ///
    /// Only the nominal owner is offered anything. This gates the interface;
    /// the contract itself accepts writes from any account.
    #[must_use]
    pub fn available_actions(&self, record: &Record) -> Vec<Action> {
        let Some(account) = self.account() else {
            return Vec::new();
        };
        if !record.is_owned_by(account) {
            return Vec::new();
        }
        match record.status {
            Status::Raw => vec![Action::Process],
            Status::Processed => vec![Action::Analyze],
            Status::Analyzed => Vec::new(),
        }
    }
}
