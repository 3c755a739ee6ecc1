//! `frbvault` - A record vault for fast radio burst observations
//!
//! Observations are stored as JSON blobs in a key-value contract, indexed by a
//! single id list, and move through `raw`, `processed` and `analyzed`. The
//! [`Synchronizer`] reads and writes them and keeps an [`AppState`] current.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod logging;
pub mod payload;
pub mod record;
pub mod state;
pub mod sync;
pub mod table;
pub mod wallet;

pub use config::Config;
pub use contract::{KeyValueContract, MemoryContract, SignedTx, SqliteContract, TxReceipt};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{Draft, Record, Status};
pub use state::{Action, AppState, StatusCounts};
pub use sync::{SyncSettings, Synchronizer};
pub use wallet::{LocalWallet, Wallet};
