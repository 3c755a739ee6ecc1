//! `SQLite`-backed contract.
//!
//! Stores every key in a single `kv` table and appends each accepted write to
//! a `transactions` log, so a local database behaves like the contract's
//! `getData`/`setData` surface.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use super::{migrations, KeyValueContract, SignedTx, TxReceipt};
use crate::error::{Error, Result};

/// Contract backend persisted in a `SQLite` file.
///
/// The connection sits behind a mutex that is never held across an `.await`.
#[derive(Debug)]
pub struct SqliteContract {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteContract {
    /// Open or create a contract database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening contract database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets concurrent readers see committed writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Contract database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory contract for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("contract connection lock poisoned"))
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<ContractStats> {
        let conn = self.lock()?;
        let keys: i64 = conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        let transactions: i64 =
            conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        let last: Option<String> = conn
            .query_row(
                "SELECT applied_at FROM transactions ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        drop(conn);

        let last_write = last
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(ContractStats {
            keys,
            transactions,
            last_write,
            db_size_bytes,
        })
    }

    /// Count the writes a given account has made.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn transactions_from(&self, sender: &str) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE sender = ?1",
            [sender],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[async_trait]
impl KeyValueContract for SqliteContract {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn is_available(&self) -> Result<bool> {
        let conn = self.lock()?;
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(one == 1)
    }

    async fn get_data(&self, key: &str) -> Result<Vec<u8>> {
        let conn = self.lock()?;
        let value: Option<Vec<u8>> = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value.unwrap_or_default())
    }

    async fn set_data(&self, tx: SignedTx) -> Result<TxReceipt> {
        let tx_hash = tx.hash();
        let applied_at = Utc::now();
        let value_len = i64::try_from(tx.value.len()).unwrap_or(i64::MAX);

        let mut conn = self.lock()?;
        let txn = conn.transaction()?;
        txn.execute(
            r"
            INSERT INTO transactions (tx_hash, sender, key, value_len, applied_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![tx_hash, tx.from, tx.key, value_len, applied_at.to_rfc3339()],
        )?;
        let seq = txn.last_insert_rowid();
        txn.execute(
            r"
            INSERT INTO kv (key, value, updated_seq) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_seq = excluded.updated_seq
            ",
            params![tx.key, tx.value, seq],
        )?;
        txn.commit()?;
        drop(conn);

        debug!("sqlite contract: {} bytes to {} (seq {})", value_len, tx.key, seq);
        Ok(TxReceipt {
            tx_hash,
            sequence: u64::try_from(seq).unwrap_or_default(),
            applied_at,
        })
    }
}

/// Statistics about the contract database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractStats {
    /// Number of keys stored.
    pub keys: i64,
    /// Number of accepted writes.
    pub transactions: i64,
    /// Time of the most recent write.
    pub last_write: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
