//! `SQLite` schema definitions for the contract backend.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the key-value table.
pub const CREATE_KV_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    updated_seq INTEGER NOT NULL
)
";

/// SQL statement to create the transaction log.
pub const CREATE_TRANSACTIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS transactions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    tx_hash TEXT NOT NULL,
    sender TEXT NOT NULL,
    key TEXT NOT NULL,
    value_len INTEGER NOT NULL,
    applied_at TEXT NOT NULL
)
";

/// SQL statement to create an index on the transaction key.
pub const CREATE_TX_KEY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_transactions_key ON transactions(key)
";

/// SQL statement to create an index on the transaction sender.
pub const CREATE_TX_SENDER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_transactions_sender ON transactions(sender)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_KV_TABLE,
    CREATE_TRANSACTIONS_TABLE,
    CREATE_TX_KEY_INDEX,
    CREATE_TX_SENDER_INDEX,
    CREATE_METADATA_TABLE,
];
