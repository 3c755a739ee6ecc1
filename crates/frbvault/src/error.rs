//! Error types for frbvault.
//!
//! This module defines all error types used throughout the frbvault crate,
//! grouped the same way they are reported to the user: connectivity problems,
//! validation failures, stored-data problems and transaction failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::Status;

/// Message fragment a wallet uses when the user declines to sign.
pub const USER_REJECTED_MARKER: &str = "user rejected transaction";

/// The main error type for frbvault operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Connectivity Errors ===
    /// No wallet is connected, so nothing can be signed.
    #[error("please connect wallet first")]
    WalletNotConnected,

    /// The wallet is connected but exposes no account.
    #[error("wallet returned no accounts")]
    NoAccounts,

    /// The key-value contract reported itself unavailable.
    #[error("contract is not available")]
    ContractUnavailable,

    // === Validation Errors ===
    /// A draft field failed validation before any write.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the validation failure.
        message: String,
    },

    /// A status change that the workflow does not allow.
    #[error("cannot move record from {from} to {to}")]
    InvalidTransition {
        /// Status currently stored.
        from: Status,
        /// Status that was requested.
        to: Status,
    },

    // === Stored Data Errors ===
    /// No record blob is stored under the given id.
    #[error("data not found: {id}")]
    NotFound {
        /// The record id that was looked up.
        id: String,
    },

    /// A stored payload could not be decoded.
    #[error("invalid payload: {message}")]
    Payload {
        /// Description of the decoding failure.
        message: String,
    },

    // === Transaction Errors ===
    /// The user declined to sign the transaction.
    #[error("user rejected transaction")]
    UserRejected,

    /// The contract rejected the write.
    #[error("transaction reverted for key '{key}': {reason}")]
    Reverted {
        /// Key the write targeted.
        key: String,
        /// Reason given by the contract.
        reason: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the contract database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for frbvault operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a validation error for a draft field.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a not-found error for a record id.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a payload decoding error.
    #[must_use]
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload {
            message: message.into(),
        }
    }

    /// Create a reverted-transaction error.
    #[must_use]
    pub fn reverted(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Reverted {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if the user declined to sign.
    ///
    /// Wallets do not always use a dedicated error, so the message is
    /// inspected as well.
    #[must_use]
    pub fn is_user_rejected(&self) -> bool {
        matches!(self, Self::UserRejected) || self.to_string().contains(USER_REJECTED_MARKER)
    }

    /// Check if this error means the wallet or contract can't be reached.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::WalletNotConnected | Self::NoAccounts | Self::ContractUnavailable
        )
    }

    /// Check if this error was raised before any write was attempted.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::WalletNotConnected;
        assert_eq!(err.to_string(), "please connect wallet first");

        let err = Error::not_found("123-abc");
        assert_eq!(err.to_string(), "data not found: 123-abc");
    }

    #[test]
    fn test_user_rejected_display_matches_marker() {
        assert_eq!(Error::UserRejected.to_string(), USER_REJECTED_MARKER);
    }

    #[test]
    fn test_is_user_rejected() {
        assert!(Error::UserRejected.is_user_rejected());
        assert!(
            Error::internal("provider: user rejected transaction (code 4001)").is_user_rejected()
        );
        assert!(!Error::reverted("frb_keys", "out of gas").is_user_rejected());
    }

    #[test]
    fn test_is_connectivity() {
        assert!(Error::WalletNotConnected.is_connectivity());
        assert!(Error::NoAccounts.is_connectivity());
        assert!(Error::ContractUnavailable.is_connectivity());
        assert!(!Error::UserRejected.is_connectivity());
    }

    #[test]
    fn test_validation_error_display() {
        let err = Error::validation("frequency", "must not be empty");
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "invalid frequency: must not be empty");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = Error::InvalidTransition {
            from: Status::Raw,
            to: Status::Analyzed,
        };
        assert_eq!(err.to_string(), "cannot move record from raw to analyzed");
    }

    #[test]
    fn test_reverted_display() {
        let err = Error::reverted("frb_keys", "write refused");
        let msg = err.to_string();
        assert!(msg.contains("frb_keys"));
        assert!(msg.contains("write refused"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "empty observatory list".to_string(),
        };
        assert!(err.to_string().contains("empty observatory list"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
