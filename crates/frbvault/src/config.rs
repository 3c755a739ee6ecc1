//! Configuration management for frbvault.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::DEFAULT_OBSERVATORIES;
use crate::state::BannerTimings;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "frbvault";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "contract.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FRBVAULT_`, sections split on `__`)
/// 2. TOML config file at `~/.config/frbvault/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Contract backend configuration.
    pub contract: ContractConfig,
    /// Wallet configuration.
    pub wallet: WalletConfig,
    /// Workflow configuration.
    pub workflow: WorkflowConfig,
    /// Banner configuration.
    pub banner: BannerConfig,
}

/// Which contract backend to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Local `SQLite` database.
    #[default]
    Sqlite,
    /// Process-local map; nothing survives exit.
    Memory,
}

/// Contract-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Backend to use.
    pub backend: Backend,
    /// Path to the `SQLite` database.
    /// Defaults to `~/.local/share/frbvault/contract.db`
    pub database_path: Option<PathBuf>,
    /// Prefix for every key written to the contract.
    pub key_prefix: String,
}

/// Wallet-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Accounts held by the local wallet. The first is active.
    pub accounts: Vec<String>,
}

/// Workflow-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Observatories a record may be submitted for.
    pub observatories: Vec<String>,
    /// Delay before a process/analyze write, in milliseconds.
    pub compute_delay_ms: u64,
    /// Reject skipped or backward status changes before writing.
    pub enforce_transitions: bool,
}

/// Banner-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerConfig {
    /// How long a success banner stays visible, in milliseconds.
    pub success_dismiss_ms: u64,
    /// How long an error banner stays visible, in milliseconds.
    pub error_dismiss_ms: u64,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            database_path: None, // Resolved at runtime
            key_prefix: "frb".to_string(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            observatories: DEFAULT_OBSERVATORIES.iter().map(ToString::to_string).collect(),
            compute_delay_ms: 3000,
            enforce_transitions: true,
        }
    }
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            success_dismiss_ms: 2000,
            error_dismiss_ms: 3000,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FRBVAULT_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let prefix =
            regex::Regex::new(r"^[A-Za-z0-9]+$").map_err(|e| Error::internal(e.to_string()))?;
        if !prefix.is_match(&self.contract.key_prefix) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "key_prefix must be non-empty and alphanumeric, got '{}'",
                    self.contract.key_prefix
                ),
            });
        }

        if self.workflow.observatories.is_empty() {
            return Err(Error::ConfigValidation {
                message: "observatories must not be empty".to_string(),
            });
        }

        if self.workflow.observatories.iter().any(|o| o.trim().is_empty()) {
            return Err(Error::ConfigValidation {
                message: "observatory names must not be blank".to_string(),
            });
        }

        if self.banner.success_dismiss_ms == 0 || self.banner.error_dismiss_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "banner dismiss times must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.contract
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the pacing delay before process/analyze writes.
    #[must_use]
    pub fn compute_delay(&self) -> Duration {
        Duration::from_millis(self.workflow.compute_delay_ms)
    }

    /// Get banner lifetimes.
    #[must_use]
    pub fn banner_timings(&self) -> BannerTimings {
        BannerTimings {
            success: Duration::from_millis(self.banner.success_dismiss_ms),
            error: Duration::from_millis(self.banner.error_dismiss_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.contract.backend, Backend::Sqlite);
        assert_eq!(config.contract.key_prefix, "frb");
        assert!(config.wallet.accounts.is_empty());
        assert!(config.workflow.enforce_transitions);
    }

    #[test]
    fn test_default_workflow_config() {
        let workflow = WorkflowConfig::default();

        assert_eq!(workflow.compute_delay_ms, 3000);
        assert_eq!(workflow.observatories.len(), 6);
        assert!(workflow.observatories.contains(&"CHIME".to_string()));
        assert!(workflow.observatories.contains(&"VLA".to_string()));
    }

    #[test]
    fn test_default_banner_config() {
        let banner = BannerConfig::default();
        assert_eq!(banner.success_dismiss_ms, 2000);
        assert_eq!(banner.error_dismiss_ms, 3000);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_key_prefix() {
        let mut config = Config::default();
        config.contract.key_prefix = "frb_".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("key_prefix"));

        config.contract.key_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_observatories() {
        let mut config = Config::default();
        config.workflow.observatories.clear();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("observatories"));
    }

    #[test]
    fn test_validate_blank_observatory() {
        let mut config = Config::default();
        config.workflow.observatories.push("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_banner_time() {
        let mut config = Config::default();
        config.banner.error_dismiss_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config.database_path().to_string_lossy().contains("contract.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.contract.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(config.database_path(), PathBuf::from("/custom/path/db.sqlite"));
    }

    #[test]
    fn test_compute_delay() {
        assert_eq!(Config::default().compute_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_banner_timings() {
        assert_eq!(Config::default().banner_timings(), BannerTimings::default());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("frbvault"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_default_data_dir() {
        assert!(Config::default_data_dir().to_string_lossy().contains("frbvault"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path =
            std::env::temp_dir().join(format!("frbvault_config_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
            [contract]
            backend = "memory"

            [wallet]
            accounts = ["CHIME"]

            [workflow]
            compute_delay_ms = 0
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.contract.backend, Backend::Memory);
        assert_eq!(config.wallet.accounts, vec!["CHIME"]);
        assert_eq!(config.workflow.compute_delay_ms, 0);
        assert_eq!(config.workflow.observatories.len(), 6);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_backend_deserialize() {
        let contract: ContractConfig = serde_json::from_str(r#"{"backend": "memory"}"#).unwrap();
        assert_eq!(contract.backend, Backend::Memory);
        assert_eq!(contract.key_prefix, "frb");
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        assert_eq!(config.clone(), config);
    }
}
