//! # Ledger Configuration
//!
//! Configuration for the store, the engine ceilings and credential hashing.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     COFFER_DB_PATH=/var/lib/coffer/ledger.db                           │
//! │     COFFER_MAX_CONNECTIONS=8                                           │
//! │     COFFER_BOOTSTRAP_ADMIN_PASSWORD=...                                │
//! │     COFFER_LOG=coffer_db=debug                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     coffer.toml (or the path given on the command line)                │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "coffer.db"
//! max_connections = 5
//! min_connections = 1
//! busy_timeout_secs = 5
//!
//! [limits]          # major currency units
//! deposit = 1000000
//! withdraw = 500000
//! lock = 1000000
//! transfer = 500000
//!
//! [security]
//! argon2_memory_kib = 19456
//! argon2_iterations = 2
//! argon2_parallelism = 1
//! min_pin_length = 4
//!
//! [bootstrap]
//! admin_username = "admin"
//! admin_password = "change-me"
//! admin_full_name = "System Administrator"
//!
//! [logging]
//! filter = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use coffer_core::{Money, OperationLimits, PinPolicy, MIN_PIN_LEN};

use crate::pool::DbConfig;

/// Default bootstrap password; startup warns while it is in use.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long a writer waits for the database lock before failing.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("coffer.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

/// `[limits]` section, in whole major units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_deposit_limit")]
    pub deposit: i64,

    #[serde(default = "default_withdraw_limit")]
    pub withdraw: i64,

    #[serde(default = "default_lock_limit")]
    pub lock: i64,

    #[serde(default = "default_transfer_limit")]
    pub transfer: i64,
}

fn default_deposit_limit() -> i64 {
    1_000_000
}

fn default_withdraw_limit() -> i64 {
    500_000
}

fn default_lock_limit() -> i64 {
    1_000_000
}

fn default_transfer_limit() -> i64 {
    500_000
}

impl Default for LimitsSection {
    fn default() -> Self {
        LimitsSection {
            deposit: default_deposit_limit(),
            withdraw: default_withdraw_limit(),
            lock: default_lock_limit(),
            transfer: default_transfer_limit(),
        }
    }
}

/// `[security]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySection {
    #[serde(default = "default_memory_kib")]
    pub argon2_memory_kib: u32,

    #[serde(default = "default_iterations")]
    pub argon2_iterations: u32,

    #[serde(default = "default_parallelism")]
    pub argon2_parallelism: u32,

    #[serde(default = "default_min_pin_length")]
    pub min_pin_length: usize,
}

fn default_memory_kib() -> u32 {
    PinPolicy::default().memory_kib
}

fn default_iterations() -> u32 {
    PinPolicy::default().iterations
}

fn default_parallelism() -> u32 {
    PinPolicy::default().parallelism
}

fn default_min_pin_length() -> usize {
    MIN_PIN_LEN
}

impl Default for SecuritySection {
    fn default() -> Self {
        SecuritySection {
            argon2_memory_kib: default_memory_kib(),
            argon2_iterations: default_iterations(),
            argon2_parallelism: default_parallelism(),
            min_pin_length: default_min_pin_length(),
        }
    }
}

/// `[bootstrap]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSection {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    #[serde(default = "default_admin_password")]
    pub admin_password: String,

    #[serde(default = "default_admin_full_name")]
    pub admin_full_name: String,
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    DEFAULT_ADMIN_PASSWORD.to_string()
}

fn default_admin_full_name() -> String {
    "System Administrator".to_string()
}

impl Default for BootstrapSection {
    fn default() -> Self {
        BootstrapSection {
            admin_username: default_admin_username(),
            admin_password: default_admin_password(),
            admin_full_name: default_admin_full_name(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `tracing_subscriber::EnvFilter` directive string.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// LedgerConfig
// =============================================================================

/// Complete configuration for a Coffer deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub limits: LimitsSection,

    #[serde(default)]
    pub security: SecuritySection,

    #[serde(default)]
    pub bootstrap: BootstrapSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

impl LedgerConfig {
    /// Loads configuration from file (if present) and environment.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) if path.exists() => {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(path)?;
                Self::from_toml(&contents)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        if config.bootstrap.admin_password == DEFAULT_ADMIN_PASSWORD {
            warn!("Bootstrap administrator uses the default password");
        }

        Ok(config)
    }

    /// Parses TOML text without consulting the environment.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let db = &self.database;
        if db.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than 0".into(),
            ));
        }
        if db.min_connections > db.max_connections {
            return Err(ConfigError::Invalid(format!(
                "min_connections ({}) exceeds max_connections ({})",
                db.min_connections, db.max_connections
            )));
        }

        let limits = &self.limits;
        for (name, value) in [
            ("deposit", limits.deposit),
            ("withdraw", limits.withdraw),
            ("lock", limits.lock),
            ("transfer", limits.transfer),
        ] {
            if value <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "limits.{} must be greater than 0",
                    name
                )));
            }
            if Money::checked_from_major(value).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "limits.{} must be at most {}",
                    name,
                    i64::MAX / 100
                )));
            }
        }

        self.pin_policy()
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[security] argon2 parameters: {}", e)))?;

        if self.security.min_pin_length < MIN_PIN_LEN {
            return Err(ConfigError::Invalid(format!(
                "min_pin_length must be at least {}",
                MIN_PIN_LEN
            )));
        }

        if self.bootstrap.admin_username.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "bootstrap.admin_username must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Applies `COFFER_*` overrides from a variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("COFFER_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("COFFER_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid COFFER_MAX_CONNECTIONS"),
            }
        }

        if let Some(password) = lookup("COFFER_BOOTSTRAP_ADMIN_PASSWORD") {
            debug!("Overriding bootstrap admin password from environment");
            self.bootstrap.admin_password = password;
        }

        if let Some(filter) = lookup("COFFER_LOG") {
            self.logging.filter = filter;
        }
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Ceilings handed to the engine.
    pub fn operation_limits(&self) -> OperationLimits {
        OperationLimits {
            max_deposit: ceiling(self.limits.deposit),
            max_withdraw: ceiling(self.limits.withdraw),
            max_lock: ceiling(self.limits.lock),
            max_transfer: ceiling(self.limits.transfer),
        }
    }

    /// Hashing policy handed to the engine and auth service.
    pub fn pin_policy(&self) -> PinPolicy {
        PinPolicy {
            memory_kib: self.security.argon2_memory_kib,
            iterations: self.security.argon2_iterations,
            parallelism: self.security.argon2_parallelism,
            min_len: self.security.min_pin_length,
        }
    }

    /// Pool configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
    }
}

/// Major-unit limit as Money, saturating when `validate` was skipped.
fn ceiling(major: i64) -> Money {
    Money::checked_from_major(major).unwrap_or(Money::from_cents(i64::MAX))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_core::PinHasher;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.operation_limits(), OperationLimits::default());
        assert_eq!(config.pin_policy(), PinPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = LedgerConfig::from_toml(
            r#"
            [database]
            path = "/tmp/ledger.db"

            [limits]
            withdraw = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(
            config.operation_limits().max_withdraw,
            Money::from_major(250)
        );
        assert_eq!(
            config.operation_limits().max_deposit,
            Money::from_major(1_000_000)
        );
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("COFFER_DB_PATH", "/data/coffer.db"),
            ("COFFER_MAX_CONNECTIONS", "9"),
            ("COFFER_BOOTSTRAP_ADMIN_PASSWORD", "s3cret!"),
            ("COFFER_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::from_toml("[database]\npath = \"file.db\"").unwrap();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/data/coffer.db"));
        assert_eq!(config.database.max_connections, 9);
        assert_eq!(config.bootstrap.admin_password, "s3cret!");
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn test_invalid_override_ignored() {
        let mut config = LedgerConfig::default();
        config.apply_overrides(|key| (key == "COFFER_MAX_CONNECTIONS").then(|| "many".to_string()));
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_validation() {
        let mut config = LedgerConfig::default();
        config.security.min_pin_length = 2;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.limits.transfer = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.database.min_connections = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_limit_overflowing_cents_rejected() {
        let config = LedgerConfig::from_toml("[limits]\ndeposit = 100000000000000000").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("limits.deposit")));
        assert_eq!(config.operation_limits().max_deposit, Money::from_cents(i64::MAX));

        let largest = format!("[limits]\ntransfer = {}", i64::MAX / 100);
        let config = LedgerConfig::from_toml(&largest).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.operation_limits().max_transfer.major(), i64::MAX / 100);
    }

    #[test]
    fn test_argon2_parameters_rejected_at_load() {
        let config = LedgerConfig::from_toml("[security]\nargon2_memory_kib = 1").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("argon2")));

        let config = LedgerConfig::from_toml("[security]\nargon2_parallelism = 0").unwrap();
        assert!(config.validate().is_err());

        let config = LedgerConfig::from_toml(
            "[security]\nargon2_memory_kib = 64\nargon2_iterations = 1\nargon2_parallelism = 1",
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert!(PinHasher::new(config.pin_policy()).hash("1234").is_ok());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            LedgerConfig::from_toml("[limits]\nwithdraw = \"lots\""),
            Err(ConfigError::LoadFailed(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = LedgerConfig::from_toml("").unwrap();
        assert_eq!(config.bootstrap.admin_username, "admin");
        assert_eq!(config.logging.filter, "info");
    }
}
