//! # CLI Errors
//!
//! Failures that stop a command before it produces an outcome.
//!
//! Ledger rule violations from mutating commands are not errors here:
//! they are rendered as a failed `Outcome` line. `CliError` covers bad
//! arguments, configuration, permissions and failed reads.
//!
//! ## Exit Codes
//! ```text
//! 0  success
//! 1  ledger operation refused, or a read failed
//! 2  usage error
//! 3  permission denied / login failed
//! 4  configuration or startup failure
//! ```

use std::process::ExitCode;

use thiserror::Error;

use coffer_core::{CoreError, ErrorKind, ValidationError};
use coffer_db::{ConfigError, DbError, IntoOutcome, LedgerError};

#[derive(Debug, Error)]
pub enum CliError {
    /// Bad or missing arguments, rendered by clap.
    #[error("{0}")]
    Usage(#[from] clap::Error),

    /// Caller is not allowed to run the command.
    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to start: {0}")]
    Startup(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Ledger(_) => ExitCode::from(1),
            CliError::Usage(_) => ExitCode::from(2),
            CliError::Forbidden(_) => ExitCode::from(3),
            CliError::Config(_) | CliError::Startup(_) => ExitCode::from(4),
        }
    }

    /// Text shown to the user.
    ///
    /// Storage failures collapse to the generic outcome message; the
    /// cause is logged where it happened.
    pub fn user_message(self) -> String {
        match self {
            CliError::Ledger(err) => err.into_outcome().message,
            other => other.to_string(),
        }
    }

    /// Flat code for JSON output.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CliError::Ledger(err) => Some(err.kind()),
            _ => None,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::Ledger(LedgerError::from(err))
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::Ledger(LedgerError::from(err))
    }
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        CliError::Startup(err.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;
