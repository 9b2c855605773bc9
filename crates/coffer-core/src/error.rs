//! # Error Types
//!
//! Domain-specific error types for coffer-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  coffer-core errors (this file)                                        │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Flat code the presentation layer switches on   │
//! │                                                                         │
//! │  coffer-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - CoreError | StorageFailure(DbError)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → Outcome             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::limits::Operation;
use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
///
/// Every variant is detected either before the store is touched (amount,
/// ceiling, PIN strength) or inside a unit of work that is then rolled back.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Amount is missing, non-numeric, zero or negative.
    #[error("Please enter a positive amount")]
    InvalidAmount,

    /// Amount is above the ceiling for the operation.
    #[error("{operation} exceeds maximum limit of {limit}")]
    LimitExceeded { operation: Operation, limit: Money },

    /// The acting account does not exist.
    #[error("Account ID {0} not found")]
    AccountNotFound(i64),

    /// The transfer receiver could not be resolved by account number.
    #[error("Receiver account number {0} not found")]
    CounterpartyNotFound(String),

    /// Sender and receiver resolve to the same account.
    #[error("Cannot transfer to the same account")]
    SelfTransferNotAllowed,

    /// Balance is lower than the requested debit.
    ///
    /// ## User Workflow
    /// ```text
    /// Withdraw 2000.00 from balance 1500.00
    ///      │
    ///      ▼
    /// InsufficientFunds { account_id: 7 }
    ///      │
    ///      ▼
    /// UI shows: "Insufficient funds in account ID 7"
    /// ```
    #[error("Insufficient funds in account ID {account_id}")]
    InsufficientFunds { account_id: i64 },

    /// PIN does not meet the minimum strength.
    #[error("PIN must be at least {min_len} characters")]
    WeakCredential { min_len: usize },

    /// No active lock matches the id and account.
    #[error("Locked funds not found or already unlocked")]
    LockNotFound { lock_id: i64 },

    /// PIN did not verify against the stored hash.
    #[error("Incorrect PIN")]
    IncorrectPin,

    /// Requested unlock is larger than what remains locked.
    #[error("Amount exceeds locked funds ({remaining})")]
    AmountExceedsLock { remaining: Money },

    /// The acting account is blocked by an administrator.
    #[error("Account ID {0} is blocked")]
    AccountBlocked(i64),

    /// Unique identity (username) is already taken.
    #[error("{field} '{value}' already exists")]
    DuplicateIdentity { field: String, value: String },

    /// Credential could not be hashed (bad parameters, RNG failure).
    #[error("Credential hashing failed: {0}")]
    Hashing(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the flat error code for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidAmount => ErrorKind::InvalidAmount,
            CoreError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            CoreError::AccountNotFound(_) => ErrorKind::AccountNotFound,
            CoreError::CounterpartyNotFound(_) => ErrorKind::CounterpartyNotFound,
            CoreError::SelfTransferNotAllowed => ErrorKind::SelfTransferNotAllowed,
            CoreError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            CoreError::WeakCredential { .. } => ErrorKind::WeakCredential,
            CoreError::LockNotFound { .. } => ErrorKind::LockNotFound,
            CoreError::IncorrectPin => ErrorKind::IncorrectPin,
            CoreError::AmountExceedsLock { .. } => ErrorKind::AmountExceedsLock,
            CoreError::AccountBlocked(_) => ErrorKind::AccountBlocked,
            CoreError::DuplicateIdentity { .. } => ErrorKind::DuplicateIdentity,
            CoreError::Hashing(_) => ErrorKind::Internal,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any unit of work is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed account number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Error Kind
// =============================================================================

/// Machine-readable error code.
///
/// ## Usage in a Presentation Layer
/// ```typescript
/// switch (outcome.kind) {
///   case 'INSUFFICIENT_FUNDS': highlightBalance(); break;
///   case 'INCORRECT_PIN':      clearPinField();    break;
///   default:                   showError(outcome.message);
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorKind {
    InvalidAmount,
    LimitExceeded,
    AccountNotFound,
    CounterpartyNotFound,
    SelfTransferNotAllowed,
    InsufficientFunds,
    WeakCredential,
    LockNotFound,
    IncorrectPin,
    AmountExceedsLock,
    AccountBlocked,
    DuplicateIdentity,
    Validation,
    StorageFailure,
    Internal,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::LimitExceeded {
            operation: Operation::Withdraw,
            limit: Money::from_major(500_000),
        };
        assert_eq!(
            err.to_string(),
            "Withdrawal exceeds maximum limit of 500000.00"
        );

        let err = CoreError::AmountExceedsLock {
            remaining: Money::from_cents(60_000),
        };
        assert_eq!(err.to_string(), "Amount exceeds locked funds (600.00)");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "username".to_string(),
        };
        assert_eq!(err.to_string(), "username is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::InsufficientFunds).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_FUNDS\"");
    }

    #[test]
    fn test_incorrect_pin_message_leaks_nothing() {
        let msg = CoreError::IncorrectPin.to_string();
        assert_eq!(msg, "Incorrect PIN");
    }
}
