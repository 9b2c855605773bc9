//! # coffer-core: Pure Ledger Rules for Coffer
//!
//! This crate holds every ledger rule that can be expressed without I/O:
//! money, amount parsing, per-operation ceilings, description hygiene,
//! PIN hashing and the domain types the storage layer persists.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Coffer Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Presentation (CLI / UI shell)                   │   │
//! │  │     renders (success, message) pairs and structured results     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          coffer-db: LedgerEngine / QueryService / AuthService   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ coffer-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  limits   │  │ validation│  │   │
//! │  │   │  Account  │  │   Money   │  │ Operation │  │  amounts  │  │   │
//! │  │   │ LockedFund│  │  parsing  │  │  Limits   │  │  text     │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                  ┌───────────┐  ┌───────────┐                  │   │
//! │  │                  │    pin    │  │   error   │                  │   │
//! │  │                  │ PinHasher │  │ CoreError │                  │   │
//! │  │                  └───────────┘  └───────────┘                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (User, Account, Transaction, LockedFund, ...)
//! - [`money`] - Money type with integer minor-unit arithmetic
//! - [`limits`] - Per-operation ceilings
//! - [`validation`] - Amount parsing and text hygiene
//! - [`pin`] - Salted one-way hashing for lock PINs and passwords
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use coffer_core::validation::parse_amount;
//! use coffer_core::limits::{OperationLimits, Operation};
//!
//! let amount = parse_amount("500.00").unwrap();
//! assert_eq!(amount.cents(), 50_000);
//!
//! let limits = OperationLimits::default();
//! assert!(limits.check(Operation::Deposit, amount).is_ok());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod limits;
pub mod money;
pub mod pin;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use limits::{Operation, OperationLimits};
pub use money::Money;
pub use pin::{PinHasher, PinPolicy};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum stored length of a transaction or lock description.
pub const MAX_DESCRIPTION_LEN: usize = 100;

/// Minimum length of a lock PIN.
///
/// Every entry point enforces the same rule.
pub const MIN_PIN_LEN: usize = 4;

/// Prefix of generated account numbers (`AC00000042`).
pub const ACCOUNT_NUMBER_PREFIX: &str = "AC";

/// Default account type tag for accounts opened at registration.
pub const DEFAULT_ACCOUNT_TYPE: &str = "savings";
