//! # coffer-db: Ledger Store for Coffer
//!
//! Everything that touches the database: the pool, migrations, units of
//! work, repositories, and the three services built on them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Coffer Data Flow                                 │
//! │                                                                         │
//! │  CLI command (transfer)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    coffer-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐  ┌──────────────┐  ┌──────────────┐         │   │
//! │  │   │ LedgerEngine │  │ QueryService │  │ AuthService  │         │   │
//! │  │   │  (engine/)   │  │  (query.rs)  │  │  (auth.rs)   │         │   │
//! │  │   └──────┬───────┘  └──────┬───────┘  └──────┬───────┘         │   │
//! │  │          │ with_transaction│ pool            │ both            │   │
//! │  │          ▼                 ▼                 ▼                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ user account  │    │  (embedded)  │  │   │
//! │  │   │  UnitOfWork   │◄───│ transaction   │    │ 001_initial  │  │   │
//! │  │   │               │    │ locked_fund   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                SQLite Database (WAL, coffer.db)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and the unit-of-work entry point
//! - [`unit_of_work`] - `BEGIN IMMEDIATE` transactions
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Row-level access per table
//! - [`engine`] - Deposit, withdraw, transfer, lock, unlock, block
//! - [`query`] - Read-only projections
//! - [`auth`] - Registration, login, bootstrap administrator
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Storage and ledger error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coffer_db::{Database, DbConfig, LedgerEngine, QueryService};
//!
//! let db = Database::new(DbConfig::new("coffer.db")).await?;
//! let engine = LedgerEngine::with_defaults(db.clone());
//!
//! let receipt = engine.deposit(account_id, amount, Some("Salary")).await?;
//! println!("{}", receipt.message());
//!
//! let balance = QueryService::new(db).get_balance(account_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
mod hashing;
pub mod migrations;
pub mod pool;
pub mod query;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use auth::AuthService;
pub use config::{ConfigError, LedgerConfig};
pub use engine::LedgerEngine;
pub use error::{DbError, DbResult, IntoOutcome, LedgerError, LedgerResult};
pub use pool::{Database, DbConfig};
pub use query::QueryService;
pub use unit_of_work::{BoxFuture, UnitOfWork};

// Repository re-exports for convenience
pub use repository::{
    AccountRepository, LockedFundRepository, TransactionRepository, UserRepository,
};
