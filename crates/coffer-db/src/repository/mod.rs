//! # Repository Module
//!
//! SQL for each ledger table, one repository per table.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Repositories borrow a connection instead of owning a pool, so the     │
//! │  same code runs inside a unit of work or against a plain pooled        │
//! │  connection.                                                            │
//! │                                                                         │
//! │  LedgerEngine                         QueryService                     │
//! │       │ with_transaction(|conn| ..)        │ pool.acquire()            │
//! │       ▼                                    ▼                            │
//! │  AccountRepository::new(conn)         AccountRepository::new(&mut c)   │
//! │  ├── get_for_update / set_balance     ├── get                          │
//! │  TransactionRepository::new(conn)     TransactionRepository::new(..)   │
//! │  ├── append                           ├── list_for_account             │
//! │       │                                    │                            │
//! │       ▼                                    ▼                            │
//! │  SQLite (parameter-bound statements only)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`] - Users and credentials
//! - [`AccountRepository`] - Accounts and balances
//! - [`TransactionRepository`] - Append-only ledger entries
//! - [`LockedFundRepository`] - PIN-protected holds
//!
//! Amount columns are decimal TEXT; rows are decoded into `Money` here and
//! a malformed value surfaces as [`DbError::CorruptValue`].

pub mod account;
pub mod locked_fund;
pub mod transaction;
pub mod user;

pub use account::AccountRepository;
pub use locked_fund::LockedFundRepository;
pub use transaction::TransactionRepository;
pub use user::UserRepository;

use coffer_core::Money;

use crate::error::{DbError, DbResult};

/// Decodes a stored amount column.
pub(crate) fn decode_money(column: &str, text: &str) -> DbResult<Money> {
    text.parse::<Money>()
        .map_err(|_| DbError::corrupt(column, text))
}

/// SQLite `LIMIT` value: `-1` means no limit.
pub(crate) fn sql_limit(limit: Option<u32>) -> i64 {
    limit.map(i64::from).unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_money() {
        assert_eq!(decode_money("balance", "1500.00").unwrap().cents(), 150_000);
        assert!(matches!(
            decode_money("balance", "NaN"),
            Err(DbError::CorruptValue { .. })
        ));
    }

    #[test]
    fn test_sql_limit() {
        assert_eq!(sql_limit(None), -1);
        assert_eq!(sql_limit(Some(0)), 0);
        assert_eq!(sql_limit(Some(25)), 25);
    }
}
