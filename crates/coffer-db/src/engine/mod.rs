//! # Ledger Engine
//!
//! Every balance-changing operation. Each one is a single unit of work:
//! balance check, balance write, ledger append and (for locks) lock-state
//! write commit together or not at all.
//!
//! ## Operation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         LedgerEngine::withdraw                          │
//! │                                                                         │
//! │  1. OperationLimits::check      InvalidAmount / LimitExceeded          │
//! │     (no store access yet)                                               │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  2. Database::with_transaction  BEGIN IMMEDIATE                        │
//! │     ├── load acting account     AccountNotFound / AccountBlocked       │
//! │     ├── balance >= amount ?     InsufficientFunds → ROLLBACK           │
//! │     ├── set_balance                                                     │
//! │     └── append ledger entry                                             │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  3. COMMIT → Receipt                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`funds`] - deposit, withdraw, transfer
//! - [`locks`] - lock and unlock PIN-protected funds
//! - [`admin`] - block / unblock accounts

pub mod admin;
pub mod funds;
pub mod locks;

use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::pool::Database;
use crate::repository::AccountRepository;
use coffer_core::{Account, CoreError, ErrorKind, OperationLimits, PinHasher, Receipt};

/// The transaction engine.
///
/// Holds no mutable state; clones share the database pool.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    db: Database,
    limits: OperationLimits,
    hasher: PinHasher,
}

impl LedgerEngine {
    pub fn new(db: Database, limits: OperationLimits, hasher: PinHasher) -> Self {
        LedgerEngine { db, limits, hasher }
    }

    /// Engine with default ceilings and hashing cost.
    pub fn with_defaults(db: Database) -> Self {
        LedgerEngine::new(db, OperationLimits::default(), PinHasher::default())
    }

    pub fn limits(&self) -> &OperationLimits {
        &self.limits
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

// =============================================================================
// Shared Steps
// =============================================================================

/// Loads the account an operation acts on.
///
/// Missing → `AccountNotFound`, blocked → `AccountBlocked`.
pub(crate) async fn load_acting_account(
    conn: &mut SqliteConnection,
    account_id: i64,
) -> LedgerResult<Account> {
    let account = AccountRepository::new(conn)
        .get(account_id)
        .await?
        .ok_or(CoreError::AccountNotFound(account_id))?;

    if account.is_blocked {
        return Err(CoreError::AccountBlocked(account_id).into());
    }

    Ok(account)
}

/// Logs how an operation ended.
pub(crate) fn trace_outcome(operation: &str, account_id: i64, result: &LedgerResult<Receipt>) {
    match result {
        Ok(receipt) => info!(
            operation,
            account_id,
            transaction_id = receipt.transaction_id,
            amount = %receipt.amount,
            balance_after = %receipt.balance_after,
            "Ledger operation committed"
        ),
        Err(LedgerError::Domain(err))
            if matches!(err.kind(), ErrorKind::IncorrectPin | ErrorKind::AccountBlocked) =>
        {
            warn!(operation, account_id, error = %err, "Ledger operation refused")
        }
        Err(err) => debug!(operation, account_id, error = %err, "Ledger operation rejected"),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use super::*;
    use crate::pool::DbConfig;
    use crate::repository::UserRepository;
    use coffer_core::{Money, PinPolicy, Role};

    /// Engine on a fresh in-memory database with cheap hashing.
    pub async fn engine() -> LedgerEngine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        LedgerEngine::new(
            db,
            OperationLimits::default(),
            PinHasher::new(PinPolicy::for_tests()),
        )
    }

    /// Opens an account for a new user and funds it directly.
    pub async fn open_account(engine: &LedgerEngine, username: &str, balance: Money) -> Account {
        let mut conn = engine.database().pool().acquire().await.unwrap();
        let user = UserRepository::new(&mut conn)
            .insert(username, "phc", Role::User, None, None, Utc::now())
            .await
            .unwrap();
        let number = coffer_core::validation::account_number_for(user.id);
        let mut accounts = AccountRepository::new(&mut conn);
        let account = accounts.insert(user.id, &number, "savings").await.unwrap();
        accounts.set_balance(account.id, balance).await.unwrap();
        Account { balance, ..account }
    }

    pub async fn balance_of(engine: &LedgerEngine, account_id: i64) -> Money {
        let mut conn = engine.database().pool().acquire().await.unwrap();
        AccountRepository::new(&mut conn)
            .get(account_id)
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    pub async fn entry_count(engine: &LedgerEngine, account_id: i64) -> i64 {
        let mut conn = engine.database().pool().acquire().await.unwrap();
        crate::repository::TransactionRepository::new(&mut conn)
            .count_for_account(account_id)
            .await
            .unwrap()
    }
}
