//! # Locked Fund Repository
//!
//! PIN-protected holds.
//!
//! ## Lock Lifecycle
//! ```text
//! insert            amount = 1000.00   is_unlocked = 0
//!   │
//!   ▼ set_remaining(600.00, false)      partial unlock of 400.00
//! active            amount =  600.00   is_unlocked = 0
//!   │
//!   ▼ set_remaining(0.00, true)         final unlock
//! terminal          amount =    0.00   is_unlocked = 1   (never listed, never matched)
//! ```
//!
//! The PIN hash is only returned by [`LockedFundRepository::find_active`].

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::decode_money;
use coffer_core::{LockedFund, Money};

#[derive(Debug, sqlx::FromRow)]
struct LockedFundRow {
    id: i64,
    account_id: i64,
    amount: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    is_unlocked: bool,
}

impl TryFrom<LockedFundRow> for LockedFund {
    type Error = DbError;

    fn try_from(row: LockedFundRow) -> DbResult<Self> {
        Ok(LockedFund {
            amount: decode_money("locked_funds.amount", &row.amount)?,
            id: row.id,
            account_id: row.account_id,
            description: row.description,
            created_at: row.created_at,
            is_unlocked: row.is_unlocked,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LockedFundWithPinRow {
    #[sqlx(flatten)]
    lock: LockedFundRow,
    pin_hash: String,
}

const LOCK_COLUMNS: &str = "id, account_id, amount, description, created_at, is_unlocked";

/// Repository for locked funds.
pub struct LockedFundRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> LockedFundRepository<'c> {
    /// Creates a new LockedFundRepository on a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        LockedFundRepository { conn }
    }

    /// Inserts an active lock.
    pub async fn insert(
        &mut self,
        account_id: i64,
        amount: Money,
        pin_hash: &str,
        description: Option<&str>,
    ) -> DbResult<LockedFund> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO locked_funds
                 (account_id, amount, pin_hash, description, created_at, is_unlocked)
             VALUES (?, ?, ?, ?, ?, 0)",
        )
        .bind(account_id)
        .bind(amount.to_string())
        .bind(pin_hash)
        .bind(description)
        .bind(created_at)
        .execute(&mut *self.conn)
        .await?;

        let id = result.last_insert_rowid();
        debug!(lock_id = id, account_id, amount = %amount, "Lock inserted");

        Ok(LockedFund {
            id,
            account_id,
            amount,
            description: description.map(str::to_string),
            created_at,
            is_unlocked: false,
        })
    }

    /// Gets a lock by ID, active or not.
    pub async fn get(&mut self, id: i64) -> DbResult<Option<LockedFund>> {
        let row: Option<LockedFundRow> = sqlx::query_as(&format!(
            "SELECT {} FROM locked_funds WHERE id = ?",
            LOCK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(LockedFund::try_from).transpose()
    }

    /// Finds an active lock owned by `account_id`, with its PIN hash.
    pub async fn find_active(
        &mut self,
        lock_id: i64,
        account_id: i64,
    ) -> DbResult<Option<(LockedFund, String)>> {
        let row: Option<LockedFundWithPinRow> = sqlx::query_as(&format!(
            "SELECT {}, pin_hash FROM locked_funds
             WHERE id = ? AND account_id = ? AND is_unlocked = 0",
            LOCK_COLUMNS
        ))
        .bind(lock_id)
        .bind(account_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        match row {
            Some(r) => Ok(Some((LockedFund::try_from(r.lock)?, r.pin_hash))),
            None => Ok(None),
        }
    }

    /// Writes the remaining locked amount and the terminal flag.
    pub async fn set_remaining(
        &mut self,
        lock_id: i64,
        remaining: Money,
        unlocked: bool,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE locked_funds SET amount = ?, is_unlocked = ? WHERE id = ? AND is_unlocked = 0",
        )
        .bind(remaining.to_string())
        .bind(unlocked)
        .bind(lock_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("LockedFund", lock_id));
        }
        Ok(())
    }

    /// Lists an account's active locks, newest first.
    pub async fn list_active(&mut self, account_id: i64) -> DbResult<Vec<LockedFund>> {
        let rows: Vec<LockedFundRow> = sqlx::query_as(&format!(
            "SELECT {} FROM locked_funds
             WHERE account_id = ? AND is_unlocked = 0
             ORDER BY id DESC",
            LOCK_COLUMNS
        ))
        .bind(account_id)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(LockedFund::try_from).collect()
    }

    /// Sum of an account's active locks.
    pub async fn active_total(&mut self, account_id: i64) -> DbResult<Money> {
        Ok(self
            .list_active(account_id)
            .await?
            .into_iter()
            .map(|lock| lock.amount)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::{AccountRepository, UserRepository};
    use coffer_core::Role;

    #[tokio::test]
    async fn test_lock_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let user = UserRepository::new(&mut conn)
            .insert("dave", "phc", Role::User, None, None, Utc::now())
            .await
            .unwrap();
        let account = AccountRepository::new(&mut conn)
            .insert(user.id, "AC00000001", "savings")
            .await
            .unwrap();

        let mut locks = LockedFundRepository::new(&mut conn);
        let lock = locks
            .insert(account.id, Money::from_major(1000), "pin-phc", Some("rainy day"))
            .await
            .unwrap();

        let (found, hash) = locks.find_active(lock.id, account.id).await.unwrap().unwrap();
        assert_eq!(found.amount, Money::from_major(1000));
        assert_eq!(hash, "pin-phc");
        assert!(locks.find_active(lock.id, account.id + 1).await.unwrap().is_none());

        locks
            .set_remaining(lock.id, Money::from_major(600), false)
            .await
            .unwrap();
        assert_eq!(
            locks.active_total(account.id).await.unwrap(),
            Money::from_major(600)
        );

        locks.set_remaining(lock.id, Money::zero(), true).await.unwrap();
        assert!(locks.list_active(account.id).await.unwrap().is_empty());
        assert!(locks.find_active(lock.id, account.id).await.unwrap().is_none());

        let terminal = locks.get(lock.id).await.unwrap().unwrap();
        assert!(terminal.is_unlocked);
        assert!(terminal.amount.is_zero());

        // Terminal locks cannot be updated again.
        assert!(locks
            .set_remaining(lock.id, Money::from_major(1), false)
            .await
            .is_err());
    }
}
