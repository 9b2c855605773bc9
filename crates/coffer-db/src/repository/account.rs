//! # Account Repository
//!
//! Accounts, balances and the blocked flag.
//!
//! `set_balance` writes an absolute value computed by the engine from a
//! balance it read in the same unit of work. Called anywhere else it would
//! lose updates.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::decode_money;
use coffer_core::{Account, Money};

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    user_id: i64,
    account_number: String,
    balance: String,
    account_type: String,
    is_blocked: bool,
}

impl TryFrom<AccountRow> for Account {
    type Error = DbError;

    fn try_from(row: AccountRow) -> DbResult<Self> {
        Ok(Account {
            balance: decode_money("accounts.balance", &row.balance)?,
            id: row.id,
            user_id: row.user_id,
            account_number: row.account_number,
            account_type: row.account_type,
            is_blocked: row.is_blocked,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, user_id, account_number, balance, account_type, is_blocked";

/// Repository for account database operations.
pub struct AccountRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> AccountRepository<'c> {
    /// Creates a new AccountRepository on a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        AccountRepository { conn }
    }

    /// Opens an account with a zero balance.
    pub async fn insert(
        &mut self,
        user_id: i64,
        account_number: &str,
        account_type: &str,
    ) -> DbResult<Account> {
        debug!(user_id, account_number = %account_number, "Opening account");

        let result = sqlx::query(
            "INSERT INTO accounts (user_id, account_number, balance, account_type, is_blocked)
             VALUES (?, ?, ?, ?, 0)",
        )
        .bind(user_id)
        .bind(account_number)
        .bind(Money::zero().to_string())
        .bind(account_type)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("account_number", account_number),
            other => other,
        })?;

        Ok(Account {
            id: result.last_insert_rowid(),
            user_id,
            account_number: account_number.to_string(),
            balance: Money::zero(),
            account_type: account_type.to_string(),
            is_blocked: false,
        })
    }

    /// Gets an account by ID.
    pub async fn get(&mut self, id: i64) -> DbResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(Account::try_from).transpose()
    }

    /// Gets an account by its account number.
    pub async fn get_by_number(&mut self, account_number: &str) -> DbResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts WHERE account_number = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(account_number)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(Account::try_from).transpose()
    }

    /// Lists a user's accounts, oldest first.
    pub async fn list_for_user(&mut self, user_id: i64) -> DbResult<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts WHERE user_id = ? ORDER BY id",
            ACCOUNT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(Account::try_from).collect()
    }

    /// Writes a new balance.
    ///
    /// Fails with `NotFound` when no row matches.
    pub async fn set_balance(&mut self, id: i64, balance: Money) -> DbResult<()> {
        let result = sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
            .bind(balance.to_string())
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }
        Ok(())
    }

    /// Sets the blocked flag. Returns `false` when no row matches.
    pub async fn set_blocked(&mut self, id: i64, blocked: bool) -> DbResult<bool> {
        let result = sqlx::query("UPDATE accounts SET is_blocked = ? WHERE id = ?")
            .bind(blocked)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether any of the user's accounts is blocked.
    pub async fn any_blocked_for_user(&mut self, user_id: i64) -> DbResult<bool> {
        let blocked: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts WHERE user_id = ? AND is_blocked = 1",
        )
        .bind(user_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(blocked > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::UserRepository;
    use chrono::Utc;
    use coffer_core::Role;

    async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let user = UserRepository::new(&mut conn)
            .insert("owner", "phc", Role::User, None, None, Utc::now())
            .await
            .unwrap();
        drop(conn);
        (db, user.id)
    }

    #[tokio::test]
    async fn test_balance_round_trips_as_text() {
        let (db, user_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let mut accounts = AccountRepository::new(&mut conn);

        let account = accounts.insert(user_id, "AC00000001", "savings").await.unwrap();
        accounts
            .set_balance(account.id, Money::from_cents(123_456))
            .await
            .unwrap();

        let reloaded = accounts.get_by_number("AC00000001").await.unwrap().unwrap();
        assert_eq!(reloaded.balance, Money::from_cents(123_456));
        drop(accounts);

        let stored: String = sqlx::query_scalar("SELECT balance FROM accounts WHERE id = ?")
            .bind(account.id)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(stored, "1234.56");
    }

    #[tokio::test]
    async fn test_set_balance_missing_account() {
        let (db, _) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let err = AccountRepository::new(&mut conn)
            .set_balance(42, Money::from_major(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_blocked_flag() {
        let (db, user_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let mut accounts = AccountRepository::new(&mut conn);

        let account = accounts.insert(user_id, "AC00000001", "savings").await.unwrap();
        assert!(!accounts.any_blocked_for_user(user_id).await.unwrap());

        assert!(accounts.set_blocked(account.id, true).await.unwrap());
        assert!(accounts.any_blocked_for_user(user_id).await.unwrap());
        assert!(!accounts.set_blocked(999, true).await.unwrap());

        let listed = accounts.list_for_user(user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_blocked);
    }
}
