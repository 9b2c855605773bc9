//! # Query Service
//!
//! Read-only projections over the ledger. Nothing here opens a unit of
//! work; each call is a single statement on a pooled connection.
//!
//! ```text
//! ┌──────────────────────────────────┬─────────────────────────────────────┐
//! │ Call                             │ Empty result                        │
//! ├──────────────────────────────────┼─────────────────────────────────────┤
//! │ get_balance                      │ AccountNotFound (a balance needs    │
//! │                                  │ an account)                         │
//! │ list_transactions                │ []                                  │
//! │ list_active_locked_funds         │ []                                  │
//! │ list_all_users                   │ []                                  │
//! │ list_all_transactions(_with_owner│ []                                  │
//! └──────────────────────────────────┴─────────────────────────────────────┘
//! ```
//!
//! Non-positive ids and malformed account numbers fail with a validation
//! error instead of returning empty.

use sqlx::pool::PoolConnection;
use sqlx::Sqlite;

use crate::error::LedgerResult;
use crate::pool::Database;
use crate::repository::{
    AccountRepository, LockedFundRepository, TransactionRepository, UserRepository,
};
use coffer_core::validation::{validate_account_number, validate_id};
use coffer_core::{
    Account, CoreError, LockedFund, Money, Transaction, TransactionWithOwner, User,
};

/// Read-only access to balances, history and locks.
#[derive(Debug, Clone)]
pub struct QueryService {
    db: Database,
}

impl QueryService {
    pub fn new(db: Database) -> Self {
        QueryService { db }
    }

    async fn conn(&self) -> LedgerResult<PoolConnection<Sqlite>> {
        Ok(self.db.pool().acquire().await?)
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Current available balance.
    pub async fn get_balance(&self, account_id: i64) -> LedgerResult<Money> {
        self.get_account(account_id)
            .await?
            .map(|account| account.balance)
            .ok_or_else(|| CoreError::AccountNotFound(account_id).into())
    }

    pub async fn get_account(&self, account_id: i64) -> LedgerResult<Option<Account>> {
        validate_id("account id", account_id)?;
        let mut conn = self.conn().await?;
        Ok(AccountRepository::new(&mut conn).get(account_id).await?)
    }

    pub async fn get_account_by_number(&self, number: &str) -> LedgerResult<Option<Account>> {
        validate_account_number(number)?;
        let mut conn = self.conn().await?;
        Ok(AccountRepository::new(&mut conn).get_by_number(number).await?)
    }

    pub async fn accounts_for_user(&self, user_id: i64) -> LedgerResult<Vec<Account>> {
        validate_id("user id", user_id)?;
        let mut conn = self.conn().await?;
        Ok(AccountRepository::new(&mut conn).list_for_user(user_id).await?)
    }

    // =========================================================================
    // History
    // =========================================================================

    /// An account's ledger entries, newest first.
    ///
    /// `limit: None` returns all of them.
    pub async fn list_transactions(
        &self,
        account_id: i64,
        limit: Option<u32>,
    ) -> LedgerResult<Vec<Transaction>> {
        validate_id("account id", account_id)?;
        let mut conn = self.conn().await?;
        Ok(TransactionRepository::new(&mut conn)
            .list_for_account(account_id, limit)
            .await?)
    }

    /// An account's active locks, newest first.
    pub async fn list_active_locked_funds(&self, account_id: i64) -> LedgerResult<Vec<LockedFund>> {
        validate_id("account id", account_id)?;
        let mut conn = self.conn().await?;
        Ok(LockedFundRepository::new(&mut conn)
            .list_active(account_id)
            .await?)
    }

    // =========================================================================
    // Oversight
    // =========================================================================

    pub async fn list_all_users(&self) -> LedgerResult<Vec<User>> {
        let mut conn = self.conn().await?;
        Ok(UserRepository::new(&mut conn).list_all().await?)
    }

    pub async fn list_all_transactions(&self, limit: Option<u32>) -> LedgerResult<Vec<Transaction>> {
        let mut conn = self.conn().await?;
        Ok(TransactionRepository::new(&mut conn).list_all(limit).await?)
    }

    /// Every ledger entry with its account number and owner, newest first.
    pub async fn list_all_transactions_with_owner(
        &self,
        limit: Option<u32>,
    ) -> LedgerResult<Vec<TransactionWithOwner>> {
        let mut conn = self.conn().await?;
        Ok(TransactionRepository::new(&mut conn)
            .list_all_with_owner(limit)
            .await?)
    }

    pub async fn transaction_with_owner(
        &self,
        transaction_id: i64,
    ) -> LedgerResult<Option<TransactionWithOwner>> {
        validate_id("transaction id", transaction_id)?;
        let mut conn = self.conn().await?;
        Ok(TransactionRepository::new(&mut conn)
            .get_with_owner(transaction_id)
            .await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{engine, open_account};
    use coffer_core::{ErrorKind, TransactionType};

    #[tokio::test]
    async fn test_empty_results_are_not_errors() {
        let engine = engine().await;
        let queries = QueryService::new(engine.database().clone());

        assert!(queries.list_transactions(7, None).await.unwrap().is_empty());
        assert!(queries.list_active_locked_funds(7).await.unwrap().is_empty());
        assert!(queries.list_all_users().await.unwrap().is_empty());
        assert!(queries.list_all_transactions(None).await.unwrap().is_empty());
        assert!(queries
            .list_all_transactions_with_owner(Some(10))
            .await
            .unwrap()
            .is_empty());
        assert!(queries.get_account_by_number("AC00000042").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_identifiers() {
        let engine = engine().await;
        let queries = QueryService::new(engine.database().clone());

        assert_eq!(
            queries.list_transactions(0, None).await.unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            queries.get_account_by_number("ac 1").await.unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            queries.get_balance(55).await.unwrap_err().kind(),
            ErrorKind::AccountNotFound
        );
    }

    #[tokio::test]
    async fn test_history_and_locks() {
        let engine = engine().await;
        let queries = QueryService::new(engine.database().clone());
        let account = open_account(&engine, "ivan", Money::from_major(100)).await;

        engine
            .deposit(account.id, Money::from_major(50), None)
            .await
            .unwrap();
        let first = engine
            .lock_funds(account.id, Money::from_major(10), "1234", Some("first"))
            .await
            .unwrap();
        engine
            .lock_funds(account.id, Money::from_major(20), "1234", Some("second"))
            .await
            .unwrap();
        engine
            .unlock_funds(first.lock_id.unwrap(), account.id, "1234", None)
            .await
            .unwrap();

        assert_eq!(
            queries.get_balance(account.id).await.unwrap(),
            Money::from_major(130)
        );

        let history = queries.list_transactions(account.id, Some(2)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, TransactionType::Unlock);

        let locks = queries.list_active_locked_funds(account.id).await.unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].description.as_deref(), Some("second"));

        let owned = queries.list_all_transactions_with_owner(None).await.unwrap();
        assert_eq!(owned.len(), 4);
        assert!(owned.iter().all(|t| t.username == "ivan"));

        let detail = queries
            .transaction_with_owner(history[1].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.account_number, account.account_number);

        let users = queries.list_all_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(
            queries.accounts_for_user(users[0].id).await.unwrap()[0].id,
            account.id
        );
    }
}
