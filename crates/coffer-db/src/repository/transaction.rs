//! # Transaction Repository
//!
//! The append-only ledger. There is no update or delete statement in this
//! file; a written entry is the audit trail.
//!
//! ## Transfer Legs
//! ```text
//! sender   #41  transfer_out  300.00  reference = "AC00000002"
//! receiver #42  transfer_in   300.00  reference = "sender_txn_41"
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{decode_money, sql_limit};
use coffer_core::{Money, Transaction, TransactionStatus, TransactionType, TransactionWithOwner};

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    account_id: i64,
    #[sqlx(rename = "type")]
    kind: TransactionType,
    amount: String,
    description: Option<String>,
    reference: Option<String>,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DbError;

    fn try_from(row: TransactionRow) -> DbResult<Self> {
        Ok(Transaction {
            amount: decode_money("transactions.amount", &row.amount)?,
            id: row.id,
            account_id: row.account_id,
            kind: row.kind,
            description: row.description,
            reference: row.reference,
            status: row.status,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OwnedTransactionRow {
    #[sqlx(flatten)]
    transaction: TransactionRow,
    account_number: String,
    username: String,
    full_name: Option<String>,
}

impl TryFrom<OwnedTransactionRow> for TransactionWithOwner {
    type Error = DbError;

    fn try_from(row: OwnedTransactionRow) -> DbResult<Self> {
        Ok(TransactionWithOwner {
            transaction: Transaction::try_from(row.transaction)?,
            account_number: row.account_number,
            username: row.username,
            full_name: row.full_name,
        })
    }
}

const TRANSACTION_COLUMNS: &str =
    "t.id, t.account_id, t.type, t.amount, t.description, t.reference, t.status, t.created_at";

const OWNER_JOIN: &str = "FROM transactions t
     JOIN accounts a ON a.id = t.account_id
     JOIN users u ON u.id = a.user_id";

/// A ledger entry about to be written.
#[derive(Debug, Clone, Copy)]
pub struct NewTransaction<'a> {
    pub account_id: i64,
    pub kind: TransactionType,
    pub amount: Money,
    pub description: Option<&'a str>,
    pub reference: Option<&'a str>,
}

/// Repository for ledger entries.
pub struct TransactionRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> TransactionRepository<'c> {
    /// Creates a new TransactionRepository on a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        TransactionRepository { conn }
    }

    /// Appends an entry with status `completed`.
    pub async fn append(&mut self, entry: NewTransaction<'_>) -> DbResult<Transaction> {
        let created_at = Utc::now();
        let status = TransactionStatus::Completed;

        let result = sqlx::query(
            "INSERT INTO transactions
                 (account_id, type, amount, description, reference, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.account_id)
        .bind(entry.kind)
        .bind(entry.amount.to_string())
        .bind(entry.description)
        .bind(entry.reference)
        .bind(status)
        .bind(created_at)
        .execute(&mut *self.conn)
        .await?;

        let id = result.last_insert_rowid();
        debug!(
            transaction_id = id,
            account_id = entry.account_id,
            kind = %entry.kind,
            amount = %entry.amount,
            "Ledger entry appended"
        );

        Ok(Transaction {
            id,
            account_id: entry.account_id,
            kind: entry.kind,
            amount: entry.amount,
            description: entry.description.map(str::to_string),
            reference: entry.reference.map(str::to_string),
            status,
            created_at,
        })
    }

    /// Gets an entry by ID.
    pub async fn get(&mut self, id: i64) -> DbResult<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions t WHERE t.id = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(Transaction::try_from).transpose()
    }

    /// Lists an account's entries, newest first.
    pub async fn list_for_account(
        &mut self,
        account_id: i64,
        limit: Option<u32>,
    ) -> DbResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions t WHERE t.account_id = ? ORDER BY t.id DESC LIMIT ?",
            TRANSACTION_COLUMNS
        ))
        .bind(account_id)
        .bind(sql_limit(limit))
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// Lists every entry, newest first.
    pub async fn list_all(&mut self, limit: Option<u32>) -> DbResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions t ORDER BY t.id DESC LIMIT ?",
            TRANSACTION_COLUMNS
        ))
        .bind(sql_limit(limit))
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// Lists every entry joined with account and owner, newest first.
    pub async fn list_all_with_owner(
        &mut self,
        limit: Option<u32>,
    ) -> DbResult<Vec<TransactionWithOwner>> {
        let rows: Vec<OwnedTransactionRow> = sqlx::query_as(&format!(
            "SELECT {}, a.account_number, u.username, u.full_name {} ORDER BY t.id DESC LIMIT ?",
            TRANSACTION_COLUMNS, OWNER_JOIN
        ))
        .bind(sql_limit(limit))
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(TransactionWithOwner::try_from).collect()
    }

    /// Gets one entry joined with account and owner.
    pub async fn get_with_owner(&mut self, id: i64) -> DbResult<Option<TransactionWithOwner>> {
        let row: Option<OwnedTransactionRow> = sqlx::query_as(&format!(
            "SELECT {}, a.account_number, u.username, u.full_name {} WHERE t.id = ?",
            TRANSACTION_COLUMNS, OWNER_JOIN
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(TransactionWithOwner::try_from).transpose()
    }

    /// Number of entries for an account.
    pub async fn count_for_account(&mut self, account_id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::{AccountRepository, UserRepository};
    use coffer_core::Role;

    #[tokio::test]
    async fn test_append_and_list_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let user = UserRepository::new(&mut conn)
            .insert("carol", "phc", Role::User, Some("Carol C"), None, Utc::now())
            .await
            .unwrap();
        let account = AccountRepository::new(&mut conn)
            .insert(user.id, "AC00000001", "savings")
            .await
            .unwrap();

        let mut ledger = TransactionRepository::new(&mut conn);
        for (kind, cents) in [
            (TransactionType::Deposit, 10_000),
            (TransactionType::Withdraw, 2_500),
            (TransactionType::Lock, 1_000),
        ] {
            ledger
                .append(NewTransaction {
                    account_id: account.id,
                    kind,
                    amount: Money::from_cents(cents),
                    description: None,
                    reference: None,
                })
                .await
                .unwrap();
        }

        let listed = ledger.list_for_account(account.id, None).await.unwrap();
        let kinds: Vec<_> = listed.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TransactionType::Lock,
                TransactionType::Withdraw,
                TransactionType::Deposit
            ]
        );
        assert_eq!(listed[1].amount, Money::from_cents(2_500));

        assert_eq!(ledger.list_for_account(account.id, Some(2)).await.unwrap().len(), 2);
        assert!(ledger.list_for_account(account.id, Some(0)).await.unwrap().is_empty());
        assert!(ledger.list_for_account(999, None).await.unwrap().is_empty());

        let owned = ledger.list_all_with_owner(Some(1)).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].username, "carol");
        assert_eq!(owned[0].account_number, "AC00000001");
        assert_eq!(owned[0].transaction.kind, TransactionType::Lock);

        let detail = ledger
            .get_with_owner(listed[2].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.full_name.as_deref(), Some("Carol C"));
        assert_eq!(ledger.count_for_account(account.id).await.unwrap(), 3);
    }
}
