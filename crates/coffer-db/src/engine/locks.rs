//! PIN-protected locks.
//!
//! Locking moves funds out of the available balance into a `locked_funds`
//! row; unlocking moves them back, in part or in full. For every account
//! `balance + sum(active locks)` is the same before and after any sequence
//! of lock and unlock calls.
//!
//! Argon2 runs on the blocking thread pool. Hashing a new PIN happens before
//! the unit of work opens; verifying a stored one happens inside it.

use sqlx::SqliteConnection;
use tracing::debug;

use super::{load_acting_account, trace_outcome, LedgerEngine};
use crate::error::LedgerResult;
use crate::hashing;
use crate::repository::transaction::NewTransaction;
use crate::repository::{AccountRepository, LockedFundRepository, TransactionRepository};
use coffer_core::validation::sanitize_description;
use coffer_core::{CoreError, Money, Operation, PinHasher, Receipt, TransactionType};

impl LedgerEngine {
    /// Moves `amount` from the balance into a new PIN-protected lock.
    ///
    /// ## Errors
    /// `InvalidAmount`, `LimitExceeded`, `WeakCredential` (all before the
    /// store is touched), then `AccountNotFound`, `AccountBlocked`,
    /// `InsufficientFunds`, `StorageFailure`.
    pub async fn lock_funds(
        &self,
        account_id: i64,
        amount: Money,
        pin: &str,
        description: Option<&str>,
    ) -> LedgerResult<Receipt> {
        self.limits.check(Operation::Lock, amount)?;
        self.hasher.check_strength(pin)?;

        let pin_hash = hashing::hash_pin(self.hasher.clone(), pin.to_string()).await?;
        let description = sanitize_description(description);

        let result = self
            .db
            .with_transaction(move |conn| {
                Box::pin(apply_lock(conn, account_id, amount, pin_hash, description))
            })
            .await;

        trace_outcome("lock", account_id, &result);
        result
    }

    /// Releases locked funds back to the balance.
    ///
    /// `amount` defaults to everything that remains locked. Unlocking the
    /// full remainder makes the lock terminal; a smaller amount leaves it
    /// active with the rest.
    ///
    /// ## Errors
    /// `LockNotFound`, `AccountBlocked`, `IncorrectPin`, `InvalidAmount`,
    /// `AmountExceedsLock`, `StorageFailure`. Every failure leaves balance,
    /// lock and ledger untouched.
    pub async fn unlock_funds(
        &self,
        lock_id: i64,
        account_id: i64,
        pin: &str,
        amount: Option<Money>,
    ) -> LedgerResult<Receipt> {
        let hasher = self.hasher.clone();
        let pin = pin.to_string();

        let result = self
            .db
            .with_transaction(move |conn| {
                Box::pin(apply_unlock(conn, hasher, lock_id, account_id, pin, amount))
            })
            .await;

        trace_outcome("unlock", account_id, &result);
        result
    }
}

fn lock_reference(lock_id: i64) -> String {
    format!("lock_{}", lock_id)
}

// =============================================================================
// Unit-of-work bodies
// =============================================================================

async fn apply_lock(
    conn: &mut SqliteConnection,
    account_id: i64,
    amount: Money,
    pin_hash: String,
    description: Option<String>,
) -> LedgerResult<Receipt> {
    let account = load_acting_account(conn, account_id).await?;
    if account.balance < amount {
        return Err(CoreError::InsufficientFunds { account_id }.into());
    }
    let balance_after = account.balance - amount;

    AccountRepository::new(conn)
        .set_balance(account_id, balance_after)
        .await?;

    let lock = LockedFundRepository::new(conn)
        .insert(account_id, amount, &pin_hash, description.as_deref())
        .await?;

    let entry = TransactionRepository::new(conn)
        .append(NewTransaction {
            account_id,
            kind: TransactionType::Lock,
            amount,
            description: Some(description.as_deref().unwrap_or("Funds locked")),
            reference: Some(&lock_reference(lock.id)),
        })
        .await?;

    Ok(Receipt {
        transaction_id: entry.id,
        account_id,
        kind: TransactionType::Lock,
        amount,
        balance_after,
        linked_transaction_id: None,
        counterparty: None,
        lock_id: Some(lock.id),
        remaining_locked: Some(amount),
    })
}

async fn apply_unlock(
    conn: &mut SqliteConnection,
    hasher: PinHasher,
    lock_id: i64,
    account_id: i64,
    pin: String,
    amount: Option<Money>,
) -> LedgerResult<Receipt> {
    let (lock, pin_hash) = LockedFundRepository::new(conn)
        .find_active(lock_id, account_id)
        .await?
        .ok_or(CoreError::LockNotFound { lock_id })?;

    let account = load_acting_account(conn, account_id).await?;

    if !hashing::verify(hasher, pin, pin_hash).await? {
        return Err(CoreError::IncorrectPin.into());
    }

    let remaining = lock.amount;
    let amount = amount.unwrap_or(remaining);
    if !amount.is_positive() {
        return Err(CoreError::InvalidAmount.into());
    }
    if amount > remaining {
        return Err(CoreError::AmountExceedsLock { remaining }.into());
    }

    let remaining_after = remaining - amount;
    let fully_unlocked = remaining_after.is_zero();
    debug!(lock_id, fully_unlocked, "Releasing locked funds");

    LockedFundRepository::new(conn)
        .set_remaining(lock_id, remaining_after, fully_unlocked)
        .await?;

    let balance_after = account
        .balance
        .checked_add(amount)
        .ok_or(CoreError::InvalidAmount)?;
    AccountRepository::new(conn)
        .set_balance(account_id, balance_after)
        .await?;

    let description = format!("Funds unlocked from lock #{}", lock_id);
    let entry = TransactionRepository::new(conn)
        .append(NewTransaction {
            account_id,
            kind: TransactionType::Unlock,
            amount,
            description: Some(&description),
            reference: Some(&lock_reference(lock_id)),
        })
        .await?;

    Ok(Receipt {
        transaction_id: entry.id,
        account_id,
        kind: TransactionType::Unlock,
        amount,
        balance_after,
        linked_transaction_id: None,
        counterparty: None,
        lock_id: Some(lock_id),
        remaining_locked: Some(remaining_after),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{balance_of, engine, entry_count, open_account};
    use coffer_core::{ErrorKind, LockedFund};

    async fn lock_row(engine: &LedgerEngine, lock_id: i64) -> LockedFund {
        let mut conn = engine.database().pool().acquire().await.unwrap();
        LockedFundRepository::new(&mut conn)
            .get(lock_id)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_partial_then_full_unlock() {
        let engine = engine().await;
        let account = open_account(&engine, "alice", Money::from_major(1500)).await;

        let locked = engine
            .lock_funds(account.id, Money::from_major(1000), "2468", Some("holiday"))
            .await
            .unwrap();
        let lock_id = locked.lock_id.unwrap();
        assert_eq!(locked.balance_after, Money::from_major(500));

        let partial = engine
            .unlock_funds(lock_id, account.id, "2468", Some(Money::from_major(400)))
            .await
            .unwrap();
        assert_eq!(partial.balance_after, Money::from_major(900));
        assert_eq!(partial.remaining_locked, Some(Money::from_major(600)));

        let row = lock_row(&engine, lock_id).await;
        assert_eq!(row.amount, Money::from_major(600));
        assert!(!row.is_unlocked);

        let rest = engine.unlock_funds(lock_id, account.id, "2468", None).await.unwrap();
        assert_eq!(rest.amount, Money::from_major(600));
        assert_eq!(rest.balance_after, Money::from_major(1500));

        let row = lock_row(&engine, lock_id).await;
        assert!(row.amount.is_zero());
        assert!(row.is_unlocked);

        // Terminal locks are never matched again.
        let err = engine
            .unlock_funds(lock_id, account.id, "2468", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockNotFound);
    }

    #[tokio::test]
    async fn test_incorrect_pin_changes_nothing() {
        let engine = engine().await;
        let account = open_account(&engine, "bob", Money::from_major(1000)).await;
        let lock_id = engine
            .lock_funds(account.id, Money::from_major(250), "1357", None)
            .await
            .unwrap()
            .lock_id
            .unwrap();
        let entries_before = entry_count(&engine, account.id).await;

        let err = engine
            .unlock_funds(lock_id, account.id, "0000", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IncorrectPin);
        assert_eq!(err.to_string(), "Incorrect PIN");
        assert_eq!(balance_of(&engine, account.id).await, Money::from_major(750));
        assert_eq!(lock_row(&engine, lock_id).await.amount, Money::from_major(250));
        assert_eq!(entry_count(&engine, account.id).await, entries_before);
    }

    #[tokio::test]
    async fn test_weak_pin_rejected_before_store() {
        let engine = engine().await;
        let account = open_account(&engine, "carol", Money::from_major(100)).await;

        let err = engine
            .lock_funds(account.id, Money::from_major(10), "123", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WeakCredential);
        assert_eq!(balance_of(&engine, account.id).await, Money::from_major(100));
    }

    #[tokio::test]
    async fn test_lock_insufficient_funds() {
        let engine = engine().await;
        let account = open_account(&engine, "dave", Money::from_major(100)).await;

        let err = engine
            .lock_funds(account.id, Money::from_major(101), "1234", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(entry_count(&engine, account.id).await, 0);
    }

    #[tokio::test]
    async fn test_unlock_amount_rules() {
        let engine = engine().await;
        let account = open_account(&engine, "erin", Money::from_major(100)).await;
        let lock_id = engine
            .lock_funds(account.id, Money::from_major(60), "9999", None)
            .await
            .unwrap()
            .lock_id
            .unwrap();

        let err = engine
            .unlock_funds(lock_id, account.id, "9999", Some(Money::from_major(61)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmountExceedsLock);

        let err = engine
            .unlock_funds(lock_id, account.id, "9999", Some(Money::zero()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
    }

    #[tokio::test]
    async fn test_lock_belongs_to_account() {
        let engine = engine().await;
        let owner = open_account(&engine, "frank", Money::from_major(100)).await;
        let other = open_account(&engine, "grace", Money::from_major(100)).await;
        let lock_id = engine
            .lock_funds(owner.id, Money::from_major(50), "4321", None)
            .await
            .unwrap()
            .lock_id
            .unwrap();

        let err = engine
            .unlock_funds(lock_id, other.id, "4321", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockNotFound);
    }

    #[tokio::test]
    async fn test_lock_entries_and_conservation() {
        let engine = engine().await;
        let account = open_account(&engine, "heidi", Money::from_major(1000)).await;
        let conserved = Money::from_major(1000);

        let a = engine
            .lock_funds(account.id, Money::from_cents(12_345), "1111", None)
            .await
            .unwrap();
        let b = engine
            .lock_funds(account.id, Money::from_major(300), "2222", None)
            .await
            .unwrap();
        engine
            .unlock_funds(b.lock_id.unwrap(), account.id, "2222", Some(Money::from_cents(1)))
            .await
            .unwrap();
        engine
            .unlock_funds(a.lock_id.unwrap(), account.id, "1111", None)
            .await
            .unwrap();

        let mut conn = engine.database().pool().acquire().await.unwrap();
        let locked = LockedFundRepository::new(&mut conn)
            .active_total(account.id)
            .await
            .unwrap();
        let balance = AccountRepository::new(&mut conn)
            .get(account.id)
            .await
            .unwrap()
            .unwrap()
            .balance;
        assert_eq!(balance + locked, conserved);

        let entries = TransactionRepository::new(&mut conn)
            .list_for_account(account.id, None)
            .await
            .unwrap();
        assert_eq!(entries[0].kind, TransactionType::Unlock);
        assert_eq!(
            entries[0].description,
            Some(format!("Funds unlocked from lock #{}", a.lock_id.unwrap()))
        );
        assert_eq!(entries[3].description.as_deref(), Some("Funds locked"));
    }
}
