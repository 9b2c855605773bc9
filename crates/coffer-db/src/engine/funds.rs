//! Deposits, withdrawals and transfers.

use sqlx::SqliteConnection;

use super::{load_acting_account, trace_outcome, LedgerEngine};
use crate::error::LedgerResult;
use crate::repository::transaction::NewTransaction;
use crate::repository::{AccountRepository, TransactionRepository};
use coffer_core::validation::sanitize_description;
use coffer_core::{CoreError, Money, Operation, Receipt, TransactionType};

impl LedgerEngine {
    /// Credits an account.
    ///
    /// ## Errors
    /// `InvalidAmount`, `LimitExceeded`, `AccountNotFound`, `AccountBlocked`,
    /// `StorageFailure`.
    pub async fn deposit(
        &self,
        account_id: i64,
        amount: Money,
        description: Option<&str>,
    ) -> LedgerResult<Receipt> {
        self.limits.check(Operation::Deposit, amount)?;
        let description = sanitize_description(description).unwrap_or_else(|| "Deposit".into());

        let result = self
            .db
            .with_transaction(move |conn| {
                Box::pin(apply_deposit(conn, account_id, amount, description))
            })
            .await;

        trace_outcome("deposit", account_id, &result);
        result
    }

    /// Debits an account.
    ///
    /// The balance is read and written inside one unit of work, so two
    /// concurrent withdrawals can never both spend the same funds.
    ///
    /// ## Errors
    /// `InvalidAmount`, `LimitExceeded`, `AccountNotFound`, `AccountBlocked`,
    /// `InsufficientFunds`, `StorageFailure`.
    pub async fn withdraw(
        &self,
        account_id: i64,
        amount: Money,
        description: Option<&str>,
    ) -> LedgerResult<Receipt> {
        self.limits.check(Operation::Withdraw, amount)?;
        let description = sanitize_description(description).unwrap_or_else(|| "Withdrawal".into());

        let result = self
            .db
            .with_transaction(move |conn| {
                Box::pin(apply_withdraw(conn, account_id, amount, description))
            })
            .await;

        trace_outcome("withdraw", account_id, &result);
        result
    }

    /// Moves funds to the account with `receiver_number`.
    ///
    /// Writes two linked entries: `transfer_out` on the sender referencing
    /// the receiver's account number, and `transfer_in` on the receiver
    /// referencing `sender_txn_{id}`. Both balances move or neither does.
    ///
    /// ## Check Order
    /// ```text
    /// amount / ceiling          (before the unit of work)
    /// sender exists, unblocked  AccountNotFound / AccountBlocked
    /// receiver != sender        SelfTransferNotAllowed
    /// sender balance >= amount  InsufficientFunds
    /// receiver resolves         CounterpartyNotFound
    /// ```
    pub async fn transfer(
        &self,
        sender_account_id: i64,
        receiver_number: &str,
        amount: Money,
        description: Option<&str>,
    ) -> LedgerResult<Receipt> {
        self.limits.check(Operation::Transfer, amount)?;
        let description = sanitize_description(description);
        let receiver_number = receiver_number.trim().to_string();

        let result = self
            .db
            .with_transaction(move |conn| {
                Box::pin(apply_transfer(
                    conn,
                    sender_account_id,
                    receiver_number,
                    amount,
                    description,
                ))
            })
            .await;

        trace_outcome("transfer", sender_account_id, &result);
        result
    }
}

// =============================================================================
// Unit-of-work bodies
// =============================================================================

async fn apply_deposit(
    conn: &mut SqliteConnection,
    account_id: i64,
    amount: Money,
    description: String,
) -> LedgerResult<Receipt> {
    let account = load_acting_account(conn, account_id).await?;
    let balance_after = account
        .balance
        .checked_add(amount)
        .ok_or(CoreError::InvalidAmount)?;

    AccountRepository::new(conn)
        .set_balance(account_id, balance_after)
        .await?;

    let entry = TransactionRepository::new(conn)
        .append(NewTransaction {
            account_id,
            kind: TransactionType::Deposit,
            amount,
            description: Some(&description),
            reference: None,
        })
        .await?;

    Ok(Receipt {
        transaction_id: entry.id,
        account_id,
        kind: TransactionType::Deposit,
        amount,
        balance_after,
        linked_transaction_id: None,
        counterparty: None,
        lock_id: None,
        remaining_locked: None,
    })
}

async fn apply_withdraw(
    conn: &mut SqliteConnection,
    account_id: i64,
    amount: Money,
    description: String,
) -> LedgerResult<Receipt> {
    let account = load_acting_account(conn, account_id).await?;
    if account.balance < amount {
        return Err(CoreError::InsufficientFunds { account_id }.into());
    }
    let balance_after = account.balance - amount;

    AccountRepository::new(conn)
        .set_balance(account_id, balance_after)
        .await?;

    let entry = TransactionRepository::new(conn)
        .append(NewTransaction {
            account_id,
            kind: TransactionType::Withdraw,
            amount,
            description: Some(&description),
            reference: None,
        })
        .await?;

    Ok(Receipt {
        transaction_id: entry.id,
        account_id,
        kind: TransactionType::Withdraw,
        amount,
        balance_after,
        linked_transaction_id: None,
        counterparty: None,
        lock_id: None,
        remaining_locked: None,
    })
}

async fn apply_transfer(
    conn: &mut SqliteConnection,
    sender_id: i64,
    receiver_number: String,
    amount: Money,
    description: Option<String>,
) -> LedgerResult<Receipt> {
    let sender = load_acting_account(conn, sender_id).await?;

    let receiver = AccountRepository::new(conn)
        .get_by_number(&receiver_number)
        .await?;

    if receiver.as_ref().is_some_and(|r| r.id == sender.id) {
        return Err(CoreError::SelfTransferNotAllowed.into());
    }

    if sender.balance < amount {
        return Err(CoreError::InsufficientFunds {
            account_id: sender_id,
        }
        .into());
    }

    let receiver = receiver.ok_or(CoreError::CounterpartyNotFound(receiver_number))?;

    let sender_after = sender.balance - amount;
    let receiver_after = receiver
        .balance
        .checked_add(amount)
        .ok_or(CoreError::InvalidAmount)?;

    {
        let mut accounts = AccountRepository::new(conn);
        accounts.set_balance(sender.id, sender_after).await?;
        accounts.set_balance(receiver.id, receiver_after).await?;
    }

    let out_description = description
        .clone()
        .unwrap_or_else(|| format!("Transfer to {}", receiver.account_number));
    let in_description =
        description.unwrap_or_else(|| format!("Transfer from {}", sender.account_number));

    let mut ledger = TransactionRepository::new(conn);
    let debit = ledger
        .append(NewTransaction {
            account_id: sender.id,
            kind: TransactionType::TransferOut,
            amount,
            description: Some(&out_description),
            reference: Some(&receiver.account_number),
        })
        .await?;

    let credit_reference = format!("sender_txn_{}", debit.id);
    let credit = ledger
        .append(NewTransaction {
            account_id: receiver.id,
            kind: TransactionType::TransferIn,
            amount,
            description: Some(&in_description),
            reference: Some(&credit_reference),
        })
        .await?;

    Ok(Receipt {
        transaction_id: debit.id,
        account_id: sender.id,
        kind: TransactionType::TransferOut,
        amount,
        balance_after: sender_after,
        linked_transaction_id: Some(credit.id),
        counterparty: Some(receiver.account_number),
        lock_id: None,
        remaining_locked: None,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{balance_of, engine, entry_count, open_account};
    use coffer_core::ErrorKind;

    #[tokio::test]
    async fn test_deposit_credits_and_records() {
        let engine = engine().await;
        let account = open_account(&engine, "alice", Money::from_major(1000)).await;

        let receipt = engine
            .deposit(account.id, Money::from_major(500), None)
            .await
            .unwrap();

        assert_eq!(receipt.balance_after, Money::from_major(1500));
        assert_eq!(receipt.message(), "Successfully deposited 500.00");
        assert_eq!(balance_of(&engine, account.id).await, Money::from_major(1500));
        assert_eq!(entry_count(&engine, account.id).await, 1);
    }

    #[tokio::test]
    async fn test_deposit_validation_happens_first() {
        let engine = engine().await;

        // No such account, but the amount is checked before the store is touched.
        let err = engine.deposit(999, Money::zero(), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);

        let err = engine
            .deposit(999, Money::from_major(1_000_001), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);

        let err = engine.deposit(999, Money::from_major(1), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountNotFound);
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_funds_changes_nothing() {
        let engine = engine().await;
        let account = open_account(&engine, "bob", Money::from_major(1500)).await;

        let err = engine
            .withdraw(account.id, Money::from_major(2000), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(balance_of(&engine, account.id).await, Money::from_major(1500));
        assert_eq!(entry_count(&engine, account.id).await, 0);
    }

    #[tokio::test]
    async fn test_withdraw_exact_balance() {
        let engine = engine().await;
        let account = open_account(&engine, "erin", Money::from_cents(5_050)).await;

        let receipt = engine
            .withdraw(account.id, Money::from_cents(5_050), Some("rent"))
            .await
            .unwrap();
        assert!(receipt.balance_after.is_zero());
    }

    #[tokio::test]
    async fn test_transfer_moves_both_balances() {
        let engine = engine().await;
        let receiver = open_account(&engine, "alice", Money::zero()).await;
        let sender = open_account(&engine, "bob", Money::from_major(1500)).await;

        let receipt = engine
            .transfer(sender.id, &receiver.account_number, Money::from_major(300), None)
            .await
            .unwrap();

        assert_eq!(receipt.balance_after, Money::from_major(1200));
        assert_eq!(receipt.counterparty.as_deref(), Some(receiver.account_number.as_str()));
        assert_eq!(balance_of(&engine, sender.id).await, Money::from_major(1200));
        assert_eq!(balance_of(&engine, receiver.id).await, Money::from_major(300));

        let mut conn = engine.database().pool().acquire().await.unwrap();
        let mut ledger = TransactionRepository::new(&mut conn);
        let out = ledger.get(receipt.transaction_id).await.unwrap().unwrap();
        let credit = ledger
            .get(receipt.linked_transaction_id.unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(out.kind, TransactionType::TransferOut);
        assert_eq!(out.reference.as_deref(), Some(receiver.account_number.as_str()));
        assert_eq!(
            out.description.as_deref(),
            Some(format!("Transfer to {}", receiver.account_number).as_str())
        );
        assert_eq!(credit.kind, TransactionType::TransferIn);
        assert_eq!(credit.account_id, receiver.id);
        assert_eq!(credit.reference, Some(format!("sender_txn_{}", out.id)));
    }

    #[tokio::test]
    async fn test_self_transfer_rejected_even_when_short() {
        let engine = engine().await;
        let account = open_account(&engine, "alice", Money::from_major(10)).await;

        for amount in [Money::from_major(5), Money::from_major(50)] {
            let err = engine
                .transfer(account.id, &account.account_number, amount, None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SelfTransferNotAllowed);
        }
        assert_eq!(entry_count(&engine, account.id).await, 0);
    }

    #[tokio::test]
    async fn test_transfer_unknown_receiver() {
        let engine = engine().await;
        let sender = open_account(&engine, "bob", Money::from_major(100)).await;

        let err = engine
            .transfer(sender.id, "AC99999999", Money::from_major(1), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CounterpartyNotFound);
        assert_eq!(balance_of(&engine, sender.id).await, Money::from_major(100));
    }

    #[tokio::test]
    async fn test_short_sender_to_unknown_receiver_is_insufficient_funds() {
        let engine = engine().await;
        let sender = open_account(&engine, "bob", Money::from_major(100)).await;

        let err = engine
            .transfer(sender.id, "AC99999999", Money::from_major(500), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(balance_of(&engine, sender.id).await, Money::from_major(100));
        assert_eq!(entry_count(&engine, sender.id).await, 0);
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds_leaves_both_untouched() {
        let engine = engine().await;
        let receiver = open_account(&engine, "alice", Money::from_major(7)).await;
        let sender = open_account(&engine, "bob", Money::from_major(100)).await;

        let err = engine
            .transfer(sender.id, &receiver.account_number, Money::from_major(101), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(balance_of(&engine, sender.id).await, Money::from_major(100));
        assert_eq!(balance_of(&engine, receiver.id).await, Money::from_major(7));
        assert_eq!(entry_count(&engine, sender.id).await, 0);
        assert_eq!(entry_count(&engine, receiver.id).await, 0);
    }

    #[tokio::test]
    async fn test_transfer_ceiling() {
        let engine = engine().await;
        let receiver = open_account(&engine, "alice", Money::zero()).await;
        let sender = open_account(&engine, "bob", Money::from_major(900_000)).await;

        let err = engine
            .transfer(sender.id, &receiver.account_number, Money::from_major(500_001), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);
        assert_eq!(err.to_string(), "Transfer exceeds maximum limit of 500000.00");
    }
}
