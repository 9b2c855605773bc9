//! Administrative account controls.

use tracing::{info, warn};

use super::LedgerEngine;
use crate::error::{LedgerError, LedgerResult};
use crate::repository::AccountRepository;

impl LedgerEngine {
    /// Sets or clears an account's blocked flag.
    ///
    /// Returns `false` when the account does not exist. A blocked account
    /// is refused by every engine operation that acts on it; it can still
    /// receive transfers.
    pub async fn block_account(&self, account_id: i64, blocked: bool) -> LedgerResult<bool> {
        let updated = self
            .db
            .with_transaction(move |conn| {
                Box::pin(async move {
                    let updated = AccountRepository::new(conn)
                        .set_blocked(account_id, blocked)
                        .await?;
                    Ok::<_, LedgerError>(updated)
                })
            })
            .await?;

        if updated {
            info!(account_id, blocked, "Account block flag updated");
        } else {
            warn!(account_id, "Block requested for unknown account");
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::test_support::{balance_of, engine, open_account};
    use coffer_core::{ErrorKind, Money};

    #[tokio::test]
    async fn test_block_unknown_account() {
        let engine = engine().await;
        assert!(!engine.block_account(404, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_blocked_account_is_refused() {
        let engine = engine().await;
        let account = open_account(&engine, "mallory", Money::from_major(100)).await;
        let friend = open_account(&engine, "trent", Money::from_major(100)).await;

        assert!(engine.block_account(account.id, true).await.unwrap());

        let err = engine
            .withdraw(account.id, Money::from_major(1), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountBlocked);

        let err = engine
            .deposit(account.id, Money::from_major(1), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountBlocked);

        let err = engine
            .transfer(account.id, &friend.account_number, Money::from_major(1), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountBlocked);

        let err = engine
            .lock_funds(account.id, Money::from_major(1), "1234", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountBlocked);

        // Incoming transfers still land.
        engine
            .transfer(friend.id, &account.account_number, Money::from_major(5), None)
            .await
            .unwrap();
        assert_eq!(balance_of(&engine, account.id).await, Money::from_major(105));

        assert!(engine.block_account(account.id, false).await.unwrap());
        assert!(engine
            .withdraw(account.id, Money::from_major(1), None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_blocked_account_cannot_unlock() {
        let engine = engine().await;
        let account = open_account(&engine, "oscar", Money::from_major(100)).await;
        let lock_id = engine
            .lock_funds(account.id, Money::from_major(40), "1234", None)
            .await
            .unwrap()
            .lock_id
            .unwrap();

        engine.block_account(account.id, true).await.unwrap();
        let err = engine
            .unlock_funds(lock_id, account.id, "1234", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountBlocked);
    }
}
