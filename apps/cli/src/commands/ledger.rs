//! Balance-changing commands.
//!
//! Every handler ends in a `(success, message)` line. Refusals such as
//! insufficient funds print a failed outcome instead of returning an error.

use serde::Serialize;

use super::Printer;
use crate::state::AppState;
use coffer_core::{CoreError, ErrorKind, Money, Outcome, Receipt};
use coffer_db::{IntoOutcome, LedgerResult};

/// JSON shape for a completed mutation.
#[derive(Debug, Serialize)]
struct ReceiptOutput<'a> {
    #[serde(flatten)]
    outcome: &'a Outcome,
    receipt: &'a Receipt,
}

pub async fn deposit(
    state: &AppState,
    account_id: i64,
    amount: Money,
    note: Option<&str>,
    out: &Printer,
) -> bool {
    print_receipt(state.engine.deposit(account_id, amount, note).await, out)
}

pub async fn withdraw(
    state: &AppState,
    account_id: i64,
    amount: Money,
    note: Option<&str>,
    out: &Printer,
) -> bool {
    print_receipt(state.engine.withdraw(account_id, amount, note).await, out)
}

pub async fn transfer(
    state: &AppState,
    account_id: i64,
    to: &str,
    amount: Money,
    note: Option<&str>,
    out: &Printer,
) -> bool {
    print_receipt(state.engine.transfer(account_id, to, amount, note).await, out)
}

pub async fn lock(
    state: &AppState,
    account_id: i64,
    amount: Money,
    pin: &str,
    note: Option<&str>,
    out: &Printer,
) -> bool {
    print_receipt(state.engine.lock_funds(account_id, amount, pin, note).await, out)
}

pub async fn unlock(
    state: &AppState,
    lock_id: i64,
    account_id: i64,
    pin: &str,
    amount: Option<Money>,
    out: &Printer,
) -> bool {
    print_receipt(
        state.engine.unlock_funds(lock_id, account_id, pin, amount).await,
        out,
    )
}

/// Sets or clears the blocked flag. The caller has already been checked
/// for the admin role.
pub async fn block(state: &AppState, account_id: i64, blocked: bool, out: &Printer) -> bool {
    let outcome = match state.engine.block_account(account_id, blocked).await {
        Ok(true) if blocked => Outcome::ok(format!("Account ID {} blocked", account_id)),
        Ok(true) => Outcome::ok(format!("Account ID {} unblocked", account_id)),
        Ok(false) => Outcome::fail(
            ErrorKind::AccountNotFound,
            CoreError::AccountNotFound(account_id).to_string(),
        ),
        Err(err) => err.into_outcome(),
    };
    out.outcome(outcome)
}

fn print_receipt(result: LedgerResult<Receipt>, out: &Printer) -> bool {
    let receipt = match result {
        Ok(receipt) => receipt,
        Err(err) => return out.outcome(err.into_outcome()),
    };

    let outcome = Outcome::from(&receipt);
    out.value(
        &ReceiptOutput {
            outcome: &outcome,
            receipt: &receipt,
        },
        |r| {
            println!("✓ {}", r.outcome.message);
            println!("  Balance: {}", r.receipt.balance_after);
            if let Some(lock_id) = r.receipt.lock_id {
                println!("  Lock #{}", lock_id);
            }
            if let Some(remaining) = r.receipt.remaining_locked {
                println!("  Still locked: {}", remaining);
            }
        },
    );
    true
}
