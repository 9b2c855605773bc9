//! Read-only commands: balances, history, locks and oversight views.

use super::Printer;
use crate::error::CliResult;
use crate::state::AppState;
use coffer_core::{Transaction, TransactionWithOwner};

pub async fn balance(state: &AppState, account_id: i64, out: &Printer) -> CliResult<bool> {
    let balance = state.queries.get_balance(account_id).await?;
    out.value(&balance, |balance| {
        println!("Balance for account ID {}: {}", account_id, balance);
    });
    Ok(true)
}

pub async fn history(
    state: &AppState,
    account_id: i64,
    limit: Option<u32>,
    out: &Printer,
) -> CliResult<bool> {
    let entries = state.queries.list_transactions(account_id, limit).await?;
    out.value(&entries, |entries| {
        if entries.is_empty() {
            println!("No transactions for account ID {}", account_id);
        }
        for entry in entries {
            println!("{}", entry_line(entry));
        }
    });
    Ok(true)
}

pub async fn locks(state: &AppState, account_id: i64, out: &Printer) -> CliResult<bool> {
    let locks = state.queries.list_active_locked_funds(account_id).await?;
    out.value(&locks, |locks| {
        if locks.is_empty() {
            println!("No active locks for account ID {}", account_id);
        }
        for lock in locks {
            println!(
                "#{:<5} {:>14}  {}  {}",
                lock.id,
                lock.amount.to_string(),
                lock.created_at.format("%Y-%m-%d %H:%M"),
                lock.description.as_deref().unwrap_or("")
            );
        }
    });
    Ok(true)
}

pub async fn users(state: &AppState, out: &Printer) -> CliResult<bool> {
    let users = state.queries.list_all_users().await?;
    out.value(&users, |users| {
        for user in users {
            println!(
                "{:<5} {:<20} {:<6} {}",
                user.id,
                user.username,
                if user.is_admin() { "admin" } else { "user" },
                user.full_name.as_deref().unwrap_or("")
            );
        }
    });
    Ok(true)
}

pub async fn audit(state: &AppState, limit: Option<u32>, out: &Printer) -> CliResult<bool> {
    let entries = state.queries.list_all_transactions_with_owner(limit).await?;
    out.value(&entries, |entries| {
        for entry in entries {
            println!("{}", owned_line(entry));
        }
    });
    Ok(true)
}

fn entry_line(entry: &Transaction) -> String {
    let sign = if entry.kind.is_credit() { "+" } else { "-" };
    format!(
        "#{:<6} {}  {:<12} {}{:>13}  {}",
        entry.id,
        entry.created_at.format("%Y-%m-%d %H:%M"),
        entry.kind.as_str(),
        sign,
        entry.amount.to_string(),
        entry.description.as_deref().unwrap_or("")
    )
}

fn owned_line(entry: &TransactionWithOwner) -> String {
    format!(
        "{}  {} ({})",
        entry_line(&entry.transaction),
        entry.account_number,
        entry.username
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use coffer_core::{Money, TransactionStatus, TransactionType};

    fn entry(kind: TransactionType) -> Transaction {
        Transaction {
            id: 12,
            account_id: 3,
            kind,
            amount: Money::from_major(300),
            description: Some("Rent".into()),
            reference: None,
            status: TransactionStatus::Completed,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_entry_line_shows_direction() {
        let line = entry_line(&entry(TransactionType::TransferOut));
        assert!(line.starts_with("#12"));
        assert!(line.contains("transfer_out"));
        assert!(line.contains("-       300.00"));
        assert!(line.ends_with("Rent"));

        let line = entry_line(&entry(TransactionType::Deposit));
        assert!(line.contains("+"));
    }

    #[test]
    fn test_owned_line_names_owner() {
        let owned = TransactionWithOwner {
            transaction: entry(TransactionType::Withdraw),
            account_number: "AC00000003".into(),
            username: "bob".into(),
            full_name: None,
        };
        assert!(owned_line(&owned).ends_with("AC00000003 (bob)"));
    }
}
