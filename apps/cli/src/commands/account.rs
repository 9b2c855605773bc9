//! Registration, login and account listing.

use super::Printer;
use crate::error::{CliError, CliResult};
use crate::state::AppState;

pub async fn register(
    state: &AppState,
    username: &str,
    password: &str,
    full_name: Option<&str>,
    email: Option<&str>,
    out: &Printer,
) -> CliResult<bool> {
    let (user, account) = state
        .auth
        .register(username, password, full_name, email)
        .await?;

    out.value(&(&user, &account), |(user, account)| {
        println!("✓ Registered '{}' (user ID {})", user.username, user.id);
        println!(
            "  Account ID {}, number {}",
            account.id, account.account_number
        );
    });
    Ok(true)
}

pub async fn login(
    state: &AppState,
    username: &str,
    password: &str,
    out: &Printer,
) -> CliResult<bool> {
    let Some(user) = state.auth.authenticate(username, password).await? else {
        return Err(CliError::Forbidden("Invalid username or password".into()));
    };

    let accounts = state.queries.accounts_for_user(user.id).await?;
    out.value(&(&user, &accounts), |(user, accounts)| {
        let name = user.full_name.as_deref().unwrap_or(&user.username);
        println!("✓ Welcome, {}", name);
        for account in accounts.iter() {
            println!(
                "  {} (ID {}): {}",
                account.account_number, account.id, account.balance
            );
        }
    });
    Ok(true)
}

pub async fn accounts(state: &AppState, user_id: i64, out: &Printer) -> CliResult<bool> {
    let accounts = state.queries.accounts_for_user(user_id).await?;
    out.value(&accounts, |accounts| {
        if accounts.is_empty() {
            println!("No accounts for user ID {}", user_id);
        }
        for account in accounts {
            let flag = if account.is_blocked { " [blocked]" } else { "" };
            println!(
                "{} (ID {}, {}): {}{}",
                account.account_number, account.id, account.account_type, account.balance, flag
            );
        }
    });
    Ok(true)
}
