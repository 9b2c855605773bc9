//! # Commands
//!
//! Argument parsing and dispatch. Each submodule holds the handlers for one
//! area and declares only the services it needs.
//!
//! ```text
//! argv ──► Cli::try_parse_from ──► execute ──► Printer
//!                 │                   │
//!                 │ ids, amounts      │ engine / queries / auth
//!                 ▼                   ▼
//!            clap usage error     Outcome or CliError
//! ```
//!
//! - [`account`] - register, login, accounts
//! - [`ledger`] - deposit, withdraw, transfer, lock, unlock, block
//! - [`history`] - balance, history, locks, users, audit

pub mod account;
pub mod history;
pub mod ledger;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::error::{CliError, CliResult};
use crate::state::AppState;
use coffer_core::validation::parse_amount;
use coffer_core::{ErrorKind, Money, Outcome};

/// Coffer - accounts, transfers and PIN-locked savings
#[derive(Debug, Parser)]
#[command(name = "coffer", version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "COFFER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// `--user` and `--password` for administrative commands.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct Credentials {
    /// Administrator username
    #[arg(long = "user", env = "COFFER_ADMIN_USER")]
    pub username: String,

    /// Administrator password
    #[arg(long, env = "COFFER_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create a user and their savings account
    Register {
        username: String,
        password: String,
        /// Full name
        #[arg(long = "name")]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Check credentials and list the user's accounts
    Login { username: String, password: String },

    /// List accounts owned by a user
    Accounts { user_id: i64 },

    /// Add funds to an account
    Deposit {
        account_id: i64,
        #[arg(value_parser = parse_amount, allow_negative_numbers = true)]
        amount: Money,
        /// Description stored with the entry
        #[arg(long)]
        note: Option<String>,
    },

    /// Take funds out of an account
    Withdraw {
        account_id: i64,
        #[arg(value_parser = parse_amount, allow_negative_numbers = true)]
        amount: Money,
        #[arg(long)]
        note: Option<String>,
    },

    /// Move funds to another account by account number
    Transfer {
        account_id: i64,
        /// Receiver account number, e.g. AC00000002
        to: String,
        #[arg(value_parser = parse_amount, allow_negative_numbers = true)]
        amount: Money,
        #[arg(long)]
        note: Option<String>,
    },

    /// Hold funds behind a PIN
    Lock {
        account_id: i64,
        #[arg(value_parser = parse_amount, allow_negative_numbers = true)]
        amount: Money,
        pin: String,
        #[arg(long)]
        note: Option<String>,
    },

    /// Release locked funds, all of them unless an amount is given
    Unlock {
        lock_id: i64,
        account_id: i64,
        pin: String,
        #[arg(value_parser = parse_amount, allow_negative_numbers = true)]
        amount: Option<Money>,
    },

    /// Block an account (admin)
    Block {
        account_id: i64,
        #[command(flatten)]
        admin: Credentials,
    },

    /// Unblock an account (admin)
    Unblock {
        account_id: i64,
        #[command(flatten)]
        admin: Credentials,
    },

    /// Show an account balance
    Balance { account_id: i64 },

    /// Show an account's transactions, newest first
    History {
        account_id: i64,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show active locks on an account
    Locks { account_id: i64 },

    /// List every user (admin)
    Users {
        #[command(flatten)]
        admin: Credentials,
    },

    /// Every transaction with its owner, newest first (admin)
    Audit {
        #[arg(long)]
        limit: Option<u32>,
        #[command(flatten)]
        admin: Credentials,
    },
}

/// Runs a command. Returns whether it succeeded.
pub async fn execute(state: &AppState, command: Command, out: &Printer) -> CliResult<bool> {
    match command {
        Command::Register {
            username,
            password,
            full_name,
            email,
        } => {
            account::register(state, &username, &password, full_name.as_deref(), email.as_deref(), out)
                .await
        }
        Command::Login { username, password } => {
            account::login(state, &username, &password, out).await
        }
        Command::Accounts { user_id } => account::accounts(state, user_id, out).await,
        Command::Deposit {
            account_id,
            amount,
            note,
        } => Ok(ledger::deposit(state, account_id, amount, note.as_deref(), out).await),
        Command::Withdraw {
            account_id,
            amount,
            note,
        } => Ok(ledger::withdraw(state, account_id, amount, note.as_deref(), out).await),
        Command::Transfer {
            account_id,
            to,
            amount,
            note,
        } => Ok(ledger::transfer(state, account_id, &to, amount, note.as_deref(), out).await),
        Command::Lock {
            account_id,
            amount,
            pin,
            note,
        } => Ok(ledger::lock(state, account_id, amount, &pin, note.as_deref(), out).await),
        Command::Unlock {
            lock_id,
            account_id,
            pin,
            amount,
        } => Ok(ledger::unlock(state, lock_id, account_id, &pin, amount, out).await),
        Command::Block { account_id, admin } => {
            state.require_admin(&admin.username, &admin.password).await?;
            Ok(ledger::block(state, account_id, true, out).await)
        }
        Command::Unblock { account_id, admin } => {
            state.require_admin(&admin.username, &admin.password).await?;
            Ok(ledger::block(state, account_id, false, out).await)
        }
        Command::Balance { account_id } => history::balance(state, account_id, out).await,
        Command::History { account_id, limit } => {
            history::history(state, account_id, limit, out).await
        }
        Command::Locks { account_id } => history::locks(state, account_id, out).await,
        Command::Users { admin } => {
            state.require_admin(&admin.username, &admin.password).await?;
            history::users(state, out).await
        }
        Command::Audit { limit, admin } => {
            state.require_admin(&admin.username, &admin.password).await?;
            history::audit(state, limit, out).await
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// Renders results as text lines or JSON.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Printer { json }
    }

    /// Prints an outcome and returns its success flag.
    pub fn outcome(&self, outcome: Outcome) -> bool {
        if self.json {
            self.print_json(&outcome);
        } else if outcome.success {
            println!("✓ {}", outcome.message);
        } else {
            println!("✗ {}", outcome.message);
        }
        outcome.success
    }

    /// Prints a value as JSON, or through `text` otherwise.
    pub fn value<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) {
        if self.json {
            self.print_json(value);
        } else {
            text(value);
        }
    }

    /// Prints a command failure.
    pub fn error(&self, err: CliError) {
        let kind = err.kind();
        let message = err.user_message();
        if self.json {
            self.print_json(&Outcome::fail(kind.unwrap_or(ErrorKind::Internal), message));
        } else {
            eprintln!("✗ {}", message);
        }
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(err) => eprintln!("✗ Could not encode output: {}", err),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
