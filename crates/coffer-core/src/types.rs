//! # Domain Types
//!
//! Core domain types used throughout Coffer.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │     Account     │   │   Transaction   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │ 1:N  id             │ 1:N  id             │       │
//! │  │  username (uniq)│──►│  account_number │──►│  kind           │       │
//! │  │  role           │   │  balance (Money)│   │  amount (Money) │       │
//! │  │  full_name      │   │  is_blocked     │   │  reference      │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ 1:N                                   │
//! │                        ┌────────▼────────┐   ┌─────────────────┐       │
//! │                        │   LockedFund    │   │     Receipt     │       │
//! │                        │  ─────────────  │   │  ─────────────  │       │
//! │                        │  amount (Money) │   │  balance_after  │       │
//! │                        │  is_unlocked    │   │  message()      │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Rows use integer ids assigned by the store. Accounts additionally carry a
//! human-readable `account_number` (`AC00000002`) used to address transfers.
//!
//! Secrets never appear here: `User` has no password field and `LockedFund`
//! has no PIN hash. Those columns stay inside the storage crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, ErrorKind};
use crate::money::Money;

// =============================================================================
// User
// =============================================================================

/// Access level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// A registered identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: i64,

    /// Unique login handle.
    pub username: String,

    pub role: Role,
    pub full_name: Option<String>,
    pub email: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// Account
// =============================================================================

/// A balance-carrying account owned by one user.
///
/// `balance` is never negative; it only changes inside a unit of work run
/// by the ledger engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,

    /// Unique human-readable number, the transfer address.
    pub account_number: String,

    /// Available balance (locked funds excluded).
    pub balance: Money,

    /// Free-form type tag (`savings`).
    pub account_type: String,

    pub is_blocked: bool,
}

// =============================================================================
// Transaction
// =============================================================================

/// Kind of ledger entry.
///
/// Transfers write two entries: `TransferOut` on the sender and
/// `TransferIn` on the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TransactionType {
    Deposit,
    Withdraw,
    TransferIn,
    TransferOut,
    Lock,
    Unlock,
}

impl TransactionType {
    /// Stored/serialized tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::TransferIn => "transfer_in",
            TransactionType::TransferOut => "transfer_out",
            TransactionType::Lock => "lock",
            TransactionType::Unlock => "unlock",
        }
    }

    /// Whether the entry adds to the owning account's balance.
    pub const fn is_credit(&self) -> bool {
        matches!(
            self,
            TransactionType::Deposit | TransactionType::TransferIn | TransactionType::Unlock
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a ledger entry.
///
/// Entries are only written on commit, so every persisted row is
/// `Completed`. The column exists so that history exports carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TransactionStatus {
    #[default]
    Completed,
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    /// Always positive; direction comes from `kind`.
    pub amount: Money,

    pub description: Option<String>,

    /// Counterparty account number (`transfer_out`) or linked leg tag
    /// (`transfer_in`, `sender_txn_{id}`).
    pub reference: Option<String>,

    pub status: TransactionStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A ledger entry joined with its owning account and user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionWithOwner {
    #[serde(flatten)]
    pub transaction: Transaction,

    pub account_number: String,
    pub username: String,
    pub full_name: Option<String>,
}

// =============================================================================
// Locked Funds
// =============================================================================

/// A PIN-protected hold on part of an account's balance.
///
/// `amount` is what remains locked. It shrinks on partial unlocks; when it
/// reaches zero `is_unlocked` is set and the lock is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LockedFund {
    pub id: i64,
    pub account_id: i64,
    pub amount: Money,
    pub description: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    pub is_unlocked: bool,
}

impl LockedFund {
    pub fn is_active(&self) -> bool {
        !self.is_unlocked
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// Result of a successful engine mutation.
///
/// ## Field Usage by Operation
/// ```text
/// ┌──────────────┬─────────────────────┬───────────┬──────────────────┐
/// │ kind         │ linked_transaction  │ lock_id   │ remaining_locked │
/// ├──────────────┼─────────────────────┼───────────┼──────────────────┤
/// │ deposit      │ -                   │ -         │ -                │
/// │ withdraw     │ -                   │ -         │ -                │
/// │ transfer_out │ receiver's leg      │ -         │ -                │
/// │ lock         │ -                   │ new lock  │ locked amount    │
/// │ unlock       │ -                   │ lock      │ after unlock     │
/// └──────────────┴─────────────────────┴───────────┴──────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receipt {
    /// The acting account's ledger entry.
    pub transaction_id: i64,
    pub account_id: i64,
    pub kind: TransactionType,
    pub amount: Money,

    /// Acting account's balance after commit.
    pub balance_after: Money,

    pub linked_transaction_id: Option<i64>,
    pub counterparty: Option<String>,
    pub lock_id: Option<i64>,
    pub remaining_locked: Option<Money>,
}

impl Receipt {
    /// Human-readable success text.
    pub fn message(&self) -> String {
        match self.kind {
            TransactionType::Deposit => format!("Successfully deposited {}", self.amount),
            TransactionType::Withdraw => format!("Successfully withdrawn {}", self.amount),
            TransactionType::TransferOut => match &self.counterparty {
                Some(number) => format!("Successfully transferred {} to {}", self.amount, number),
                None => format!("Successfully transferred {}", self.amount),
            },
            TransactionType::TransferIn => format!("Received {}", self.amount),
            TransactionType::Lock => format!("Successfully locked {}", self.amount),
            TransactionType::Unlock => format!("Successfully unlocked {}", self.amount),
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// The `(success, message)` pair a presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Outcome {
    pub success: bool,
    pub message: String,

    /// Set on failures only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Outcome {
            success: true,
            message: message.into(),
            kind: None,
        }
    }

    pub fn fail(kind: ErrorKind, message: impl Into<String>) -> Self {
        Outcome {
            success: false,
            message: message.into(),
            kind: Some(kind),
        }
    }
}

impl From<&Receipt> for Outcome {
    fn from(receipt: &Receipt) -> Self {
        Outcome::ok(receipt.message())
    }
}

impl From<&CoreError> for Outcome {
    fn from(err: &CoreError) -> Self {
        Outcome::fail(err.kind(), err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
