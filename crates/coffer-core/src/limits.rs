//! # Operation Limits
//!
//! Independent per-operation ceilings on a single movement of funds.
//!
//! ```text
//! ┌──────────────┬──────────────┐
//! │ Operation    │ Default max  │
//! ├──────────────┼──────────────┤
//! │ Deposit      │ 1,000,000.00 │
//! │ Withdraw     │   500,000.00 │
//! │ Lock         │ 1,000,000.00 │
//! │ Transfer     │   500,000.00 │
//! └──────────────┴──────────────┘
//! ```
//!
//! The values are currency-agnostic and come from configuration; the engine
//! receives an `OperationLimits` value at construction.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// A limited, amount-carrying engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Deposit,
    Withdraw,
    Lock,
    Transfer,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Deposit => write!(f, "Deposit"),
            Operation::Withdraw => write!(f, "Withdrawal"),
            Operation::Lock => write!(f, "Lock amount"),
            Operation::Transfer => write!(f, "Transfer"),
        }
    }
}

/// Ceilings for each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationLimits {
    pub max_deposit: Money,
    pub max_withdraw: Money,
    pub max_lock: Money,
    pub max_transfer: Money,
}

impl Default for OperationLimits {
    fn default() -> Self {
        OperationLimits {
            max_deposit: Money::from_major(1_000_000),
            max_withdraw: Money::from_major(500_000),
            max_lock: Money::from_major(1_000_000),
            max_transfer: Money::from_major(500_000),
        }
    }
}

impl OperationLimits {
    /// Returns the ceiling for an operation.
    pub fn limit_for(&self, operation: Operation) -> Money {
        match operation {
            Operation::Deposit => self.max_deposit,
            Operation::Withdraw => self.max_withdraw,
            Operation::Lock => self.max_lock,
            Operation::Transfer => self.max_transfer,
        }
    }

    /// Validates an amount for an operation.
    ///
    /// ## Rules
    /// - Must be positive (> 0), else `InvalidAmount`
    /// - Must not exceed the operation's ceiling, else `LimitExceeded`
    ///
    /// The ceiling itself is allowed.
    pub fn check(&self, operation: Operation, amount: Money) -> CoreResult<()> {
        if !amount.is_positive() {
            return Err(CoreError::InvalidAmount);
        }

        let limit = self.limit_for(operation);
        if amount > limit {
            return Err(CoreError::LimitExceeded { operation, limit });
        }

        Ok(())
    }
}
