//! # Validation Module
//!
//! Input validation utilities for Coffer.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation shell                                           │
//! │  ├── Reads raw text from the user                                      │
//! │  └── Calls parse_amount / sanitize_description (THIS MODULE)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: LedgerEngine (before any unit of work opens)                 │
//! │  ├── OperationLimits::check (positive + ceiling)                       │
//! │  └── validate_pin (strength)                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (role, transaction type)                        │
//! │  ├── UNIQUE constraints (username, account_number)                     │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use coffer_core::validation::{parse_amount, sanitize_description};
//!
//! let amount = parse_amount("250.75").unwrap();
//! assert_eq!(amount.cents(), 25_075);
//!
//! assert_eq!(sanitize_description(Some("rent; 'march'")), Some("rent march".to_string()));
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::{ACCOUNT_NUMBER_PREFIX, MAX_DESCRIPTION_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Characters removed from free-text descriptions.
const STRIPPED_CHARS: [char; 4] = [';', '"', '\'', '\\'];

// =============================================================================
// Amounts
// =============================================================================

/// Parses user-entered amount text into Money.
///
/// ## Rules
/// - Must be a decimal number with at most two decimal places
/// - Must be strictly positive
///
/// Every failure maps to `InvalidAmount`; ceilings are checked later
/// against the operation being attempted.
///
/// ## Example
/// ```rust
/// use coffer_core::validation::parse_amount;
///
/// assert!(parse_amount("500.00").is_ok());
/// assert!(parse_amount("0").is_err());
/// assert!(parse_amount("-5").is_err());
/// assert!(parse_amount("five").is_err());
/// ```
pub fn parse_amount(text: &str) -> CoreResult<Money> {
    let amount: Money = text.parse().map_err(|_| CoreError::InvalidAmount)?;

    if !amount.is_positive() {
        return Err(CoreError::InvalidAmount);
    }

    Ok(amount)
}

// =============================================================================
// Free Text
// =============================================================================

/// Normalizes a free-text description for storage.
///
/// ## Rules
/// - Leading/trailing whitespace trimmed
/// - `;`, `"`, `'` and `\` removed
/// - Truncated to 100 characters
/// - Empty result becomes `None`
///
/// Every statement is parameter-bound; this is length and display hygiene.
pub fn sanitize_description(text: Option<&str>) -> Option<String> {
    let cleaned: String = text?
        .trim()
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .take(MAX_DESCRIPTION_LEN)
        .collect();

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Validates lock PIN strength.
///
/// Fails with `WeakCredential` when the PIN is shorter than `min_len`
/// characters (an empty PIN included).
pub fn validate_pin(pin: &str, min_len: usize) -> CoreResult<()> {
    if pin.chars().count() < min_len {
        return Err(CoreError::WeakCredential { min_len });
    }
    Ok(())
}

/// Validates a username for registration.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, `.`, `-` and `_` only
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a login password for registration.
pub fn validate_password(password: &str, min_len: usize) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < min_len {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: min_len,
        });
    }

    Ok(())
}

// =============================================================================
// Identifiers
// =============================================================================

/// Validates a numeric row identifier.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an account number's shape.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - Uppercase letters and digits only
///
/// ## Example
/// ```rust
/// use coffer_core::validation::validate_account_number;
///
/// assert!(validate_account_number("AC00000002").is_ok());
/// assert!(validate_account_number("ac-2").is_err());
/// ```
pub fn validate_account_number(number: &str) -> ValidationResult<()> {
    if number.is_empty() {
        return Err(ValidationError::Required {
            field: "account number".to_string(),
        });
    }

    if number.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "account number".to_string(),
            max: 20,
        });
    }

    if !number
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(ValidationError::InvalidFormat {
            field: "account number".to_string(),
            reason: "must contain only uppercase letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Derives the account number opened for a newly registered user.
///
/// ## Example
/// ```rust
/// use coffer_core::validation::account_number_for;
///
/// assert_eq!(account_number_for(2), "AC00000002");
/// ```
pub fn account_number_for(user_id: i64) -> String {
    format!("{}{:08}", ACCOUNT_NUMBER_PREFIX, user_id)
}

// =============================================================================
// Unit Tests
// =============================================================================
