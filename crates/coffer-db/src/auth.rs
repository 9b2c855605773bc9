//! # Authentication
//!
//! Registration, login and the bootstrap administrator.
//!
//! ## Registration
//! ```text
//! register("alice", "secret1", ...)
//!      │
//!      ├── validate username / password      Validation
//!      ├── argon2 hash (blocking pool)
//!      │
//!      ▼
//! with_transaction ─┬── INSERT users          DuplicateIdentity on taken name
//!                   └── INSERT accounts       AC + zero-padded user id
//! ```
//!
//! Passwords are argon2id PHC strings. Neither the raw password nor the
//! hash is ever logged or returned.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::config::BootstrapSection;
use crate::error::{DbError, LedgerError, LedgerResult};
use crate::hashing;
use crate::pool::Database;
use crate::repository::{AccountRepository, UserRepository};
use coffer_core::validation::{account_number_for, validate_password, validate_username};
use coffer_core::{Account, CoreError, PinHasher, Role, User, DEFAULT_ACCOUNT_TYPE};

/// Minimum login password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// User registration and login.
#[derive(Debug, Clone)]
pub struct AuthService {
    db: Database,
    hasher: PinHasher,
}

impl AuthService {
    pub fn new(db: Database, hasher: PinHasher) -> Self {
        AuthService { db, hasher }
    }

    /// Creates a user and their savings account in one unit of work.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> LedgerResult<(User, Account)> {
        let username = username.trim().to_string();
        validate_username(&username)?;
        validate_password(password, MIN_PASSWORD_LEN)?;

        let password_hash = hashing::hash_password(self.hasher.clone(), password.to_string()).await?;
        let full_name = non_blank(full_name);
        let email = non_blank(email);

        let (user, account) = self
            .db
            .with_transaction(move |conn| {
                Box::pin(apply_register(conn, username, password_hash, full_name, email))
            })
            .await?;

        info!(
            user_id = user.id,
            account_number = %account.account_number,
            "User registered"
        );
        Ok((user, account))
    }

    /// Checks a username and password.
    ///
    /// Returns `Ok(None)` for an unknown user or a wrong password. A user
    /// owning a blocked account is refused with `AccountBlocked`.
    pub async fn authenticate(&self, username: &str, password: &str) -> LedgerResult<Option<User>> {
        let mut conn = self.db.pool().acquire().await?;

        let Some((user, stored)) = UserRepository::new(&mut conn)
            .credentials(username.trim())
            .await?
        else {
            warn!(username = %username.trim(), "Login for unknown user");
            return Ok(None);
        };

        if !hashing::verify(self.hasher.clone(), password.to_string(), stored).await? {
            warn!(user_id = user.id, "Login with wrong password");
            return Ok(None);
        }

        let accounts = AccountRepository::new(&mut conn)
            .list_for_user(user.id)
            .await?;
        if let Some(blocked) = accounts.iter().find(|a| a.is_blocked) {
            warn!(user_id = user.id, account_id = blocked.id, "Login refused for blocked account");
            return Err(CoreError::AccountBlocked(blocked.id).into());
        }

        info!(user_id = user.id, role = ?user.role, "User authenticated");
        Ok(Some(user))
    }

    /// Ensures the configured administrator exists.
    ///
    /// Returns `true` when it was created on this call. The password is
    /// only hashed when no user with that name exists yet.
    pub async fn bootstrap_admin(&self, bootstrap: &BootstrapSection) -> LedgerResult<bool> {
        let mut conn = self.db.pool().acquire().await?;
        let existing = UserRepository::new(&mut conn)
            .find_by_username(&bootstrap.admin_username)
            .await?;
        drop(conn);
        if existing.is_some() {
            return Ok(false);
        }

        let hash = hashing::hash_password(self.hasher.clone(), bootstrap.admin_password.clone()).await?;
        self.db
            .bootstrap_admin(&bootstrap.admin_username, hash, &bootstrap.admin_full_name)
            .await
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn apply_register(
    conn: &mut SqliteConnection,
    username: String,
    password_hash: String,
    full_name: Option<String>,
    email: Option<String>,
) -> LedgerResult<(User, Account)> {
    let user = UserRepository::new(conn)
        .insert(
            &username,
            &password_hash,
            Role::User,
            full_name.as_deref(),
            email.as_deref(),
            Utc::now(),
        )
        .await
        .map_err(|e| match e {
            DbError::UniqueViolation { field, value } => {
                LedgerError::from(CoreError::DuplicateIdentity { field, value })
            }
            other => LedgerError::from(other),
        })?;

    let number = account_number_for(user.id);
    let account = AccountRepository::new(conn)
        .insert(user.id, &number, DEFAULT_ACCOUNT_TYPE)
        .await?;

    Ok((user, account))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use coffer_core::{ErrorKind, Money, PinPolicy};

    async fn service() -> AuthService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AuthService::new(db, PinHasher::new(PinPolicy::for_tests()))
    }

    #[tokio::test]
    async fn test_register_creates_account() {
        let auth = service().await;
        let (user, account) = auth
            .register("alice", "secret1", Some("Alice A"), Some("  "))
            .await
            .unwrap();

        assert_eq!(user.role, Role::User);
        assert_eq!(user.full_name.as_deref(), Some("Alice A"));
        assert_eq!(user.email, None);
        assert_eq!(account.user_id, user.id);
        assert_eq!(account.account_number, account_number_for(user.id));
        assert_eq!(account.account_type, "savings");
        assert_eq!(account.balance, Money::zero());
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let auth = service().await;
        auth.register("alice", "secret1", None, None).await.unwrap();

        let err = auth
            .register("alice", "another1", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateIdentity);
        assert_eq!(err.to_string(), "username 'alice' already exists");
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let auth = service().await;
        assert_eq!(
            auth.register("bad name", "secret1", None, None)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            auth.register("carol", "abc", None, None)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::Validation
        );
    }

    #[tokio::test]
    async fn test_authenticate() {
        let auth = service().await;
        let (user, _) = auth.register("dave", "secret1", None, None).await.unwrap();

        let found = auth.authenticate("dave", "secret1").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);

        assert!(auth.authenticate("dave", "wrong-pass").await.unwrap().is_none());
        assert!(auth.authenticate("nobody", "secret1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_authenticate_blocked_user() {
        let auth = service().await;
        let (_, account) = auth.register("erin", "secret1", None, None).await.unwrap();

        let mut conn = auth.db.pool().acquire().await.unwrap();
        AccountRepository::new(&mut conn)
            .set_blocked(account.id, true)
            .await
            .unwrap();
        drop(conn);

        let err = auth.authenticate("erin", "secret1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountBlocked);
    }

    #[tokio::test]
    async fn test_bootstrap_admin_once() {
        let auth = service().await;
        let bootstrap = BootstrapSection::default();

        assert!(auth.bootstrap_admin(&bootstrap).await.unwrap());
        assert!(!auth.bootstrap_admin(&bootstrap).await.unwrap());

        let admin = auth
            .authenticate(&bootstrap.admin_username, &bootstrap.admin_password)
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin());

        // An existing administrator is found before any hashing, so a
        // policy argon2 would reject is never exercised.
        let broken = AuthService::new(
            auth.db.clone(),
            PinHasher::new(PinPolicy {
                memory_kib: 1,
                ..PinPolicy::for_tests()
            }),
        );
        assert!(!broken.bootstrap_admin(&bootstrap).await.unwrap());

        // The administrator has no account, so the first user is id 2.
        let (user, account) = auth.register("alice", "secret1", None, None).await.unwrap();
        assert_eq!(user.id, 2);
        assert_eq!(account.account_number, "AC00000002");
    }
}
