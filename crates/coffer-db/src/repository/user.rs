//! # User Repository
//!
//! Users and their stored credential hashes.
//!
//! The `password` column holds an argon2 PHC string. It is only read by
//! [`UserRepository::credentials`]; every other query returns [`User`],
//! which has no credential field.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use coffer_core::{Role, User};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    role: Role,
    full_name: Option<String>,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            role: row.role,
            full_name: row.full_name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password: String,
}

const USER_COLUMNS: &str = "id, username, role, full_name, email, created_at";

/// Repository for user database operations.
pub struct UserRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> UserRepository<'c> {
    /// Creates a new UserRepository on a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        UserRepository { conn }
    }

    /// Inserts a user.
    ///
    /// A taken username fails with `DbError::UniqueViolation`.
    pub async fn insert(
        &mut self,
        username: &str,
        password_hash: &str,
        role: Role,
        full_name: Option<&str>,
        email: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> DbResult<User> {
        debug!(username = %username, role = ?role, "Inserting user");

        let result = sqlx::query(
            "INSERT INTO users (username, password, role, full_name, email, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .bind(full_name)
        .bind(email)
        .bind(created_at)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("username", username),
            other => other,
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            role,
            full_name: full_name.map(str::to_string),
            email: email.map(str::to_string),
            created_at,
        })
    }

    /// Gets a user by ID.
    pub async fn get(&mut self, id: i64) -> DbResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&mut *self.conn)
                .await?;

        Ok(row.map(User::from))
    }

    /// Gets a user by username.
    pub async fn find_by_username(&mut self, username: &str) -> DbResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(row.map(User::from))
    }

    /// Gets a user together with the stored password hash.
    pub async fn credentials(&mut self, username: &str) -> DbResult<Option<(User, String)>> {
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {}, password FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(row.map(|r| (User::from(r.user), r.password)))
    }

    /// Lists every user, oldest first.
    pub async fn list_all(&mut self) -> DbResult<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))
                .fetch_all(&mut *self.conn)
                .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}
