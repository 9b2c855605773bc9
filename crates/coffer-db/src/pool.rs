//! # Database Pool Management
//!
//! Connection pool creation, configuration and the unit-of-work entry point.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Process startup                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ├── QueryService     reads straight from the pool                │
//! │       └── LedgerEngine     with_transaction(|conn| ...)                │
//! │                            one writer at a time, others wait           │
//! │                            up to busy_timeout                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Readers don't block writers
//! - Writers don't block readers
//! - Better crash recovery

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{DbError, DbResult, LedgerError, LedgerResult};
use crate::migrations;
use crate::repository::user::UserRepository;
use crate::unit_of_work::{BoxFuture, UnitOfWork};
use coffer_core::Role;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/coffer.db")
///     .max_connections(5)
///     .busy_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long a unit of work waits for the write lock.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the write-lock wait.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // Each connection would open its own database
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}

// =============================================================================
// Database
// =============================================================================

/// The ledger store: connection pool plus the unit-of-work primitive.
///
/// Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous
    ///    - Foreign keys enabled
    ///    - busy timeout for queued writers
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!(
                "sqlite://{}?mode=rwc",
                config.database_path.display()
            ))
        }
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        // SQLite has them disabled by default for backwards compatibility
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout)
        .create_if_missing(true);

        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout);

        // An in-memory database lives and dies with its only connection.
        pool_options = if config.is_in_memory() {
            pool_options.idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.idle_timeout(Some(config.idle_timeout))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Idempotent: safe to run on every startup.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns `(total, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Units of Work
    // =========================================================================

    /// Opens a unit of work on a pooled connection.
    ///
    /// Waits up to the busy timeout for other writers to finish.
    pub async fn begin(&self) -> DbResult<UnitOfWork> {
        let conn = self.pool.acquire().await?;
        UnitOfWork::begin(conn).await
    }

    /// Runs `f` inside one unit of work.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
    /// The closure receives the transaction's connection and must capture
    /// owned values only.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let balance = db
    ///     .with_transaction(move |conn| {
    ///         Box::pin(async move {
    ///             let account = AccountRepository::new(conn).get(account_id).await?;
    ///             Ok(account.map(|a| a.balance))
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn with_transaction<T, F>(&self, f: F) -> LedgerResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, LedgerResult<T>>,
    {
        let mut uow = self.begin().await?;

        match f(uow.conn()).await {
            Ok(value) => {
                uow.commit().await?;
                Ok(value)
            }
            Err(err) => {
                match &err {
                    LedgerError::StorageFailure(_) => {
                        error!(error = %err.chain(), "Storage failure, rolling back unit of work")
                    }
                    LedgerError::Domain(domain) => {
                        debug!(kind = ?domain.kind(), "Rule violation, rolling back unit of work")
                    }
                }

                if let Err(rollback_err) = uow.rollback().await {
                    error!(error = %rollback_err, "Rollback failed; connection discarded");
                }
                Err(err)
            }
        }
    }

    // =========================================================================
    // Bootstrap
    // =========================================================================

    /// Creates the bootstrap administrator unless a user with that name
    /// already exists.
    ///
    /// Takes an already-hashed password. Returns `true` when a row was
    /// inserted. Safe to call on every startup and from concurrent
    /// processes: the existence check and insert share one unit of work.
    pub async fn bootstrap_admin(
        &self,
        username: &str,
        password_hash: String,
        full_name: &str,
    ) -> LedgerResult<bool> {
        let username = username.to_string();
        let full_name = full_name.to_string();

        let created = self
            .with_transaction(move |conn| {
                Box::pin(async move {
                    let mut users = UserRepository::new(conn);
                    if users.find_by_username(&username).await?.is_some() {
                        return Ok(false);
                    }

                    users
                        .insert(
                            &username,
                            &password_hash,
                            Role::Admin,
                            Some(&full_name),
                            None,
                            Utc::now(),
                        )
                        .await?;
                    Ok::<_, LedgerError>(true)
                })
            })
            .await?;

        if created {
            info!("Bootstrap administrator created");
        } else {
            debug!("Bootstrap administrator already present");
        }
        Ok(created)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Closes the database connection pool.
    ///
    /// After calling close, every operation fails with a storage failure.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_core::CoreError;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = db.migration_status().await.unwrap();
        assert_eq!(total, applied);
        assert!(total >= 1);
    }

    #[tokio::test]
    async fn test_schema_check_constraints() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let bad_role = sqlx::query(
            "INSERT INTO users (username, password, role, created_at) VALUES ('x', 'h', 'root', '2024-01-01')",
        )
        .execute(db.pool())
        .await;
        assert!(bad_role.is_err());

        let bad_type = sqlx::query(
            "INSERT INTO transactions (account_id, type, amount, created_at) VALUES (1, 'gift', '1.00', '2024-01-01')",
        )
        .execute(db.pool())
        .await;
        assert!(bad_type.is_err());
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_millis(250));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_with_transaction_rolls_back_on_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let result: LedgerResult<()> = db
            .with_transaction(|conn| {
                Box::pin(async move {
                    UserRepository::new(conn)
                        .insert("ghost", "hash", Role::User, None, None, Utc::now())
                        .await?;
                    Err::<(), _>(LedgerError::from(CoreError::InvalidAmount))
                })
            })
            .await;
        assert!(result.is_err());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_with_transaction_commits_on_ok() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let id = db
            .with_transaction(|conn| {
                Box::pin(async move {
                    let user = UserRepository::new(conn)
                        .insert("kept", "hash", Role::User, None, None, Utc::now())
                        .await?;
                    Ok::<_, LedgerError>(user.id)
                })
            })
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db
            .bootstrap_admin("admin", "hash".to_string(), "System Administrator")
            .await
            .unwrap());
        assert!(!db
            .bootstrap_admin("admin", "hash".to_string(), "System Administrator")
            .await
            .unwrap());

        let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(admins, 1);
    }
}
