//! # Unit of Work
//!
//! An atomic, isolated sequence of reads and writes that commits or rolls
//! back as one.
//!
//! ## Isolation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN IMMEDIATE takes SQLite's write lock up front.                   │
//! │                                                                         │
//! │  withdraw #1 ── BEGIN IMMEDIATE ── read 100 ── write 50 ── COMMIT      │
//! │  withdraw #2 ────── waits (busy_timeout) ───────────────── BEGIN ...   │
//! │                                                       read 50 ...      │
//! │                                                                         │
//! │  Every balance read in a unit of work is therefore the latest          │
//! │  committed value, and no other writer can commit before this one       │
//! │  finishes. Readers outside units of work are never blocked (WAL).      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writers are serialized per database, which subsumes per-row ordering:
//! two opposite-direction transfers cannot deadlock.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};
use std::future::Future;
use std::pin::Pin;
use tracing::warn;

use crate::error::{DbError, DbResult};

/// Boxed future returned by unit-of-work closures.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An open write transaction on a pooled connection.
///
/// Dropping an unfinished unit of work closes its connection instead of
/// returning it to the pool, which discards the open transaction.
pub struct UnitOfWork {
    conn: PoolConnection<Sqlite>,
    finished: bool,
}

impl UnitOfWork {
    /// Starts a write transaction on `conn`.
    pub(crate) async fn begin(mut conn: PoolConnection<Sqlite>) -> DbResult<Self> {
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::TransactionFailed(format!("begin: {}", DbError::from(e))))?;

        Ok(UnitOfWork {
            conn,
            finished: false,
        })
    }

    /// The connection every statement of this unit of work runs on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Makes every write visible.
    pub async fn commit(mut self) -> DbResult<()> {
        sqlx::query("COMMIT")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| DbError::TransactionFailed(format!("commit: {}", DbError::from(e))))?;

        self.finished = true;
        Ok(())
    }

    /// Discards every write.
    pub async fn rollback(mut self) -> DbResult<()> {
        sqlx::query("ROLLBACK")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| DbError::TransactionFailed(format!("rollback: {}", DbError::from(e))))?;

        self.finished = true;
        Ok(())
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Unit of work dropped without commit or rollback; closing its connection");
            self.conn.close_on_drop();
        }
    }
}
