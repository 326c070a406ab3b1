//! Shared embedded store: connection pool, schema, and migrations.
//!
//! All production adapters share one [`Store`], a thin wrapper around an
//! [`r2d2`] pool of SQLite connections opened in write-ahead-log mode. The
//! pool bounds concurrent access to the single underlying file the way the
//! original connection pool did with a hand-rolled mutex and condition
//! variable; here the bound and the wait-with-timeout come from `r2d2`
//! itself.

mod schema;

pub use schema::run_migrations;

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use thiserror::Error;

/// A pooled connection handle borrowed from a [`Store`].
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Errors returned by [`Store`] construction and connection acquisition.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The pool could not open or configure the underlying database file.
    #[error("failed to open store at {path}: {source}")]
    Open {
        /// Path of the database file that failed to open.
        path: String,
        /// Underlying pool error.
        #[source]
        source: r2d2::Error,
    },

    /// No connection became available within the configured timeout.
    #[error("timed out waiting for a store connection")]
    ConnectionExhausted(#[source] r2d2::Error),

    /// Schema creation or migration failed.
    #[error("schema migration failed: {0}")]
    Migration(#[source] rusqlite::Error),
}

/// Bounded pool of connections to the embedded relational store.
///
/// Cloning a [`Store`] clones the underlying `Arc`-backed pool handle; all
/// clones share the same bounded set of connections.
#[derive(Debug, Clone)]
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
}

impl Store {
    /// Opens (creating if necessary) the store file at `path`, configures
    /// write-ahead logging, runs schema migrations, and returns a pool of
    /// `pool_size` connections.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] if the pool cannot be built, or
    /// [`StoreError::Migration`] if schema setup fails on the first
    /// connection.
    pub fn open(path: &Path, pool_size: u32, acquire_timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
        });

        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(acquire_timeout)
            .build(manager)
            .map_err(|source| StoreError::Open {
                path: path.display().to_string(),
                source,
            })?;

        let conn = pool.get().map_err(StoreError::ConnectionExhausted)?;
        run_migrations(&conn).map_err(StoreError::Migration)?;

        Ok(Self { pool })
    }

    /// Opens an in-memory store, intended for tests exercising the SQLite
    /// adapters without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] under the same conditions as [`Self::open`].
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|source| StoreError::Open {
                path: ":memory:".to_owned(),
                source,
            })?;

        let conn = pool.get().map_err(StoreError::ConnectionExhausted)?;
        run_migrations(&conn).map_err(StoreError::Migration)?;

        Ok(Self { pool })
    }

    /// Acquires a pooled connection, blocking up to the pool's configured
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConnectionExhausted`] if no connection becomes
    /// available in time.
    pub fn get(&self) -> Result<PooledConnection, StoreError> {
        self.pool.get().map_err(StoreError::ConnectionExhausted)
    }
}
