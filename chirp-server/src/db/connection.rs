use anyhow::{Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::TransactionBehavior;
use std::path::Path;
use std::time::Duration;

use super::schema::{DEMO_DATA, SCHEMA};
use super::store::SqliteStore;

/// SQLite in-memory database identifier
const MEMORY_DB_PATH: &str = ":memory:";

/// How long a writer waits for another writer's transaction to finish
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Database wrapper with connection pooling support
#[derive(Clone)]
pub struct Database {
    pub pool: DbPool,
}

impl Database {
    /// Create a new database connection pool
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();

        if path_str.trim().eq_ignore_ascii_case(MEMORY_DB_PATH) {
            // Every in-memory connection is its own database, so keep exactly one
            let pool = Pool::builder()
                .max_size(1)
                .build(Self::configure(SqliteConnectionManager::memory()))
                .context("Failed to create in-memory database pool")?;
            return Ok(Self { pool });
        }

        let pool = Pool::new(Self::configure(SqliteConnectionManager::file(path)))
            .context("Failed to create database connection pool")?;
        Ok(Self { pool })
    }

    fn configure(manager: SqliteConnectionManager) -> SqliteConnectionManager {
        manager.with_init(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        })
    }

    /// Create an in-memory database pool (useful for testing)
    pub fn in_memory() -> Result<Self> {
        Self::new(MEMORY_DB_PATH)
    }

    /// Initialize the database schema. Safe to run on every startup.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        Ok(())
    }

    /// Seed the database with demo accounts
    pub fn seed_demo_data(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(DEMO_DATA)
            .context("Failed to seed demo data")?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn connection(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .context("Failed to get database connection from pool")
    }

    /// Run `f` against a store inside an immediate transaction.
    ///
    /// The write lock is taken up front, so the reads `f` performs cannot go
    /// stale before its writes land. The transaction commits only if `f`
    /// returns `Ok`; any error rolls every write back.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&SqliteStore<'_>) -> Result<T, E>,
        E: From<anyhow::Error>,
    {
        let mut conn = self.connection()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin transaction")?;

        let value = f(&SqliteStore::new(&tx))?;

        tx.commit().context("Failed to commit transaction")?;
        Ok(value)
    }
}
