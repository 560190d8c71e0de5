//! # Database Pool Management
//!
//! Connection pool creation, configuration and transaction lifecycle.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Service startup                                                       │
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
//! │       │ One connection checked out per operation                       │
//! │       ▼                                                                 │
//! │  Request 1 ──► products().create(..)  ──► Conn1 (transaction)          │
//! │  Request 2 ──► products().list(..)    ──► Conn2                        │
//! │  Request 3 ──► categories().list(..)  ──► Conn3                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Lifecycle
//! Writes that touch more than one row go through [`Database::begin`] and
//! [`finish`]: commit on `Ok`, roll back on `Err`. If the future is dropped
//! mid-flight the `sqlx::Transaction` is dropped with it and SQLite rolls
//! back, so no path leaves a transaction open or a connection checked out.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::category::CategoryRepository;
use crate::repository::product::ProductRepository;
use crate::repository::user::UserRepository;
use crate::resolver::MissingCategoryPolicy;

/// A transaction checked out of the pool.
pub type Tx = Transaction<'static, Sqlite>;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/catalog.db")
///     .max_connections(5)
///     .missing_categories(MissingCategoryPolicy::Skip);
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

    /// How long to wait for a free connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// What product updates do with category names that do not exist yet.
    /// Default: create them
    pub missing_categories: MissingCategoryPolicy,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            missing_categories: MissingCategoryPolicy::default(),
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

    /// Sets the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets the missing-category policy for product updates.
    pub fn missing_categories(mut self, policy: MissingCategoryPolicy) -> Self {
        self.missing_categories = policy;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// Every call yields a separate, empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
            missing_categories: MissingCategoryPolicy::default(),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Store handle: the pool plus repository access.
///
/// Cheap to clone; every clone shares the same pool. Repositories keep no
/// state of their own beyond a pool handle and their settings.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./catalog.db")).await?;
///
/// let product = db
///     .products()
///     .create(&NewProduct::new(owner.id, "Blue Mug"), &["kitchen"])
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    missing_categories: MissingCategoryPolicy,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled (join rows, owner restriction)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path creates file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default; cascade and restrict
            // rules depend on them
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            missing_categories = %config.missing_categories,
            "Database pool created"
        );

        let db = Database {
            pool,
            missing_categories: config.missing_categories,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Idempotent: already-applied migrations are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// For queries not covered by repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a transaction on a freshly checked-out connection.
    ///
    /// Pair with [`finish`] so the outcome decides commit vs rollback.
    pub async fn begin(&self) -> DbResult<Tx> {
        begin(&self.pool).await
    }

    /// Returns the product repository.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone()).missing_categories(self.missing_categories)
    }

    /// Returns the category repository.
    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    /// Returns the user repository.
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
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
// Transactions
// =============================================================================

pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Tx> {
    pool.begin().await.map_err(|e| match e {
        sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
        other => DbError::TransactionFailed(format!("begin: {}", other)),
    })
}

/// Commits `tx` if `result` is `Ok`, rolls it back otherwise.
///
/// The caller's error is always the one returned. A failed rollback is
/// logged; SQLite discards the transaction when the connection drops it.
pub async fn finish<T>(tx: Tx, result: DbResult<T>, operation: &'static str) -> DbResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            debug!(operation, "Transaction committed");
            Ok(value)
        }
        Err(err) => {
            warn!(operation, error = %err, "Rolling back transaction");
            if let Err(rollback_err) = tx.rollback().await {
                error!(operation, error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = Database::new(DbConfig::in_memory()).await.unwrap();

        sqlx::query("CREATE TABLE scratch (x INTEGER)")
            .execute(a.pool())
            .await
            .unwrap();

        assert!(sqlx::query("SELECT x FROM scratch")
            .fetch_all(b.pool())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/catalog.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false)
            .missing_categories(MissingCategoryPolicy::Skip);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
        assert_eq!(config.missing_categories, MissingCategoryPolicy::Skip);
    }

    #[tokio::test]
    async fn test_finish_rolls_back_on_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("CREATE TABLE scratch (x INTEGER)")
            .execute(db.pool())
            .await
            .unwrap();

        let mut tx = db.begin().await.unwrap();
        sqlx::query("INSERT INTO scratch (x) VALUES (1)")
            .execute(&mut *tx)
            .await
            .unwrap();
        let result: DbResult<()> = Err(DbError::QueryFailed("boom".into()));
        let err = finish(tx, result, "test").await.unwrap_err();
        assert!(matches!(err, DbError::QueryFailed(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scratch")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_finish_commits_on_ok() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("CREATE TABLE scratch (x INTEGER)")
            .execute(db.pool())
            .await
            .unwrap();

        let mut tx = db.begin().await.unwrap();
        sqlx::query("INSERT INTO scratch (x) VALUES (1)")
            .execute(&mut *tx)
            .await
            .unwrap();
        finish(tx, Ok(()), "test").await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scratch")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
