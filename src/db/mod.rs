//! Database module for the forwarder.
//!
//! This module provides the pooled storage handle and migration management.
//! SQLite is the default backend; PostgreSQL is available behind the
//! `postgres` feature.

mod schema;

pub use schema::MIGRATIONS;

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::queue::Backoff;
use crate::{ForwarderError, Result};

/// Connection pool type for the active backend.
#[cfg(feature = "sqlite")]
pub type DbPool = sqlx::SqlitePool;
/// Connection pool type for the active backend.
#[cfg(feature = "postgres")]
pub type DbPool = sqlx::PgPool;

/// Database type for the active backend.
#[cfg(feature = "sqlite")]
pub type DbBackend = sqlx::Sqlite;
/// Database type for the active backend.
#[cfg(feature = "postgres")]
pub type DbBackend = sqlx::Postgres;

#[cfg(feature = "sqlite")]
const CREATE_SCHEMA_VERSION: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
)";
#[cfg(feature = "postgres")]
const CREATE_SCHEMA_VERSION: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version     BIGINT PRIMARY KEY,
    applied_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

/// Database wrapper owning the connection pool.
///
/// Opened once at startup and passed down explicitly; every repository
/// borrows the pool for the duration of a single operation.
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open the configured database and apply pending migrations.
    #[cfg(feature = "sqlite")]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

        let path = std::path::Path::new(&config.path);
        info!("Opening database at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| ForwarderError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open the configured database and apply pending migrations.
    #[cfg(feature = "postgres")]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        use sqlx::postgres::PgPoolOptions;

        info!("Connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect(&config.url)
            .await
            .map_err(|e| ForwarderError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Keep trying to open the database until it is reachable.
    ///
    /// The service has no supervisor restarting it, so startup waits for
    /// the store instead of exiting.
    pub async fn connect_with_retry(config: &DatabaseConfig) -> Self {
        let retry = Duration::from_secs(config.connect_retry_secs.max(1));
        let mut backoff = Backoff::new(retry, retry);

        loop {
            match Self::connect(config).await {
                Ok(db) => {
                    info!("Database ready");
                    return db;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(error = %e, "Database not reachable, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Open an in-memory database for testing.
    ///
    /// A single connection is kept alive for the lifetime of the pool, since
    /// every SQLite in-memory connection is a separate database.
    #[cfg(feature = "sqlite")]
    pub async fn open_in_memory() -> Result<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| ForwarderError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        sqlx::query(CREATE_SCHEMA_VERSION)
            .execute(&self.pool)
            .await?;

        let version: i64 =
            sqlx::query_scalar("SELECT CAST(COALESCE(MAX(version), 0) AS BIGINT) FROM schema_version")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    /// Apply pending migrations, each in its own transaction.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;

        if current_version as usize >= MIGRATIONS.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            MIGRATIONS.len()
        );

        for (i, migration) in MIGRATIONS.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            debug!("Migration v{} applied successfully", version);
        }

        info!(
            "Database migration complete (now at version {})",
            MIGRATIONS.len()
        );
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

/// Whether a sqlx error is a unique-constraint violation.
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.is_unique_violation(),
        _ => false,
    }
}

/// Whether a sqlx error is a foreign-key violation.
pub fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.is_foreign_key_violation(),
        _ => false,
    }
}
