//! SQLite pool for the submission store
//!
//! Opens the database file (or a private in-memory database), applies the
//! schema and hands out the `SqlitePool` the repository runs on. Schema
//! versions are tracked in `PRAGMA user_version`; each migration runs once.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, info};

use crate::CacheError;

/// Ordered schema migrations, applied by version
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("migrations/20240301_initial.sql"))];

/// Writers wait this long for the lock before a capture fails
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connections for a file database; the engine rarely has more than a
/// couple of operations in flight
const FILE_CONNECTIONS: u32 = 4;

/// Owns the connection pool of one submission database
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the submission database at `db_path`
    ///
    /// Missing parent directories are created. The database runs in WAL mode
    /// with `synchronous = NORMAL`, which keeps committed captures across a
    /// crash of this process.
    ///
    /// # Errors
    /// `ConnectionFailed` when the file cannot be opened, `MigrationFailed`
    /// when the schema cannot be brought up to date.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(FILE_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("cannot open {}: {e}", db_path.display()))
            })?;

        let version = migrate(&pool).await?;
        info!(path = %db_path.display(), schema_version = version, "Submission store opened");
        Ok(Self { pool })
    }

    /// Opens a private in-memory database
    ///
    /// The pool keeps exactly one connection alive for its whole lifetime;
    /// an in-memory database disappears with its last connection.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("in-memory database: {e}")))?;

        migrate(&pool).await?;
        debug!("In-memory submission store opened");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every connection and checkpoints the WAL
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Applies every migration newer than the stored schema version
///
/// Returns the version the database ends at.
async fn migrate(pool: &SqlitePool) -> Result<i64, CacheError> {
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(|e| CacheError::MigrationFailed(format!("reading schema version: {e}")))?;

    let mut version = current;
    for (target, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| CacheError::MigrationFailed(e.to_string()))?;
        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| CacheError::MigrationFailed(format!("migration {target}: {e}")))?;
        // PRAGMA does not take bind parameters.
        sqlx::raw_sql(&format!("PRAGMA user_version = {target}"))
            .execute(&mut *tx)
            .await
            .map_err(|e| CacheError::MigrationFailed(format!("migration {target}: {e}")))?;
        tx.commit()
            .await
            .map_err(|e| CacheError::MigrationFailed(format!("migration {target}: {e}")))?;
        debug!(version = target, "Applied schema migration");
        version = *target;
    }
    Ok(version)
}
