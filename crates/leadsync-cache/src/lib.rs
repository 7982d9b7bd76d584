//! LeadSync Cache - Local durable submission store
//!
//! SQLite-based storage for lead-sheet submissions that have not reached the
//! server yet (`pending`) and those the server has confirmed (`synced`).
//! Everything survives restarts; nothing is removed without an explicit
//! delete.
//!
//! [`SqliteSubmissionStore`] implements the `ISubmissionStore` port of
//! `leadsync-core`; [`DatabasePool`] opens the file and keeps its schema
//! current. Failures are reported as [`CacheError`] and converted to the
//! port's `StoreError` at the trait boundary.
//!
//! ```no_run
//! use std::path::Path;
//! use leadsync_cache::{DatabasePool, SqliteSubmissionStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let db = DatabasePool::new(Path::new("/var/lib/leadsync/submissions.db")).await?;
//! let store = SqliteSubmissionStore::new(db.pool().clone());
//! # let _ = store;
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteSubmissionStore;

use leadsync_core::ports::StoreError;

/// Failures of the SQLite submission store
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("database unavailable: {0}")]
    ConnectionFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("schema migration failed: {0}")]
    MigrationFailed(String),

    /// A payload could not be encoded for storage
    #[error("payload encoding failed: {0}")]
    SerializationError(String),

    /// A stored row could not be reconstructed
    #[error("stored record {client_id} is unreadable: {reason}")]
    InvalidRow { client_id: String, reason: String },

    /// The write would break a store invariant
    #[error("write rejected: {0}")]
    Rejected(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<CacheError> for StoreError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::InvalidRow { client_id, reason } => {
                StoreError::Corrupt { client_id, reason }
            }
            CacheError::Rejected(msg) => StoreError::Rejected(msg),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}
