//! SQLite implementation of ISubmissionStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! submission store port defined in leadsync-core. It handles domain type
//! serialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type    | SQL Type | Strategy                                        |
//! |----------------|----------|-------------------------------------------------|
//! | ClientId       | TEXT     | String via `.as_str()`                          |
//! | ServerId       | INTEGER  | `i64` via `.as_i64()`                           |
//! | OwnerId        | TEXT     | String via `.as_str()`                          |
//! | LeadPayload    | TEXT     | serde_json serialization                        |
//! | DateTime<Utc>  | TEXT     | RFC 3339 with fixed nanosecond precision, so text order is time order |
//! | SyncState      | (table)  | `pending_submissions` or `synced_submissions`   |

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};

use leadsync_core::domain::{ClientId, OwnerId, Submission, SubmissionKey, SyncState};
use leadsync_core::ports::{ISubmissionStore, StoreCounts, StoreError, SubmissionFilter};

use crate::CacheError;

/// SQLite-based implementation of the submission store port
///
/// All operations are performed through a connection pool. Operations that
/// touch both tables run in a single transaction.
#[derive(Clone)]
pub struct SqliteSubmissionStore {
    pool: SqlitePool,
}

impl SqliteSubmissionStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Table backing a collection
fn table_for(collection: SyncState) -> &'static str {
    match collection {
        SyncState::Pending => "pending_submissions",
        SyncState::Synced => "synced_submissions",
    }
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Column values of one submission row
struct RowValues {
    client_id: String,
    server_id: Option<i64>,
    owner_id: String,
    payload: String,
    captured_at: String,
    updated_at: String,
    synced_at: Option<String>,
}

impl RowValues {
    fn from_submission(submission: &Submission) -> Result<Self, CacheError> {
        let payload = serde_json::to_string(submission.payload()).map_err(|e| {
            CacheError::SerializationError(format!(
                "Failed to serialize payload of {}: {}",
                submission.client_id(),
                e
            ))
        })?;

        Ok(Self {
            client_id: submission.client_id().as_str().to_string(),
            server_id: submission.server_id().map(|id| id.as_i64()),
            owner_id: submission.owner_id().as_str().to_string(),
            payload,
            captured_at: format_datetime(submission.captured_at()),
            updated_at: format_datetime(submission.updated_at()),
            synced_at: submission.synced_at().map(format_datetime),
        })
    }
}

/// Reconstruct a Submission from a database row
///
/// Goes through serde because the entity's fields are private and only
/// reachable through constructors or deserialization.
fn submission_from_row(row: &SqliteRow, collection: SyncState) -> Result<Submission, CacheError> {
    let client_id: String = row.get("client_id");
    let server_id: Option<i64> = row.get("server_id");
    let owner_id: String = row.get("owner_id");
    let payload_str: String = row.get("payload");
    let captured_at: String = row.get("captured_at");
    let updated_at: String = row.get("updated_at");
    let synced_at: Option<String> = row.get("synced_at");

    let invalid = |reason: String| CacheError::InvalidRow {
        client_id: client_id.clone(),
        reason,
    };

    let payload: serde_json::Value = serde_json::from_str(&payload_str)
        .map_err(|e| invalid(format!("Invalid payload JSON: {}", e)))?;

    let json = serde_json::json!({
        "client_id": client_id,
        "server_id": server_id,
        "owner_id": owner_id,
        "payload": payload,
        "captured_at": captured_at,
        "updated_at": updated_at,
        "sync_state": collection,
        "synced_at": synced_at,
    });

    serde_json::from_value(json)
        .map_err(|e| invalid(format!("Failed to reconstruct Submission from row: {}", e)))
}

/// Insert or replace a row in the given table
async fn write_row(
    conn: &mut SqliteConnection,
    table: &str,
    values: &RowValues,
) -> Result<(), CacheError> {
    let sql = format!(
        "INSERT OR REPLACE INTO {table} \
         (client_id, server_id, owner_id, payload, captured_at, updated_at, synced_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)"
    );
    sqlx::query(&sql)
        .bind(&values.client_id)
        .bind(values.server_id)
        .bind(&values.owner_id)
        .bind(&values.payload)
        .bind(&values.captured_at)
        .bind(&values.updated_at)
        .bind(&values.synced_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Write into `synced`, evicting any other row that holds the same server ID
async fn write_synced_row(conn: &mut SqliteConnection, values: &RowValues) -> Result<(), CacheError> {
    let server_id = values.server_id.ok_or_else(|| {
        CacheError::Rejected(format!(
            "submission {} has no server ID and cannot be stored as synced",
            values.client_id
        ))
    })?;

    let evicted = sqlx::query(
        "DELETE FROM synced_submissions WHERE server_id = ? AND client_id <> ?",
    )
    .bind(server_id)
    .bind(&values.client_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if evicted > 0 {
        tracing::warn!(
            client_id = %values.client_id,
            server_id,
            evicted,
            "Replaced synced copy held under another client ID"
        );
    }

    write_row(conn, table_for(SyncState::Synced), values).await
}

// ============================================================================
// Store operations
// ============================================================================

impl SqliteSubmissionStore {
    pub async fn save_submission(
        &self,
        collection: SyncState,
        submission: &Submission,
    ) -> Result<(), CacheError> {
        let values = RowValues::from_submission(submission)?;
        let mut tx = self.pool.begin().await?;

        match collection {
            SyncState::Pending => write_row(&mut *tx, table_for(collection), &values).await?,
            SyncState::Synced => write_synced_row(&mut *tx, &values).await?,
        }

        tx.commit().await?;
        tracing::trace!(client_id = %values.client_id, collection = %collection, "Saved submission");
        Ok(())
    }

    pub async fn get_submission(
        &self,
        collection: SyncState,
        key: &SubmissionKey,
    ) -> Result<Option<Submission>, CacheError> {
        let table = table_for(collection);
        let row = match key {
            SubmissionKey::Local(client_id) => {
                let sql = format!("SELECT * FROM {table} WHERE client_id = ?");
                sqlx::query(&sql)
                    .bind(client_id.as_str())
                    .fetch_optional(&self.pool)
                    .await?
            }
            SubmissionKey::Remote(server_id) => {
                let sql = format!(
                    "SELECT * FROM {table} WHERE server_id = ? ORDER BY updated_at DESC LIMIT 1"
                );
                sqlx::query(&sql)
                    .bind(server_id.as_i64())
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        match row {
            Some(ref r) => Ok(Some(submission_from_row(r, collection)?)),
            None => Ok(None),
        }
    }

    pub async fn list_submissions(
        &self,
        collection: SyncState,
        filter: &SubmissionFilter,
    ) -> Result<Vec<Submission>, CacheError> {
        let mut sql = format!("SELECT * FROM {} WHERE 1=1", table_for(collection));
        let mut binds: Vec<String> = Vec::new();

        if let Some(ref owner_id) = filter.owner_id {
            sql.push_str(" AND owner_id = ?");
            binds.push(owner_id.as_str().to_string());
        }

        if let Some(since) = filter.updated_since {
            sql.push_str(" AND updated_at > ?");
            binds.push(format_datetime(since));
        }

        match filter.has_server_id {
            Some(true) => sql.push_str(" AND server_id IS NOT NULL"),
            Some(false) => sql.push_str(" AND server_id IS NULL"),
            None => {}
        }

        sql.push_str(" ORDER BY captured_at ASC, client_id ASC");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut submissions = Vec::with_capacity(rows.len());
        for row in &rows {
            submissions.push(submission_from_row(row, collection)?);
        }
        Ok(submissions)
    }

    pub async fn delete_submission(
        &self,
        collection: SyncState,
        key: &SubmissionKey,
    ) -> Result<bool, CacheError> {
        let table = table_for(collection);
        let result = match key {
            SubmissionKey::Local(client_id) => {
                let sql = format!("DELETE FROM {table} WHERE client_id = ?");
                sqlx::query(&sql)
                    .bind(client_id.as_str())
                    .execute(&self.pool)
                    .await?
            }
            SubmissionKey::Remote(server_id) => {
                let sql = format!("DELETE FROM {table} WHERE server_id = ?");
                sqlx::query(&sql)
                    .bind(server_id.as_i64())
                    .execute(&self.pool)
                    .await?
            }
        };

        let removed = result.rows_affected() > 0;
        tracing::trace!(key = %key, collection = %collection, removed, "Deleted submission");
        Ok(removed)
    }

    pub async fn promote_submission(&self, submission: &Submission) -> Result<(), CacheError> {
        let values = RowValues::from_submission(submission)?;
        let mut tx = self.pool.begin().await?;

        write_synced_row(&mut *tx, &values).await?;
        sqlx::query("DELETE FROM pending_submissions WHERE client_id = ?")
            .bind(&values.client_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(
            client_id = %values.client_id,
            server_id = values.server_id,
            "Promoted submission to synced"
        );
        Ok(())
    }

    pub async fn purge_submission(&self, client_id: &ClientId) -> Result<bool, CacheError> {
        let mut tx = self.pool.begin().await?;

        let pending = sqlx::query("DELETE FROM pending_submissions WHERE client_id = ?")
            .bind(client_id.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let synced = sqlx::query("DELETE FROM synced_submissions WHERE client_id = ?")
            .bind(client_id.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        tracing::debug!(%client_id, pending, synced, "Purged submission");
        Ok(pending + synced > 0)
    }

    pub async fn count_submissions(&self, owner_id: &OwnerId) -> Result<StoreCounts, CacheError> {
        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pending_submissions WHERE owner_id = ?")
                .bind(owner_id.as_str())
                .fetch_one(&self.pool)
                .await?;
        let synced: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM synced_submissions WHERE owner_id = ?")
                .bind(owner_id.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(StoreCounts {
            pending: pending as u64,
            synced: synced as u64,
        })
    }
}

// ============================================================================
// ISubmissionStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ISubmissionStore for SqliteSubmissionStore {
    async fn save(&self, collection: SyncState, submission: &Submission) -> Result<(), StoreError> {
        Ok(self.save_submission(collection, submission).await?)
    }

    async fn get(
        &self,
        collection: SyncState,
        key: &SubmissionKey,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(self.get_submission(collection, key).await?)
    }

    async fn list(
        &self,
        collection: SyncState,
        filter: &SubmissionFilter,
    ) -> Result<Vec<Submission>, StoreError> {
        Ok(self.list_submissions(collection, filter).await?)
    }

    async fn delete(&self, collection: SyncState, key: &SubmissionKey) -> Result<bool, StoreError> {
        Ok(self.delete_submission(collection, key).await?)
    }

    async fn promote(&self, submission: &Submission) -> Result<(), StoreError> {
        Ok(self.promote_submission(submission).await?)
    }

    async fn purge(&self, client_id: &ClientId) -> Result<bool, StoreError> {
        Ok(self.purge_submission(client_id).await?)
    }

    async fn count(&self, owner_id: &OwnerId) -> Result<StoreCounts, StoreError> {
        Ok(self.count_submissions(owner_id).await?)
    }
}
