//! Submission store port (driven/secondary port)
//!
//! This module defines the interface for the on-device durable store that
//! holds submissions in two collections, `pending` and `synced`.
//!
//! ## Design Notes
//!
//! - The collection is named with [`SyncState`]; records read back always
//!   carry the state of the collection they came from.
//! - Lookups take a tagged [`SubmissionKey`], never a prefixed string.
//! - Every operation is atomic. `promote` and `purge` span both collections
//!   and must run in a single transaction.
//! - Errors use the typed [`StoreError`] so the engine can report
//!   `StorageUnavailable` without guessing from message text.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{ClientId, OwnerId, Submission, SubmissionKey, SyncState};

// ============================================================================
// StoreError
// ============================================================================

/// Failures reported by a submission store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing storage could not be read or written
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be turned back into a submission
    #[error("Corrupt record {client_id}: {reason}")]
    Corrupt {
        /// Key of the offending row
        client_id: String,
        /// What failed to decode
        reason: String,
    },

    /// The write would break a store invariant
    #[error("Rejected write: {0}")]
    Rejected(String),
}

// ============================================================================
// SubmissionFilter
// ============================================================================

/// Filter criteria for listing submissions
///
/// All fields are optional; `None` means no filtering on that field.
/// Multiple filters are combined with AND logic. UI-facing reads always set
/// `owner_id`.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    /// Only records captured by this user
    pub owner_id: Option<OwnerId>,
    /// Only records edited after this timestamp
    pub updated_since: Option<DateTime<Utc>>,
    /// Only records that do (`true`) or do not (`false`) carry a server ID
    pub has_server_id: Option<bool>,
}

impl SubmissionFilter {
    /// Creates a new empty filter (matches all records)
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a filter scoped to one owner
    pub fn for_owner(owner_id: &OwnerId) -> Self {
        Self::new().with_owner(owner_id.clone())
    }

    /// Sets the owner filter
    pub fn with_owner(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Sets the updated-since filter
    pub fn with_updated_since(mut self, since: DateTime<Utc>) -> Self {
        self.updated_since = Some(since);
        self
    }

    /// Sets the server ID presence filter
    pub fn with_server_id(mut self, present: bool) -> Self {
        self.has_server_id = Some(present);
        self
    }

    /// Returns true if no filters are set
    pub fn is_empty(&self) -> bool {
        self.owner_id.is_none() && self.updated_since.is_none() && self.has_server_id.is_none()
    }

    /// Returns true if the submission passes every set criterion
    ///
    /// Adapters that cannot push a criterion down to their query engine can
    /// fall back to this.
    pub fn matches(&self, submission: &Submission) -> bool {
        if let Some(owner) = &self.owner_id {
            if !submission.is_owned_by(owner) {
                return false;
            }
        }
        if let Some(since) = self.updated_since {
            if submission.updated_at() <= since {
                return false;
            }
        }
        if let Some(present) = self.has_server_id {
            if submission.server_id().is_some() != present {
                return false;
            }
        }
        true
    }
}

/// Record counts for one owner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub pending: u64,
    pub synced: u64,
}

impl StoreCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.synced
    }
}

// ============================================================================
// ISubmissionStore trait
// ============================================================================

/// Port trait for durable submission storage
///
/// ## Implementation Notes
///
/// - Saving into [`SyncState::Synced`] requires a server ID. Any other synced
///   row holding the same server ID under a different client ID is replaced
///   in the same transaction, so one server ID never has two local copies.
/// - `get` returns records only from the requested collection.
/// - `list` orders by `captured_at`, oldest first.
#[async_trait::async_trait]
pub trait ISubmissionStore: Send + Sync {
    /// Inserts or replaces a submission in a collection
    async fn save(&self, collection: SyncState, submission: &Submission)
        -> Result<(), StoreError>;

    /// Looks up a submission by local or remote key
    async fn get(
        &self,
        collection: SyncState,
        key: &SubmissionKey,
    ) -> Result<Option<Submission>, StoreError>;

    /// Lists submissions matching the filter
    async fn list(
        &self,
        collection: SyncState,
        filter: &SubmissionFilter,
    ) -> Result<Vec<Submission>, StoreError>;

    /// Deletes a submission; returns whether a row was removed
    async fn delete(&self, collection: SyncState, key: &SubmissionKey)
        -> Result<bool, StoreError>;

    /// Moves a confirmed submission into `synced` and drops its pending row
    ///
    /// Idempotent: promoting an already-promoted record leaves the same end
    /// state.
    async fn promote(&self, submission: &Submission) -> Result<(), StoreError>;

    /// Removes a submission from both collections; returns whether anything
    /// was removed
    async fn purge(&self, client_id: &ClientId) -> Result<bool, StoreError>;

    /// Counts an owner's records per collection
    async fn count(&self, owner_id: &OwnerId) -> Result<StoreCounts, StoreError>;
}
