//! Identity resolution
//!
//! A record can learn its server ID from three places: the caller (editing an
//! already-synced record), the record itself, or the `Synced` row sharing its
//! client ID. The resolver picks one in that priority order and decides
//! between create and update.
//!
//! After a successful remote call, [`IdentityResolver::reconcile`] writes the
//! confirmed server ID back into the record. When two different IDs have been
//! seen for one record the most recently confirmed one wins and the conflict is
//! reported, never silently resolved.

use std::sync::Arc;

use leadsync_core::domain::{ClientId, ServerId, Submission, SubmissionKey, SyncState};
use leadsync_core::ports::{ISubmissionStore, StoreError};
use leadsync_core::SubmissionError;
use serde::Serialize;
use tracing::{debug, warn};

/// Where the chosen server ID came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Supplied by the caller
    Explicit,
    /// Stored on the record
    Record,
    /// Taken from the synced row with the same client ID
    SyncedMapping,
}

/// What to do on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    Create,
    Update {
        server_id: ServerId,
        source: IdentitySource,
    },
}

impl RemoteAction {
    pub fn server_id(&self) -> Option<ServerId> {
        match self {
            RemoteAction::Create => None,
            RemoteAction::Update { server_id, .. } => Some(*server_id),
        }
    }
}

/// Two server IDs seen for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityConflict {
    pub client_id: ClientId,
    pub kept: ServerId,
    pub discarded: ServerId,
}

impl From<IdentityConflict> for SubmissionError {
    fn from(conflict: IdentityConflict) -> Self {
        SubmissionError::IdentityConflict {
            client_id: conflict.client_id,
            kept: conflict.kept,
            discarded: conflict.discarded,
        }
    }
}

/// Outcome of [`IdentityResolver::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDecision {
    pub action: RemoteAction,
    /// Set when a lower-priority source disagreed with the chosen ID
    pub conflict: Option<IdentityConflict>,
}

impl IdentityDecision {
    /// Applies the priority order to the candidate IDs
    pub fn decide(
        client_id: &ClientId,
        explicit: Option<ServerId>,
        on_record: Option<ServerId>,
        mapped: Option<ServerId>,
    ) -> Self {
        let candidates = [
            (explicit, IdentitySource::Explicit),
            (on_record, IdentitySource::Record),
            (mapped, IdentitySource::SyncedMapping),
        ];

        let mut chosen: Option<(ServerId, IdentitySource)> = None;
        let mut conflict = None;
        for (candidate, source) in candidates {
            let Some(id) = candidate else { continue };
            match chosen {
                None => chosen = Some((id, source)),
                Some((kept, _)) if kept != id && conflict.is_none() => {
                    conflict = Some(IdentityConflict {
                        client_id: client_id.clone(),
                        kept,
                        discarded: id,
                    });
                }
                Some(_) => {}
            }
        }

        let action = match chosen {
            None => RemoteAction::Create,
            Some((server_id, source)) => RemoteAction::Update { server_id, source },
        };
        Self { action, conflict }
    }
}

/// Decides create vs update and reconciles confirmed server IDs
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn ISubmissionStore + Send + Sync>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn ISubmissionStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Decides whether `record` must be created or updated on the server
    ///
    /// # Arguments
    /// * `record` - The record about to be sent
    /// * `explicit` - Server ID supplied by an editing context, if any
    pub async fn resolve(
        &self,
        record: &Submission,
        explicit: Option<ServerId>,
    ) -> Result<IdentityDecision, StoreError> {
        let mapped = self
            .store
            .get(SyncState::Synced, &SubmissionKey::Local(record.client_id().clone()))
            .await?
            .and_then(|synced| synced.server_id());

        let decision =
            IdentityDecision::decide(record.client_id(), explicit, record.server_id(), mapped);

        if let Some(conflict) = &decision.conflict {
            warn!(
                client_id = %conflict.client_id,
                kept = %conflict.kept,
                discarded = %conflict.discarded,
                "Identity sources disagree"
            );
        }
        debug!(client_id = %record.client_id(), action = ?decision.action, "Resolved identity");
        Ok(decision)
    }

    /// Records the server ID the server just confirmed
    ///
    /// Returns the conflict when the record already carried another ID; the
    /// confirmed ID replaces it and nothing is deleted.
    pub fn reconcile(record: &mut Submission, confirmed: ServerId) -> Option<IdentityConflict> {
        if record.assign_server_id(confirmed).is_ok() {
            return None;
        }

        let discarded = record.supersede_server_id(confirmed)?;
        let conflict = IdentityConflict {
            client_id: record.client_id().clone(),
            kept: confirmed,
            discarded,
        };
        warn!(
            client_id = %conflict.client_id,
            kept = %conflict.kept,
            discarded = %conflict.discarded,
            "Server confirmed a different identity; keeping the newest"
        );
        Some(conflict)
    }
}
