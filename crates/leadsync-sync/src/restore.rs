//! Restoration of server records onto this device
//!
//! Fetches the caller's records from the server and merges them into the
//! local store:
//!
//! | Server record                                     | Local action                   |
//! |---------------------------------------------------|--------------------------------|
//! | matches a synced row by server ID                 | keep the newer payload         |
//! | matches a pending row by server ID                | keep local edits (skipped)     |
//! | echoes the client ID of a pending row with no ID  | adopt the server ID            |
//! | unknown                                           | insert into the synced store   |
//! | owned by someone else                             | ignore (skipped)               |
//!
//! Local-only synced rows are never touched.

use std::sync::Arc;

use leadsync_core::domain::{ClientId, Submission, SubmissionKey, SyncState};
use leadsync_core::ports::{IRemoteSubmissionService, ISubmissionStore, RemoteSubmission};
use leadsync_core::SubmissionError;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::SyncContext;
use crate::locks::KeyedLocks;

/// Counts of what a restoration pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Records the device had never seen
    pub inserted: usize,
    /// Synced records refreshed from the server
    pub updated: usize,
    /// Pending records that adopted a server ID from a lost create response
    pub reconciled: usize,
    /// Records left alone (foreign owner or newer local edits)
    pub skipped: usize,
}

impl RestoreReport {
    /// Number of local records written
    pub fn changed(&self) -> usize {
        self.inserted + self.updated + self.reconciled
    }
}

/// Pulls the caller's records from the server into the local store
#[derive(Clone)]
pub struct RestoreService {
    store: Arc<dyn ISubmissionStore + Send + Sync>,
    remote: Arc<dyn IRemoteSubmissionService + Send + Sync>,
    locks: Arc<KeyedLocks>,
}

/// How a single server record was merged
enum Merge {
    Inserted,
    Updated,
    Reconciled,
    Skipped,
}

impl RestoreService {
    pub fn new(
        store: Arc<dyn ISubmissionStore + Send + Sync>,
        remote: Arc<dyn IRemoteSubmissionService + Send + Sync>,
        locks: Arc<KeyedLocks>,
    ) -> Self {
        Self {
            store,
            remote,
            locks,
        }
    }

    /// Runs one restoration pass for the caller
    ///
    /// # Errors
    /// - `NetworkUnreachable` when offline or the list call fails in transit
    /// - `StorageUnavailable` when a local write fails; records merged before
    ///   the failure stay merged
    #[tracing::instrument(skip(self, ctx), fields(owner_id = %ctx.owner_id))]
    pub async fn restore(&self, ctx: &SyncContext) -> Result<RestoreReport, SubmissionError> {
        if !ctx.online {
            return Err(SubmissionError::NetworkUnreachable(
                "device is offline".to_string(),
            ));
        }

        let records = self.remote.list(&ctx.owner_id).await?;
        debug!(count = records.len(), "Fetched server records");

        let mut report = RestoreReport::default();
        for record in records {
            if record.owner_id != ctx.owner_id {
                warn!(
                    server_id = %record.server_id,
                    record_owner = %record.owner_id,
                    "Ignoring server record owned by another user"
                );
                report.skipped += 1;
                continue;
            }

            match self.merge(ctx, record).await? {
                Merge::Inserted => report.inserted += 1,
                Merge::Updated => report.updated += 1,
                Merge::Reconciled => report.reconciled += 1,
                Merge::Skipped => report.skipped += 1,
            }
        }

        info!(
            inserted = report.inserted,
            updated = report.updated,
            reconciled = report.reconciled,
            skipped = report.skipped,
            "Restoration complete"
        );
        Ok(report)
    }

    async fn merge(
        &self,
        ctx: &SyncContext,
        record: RemoteSubmission,
    ) -> Result<Merge, SubmissionError> {
        let by_server_id = SubmissionKey::Remote(record.server_id);

        if let Some(local) = self.store.get(SyncState::Synced, &by_server_id).await? {
            let _guard = self.locks.lock(local.client_id()).await;
            // Re-read under the lock; a concurrent sync may have replaced it.
            let Some(mut local) = self.store.get(SyncState::Synced, &by_server_id).await? else {
                return Ok(Merge::Skipped);
            };
            if local.updated_at() > record.updated_at {
                debug!(
                    client_id = %local.client_id(),
                    server_id = %record.server_id,
                    "Local edit is newer than the server copy"
                );
                return Ok(Merge::Skipped);
            }
            local.apply_remote(record.payload, record.updated_at);
            self.store.save(SyncState::Synced, &local).await?;
            debug!(client_id = %local.client_id(), server_id = %record.server_id, "Refreshed synced record");
            return Ok(Merge::Updated);
        }

        if let Some(local) = self.store.get(SyncState::Pending, &by_server_id).await? {
            debug!(
                client_id = %local.client_id(),
                server_id = %record.server_id,
                "Pending edits take precedence over the server copy"
            );
            return Ok(Merge::Skipped);
        }

        if let Some(echoed) = &record.client_id {
            if let Some(merge) = self.adopt(ctx, echoed, &record).await? {
                return Ok(merge);
            }
        }

        let client_id = self.free_client_id(record.client_id.as_ref()).await?;
        let _guard = self.locks.lock(&client_id).await;
        let restored = Submission::from_remote(
            client_id,
            record.server_id,
            record.owner_id,
            record.payload,
            record.updated_at,
        );
        self.store.save(SyncState::Synced, &restored).await?;
        debug!(client_id = %restored.client_id(), server_id = %record.server_id, "Inserted restored record");
        Ok(Merge::Inserted)
    }

    /// Gives a pending record the server ID of a create whose response was lost
    async fn adopt(
        &self,
        ctx: &SyncContext,
        echoed: &ClientId,
        record: &RemoteSubmission,
    ) -> Result<Option<Merge>, SubmissionError> {
        let _guard = self.locks.lock(echoed).await;
        let key = SubmissionKey::Local(echoed.clone());
        let Some(mut pending) = self.store.get(SyncState::Pending, &key).await? else {
            return Ok(None);
        };
        if !pending.is_owned_by(&ctx.owner_id) || pending.server_id().is_some() {
            return Ok(None);
        }

        pending.assign_server_id(record.server_id)?;
        self.store.save(SyncState::Pending, &pending).await?;
        info!(
            client_id = %echoed,
            server_id = %record.server_id,
            "Adopted server ID for pending record"
        );
        Ok(Some(Merge::Reconciled))
    }

    /// Uses the echoed client ID when no local record holds it yet
    async fn free_client_id(
        &self,
        echoed: Option<&ClientId>,
    ) -> Result<ClientId, SubmissionError> {
        if let Some(candidate) = echoed {
            let key = SubmissionKey::Local(candidate.clone());
            let taken = self.store.get(SyncState::Pending, &key).await?.is_some()
                || self.store.get(SyncState::Synced, &key).await?.is_some();
            if !taken {
                return Ok(candidate.clone());
            }
        }
        Ok(ClientId::generate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_changed_counts_writes_only() {
        let report = RestoreReport {
            inserted: 2,
            updated: 1,
            reconciled: 1,
            skipped: 5,
        };
        assert_eq!(report.changed(), 4);
    }
}
