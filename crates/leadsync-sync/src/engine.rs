//! Sync orchestrator
//!
//! The [`SyncEngine`] is the surface the UI layer talks to. It captures and
//! edits lead sheets locally, pushes them to the CRM server when possible,
//! and moves confirmed records from the pending store to the synced store.
//!
//! ## Record lifecycle
//!
//! ```text
//! capture/edit ──► Pending ──► in flight ──► Synced
//!                     ▲            │
//!                     └── failure ─┘
//! ```
//!
//! Every record is written locally before any network call. A failed remote
//! call leaves the store exactly as it was; the record is retried by the next
//! `sync_one` or `sync_all`.
//!
//! ## Concurrency
//!
//! Operations on the same client ID are serialized by [`KeyedLocks`]. Only one
//! bulk sync runs at a time. A record sent by `sync_one` or `edit` while a bulk
//! run is active is not sent again by the loop; the loop counts the result of
//! that send in its report instead.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use leadsync_core::config::SyncConfig;
use leadsync_core::domain::{
    ClientId, LeadPayload, OwnerId, ServerId, Submission, SubmissionKey, SyncState,
};
use leadsync_core::ports::{
    IRemoteSubmissionService, ISubmissionStore, RemoteError, StoreCounts, SubmissionFilter,
};
use leadsync_core::SubmissionError;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::SyncContext;
use crate::identity::{IdentityConflict, IdentityResolver, RemoteAction};
use crate::locks::KeyedLocks;
use crate::restore::{RestoreReport, RestoreService};

// ============================================================================
// Outcomes
// ============================================================================

/// Result of `capture` and `edit`
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The server confirmed the record
    Synced {
        client_id: ClientId,
        server_id: ServerId,
    },
    /// The record is stored on the device only
    ///
    /// `reason` is `None` when no send was attempted (offline).
    SavedLocally {
        client_id: ClientId,
        reason: Option<SubmissionError>,
    },
}

impl SaveOutcome {
    pub fn client_id(&self) -> &ClientId {
        match self {
            SaveOutcome::Synced { client_id, .. } | SaveOutcome::SavedLocally { client_id, .. } => {
                client_id
            }
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SaveOutcome::Synced { .. })
    }
}

/// What the server was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
}

/// Result of a successful `sync_one`
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub client_id: ClientId,
    pub server_id: ServerId,
    pub action: SyncAction,
    /// Set when two server identities were seen for this record
    pub identity_conflict: Option<IdentityConflict>,
}

/// Summary of a bulk sync
#[derive(Debug, Clone, Default)]
pub struct SyncAllReport {
    /// Records sent to the server during the run, by the loop or by a
    /// concurrent `sync_one`/`edit`
    pub attempted: usize,
    /// Records the server confirmed
    pub succeeded: usize,
    /// Per-record failures; these records stay where they were
    pub failed: Vec<(ClientId, SubmissionError)>,
    /// Records removed before the loop reached them
    pub skipped: Vec<ClientId>,
    /// True if `cancel_sync_all` stopped the loop early
    pub cancelled: bool,
    /// Restoration result, when it ran and succeeded
    pub restore: Option<RestoreReport>,
    /// Restoration failure; the bulk sync went ahead without it
    pub restore_warning: Option<String>,
    /// Identity conflicts resolved during the run
    pub conflicts: Vec<IdentityConflict>,
}

impl SyncAllReport {
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    fn record(&mut self, client_id: &ClientId, result: Result<SyncOutcome, SubmissionError>) {
        match result {
            Ok(outcome) => {
                self.attempted += 1;
                self.succeeded += 1;
                if let Some(conflict) = outcome.identity_conflict {
                    self.conflicts.push(conflict);
                }
            }
            // Removed while the run was in progress.
            Err(SubmissionError::NotFound(_)) => self.skipped.push(client_id.clone()),
            Err(err) => {
                warn!(%client_id, error = %err, retryable = err.is_retryable(), "Bulk item failed");
                self.attempted += 1;
                self.failed.push((client_id.clone(), err));
            }
        }
    }
}

/// Snapshot for status displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub owner_id: OwnerId,
    pub online: bool,
    pub pending: u64,
    pub synced: u64,
    pub sync_running: bool,
}

// ============================================================================
// Settings
// ============================================================================

/// Engine tuning taken from the `sync` configuration section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Pause between records in a bulk sync
    pub item_delay: Duration,
    /// Run restoration at the start of every bulk sync
    pub restore_before_sync: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            item_delay: config.item_delay(),
            restore_before_sync: config.restore_before_sync,
        }
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Offline-first submission orchestrator
pub struct SyncEngine {
    store: Arc<dyn ISubmissionStore + Send + Sync>,
    remote: Arc<dyn IRemoteSubmissionService + Send + Sync>,
    resolver: IdentityResolver,
    restorer: RestoreService,
    locks: Arc<KeyedLocks>,
    settings: EngineSettings,
    /// Set while a bulk sync runs
    running: AtomicBool,
    /// Set by `cancel_sync_all`, checked before each bulk item
    cancel_requested: AtomicBool,
    /// Records handled during the current bulk run; `None` outside a run
    bulk_run: Mutex<Option<HashMap<ClientId, BulkEntry>>>,
}

/// How a record was handled during the current bulk run
enum BulkEntry {
    /// The bulk loop took it
    Looped,
    /// `sync_one` or `edit` sent it before the loop got there
    Direct(Result<SyncOutcome, SubmissionError>),
}

/// Releases the bulk-run flags when a bulk sync ends, however it ends
struct BulkRunGuard<'a> {
    engine: &'a SyncEngine,
}

impl Drop for BulkRunGuard<'_> {
    fn drop(&mut self) {
        *self.engine.bulk_run() = None;
        self.engine.cancel_requested.store(false, Ordering::SeqCst);
        self.engine.running.store(false, Ordering::SeqCst);
    }
}

impl SyncEngine {
    /// Creates an engine over the given store and remote service
    pub fn new(
        store: Arc<dyn ISubmissionStore + Send + Sync>,
        remote: Arc<dyn IRemoteSubmissionService + Send + Sync>,
        settings: EngineSettings,
    ) -> Self {
        let locks = Arc::new(KeyedLocks::new());
        Self {
            resolver: IdentityResolver::new(Arc::clone(&store)),
            restorer: RestoreService::new(
                Arc::clone(&store),
                Arc::clone(&remote),
                Arc::clone(&locks),
            ),
            store,
            remote,
            locks,
            settings,
            running: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            bulk_run: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns true while a bulk sync runs
    pub fn is_syncing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Capture / edit / remove
    // ------------------------------------------------------------------------

    /// Saves a new lead sheet, then sends it if the device is online
    ///
    /// # Errors
    /// - `Domain` when the payload fails local validation
    /// - `StorageUnavailable` when the record could not be saved; nothing was
    ///   sent in that case
    ///
    /// Remote failures are not errors here: the outcome is `SavedLocally` with
    /// the reason.
    #[tracing::instrument(skip(self, ctx, payload), fields(owner_id = %ctx.owner_id))]
    pub async fn capture(
        &self,
        ctx: &SyncContext,
        payload: LeadPayload,
    ) -> Result<SaveOutcome, SubmissionError> {
        payload.validate()?;

        let record = Submission::capture(ctx.owner_id.clone(), payload);
        let client_id = record.client_id().clone();
        let _guard = self.locks.lock(&client_id).await;

        self.store.save(SyncState::Pending, &record).await?;
        info!(%client_id, "Captured submission");

        if !ctx.online {
            return Ok(SaveOutcome::SavedLocally {
                client_id,
                reason: None,
            });
        }
        Ok(self.send_after_save(ctx, client_id, None).await)
    }

    /// Replaces the payload of an existing record, then sends it if online
    ///
    /// # Arguments
    /// * `editing_server_id` - Server ID known to the editing screen, if any
    ///
    /// # Errors
    /// - `NotFound` when the caller has no record with this client ID
    /// - `Domain` when the payload fails local validation
    /// - `StorageUnavailable` when the edit could not be saved
    #[tracing::instrument(skip(self, ctx, payload), fields(owner_id = %ctx.owner_id))]
    pub async fn edit(
        &self,
        ctx: &SyncContext,
        client_id: &ClientId,
        payload: LeadPayload,
        editing_server_id: Option<ServerId>,
    ) -> Result<SaveOutcome, SubmissionError> {
        payload.validate()?;

        let _guard = self.locks.lock(client_id).await;
        let mut record = self.load_owned(ctx, client_id).await?;
        let collection = record.sync_state();
        record.update_payload(payload);
        self.store.save(collection, &record).await?;
        info!(%client_id, collection = collection.name(), "Edited submission");

        if !ctx.online {
            return Ok(SaveOutcome::SavedLocally {
                client_id: client_id.clone(),
                reason: None,
            });
        }
        Ok(self
            .send_after_save(ctx, client_id.clone(), editing_server_id)
            .await)
    }

    /// Deletes a record on the server (if it has a server ID) and locally
    ///
    /// # Errors
    /// - `NotFound` when the caller has no record with this client ID
    /// - `NetworkUnreachable` when the record exists on the server and the
    ///   device is offline; nothing is deleted
    /// - Any remote failure other than "already gone"; nothing is deleted
    #[tracing::instrument(skip(self, ctx), fields(owner_id = %ctx.owner_id))]
    pub async fn remove(
        &self,
        ctx: &SyncContext,
        client_id: &ClientId,
    ) -> Result<(), SubmissionError> {
        let guard = self.locks.lock(client_id).await;
        let record = self.load_owned(ctx, client_id).await?;
        let decision = self.resolver.resolve(&record, None).await?;

        if let Some(server_id) = decision.action.server_id() {
            if !ctx.online {
                return Err(SubmissionError::NetworkUnreachable(
                    "device is offline; the server copy cannot be deleted".to_string(),
                ));
            }
            match self.remote.delete(server_id).await {
                Ok(()) => debug!(%client_id, %server_id, "Deleted on server"),
                Err(RemoteError::NotFound) => {
                    debug!(%client_id, %server_id, "Already gone on server")
                }
                Err(err) => {
                    warn!(%client_id, %server_id, error = %err, "Remote delete failed");
                    return Err(err.into());
                }
            }
        }

        self.store.purge(client_id).await?;
        drop(guard);
        self.locks.forget(client_id);
        info!(%client_id, "Removed submission");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------------

    /// Sends one record to the server and promotes it on success
    ///
    /// # Errors
    /// - `NetworkUnreachable` when offline (no call is made) or in transit
    /// - `RemoteValidation` when the server rejected the payload
    /// - `RemoteServerError`, `Unauthenticated` for other remote failures
    /// - `NotFound` when the caller has no record with this client ID
    ///
    /// The record is unchanged on every error.
    #[tracing::instrument(skip(self, ctx), fields(owner_id = %ctx.owner_id))]
    pub async fn sync_one(
        &self,
        ctx: &SyncContext,
        client_id: &ClientId,
    ) -> Result<SyncOutcome, SubmissionError> {
        if !ctx.online {
            return Err(SubmissionError::NetworkUnreachable(
                "device is offline".to_string(),
            ));
        }
        let _guard = self.locks.lock(client_id).await;
        let result = self.sync_locked(ctx, client_id, None).await;
        self.record_direct(client_id, &result);
        result
    }

    /// Syncs every record the caller owns, one at a time
    ///
    /// Restoration runs first when enabled; its failure is reported as a
    /// warning. Pending and synced records are both sent; a synced record is
    /// re-confirmed with an update. Per-record failures do not stop the loop.
    ///
    /// # Errors
    /// - `SyncInProgress` when another bulk sync is running
    /// - `NetworkUnreachable` when offline
    /// - `StorageUnavailable` when the records could not be listed
    #[tracing::instrument(skip(self, ctx), fields(owner_id = %ctx.owner_id))]
    pub async fn sync_all(&self, ctx: &SyncContext) -> Result<SyncAllReport, SubmissionError> {
        if !ctx.online {
            return Err(SubmissionError::NetworkUnreachable(
                "device is offline".to_string(),
            ));
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Bulk sync already running");
            return Err(SubmissionError::SyncInProgress);
        }
        *self.bulk_run() = Some(HashMap::new());
        let _run = BulkRunGuard { engine: self };

        let mut report = SyncAllReport::default();

        if self.settings.restore_before_sync {
            match self.restorer.restore(ctx).await {
                Ok(restored) => report.restore = Some(restored),
                Err(err) => {
                    warn!(error = %err, "Restoration failed, continuing with local records");
                    report.restore_warning = Some(err.to_string());
                }
            }
        }

        let queue = self.bulk_queue(&ctx.owner_id).await?;
        info!(count = queue.len(), "Starting bulk sync");

        for (index, client_id) in queue.iter().enumerate() {
            if index > 0 && !self.settings.item_delay.is_zero() {
                if self.cancel_requested.load(Ordering::SeqCst) {
                    report.cancelled = true;
                    break;
                }
                tokio::time::sleep(self.settings.item_delay).await;
            }
            if self.cancel_requested.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }

            let _guard = self.locks.lock(client_id).await;
            let result = match self.claim_for_bulk(client_id) {
                Some(direct) => {
                    debug!(%client_id, "Already sent during this run, counting that result");
                    direct
                }
                None => self.sync_locked(ctx, client_id, None).await,
            };
            report.record(client_id, result);
        }

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            cancelled = report.cancelled,
            "Bulk sync finished"
        );
        Ok(report)
    }

    /// Asks a running bulk sync to stop before its next record
    ///
    /// A call already in flight completes and is applied. Returns false if no
    /// bulk sync was running.
    pub fn cancel_sync_all(&self) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }
        info!("Bulk sync cancellation requested");
        self.cancel_requested.store(true, Ordering::SeqCst);
        true
    }

    /// Pulls the caller's server records into the local store
    pub async fn restore(&self, ctx: &SyncContext) -> Result<RestoreReport, SubmissionError> {
        self.restorer.restore(ctx).await
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Records of the caller not yet confirmed by the server
    pub async fn list_pending(&self, ctx: &SyncContext) -> Result<Vec<Submission>, SubmissionError> {
        Ok(self
            .store
            .list(SyncState::Pending, &SubmissionFilter::for_owner(&ctx.owner_id))
            .await?)
    }

    /// Records of the caller confirmed by the server
    pub async fn list_synced(&self, ctx: &SyncContext) -> Result<Vec<Submission>, SubmissionError> {
        Ok(self
            .store
            .list(SyncState::Synced, &SubmissionFilter::for_owner(&ctx.owner_id))
            .await?)
    }

    /// Looks up one of the caller's records in either collection
    pub async fn get(
        &self,
        ctx: &SyncContext,
        client_id: &ClientId,
    ) -> Result<Submission, SubmissionError> {
        self.load_owned(ctx, client_id).await
    }

    pub async fn status(&self, ctx: &SyncContext) -> Result<SyncStatus, SubmissionError> {
        let StoreCounts { pending, synced } = self.store.count(&ctx.owner_id).await?;
        Ok(SyncStatus {
            owner_id: ctx.owner_id.clone(),
            online: ctx.online,
            pending,
            synced,
            sync_running: self.is_syncing(),
        })
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Sends a record that was just saved; failures become `SavedLocally`
    async fn send_after_save(
        &self,
        ctx: &SyncContext,
        client_id: ClientId,
        explicit: Option<ServerId>,
    ) -> SaveOutcome {
        let result = self.sync_locked(ctx, &client_id, explicit).await;
        self.record_direct(&client_id, &result);
        match result {
            Ok(outcome) => SaveOutcome::Synced {
                client_id,
                server_id: outcome.server_id,
            },
            Err(err) => {
                debug!(%client_id, error = %err, "Kept on device");
                SaveOutcome::SavedLocally {
                    client_id,
                    reason: Some(err),
                }
            }
        }
    }

    /// Sends one record; the caller holds the record's lock
    async fn sync_locked(
        &self,
        ctx: &SyncContext,
        client_id: &ClientId,
        explicit: Option<ServerId>,
    ) -> Result<SyncOutcome, SubmissionError> {
        let mut record = self.load_owned(ctx, client_id).await?;
        let decision = self.resolver.resolve(&record, explicit).await?;

        let (confirmed, action) = match decision.action {
            RemoteAction::Create => {
                let created = self
                    .remote
                    .create(&ctx.owner_id, client_id, record.payload())
                    .await?;
                (created, SyncAction::Created)
            }
            RemoteAction::Update { server_id, .. } => {
                match self.remote.update(server_id, record.payload()).await {
                    Ok(updated) => (updated, SyncAction::Updated),
                    Err(RemoteError::NotFound) => {
                        warn!(%client_id, %server_id, "Server record is gone, creating it again");
                        let created = self
                            .remote
                            .create(&ctx.owner_id, client_id, record.payload())
                            .await?;
                        (created, SyncAction::Created)
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        };

        let server_id = confirmed.server_id;
        let identity_conflict = IdentityResolver::reconcile(&mut record, server_id)
            .or(decision.conflict);
        record.mark_synced(Utc::now())?;
        self.store.promote(&record).await?;

        info!(%client_id, %server_id, ?action, "Submission synced");
        Ok(SyncOutcome {
            client_id: client_id.clone(),
            server_id,
            action,
            identity_conflict,
        })
    }

    /// Loads a record from either collection, pending first
    ///
    /// Records of other users are reported as missing.
    async fn load_owned(
        &self,
        ctx: &SyncContext,
        client_id: &ClientId,
    ) -> Result<Submission, SubmissionError> {
        let key = SubmissionKey::Local(client_id.clone());
        let found = match self.store.get(SyncState::Pending, &key).await? {
            Some(record) => Some(record),
            None => self.store.get(SyncState::Synced, &key).await?,
        };
        match found {
            Some(record) if record.is_owned_by(&ctx.owner_id) => Ok(record),
            _ => Err(SubmissionError::NotFound(client_id.clone())),
        }
    }

    /// Pending records first, then synced ones not also pending
    async fn bulk_queue(&self, owner_id: &OwnerId) -> Result<Vec<ClientId>, SubmissionError> {
        let filter = SubmissionFilter::for_owner(owner_id);
        let pending = self.store.list(SyncState::Pending, &filter).await?;
        let synced = self.store.list(SyncState::Synced, &filter).await?;

        let mut seen = HashSet::new();
        Ok(pending
            .iter()
            .chain(synced.iter())
            .filter(|record| seen.insert(record.client_id().clone()))
            .map(|record| record.client_id().clone())
            .collect())
    }

    fn bulk_run(&self) -> std::sync::MutexGuard<'_, Option<HashMap<ClientId, BulkEntry>>> {
        self.bulk_run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Keeps the result of a send made outside the bulk loop for the active run
    ///
    /// The caller holds the record's lock. A record the loop already took is
    /// left alone; the loop has counted it.
    fn record_direct(&self, client_id: &ClientId, result: &Result<SyncOutcome, SubmissionError>) {
        if let Some(run) = self.bulk_run().as_mut() {
            if !matches!(run.get(client_id), Some(BulkEntry::Looped)) {
                run.insert(client_id.clone(), BulkEntry::Direct(result.clone()));
            }
        }
    }

    /// Hands the record to the bulk loop
    ///
    /// The caller holds the record's lock. Returns the result of an earlier
    /// direct send during this run, if there was one.
    fn claim_for_bulk(&self, client_id: &ClientId) -> Option<Result<SyncOutcome, SubmissionError>> {
        let mut run = self.bulk_run();
        match run.as_mut()?.insert(client_id.clone(), BulkEntry::Looped) {
            Some(BulkEntry::Direct(result)) => Some(result),
            _ => None,
        }
    }
}
