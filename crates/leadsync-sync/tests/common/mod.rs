//! Shared fixtures for sync engine tests
//!
//! [`FakeRemote`] is an in-memory server-of-record that records every call
//! and can be told to fail. Engines run over an in-memory SQLite store,
//! optionally wrapped in a [`FlakyStore`] that fails writes on demand.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use leadsync_cache::{DatabasePool, SqliteSubmissionStore};
use leadsync_core::domain::{
    ClientId, LeadPayload, OwnerId, ServerId, Submission, SubmissionKey, SyncState,
};
use leadsync_core::ports::{
    IRemoteSubmissionService, ISubmissionStore, RemoteError, RemoteSubmission, StoreCounts,
    StoreError, SubmissionFilter,
};
use leadsync_sync::{EngineSettings, SyncContext, SyncEngine};

// ============================================================================
// FakeRemote
// ============================================================================

/// A call received by [`FakeRemote`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { client_id: ClientId, first_name: String },
    Update { server_id: ServerId, first_name: String },
    Delete(ServerId),
    List(OwnerId),
}

#[derive(Default)]
struct State {
    next_id: i64,
    records: BTreeMap<i64, RemoteSubmission>,
    calls: Vec<Call>,
    failing_names: HashMap<String, RemoteError>,
    fail_all: Option<RemoteError>,
    lost_create_responses: usize,
    list_error: Option<RemoteError>,
    list_foreign: bool,
}

/// In-memory server-of-record
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fails create/update for payloads whose first name is `name`
    pub fn fail_for_name(&self, name: &str, err: RemoteError) {
        self.state
            .lock()
            .unwrap()
            .failing_names
            .insert(name.to_string(), err);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_names.clear();
        state.fail_all = None;
        state.list_error = None;
    }

    /// Fails every call with `err`
    pub fn fail_everything(&self, err: RemoteError) {
        self.state.lock().unwrap().fail_all = Some(err);
    }

    /// Fails `list` only
    pub fn fail_list(&self, err: RemoteError) {
        self.state.lock().unwrap().list_error = Some(err);
    }

    /// The next create is stored but its response is lost in transit
    pub fn lose_next_create_response(&self) {
        self.state.lock().unwrap().lost_create_responses += 1;
    }

    /// Makes `list` return every record regardless of owner
    pub fn leak_foreign_records(&self) {
        self.state.lock().unwrap().list_foreign = true;
    }

    /// Puts a record on the server as if another device had created it
    pub fn seed(&self, owner: &str, client_id: Option<&str>, first_name: &str) -> ServerId {
        let mut state = self.state.lock().unwrap();
        let server_id = next_server_id(&mut state);
        state.records.insert(
            server_id.as_i64(),
            RemoteSubmission {
                server_id,
                client_id: client_id.map(|id| ClientId::new(id).unwrap()),
                owner_id: OwnerId::new(owner).unwrap(),
                payload: LeadPayload::new(first_name, "Remote"),
                updated_at: Utc::now(),
            },
        );
        server_id
    }

    /// Deletes a record on the server behind the device's back
    pub fn drop_record(&self, server_id: ServerId) {
        self.state.lock().unwrap().records.remove(&server_id.as_i64());
    }

    pub fn record(&self, server_id: ServerId) -> Option<RemoteSubmission> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(&server_id.as_i64())
            .cloned()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Create { .. }))
            .count()
    }

    pub fn update_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Update { .. }))
            .count()
    }

    pub fn delete_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Delete(_)))
            .count()
    }
}

fn next_server_id(state: &mut State) -> ServerId {
    state.next_id += 1;
    ServerId::new(state.next_id).unwrap()
}

fn injected_failure(state: &State, payload: &LeadPayload) -> Option<RemoteError> {
    state
        .fail_all
        .clone()
        .or_else(|| state.failing_names.get(&payload.contact.first_name).cloned())
}

#[async_trait::async_trait]
impl IRemoteSubmissionService for FakeRemote {
    async fn create(
        &self,
        owner_id: &OwnerId,
        client_id: &ClientId,
        payload: &LeadPayload,
    ) -> Result<RemoteSubmission, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            client_id: client_id.clone(),
            first_name: payload.contact.first_name.clone(),
        });
        if let Some(err) = injected_failure(&state, payload) {
            return Err(err);
        }

        let server_id = next_server_id(&mut state);
        let record = RemoteSubmission {
            server_id,
            client_id: Some(client_id.clone()),
            owner_id: owner_id.clone(),
            payload: payload.clone(),
            updated_at: Utc::now(),
        };
        state.records.insert(server_id.as_i64(), record.clone());

        if state.lost_create_responses > 0 {
            state.lost_create_responses -= 1;
            return Err(RemoteError::Network("connection reset".to_string()));
        }
        Ok(record)
    }

    async fn update(
        &self,
        server_id: ServerId,
        payload: &LeadPayload,
    ) -> Result<RemoteSubmission, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update {
            server_id,
            first_name: payload.contact.first_name.clone(),
        });
        if let Some(err) = injected_failure(&state, payload) {
            return Err(err);
        }

        let record = state
            .records
            .get_mut(&server_id.as_i64())
            .ok_or(RemoteError::NotFound)?;
        record.payload = payload.clone();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, server_id: ServerId) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(server_id));
        if let Some(err) = state.fail_all.clone() {
            return Err(err);
        }
        state
            .records
            .remove(&server_id.as_i64())
            .map(|_| ())
            .ok_or(RemoteError::NotFound)
    }

    async fn list(&self, owner_id: &OwnerId) -> Result<Vec<RemoteSubmission>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List(owner_id.clone()));
        if let Some(err) = state.fail_all.clone().or_else(|| state.list_error.clone()) {
            return Err(err);
        }
        let list_foreign = state.list_foreign;
        Ok(state
            .records
            .values()
            .filter(|record| list_foreign || &record.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// FlakyStore
// ============================================================================

/// SQLite store whose writes can be switched to fail
pub struct FlakyStore {
    inner: Arc<SqliteSubmissionStore>,
    fail_saves: AtomicBool,
    fail_promote: AtomicBool,
}

impl FlakyStore {
    pub async fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: memory_store().await,
            fail_saves: AtomicBool::new(false),
            fail_promote: AtomicBool::new(false),
        })
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_promote(&self, fail: bool) {
        self.fail_promote.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ISubmissionStore for FlakyStore {
    async fn save(&self, collection: SyncState, submission: &Submission) -> Result<(), StoreError> {
        Self::check(&self.fail_saves)?;
        self.inner.save(collection, submission).await
    }

    async fn get(
        &self,
        collection: SyncState,
        key: &SubmissionKey,
    ) -> Result<Option<Submission>, StoreError> {
        self.inner.get(collection, key).await
    }

    async fn list(
        &self,
        collection: SyncState,
        filter: &SubmissionFilter,
    ) -> Result<Vec<Submission>, StoreError> {
        self.inner.list(collection, filter).await
    }

    async fn delete(&self, collection: SyncState, key: &SubmissionKey) -> Result<bool, StoreError> {
        self.inner.delete(collection, key).await
    }

    async fn promote(&self, submission: &Submission) -> Result<(), StoreError> {
        Self::check(&self.fail_promote)?;
        self.inner.promote(submission).await
    }

    async fn purge(&self, client_id: &ClientId) -> Result<bool, StoreError> {
        self.inner.purge(client_id).await
    }

    async fn count(&self, owner_id: &OwnerId) -> Result<StoreCounts, StoreError> {
        self.inner.count(owner_id).await
    }
}

// ============================================================================
// Engine fixtures
// ============================================================================

pub async fn memory_store() -> Arc<SqliteSubmissionStore> {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    Arc::new(SqliteSubmissionStore::new(pool.pool().clone()))
}

pub fn settings(item_delay_ms: u64, restore_before_sync: bool) -> EngineSettings {
    EngineSettings {
        item_delay: Duration::from_millis(item_delay_ms),
        restore_before_sync,
    }
}

/// Engine without bulk delay or restoration
pub async fn setup(remote: &Arc<FakeRemote>) -> Arc<SyncEngine> {
    setup_with(remote, settings(0, false)).await
}

pub async fn setup_with(remote: &Arc<FakeRemote>, settings: EngineSettings) -> Arc<SyncEngine> {
    let store = memory_store().await;
    Arc::new(SyncEngine::new(store, remote.clone(), settings))
}

/// Engine over a caller-supplied store
pub fn setup_with_store(
    store: Arc<dyn ISubmissionStore + Send + Sync>,
    remote: &Arc<FakeRemote>,
    settings: EngineSettings,
) -> Arc<SyncEngine> {
    Arc::new(SyncEngine::new(store, remote.clone(), settings))
}

pub fn online(owner: &str) -> SyncContext {
    SyncContext::new(OwnerId::new(owner).unwrap(), true)
}

pub fn offline(owner: &str) -> SyncContext {
    SyncContext::new(OwnerId::new(owner).unwrap(), false)
}

pub fn lead(first_name: &str) -> LeadPayload {
    LeadPayload::new(first_name, "Lead")
}

pub fn server_error() -> RemoteError {
    RemoteError::Server {
        status: 503,
        message: "maintenance".to_string(),
    }
}

/// Polls `condition` until it holds or a second passes
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 1s");
}
