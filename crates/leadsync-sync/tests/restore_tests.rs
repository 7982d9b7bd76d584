//! Integration tests for RestoreService
//!
//! Covers cross-device continuity and every merge rule of a restoration
//! pass.

mod common;

use std::sync::Arc;

use chrono::Utc;
use leadsync_core::domain::{ClientId, OwnerId, ServerId, Submission, SyncState};
use leadsync_core::ports::ISubmissionStore;
use leadsync_core::SubmissionError;
use leadsync_sync::locks::KeyedLocks;
use leadsync_sync::{RestoreReport, RestoreService, SyncEngine};

use common::{lead, memory_store, offline, online, server_error, settings, setup, FakeRemote};

async fn restorer(
    remote: &Arc<FakeRemote>,
) -> (RestoreService, Arc<leadsync_cache::SqliteSubmissionStore>) {
    let store = memory_store().await;
    let service = RestoreService::new(
        store.clone(),
        remote.clone(),
        Arc::new(KeyedLocks::new()),
    );
    (service, store)
}

// ============================================================================
// Cross-device continuity
// ============================================================================

#[tokio::test]
async fn test_second_device_sees_first_devices_records() {
    let remote = FakeRemote::new();
    let phone = setup(&remote).await;
    let tablet = setup(&remote).await;
    let ctx = online("agent-1");

    let first = phone.capture(&ctx, lead("Ana")).await.unwrap();
    let second = phone.capture(&ctx, lead("Bea")).await.unwrap();
    let creates_before = remote.create_count();

    let report = tablet.restore(&ctx).await.unwrap();

    assert_eq!(report.inserted, 2);
    assert_eq!(remote.create_count(), creates_before);
    let restored = tablet.list_synced(&ctx).await.unwrap();
    assert_eq!(restored.len(), 2);
    let ids: Vec<&ClientId> = restored.iter().map(|r| r.client_id()).collect();
    assert!(ids.contains(&first.client_id()));
    assert!(ids.contains(&second.client_id()));
    assert!(tablet.list_pending(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_restored_record_is_updated_not_recreated() {
    let remote = FakeRemote::new();
    let phone = setup(&remote).await;
    let tablet = setup(&remote).await;
    let ctx = online("agent-1");
    let created = phone.capture(&ctx, lead("Ana")).await.unwrap();
    tablet.restore(&ctx).await.unwrap();

    let outcome = tablet
        .edit(&ctx, created.client_id(), lead("Anabel"), None)
        .await
        .unwrap();

    assert!(outcome.is_synced());
    assert_eq!(remote.create_count(), 1);
    assert_eq!(remote.update_count(), 1);
    assert_eq!(remote.record_count(), 1);
}

#[tokio::test]
async fn test_restore_refreshes_synced_record_from_server() {
    let remote = FakeRemote::new();
    let phone = setup(&remote).await;
    let tablet = setup(&remote).await;
    let ctx = online("agent-1");
    let created = phone.capture(&ctx, lead("Ana")).await.unwrap();
    tablet.restore(&ctx).await.unwrap();
    tablet
        .edit(&ctx, created.client_id(), lead("Anabel"), None)
        .await
        .unwrap();

    let report = phone.restore(&ctx).await.unwrap();

    assert_eq!(report.updated, 1);
    let synced = phone.list_synced(&ctx).await.unwrap();
    assert_eq!(synced[0].payload().contact.first_name, "Anabel");
}

#[tokio::test]
async fn test_restore_keeps_newer_local_edit() {
    let remote = FakeRemote::new();
    let engine = setup(&remote).await;
    let ctx = online("agent-1");
    let created = engine.capture(&ctx, lead("Ana")).await.unwrap();
    engine
        .edit(&offline("agent-1"), created.client_id(), lead("Offline edit"), None)
        .await
        .unwrap();

    let report = engine.restore(&ctx).await.unwrap();

    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 1);
    let synced = engine.list_synced(&ctx).await.unwrap();
    assert_eq!(synced[0].payload().contact.first_name, "Offline edit");
}

// ============================================================================
// Merge rules
// ============================================================================

#[tokio::test]
async fn test_restore_drops_foreign_records() {
    let remote = FakeRemote::new();
    remote.seed("agent-1", Some("mine"), "Ana");
    remote.seed("agent-2", Some("theirs"), "Bea");
    remote.leak_foreign_records();
    let (service, store) = restorer(&remote).await;

    let report = service.restore(&online("agent-1")).await.unwrap();

    assert_eq!(
        report,
        RestoreReport {
            inserted: 1,
            updated: 0,
            reconciled: 0,
            skipped: 1,
        }
    );
    let counts = store.count(&OwnerId::new("agent-2").unwrap()).await.unwrap();
    assert_eq!(counts.total(), 0);
}

#[tokio::test]
async fn test_restore_generates_client_id_when_echo_is_taken() {
    let remote = FakeRemote::new();
    let server_id = remote.seed("agent-1", Some("shared"), "Remote copy");
    let (service, store) = restorer(&remote).await;

    let mut local = Submission::with_client_id(
        ClientId::new("shared").unwrap(),
        OwnerId::new("agent-1").unwrap(),
        lead("Local copy"),
    );
    local.assign_server_id(ServerId::new(999).unwrap()).unwrap();
    local.mark_synced(Utc::now()).unwrap();
    store.save(SyncState::Synced, &local).await.unwrap();

    let report = service.restore(&online("agent-1")).await.unwrap();
    assert_eq!(report.inserted, 1);

    let restored = store
        .get(
            SyncState::Synced,
            &leadsync_core::domain::SubmissionKey::Remote(server_id),
        )
        .await
        .unwrap()
        .unwrap();
    assert_ne!(restored.client_id().as_str(), "shared");
    let untouched = store
        .get(SyncState::Synced, &local.local_key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.payload().contact.first_name, "Local copy");
}

#[tokio::test]
async fn test_restore_without_echo_generates_client_id() {
    let remote = FakeRemote::new();
    remote.seed("agent-1", None, "Legacy");
    let (service, store) = restorer(&remote).await;

    let report = service.restore(&online("agent-1")).await.unwrap();

    assert_eq!(report.inserted, 1);
    let counts = store.count(&OwnerId::new("agent-1").unwrap()).await.unwrap();
    assert_eq!(counts.synced, 1);
}

#[tokio::test]
async fn test_restore_adopts_server_id_for_lost_create() {
    let remote = FakeRemote::new();
    let (service, store) = restorer(&remote).await;
    let pending = Submission::capture(OwnerId::new("agent-1").unwrap(), lead("Ana"));
    store.save(SyncState::Pending, &pending).await.unwrap();
    let server_id = remote.seed("agent-1", Some(pending.client_id().as_str()), "Ana");

    let report = service.restore(&online("agent-1")).await.unwrap();

    assert_eq!(report.reconciled, 1);
    assert_eq!(report.inserted, 0);
    let adopted = store
        .get(SyncState::Pending, &pending.local_key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(adopted.server_id(), Some(server_id));
}

#[tokio::test]
async fn test_restore_skips_records_with_pending_edits() {
    let remote = FakeRemote::new();
    let (service, store) = restorer(&remote).await;
    let server_id = remote.seed("agent-1", Some("c-1"), "Server");
    let mut pending = Submission::with_client_id(
        ClientId::new("c-1").unwrap(),
        OwnerId::new("agent-1").unwrap(),
        lead("Unsent edit"),
    );
    pending.assign_server_id(server_id).unwrap();
    store.save(SyncState::Pending, &pending).await.unwrap();

    let report = service.restore(&online("agent-1")).await.unwrap();

    assert_eq!(report.skipped, 1);
    let kept = store
        .get(SyncState::Pending, &pending.local_key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.payload().contact.first_name, "Unsent edit");
}

#[tokio::test]
async fn test_restore_leaves_local_only_synced_records() {
    let remote = FakeRemote::new();
    let (service, store) = restorer(&remote).await;
    let mut local = Submission::capture(OwnerId::new("agent-1").unwrap(), lead("Local"));
    local.assign_server_id(ServerId::new(50).unwrap()).unwrap();
    local.mark_synced(Utc::now()).unwrap();
    store.save(SyncState::Synced, &local).await.unwrap();

    let report = service.restore(&online("agent-1")).await.unwrap();

    assert_eq!(report, RestoreReport::default());
    assert!(store
        .get(SyncState::Synced, &local.local_key())
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_restore_twice_is_stable() {
    let remote = FakeRemote::new();
    remote.seed("agent-1", Some("c-1"), "Ana");
    remote.seed("agent-1", Some("c-2"), "Bea");
    let engine: Arc<SyncEngine> = setup(&remote).await;
    let ctx = online("agent-1");

    engine.restore(&ctx).await.unwrap();
    let second = engine.restore(&ctx).await.unwrap();

    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 2);
    assert_eq!(engine.list_synced(&ctx).await.unwrap().len(), 2);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_restore_offline_is_rejected() {
    let remote = FakeRemote::new();
    let (service, _) = restorer(&remote).await;

    let err = service.restore(&offline("agent-1")).await.unwrap_err();
    assert!(matches!(err, SubmissionError::NetworkUnreachable(_)));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn test_restore_list_failure_is_typed() {
    let remote = FakeRemote::new();
    remote.fail_list(server_error());
    let engine = common::setup_with(&remote, settings(0, false)).await;

    let err = engine.restore(&online("agent-1")).await.unwrap_err();
    assert!(matches!(
        err,
        SubmissionError::RemoteServerError { status: 503, .. }
    ));
}
