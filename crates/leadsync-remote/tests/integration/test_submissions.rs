//! Tests for create/update/delete/list against a mocked submissions API

use std::time::Duration;

use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use leadsync_core::domain::{ClientId, LeadPayload, OwnerId, ServerId};
use leadsync_core::ports::{IRemoteSubmissionService, RemoteError};
use leadsync_core::SubmissionError;
use leadsync_remote::HttpSubmissionService;

use crate::common::{mount_create, mount_status, record_json, setup_api_mock};

fn owner() -> OwnerId {
    OwnerId::new("agent-1").unwrap()
}

#[tokio::test]
async fn test_create_sends_client_id_and_returns_server_id() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("POST"))
        .and(path("/submissions"))
        .and(body_partial_json(serde_json::json!({
            "client_id": "c-1",
            "owner_id": "agent-1",
            "payload": {"contact": {"first_name": "Ana"}}
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(record_json(101, Some("c-1"), "agent-1", "Ana")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let record = client
        .create(
            &owner(),
            &ClientId::new("c-1").unwrap(),
            &LeadPayload::new("Ana", "Ruiz"),
        )
        .await
        .unwrap();

    assert_eq!(record.server_id.as_i64(), 101);
    assert_eq!(record.client_id.unwrap().as_str(), "c-1");
}

#[tokio::test]
async fn test_create_sends_bearer_token() {
    let (server, client) = setup_api_mock().await;
    mount_create(&server, record_json(5, None, "agent-1", "Ana")).await;

    let record = client
        .create(
            &owner(),
            &ClientId::new("c-2").unwrap(),
            &LeadPayload::new("Ana", "Ruiz"),
        )
        .await
        .unwrap();
    assert_eq!(record.server_id.as_i64(), 5);
}

#[tokio::test]
async fn test_update_puts_to_record_path() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("PUT"))
        .and(path("/submissions/77"))
        .and(body_partial_json(serde_json::json!({
            "payload": {"notes": "second visit"}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record_json(77, Some("c-1"), "agent-1", "Ana")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let payload = LeadPayload::new("Ana", "Ruiz").with_notes("second visit");
    let record = client
        .update(ServerId::new(77).unwrap(), &payload)
        .await
        .unwrap();
    assert_eq!(record.server_id.as_i64(), 77);
}

#[tokio::test]
async fn test_delete_accepts_no_content() {
    let (server, client) = setup_api_mock().await;
    mount_status(&server, "DELETE", "/submissions/9", 204, "").await;

    client.delete(ServerId::new(9).unwrap()).await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_is_not_found() {
    let (server, client) = setup_api_mock().await;
    mount_status(&server, "DELETE", "/submissions/9", 404, "").await;

    let err = client.delete(ServerId::new(9).unwrap()).await.unwrap_err();
    assert_eq!(err, RemoteError::NotFound);
}

#[tokio::test]
async fn test_list_filters_by_owner_and_accepts_bare_array() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/submissions"))
        .and(query_param("owner_id", "agent-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            record_json(1, Some("c-1"), "agent-1", "Ana"),
            record_json(2, None, "agent-1", "Bea"),
        ])))
        .mount(&server)
        .await;

    let records = client.list(&owner()).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[1].client_id.is_none());
}

#[tokio::test]
async fn test_list_accepts_paginated_envelope() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/submissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "next": null,
            "results": [record_json(3, Some("c-3"), "agent-1", "Cy")]
        })))
        .mount(&server)
        .await;

    let records = client.list(&owner()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payload.contact.first_name, "Cy");
}

// ============================================================================
// Error classification
// ============================================================================

#[tokio::test]
async fn test_validation_errors_are_carried_verbatim() {
    let (server, client) = setup_api_mock().await;
    mount_status(
        &server,
        "POST",
        "/submissions",
        400,
        r#"{"email": ["Enter a valid email address."], "zip_code": ["Ensure this field has no more than 10 characters."]}"#,
    )
    .await;

    let err = client
        .create(
            &owner(),
            &ClientId::new("c-1").unwrap(),
            &LeadPayload::new("Ana", "Ruiz"),
        )
        .await
        .unwrap_err();

    match err {
        RemoteError::Validation(fields) => {
            assert_eq!(
                fields.get("email").unwrap(),
                &["Enter a valid email address.".to_string()]
            );
            assert_eq!(
                fields.get("zip_code").unwrap(),
                &["Ensure this field has no more than 10 characters.".to_string()]
            );
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_conflict_is_a_rejection_not_a_retry() {
    let (server, client) = setup_api_mock().await;
    mount_status(
        &server,
        "POST",
        "/submissions",
        409,
        r#"{"phone": ["A lead with this phone number already exists."]}"#,
    )
    .await;

    let err = client
        .create(
            &owner(),
            &ClientId::new("c-1").unwrap(),
            &LeadPayload::new("Ana", "Ruiz"),
        )
        .await
        .unwrap_err();

    assert!(!err.is_transient());
    match &err {
        RemoteError::Validation(fields) => assert_eq!(
            fields.get("phone").unwrap(),
            &["A lead with this phone number already exists.".to_string()]
        ),
        other => panic!("expected validation error, got {other:?}"),
    }
    let err = SubmissionError::from(err);
    assert!(!err.is_retryable());
    assert!(err.needs_user_edit());
}

#[tokio::test]
async fn test_payload_too_large_is_a_rejection_not_a_retry() {
    let (server, client) = setup_api_mock().await;
    mount_status(&server, "PUT", "/submissions/8", 413, "").await;

    let err = client
        .update(ServerId::new(8).unwrap(), &LeadPayload::new("Ana", "Ruiz"))
        .await
        .unwrap_err();

    match &err {
        RemoteError::Validation(fields) => {
            let messages = fields.get("non_field_errors").unwrap();
            assert!(messages[0].contains("413"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(!SubmissionError::from(err).is_retryable());
}

#[tokio::test]
async fn test_throttling_stays_transient() {
    let (server, client) = setup_api_mock().await;
    mount_status(&server, "GET", "/submissions", 429, "slow down").await;

    let err = client.list(&owner()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Server { status: 429, .. }));
    assert!(SubmissionError::from(err).is_retryable());
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup_api_mock().await;
    mount_status(&server, "PUT", "/submissions/4", 503, "maintenance").await;

    let err = client
        .update(ServerId::new(4).unwrap(), &LeadPayload::new("Ana", "Ruiz"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RemoteError::Server {
            status: 503,
            message: "maintenance".to_string()
        }
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unauthorized() {
    let (server, client) = setup_api_mock().await;
    mount_status(&server, "GET", "/submissions", 401, "token expired").await;

    let err = client.list(&owner()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized(msg) if msg.contains("token expired")));
}

#[tokio::test]
async fn test_malformed_body_is_server_error() {
    let (server, client) = setup_api_mock().await;
    mount_status(&server, "GET", "/submissions", 200, "<html>proxy login</html>").await;

    let err = client.list(&owner()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Server { status: 200, .. }));
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let (server, _) = setup_api_mock().await;
    Mock::given(method("GET"))
        .and(path("/submissions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = HttpSubmissionService::with_timeout(server.uri(), None, Duration::from_millis(50));
    let err = client.list(&owner()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Network(_)));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Port 9 (discard) on localhost is closed on test machines.
    let client = HttpSubmissionService::with_timeout("http://127.0.0.1:9", None, Duration::from_secs(2));
    let err = client.list(&owner()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Network(_)));
}
