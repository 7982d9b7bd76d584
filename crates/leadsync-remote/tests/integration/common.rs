//! Shared test helpers for submissions API integration tests
//!
//! Provides wiremock-based mock server setup. Each helper mounts the
//! necessary mock endpoints; [`setup_api_mock`] returns a client pointing at
//! the mock server.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leadsync_remote::HttpSubmissionService;

pub const TEST_TOKEN: &str = "test-api-token";

/// Starts a mock server and returns a (MockServer, client) tuple.
pub async fn setup_api_mock() -> (MockServer, HttpSubmissionService) {
    let server = MockServer::start().await;
    let client = HttpSubmissionService::new(server.uri(), Some(TEST_TOKEN.to_string()));
    (server, client)
}

/// JSON body of a server-side record
pub fn record_json(id: i64, client_id: Option<&str>, owner_id: &str, first_name: &str) -> serde_json::Value {
    let mut record = serde_json::json!({
        "id": id,
        "owner_id": owner_id,
        "payload": {
            "contact": {"first_name": first_name, "last_name": "Ruiz"}
        },
        "updated_at": "2024-03-01T10:00:00Z"
    });
    if let Some(client_id) = client_id {
        record["client_id"] = serde_json::Value::String(client_id.to_string());
    }
    record
}

/// Mounts `POST /submissions` answering with the given record.
pub async fn mount_create(server: &MockServer, response: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/submissions"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(201).set_body_json(response))
        .mount(server)
        .await;
}

/// Mounts any method on `path` answering with a bare status and body.
pub async fn mount_status(server: &MockServer, http_method: &str, route: &str, status: u16, body: &str) {
    Mock::given(method(http_method))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}
