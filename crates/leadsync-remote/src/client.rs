//! CRM submissions API client
//!
//! Provides a typed HTTP client for the lead submissions endpoints.
//! Handles authentication headers, JSON (de)serialization, endpoint
//! construction and the mapping of failures onto [`RemoteError`]: 429 and
//! 5xx are transient, every other 4xx is a rejection the user must fix.
//!
//! ## Endpoints
//!
//! | Operation | Request                               |
//! |-----------|---------------------------------------|
//! | create    | `POST /submissions`                   |
//! | update    | `PUT /submissions/{id}`               |
//! | delete    | `DELETE /submissions/{id}`            |
//! | list      | `GET /submissions?owner_id={owner}`   |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use leadsync_remote::HttpSubmissionService;
//! use leadsync_core::domain::OwnerId;
//! use leadsync_core::ports::IRemoteSubmissionService;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = HttpSubmissionService::new("https://crm.example.com/api", Some("token".into()));
//! let records = client.list(&OwnerId::new("agent-7")?).await?;
//! println!("{} records on the server", records.len());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use leadsync_core::config::RemoteConfig;
use leadsync_core::domain::{ClientId, FieldErrors, LeadPayload, OwnerId, ServerId};
use leadsync_core::ports::{IRemoteSubmissionService, RemoteError, RemoteSubmission};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Request timeout used when none is configured
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Field name used when the server rejects a payload without naming a field
const NON_FIELD_ERRORS: &str = "non_field_errors";

// ============================================================================
// Wire types
// ============================================================================

/// Body of `POST /submissions`
#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    client_id: &'a ClientId,
    owner_id: &'a OwnerId,
    payload: &'a LeadPayload,
}

/// Body of `PUT /submissions/{id}`
#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    payload: &'a LeadPayload,
}

/// `GET /submissions` answers either with a bare array or a paginated envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Page { results: Vec<RemoteSubmission> },
    Bare(Vec<RemoteSubmission>),
}

impl ListResponse {
    fn into_records(self) -> Vec<RemoteSubmission> {
        match self {
            ListResponse::Page { results } => results,
            ListResponse::Bare(records) => records,
        }
    }
}

/// Validation bodies come as `{"errors": {...}}` or as the field map itself
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ValidationBody {
    Wrapped { errors: BTreeMap<String, FieldMessages> },
    Flat(BTreeMap<String, FieldMessages>),
}

/// A field may carry one message or a list of them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldMessages {
    One(String),
    Many(Vec<String>),
}

// ============================================================================
// Error classification
// ============================================================================

/// Maps a transport failure (no usable response) onto [`RemoteError`]
fn classify_transport(err: &reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Network(format!("request timed out: {err}"))
    } else if err.is_connect() {
        RemoteError::Network(format!("connection failed: {err}"))
    } else {
        RemoteError::Network(err.to_string())
    }
}

/// Parses a 400/422 body into field errors, keeping messages verbatim
fn parse_validation_body(body: &str) -> FieldErrors {
    let map = match serde_json::from_str::<ValidationBody>(body) {
        Ok(ValidationBody::Wrapped { errors }) => errors,
        Ok(ValidationBody::Flat(map)) => map,
        Err(_) => {
            let message = if body.trim().is_empty() {
                "The server rejected this submission.".to_string()
            } else {
                body.trim().to_string()
            };
            return FieldErrors::new().with(NON_FIELD_ERRORS, message);
        }
    };

    let mut errors = FieldErrors::new();
    for (field, messages) in map {
        match messages {
            FieldMessages::One(message) => errors.push(field.clone(), message),
            FieldMessages::Many(list) => {
                for message in list {
                    errors.push(field.clone(), message);
                }
            }
        }
    }
    errors
}

/// Field errors for a 4xx answer outside the validation statuses
fn parse_rejection(status: StatusCode, body: &str) -> FieldErrors {
    if body.trim().is_empty() {
        return FieldErrors::new().with(
            NON_FIELD_ERRORS,
            format!("The server rejected this submission ({status})."),
        );
    }
    parse_validation_body(body)
}

/// Maps a non-success HTTP status and body onto [`RemoteError`]
fn classify_status(status: StatusCode, body: String) -> RemoteError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteError::Validation(parse_validation_body(&body))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized(format!(
            "{}: {}",
            status.as_u16(),
            body.trim()
        )),
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        // Any other refusal (409 duplicate, 413 payload too large, ...) stays
        // refused until the lead is changed.
        s if s.is_client_error() && s != StatusCode::TOO_MANY_REQUESTS => {
            RemoteError::Validation(parse_rejection(status, &body))
        }
        _ => RemoteError::Server {
            status: status.as_u16(),
            message: body.trim().to_string(),
        },
    }
}

// ============================================================================
// HttpSubmissionService
// ============================================================================

/// HTTP client for the CRM submissions API
///
/// Wraps `reqwest::Client` with bearer authentication and base URL
/// construction. Every request inherits the client timeout; a timeout is
/// reported as [`RemoteError::Network`], never as proof that a create did
/// not land.
#[derive(Clone)]
pub struct HttpSubmissionService {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, without a trailing slash
    base_url: String,
    /// Bearer token, when the session has one
    api_token: Option<String>,
}

impl HttpSubmissionService {
    /// Creates a client with the default timeout
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://crm.example.com/api`
    /// * `api_token` - Bearer token sent with every request
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Self {
        Self::with_timeout(base_url, api_token, DEFAULT_TIMEOUT)
    }

    /// Creates a client with an explicit per-request timeout
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build configured HTTP client, using defaults");
                Client::new()
            });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        }
    }

    /// Creates a client from the `remote` configuration section
    pub fn from_config(config: &RemoteConfig, api_token: Option<String>) -> Self {
        Self::with_timeout(config.base_url.clone(), api_token, config.timeout())
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization header.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, &url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and returns the response if its status is a success
    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let response = builder.send().await.map_err(|e| classify_transport(&e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify_status(status, body);
        debug!(status = status.as_u16(), error = %err, "Request failed");
        Err(err)
    }

    /// Decodes a success body
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| classify_transport(&e))?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Server {
            status,
            message: format!("unreadable response body: {e}"),
        })
    }
}

#[async_trait::async_trait]
impl IRemoteSubmissionService for HttpSubmissionService {
    async fn create(
        &self,
        owner_id: &OwnerId,
        client_id: &ClientId,
        payload: &LeadPayload,
    ) -> Result<RemoteSubmission, RemoteError> {
        debug!(%client_id, %owner_id, "POST /submissions");
        let body = CreateRequest {
            client_id,
            owner_id,
            payload,
        };
        let response = self
            .send(self.request(Method::POST, "/submissions").json(&body))
            .await?;
        let record: RemoteSubmission = Self::decode(response).await?;
        debug!(%client_id, server_id = %record.server_id, "Created submission on server");
        Ok(record)
    }

    async fn update(
        &self,
        server_id: ServerId,
        payload: &LeadPayload,
    ) -> Result<RemoteSubmission, RemoteError> {
        let path = format!("/submissions/{server_id}");
        debug!(%server_id, "PUT {}", path);
        let response = self
            .send(self.request(Method::PUT, &path).json(&UpdateRequest { payload }))
            .await?;
        Self::decode(response).await
    }

    async fn delete(&self, server_id: ServerId) -> Result<(), RemoteError> {
        let path = format!("/submissions/{server_id}");
        debug!(%server_id, "DELETE {}", path);
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn list(&self, owner_id: &OwnerId) -> Result<Vec<RemoteSubmission>, RemoteError> {
        debug!(%owner_id, "GET /submissions");
        let response = self
            .send(
                self.request(Method::GET, "/submissions")
                    .query(&[("owner_id", owner_id.as_str())]),
            )
            .await?;
        let list: ListResponse = Self::decode(response).await?;
        let records = list.into_records();
        debug!(%owner_id, count = records.len(), "Listed submissions");
        Ok(records)
    }
}
