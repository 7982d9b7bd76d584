//! Remote submission service port (driven/secondary port)
//!
//! This module defines the interface to the CRM server-of-record. The engine
//! treats it as an opaque create/update/delete/list service.
//!
//! ## Design Notes
//!
//! - `create` sends the device's client ID so the server can echo it back;
//!   restoration uses the echo to recover creates whose response was lost.
//! - [`RemoteError`] classifies failures so the engine can tell transient
//!   problems (retry later) from validation problems (user must edit).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ClientId, FieldErrors, LeadPayload, OwnerId, ServerId};

/// A submission as the server holds it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSubmission {
    /// Server-assigned identifier
    #[serde(rename = "id")]
    pub server_id: ServerId,
    /// Client ID sent with the original create, when the server kept it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    /// Owner of the record
    pub owner_id: OwnerId,
    /// Form data
    pub payload: LeadPayload,
    /// Last modification time on the server
    pub updated_at: DateTime<Utc>,
}

/// Failures reported by the remote service
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RemoteError {
    /// No response was received (connection failure or timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The server refused the payload (HTTP 400/422, or any other 4xx
    /// besides 401/403/404/429)
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// The record does not exist on the server (HTTP 404)
    #[error("Not found on server")]
    NotFound,

    /// The caller is not authenticated or not allowed (HTTP 401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The server failed or is throttling (HTTP 5xx/429, or an unreadable body)
    #[error("Server error {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },
}

impl RemoteError {
    /// Returns true if retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Network(_) | RemoteError::Server { .. })
    }
}

/// Port trait for the server-of-record
#[async_trait::async_trait]
pub trait IRemoteSubmissionService: Send + Sync {
    /// Creates a new record and returns it with its server ID
    async fn create(
        &self,
        owner_id: &OwnerId,
        client_id: &ClientId,
        payload: &LeadPayload,
    ) -> Result<RemoteSubmission, RemoteError>;

    /// Replaces the payload of an existing record
    async fn update(
        &self,
        server_id: ServerId,
        payload: &LeadPayload,
    ) -> Result<RemoteSubmission, RemoteError>;

    /// Deletes a record
    async fn delete(&self, server_id: ServerId) -> Result<(), RemoteError>;

    /// Lists all records of an owner
    async fn list(&self, owner_id: &OwnerId) -> Result<Vec<RemoteSubmission>, RemoteError>;
}
