//! Error taxonomy for UI-facing operations
//!
//! Every operation the sync engine exposes returns [`SubmissionError`]. The
//! variants map one-to-one onto how the UI should react: retry later, show
//! field messages, or stop.

use thiserror::Error;

use crate::domain::{ClientId, DomainError, FieldErrors, ServerId};
use crate::ports::{RemoteError, StoreError};

/// Errors returned by submission operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubmissionError {
    /// The local store failed; the operation did not happen
    #[error("Local storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The server could not be reached; the record stays where it is
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// The server rejected the payload; the user has to edit it
    #[error("Submission rejected: {0}")]
    RemoteValidation(FieldErrors),

    /// The server failed; the record stays where it is
    #[error("Server error {status}: {message}")]
    RemoteServerError {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Two server identities were seen for one record; the most recently
    /// confirmed one was kept
    #[error("Identity conflict for {client_id}: kept {kept}, discarded {discarded}")]
    IdentityConflict {
        client_id: ClientId,
        kept: ServerId,
        discarded: ServerId,
    },

    /// Nobody is signed in, or the server refused the credentials
    #[error("Not authenticated")]
    Unauthenticated,

    /// No record with this client ID exists for the caller
    #[error("Submission not found: {0}")]
    NotFound(ClientId),

    /// A bulk sync is already running
    #[error("A sync is already in progress")]
    SyncInProgress,

    /// A domain rule was violated
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl SubmissionError {
    /// Returns true if the same operation may succeed later without edits
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubmissionError::NetworkUnreachable(_)
                | SubmissionError::RemoteServerError { .. }
                | SubmissionError::SyncInProgress
        )
    }

    /// Returns true if the user must change the form before retrying
    pub fn needs_user_edit(&self) -> bool {
        matches!(
            self,
            SubmissionError::RemoteValidation(_) | SubmissionError::Domain(_)
        )
    }

    /// Short guidance for the person holding the device
    pub fn user_hint(&self) -> String {
        match self {
            SubmissionError::StorageUnavailable(_) => {
                "The device could not save this lead. Free up space or restart the app before trying again.".to_string()
            }
            SubmissionError::NetworkUnreachable(_) => {
                "Saved on this device. It will be sent when the connection returns.".to_string()
            }
            SubmissionError::RemoteValidation(fields) => {
                format!("Please correct these fields: {fields}")
            }
            SubmissionError::RemoteServerError { .. } => {
                "Saved on this device. The server had a problem; it will be retried.".to_string()
            }
            SubmissionError::IdentityConflict { .. } => {
                "This lead was matched to a newer server record.".to_string()
            }
            SubmissionError::Unauthenticated => "Sign in again to continue.".to_string(),
            SubmissionError::NotFound(_) => "This lead no longer exists on this device.".to_string(),
            SubmissionError::SyncInProgress => {
                "A sync is already running. Try again when it finishes.".to_string()
            }
            SubmissionError::Domain(err) => format!("Check the form: {err}"),
        }
    }
}

impl From<StoreError> for SubmissionError {
    fn from(err: StoreError) -> Self {
        SubmissionError::StorageUnavailable(err.to_string())
    }
}

impl From<RemoteError> for SubmissionError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Network(msg) => SubmissionError::NetworkUnreachable(msg),
            RemoteError::Validation(fields) => SubmissionError::RemoteValidation(fields),
            RemoteError::Server { status, message } => {
                SubmissionError::RemoteServerError { status, message }
            }
            RemoteError::Unauthorized(_) => SubmissionError::Unauthenticated,
            // Callers that can name the record map NotFound themselves.
            RemoteError::NotFound => SubmissionError::RemoteServerError {
                status: 404,
                message: "record not found on server".to_string(),
            },
        }
    }
}
