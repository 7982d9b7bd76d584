//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for the identifiers a
//! submission carries. Each newtype ensures data validity at construction
//! time, and [`SubmissionKey`] replaces ad hoc string prefixes with a tagged
//! variant so a local key can never be mistaken for a server key.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// ClientId
// ============================================================================

/// Device-generated identifier assigned at capture time
///
/// Opaque to everything but equality. Freshly captured records get a UUID v4,
/// but identifiers echoed back by the server are accepted as any non-empty
/// string without whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Generate a new random ClientId
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a ClientId from an existing string
    ///
    /// # Errors
    /// Returns `DomainError::InvalidClientId` if the string is empty or
    /// contains whitespace
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidClientId(
                "Client ID cannot be empty".to_string(),
            ));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidClientId(format!(
                "Client ID contains whitespace: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ClientId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

// ============================================================================
// ServerId
// ============================================================================

/// Identifier assigned by the server-of-record once a create succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ServerId(i64);

impl ServerId {
    /// Create a ServerId, validating it is positive
    ///
    /// # Errors
    /// Returns `DomainError::InvalidServerId` for zero or negative values
    pub fn new(id: i64) -> Result<Self, DomainError> {
        if id <= 0 {
            return Err(DomainError::InvalidServerId(format!(
                "Server ID must be positive: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner i64 value
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for ServerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServerId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .parse::<i64>()
            .map_err(|e| DomainError::InvalidServerId(format!("Invalid ServerId: {e}")))?;
        Self::new(id)
    }
}

impl TryFrom<i64> for ServerId {
    type Error = DomainError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<ServerId> for i64 {
    fn from(id: ServerId) -> Self {
        id.0
    }
}

// ============================================================================
// OwnerId
// ============================================================================

/// Identifier of the authenticated user who captured a submission
///
/// Every stored record carries one; every read is scoped by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Create an OwnerId
    ///
    /// # Errors
    /// Returns `DomainError::InvalidOwnerId` if the value is blank
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidOwnerId(
                "Owner ID cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OwnerId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<OwnerId> for String {
    fn from(id: OwnerId) -> Self {
        id.0
    }
}

// ============================================================================
// SubmissionKey
// ============================================================================

/// Key used to address a submission in the local store
///
/// `Local` is the primary key in both collections; `Remote` is the secondary
/// lookup that exists once the server has accepted the record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubmissionKey {
    /// Client-local identifier
    Local(ClientId),
    /// Server-assigned identifier
    Remote(ServerId),
}

impl SubmissionKey {
    /// Returns the client ID if this is a local key
    pub fn client_id(&self) -> Option<&ClientId> {
        match self {
            SubmissionKey::Local(id) => Some(id),
            SubmissionKey::Remote(_) => None,
        }
    }

    /// Returns the server ID if this is a remote key
    pub fn server_id(&self) -> Option<ServerId> {
        match self {
            SubmissionKey::Local(_) => None,
            SubmissionKey::Remote(id) => Some(*id),
        }
    }
}

impl Display for SubmissionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionKey::Local(id) => write!(f, "local:{id}"),
            SubmissionKey::Remote(id) => write!(f, "remote:{id}"),
        }
    }
}

impl From<ClientId> for SubmissionKey {
    fn from(id: ClientId) -> Self {
        SubmissionKey::Local(id)
    }
}

impl From<ServerId> for SubmissionKey {
    fn from(id: ServerId) -> Self {
        SubmissionKey::Remote(id)
    }
}
