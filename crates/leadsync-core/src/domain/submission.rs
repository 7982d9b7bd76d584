//! Submission domain entity
//!
//! A `Submission` is one captured lead sheet together with the identifiers
//! that tie it to this device and to the server-of-record.
//!
//! ## State Machine
//!
//! ```text
//!                 offline / failed submit
//!     capture ─────────────────────────────► ┌──────────┐
//!        │                                   │ Pending  │ ◄── edit
//!        │ online submit ok                  └──────────┘
//!        │                                        │
//!        │                                        │ sync ok (promote)
//!        ▼                                        ▼
//!     ┌──────────┐ ◄──────────────────────────────┘
//!     │  Synced  │ ◄── edit / re-sync (update)
//!     └──────────┘
//!          │ remove (remote delete first)
//!          ▼
//!       purged
//! ```
//!
//! The state is not a free-floating flag: it names the collection the record
//! lives in, and the store sets it on every read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{ClientId, OwnerId, ServerId, SubmissionKey};
use super::payload::LeadPayload;

// ============================================================================
// SyncState
// ============================================================================

/// Which local collection a submission belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Saved on the device, not yet confirmed by the server
    #[default]
    Pending,
    /// Confirmed by the server; carries a server ID
    Synced,
}

impl SyncState {
    /// Returns the state name as stored and displayed
    pub fn name(&self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::Synced => "synced",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SyncState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncState::Pending),
            "synced" => Ok(SyncState::Synced),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown sync state: {other}"
            ))),
        }
    }
}

// ============================================================================
// Submission
// ============================================================================

/// A lead sheet captured on this device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    client_id: ClientId,
    server_id: Option<ServerId>,
    owner_id: OwnerId,
    payload: LeadPayload,
    captured_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    sync_state: SyncState,
    synced_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Captures a new submission with a freshly generated client ID
    ///
    /// The record starts `Pending`; it becomes `Synced` only once the server
    /// has confirmed it.
    pub fn capture(owner_id: OwnerId, payload: LeadPayload) -> Self {
        Self::with_client_id(ClientId::generate(), owner_id, payload)
    }

    /// Creates a pending submission under an existing client ID
    pub fn with_client_id(client_id: ClientId, owner_id: OwnerId, payload: LeadPayload) -> Self {
        let now = Utc::now();
        Self {
            client_id,
            server_id: None,
            owner_id,
            payload,
            captured_at: now,
            updated_at: now,
            sync_state: SyncState::Pending,
            synced_at: None,
        }
    }

    /// Builds a synced submission from a record the server already holds
    ///
    /// Used by restoration when the device has never seen the record.
    pub fn from_remote(
        client_id: ClientId,
        server_id: ServerId,
        owner_id: OwnerId,
        payload: LeadPayload,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client_id,
            server_id: Some(server_id),
            owner_id,
            payload,
            captured_at: updated_at,
            updated_at,
            sync_state: SyncState::Synced,
            synced_at: Some(Utc::now()),
        }
    }

    // --- Getters ---

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn server_id(&self) -> Option<ServerId> {
        self.server_id
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn payload(&self) -> &LeadPayload {
        &self.payload
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    pub fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.synced_at
    }

    /// Local key of this record
    pub fn local_key(&self) -> SubmissionKey {
        SubmissionKey::Local(self.client_id.clone())
    }

    /// Returns true if the given user captured this record
    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner_id == owner
    }

    /// Fails unless the given user owns this record
    ///
    /// # Errors
    /// Returns `DomainError::NotOwner` for any other user
    pub fn ensure_owner(&self, owner: &OwnerId) -> Result<(), DomainError> {
        if self.is_owned_by(owner) {
            Ok(())
        } else {
            Err(DomainError::NotOwner {
                client_id: self.client_id.to_string(),
                owner: owner.to_string(),
            })
        }
    }

    // --- Mutations ---

    /// Replaces the payload and bumps `updated_at`
    pub fn update_payload(&mut self, payload: LeadPayload) {
        self.payload = payload;
        self.updated_at = Utc::now();
    }

    /// Assigns the server ID the first time it becomes known
    ///
    /// Re-assigning the same ID is a no-op.
    ///
    /// # Errors
    /// Returns `DomainError::ServerIdAlreadyAssigned` if a different ID is
    /// already set
    pub fn assign_server_id(&mut self, server_id: ServerId) -> Result<(), DomainError> {
        match self.server_id {
            None => {
                self.server_id = Some(server_id);
                Ok(())
            }
            Some(current) if current == server_id => Ok(()),
            Some(current) => Err(DomainError::ServerIdAlreadyAssigned {
                current: current.as_i64(),
                attempted: server_id.as_i64(),
            }),
        }
    }

    /// Replaces the server ID with a more recently confirmed one
    ///
    /// Returns the discarded ID. Only the identity resolver calls this, and
    /// only after reporting the conflict.
    pub fn supersede_server_id(&mut self, server_id: ServerId) -> Option<ServerId> {
        self.server_id.replace(server_id)
    }

    /// Records a server confirmation
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` if no server ID is assigned
    pub fn mark_synced(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        if self.server_id.is_none() {
            return Err(DomainError::ValidationFailed(format!(
                "submission {} cannot be synced without a server ID",
                self.client_id
            )));
        }
        self.sync_state = SyncState::Synced;
        self.synced_at = Some(at);
        Ok(())
    }

    /// Overwrites the payload with the server's version
    ///
    /// Keeps `client_id` and `captured_at`; the server timestamp becomes
    /// `updated_at`.
    pub fn apply_remote(&mut self, payload: LeadPayload, updated_at: DateTime<Utc>) {
        self.payload = payload;
        self.updated_at = updated_at;
        self.synced_at = Some(Utc::now());
    }
}
