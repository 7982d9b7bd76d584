//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including identifier validation, ownership checks and the field-level
//! validation messages returned by the remote service.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid client-local identifier
    #[error("Invalid client ID: {0}")]
    InvalidClientId(String),

    /// Invalid server-assigned identifier
    #[error("Invalid server ID: {0}")]
    InvalidServerId(String),

    /// Invalid owner (user) identifier
    #[error("Invalid owner ID: {0}")]
    InvalidOwnerId(String),

    /// A server ID was already assigned and a different one was offered
    #[error("Server ID already assigned: {current} (attempted {attempted})")]
    ServerIdAlreadyAssigned {
        /// The identity the record already carries
        current: i64,
        /// The identity that was offered
        attempted: i64,
    },

    /// The caller does not own the record
    #[error("Submission {client_id} is not owned by {owner}")]
    NotOwner {
        /// The record's client ID
        client_id: String,
        /// The caller that attempted the access
        owner: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Field-level validation messages, keyed by form field name
///
/// Carried verbatim from the remote service so the form can show them
/// next to the offending inputs. A `BTreeMap` keeps display order stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Creates an empty set of field errors
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message for a field
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Builder-style variant of [`push`](Self::push)
    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.push(field, message);
        self
    }

    /// Messages for a single field
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Iterates over `(field, messages)` pairs in field order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<BTreeMap<String, Vec<String>>> for FieldErrors {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}
