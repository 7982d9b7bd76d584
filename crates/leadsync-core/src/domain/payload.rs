//! Lead-sheet payload
//!
//! The form data captured in the field. Field-level validation belongs to the
//! form layer and the server; this module only enforces the few structural
//! rules the sync engine relies on (a lead must identify a person, the bill
//! amount cannot be negative). Unknown form fields are carried opaquely in
//! [`LeadPayload::extra`] so newer forms round-trip through older builds.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::DomainError;

/// Contact details of the prospect
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

impl ContactInfo {
    /// Full name as shown in listings ("First Last", trimmed)
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// Property and decision data used for qualification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_homeowner: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_makers_present: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utility_provider: Option<String>,
}

/// Reference to a photo attached to the lead
///
/// Photos are captured and uploaded elsewhere; the submission only carries
/// their location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl PhotoRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            caption: None,
        }
    }
}

/// The full lead-sheet form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPayload {
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub property: PropertyInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_bill: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<PhotoRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Additional form fields carried without interpretation
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LeadPayload {
    /// Creates a payload for a named prospect
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            contact: ContactInfo {
                first_name: first_name.into(),
                last_name: last_name.into(),
                ..ContactInfo::default()
            },
            ..Self::default()
        }
    }

    /// Sets the phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.contact.phone = Some(phone.into());
        self
    }

    /// Sets the email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.contact.email = Some(email.into());
        self
    }

    /// Sets the monthly utility bill amount
    pub fn with_monthly_bill(mut self, amount: f64) -> Self {
        self.monthly_bill = Some(amount);
        self
    }

    /// Sets the free-text notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Checks the structural rules the engine depends on
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` when the lead has no name or a
    /// negative or non-finite bill amount
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.contact.display_name().is_empty() {
            return Err(DomainError::ValidationFailed(
                "a lead needs at least a first or last name".to_string(),
            ));
        }
        if let Some(bill) = self.monthly_bill {
            if !bill.is_finite() || bill < 0.0 {
                return Err(DomainError::ValidationFailed(format!(
                    "monthly bill must be a non-negative amount, got {bill}"
                )));
            }
        }
        Ok(())
    }
}
