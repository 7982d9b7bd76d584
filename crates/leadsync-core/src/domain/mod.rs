//! Domain entities and business logic
//!
//! This module contains the core domain types for LeadSync:
//! - Newtypes for type-safe identifiers (`ClientId`, `ServerId`, `OwnerId`)
//! - The tagged [`SubmissionKey`] used for every store lookup
//! - The lead-sheet payload captured in the field
//! - The `Submission` entity and its sync state
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod payload;
pub mod submission;

// Re-export commonly used types
pub use errors::{DomainError, FieldErrors};
pub use newtypes::*;
pub use payload::{ContactInfo, LeadPayload, PhotoRef, PropertyInfo};
pub use submission::{Submission, SyncState};
