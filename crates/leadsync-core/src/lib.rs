//! LeadSync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Submission`, `LeadPayload`, typed identifiers
//! - **Port definitions** - Traits for adapters: `ISubmissionStore`,
//!   `IRemoteSubmissionService`, `IConnectivityOracle`, `ISessionProvider`
//! - **Error taxonomy** - [`SubmissionError`], the typed error every
//!   UI-facing operation returns
//! - **Configuration** - YAML-backed [`config::Config`]
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`leadsync-cache` for local storage, `leadsync-remote` for the CRM API).
//! The sync engine in `leadsync-sync` orchestrates domain entities through
//! these ports.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use error::SubmissionError;
