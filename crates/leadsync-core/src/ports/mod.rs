//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. The sync engine depends only on these traits;
//! their implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ISubmissionStore`] - Durable on-device storage of pending and synced records
//! - [`IRemoteSubmissionService`] - The CRM server-of-record
//! - [`IConnectivityOracle`] - Network reachability hint and transitions
//! - [`IReachabilityProbe`] - Active check that feeds the oracle
//! - [`ISessionProvider`] - Who the current caller is

pub mod connectivity;
pub mod remote_service;
pub mod session;
pub mod submission_store;

pub use connectivity::{IConnectivityOracle, IReachabilityProbe, Transition, TransitionCallback};
pub use remote_service::{IRemoteSubmissionService, RemoteError, RemoteSubmission};
pub use session::ISessionProvider;
pub use submission_store::{ISubmissionStore, StoreCounts, StoreError, SubmissionFilter};
