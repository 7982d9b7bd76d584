//! LeadSync Remote - CRM submissions API client
//!
//! Provides async clients for:
//! - Creating, updating, deleting and listing lead submissions
//! - Probing whether the server is reachable
//!
//! ## Modules
//!
//! - [`client`] - HTTP implementation of `IRemoteSubmissionService`
//! - [`probe`] - HTTP implementation of `IReachabilityProbe`
//!
//! Failures are reported as `leadsync_core::ports::RemoteError`, classified
//! from the transport error or HTTP status so the sync engine never has to
//! inspect message text.

pub mod client;
pub mod probe;

pub use client::HttpSubmissionService;
pub use probe::ReachabilityProbe;
