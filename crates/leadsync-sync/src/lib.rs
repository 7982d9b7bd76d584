//! LeadSync Sync - Offline-first submission synchronization
//!
//! Provides:
//! - Capture, edit and delete of lead sheets with or without connectivity
//! - Per-record and bulk synchronization with the CRM server
//! - Client-ID to server-ID reconciliation
//! - Restoration of a user's records onto a new device
//! - Connectivity tracking and reconnect-triggered sync
//!
//! ## Modules
//!
//! - [`engine`] - Sync orchestrator exposed to the UI layer
//! - [`identity`] - Create-vs-update decisions and server ID reconciliation
//! - [`restore`] - Pulls server records into the local store
//! - [`connectivity`] - Reachability state with change notifications
//! - [`scheduler`] - Probe loop and automatic bulk sync triggers
//! - [`locks`] - Per-record async locks

pub mod connectivity;
pub mod context;
pub mod engine;
pub mod identity;
pub mod locks;
pub mod restore;
pub mod scheduler;

pub use connectivity::ConnectivityMonitor;
pub use context::SyncContext;
pub use engine::{
    EngineSettings, SaveOutcome, SyncAction, SyncAllReport, SyncEngine, SyncOutcome, SyncStatus,
};
pub use identity::{IdentityConflict, IdentityDecision, IdentityResolver, RemoteAction};
pub use restore::{RestoreReport, RestoreService};
pub use scheduler::{run_probe_loop, AutoSyncScheduler, SchedulerSettings, SyncTrigger};
