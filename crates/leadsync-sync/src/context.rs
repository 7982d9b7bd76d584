//! Per-call context
//!
//! Every UI-facing operation receives a [`SyncContext`] instead of reading
//! the current user or the connectivity state from process-wide globals.

use leadsync_core::domain::OwnerId;
use leadsync_core::ports::{IConnectivityOracle, ISessionProvider};
use leadsync_core::SubmissionError;

/// Snapshot of who is calling and whether the network looked reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncContext {
    /// The signed-in user; every read and write is scoped to them
    pub owner_id: OwnerId,
    /// Reachability hint taken when the call started
    pub online: bool,
}

impl SyncContext {
    pub fn new(owner_id: OwnerId, online: bool) -> Self {
        Self { owner_id, online }
    }

    /// Builds a context from the session and connectivity ports
    ///
    /// # Errors
    /// Returns `SubmissionError::Unauthenticated` when nobody is signed in
    pub fn capture(
        session: &dyn ISessionProvider,
        connectivity: &dyn IConnectivityOracle,
    ) -> Result<Self, SubmissionError> {
        let owner_id = session
            .current_user_id()
            .ok_or(SubmissionError::Unauthenticated)?;
        Ok(Self::new(owner_id, connectivity.is_online()))
    }

    /// Same caller, different reachability
    pub fn with_online(&self, online: bool) -> Self {
        Self {
            owner_id: self.owner_id.clone(),
            online,
        }
    }
}
