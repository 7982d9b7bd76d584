//! Session provider port
//!
//! Authentication itself lives outside this system; the engine only needs
//! to know who the caller is.

use crate::domain::OwnerId;

/// Port trait for the authenticated session
pub trait ISessionProvider: Send + Sync {
    /// The signed-in user, or `None` when nobody is signed in
    fn current_user_id(&self) -> Option<OwnerId>;
}
