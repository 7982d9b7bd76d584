//! Connectivity oracle port
//!
//! Reachability is only ever a hint: a remote call made while "online" can
//! still fail mid-flight, and callers must handle that.

use std::fmt;

use serde::Serialize;

/// A change in reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    WentOnline,
    WentOffline,
}

impl Transition {
    /// The reachability after the transition
    pub fn is_online(&self) -> bool {
        matches!(self, Transition::WentOnline)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::WentOnline => write!(f, "online"),
            Transition::WentOffline => write!(f, "offline"),
        }
    }
}

/// Callback invoked on every reachability change
pub type TransitionCallback = Box<dyn Fn(Transition) + Send + Sync>;

/// Port trait for network reachability
pub trait IConnectivityOracle: Send + Sync {
    /// Point-in-time reachability hint
    fn is_online(&self) -> bool;

    /// Registers a callback fired on each actual change
    ///
    /// Setting the same state twice does not fire.
    fn on_transition(&self, callback: TransitionCallback);
}

/// Port trait for an active reachability check
///
/// Polled by the connectivity monitor loop to feed [`IConnectivityOracle`]
/// implementations that cannot observe the network themselves.
#[async_trait::async_trait]
pub trait IReachabilityProbe: Send + Sync {
    /// Returns true if the server answered in time
    async fn check(&self) -> bool;
}
