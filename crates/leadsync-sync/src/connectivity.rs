//! Connectivity monitor
//!
//! Holds the latest reachability verdict and fans out changes to
//! registered callbacks and watch subscribers. Something else decides
//! reachability: the probe loop in [`crate::scheduler`], or a test.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use leadsync_core::ports::{IConnectivityOracle, Transition, TransitionCallback};
use tokio::sync::watch;
use tracing::info;

/// In-process [`IConnectivityOracle`] fed by [`ConnectivityMonitor::set_online`]
pub struct ConnectivityMonitor {
    online: AtomicBool,
    callbacks: Mutex<Vec<TransitionCallback>>,
    sender: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with an initial verdict
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self {
            online: AtomicBool::new(online),
            callbacks: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// Records a new verdict
    ///
    /// Returns the transition when the state actually changed; callbacks and
    /// subscribers are only notified in that case. Callbacks run on the
    /// caller's thread and must not register further callbacks.
    pub fn set_online(&self, online: bool) -> Option<Transition> {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return None;
        }

        let transition = if online {
            Transition::WentOnline
        } else {
            Transition::WentOffline
        };
        info!(%transition, "Connectivity changed");

        self.sender.send_replace(online);
        let callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for callback in callbacks.iter() {
            callback(transition);
        }
        Some(transition)
    }

    /// Subscribes to reachability changes
    ///
    /// The receiver starts at the current verdict.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl IConnectivityOracle for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn on_transition(&self, callback: TransitionCallback) {
        self.callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(callback);
    }
}
