//! Automatic sync triggers
//!
//! Two loops keep the device in step with the server without user action:
//!
//! ```text
//! ReachabilityProbe ──► run_probe_loop ──► ConnectivityMonitor
//!                                               │ watch
//!                                               ▼
//!                         AutoSyncScheduler ──► SyncEngine::sync_all
//!                               ▲
//!                     background interval
//! ```
//!
//! Both stop when their [`CancellationToken`] is cancelled. The scheduler
//! also asks a running bulk sync to stop and waits for it to wind down.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use leadsync_core::config::SyncConfig;
use leadsync_core::ports::{IConnectivityOracle, IReachabilityProbe, ISessionProvider};
use leadsync_core::SubmissionError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connectivity::ConnectivityMonitor;
use crate::context::SyncContext;
use crate::engine::{SyncAllReport, SyncEngine};

// ============================================================================
// Probe loop
// ============================================================================

/// Polls the probe and feeds the verdict into the monitor until cancelled
pub async fn run_probe_loop(
    probe: Arc<dyn IReachabilityProbe + Send + Sync>,
    monitor: Arc<ConnectivityMonitor>,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!(interval_ms = interval.as_millis() as u64, "Connectivity probe starting");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let online = tokio::select! {
                    _ = cancel.cancelled() => break,
                    online = probe.check() => online,
                };
                debug!(online, "Probe result");
                monitor.set_online(online);
            }
        }
    }
    info!("Connectivity probe stopped");
}

// ============================================================================
// AutoSyncScheduler
// ============================================================================

/// Why a bulk sync was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Startup,
    Reconnect,
    Interval,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTrigger::Startup => write!(f, "startup"),
            SyncTrigger::Reconnect => write!(f, "reconnect"),
            SyncTrigger::Interval => write!(f, "interval"),
        }
    }
}

/// Scheduler tuning taken from the `sync` configuration section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub probe_interval: Duration,
    /// `None` disables periodic syncs
    pub background_interval: Option<Duration>,
    pub auto_sync_on_reconnect: bool,
}

impl SchedulerSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            probe_interval: config.probe_interval(),
            background_interval: config.background_interval(),
            auto_sync_on_reconnect: config.auto_sync_on_reconnect,
        }
    }
}

/// Starts bulk syncs on reconnect and on a fixed interval while online
pub struct AutoSyncScheduler {
    engine: Arc<SyncEngine>,
    monitor: Arc<ConnectivityMonitor>,
    session: Arc<dyn ISessionProvider + Send + Sync>,
    settings: SchedulerSettings,
    reports: Option<mpsc::Sender<(SyncTrigger, SyncAllReport)>>,
}

impl AutoSyncScheduler {
    pub fn new(
        engine: Arc<SyncEngine>,
        monitor: Arc<ConnectivityMonitor>,
        session: Arc<dyn ISessionProvider + Send + Sync>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            engine,
            monitor,
            session,
            settings,
            reports: None,
        }
    }

    /// Sends every finished bulk sync report to `sender`
    pub fn with_reports(mut self, sender: mpsc::Sender<(SyncTrigger, SyncAllReport)>) -> Self {
        self.reports = Some(sender);
        self
    }

    /// Runs until `cancel` fires
    ///
    /// On shutdown a running bulk sync is asked to stop before its next record
    /// and awaited.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            auto_sync_on_reconnect = self.settings.auto_sync_on_reconnect,
            background_secs = self.settings.background_interval.map(|d| d.as_secs()),
            "Auto-sync scheduler starting"
        );

        let mut connectivity = self.monitor.subscribe();
        let mut background = self.settings.background_interval.map(|period| {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let mut in_flight: Option<JoinHandle<()>> = None;

        if self.settings.auto_sync_on_reconnect && self.monitor.is_online() {
            self.trigger(SyncTrigger::Startup, &mut in_flight);
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let online = *connectivity.borrow_and_update();
                    if online && self.settings.auto_sync_on_reconnect {
                        self.trigger(SyncTrigger::Reconnect, &mut in_flight);
                    }
                }
                _ = next_tick(&mut background) => {
                    if self.monitor.is_online() {
                        self.trigger(SyncTrigger::Interval, &mut in_flight);
                    }
                }
            }
        }

        if let Some(handle) = in_flight.take() {
            self.engine.cancel_sync_all();
            if let Err(err) = handle.await {
                warn!(error = %err, "Bulk sync task ended abnormally");
            }
        }
        info!("Auto-sync scheduler stopped");
    }

    /// Spawns a bulk sync unless one started by this scheduler is still running
    fn trigger(&self, trigger: SyncTrigger, in_flight: &mut Option<JoinHandle<()>>) {
        if in_flight.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!(%trigger, "Bulk sync still running, trigger ignored");
            return;
        }

        let Some(owner_id) = self.session.current_user_id() else {
            debug!(%trigger, "Nobody signed in, trigger ignored");
            return;
        };
        let ctx = SyncContext::new(owner_id, self.monitor.is_online());
        let engine = Arc::clone(&self.engine);
        let reports = self.reports.clone();

        info!(%trigger, "Starting automatic bulk sync");
        *in_flight = Some(tokio::spawn(async move {
            match engine.sync_all(&ctx).await {
                Ok(report) => {
                    if let Some(reports) = reports {
                        let _ = reports.send((trigger, report)).await;
                    }
                }
                Err(SubmissionError::SyncInProgress) => {
                    debug!(%trigger, "Another bulk sync is running");
                }
                Err(err) => warn!(%trigger, error = %err, "Automatic bulk sync failed"),
            }
        }));
    }
}

/// Waits for the next background tick, forever if there is no ticker
async fn next_tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
