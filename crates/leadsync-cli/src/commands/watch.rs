//! Watch command - Keep syncing while the process runs
//!
//! Polls the server's health endpoint, syncs every lead when the server
//! becomes reachable and again on the background interval. Ctrl-C stops both
//! loops; a bulk sync in progress stops after its current lead.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use leadsync_core::ports::IConnectivityOracle;
use leadsync_sync::{run_probe_loop, AutoSyncScheduler, SchedulerSettings};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::App;
use crate::output::{get_formatter, print_sync_all_report, sync_all_json};
use crate::GlobalOptions;

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Seconds between reachability probes (overrides sync.probe_interval_secs)
    #[arg(long)]
    pub probe_interval: Option<u64>,
}

impl WatchCommand {
    pub async fn execute(&self, options: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(options.format.is_json());
        let app = App::open(options).await?;
        // Fails early when no user is configured.
        app.context_offline()?;

        let mut settings = SchedulerSettings::from_config(&app.config.sync);
        if let Some(seconds) = self.probe_interval.filter(|s| *s > 0) {
            settings.probe_interval = std::time::Duration::from_secs(seconds);
        }

        let json_mode = options.format.is_json();
        app.monitor.on_transition(Box::new(move |transition| {
            if json_mode {
                println!("{}", json!({"event": "connectivity", "state": transition}));
            } else {
                println!("\u{2022} Server is now {transition}");
            }
        }));

        let cancel = CancellationToken::new();
        let (reports_tx, mut reports_rx) = mpsc::channel(8);

        let probe_task = tokio::spawn(run_probe_loop(
            app.probe.clone(),
            Arc::clone(&app.monitor),
            settings.probe_interval,
            cancel.clone(),
        ));
        let scheduler = AutoSyncScheduler::new(
            Arc::clone(&app.engine),
            Arc::clone(&app.monitor),
            app.session.clone(),
            settings,
        )
        .with_reports(reports_tx);
        let scheduler_task = {
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.run(cancel).await })
        };

        if !json_mode {
            formatter.success(&format!("Watching {}", app.config.remote.base_url));
            formatter.info("Press Ctrl-C to stop.");
        }

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, shutting down");
                    cancel.cancel();
                    break;
                }
                Some((trigger, report)) = reports_rx.recv() => {
                    if json_mode {
                        let mut value = sync_all_json(&report);
                        value["event"] = json!("sync");
                        value["trigger"] = json!(trigger.to_string());
                        formatter.print_json(&value);
                    } else {
                        formatter.info(&format!("Sync ({trigger}):"));
                        print_sync_all_report(&*formatter, &report);
                    }
                }
            }
        }

        let _ = probe_task.await;
        let _ = scheduler_task.await;
        app.close().await;
        Ok(())
    }
}
