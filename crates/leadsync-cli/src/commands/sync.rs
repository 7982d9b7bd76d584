//! Sync command - Send lead sheets to the server
//!
//! Provides the `leadsync sync` CLI command which either sends a single lead
//! (`leadsync sync <client-id>`) or runs a bulk sync over every lead of the
//! configured user (`leadsync sync --all`, the default). A bulk sync can be
//! interrupted with Ctrl-C; the lead in flight still completes.

use anyhow::{bail, Result};
use clap::Args;
use leadsync_core::SubmissionError;
use tracing::info;

use super::parse_client_id;
use crate::app::App;
use crate::output::{get_formatter, print_sync_all_report, sync_all_json, sync_outcome_json};
use crate::GlobalOptions;

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Client ID of a single lead to send
    #[arg(conflicts_with = "all")]
    pub client_id: Option<String>,

    /// Send every lead (default when no client ID is given)
    #[arg(long)]
    pub all: bool,
}

impl SyncCommand {
    pub async fn execute(&self, options: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(options.format.is_json());
        let app = App::open(options).await?;
        let ctx = app.context().await?;

        if !ctx.online {
            let reason = if app.force_offline() {
                "--offline was given"
            } else {
                "the server is not reachable"
            };
            return Err(SubmissionError::NetworkUnreachable(reason.to_string()).into());
        }

        if let Some(raw) = &self.client_id {
            let client_id = parse_client_id(raw)?;
            let outcome = app.engine.sync_one(&ctx, &client_id).await?;
            if options.format.is_json() {
                formatter.print_json(&sync_outcome_json(&outcome));
            } else {
                formatter.success(&format!(
                    "Lead {} synced as server record {}",
                    outcome.client_id, outcome.server_id
                ));
                if let Some(conflict) = &outcome.identity_conflict {
                    formatter.warn(&format!(
                        "Previously linked to server record {}",
                        conflict.discarded
                    ));
                }
            }
            app.close().await;
            return Ok(());
        }

        let engine = app.engine.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping after the current lead");
                engine.cancel_sync_all();
            }
        });
        let result = app.engine.sync_all(&ctx).await;
        interrupt.abort();
        let report = result?;

        if options.format.is_json() {
            formatter.print_json(&sync_all_json(&report));
        } else {
            print_sync_all_report(&*formatter, &report);
        }
        app.close().await;

        if !report.failed.is_empty() {
            bail!("{} lead(s) could not be synced", report.failed.len());
        }
        Ok(())
    }
}
