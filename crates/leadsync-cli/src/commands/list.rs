//! List command - Show lead sheets stored on this device

use anyhow::Result;
use clap::Args;
use leadsync_core::domain::Submission;
use serde_json::json;

use crate::app::App;
use crate::output::{get_formatter, submission_json, submission_line, OutputFormatter};
use crate::GlobalOptions;

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only leads not yet confirmed by the server
    #[arg(long, conflicts_with = "synced")]
    pub pending: bool,

    /// Only leads confirmed by the server
    #[arg(long)]
    pub synced: bool,
}

impl ListCommand {
    pub async fn execute(&self, options: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(options.format.is_json());
        let app = App::open(options).await?;
        // Listing never needs the server.
        let ctx = app.context_offline()?;

        let show_pending = !self.synced;
        let show_synced = !self.pending;
        let pending = if show_pending {
            app.engine.list_pending(&ctx).await?
        } else {
            Vec::new()
        };
        let synced = if show_synced {
            app.engine.list_synced(&ctx).await?
        } else {
            Vec::new()
        };

        if options.format.is_json() {
            let mut value = json!({});
            if show_pending {
                value["pending"] = json!(pending.iter().map(submission_json).collect::<Vec<_>>());
            }
            if show_synced {
                value["synced"] = json!(synced.iter().map(submission_json).collect::<Vec<_>>());
            }
            formatter.print_json(&value);
        } else {
            if show_pending {
                print_section(&*formatter, "Pending", &pending);
            }
            if show_synced {
                print_section(&*formatter, "Synced", &synced);
            }
        }
        app.close().await;
        Ok(())
    }
}

fn print_section(formatter: &dyn OutputFormatter, title: &str, records: &[Submission]) {
    formatter.success(&format!("{title} ({})", records.len()));
    for record in records {
        formatter.info(&submission_line(record));
    }
    formatter.info("");
}
