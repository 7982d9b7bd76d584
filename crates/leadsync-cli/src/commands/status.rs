//! Status command - Show lead counts and server reachability

use anyhow::Result;
use clap::Args;

use crate::app::App;
use crate::output::get_formatter;
use crate::GlobalOptions;

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, options: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(options.format.is_json());
        let app = App::open(options).await?;
        let ctx = app.context().await?;

        let status = app.engine.status(&ctx).await?;

        if options.format.is_json() {
            let mut value = serde_json::to_value(&status)?;
            value["server"] = serde_json::json!(app.config.remote.base_url);
            formatter.print_json(&value);
        } else {
            formatter.success(&format!("LeadSync Status - {}", status.owner_id));
            formatter.info("");
            formatter.info(&format!(
                "Server:  {} ({})",
                app.config.remote.base_url,
                if status.online { "reachable" } else { "unreachable" }
            ));
            formatter.info(&format!("Pending: {}", status.pending));
            formatter.info(&format!("Synced:  {}", status.synced));
            if status.pending > 0 && status.online {
                formatter.info("");
                formatter.info("Run 'leadsync sync' to send pending leads.");
            }
        }
        app.close().await;
        Ok(())
    }
}
