//! Restore command - Pull the configured user's leads from the server

use anyhow::Result;
use clap::Args;

use crate::app::App;
use crate::output::{get_formatter, print_restore_report};
use crate::GlobalOptions;

#[derive(Debug, Args)]
pub struct RestoreCommand {}

impl RestoreCommand {
    pub async fn execute(&self, options: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(options.format.is_json());
        let app = App::open(options).await?;
        let ctx = app.context().await?;

        let report = app.engine.restore(&ctx).await?;

        if options.format.is_json() {
            formatter.print_json(&serde_json::to_value(report)?);
        } else {
            formatter.success(&format!("Restored leads for {}", ctx.owner_id));
            print_restore_report(&*formatter, &report);
        }
        app.close().await;
        Ok(())
    }
}
