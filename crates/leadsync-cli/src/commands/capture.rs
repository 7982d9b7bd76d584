//! Capture command - Record a new lead sheet
//!
//! Provides the `leadsync capture` CLI command which:
//! 1. Reads the lead sheet from a JSON file (or stdin)
//! 2. Saves it on this device
//! 3. Sends it to the server when reachable

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::read_payload;
use crate::app::App;
use crate::output::{get_formatter, print_save_outcome, save_outcome_json};
use crate::GlobalOptions;

#[derive(Debug, Args)]
pub struct CaptureCommand {
    /// Lead sheet JSON file, or `-` for stdin
    #[arg(long, short)]
    pub file: PathBuf,
}

impl CaptureCommand {
    pub async fn execute(&self, options: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(options.format.is_json());
        let payload = read_payload(&self.file)?;

        let app = App::open(options).await?;
        let ctx = app.context().await?;
        info!(owner_id = %ctx.owner_id, online = ctx.online, "Capturing lead");

        let outcome = app.engine.capture(&ctx, payload).await?;

        if options.format.is_json() {
            formatter.print_json(&save_outcome_json(&outcome));
        } else {
            print_save_outcome(&*formatter, "captured", &outcome);
        }
        app.close().await;
        Ok(())
    }
}
