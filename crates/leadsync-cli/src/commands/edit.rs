//! Edit command - Replace the form data of a lead sheet
//!
//! Works on pending and synced leads alike. A synced lead is updated on the
//! server; a pending one is created there on its first successful send.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use leadsync_core::domain::ServerId;

use super::{parse_client_id, read_payload};
use crate::app::App;
use crate::output::{get_formatter, print_save_outcome, save_outcome_json};
use crate::GlobalOptions;

#[derive(Debug, Args)]
pub struct EditCommand {
    /// Client ID of the lead to edit
    pub client_id: String,

    /// Lead sheet JSON file, or `-` for stdin
    #[arg(long, short)]
    pub file: PathBuf,

    /// Server record this edit belongs to, when known from elsewhere
    #[arg(long)]
    pub server_id: Option<i64>,
}

impl EditCommand {
    pub async fn execute(&self, options: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(options.format.is_json());
        let client_id = parse_client_id(&self.client_id)?;
        let server_id = self
            .server_id
            .map(ServerId::new)
            .transpose()
            .context("Invalid --server-id")?;
        let payload = read_payload(&self.file)?;

        let app = App::open(options).await?;
        let ctx = app.context().await?;
        let outcome = app
            .engine
            .edit(&ctx, &client_id, payload, server_id)
            .await?;

        if options.format.is_json() {
            formatter.print_json(&save_outcome_json(&outcome));
        } else {
            print_save_outcome(&*formatter, "updated", &outcome);
        }
        app.close().await;
        Ok(())
    }
}
