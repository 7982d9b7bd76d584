//! Remove command - Delete a lead sheet here and on the server

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::parse_client_id;
use crate::app::App;
use crate::output::get_formatter;
use crate::GlobalOptions;

#[derive(Debug, Args)]
pub struct RemoveCommand {
    /// Client ID of the lead to delete
    pub client_id: String,
}

impl RemoveCommand {
    pub async fn execute(&self, options: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(options.format.is_json());
        let client_id = parse_client_id(&self.client_id)?;

        let app = App::open(options).await?;
        let ctx = app.context().await?;
        app.engine.remove(&ctx, &client_id).await?;

        if options.format.is_json() {
            formatter.print_json(&json!({"success": true, "client_id": client_id}));
        } else {
            formatter.success(&format!("Removed lead {client_id}"));
        }
        app.close().await;
        Ok(())
    }
}
