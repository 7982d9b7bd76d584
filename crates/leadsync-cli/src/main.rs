//! LeadSync CLI - Command-line front end for the LeadSync engine
//!
//! Provides commands for:
//! - Capturing and editing lead sheets from JSON files
//! - Syncing one or all records with the CRM server
//! - Restoring records onto a new device
//! - Watching connectivity and syncing automatically
//! - Viewing and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use leadsync_core::config::Config;
use leadsync_core::SubmissionError;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod output;

use commands::{
    capture::CaptureCommand, config::ConfigCommand, edit::EditCommand, list::ListCommand,
    remove::RemoveCommand, restore::RestoreCommand, status::StatusCommand, sync::SyncCommand,
    watch::WatchCommand,
};
use output::{get_formatter, submission_error_json, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "leadsync",
    version,
    about = "Offline-first lead sheet capture and sync"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not contact the server, even if it is reachable
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Capture a new lead sheet
    Capture(CaptureCommand),
    /// Replace the form data of a lead sheet
    Edit(EditCommand),
    /// Delete a lead sheet here and on the server
    Remove(RemoveCommand),
    /// Send lead sheets to the server
    Sync(SyncCommand),
    /// List lead sheets on this device
    List(ListCommand),
    /// Pull your lead sheets from the server
    Restore(RestoreCommand),
    /// Show counts and connectivity
    Status(StatusCommand),
    /// Sync automatically whenever the server is reachable
    Watch(WatchCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub format: OutputFormat,
    pub config_path: PathBuf,
    pub force_offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    // Setup tracing: -v flags, then RUST_LOG, then logging.level from the config file
    let env_filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(Config::load_or_default(&config_path).logging.level)
        }),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let options = GlobalOptions {
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
        config_path,
        force_offline: cli.offline,
    };

    let result = match &cli.command {
        Commands::Capture(cmd) => cmd.execute(&options).await,
        Commands::Edit(cmd) => cmd.execute(&options).await,
        Commands::Remove(cmd) => cmd.execute(&options).await,
        Commands::Sync(cmd) => cmd.execute(&options).await,
        Commands::List(cmd) => cmd.execute(&options).await,
        Commands::Restore(cmd) => cmd.execute(&options).await,
        Commands::Status(cmd) => cmd.execute(&options).await,
        Commands::Watch(cmd) => cmd.execute(&options).await,
        Commands::Config(cmd) => cmd.execute(&options).await,
    };

    if let Err(err) = result {
        let formatter = get_formatter(cli.json);
        let message = format!("{err:#}");
        match err.downcast_ref::<SubmissionError>() {
            Some(submission_err) if cli.json => {
                let mut value = submission_error_json(submission_err);
                value["error"] = serde_json::json!(message);
                formatter.print_json(&value);
            }
            Some(submission_err) => {
                formatter.error(&message);
                formatter.info(&submission_err.user_hint());
            }
            None => formatter.error(&message),
        }
        std::process::exit(1);
    }
    Ok(())
}
