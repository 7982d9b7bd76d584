//! Config command - View and manage LeadSync configuration
//!
//! Provides the `leadsync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use leadsync_core::config::Config;
use serde_json::json;
use tracing::info;

use crate::output::{get_formatter, OutputFormatter};
use crate::GlobalOptions;

/// Keys accepted by `config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("remote.base_url", "CRM API root URL"),
    ("remote.timeout_secs", "Per-request timeout in seconds"),
    ("remote.health_path", "Path probed for reachability"),
    ("sync.item_delay_ms", "Pause between leads in a bulk sync"),
    ("sync.restore_before_sync", "true|false"),
    ("sync.auto_sync_on_reconnect", "true|false"),
    ("sync.probe_interval_secs", "Seconds between reachability probes"),
    ("sync.background_interval_secs", "Seconds between background syncs (0 = off)"),
    ("storage.database_path", "SQLite database file"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("auth.user_id", "Signed-in user ('none' to clear)"),
    ("auth.api_token", "Bearer token ('none' to clear)"),
];

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.item_delay_ms")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, options: &GlobalOptions) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(options),
            ConfigCommand::Set { key, value } => self.execute_set(key, value, options),
            ConfigCommand::Validate => self.execute_validate(options),
        }
    }

    fn execute_show(&self, options: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(options.format.is_json());
        let config_path = &options.config_path;
        let mut config = Config::load_or_default(config_path);
        if config.auth.api_token.is_some() {
            config.auth.api_token = Some("********".to_string());
        }

        info!(config_path = %config_path.display(), "Showing configuration");

        if options.format.is_json() {
            let value =
                serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&value);
        } else {
            formatter.success(&format!("Configuration ({})", config_path.display()));
            formatter.info("");
            for line in config.to_yaml()?.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_set(&self, key: &str, value: &str, options: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(options.format.is_json());
        let config_path = &options.config_path;
        let mut config = Config::load_or_default(config_path);

        info!(key = %key, "Setting configuration value");

        if let Err(err) = apply_config_value(&mut config, key, value) {
            if !options.format.is_json() {
                print_supported_keys(&*formatter);
            }
            return Err(err.context(format!("Failed to set '{key}'")));
        }

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            bail!("Invalid value for '{key}': {}", messages.join("; "));
        }

        save_config(&config, config_path)?;

        if options.format.is_json() {
            formatter.print_json(&json!({
                "success": true,
                "key": key,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {key}"));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, options: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(options.format.is_json());
        let config_path = &options.config_path;

        if !config_path.exists() {
            if options.format.is_json() {
                formatter.print_json(&json!({
                    "valid": true,
                    "config_path": config_path.display().to_string(),
                    "errors": [],
                    "note": "Configuration file not found. Using defaults.",
                }));
            } else {
                formatter.info(&format!(
                    "Configuration file not found at {}",
                    config_path.display()
                ));
                formatter.info("Using default configuration. Run 'leadsync config set <key> <value>' to create one.");
            }
            return Ok(());
        }

        let config = Config::load(config_path)?;
        info!(config_path = %config_path.display(), "Validating configuration");
        let errors = config.validate();

        if options.format.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!("Configuration is invalid")
        }
    }
}

fn print_supported_keys(formatter: &dyn OutputFormatter) {
    formatter.info("");
    formatter.info("Supported keys:");
    for (key, description) in SUPPORTED_KEYS {
        formatter.info(&format!("  {key:<30} - {description}"));
    }
}

fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    std::fs::write(path, config.to_yaml()?).context("Failed to write configuration file")
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .with_context(|| format!("Expected a non-negative integer for {key}"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .with_context(|| format!("Expected true or false for {key}"))
}

/// `none` or an empty string clears an optional value
fn parse_optional(value: &str) -> Option<String> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(value.to_string())
    }
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- remote ---
        "remote.base_url" => config.remote.base_url = value.to_string(),
        "remote.timeout_secs" => config.remote.timeout_secs = parse_u64(key, value)?,
        "remote.health_path" => config.remote.health_path = value.to_string(),

        // --- sync ---
        "sync.item_delay_ms" => config.sync.item_delay_ms = parse_u64(key, value)?,
        "sync.restore_before_sync" => config.sync.restore_before_sync = parse_bool(key, value)?,
        "sync.auto_sync_on_reconnect" => {
            config.sync.auto_sync_on_reconnect = parse_bool(key, value)?
        }
        "sync.probe_interval_secs" => config.sync.probe_interval_secs = parse_u64(key, value)?,
        "sync.background_interval_secs" => {
            config.sync.background_interval_secs = parse_u64(key, value)?
        }

        // --- storage / logging ---
        "storage.database_path" => config.storage.database_path = PathBuf::from(value),
        "logging.level" => config.logging.level = value.to_string(),

        // --- auth ---
        "auth.user_id" => config.auth.user_id = parse_optional(value),
        "auth.api_token" => config.auth.api_token = parse_optional(value),

        _ => bail!("Unknown configuration key: {key}"),
    }
    Ok(())
}
