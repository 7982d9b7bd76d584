//! CLI command implementations

pub mod capture;
pub mod config;
pub mod edit;
pub mod list;
pub mod remove;
pub mod restore;
pub mod status;
pub mod sync;
pub mod watch;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use leadsync_core::domain::{ClientId, LeadPayload};

/// Reads a lead payload from a JSON file, or from stdin when `path` is `-`
pub(crate) fn read_payload(path: &Path) -> Result<LeadPayload> {
    let raw = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read lead from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    parse_payload(&raw).with_context(|| format!("Invalid lead JSON in {}", path.display()))
}

pub(crate) fn parse_payload(raw: &str) -> Result<LeadPayload> {
    Ok(serde_json::from_str(raw)?)
}

pub(crate) fn parse_client_id(raw: &str) -> Result<ClientId> {
    ClientId::new(raw).with_context(|| format!("Invalid client ID '{raw}'"))
}
