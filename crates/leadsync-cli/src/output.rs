//! Output formatting for human and JSON modes

use leadsync_core::domain::Submission;
use leadsync_core::SubmissionError;
use leadsync_sync::{RestoreReport, SaveOutcome, SyncAllReport, SyncOutcome};
use serde_json::{json, Value};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &Value) {
        // Human formatter doesn't print JSON
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", json!({"success": true, "message": message}));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", json!({"success": false, "error": message}));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", json!({"level": "warning", "message": message}));
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

// ============================================================================
// JSON views
// ============================================================================

pub fn submission_error_json(err: &SubmissionError) -> Value {
    let fields = match err {
        SubmissionError::RemoteValidation(fields) => json!(fields),
        _ => Value::Null,
    };
    json!({
        "success": false,
        "error": err.to_string(),
        "retryable": err.is_retryable(),
        "needs_user_edit": err.needs_user_edit(),
        "hint": err.user_hint(),
        "fields": fields,
    })
}

pub fn submission_json(record: &Submission) -> Value {
    json!({
        "client_id": record.client_id(),
        "server_id": record.server_id(),
        "owner_id": record.owner_id(),
        "sync_state": record.sync_state().name(),
        "captured_at": record.captured_at().to_rfc3339(),
        "updated_at": record.updated_at().to_rfc3339(),
        "synced_at": record.synced_at().map(|t| t.to_rfc3339()),
        "payload": record.payload(),
    })
}

pub fn save_outcome_json(outcome: &SaveOutcome) -> Value {
    match outcome {
        SaveOutcome::Synced {
            client_id,
            server_id,
        } => json!({
            "success": true,
            "client_id": client_id,
            "status": "synced",
            "server_id": server_id,
        }),
        SaveOutcome::SavedLocally { client_id, reason } => json!({
            "success": true,
            "client_id": client_id,
            "status": "saved_locally",
            "reason": reason.as_ref().map(submission_error_json),
        }),
    }
}

pub fn sync_outcome_json(outcome: &SyncOutcome) -> Value {
    json!({
        "success": true,
        "client_id": outcome.client_id,
        "server_id": outcome.server_id,
        "action": outcome.action,
        "identity_conflict": outcome.identity_conflict,
    })
}

pub fn sync_all_json(report: &SyncAllReport) -> Value {
    let failed: Vec<Value> = report
        .failed
        .iter()
        .map(|(client_id, err)| {
            let mut entry = submission_error_json(err);
            entry["client_id"] = json!(client_id);
            entry
        })
        .collect();
    json!({
        "attempted": report.attempted,
        "succeeded": report.succeeded,
        "failed": failed,
        "skipped": report.skipped,
        "cancelled": report.cancelled,
        "restore": report.restore,
        "restore_warning": report.restore_warning,
        "conflicts": report.conflicts,
    })
}

// ============================================================================
// Human views
// ============================================================================

/// One-line summary of a record for listings
pub fn submission_line(record: &Submission) -> String {
    let server = record
        .server_id()
        .map(|id| format!("#{id}"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<36}  {:>8}  {:<24}  {}",
        record.client_id(),
        server,
        truncate(&record.payload().contact.display_name(), 24),
        record.updated_at().format("%Y-%m-%d %H:%M")
    )
}

pub fn print_save_outcome(formatter: &dyn OutputFormatter, verb: &str, outcome: &SaveOutcome) {
    match outcome {
        SaveOutcome::Synced {
            client_id,
            server_id,
        } => {
            formatter.success(&format!("Lead {verb} and synced"));
            formatter.info(&format!("Client ID: {client_id}"));
            formatter.info(&format!("Server ID: {server_id}"));
        }
        SaveOutcome::SavedLocally { client_id, reason } => {
            formatter.success(&format!("Lead {verb} on this device"));
            formatter.info(&format!("Client ID: {client_id}"));
            match reason {
                Some(reason) => {
                    formatter.warn(&reason.to_string());
                    formatter.info(&reason.user_hint());
                }
                None => formatter.info("It will be sent when the server is reachable."),
            }
        }
    }
}

pub fn print_restore_report(formatter: &dyn OutputFormatter, report: &RestoreReport) {
    formatter.info(&format!(
        "Restored: {} new, {} refreshed, {} reconciled, {} skipped",
        report.inserted, report.updated, report.reconciled, report.skipped
    ));
}

pub fn print_sync_all_report(formatter: &dyn OutputFormatter, report: &SyncAllReport) {
    if let Some(restore) = &report.restore {
        print_restore_report(formatter, restore);
    }
    if let Some(warning) = &report.restore_warning {
        formatter.warn(&format!("Restore skipped: {warning}"));
    }

    if report.failed.is_empty() {
        formatter.success(&format!("Synced {} lead(s)", report.succeeded));
    } else {
        formatter.error(&format!(
            "Synced {} of {} lead(s); {} failed",
            report.succeeded,
            report.attempted,
            report.failed.len()
        ));
        for (client_id, err) in &report.failed {
            let tag = if err.is_retryable() {
                "will retry"
            } else {
                "needs edit"
            };
            formatter.info(&format!("  [{tag}] {client_id}: {err}"));
        }
    }
    if !report.skipped.is_empty() {
        formatter.info(&format!(
            "{} lead(s) already synced during this run",
            report.skipped.len()
        ));
    }
    for conflict in &report.conflicts {
        formatter.warn(&format!(
            "{} now points at server record {} (was {})",
            conflict.client_id, conflict.kept, conflict.discarded
        ));
    }
    if report.cancelled {
        formatter.warn("Sync was cancelled before all leads were sent");
    }
}

/// Truncates to `max` characters, appending an ellipsis when shortened
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}\u{2026}")
}
