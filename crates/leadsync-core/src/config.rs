//! Configuration module for LeadSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for LeadSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

/// CRM server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the submissions API, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds. A timeout counts as a network failure.
    pub timeout_secs: u64,
    /// Path probed to decide whether the server is reachable.
    pub health_path: String,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Pause between items of a bulk sync, in milliseconds.
    pub item_delay_ms: u64,
    /// Pull the owner's records from the server before each bulk sync.
    pub restore_before_sync: bool,
    /// Start a bulk sync whenever connectivity comes back.
    pub auto_sync_on_reconnect: bool,
    /// Seconds between reachability probes.
    pub probe_interval_secs: u64,
    /// Seconds between background bulk syncs while online. `0` disables them.
    pub background_interval_secs: u64,
}

/// Local storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,
}

/// Log output of the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`; `-v` and `RUST_LOG` override it.
    pub level: String,
}

/// Session settings. Sign-in happens elsewhere; these identify the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// The signed-in user. `None` means nobody is signed in.
    pub user_id: Option<String>,
    /// Bearer token sent with every API request.
    pub api_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Reads and parses the YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing or broken file yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Where the CLI looks when `--config` is not given.
    ///
    /// Typically `$XDG_CONFIG_HOME/leadsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("leadsync")
            .join("config.yaml")
    }

    /// Serialize to YAML, as written by `config show`.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

impl SyncConfig {
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    /// `None` when background syncing is disabled.
    pub fn background_interval(&self) -> Option<Duration> {
        (self.background_interval_secs > 0)
            .then(|| Duration::from_secs(self.background_interval_secs))
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 15,
            health_path: "/health".to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            item_delay_ms: 250,
            restore_before_sync: true,
            auto_sync_on_reconnect: true,
            probe_interval_secs: 10,
            background_interval_secs: 300,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("leadsync")
                .join("submissions.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- remote ---
        let base_url = self.remote.base_url.as_str();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "remote.base_url".into(),
                message: format!("must be an http(s) URL, got '{base_url}'"),
            });
        } else if base_url.ends_with('/') {
            errors.push(ValidationError {
                field: "remote.base_url".into(),
                message: "must not end with '/'".into(),
            });
        }
        if self.remote.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if !self.remote.health_path.starts_with('/') {
            errors.push(ValidationError {
                field: "remote.health_path".into(),
                message: "must start with '/'".into(),
            });
        }

        // --- sync ---
        if self.sync.probe_interval_secs == 0 {
            errors.push(ValidationError {
                field: "sync.probe_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.item_delay_ms > 60_000 {
            errors.push(ValidationError {
                field: "sync.item_delay_ms".into(),
                message: "must not exceed 60000".into(),
            });
        }

        // --- storage ---
        if self.storage.database_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database_path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "unknown level '{}' (expected one of {})",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        // --- auth ---
        if matches!(&self.auth.user_id, Some(id) if id.trim().is_empty()) {
            errors.push(ValidationError {
                field: "auth.user_id".into(),
                message: "must not be blank when set".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn remote_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.timeout_secs = seconds;
        self
    }

    pub fn remote_health_path(mut self, path: impl Into<String>) -> Self {
        self.config.remote.health_path = path.into();
        self
    }

    // --- sync ---

    pub fn sync_item_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.item_delay_ms = ms;
        self
    }

    pub fn sync_restore_before_sync(mut self, enabled: bool) -> Self {
        self.config.sync.restore_before_sync = enabled;
        self
    }

    pub fn sync_auto_sync_on_reconnect(mut self, enabled: bool) -> Self {
        self.config.sync.auto_sync_on_reconnect = enabled;
        self
    }

    pub fn sync_probe_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.probe_interval_secs = seconds;
        self
    }

    pub fn sync_background_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.background_interval_secs = seconds;
        self
    }

    // --- storage ---

    pub fn storage_database_path(mut self, path: PathBuf) -> Self {
        self.config.storage.database_path = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- auth ---

    pub fn auth_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.config.auth.user_id = Some(user_id.into());
        self
    }

    pub fn auth_api_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth.api_token = Some(token.into());
        self
    }

    // --- build ---

    pub fn build(self) -> Config {
        self.config
    }

    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn defaults_suit_a_fresh_device() {
        let cfg = Config::default();
        assert_eq!(cfg.remote.timeout_secs, 15);
        assert_eq!(cfg.remote.health_path, "/health");
        assert_eq!(cfg.sync.item_delay_ms, 250);
        assert!(cfg.sync.restore_before_sync);
        assert!(cfg.sync.auto_sync_on_reconnect);
        assert_eq!(cfg.sync.probe_interval_secs, 10);
        assert!(cfg
            .storage
            .database_path
            .to_string_lossy()
            .ends_with("submissions.db"));
        assert_eq!(cfg.logging.level, "warn");
        assert!(cfg.auth.user_id.is_none());
        assert!(cfg.auth.api_token.is_none());
    }

    #[test]
    fn default_config_is_valid() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn default_path_ends_with_leadsync_config() {
        let path = Config::default_path();
        assert!(path.ends_with("leadsync/config.yaml"));
    }

    // -- Loading --

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
remote:
  base_url: "https://crm.example.com/api"
  timeout_secs: 30
  health_path: "/ping"
sync:
  item_delay_ms: 0
  restore_before_sync: false
  auto_sync_on_reconnect: false
  probe_interval_secs: 5
  background_interval_secs: 0
storage:
  database_path: "/tmp/leads.db"
logging:
  level: debug
auth:
  user_id: "agent-7"
  api_token: "secret"
"#;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).unwrap();
        assert_eq!(cfg.remote.base_url, "https://crm.example.com/api");
        assert_eq!(cfg.remote.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.remote.health_path, "/ping");
        assert_eq!(cfg.sync.item_delay(), Duration::ZERO);
        assert!(!cfg.sync.restore_before_sync);
        assert!(!cfg.sync.auto_sync_on_reconnect);
        assert_eq!(cfg.sync.probe_interval(), Duration::from_secs(5));
        assert!(cfg.sync.background_interval().is_none());
        assert_eq!(cfg.storage.database_path, PathBuf::from("/tmp/leads.db"));
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.auth.user_id.as_deref(), Some("agent-7"));
        assert_eq!(cfg.auth.api_token.as_deref(), Some("secret"));
    }

    #[test]
    fn load_partial_yaml_fills_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"auth:\n  user_id: agent-1\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).unwrap();
        assert_eq!(cfg.auth.user_id.as_deref(), Some("agent-1"));
        assert_eq!(cfg.remote.timeout_secs, 15);
        assert_eq!(cfg.sync.item_delay_ms, 250);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.sync.probe_interval_secs, 10);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        let result = Config::load(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn to_yaml_round_trips() {
        let cfg = ConfigBuilder::new().auth_user_id("agent-3").build();
        let yaml = cfg.to_yaml().unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.auth.user_id.as_deref(), Some("agent-3"));
    }

    // -- Validation --

    #[test]
    fn validate_catches_bad_base_url() {
        let mut cfg = Config::default();
        cfg.remote.base_url = "crm.example.com".to_string();
        assert!(cfg.validate().iter().any(|e| e.field == "remote.base_url"));

        cfg.remote.base_url = "https://crm.example.com/".to_string();
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "remote.base_url" && e.message.contains("must not end")));
    }

    #[test]
    fn validate_catches_zero_values() {
        let mut cfg = Config::default();
        cfg.remote.timeout_secs = 0;
        cfg.sync.probe_interval_secs = 0;
        let errors = cfg.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"remote.timeout_secs"));
        assert!(fields.contains(&"sync.probe_interval_secs"));
    }

    #[test]
    fn validate_catches_health_path_without_slash() {
        let mut cfg = Config::default();
        cfg.remote.health_path = "health".to_string();
        assert!(cfg.validate().iter().any(|e| e.field == "remote.health_path"));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn every_known_log_level_is_accepted() {
        for level in VALID_LOG_LEVELS {
            let mut cfg = Config::default();
            cfg.logging.level = level.to_string();
            let errors = cfg.validate();
            assert!(
                !errors.iter().any(|e| e.field == "logging.level"),
                "level '{level}' should be valid"
            );
        }
    }

    #[test]
    fn validate_catches_blank_user_id() {
        let cfg = ConfigBuilder::new().auth_user_id("  ").build();
        assert!(cfg.validate().iter().any(|e| e.field == "auth.user_id"));
    }

    // -- Builder --

    #[test]
    fn builder_sets_each_section() {
        let cfg = ConfigBuilder::new()
            .remote_base_url("https://crm.example.com")
            .remote_timeout_secs(5)
            .remote_health_path("/status")
            .sync_item_delay_ms(10)
            .sync_restore_before_sync(false)
            .sync_auto_sync_on_reconnect(false)
            .sync_probe_interval_secs(2)
            .sync_background_interval_secs(60)
            .storage_database_path(PathBuf::from("/tmp/x.db"))
            .logging_level("trace")
            .auth_user_id("agent-9")
            .auth_api_token("tok")
            .build();

        assert_eq!(cfg.remote.base_url, "https://crm.example.com");
        assert_eq!(cfg.remote.timeout_secs, 5);
        assert_eq!(cfg.remote.health_path, "/status");
        assert_eq!(cfg.sync.item_delay_ms, 10);
        assert!(!cfg.sync.restore_before_sync);
        assert!(!cfg.sync.auto_sync_on_reconnect);
        assert_eq!(cfg.sync.probe_interval_secs, 2);
        assert_eq!(
            cfg.sync.background_interval(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(cfg.storage.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(cfg.logging.level, "trace");
        assert_eq!(cfg.auth.user_id.as_deref(), Some("agent-9"));
        assert_eq!(cfg.auth.api_token.as_deref(), Some("tok"));
    }

    #[test]
    fn build_validated_rejects_invalid() {
        let result = ConfigBuilder::new().remote_timeout_secs(0).build_validated();
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "remote.timeout_secs");
    }
}
