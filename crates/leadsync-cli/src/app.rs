//! Adapter wiring shared by the commands that touch records
//!
//! Loads the configuration, opens the SQLite store, builds the HTTP adapters
//! and hands them to a [`SyncEngine`].

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use leadsync_cache::{DatabasePool, SqliteSubmissionStore};
use leadsync_core::config::{AuthConfig, Config};
use leadsync_core::domain::OwnerId;
use leadsync_core::ports::{IReachabilityProbe, ISessionProvider};
use leadsync_core::SubmissionError;
use leadsync_remote::{HttpSubmissionService, ReachabilityProbe};
use leadsync_sync::{ConnectivityMonitor, EngineSettings, SyncContext, SyncEngine};
use tracing::{debug, info};

use crate::GlobalOptions;

/// Session backed by the `auth` configuration section
#[derive(Debug, Clone)]
pub struct ConfigSession {
    user_id: Option<OwnerId>,
}

impl ConfigSession {
    pub fn from_config(auth: &AuthConfig) -> Result<Self> {
        let user_id = auth
            .user_id
            .as_deref()
            .map(OwnerId::new)
            .transpose()
            .context("Invalid auth.user_id")?;
        Ok(Self { user_id })
    }
}

impl ISessionProvider for ConfigSession {
    fn current_user_id(&self) -> Option<OwnerId> {
        self.user_id.clone()
    }
}

/// Everything a record command needs
pub struct App {
    pub config: Config,
    pub engine: Arc<SyncEngine>,
    pub session: Arc<ConfigSession>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub probe: Arc<ReachabilityProbe>,
    pool: DatabasePool,
    force_offline: bool,
}

impl App {
    /// Loads configuration and opens the store
    ///
    /// A missing config file means defaults; an unreadable or invalid one is
    /// an error.
    pub async fn open(options: &GlobalOptions) -> Result<Self> {
        let config = load_config(&options.config_path)?;

        let pool = DatabasePool::new(&config.storage.database_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database at {}",
                    config.storage.database_path.display()
                )
            })?;
        let store = Arc::new(SqliteSubmissionStore::new(pool.pool().clone()));
        let remote = Arc::new(HttpSubmissionService::from_config(
            &config.remote,
            config.auth.api_token.clone(),
        ));
        let engine = Arc::new(SyncEngine::new(
            store,
            remote,
            EngineSettings::from_config(&config.sync),
        ));

        info!(
            database = %config.storage.database_path.display(),
            base_url = %config.remote.base_url,
            "Opened LeadSync"
        );

        Ok(Self {
            session: Arc::new(ConfigSession::from_config(&config.auth)?),
            probe: Arc::new(ReachabilityProbe::from_config(&config.remote)),
            monitor: Arc::new(ConnectivityMonitor::new(false)),
            engine,
            pool,
            force_offline: options.force_offline,
            config,
        })
    }

    /// Probes the server once and builds the call context
    ///
    /// `--offline` skips the probe.
    pub async fn context(&self) -> Result<SyncContext> {
        if !self.force_offline {
            let online = self.probe.check().await;
            debug!(online, url = %self.probe.url(), "Reachability checked");
            self.monitor.set_online(online);
        }
        SyncContext::capture(self.session.as_ref(), self.monitor.as_ref()).map_err(signed_out)
    }

    /// Builds an offline call context without probing the server
    pub fn context_offline(&self) -> Result<SyncContext> {
        let owner_id = self
            .session
            .current_user_id()
            .ok_or(SubmissionError::Unauthenticated)
            .map_err(signed_out)?;
        Ok(SyncContext::new(owner_id, false))
    }

    pub fn force_offline(&self) -> bool {
        self.force_offline
    }

    /// Closes the database pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn signed_out(err: SubmissionError) -> anyhow::Error {
    match err {
        SubmissionError::Unauthenticated => {
            anyhow::Error::new(err).context("No user configured; set auth.user_id")
        }
        other => other.into(),
    }
}

/// Reads the config file, falling back to defaults when it does not exist
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::load(path)?
    } else {
        debug!(path = %path.display(), "No config file, using defaults");
        Config::default()
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        bail!(
            "Invalid configuration in {}: {}",
            path.display(),
            messages.join("; ")
        );
    }
    Ok(config)
}
