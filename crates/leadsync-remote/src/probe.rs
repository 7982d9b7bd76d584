//! Reachability probe
//!
//! Answers "can the CRM server be reached right now" with a cheap
//! `GET {base_url}{health_path}`. Any failure, including a timeout or a
//! non-success status, counts as unreachable.

use std::time::Duration;

use async_trait::async_trait;
use leadsync_core::config::RemoteConfig;
use leadsync_core::ports::IReachabilityProbe;
use reqwest::Client;
use tracing::{debug, trace};

/// Probe timeout used when none is configured
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP health-check probe
pub struct ReachabilityProbe {
    client: Client,
    url: String,
}

impl ReachabilityProbe {
    /// Creates a probe against `base_url` + `health_path`
    pub fn new(base_url: &str, health_path: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), health_path),
        }
    }

    /// Creates a probe from the `remote` configuration section
    ///
    /// The probe never waits longer than the request timeout, and never
    /// longer than a few seconds.
    pub fn from_config(config: &RemoteConfig) -> Self {
        let timeout = config.timeout().min(DEFAULT_PROBE_TIMEOUT);
        Self::new(&config.base_url, &config.health_path, timeout)
    }

    /// The URL being probed
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IReachabilityProbe for ReachabilityProbe {
    async fn check(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => {
                trace!(url = %self.url, "Reachability probe succeeded");
                true
            }
            Ok(response) => {
                debug!(url = %self.url, status = response.status().as_u16(), "Reachability probe got error status");
                false
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "Reachability probe failed");
                false
            }
        }
    }
}
