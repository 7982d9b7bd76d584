//! Tests for the HTTP reachability probe

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leadsync_core::ports::IReachabilityProbe;
use leadsync_remote::ReachabilityProbe;

#[tokio::test]
async fn test_probe_online_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let probe = ReachabilityProbe::new(&server.uri(), "/health", Duration::from_secs(2));
    assert!(probe.check().await);
}

#[tokio::test]
async fn test_probe_offline_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let probe = ReachabilityProbe::new(&server.uri(), "/health", Duration::from_secs(2));
    assert!(!probe.check().await);
}

#[tokio::test]
async fn test_probe_offline_on_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let probe = ReachabilityProbe::new(&server.uri(), "/health", Duration::from_millis(50));
    assert!(!probe.check().await);
}
