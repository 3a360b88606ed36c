//! Reachability probe for Google's generative API.
//!
//! A single GET against the API host tells whether requests will get through
//! with the current proxy settings. Only an exact `200` counts as reachable;
//! any transport failure counts as unreachable.

use std::time::{Duration, Instant};

use gateway::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{build_http_client, ProxyConfig};

/// Host probed by [`ConnectivityProber::google`].
pub const GOOGLE_API_PROBE_URL: &str = "https://generativelanguage.googleapis.com";

/// Upper bound for one probe.
pub const CONNECTIVITY_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    /// URL that was requested.
    pub target: String,
    /// HTTP status, if a response arrived.
    pub status: Option<u16>,
    /// Wall-clock duration of the probe.
    pub latency_ms: u64,
    /// When the probe started.
    pub checked_at: Timestamp,
    /// Transport error text, if no response arrived.
    pub error: Option<String>,
    /// Proxy the probe went through, if any.
    pub proxy: Option<ProxyConfig>,
}

impl ConnectivityReport {
    /// `true` iff the target answered with exactly `200`.
    pub fn is_reachable(&self) -> bool {
        self.status == Some(200)
    }
}

/// Issues reachability probes against a fixed target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityProber {
    target: String,
    timeout: Duration,
}

impl ConnectivityProber {
    /// Creates a prober for `target` with the default timeout.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            timeout: CONNECTIVITY_PROBE_TIMEOUT,
        }
    }

    /// Prober for Google's generative API host.
    pub fn google() -> Self {
        Self::new(GOOGLE_API_PROBE_URL)
    }

    /// Replaces the probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The probed URL.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Probes the target, routing through `proxy` when given.
    pub async fn probe(&self, proxy: Option<&ProxyConfig>) -> ConnectivityReport {
        let checked_at = Timestamp::now();
        let started = Instant::now();

        let outcome = match build_http_client(proxy, self.timeout) {
            Ok(client) => client
                .get(&self.target)
                .send()
                .await
                .map(|response| response.status().as_u16())
                .map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };

        let (status, error) = match outcome {
            Ok(status) => (Some(status), None),
            Err(message) => (None, Some(message)),
        };

        ConnectivityReport {
            target: self.target.clone(),
            status,
            latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            checked_at,
            error,
            proxy: proxy.cloned(),
        }
    }

    /// `true` iff the target answers `200`.
    pub async fn is_reachable(&self, proxy: Option<&ProxyConfig>) -> bool {
        let report = self.probe(proxy).await;
        if !report.is_reachable() {
            debug!(
                target_url = %report.target,
                status = ?report.status,
                error = ?report.error,
                "connectivity probe failed"
            );
        }
        report.is_reachable()
    }
}

impl Default for ConnectivityProber {
    fn default() -> Self {
        Self::google()
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn server_answering(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn status_200_is_reachable() {
        let server = server_answering(200).await;
        let prober = ConnectivityProber::new(server.uri());

        let report = prober.probe(None).await;

        assert!(report.is_reachable());
        assert_eq!(report.status, Some(200));
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn other_statuses_are_unreachable() {
        for status in [204, 404, 503] {
            let server = server_answering(status).await;
            let prober = ConnectivityProber::new(server.uri());
            assert!(!prober.is_reachable(None).await, "status {status}");
        }
    }

    #[tokio::test]
    async fn transport_failure_is_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let prober = ConnectivityProber::new(format!("http://127.0.0.1:{port}"))
            .with_timeout(Duration::from_secs(2));

        let report = prober.probe(None).await;

        assert!(!report.is_reachable());
        assert!(report.status.is_none());
        assert!(report.error.is_some());
    }

    #[tokio::test]
    async fn slow_target_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let prober =
            ConnectivityProber::new(server.uri()).with_timeout(Duration::from_millis(200));

        assert!(!prober.is_reachable(None).await);
    }
}
