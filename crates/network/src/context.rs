//! Explicit network context.
//!
//! [`NetworkContext`] replaces process-wide proxy environment variables. It is
//! a cheap, cloneable handle: every adapter built from the same context sees
//! the proxy that was resolved or configured on it, and nothing else in the
//! process is affected.
//!
//! ## Lifecycle of the proxy setting
//!
//! - absent when created with [`NetworkContext::direct`], or seeded from the
//!   process environment with [`NetworkContext::from_env`];
//! - set by [`NetworkContext::try_auto_configure_proxy`] on the first open
//!   candidate, or by [`NetworkContext::set_manual_proxy`];
//! - removed only by [`NetworkContext::clear_proxy`].

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::{info, warn};

use crate::{
    build_http_client, default_candidates, resolve_proxy, ConnectivityProber, ConnectivityReport,
    PortProbe, ProxyCandidate, ProxyConfig, TcpPortProbe, TransportError,
};

/// Pause between storing a freshly detected proxy and re-probing through it.
pub const PROXY_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Shared proxy state and the probes used to maintain it.
#[derive(Clone)]
pub struct NetworkContext {
    inner: Arc<Inner>,
}

struct Inner {
    proxy: RwLock<Option<ProxyConfig>>,
    candidates: Vec<ProxyCandidate>,
    port_probe: Arc<dyn PortProbe>,
    prober: ConnectivityProber,
    settle_delay: Duration,
    consult_env: bool,
    // Serialises auto-configuration so concurrent callers probe once.
    resolve_gate: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for NetworkContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkContext")
            .field("proxy", &self.proxy())
            .field("candidates", &self.inner.candidates.len())
            .field("probe_target", &self.inner.prober.target())
            .field("settle_delay", &self.inner.settle_delay)
            .finish()
    }
}

/// Builder for [`NetworkContext`].
pub struct NetworkContextBuilder {
    proxy: Option<ProxyConfig>,
    candidates: Vec<ProxyCandidate>,
    port_probe: Arc<dyn PortProbe>,
    prober: ConnectivityProber,
    settle_delay: Duration,
    consult_env: bool,
}

impl NetworkContextBuilder {
    /// Starts with this proxy already configured.
    pub fn proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Replaces the proxy candidates probed by auto-configuration.
    pub fn candidates(mut self, candidates: Vec<ProxyCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Replaces the TCP port probe.
    pub fn port_probe<P: PortProbe + 'static>(mut self, probe: Arc<P>) -> Self {
        self.port_probe = probe;
        self
    }

    /// Replaces the connectivity prober.
    pub fn prober(mut self, prober: ConnectivityProber) -> Self {
        self.prober = prober;
        self
    }

    /// Replaces the post-detection settle delay.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Makes auto-configuration disregard the process's proxy variables.
    pub fn ignore_process_env(mut self) -> Self {
        self.consult_env = false;
        self
    }

    /// Finishes the context.
    pub fn build(self) -> NetworkContext {
        NetworkContext {
            inner: Arc::new(Inner {
                proxy: RwLock::new(self.proxy),
                candidates: self.candidates,
                port_probe: self.port_probe,
                prober: self.prober,
                settle_delay: self.settle_delay,
                consult_env: self.consult_env,
                resolve_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }
}

impl NetworkContext {
    /// Starts a builder with default candidates, a real TCP probe and the
    /// Google connectivity prober.
    pub fn builder() -> NetworkContextBuilder {
        NetworkContextBuilder {
            proxy: None,
            candidates: default_candidates(),
            port_probe: Arc::new(TcpPortProbe::default()),
            prober: ConnectivityProber::google(),
            settle_delay: PROXY_SETTLE_DELAY,
            consult_env: true,
        }
    }

    /// A context with no proxy.
    pub fn direct() -> Self {
        Self::builder().build()
    }

    /// A context seeded from the process's `HTTP(S)_PROXY` variables.
    pub fn from_env() -> Self {
        Self::builder()
            .proxy(ProxyConfig::from_process_env())
            .build()
    }

    /// The proxy currently in effect.
    pub fn proxy(&self) -> Option<ProxyConfig> {
        self.inner
            .proxy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_proxy(&self, proxy: Option<ProxyConfig>) {
        *self
            .inner
            .proxy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = proxy;
    }

    /// Delay to wait after a proxy is detected before probing through it.
    pub fn settle_delay(&self) -> Duration {
        self.inner.settle_delay
    }

    /// Builds an HTTP client that uses the current proxy.
    pub fn http_client(&self, timeout: Duration) -> Result<reqwest::Client, TransportError> {
        build_http_client(self.proxy().as_ref(), timeout)
    }

    /// Probes Google's generative API through the current proxy.
    pub async fn probe_connectivity(&self) -> ConnectivityReport {
        self.inner.prober.probe(self.proxy().as_ref()).await
    }

    /// `true` iff Google's generative API answers `200` through the current proxy.
    pub async fn can_reach_google_api(&self) -> bool {
        self.inner.prober.is_reachable(self.proxy().as_ref()).await
    }

    /// Makes sure a proxy is configured, discovering one if necessary.
    ///
    /// Returns `true` without probing when a proxy is already set on this
    /// context or in the process environment. Otherwise probes the candidate
    /// ports and stores the first open one.
    pub async fn try_auto_configure_proxy(&self) -> bool {
        let env_override = if self.inner.consult_env {
            ProxyConfig::from_process_env()
        } else {
            None
        };
        self.auto_configure_with_env(env_override).await
    }

    async fn auto_configure_with_env(&self, env_override: Option<ProxyConfig>) -> bool {
        let _gate = self.inner.resolve_gate.lock().await;

        if let Some(current) = self.proxy() {
            info!(proxy = %current, "proxy already configured");
            return true;
        }

        let resolved = resolve_proxy(
            &self.inner.candidates,
            env_override,
            self.inner.port_probe.as_ref(),
        )
        .await;

        match resolved {
            Some(config) => {
                self.store_proxy(Some(config));
                true
            }
            None => false,
        }
    }

    /// Configures a proxy by hand, bypassing discovery.
    ///
    /// `https_proxy` defaults to `http_proxy`. Returns whether Google's API is
    /// reachable through the new proxy. An unparsable URL is rejected and the
    /// previous setting is kept.
    pub async fn set_manual_proxy(&self, http_proxy: &str, https_proxy: Option<&str>) -> bool {
        let config = ProxyConfig::new(http_proxy, https_proxy.map(str::to_string));
        if let Err(err) = config.to_transport_proxies() {
            warn!(error = %err, "rejected manual proxy setting");
            return false;
        }

        {
            let _gate = self.inner.resolve_gate.lock().await;
            info!(http = %config.http, https = %config.https, "manual proxy configured");
            self.store_proxy(Some(config));
        }

        if self.can_reach_google_api().await {
            info!("proxy works: Google generative API is reachable");
            true
        } else {
            warn!("Google generative API is still unreachable through the manual proxy");
            false
        }
    }

    /// Removes any configured proxy.
    pub fn clear_proxy(&self) {
        self.store_proxy(None);
        info!("proxy settings cleared");
    }
}

impl Default for NetworkContext {
    fn default() -> Self {
        Self::direct()
    }
}
