//! Forward-proxy discovery.
//!
//! Some backends (notably Google's generative API) are unreachable from some
//! regions unless traffic goes through a local forward proxy. Desktop proxy
//! tools listen on a handful of well-known loopback ports, so discovery is a
//! matter of finding the first one that accepts a TCP connection.
//!
//! [`resolve_proxy`] is the whole algorithm. It never touches the process
//! environment; the caller decides where the result is stored (see
//! [`crate::NetworkContext`]).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// How long a single candidate port gets to accept a connection.
pub const PORT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Hosts that never go through the proxy.
pub const PROXY_BYPASS_HOSTS: &str = "localhost,127.0.0.1,::1";

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// Protocol spoken by a proxy candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyScheme {
    /// HTTP `CONNECT` proxy.
    Http,
    /// SOCKS5 proxy.
    Socks5,
}

impl ProxyScheme {
    /// URL scheme prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Socks5 => "socks5",
        }
    }
}

/// A `(scheme, host, port)` location where a local proxy might be listening.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyCandidate {
    /// Proxy protocol.
    pub scheme: ProxyScheme,
    /// Host to connect to, normally loopback.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl ProxyCandidate {
    /// Creates a candidate.
    pub fn new(scheme: ProxyScheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
        }
    }

    /// The proxy URL, e.g. `socks5://127.0.0.1:7891`.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}

/// Default ports of common desktop proxy tools, in probe order.
pub fn default_candidates() -> Vec<ProxyCandidate> {
    vec![
        // Clash HTTP
        ProxyCandidate::new(ProxyScheme::Http, "127.0.0.1", 7890),
        // Clash SOCKS5
        ProxyCandidate::new(ProxyScheme::Socks5, "127.0.0.1", 7891),
        ProxyCandidate::new(ProxyScheme::Http, "127.0.0.1", 8080),
        ProxyCandidate::new(ProxyScheme::Http, "127.0.0.1", 1080),
    ]
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// A resolved forward-proxy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy URL for plain-HTTP targets.
    pub http: String,
    /// Proxy URL for HTTPS targets.
    pub https: String,
}

/// A proxy URL could not be turned into a transport proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The URL is not a valid proxy URL.
    #[error("invalid proxy URL '{url}': {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parser error text.
        message: String,
    },
}

impl ProxyConfig {
    /// Creates a configuration. `https` defaults to `http` when absent.
    pub fn new(http: impl Into<String>, https: Option<String>) -> Self {
        let http = http.into().trim().to_string();
        let https = https
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| http.clone());
        Self { http, https }
    }

    /// Uses the same proxy for both schemes.
    pub fn uniform(url: impl Into<String>) -> Self {
        Self::new(url, None)
    }

    /// Reads `HTTP_PROXY` / `HTTPS_PROXY` (any letter case) from `vars`.
    ///
    /// Empty values count as unset. When only one is set it is used for both
    /// schemes. Returns `None` when neither is set.
    pub fn from_env_vars<I, K, V>(vars: I) -> Option<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut http = None;
        let mut https = None;
        for (key, value) in vars {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            let key = key.as_ref();
            if http.is_none() && key.eq_ignore_ascii_case("http_proxy") {
                http = Some(value.to_string());
            } else if https.is_none() && key.eq_ignore_ascii_case("https_proxy") {
                https = Some(value.to_string());
            }
        }

        match (http, https) {
            (Some(http), https) => Some(Self::new(http, https)),
            (None, Some(https)) => Some(Self::new(https.clone(), Some(https))),
            (None, None) => None,
        }
    }

    /// Reads the proxy variables of the current process, without modifying them.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process_env() -> Option<Self> {
        Self::from_env_vars(std::env::vars_os().filter_map(|(key, value)| {
            let key = key.into_string().ok()?;
            if !key.eq_ignore_ascii_case("http_proxy") && !key.eq_ignore_ascii_case("https_proxy") {
                return None;
            }
            Some((key, value.into_string().ok()?))
        }))
    }

    /// Builds the transport proxies for this configuration.
    ///
    /// Loopback destinations bypass the proxy.
    pub fn to_transport_proxies(&self) -> Result<[reqwest::Proxy; 2], ProxyError> {
        let bypass = || reqwest::NoProxy::from_string(PROXY_BYPASS_HOSTS);
        let invalid = |url: &str, err: reqwest::Error| ProxyError::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        };

        let http = reqwest::Proxy::http(&self.http)
            .map_err(|e| invalid(&self.http, e))?
            .no_proxy(bypass());
        let https = reqwest::Proxy::https(&self.https)
            .map_err(|e| invalid(&self.https, e))?
            .no_proxy(bypass());
        Ok([http, https])
    }
}

impl std::fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.http == self.https {
            write!(f, "{}", self.http)
        } else {
            write!(f, "HTTP={}, HTTPS={}", self.http, self.https)
        }
    }
}

// ---------------------------------------------------------------------------
// Port probing
// ---------------------------------------------------------------------------

/// Checks whether something accepts TCP connections on `host:port`.
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Returns `true` if a connection could be opened.
    async fn is_open(&self, host: &str, port: u16) -> bool;
}

/// [`PortProbe`] that performs a real TCP connect with a timeout.
#[derive(Debug, Clone, Copy)]
pub struct TcpPortProbe {
    timeout: Duration,
}

impl TcpPortProbe {
    /// Creates a probe with the given connect timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpPortProbe {
    fn default() -> Self {
        Self::new(PORT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl PortProbe for TcpPortProbe {
    async fn is_open(&self, host: &str, port: u16) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(err)) => {
                debug!(host, port, error = %err, "proxy candidate refused connection");
                false
            }
            Err(_elapsed) => {
                debug!(host, port, "proxy candidate did not answer in time");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Determines which forward proxy to use.
///
/// `env_override` wins without any probing. Otherwise `candidates` are probed
/// in order and the first open one is used for both HTTP and HTTPS.
pub async fn resolve_proxy(
    candidates: &[ProxyCandidate],
    env_override: Option<ProxyConfig>,
    probe: &dyn PortProbe,
) -> Option<ProxyConfig> {
    if let Some(config) = env_override {
        info!(proxy = %config, "proxy already configured in the environment");
        return Some(config);
    }

    for candidate in candidates {
        if probe.is_open(&candidate.host, candidate.port).await {
            let config = ProxyConfig::uniform(candidate.url());
            info!(proxy = %config, "detected local forward proxy");
            return Some(config);
        }
        debug!(candidate = %candidate.url(), "proxy candidate not available");
    }

    warn!("no local forward proxy detected; configure one manually if needed");
    None
}
