//! Proxy-aware HTTP client construction.
//!
//! Every outbound client in the workspace is built here, so a proxy resolved
//! into a [`crate::NetworkContext`] reaches every adapter created afterwards.

use std::time::Duration;

use thiserror::Error;

use crate::{ProxyConfig, ProxyError};

/// An HTTP client could not be built.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured proxy URL is unusable.
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// The client builder failed (e.g. TLS backend initialisation).
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Builds a client with a per-request `timeout`, routed through `proxy`.
///
/// With no proxy the client connects directly and ignores the process
/// environment's proxy variables.
pub fn build_http_client(
    proxy: Option<&ProxyConfig>,
    timeout: Duration,
) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder().timeout(timeout);

    match proxy {
        Some(config) => {
            for transport_proxy in config.to_transport_proxies()? {
                builder = builder.proxy(transport_proxy);
            }
        }
        None => builder = builder.no_proxy(),
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_direct_and_proxied_clients() {
        assert!(build_http_client(None, Duration::from_secs(5)).is_ok());

        let proxy = ProxyConfig::uniform("http://127.0.0.1:7890");
        assert!(build_http_client(Some(&proxy), Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn invalid_proxy_is_reported() {
        let proxy = ProxyConfig::uniform("::not a url::");
        let err = build_http_client(Some(&proxy), Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, TransportError::Proxy(_)));
    }
}
