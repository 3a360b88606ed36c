//! llmgate network infrastructure.
//!
//! Provides everything the adapters need to get a request out of the machine:
//!
//! - [`resolve_proxy`]: discovers a local forward proxy by probing a fixed,
//!   ordered list of loopback ports, unless the environment already names one.
//! - [`ConnectivityProber`]: checks whether Google's generative API answers
//!   through the current proxy.
//! - [`NetworkContext`]: the explicit, shareable proxy state adapters are
//!   built from, with the manual override and clear operations.
//! - [`build_http_client`]: the single place transport clients are built.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Sockets, HTTP and timing live here. The `gateway` crate
//! sees none of it.

pub mod connectivity;
pub mod context;
pub mod proxy;
pub mod transport;

pub use connectivity::{
    ConnectivityProber, ConnectivityReport, CONNECTIVITY_PROBE_TIMEOUT, GOOGLE_API_PROBE_URL,
};
pub use context::{NetworkContext, NetworkContextBuilder, PROXY_SETTLE_DELAY};
pub use proxy::{
    default_candidates, resolve_proxy, PortProbe, ProxyCandidate, ProxyConfig, ProxyError,
    ProxyScheme, TcpPortProbe, PORT_PROBE_TIMEOUT, PROXY_BYPASS_HOSTS,
};
pub use transport::{build_http_client, TransportError};

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::PortProbe;

    /// Probe double that reports a fixed set of open ports and counts calls.
    pub(crate) struct ScriptedProbe {
        open: HashSet<u16>,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        pub(crate) fn new(open: impl IntoIterator<Item = u16>) -> Self {
            Self {
                open: open.into_iter().collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PortProbe for ScriptedProbe {
        async fn is_open(&self, _host: &str, port: u16) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.open.contains(&port)
        }
    }
}
