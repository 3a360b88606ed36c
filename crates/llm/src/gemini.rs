//! Google Gemini adapter.
//!
//! Google's API is blocked in some regions, so this adapter is the only one
//! that takes part in proxy discovery:
//!
//! - [`GeminiProvider::connect`] probes the API host first and, if it is
//!   unreachable, asks the [`NetworkContext`] to detect a local proxy.
//! - A failed call that looks network-related logs remediation guidance and
//!   triggers another detection round.
//! - The transport client follows the context's proxy: it is rebuilt on the
//!   next call whenever the proxy has changed since it was built.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use gateway::{
    log_invocation_failure, AdapterConfig, ApiKey, BackendKind, ConfigurationError,
    InvocationError, LlmProvider, MaxTokens, Temperature,
};
use network::{NetworkContext, ProxyConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::chat;

/// Default API root.
pub const GEMINI_API_ROOT: &str = "https://generativelanguage.googleapis.com";

/// Builds `{root}/v1beta/models/{model}:generateContent`.
///
/// A non-empty `base_url` replaces the root. If it already names an API
/// version (`/v1beta` or `/v1`) it is used as is. `model` may be given with or
/// without its `models/` prefix.
pub fn generate_content_url(base_url: &str, model: &str) -> String {
    let model = model.strip_prefix("models/").unwrap_or(model);
    let root = match base_url.trim() {
        "" => GEMINI_API_ROOT,
        custom => custom,
    }
    .trim_end_matches('/');

    if root.ends_with("/v1beta") || root.ends_with("/v1") {
        format!("{root}/models/{model}:generateContent")
    } else {
        format!("{root}/v1beta/models/{model}:generateContent")
    }
}

/// Probes Google's API and tries to discover a proxy when it is unreachable.
///
/// Only logs; never fails.
pub async fn ensure_google_connectivity(network: &NetworkContext) {
    if network.can_reach_google_api().await {
        info!("Google generative API is reachable");
        return;
    }

    info!("Google generative API is unreachable, trying to detect a local proxy");
    if !network.try_auto_configure_proxy().await {
        warn!("no local proxy detected; if Google is blocked in your region, make sure a VPN or proxy is running");
        return;
    }

    tokio::time::sleep(network.settle_delay()).await;
    if network.can_reach_google_api().await {
        info!("proxy configured, Google generative API is reachable");
    } else {
        warn!("proxy configured but Google generative API is still unreachable; check the proxy configuration");
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Result<String, InvocationError> {
        let parts = self
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .unwrap_or_default();

        let texts: Vec<String> = parts.into_iter().filter_map(|part| part.text).collect();
        if texts.is_empty() {
            return Err(InvocationError::EmptyResponse);
        }
        Ok(texts.concat())
    }
}

#[derive(Debug)]
struct Transport {
    proxy: Option<ProxyConfig>,
    client: reqwest::Client,
}

/// `POST {root}/v1beta/models/{model}:generateContent` with `x-goog-api-key`.
#[derive(Debug)]
pub struct GeminiProvider {
    url: String,
    model_name: String,
    api_key: ApiKey,
    max_tokens: MaxTokens,
    temperature: Temperature,
    timeout: Duration,
    network: NetworkContext,
    transport: RwLock<Transport>,
}

impl GeminiProvider {
    /// Runs the connectivity check (see [`ensure_google_connectivity`]) and
    /// builds the adapter. Connectivity problems never fail construction.
    pub async fn connect(
        config: &AdapterConfig,
        network: &NetworkContext,
    ) -> Result<Self, ConfigurationError> {
        ensure_google_connectivity(network).await;
        Self::with_network(config, network)
    }

    /// Builds the adapter without probing.
    pub fn with_network(
        config: &AdapterConfig,
        network: &NetworkContext,
    ) -> Result<Self, ConfigurationError> {
        let transport = Transport {
            proxy: network.proxy(),
            client: chat::transport_client(config, network)?,
        };

        Ok(Self {
            url: generate_content_url(&config.base_url, &config.model_name),
            model_name: config.model_name.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout,
            network: network.clone(),
            transport: RwLock::new(transport),
        })
    }

    /// The resolved `generateContent` URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn client(&self) -> Result<reqwest::Client, InvocationError> {
        let proxy = self.network.proxy();
        {
            let transport = self.transport.read().unwrap_or_else(PoisonError::into_inner);
            if transport.proxy == proxy {
                return Ok(transport.client.clone());
            }
        }

        let client = self
            .network
            .http_client(self.timeout)
            .map_err(|err| InvocationError::Transport {
                message: err.to_string(),
            })?;
        debug!(proxy = ?proxy, "rebuilt Gemini transport client");

        let mut transport = self.transport.write().unwrap_or_else(PoisonError::into_inner);
        *transport = Transport {
            proxy,
            client: client.clone(),
        };
        Ok(client)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn backend(&self) -> BackendKind {
        BackendKind::Gemini
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, prompt: &str) -> Result<String, InvocationError> {
        let body = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens.as_u32(),
                temperature: self.temperature.as_f64(),
            },
        };

        debug!(url = %self.url, "sending Gemini generateContent request");
        let request = self
            .client()?
            .post(&self.url)
            .header("x-goog-api-key", self.api_key.expose())
            .json(&body);

        chat::send_json::<GenerateContentResponse>(request, self.timeout)
            .await?
            .into_text()
    }

    async fn report_failure(&self, error: &InvocationError) {
        if !error.is_network_related() {
            log_invocation_failure(BackendKind::Gemini, error);
            return;
        }

        error!(category = ?error.category(), "Gemini API network connection failed: {error}");
        info!("if Google is blocked in your region, make sure that:");
        info!("  1. a VPN or local proxy (e.g. Clash for Windows) is running");
        info!("  2. proxy port 7890 (HTTP) or 7891 (SOCKS5) is reachable");
        info!("  3. Google loads normally in a browser");

        if !self.network.can_reach_google_api().await {
            info!("retrying proxy detection");
            self.network.try_auto_configure_proxy().await;
        }
    }
}
