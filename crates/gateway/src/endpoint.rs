//! Endpoint URL rules.
//!
//! Users paste base URLs in many shapes: with or without a trailing slash, with
//! or without a version segment, sometimes the full Azure request URL copied
//! from a portal. The functions here turn that input into what each adapter
//! family actually calls, or reject it with a [`ConfigurationError`].

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ConfigurationError;

/// API version used for Azure AI Inference when the URL does not carry one.
pub const DEFAULT_AZURE_AI_API_VERSION: &str = "2024-05-01-preview";

static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/v\d+$").expect("version suffix pattern is valid"));

static AZURE_OPENAI_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://(.+?)/openai/deployments/(.+?)/chat/completions\?api-version=(.+)$")
        .expect("Azure OpenAI URL pattern is valid")
});

// Anchored at the start only: anything after the recognised prefix is ignored.
static AZURE_AI_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://(.+?)\.services\.ai\.azure\.com(?:/models)?(?:/chat/completions)?(?:\?api-version=(.+))?",
    )
    .expect("Azure AI URL pattern is valid")
});

// ---------------------------------------------------------------------------
// OpenAI-compatible base URLs
// ---------------------------------------------------------------------------

/// Canonicalises an OpenAI-compatible base URL.
///
/// - Whitespace is trimmed; empty input stays empty (use the vendor default).
/// - A trailing `#` is removed and the rest is returned untouched.
/// - Otherwise `/v1` is appended unless the URL already ends in a `/v<digits>`
///   segment or contains `/v1` anywhere.
pub fn normalize_base_url(raw: &str) -> String {
    let url = raw.trim();
    if url.is_empty() {
        return String::new();
    }

    if let Some(verbatim) = url.strip_suffix('#') {
        return verbatim.to_string();
    }

    if VERSION_SUFFIX.is_match(url) || url.contains("/v1") {
        return url.to_string();
    }

    format!("{}/v1", url.trim_end_matches('/'))
}

// ---------------------------------------------------------------------------
// Azure OpenAI
// ---------------------------------------------------------------------------

/// Components of an Azure OpenAI deployment URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureOpenAiEndpoint {
    /// `https://{resource host}` without a trailing slash.
    pub endpoint: String,
    /// Deployment name; doubles as the effective model name.
    pub deployment: String,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
}

impl AzureOpenAiEndpoint {
    /// Parses `https://{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}`.
    pub fn parse(url: &str) -> Result<Self, ConfigurationError> {
        let trimmed = url.trim();
        let captures = AZURE_OPENAI_URL.captures(trimmed).ok_or_else(|| {
            ConfigurationError::InvalidAzureOpenAiUrl {
                url: url.to_string(),
            }
        })?;

        Ok(Self {
            endpoint: format!("https://{}", &captures[1]),
            deployment: captures[2].to_string(),
            api_version: captures[3].to_string(),
        })
    }

    /// The chat-completions URL for this deployment.
    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

// ---------------------------------------------------------------------------
// Azure AI Inference
// ---------------------------------------------------------------------------

/// Components of an Azure AI model inference URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureAiEndpoint {
    /// Always `https://{name}.services.ai.azure.com/models`.
    pub endpoint: String,
    /// Value of the `api-version` query parameter, or the default.
    pub api_version: String,
}

impl AzureAiEndpoint {
    /// Parses `https://{name}.services.ai.azure.com[/models][/chat/completions][?api-version={v}]`.
    ///
    /// A missing `api-version` defaults to [`DEFAULT_AZURE_AI_API_VERSION`].
    pub fn parse(url: &str) -> Result<Self, ConfigurationError> {
        let trimmed = url.trim();
        let captures =
            AZURE_AI_URL
                .captures(trimmed)
                .ok_or_else(|| ConfigurationError::InvalidAzureAiUrl {
                    url: url.to_string(),
                })?;

        let api_version = captures
            .get(2)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| DEFAULT_AZURE_AI_API_VERSION.to_string());

        Ok(Self {
            endpoint: format!("https://{}.services.ai.azure.com/models", &captures[1]),
            api_version,
        })
    }

    /// The chat-completions URL for this endpoint.
    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/chat/completions?api-version={}",
            self.endpoint, self.api_version
        )
    }
}
