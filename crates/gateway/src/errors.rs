//! Error taxonomy for the adapter layer.
//!
//! Two families with opposite propagation rules:
//!
//! - [`ConfigurationError`] is produced synchronously while an adapter is being
//!   built (unknown backend id, malformed Azure URL, out-of-range parameter).
//!   It is the only error the layer surfaces to its caller.
//! - [`InvocationError`] is produced by a single round trip. `invoke` absorbs
//!   it, logs it, and returns the empty-string sentinel; `complete` hands it
//!   back to callers that want the explicit result.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Substrings that mark a failure message as network-related.
///
/// Matched case-insensitively against the rendered error text.
pub const NETWORK_ERROR_KEYWORDS: [&str; 6] = [
    "connection",
    "timeout",
    "network",
    "proxy",
    "ssl",
    "certificate",
];

/// Returns `true` if `message` mentions any of [`NETWORK_ERROR_KEYWORDS`].
pub fn mentions_network_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    NETWORK_ERROR_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

// ---------------------------------------------------------------------------
// Construction-time errors
// ---------------------------------------------------------------------------

/// An adapter could not be built from the supplied configuration.
///
/// Every variant names the offending input so the message can be shown to the
/// user unchanged.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ConfigurationError {
    /// The backend identifier did not match any known backend.
    #[error("Unknown interface format: '{backend_id}'")]
    UnknownBackend {
        /// The identifier exactly as supplied by the caller.
        backend_id: String,
    },

    /// The Azure OpenAI base URL did not have the deployment-URL shape.
    #[error(
        "Invalid Azure OpenAI base_url format: '{url}'. Expected \
         https://<endpoint>/openai/deployments/<deployment>/chat/completions?api-version=<version>"
    )]
    InvalidAzureOpenAiUrl {
        /// The rejected URL.
        url: String,
    },

    /// The Azure AI Inference base URL did not point at `*.services.ai.azure.com`.
    #[error(
        "Invalid Azure AI base_url format: '{url}'. Expected \
         https://<endpoint>.services.ai.azure.com/models/chat/completions?api-version=<version>"
    )]
    InvalidAzureAiUrl {
        /// The rejected URL.
        url: String,
    },

    /// A numeric or textual parameter is outside its valid range.
    #[error("Invalid value for '{field}': {message}")]
    InvalidParameter {
        /// Name of the configuration field.
        field: &'static str,
        /// What is wrong with the value.
        message: String,
    },

    /// The HTTP transport client could not be constructed.
    #[error("Failed to build HTTP client: {message}")]
    TransportSetup {
        /// Underlying builder error text.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Invocation-time errors
// ---------------------------------------------------------------------------

/// Broad class of an [`InvocationError`], matching the user-facing taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Connection refused, DNS or TLS failure, timeout.
    TransientNetwork,
    /// The backend answered, but not with usable text.
    VendorProtocol,
}

/// A single adapter round trip did not produce usable text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvocationError {
    /// No response arrived within the configured request timeout.
    #[error("request timed out after {}s", timeout.as_secs_f64())]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The request never completed (connection refused, DNS, TLS, proxy).
    #[error("network connection failed: {message}")]
    Transport {
        /// Transport error text, including its source chain.
        message: String,
    },

    /// The backend answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body (possibly truncated) as returned by the backend.
        body: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("malformed response: {message}")]
    MalformedResponse {
        /// Decoder error text.
        message: String,
    },

    /// The response was well formed but carried no choice or candidate text.
    #[error("response contained no text")]
    EmptyResponse,
}

impl InvocationError {
    /// Returns the broad category of this failure.
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => FailureCategory::TransientNetwork,
            Self::HttpStatus { .. } | Self::MalformedResponse { .. } | Self::EmptyResponse => {
                FailureCategory::VendorProtocol
            }
        }
    }

    /// Returns `true` if the failure looks like a connectivity problem.
    ///
    /// Transport and timeout failures always qualify. Vendor failures qualify
    /// when their text mentions a network keyword, e.g. a gateway answering
    /// `502` with "upstream connection reset".
    pub fn is_network_related(&self) -> bool {
        self.category() == FailureCategory::TransientNetwork
            || mentions_network_failure(&self.to_string())
    }

    /// Returns `true` if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_names_the_id() {
        let err = ConfigurationError::UnknownBackend {
            backend_id: "not-a-real-backend".into(),
        };
        assert!(err.to_string().contains("not-a-real-backend"));
    }

    #[test]
    fn transport_failures_are_network_related() {
        let err = InvocationError::Transport {
            message: "error sending request".into(),
        };
        assert_eq!(err.category(), FailureCategory::TransientNetwork);
        assert!(err.is_network_related());

        let timeout = InvocationError::Timeout {
            timeout: Duration::from_secs(3),
        };
        assert!(timeout.is_network_related());
        assert!(timeout.is_timeout());
    }

    #[test]
    fn vendor_failures_use_keyword_scan() {
        let plain = InvocationError::HttpStatus {
            status: 400,
            body: "API key not valid".into(),
        };
        assert_eq!(plain.category(), FailureCategory::VendorProtocol);
        assert!(!plain.is_network_related());

        let gateway = InvocationError::HttpStatus {
            status: 502,
            body: "upstream Connection reset by peer".into(),
        };
        assert!(gateway.is_network_related());
        assert!(!InvocationError::EmptyResponse.is_network_related());
    }

    #[test]
    fn keyword_scan_is_case_insensitive() {
        assert!(mentions_network_failure("SSL handshake failed"));
        assert!(mentions_network_failure("Proxy refused"));
        assert!(!mentions_network_failure("quota exceeded"));
    }
}
