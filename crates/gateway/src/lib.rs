//! Domain layer for llmgate, the LLM provider adapter layer.
//!
//! This crate holds every concept shared by the adapters: which backends exist,
//! what a valid adapter configuration looks like, how user-typed base URLs map
//! to real endpoints, what can go wrong, and the [`LlmProvider`] port trait the
//! adapters implement.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** No I/O dependencies. The `network` crate
//! supplies proxy resolution and reachability probes; the `llm` crate supplies
//! the adapters themselves.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`backend`] | `BackendKind` and its adapter family |
//! | [`config`] | Raw `ProviderSettings` and validated `AdapterConfig` |
//! | [`endpoint`] | Base-URL normalization, Azure URL parsing |
//! | [`errors`] | `ConfigurationError`, `InvocationError` |
//! | [`identifiers`] | `InvocationId` |
//! | [`logging`] | `LogSink` bridge for the host's log pane |
//! | [`provider`] | The `LlmProvider` port |
//! | [`types`] | `Temperature`, `MaxTokens`, `ApiKey`, `Timestamp` |

pub mod backend;
pub mod config;
pub mod endpoint;
pub mod errors;
pub mod identifiers;
pub mod logging;
pub mod provider;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use backend::{BackendKind, ProviderFamily};
pub use config::{AdapterConfig, ProviderSettings, DEFAULT_TIMEOUT_SECS};
pub use endpoint::{
    normalize_base_url, AzureAiEndpoint, AzureOpenAiEndpoint, DEFAULT_AZURE_AI_API_VERSION,
};
pub use errors::{
    mentions_network_failure, ConfigurationError, FailureCategory, InvocationError,
    NETWORK_ERROR_KEYWORDS,
};
pub use identifiers::InvocationId;
pub use logging::{LogSink, SinkLayer};
pub use provider::{log_invocation_failure, LlmProvider};
pub use types::{ApiKey, MaxTokens, Temperature, Timestamp};
