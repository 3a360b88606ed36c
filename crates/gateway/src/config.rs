//! Adapter configuration.
//!
//! [`ProviderSettings`] is the raw record the host application's configuration
//! source hands over: plain strings and numbers, nothing validated.
//! [`AdapterConfig`] is the validated, immutable value an adapter is built
//! from. The conversion is the single place where user input is checked.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ApiKey, BackendKind, ConfigurationError, MaxTokens, Temperature};

/// Default request timeout when the configuration source has none.
pub const DEFAULT_TIMEOUT_SECS: i64 = 600;

// ---------------------------------------------------------------------------
// Raw settings
// ---------------------------------------------------------------------------

/// Unvalidated adapter settings, as stored by the host application.
///
/// Field names match the host's persisted LLM configuration entries so a
/// stored entry deserializes directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Backend identifier, e.g. `"OpenAI"`, `"Azure AI"`, `"硅基流动"`.
    pub interface_format: String,

    /// Base URL as typed by the user. May be empty.
    #[serde(default)]
    pub base_url: String,

    /// Model name. Ignored by Azure OpenAI, which uses the deployment name.
    #[serde(default)]
    pub model_name: String,

    /// API key. May be empty for local backends.
    #[serde(default)]
    pub api_key: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i64,

    /// Request timeout in whole seconds.
    #[serde(default = "default_timeout")]
    pub timeout: i64,
}

fn default_temperature() -> f64 {
    Temperature::default().as_f64()
}

fn default_max_tokens() -> i64 {
    i64::from(MaxTokens::default().as_u32())
}

fn default_timeout() -> i64 {
    DEFAULT_TIMEOUT_SECS
}

impl ProviderSettings {
    /// Creates settings for `interface_format` with every other field defaulted.
    pub fn new(interface_format: impl Into<String>) -> Self {
        Self {
            interface_format: interface_format.into(),
            base_url: String::new(),
            model_name: String::new(),
            api_key: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout: default_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// Validated configuration for one adapter instance.
///
/// Owned by the adapter built from it; adapters never hand out mutable access.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    /// Which backend to talk to.
    pub backend: BackendKind,
    /// Base URL as supplied; each adapter family interprets it.
    pub base_url: String,
    /// Model name sent with every request.
    pub model_name: String,
    /// API key.
    pub api_key: ApiKey,
    /// Generation token limit.
    pub max_tokens: MaxTokens,
    /// Sampling temperature.
    pub temperature: Temperature,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl AdapterConfig {
    /// Creates a configuration with default sampling parameters and timeout.
    pub fn new(
        backend: BackendKind,
        base_url: impl Into<String>,
        model_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            base_url: base_url.into(),
            model_name: model_name.into().trim().to_string(),
            api_key: ApiKey::new(api_key),
            max_tokens: MaxTokens::default(),
            temperature: Temperature::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS.unsigned_abs()),
        }
    }

    /// Replaces the per-request timeout. Zero is rejected.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ConfigurationError> {
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidParameter {
                field: "timeout",
                message: "must be greater than zero".into(),
            });
        }
        self.timeout = timeout;
        Ok(self)
    }

    /// Replaces the sampling temperature.
    pub fn with_temperature(mut self, temperature: Temperature) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replaces the generation token limit.
    pub fn with_max_tokens(mut self, max_tokens: MaxTokens) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl TryFrom<&ProviderSettings> for AdapterConfig {
    type Error = ConfigurationError;

    fn try_from(settings: &ProviderSettings) -> Result<Self, Self::Error> {
        let backend = BackendKind::parse(&settings.interface_format)?;

        let temperature = Temperature::new(settings.temperature).ok_or_else(|| {
            ConfigurationError::InvalidParameter {
                field: "temperature",
                message: format!(
                    "{} is outside [0.0, {}]",
                    settings.temperature,
                    Temperature::MAX
                ),
            }
        })?;

        let max_tokens = u32::try_from(settings.max_tokens)
            .ok()
            .and_then(MaxTokens::new)
            .ok_or_else(|| ConfigurationError::InvalidParameter {
                field: "max_tokens",
                message: format!("{} is not a positive 32-bit integer", settings.max_tokens),
            })?;

        let timeout_secs = u64::try_from(settings.timeout)
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ConfigurationError::InvalidParameter {
                field: "timeout",
                message: format!("{} is not a positive number of seconds", settings.timeout),
            })?;

        Self::new(
            backend,
            settings.base_url.clone(),
            settings.model_name.clone(),
            settings.api_key.clone(),
        )
        .with_temperature(temperature)
        .with_max_tokens(max_tokens)
        .with_timeout(Duration::from_secs(timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: ProviderSettings =
            serde_json::from_str(r#"{"interface_format": "OpenAI", "api_key": "sk"}"#).unwrap();
        assert_eq!(settings.temperature, 0.7);
        assert_eq!(settings.max_tokens, 8192);
        assert_eq!(settings.timeout, 600);
        assert!(settings.base_url.is_empty());
    }

    #[test]
    fn converts_valid_settings() {
        let settings = ProviderSettings {
            base_url: "https://api.deepseek.com".into(),
            model_name: " deepseek-chat ".into(),
            api_key: "sk-1".into(),
            temperature: 1.2,
            max_tokens: 2048,
            timeout: 30,
            ..ProviderSettings::new("DeepSeek")
        };
        let config = AdapterConfig::try_from(&settings).unwrap();
        assert_eq!(config.backend, BackendKind::DeepSeek);
        assert_eq!(config.model_name, "deepseek-chat");
        assert_eq!(config.max_tokens.as_u32(), 2048);
        assert_eq!(config.temperature.as_f64(), 1.2);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = AdapterConfig::try_from(&ProviderSettings::new("not-a-real-backend")).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownBackend { .. }));
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let hot = ProviderSettings {
            temperature: 2.5,
            ..ProviderSettings::new("openai")
        };
        assert!(matches!(
            AdapterConfig::try_from(&hot),
            Err(ConfigurationError::InvalidParameter { field: "temperature", .. })
        ));

        let no_tokens = ProviderSettings {
            max_tokens: 0,
            ..ProviderSettings::new("openai")
        };
        assert!(matches!(
            AdapterConfig::try_from(&no_tokens),
            Err(ConfigurationError::InvalidParameter { field: "max_tokens", .. })
        ));

        let negative_timeout = ProviderSettings {
            timeout: -5,
            ..ProviderSettings::new("openai")
        };
        assert!(matches!(
            AdapterConfig::try_from(&negative_timeout),
            Err(ConfigurationError::InvalidParameter { field: "timeout", .. })
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = AdapterConfig::new(BackendKind::Ollama, "", "llama3", "");
        assert!(config.with_timeout(Duration::ZERO).is_err());
    }
}
