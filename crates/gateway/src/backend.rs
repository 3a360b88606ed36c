//! Backend identifiers.
//!
//! The host application stores the backend as a free-form "interface format"
//! string. [`BackendKind::parse`] resolves it once, at the boundary, into a
//! closed enum; everything downstream matches exhaustively on the enum.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigurationError;

/// A supported LLM backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// DeepSeek's OpenAI-compatible API.
    DeepSeek,
    /// OpenAI or any service speaking its chat-completions protocol.
    OpenAi,
    /// Azure OpenAI deployment endpoint.
    AzureOpenAi,
    /// Azure AI model inference endpoint (`*.services.ai.azure.com`).
    AzureAi,
    /// Self-hosted Ollama.
    Ollama,
    /// Self-hosted LM Studio.
    MlStudio,
    /// Google's generative language API.
    Gemini,
    /// Alibaba Cloud Bailian (DashScope compatible mode).
    AliyunBailian,
    /// Volcano Engine Ark.
    VolcanoEngine,
    /// SiliconFlow.
    SiliconFlow,
    /// xAI Grok.
    Grok,
}

/// The adapter implementation family that serves a [`BackendKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    /// Bearer-authenticated `/chat/completions`.
    OpenAiCompatible,
    /// Deployment-scoped URL with `api-key` header.
    AzureOpenAi,
    /// Azure AI model inference `/models/chat/completions`.
    AzureAiInference,
    /// `models/{model}:generateContent`.
    GoogleGenerative,
}

impl BackendKind {
    /// Every backend, in the order the host application lists them.
    pub const ALL: [BackendKind; 11] = [
        Self::DeepSeek,
        Self::OpenAi,
        Self::AzureOpenAi,
        Self::AzureAi,
        Self::Ollama,
        Self::MlStudio,
        Self::Gemini,
        Self::AliyunBailian,
        Self::VolcanoEngine,
        Self::SiliconFlow,
        Self::Grok,
    ];

    /// Resolves a user-supplied backend identifier.
    ///
    /// Matching ignores surrounding whitespace and ASCII case.
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        let needle = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.aliases().contains(&needle.as_str()))
            .ok_or_else(|| ConfigurationError::UnknownBackend {
                backend_id: raw.to_string(),
            })
    }

    /// Lower-case identifiers accepted by [`BackendKind::parse`].
    ///
    /// The first entry is the canonical id.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::DeepSeek => &["deepseek"],
            Self::OpenAi => &["openai"],
            Self::AzureOpenAi => &["azure openai"],
            Self::AzureAi => &["azure ai"],
            Self::Ollama => &["ollama"],
            Self::MlStudio => &["ml studio", "lm studio"],
            Self::Gemini => &["gemini", "google"],
            Self::AliyunBailian => &["阿里云百炼", "aliyun", "bailian", "dashscope"],
            Self::VolcanoEngine => &["火山引擎", "volcano engine", "volcengine"],
            Self::SiliconFlow => &["硅基流动", "siliconflow"],
            Self::Grok => &["grok", "xai"],
        }
    }

    /// Canonical identifier.
    pub fn id(self) -> &'static str {
        self.aliases()[0]
    }

    /// Human-readable vendor label used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::DeepSeek => "DeepSeek",
            Self::OpenAi => "OpenAI",
            Self::AzureOpenAi => "Azure OpenAI",
            Self::AzureAi => "Azure AI Inference",
            Self::Ollama => "Ollama",
            Self::MlStudio => "ML Studio",
            Self::Gemini => "Gemini",
            Self::AliyunBailian => "Aliyun Bailian",
            Self::VolcanoEngine => "Volcano Engine",
            Self::SiliconFlow => "SiliconFlow",
            Self::Grok => "Grok",
        }
    }

    /// The adapter family implementing this backend.
    pub fn family(self) -> ProviderFamily {
        match self {
            Self::AzureOpenAi => ProviderFamily::AzureOpenAi,
            Self::AzureAi => ProviderFamily::AzureAiInference,
            Self::Gemini => ProviderFamily::GoogleGenerative,
            Self::DeepSeek
            | Self::OpenAi
            | Self::Ollama
            | Self::MlStudio
            | Self::AliyunBailian
            | Self::VolcanoEngine
            | Self::SiliconFlow
            | Self::Grok => ProviderFamily::OpenAiCompatible,
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_and_whitespace_insensitive() {
        assert_eq!(BackendKind::parse("  OpenAI "), Ok(BackendKind::OpenAi));
        assert_eq!(BackendKind::parse("Azure OpenAI"), Ok(BackendKind::AzureOpenAi));
        assert_eq!(BackendKind::parse("AZURE AI"), Ok(BackendKind::AzureAi));
        assert_eq!(BackendKind::parse("ML Studio"), Ok(BackendKind::MlStudio));
        assert_eq!(BackendKind::parse("Gemini"), Ok(BackendKind::Gemini));
    }

    #[test]
    fn case_folding_is_ascii_only() {
        // U+212A KELVIN SIGN lowercases to 'k' under Unicode rules.
        assert!(BackendKind::parse("GRO\u{212A}").is_err());
        assert_eq!(BackendKind::parse("GROK"), Ok(BackendKind::Grok));
    }

    #[test]
    fn regional_aliases_resolve() {
        assert_eq!(BackendKind::parse("阿里云百炼"), Ok(BackendKind::AliyunBailian));
        assert_eq!(BackendKind::parse("火山引擎"), Ok(BackendKind::VolcanoEngine));
        assert_eq!(BackendKind::parse("硅基流动"), Ok(BackendKind::SiliconFlow));
        assert_eq!(BackendKind::parse("VolcEngine"), Ok(BackendKind::VolcanoEngine));
    }

    #[test]
    fn unknown_id_is_a_configuration_error() {
        let err = BackendKind::parse("not-a-real-backend").unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownBackend {
                backend_id: "not-a-real-backend".into()
            }
        );
    }

    #[test]
    fn aliases_are_unique_across_backends() {
        let mut seen = std::collections::HashSet::new();
        for kind in BackendKind::ALL {
            for alias in kind.aliases() {
                assert!(seen.insert(*alias), "duplicate alias {alias}");
                assert_eq!(BackendKind::parse(alias), Ok(kind));
            }
        }
    }

    #[test]
    fn several_ids_share_the_openai_family() {
        for kind in [
            BackendKind::OpenAi,
            BackendKind::AliyunBailian,
            BackendKind::DeepSeek,
            BackendKind::Grok,
        ] {
            assert_eq!(kind.family(), ProviderFamily::OpenAiCompatible);
        }
        assert_eq!(BackendKind::Gemini.family(), ProviderFamily::GoogleGenerative);
    }
}
