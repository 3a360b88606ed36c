//! Adapter for every vendor that speaks the OpenAI chat-completions dialect.
//!
//! DeepSeek, OpenAI, Ollama, ML Studio, Aliyun Bailian, Volcano Engine,
//! SiliconFlow and Grok differ only in their defaults, captured by
//! [`VendorProfile`].

use std::time::Duration;

use async_trait::async_trait;
use gateway::{
    normalize_base_url, AdapterConfig, ApiKey, BackendKind, ConfigurationError, InvocationError,
    LlmProvider, MaxTokens, Temperature,
};
use network::NetworkContext;
use tracing::debug;

use crate::chat::{self, ChatRequest, ChatResponse};

const DEEPSEEK_ASSISTANT_PROMPT: &str = "你是DeepSeek，是一个 AI 人工智能助手";
const GROK_SYSTEM_PROMPT: &str = "You are Grok, created by xAI.";

/// Per-vendor defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorProfile {
    /// Used when the configured base URL is empty.
    pub default_base_url: &'static str,
    /// Model used by connection tests.
    pub default_model: &'static str,
    /// System message sent ahead of every prompt, if any.
    pub system_prompt: Option<&'static str>,
    /// Key sent when the configured one is empty.
    pub placeholder_api_key: Option<&'static str>,
}

impl VendorProfile {
    /// Profile for `backend`, or `None` if it is not OpenAI-compatible.
    pub fn for_backend(backend: BackendKind) -> Option<Self> {
        let profile = |default_base_url, default_model| Self {
            default_base_url,
            default_model,
            system_prompt: None,
            placeholder_api_key: None,
        };

        let profile = match backend {
            BackendKind::DeepSeek => profile("https://api.deepseek.com/v1", "deepseek-chat"),
            BackendKind::OpenAi => profile("https://api.openai.com/v1", "gpt-4o-mini"),
            BackendKind::Ollama => Self {
                placeholder_api_key: Some("ollama"),
                ..profile("http://localhost:11434/v1", "llama3")
            },
            BackendKind::MlStudio => profile("http://localhost:1234/v1", "local-model"),
            BackendKind::AliyunBailian => profile(
                "https://dashscope.aliyuncs.com/compatible-mode/v1",
                "qwen-plus",
            ),
            BackendKind::VolcanoEngine => Self {
                system_prompt: Some(DEEPSEEK_ASSISTANT_PROMPT),
                ..profile("https://ark.cn-beijing.volces.com/api/v3", "deepseek-v3-250324")
            },
            BackendKind::SiliconFlow => Self {
                system_prompt: Some(DEEPSEEK_ASSISTANT_PROMPT),
                ..profile("https://api.siliconflow.cn/v1", "deepseek-ai/DeepSeek-V3")
            },
            BackendKind::Grok => Self {
                system_prompt: Some(GROK_SYSTEM_PROMPT),
                ..profile("https://api.x.ai/v1", "grok-2-latest")
            },
            BackendKind::AzureOpenAi | BackendKind::AzureAi | BackendKind::Gemini => return None,
        };
        Some(profile)
    }
}

/// Bearer-authenticated `POST {base}/chat/completions`.
#[derive(Debug)]
pub struct OpenAiCompatibleProvider {
    backend: BackendKind,
    profile: VendorProfile,
    url: String,
    model_name: String,
    api_key: ApiKey,
    max_tokens: MaxTokens,
    temperature: Temperature,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Builds the adapter.
    ///
    /// The base URL goes through [`normalize_base_url`]; an empty one falls
    /// back to the vendor default.
    pub fn new(config: &AdapterConfig, network: &NetworkContext) -> Result<Self, ConfigurationError> {
        let profile = VendorProfile::for_backend(config.backend).ok_or_else(|| {
            ConfigurationError::InvalidParameter {
                field: "interface_format",
                message: format!(
                    "{} is not an OpenAI-compatible backend",
                    config.backend.label()
                ),
            }
        })?;

        let base_url = match normalize_base_url(&config.base_url) {
            normalized if normalized.is_empty() => profile.default_base_url.to_string(),
            normalized => normalized,
        };

        let api_key = match profile.placeholder_api_key {
            Some(placeholder) if config.api_key.is_empty() => ApiKey::new(placeholder),
            _ => config.api_key.clone(),
        };

        Ok(Self {
            backend: config.backend,
            profile,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model_name: config.model_name.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout,
            client: chat::transport_client(config, network)?,
        })
    }

    /// The resolved chat-completions URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, prompt: &str) -> Result<String, InvocationError> {
        let body = ChatRequest {
            model: Some(self.model_name.as_str()),
            messages: chat::messages(self.profile.system_prompt, prompt),
            max_tokens: self.max_tokens.as_u32(),
            temperature: self.temperature.as_f64(),
        };

        debug!(url = %self.url, "sending chat completion request");
        let request = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.expose())
            .json(&body);

        chat::send_json::<ChatResponse>(request, self.timeout)
            .await?
            .into_text()
    }
}

#[cfg(test)]
mod tests {
    use gateway::ProviderFamily;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::test_support::{closed_port, offline_network};

    fn answer(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": text}}]
        }))
    }

    fn provider(backend: BackendKind, base_url: &str, api_key: &str) -> OpenAiCompatibleProvider {
        let config = AdapterConfig::new(backend, base_url, "test-model", api_key);
        OpenAiCompatibleProvider::new(&config, &offline_network()).unwrap()
    }

    #[test]
    fn every_chat_vendor_has_a_profile() {
        for backend in BackendKind::ALL {
            let has_profile = VendorProfile::for_backend(backend).is_some();
            assert_eq!(
                has_profile,
                backend.family() == ProviderFamily::OpenAiCompatible,
                "{backend}"
            );
        }
    }

    #[test]
    fn base_url_is_normalized() {
        let p = provider(BackendKind::DeepSeek, "https://api.example.com/", "k");
        assert_eq!(p.url(), "https://api.example.com/v1/chat/completions");

        let p = provider(BackendKind::VolcanoEngine, "https://ark.example.com/api/v3", "k");
        assert_eq!(p.url(), "https://ark.example.com/api/v3/chat/completions");

        let p = provider(BackendKind::OpenAi, "https://gw.example.com/raw#", "k");
        assert_eq!(p.url(), "https://gw.example.com/raw/chat/completions");
    }

    #[test]
    fn empty_base_url_uses_vendor_default() {
        let p = provider(BackendKind::Ollama, "  ", "");
        assert_eq!(p.url(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn non_chat_backend_is_rejected() {
        let config = AdapterConfig::new(BackendKind::Gemini, "", "gemini-2.0-flash", "k");
        let err = OpenAiCompatibleProvider::new(&config, &offline_network()).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidParameter { field: "interface_format", .. }));
    }

    #[tokio::test]
    async fn posts_prompt_and_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "messages": [{"role": "user", "content": "ping"}],
                "max_tokens": 8192,
                "temperature": 0.7
            })))
            .respond_with(answer("pong"))
            .expect(1)
            .mount(&server)
            .await;

        let p = provider(BackendKind::DeepSeek, &server.uri(), "sk-test");
        assert_eq!(p.invoke("ping").await, "pong");
    }

    #[tokio::test]
    async fn ollama_substitutes_a_placeholder_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer ollama"))
            .respond_with(answer("local"))
            .expect(1)
            .mount(&server)
            .await;

        let p = provider(BackendKind::Ollama, &server.uri(), "");
        assert_eq!(p.invoke("hi").await, "local");
    }

    #[tokio::test]
    async fn vendor_system_prompts_are_sent() {
        for (backend, system) in [
            (BackendKind::Grok, GROK_SYSTEM_PROMPT),
            (BackendKind::SiliconFlow, DEEPSEEK_ASSISTANT_PROMPT),
            (BackendKind::VolcanoEngine, DEEPSEEK_ASSISTANT_PROMPT),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(body_partial_json(json!({
                    "messages": [
                        {"role": "system", "content": system},
                        {"role": "user", "content": "hi"}
                    ]
                })))
                .respond_with(answer("ok"))
                .expect(1)
                .mount(&server)
                .await;

            let p = provider(backend, &server.uri(), "k");
            assert_eq!(p.invoke("hi").await, "ok", "{backend}");
        }
    }

    #[tokio::test]
    async fn http_errors_become_the_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let p = provider(BackendKind::OpenAi, &server.uri(), "k");
        assert_eq!(p.invoke("hi").await, "");
        assert_eq!(
            p.complete("hi").await,
            Err(InvocationError::HttpStatus {
                status: 500,
                body: "upstream exploded".into()
            })
        );
    }

    #[tokio::test]
    async fn slow_backends_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(answer("late").set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = AdapterConfig::new(BackendKind::Grok, server.uri(), "grok", "k")
            .with_timeout(Duration::from_millis(200))
            .unwrap();
        let p = OpenAiCompatibleProvider::new(&config, &offline_network()).unwrap();

        assert_eq!(p.invoke("hi").await, "");
        let err = p.complete("hi").await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.is_network_related());
    }

    #[tokio::test]
    async fn refused_connections_are_network_failures() {
        let p = provider(
            BackendKind::MlStudio,
            &format!("http://127.0.0.1:{}", closed_port()),
            "",
        );

        let err = p.complete("hi").await.unwrap_err();
        assert!(matches!(err, InvocationError::Transport { .. }));
        assert!(err.is_network_related());
        assert_eq!(p.invoke("hi").await, "");
    }

    #[tokio::test]
    async fn malformed_bodies_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let p = provider(BackendKind::AliyunBailian, &server.uri(), "k");
        let err = p.complete("hi").await.unwrap_err();
        assert!(matches!(err, InvocationError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn missing_choices_are_empty_responses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let p = provider(BackendKind::DeepSeek, &server.uri(), "k");
        assert_eq!(p.complete("hi").await, Err(InvocationError::EmptyResponse));
        assert_eq!(p.invoke("hi").await, "");
    }
}
