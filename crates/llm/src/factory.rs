//! Adapter construction from configuration.

use std::sync::Arc;

use gateway::{AdapterConfig, ConfigurationError, LlmProvider, ProviderFamily, ProviderSettings};
use network::NetworkContext;
use tracing::info;

use crate::{AzureAiProvider, AzureOpenAiProvider, GeminiProvider, OpenAiCompatibleProvider};

/// Builds adapters that share one [`NetworkContext`].
#[derive(Debug, Clone, Default)]
pub struct AdapterFactory {
    network: NetworkContext,
}

impl AdapterFactory {
    /// Creates a factory whose adapters share `network`.
    pub fn new(network: NetworkContext) -> Self {
        Self { network }
    }

    /// The context every adapter from this factory uses.
    pub fn network(&self) -> &NetworkContext {
        &self.network
    }

    /// Builds the adapter serving `config.backend`.
    ///
    /// Gemini construction probes connectivity first, hence `async`.
    pub async fn create(
        &self,
        config: &AdapterConfig,
    ) -> Result<Arc<dyn LlmProvider>, ConfigurationError> {
        let provider: Arc<dyn LlmProvider> = match config.backend.family() {
            ProviderFamily::OpenAiCompatible => {
                Arc::new(OpenAiCompatibleProvider::new(config, &self.network)?)
            }
            ProviderFamily::AzureOpenAi => Arc::new(AzureOpenAiProvider::new(config, &self.network)?),
            ProviderFamily::AzureAiInference => {
                Arc::new(AzureAiProvider::new(config, &self.network)?)
            }
            ProviderFamily::GoogleGenerative => {
                Arc::new(GeminiProvider::connect(config, &self.network).await?)
            }
        };

        info!(
            backend = config.backend.id(),
            model = provider.model_name(),
            "created {} adapter",
            config.backend.label()
        );
        Ok(provider)
    }

    /// Validates `settings` and builds the matching adapter.
    pub async fn create_from_settings(
        &self,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn LlmProvider>, ConfigurationError> {
        let config = AdapterConfig::try_from(settings)?;
        self.create(&config).await
    }
}

/// Builds the adapter named by `settings.interface_format`.
pub async fn create_adapter(
    settings: &ProviderSettings,
    network: &NetworkContext,
) -> Result<Arc<dyn LlmProvider>, ConfigurationError> {
    AdapterFactory::new(network.clone())
        .create_from_settings(settings)
        .await
}

#[cfg(test)]
mod tests {
    use gateway::BackendKind;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::test_support::offline_network;

    fn settings(interface_format: &str, base_url: &str) -> ProviderSettings {
        ProviderSettings {
            base_url: base_url.to_string(),
            model_name: "some-model".into(),
            api_key: "key".into(),
            ..ProviderSettings::new(interface_format)
        }
    }

    #[tokio::test]
    async fn unknown_backend_names_the_id() {
        let err = create_adapter(&settings("Claude Direct", ""), &offline_network())
            .await
            .err()
            .unwrap();

        assert_eq!(
            err,
            ConfigurationError::UnknownBackend {
                backend_id: "Claude Direct".into()
            }
        );
        assert!(err.to_string().contains("Claude Direct"));
    }

    #[tokio::test]
    async fn ids_are_case_and_whitespace_insensitive() {
        for (id, backend) in [
            ("  LM Studio ", BackendKind::MlStudio),
            ("ML STUDIO", BackendKind::MlStudio),
            ("Ollama", BackendKind::Ollama),
            ("硅基流动", BackendKind::SiliconFlow),
            ("阿里云百炼", BackendKind::AliyunBailian),
            ("火山引擎", BackendKind::VolcanoEngine),
            ("xAI", BackendKind::Grok),
        ] {
            let provider = create_adapter(&settings(id, ""), &offline_network())
                .await
                .unwrap();
            assert_eq!(provider.backend(), backend, "{id}");
        }
    }

    #[tokio::test]
    async fn every_family_is_constructible() {
        let network = offline_network();
        let factory = AdapterFactory::new(network);

        let azure = factory
            .create_from_settings(&settings(
                "Azure OpenAI",
                "https://r.openai.azure.com/openai/deployments/d1/chat/completions?api-version=v",
            ))
            .await
            .unwrap();
        assert_eq!(azure.model_name(), "d1");

        let azure_ai = factory
            .create_from_settings(&settings("Azure AI", "https://r.services.ai.azure.com"))
            .await
            .unwrap();
        assert_eq!(azure_ai.backend(), BackendKind::AzureAi);

        let gemini = factory
            .create_from_settings(&settings("Google", ""))
            .await
            .unwrap();
        assert_eq!(gemini.backend(), BackendKind::Gemini);
    }

    #[tokio::test]
    async fn invalid_parameters_are_rejected() {
        let mut bad = settings("openai", "");
        bad.temperature = 2.5;
        let err = create_adapter(&bad, &offline_network()).await.err().unwrap();
        assert!(matches!(
            err,
            ConfigurationError::InvalidParameter {
                field: "temperature",
                ..
            }
        ));

        let err = create_adapter(&settings("azure openai", "https://nope"), &offline_network())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ConfigurationError::InvalidAzureOpenAiUrl { .. }));
    }

    #[tokio::test]
    async fn created_adapter_invokes_the_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "factory-made"}}]
            })))
            .mount(&server)
            .await;

        let provider = create_adapter(&settings("deepseek", &server.uri()), &offline_network())
            .await
            .unwrap();

        assert_eq!(provider.invoke("hi").await, "factory-made");
    }
}
