//! Azure AI model inference adapter.

use std::time::Duration;

use async_trait::async_trait;
use gateway::{
    AdapterConfig, ApiKey, AzureAiEndpoint, BackendKind, ConfigurationError, InvocationError,
    LlmProvider, MaxTokens, Temperature,
};
use network::NetworkContext;
use tracing::debug;

use crate::chat::{self, ChatRequest, ChatResponse};

const AZURE_AI_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Talks to `https://{name}.services.ai.azure.com/models`.
#[derive(Debug)]
pub struct AzureAiProvider {
    endpoint: AzureAiEndpoint,
    url: String,
    model_name: String,
    api_key: ApiKey,
    max_tokens: MaxTokens,
    temperature: Temperature,
    timeout: Duration,
    client: reqwest::Client,
}

impl AzureAiProvider {
    /// Parses `config.base_url` and builds the adapter.
    pub fn new(config: &AdapterConfig, network: &NetworkContext) -> Result<Self, ConfigurationError> {
        let endpoint = AzureAiEndpoint::parse(&config.base_url)?;
        Ok(Self {
            url: endpoint.chat_completions_url(),
            endpoint,
            model_name: config.model_name.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout,
            client: chat::transport_client(config, network)?,
        })
    }

    /// The rewritten endpoint.
    pub fn endpoint(&self) -> &AzureAiEndpoint {
        &self.endpoint
    }

    #[cfg(test)]
    fn at_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }
}

#[async_trait]
impl LlmProvider for AzureAiProvider {
    fn backend(&self) -> BackendKind {
        BackendKind::AzureAi
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, prompt: &str) -> Result<String, InvocationError> {
        let body = ChatRequest {
            model: Some(self.model_name.as_str()),
            messages: chat::messages(Some(AZURE_AI_SYSTEM_PROMPT), prompt),
            max_tokens: self.max_tokens.as_u32(),
            temperature: self.temperature.as_f64(),
        };

        debug!(endpoint = %self.endpoint.endpoint, "sending Azure AI inference request");
        let request = self
            .client
            .post(&self.url)
            .header("api-key", self.api_key.expose())
            .json(&body);

        chat::send_json::<ChatResponse>(request, self.timeout)
            .await?
            .into_text()
    }
}
