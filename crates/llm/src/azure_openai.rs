//! Azure OpenAI deployment adapter.

use std::time::Duration;

use async_trait::async_trait;
use gateway::{
    AdapterConfig, ApiKey, AzureOpenAiEndpoint, BackendKind, ConfigurationError, InvocationError,
    LlmProvider, MaxTokens, Temperature,
};
use network::NetworkContext;
use tracing::debug;

use crate::chat::{self, ChatRequest, ChatResponse};

/// Talks to one Azure OpenAI deployment. The deployment name is the model.
#[derive(Debug)]
pub struct AzureOpenAiProvider {
    endpoint: AzureOpenAiEndpoint,
    url: String,
    api_key: ApiKey,
    max_tokens: MaxTokens,
    temperature: Temperature,
    timeout: Duration,
    client: reqwest::Client,
}

impl AzureOpenAiProvider {
    /// Parses the deployment URL in `config.base_url` and builds the adapter.
    ///
    /// `config.model_name` is ignored.
    pub fn new(config: &AdapterConfig, network: &NetworkContext) -> Result<Self, ConfigurationError> {
        let endpoint = AzureOpenAiEndpoint::parse(&config.base_url)?;
        Ok(Self {
            url: endpoint.chat_completions_url(),
            endpoint,
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout,
            client: chat::transport_client(config, network)?,
        })
    }

    /// The parsed deployment.
    pub fn endpoint(&self) -> &AzureOpenAiEndpoint {
        &self.endpoint
    }

    #[cfg(test)]
    fn at_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }
}

#[async_trait]
impl LlmProvider for AzureOpenAiProvider {
    fn backend(&self) -> BackendKind {
        BackendKind::AzureOpenAi
    }

    fn model_name(&self) -> &str {
        &self.endpoint.deployment
    }

    async fn complete(&self, prompt: &str) -> Result<String, InvocationError> {
        let body = ChatRequest {
            model: None,
            messages: chat::messages(None, prompt),
            max_tokens: self.max_tokens.as_u32(),
            temperature: self.temperature.as_f64(),
        };

        debug!(deployment = %self.endpoint.deployment, "sending Azure OpenAI request");
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
