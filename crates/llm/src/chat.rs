//! OpenAI chat-completions wire format, shared by every chat-style adapter.

use std::time::Duration;

use gateway::{AdapterConfig, ConfigurationError, InvocationError};
use network::NetworkContext;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Longest response body kept in an [`InvocationError::HttpStatus`].
const MAX_ERROR_BODY_CHARS: usize = 2048;

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Builds `[system?, user]`.
pub(crate) fn messages<'a>(system_prompt: Option<&'a str>, prompt: &'a str) -> Vec<ChatMessage<'a>> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system_prompt {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: prompt,
    });
    messages
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    // Azure OpenAI addresses the model through the deployment URL instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice. A present empty string is a valid answer.
    pub(crate) fn into_text(self) -> Result<String, InvocationError> {
        self.choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or(InvocationError::EmptyResponse)
    }
}

/// Builds the adapter's transport client from the context's current proxy.
pub(crate) fn transport_client(
    config: &AdapterConfig,
    network: &NetworkContext,
) -> Result<reqwest::Client, ConfigurationError> {
    network
        .http_client(config.timeout)
        .map_err(|err| ConfigurationError::TransportSetup {
            message: err.to_string(),
        })
}

/// Sends `request` and decodes a JSON body from a success response.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<T, InvocationError> {
    let response = request
        .send()
        .await
        .map_err(|err| map_transport_error(&err, timeout))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| map_transport_error(&err, timeout))?;

    if !status.is_success() {
        return Err(InvocationError::HttpStatus {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    serde_json::from_str(&body).map_err(|err| InvocationError::MalformedResponse {
        message: err.to_string(),
    })
}

pub(crate) fn map_transport_error(err: &reqwest::Error, timeout: Duration) -> InvocationError {
    if err.is_timeout() {
        InvocationError::Timeout { timeout }
    } else {
        InvocationError::Transport {
            message: error_chain(err),
        }
    }
}

// reqwest's Display omits the cause ("error sending request"); keep the chain
// so keyword classification sees "connection refused" and friends.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
