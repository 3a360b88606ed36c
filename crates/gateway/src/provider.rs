//! The provider port.
//!
//! [`LlmProvider`] is the one capability every backend adapter offers: turn a
//! prompt into text. Adapters live in the `llm` crate; callers only ever hold
//! an `Arc<dyn LlmProvider>`.
//!
//! ## Failure contract
//!
//! [`LlmProvider::invoke`] never fails. Every [`InvocationError`] is routed
//! through [`LlmProvider::report_failure`] (which logs it) and replaced with an
//! empty string. Callers that need to tell "the model answered with nothing"
//! apart from "the call failed" use [`LlmProvider::complete`] instead.

use async_trait::async_trait;
use tracing::{error, warn, Instrument};

use crate::{BackendKind, InvocationError, InvocationId};

/// A constructed backend adapter.
///
/// Implementations own their transport client and are safe to call from
/// several tasks at once.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// The backend this adapter talks to.
    fn backend(&self) -> BackendKind;

    /// The model (or Azure deployment) requests are sent to.
    fn model_name(&self) -> &str;

    /// Performs one round trip and returns the generated text.
    ///
    /// `Ok("")` means the backend produced an empty answer;
    /// [`InvocationError::EmptyResponse`] means it produced no answer at all.
    async fn complete(&self, prompt: &str) -> Result<String, InvocationError>;

    /// Performs one round trip, returning an empty string on any failure.
    async fn invoke(&self, prompt: &str) -> String {
        let invocation_id = InvocationId::new_random();
        let backend = self.backend();
        let span = tracing::info_span!(
            "invoke",
            %invocation_id,
            backend = backend.id(),
            model = self.model_name(),
        );

        async move {
            match self.complete(prompt).await {
                Ok(text) => {
                    if text.is_empty() {
                        warn!("{} returned an empty answer", backend.label());
                    }
                    text
                }
                Err(err) => {
                    self.report_failure(&err).await;
                    String::new()
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Logs a failed round trip. Called by [`LlmProvider::invoke`].
    ///
    /// Adapters override this to add backend-specific diagnostics.
    async fn report_failure(&self, error: &InvocationError) {
        log_invocation_failure(self.backend(), error);
    }
}

/// Emits the standard diagnostic line for a failed round trip.
pub fn log_invocation_failure(backend: BackendKind, error: &InvocationError) {
    let label = backend.label();
    match error {
        InvocationError::Timeout { .. } => {
            error!(category = ?error.category(), "{label} API call timed out: {error}");
        }
        InvocationError::EmptyResponse => {
            warn!(category = ?error.category(), "No response from {label} adapter");
        }
        _ => {
            error!(category = ?error.category(), "{label} API call failed: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedProvider {
        outcome: Result<String, InvocationError>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn backend(&self) -> BackendKind {
            BackendKind::OpenAi
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, InvocationError> {
            self.outcome.clone()
        }
    }

    #[tokio::test]
    async fn invoke_returns_text_on_success() {
        let provider = ScriptedProvider {
            outcome: Ok("hello".into()),
        };
        assert_eq!(provider.invoke("hi").await, "hello");
    }

    #[tokio::test]
    async fn invoke_swallows_failures() {
        for outcome in [
            Err(InvocationError::Transport {
                message: "connection refused".into(),
            }),
            Err(InvocationError::EmptyResponse),
            Err(InvocationError::HttpStatus {
                status: 500,
                body: "boom".into(),
            }),
        ] {
            let provider = ScriptedProvider { outcome };
            assert_eq!(provider.invoke("hi").await, "");
        }
    }

    #[tokio::test]
    async fn complete_keeps_the_distinction() {
        let empty = ScriptedProvider {
            outcome: Ok(String::new()),
        };
        assert_eq!(empty.complete("hi").await, Ok(String::new()));

        let failed = ScriptedProvider {
            outcome: Err(InvocationError::EmptyResponse),
        };
        assert_eq!(failed.complete("hi").await, Err(InvocationError::EmptyResponse));
    }
}
