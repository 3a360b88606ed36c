//! llmgate provider adapters.
//!
//! Implements [`gateway::LlmProvider`] for every supported backend family:
//!
//! | Family | Adapter | Backends |
//! |---|---|---|
//! | OpenAI-compatible | [`OpenAiCompatibleProvider`] | DeepSeek, OpenAI, Ollama, ML Studio, Aliyun Bailian, Volcano Engine, SiliconFlow, Grok |
//! | Azure OpenAI | [`AzureOpenAiProvider`] | Azure OpenAI |
//! | Azure AI Inference | [`AzureAiProvider`] | Azure AI |
//! | Google Generative | [`GeminiProvider`] | Gemini |
//!
//! [`create_adapter`] and [`AdapterFactory`] pick the adapter from a backend
//! id; [`diagnostics`] holds the live connection checks.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request formatting, response parsing and transport
//! error mapping live here. Callers see only `Arc<dyn LlmProvider>`.

mod chat;

pub mod azure_ai;
pub mod azure_openai;
pub mod diagnostics;
pub mod factory;
pub mod gemini;
pub mod openai_compatible;

pub use azure_ai::AzureAiProvider;
pub use azure_openai::AzureOpenAiProvider;
pub use diagnostics::{test_connection, test_gemini_connection, test_settings, GEMINI_TEST_MODEL};
pub use factory::{create_adapter, AdapterFactory};
pub use gemini::{ensure_google_connectivity, generate_content_url, GeminiProvider, GEMINI_API_ROOT};
pub use openai_compatible::{OpenAiCompatibleProvider, VendorProfile};
