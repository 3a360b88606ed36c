//! Live connection checks for settings screens and the CLI.
//!
//! Every check performs one real round trip, logs what happened along with
//! hints for the usual causes, and reduces the outcome to a `bool`.

use gateway::{
    AdapterConfig, BackendKind, InvocationError, LlmProvider, ProviderFamily, ProviderSettings,
};
use network::NetworkContext;
use tracing::{error, info, warn};

use crate::{AdapterFactory, GeminiProvider, VendorProfile};

/// Model used by [`test_gemini_connection`].
pub const GEMINI_TEST_MODEL: &str = "gemini-2.0-flash";

const GEMINI_TEST_PROMPT: &str = "Hello";
const SETTINGS_TEST_PROMPT: &str = "Please reply with 'OK'.";

/// Checks that Google is reachable and that `api_key` can call Gemini.
pub async fn test_gemini_connection(api_key: &str, network: &NetworkContext) -> bool {
    test_gemini_at("", api_key, network).await
}

async fn test_gemini_at(base_url: &str, api_key: &str, network: &NetworkContext) -> bool {
    info!("testing Gemini API connection");

    if !network.can_reach_google_api().await {
        warn!("cannot reach Google services; check the network connection or proxy settings");
        return false;
    }

    let config = AdapterConfig::new(BackendKind::Gemini, base_url, GEMINI_TEST_MODEL, api_key);
    let provider = match GeminiProvider::with_network(&config, network) {
        Ok(provider) => provider,
        Err(err) => {
            error!("Gemini API connection failed: {err}");
            return false;
        }
    };

    match provider.complete(GEMINI_TEST_PROMPT).await {
        Ok(text) if !text.is_empty() => {
            info!("Gemini API connection succeeded");
            true
        }
        Ok(_) | Err(InvocationError::EmptyResponse) => {
            warn!("Gemini API returned an empty response");
            false
        }
        Err(err) => {
            error!("Gemini API connection failed: {err}");
            log_gemini_hints(&err);
            false
        }
    }
}

fn log_gemini_hints(error: &InvocationError) {
    if error.to_string().to_uppercase().contains("API_KEY") {
        info!("check that the API key is correct");
    } else if error.is_network_related() {
        info!("network problem; suggestions:");
        info!("  1. make sure a proxy such as Clash is running");
        info!("  2. set a proxy by hand, e.g. set_manual_proxy(\"http://127.0.0.1:7890\")");
        info!("  3. check the firewall settings");
    }
}

/// Checks `backend` with `api_key` against the vendor's default endpoint and model.
///
/// Azure backends need a deployment URL and always report `false`; use
/// [`test_settings`] for them.
pub async fn test_connection(backend: BackendKind, api_key: &str, network: &NetworkContext) -> bool {
    match backend.family() {
        ProviderFamily::GoogleGenerative => test_gemini_connection(api_key, network).await,
        ProviderFamily::AzureOpenAi | ProviderFamily::AzureAiInference => {
            warn!(
                "{} needs a full endpoint URL; test it with complete settings instead",
                backend.label()
            );
            false
        }
        ProviderFamily::OpenAiCompatible => {
            let Some(profile) = VendorProfile::for_backend(backend) else {
                return false;
            };
            let config = AdapterConfig::new(backend, "", profile.default_model, api_key);
            live_check(&config, network).await
        }
    }
}

/// Builds the adapter described by `settings` and performs one round trip.
pub async fn test_settings(settings: &ProviderSettings, network: &NetworkContext) -> bool {
    match AdapterConfig::try_from(settings) {
        Ok(config) => live_check(&config, network).await,
        Err(err) => {
            error!("invalid provider settings: {err}");
            false
        }
    }
}

async fn live_check(config: &AdapterConfig, network: &NetworkContext) -> bool {
    let label = config.backend.label();
    info!(model = %config.model_name, "testing {label} connection");

    let provider = match AdapterFactory::new(network.clone()).create(config).await {
        Ok(provider) => provider,
        Err(err) => {
            error!("could not create {label} adapter: {err}");
            return false;
        }
    };

    match provider.complete(SETTINGS_TEST_PROMPT).await {
        Ok(text) if !text.is_empty() => {
            info!("{label} connection succeeded");
            true
        }
        Ok(_) | Err(InvocationError::EmptyResponse) => {
            warn!("{label} returned an empty response");
            false
        }
        Err(err) => {
            error!(network_related = err.is_network_related(), "{label} connection failed: {err}");
            false
        }
    }
}
