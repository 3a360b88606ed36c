//! llmgate CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: flags with environment fallbacks, or a JSON
//!    provider settings file (`--settings`).
//! 2. **Wire observability**: see [`telemetry`].
//! 3. **Construct infrastructure**: one [`NetworkContext`] (seeded from
//!    `--proxy` or the process environment) shared by every adapter.
//! 4. **Run the command**:
//!    - `invoke`: send one prompt and print the answer.
//!    - `test-connection`: live connection check for a backend or settings.
//!    - `probe`: Google generative API reachability report as JSON.
//!    - `detect-proxy`: look for a local forward proxy.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use gateway::{BackendKind, ProviderSettings, DEFAULT_TIMEOUT_SECS};
use llm::{create_adapter, test_connection, test_settings};
use network::{ConnectivityProber, NetworkContext, ProxyConfig, GOOGLE_API_PROBE_URL};
use tokio::io::AsyncReadExt;
use tracing::info;

mod telemetry;

use telemetry::LogFormat;

/// Talk to LLM backends through one adapter layer.
#[derive(Parser)]
#[command(name = "llmgate")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins
    #[arg(long, global = true, env = "LLMGATE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log line format on stderr
    #[arg(long, global = true, env = "LLMGATE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Forward proxy for HTTP and HTTPS (disables proxy discovery)
    #[arg(long, global = true, env = "LLMGATE_PROXY", value_name = "URL")]
    proxy: Option<String>,

    /// Separate forward proxy for HTTPS
    #[arg(long, global = true, env = "LLMGATE_HTTPS_PROXY", value_name = "URL", requires = "proxy")]
    https_proxy: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one prompt and print the answer
    Invoke {
        #[command(flatten)]
        provider: ProviderArgs,

        /// Prompt text; read from stdin when omitted
        prompt: Option<String>,
    },

    /// Run a live connection check
    ///
    /// With `--settings` or `--base-url` the full settings are tested;
    /// otherwise the backend's default endpoint and model are used.
    TestConnection {
        #[command(flatten)]
        provider: ProviderArgs,
    },

    /// Check whether Google's generative API is reachable
    Probe {
        /// URL to probe
        #[arg(long, default_value = GOOGLE_API_PROBE_URL)]
        target: String,
    },

    /// Look for a local forward proxy on the usual ports
    DetectProxy,
}

#[derive(Args)]
struct ProviderArgs {
    /// JSON provider settings file (overrides the individual flags)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Backend id, e.g. "deepseek", "azure openai", "gemini"
    #[arg(long, env = "LLMGATE_BACKEND")]
    backend: Option<String>,

    /// Base URL; empty uses the vendor default where there is one
    #[arg(long, env = "LLMGATE_BASE_URL", default_value = "")]
    base_url: String,

    /// Model name (ignored by Azure OpenAI)
    #[arg(long, env = "LLMGATE_MODEL", default_value = "")]
    model: String,

    /// API key
    #[arg(long, env = "LLMGATE_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Sampling temperature, 0.0 to 2.0
    #[arg(long, default_value_t = 0.7)]
    temperature: f64,

    /// Maximum tokens to generate
    #[arg(long, default_value_t = 8192)]
    max_tokens: i64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: i64,
}

impl ProviderArgs {
    fn uses_full_settings(&self) -> bool {
        self.settings.is_some() || !self.base_url.trim().is_empty()
    }

    fn into_settings(self) -> Result<ProviderSettings> {
        if let Some(path) = self.settings {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings file {}", path.display()))?;
            return serde_json::from_str(&raw)
                .with_context(|| format!("invalid settings file {}", path.display()));
        }

        let backend = self
            .backend
            .context("either --settings or --backend is required")?;

        Ok(ProviderSettings {
            interface_format: backend,
            base_url: self.base_url,
            model_name: self.model,
            api_key: self.api_key,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _telemetry = telemetry::init(&cli.log_level, cli.log_format)?;

    let network = network_context(cli.proxy.as_deref(), cli.https_proxy.as_deref())?;

    match cli.command {
        Command::Invoke { provider, prompt } => invoke(provider, prompt, &network).await,
        Command::TestConnection { provider } => check_connection(provider, &network).await,
        Command::Probe { target } => probe(&target, &network).await,
        Command::DetectProxy => detect_proxy(&network).await,
    }
}

fn network_context(proxy: Option<&str>, https_proxy: Option<&str>) -> Result<NetworkContext> {
    let Some(proxy) = proxy else {
        return Ok(NetworkContext::from_env());
    };

    let config = ProxyConfig::new(proxy, https_proxy.map(str::to_string));
    config
        .to_transport_proxies()
        .context("invalid --proxy setting")?;
    info!(proxy = %config, "using configured proxy");

    Ok(NetworkContext::builder().proxy(Some(config)).build())
}

async fn invoke(provider: ProviderArgs, prompt: Option<String>, network: &NetworkContext) -> Result<()> {
    let settings = provider.into_settings()?;
    let prompt = match prompt {
        Some(prompt) => prompt,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("failed to read prompt from stdin")?;
            buffer
        }
    };

    let adapter = create_adapter(&settings, network).await?;
    match adapter.complete(&prompt).await {
        Ok(text) => {
            println!("{text}");
            Ok(())
        }
        Err(err) => {
            adapter.report_failure(&err).await;
            Err(err).context(format!("{} request failed", adapter.backend().label()))
        }
    }
}

async fn check_connection(provider: ProviderArgs, network: &NetworkContext) -> Result<()> {
    let passed = if provider.uses_full_settings() {
        test_settings(&provider.into_settings()?, network).await
    } else {
        let backend_id = provider
            .backend
            .context("either --settings or --backend is required")?;
        test_connection(BackendKind::parse(&backend_id)?, &provider.api_key, network).await
    };

    if !passed {
        bail!("connection test failed");
    }
    println!("connection OK");
    Ok(())
}

async fn probe(target: &str, network: &NetworkContext) -> Result<()> {
    let report = ConnectivityProber::new(target)
        .probe(network.proxy().as_ref())
        .await;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to render report")?
    );

    if !report.is_reachable() {
        bail!("{target} is not reachable");
    }
    Ok(())
}

async fn detect_proxy(network: &NetworkContext) -> Result<()> {
    if !network.try_auto_configure_proxy().await {
        bail!("no local proxy detected");
    }

    match network.proxy() {
        Some(proxy) => {
            println!("{proxy}");
            Ok(())
        }
        None => bail!("no local proxy detected"),
    }
}
