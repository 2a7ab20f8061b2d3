//! Text-generation providers.
//!
//! Each provider turns a prompt into free-form text. Nothing about the
//! response shape is trusted here; interpreting it is the parser's job.

mod gemini;
mod mistral;
mod ollama;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use tabcatalog_shared::{Result, TabCatalogError};

pub use gemini::GeminiProvider;
pub use mistral::MistralProvider;
pub use ollama::OllamaProvider;

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("tabcatalog/", env!("CARGO_PKG_VERSION"));

/// Error bodies are cut to this many characters in messages.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// A backend that answers a prompt with free-form text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send `prompt` and return the raw response text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Human-readable provider name for tracing.
    fn name(&self) -> &str;
}

/// Build a client with a provider-specific timeout.
pub(crate) fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TabCatalogError::Network(format!("failed to build HTTP client: {e}")))
}

/// Turn a non-success response into a backend error.
pub(crate) async fn error_for_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    Err(TabCatalogError::Backend(format!(
        "{provider}: HTTP {status}: {body}"
    )))
}

pub(crate) fn trim_base(api_base: &str) -> String {
    api_base.trim_end_matches('/').to_string()
}
