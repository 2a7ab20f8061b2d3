use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use tabcatalog_shared::{OllamaConfig, Result, TabCatalogError};

use super::{TextGenerator, build_client, error_for_status, trim_base};

/// Local Ollama server, non-streaming `/api/chat`.
pub struct OllamaProvider {
    client: Client,
    api_base: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(config: &OllamaConfig, model: &str) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(TabCatalogError::config("ollama model name is empty"));
        }
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_base: trim_base(&config.api_base),
            model: model.trim().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl TextGenerator for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.api_base);
        let request = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
        });

        info!(model = %self.model, prompt_len = prompt.len(), "calling Ollama");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TabCatalogError::Backend(format!("ollama: request failed: {e}")))?;

        let response = error_for_status("ollama", response).await?;
        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| TabCatalogError::Backend(format!("ollama: invalid response: {e}")))?;

        let text = body
            .message
            .map(|m| m.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TabCatalogError::Backend("ollama: empty message".into()))?;

        debug!(len = text.len(), "Ollama response received");
        Ok(text)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
