use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use tabcatalog_shared::{MistralConfig, Result, TabCatalogError};

use super::{TextGenerator, build_client, error_for_status, trim_base};

/// Mistral chat-completions provider (OpenAI-compatible wire format).
pub struct MistralProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl MistralProvider {
    pub fn new(config: &MistralConfig, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key: api_key.to_string(),
            api_base: trim_base(&config.api_base),
            model: config.model.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for MistralProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let request = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        info!(model = %self.model, prompt_len = prompt.len(), "calling Mistral");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TabCatalogError::Backend(format!("mistral: request failed: {e}")))?;

        let response = error_for_status("mistral", response).await?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| TabCatalogError::Backend(format!("mistral: invalid response: {e}")))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TabCatalogError::Backend("mistral: empty completion".into()))?;

        debug!(len = text.len(), "Mistral response received");
        Ok(text)
    }

    fn name(&self) -> &str {
        "mistral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(server: &wiremock::MockServer) -> MistralConfig {
        MistralConfig {
            api_base: format!("{}/v1/", server.uri()),
            ..MistralConfig::default()
        }
    }

    #[tokio::test]
    async fn sends_bearer_and_reads_first_choice() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/chat/completions"))
            .and(wiremock::matchers::header("authorization", "Bearer sk-test"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"News\": [0, 1]}" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = MistralProvider::new(&config_for(&server), "sk-test").unwrap();
        let text = provider.generate("hello").await.unwrap();
        assert_eq!(text, r#"{"News": [0, 1]}"#);
    }

    #[tokio::test]
    async fn server_error_is_backend_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = MistralProvider::new(&config_for(&server), "sk-test").unwrap();
        let err = provider.generate("hello").await.unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }
}
