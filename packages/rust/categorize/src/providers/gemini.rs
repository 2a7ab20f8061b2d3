use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use tabcatalog_shared::{GeminiConfig, Result, TabCatalogError};

use super::{TextGenerator, build_client, error_for_status, trim_base};

/// Google Gemini `generateContent` provider.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key: api_key.to_string(),
            api_base: trim_base(&config.api_base),
            model: normalize_model(&config.model).to_string(),
        })
    }
}

/// Config may store "gemini/gemini-1.5-flash" but the API expects the bare name.
fn normalize_model(model: &str) -> &str {
    model.strip_prefix("gemini/").unwrap_or(model)
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let request = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }]
        });

        info!(model = %self.model, prompt_len = prompt.len(), "calling Gemini");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| TabCatalogError::Backend(format!("gemini: request failed: {e}")))?;

        let response = error_for_status("gemini", response).await?;
        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| TabCatalogError::Backend(format!("gemini: invalid response: {e}")))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TabCatalogError::Backend("gemini: no candidates in response".into()))?;

        debug!(len = text.len(), "Gemini response received");
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(server: &wiremock::MockServer) -> GeminiConfig {
        GeminiConfig {
            api_base: server.uri(),
            ..GeminiConfig::default()
        }
    }

    #[test]
    fn model_prefix_is_stripped() {
        assert_eq!(normalize_model("gemini/gemini-1.5-flash"), "gemini-1.5-flash");
        assert_eq!(normalize_model("gemini-1.5-pro"), "gemini-1.5-pro");
    }

    #[tokio::test]
    async fn joins_candidate_parts() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/models/gemini-1.5-flash:generateContent"))
            .and(wiremock::matchers::query_param("key", "test-key"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "{\"Dev\":" }, { "text": "[0]}" }] }
                }]
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(&config_for(&server), "test-key").unwrap();
        let text = provider.generate("prompt").await.unwrap();
        assert_eq!(text, "{\"Dev\":\n[0]}");
    }

    #[tokio::test]
    async fn http_error_is_backend_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(403).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(&config_for(&server), "nope").unwrap();
        let err = provider.generate("prompt").await.unwrap_err();
        assert!(matches!(err, TabCatalogError::Backend(_)));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn empty_candidates_is_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "candidates": [] })),
            )
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(&config_for(&server), "k").unwrap();
        assert!(provider.generate("prompt").await.is_err());
    }
}
