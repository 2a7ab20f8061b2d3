//! Tab ingestion: fetch open tabs from the browser debugging endpoint,
//! drop non-content tabs, and normalize titles.
//!
//! The endpoint (`http://localhost:9222/json` for Chromium-based browsers
//! started with `--remote-debugging-port`) returns a JSON array of loosely
//! typed descriptors. An unreachable endpoint is not an error: it simply
//! means there is nothing to do.

mod decode;
mod filter;

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use tabcatalog_shared::{AppConfig, Result, TabCatalogError, TabRecord};

pub use decode::decode_title;
pub use filter::{deny_reason, filter_pass, filter_tabs};

/// Default browser debugging endpoint.
pub const DEFAULT_TAB_SOURCE_URL: &str = "http://localhost:9222/json";

/// Default timeout in seconds for the tab-source request.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User-Agent string for tab-source requests.
const USER_AGENT: &str = concat!("tabcatalog/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// RawTab
// ---------------------------------------------------------------------------

/// One descriptor as reported by the tab source, before filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTab {
    /// The source's `type` field (`page`, `iframe`, `service_worker`, ...).
    pub kind: String,
    pub title: String,
    pub url: String,
}

impl RawTab {
    /// Read a descriptor leniently: missing or non-string fields become empty.
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            kind: field("type"),
            title: field("title"),
            url: field("url"),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Where and how to reach the tab source.
#[derive(Debug, Clone)]
pub struct TabSourceOptions {
    /// Endpoint returning the JSON tab list.
    pub url: String,
    /// Timeout for the request in seconds.
    pub timeout_secs: u64,
}

impl Default for TabSourceOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_TAB_SOURCE_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl From<&AppConfig> for TabSourceOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            url: config.defaults.tab_source_url.clone(),
            timeout_secs: config.defaults.request_timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Fetch the raw descriptor list.
///
/// Transport failures, non-200 responses and non-array bodies all yield an
/// empty list. Only a failure to build the HTTP client is returned as an error.
#[instrument(skip_all, fields(url = %opts.url))]
pub async fn fetch_tabs(opts: &TabSourceOptions) -> Result<Vec<RawTab>> {
    let client = build_client(opts)?;

    match fetch_raw(&client, &opts.url).await {
        Ok(tabs) => {
            info!(count = tabs.len(), "fetched tab descriptors");
            Ok(tabs)
        }
        Err(e) => {
            warn!(error = %e, "could not reach the tab source, nothing to do");
            Ok(Vec::new())
        }
    }
}

/// Fetch, filter and decode: the catalog-eligible tabs, pages first.
#[instrument(skip_all, fields(url = %opts.url))]
pub async fn ingest(opts: &TabSourceOptions) -> Result<Vec<TabRecord>> {
    let raw = fetch_tabs(opts).await?;
    let tabs = filter_tabs(&raw);
    info!(raw = raw.len(), kept = tabs.len(), "tabs filtered");
    Ok(tabs)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_client(opts: &TabSourceOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| TabCatalogError::Network(format!("failed to build HTTP client: {e}")))
}

async fn fetch_raw(client: &Client, url: &str) -> Result<Vec<RawTab>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TabCatalogError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(TabCatalogError::Network(format!("{url}: HTTP {status}")));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| TabCatalogError::parse(format!("{url}: invalid JSON: {e}")))?;

    let items = body
        .as_array()
        .ok_or_else(|| TabCatalogError::parse(format!("{url}: expected a JSON array")))?;

    debug!(items = items.len(), "tab source responded");
    Ok(items.iter().map(RawTab::from_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts_for(server: &wiremock::MockServer) -> TabSourceOptions {
        TabSourceOptions {
            url: format!("{}/json", server.uri()),
            timeout_secs: 5,
        }
    }

    #[test]
    fn raw_tab_is_lenient() {
        let tab = RawTab::from_value(&json!({"type": "page", "title": null, "id": 3}));
        assert_eq!(tab.kind, "page");
        assert_eq!(tab.title, "");
        assert_eq!(tab.url, "");
    }

    #[tokio::test]
    async fn fetch_returns_descriptors() {
        let server = wiremock::MockServer::start().await;

        let fixture = std::fs::read_to_string("../../../fixtures/json/tabs.fixture.json")
            .expect("read tabs fixture");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/json"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_raw(fixture, "application/json"),
            )
            .mount(&server)
            .await;

        let raw = fetch_tabs(&opts_for(&server)).await.unwrap();
        assert_eq!(raw.len(), 8);
        assert_eq!(raw[0].kind, "page");

        let tabs = ingest(&opts_for(&server)).await.unwrap();
        let titles: Vec<&str> = tabs.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Test Page & Title",
                "Rick Astley - Never Gonna Give You Up",
                "rust-lang/rust: Empowering everyone",
                "Embedded Content",
            ]
        );
    }

    #[tokio::test]
    async fn non_200_is_empty() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/json"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let raw = fetch_tabs(&opts_for(&server)).await.unwrap();
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn non_array_body_is_empty() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/json"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})),
            )
            .mount(&server)
            .await;

        let raw = fetch_tabs(&opts_for(&server)).await.unwrap();
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn unreachable_source_is_empty() {
        let opts = TabSourceOptions {
            // Port 9 (discard) on loopback: connection refused.
            url: "http://127.0.0.1:9/json".into(),
            timeout_secs: 2,
        };
        let tabs = ingest(&opts).await.unwrap();
        assert!(tabs.is_empty());
    }
}
