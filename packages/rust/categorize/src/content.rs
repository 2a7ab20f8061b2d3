//! Page text for the tag pass.

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use tabcatalog_shared::{AppConfig, Result, TabCatalogError, TabRecord};

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));

static TEXT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, p, li").expect("valid selector"));

const USER_AGENT: &str = concat!("tabcatalog/", env!("CARGO_PKG_VERSION"));

/// Fetches a page and reduces it to plain text.
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: Client,
    max_chars: usize,
}

impl ContentFetcher {
    pub fn new(timeout_secs: u64, max_chars: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TabCatalogError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, max_chars })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.defaults.request_timeout_secs,
            config.tagging.max_content_chars,
        )
    }

    /// Text content for `tab`, or its title if the page cannot be fetched.
    pub async fn content_for(&self, tab: &TabRecord) -> String {
        match self.fetch_text(&tab.url).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => tab.title.clone(),
            Err(e) => {
                debug!(url = %tab.url, error = %e, "content fetch failed, using title");
                tab.title.clone()
            }
        }
    }

    /// Fetch `url` and extract its visible text.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url).map_err(|e| TabCatalogError::parse(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TabCatalogError::validation(format!(
                "{url}: not an http(s) page"
            )));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| TabCatalogError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TabCatalogError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TabCatalogError::Network(format!("{url}: body read failed: {e}")))?;

        Ok(extract_text(&body, self.max_chars))
    }
}

/// `<title>` plus headings, paragraphs and list items, whitespace-collapsed
/// and cut to `max_chars` characters.
pub fn extract_text(html: &str, max_chars: usize) -> String {
    let doc = Html::parse_document(html);

    let pieces = doc
        .select(&TITLE_SELECTOR)
        .take(1)
        .chain(doc.select(&TEXT_SELECTOR))
        .map(|el| el.text().collect::<Vec<_>>().join(" "));

    let mut text = String::new();
    for piece in pieces {
        for word in piece.split_whitespace() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(word);
        }
    }

    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabcatalog_shared::TabKind;

    const PAGE: &str = r#"<html><head><title>Rust   Blog</title><script>var x = 1;</script></head>
<body><nav>skip me</nav><h1>Announcing Rust</h1><p>The Rust team is
happy to announce a new version.</p><ul><li>faster</li><li>safer</li></ul></body></html>"#;

    #[test]
    fn extracts_and_collapses() {
        let text = extract_text(PAGE, 1_000);
        assert_eq!(
            text,
            "Rust Blog Announcing Rust The Rust team is happy to announce a new version. faster safer"
        );
    }

    #[test]
    fn truncates_on_char_boundary() {
        let text = extract_text("<p>héllo wörld</p>", 7);
        assert_eq!(text, "héllo w");
    }

    #[tokio::test]
    async fn fetches_page_text() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/post"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_raw(PAGE, "text/html"))
            .mount(&server)
            .await;

        let fetcher = ContentFetcher::new(5, 20).unwrap();
        let tab = TabRecord::new("Title", format!("{}/post", server.uri()), TabKind::Page);
        assert_eq!(fetcher.content_for(&tab).await, "Rust Blog Announcing");
    }

    #[tokio::test]
    async fn failure_falls_back_to_title() {
        let fetcher = ContentFetcher::new(2, 100).unwrap();
        let tab = TabRecord::new("Local file", "file:///etc/hosts", TabKind::Page);
        assert_eq!(fetcher.content_for(&tab).await, "Local file");
    }
}
