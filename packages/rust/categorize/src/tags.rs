//! Per-tab tag generation.

use tracing::{debug, warn};

use tabcatalog_shared::TabRecord;

use crate::parse::parse_tags;
use crate::prompt::tag_prompt;
use crate::providers::TextGenerator;

/// Longest tag kept, in characters.
const MAX_TAG_CHARS: usize = 40;

/// Ask `generator` for tags describing `tab`. Any failure yields no tags.
pub async fn generate_tags(
    generator: &dyn TextGenerator,
    tab: &TabRecord,
    category: &str,
    content: &str,
    max_tags: usize,
) -> Vec<String> {
    if max_tags == 0 {
        return Vec::new();
    }

    let prompt = tag_prompt(tab, category, content, max_tags);
    match generator.generate(&prompt).await {
        Ok(text) => {
            let tags = sanitize_tags(parse_tags(&text), max_tags);
            debug!(url = %tab.url, count = tags.len(), "tags generated");
            tags
        }
        Err(e) => {
            warn!(url = %tab.url, provider = generator.name(), error = %e, "tag generation failed");
            Vec::new()
        }
    }
}

/// Make tags safe for the one-line catalog `Tags:` field.
///
/// Commas and line breaks are removed, whitespace collapsed, empties and
/// case-insensitive duplicates dropped, and the list capped at `max_tags`.
pub fn sanitize_tags<I, S>(raw: I, max_tags: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let cleaned = tag
            .as_ref()
            .replace([',', '\n', '\r'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let cleaned: String = cleaned.chars().take(MAX_TAG_CHARS).collect();
        let cleaned = cleaned.trim().to_string();

        if cleaned.is_empty() || tags.iter().any(|t| t.eq_ignore_ascii_case(&cleaned)) {
            continue;
        }
        tags.push(cleaned);
        if tags.len() == max_tags {
            break;
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tabcatalog_shared::{Result, TabCatalogError, TabKind};

    struct Canned(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .map_err(|e| TabCatalogError::Backend(e.into()))
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn tab() -> TabRecord {
        TabRecord::new("Rust", "https://rust-lang.org", TabKind::Page)
    }

    #[test]
    fn sanitize_strips_separators_and_duplicates() {
        let tags = sanitize_tags(["rust, lang", "Rust  lang", "", "  ", "systems\nprogramming"], 5);
        assert_eq!(tags, vec!["rust lang", "systems programming"]);
    }

    #[test]
    fn sanitize_caps_count() {
        let tags = sanitize_tags(["a", "b", "c", "d"], 2);
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn parses_generator_output() {
        let generator = Canned(Ok(r#"Here: ["rust", "programming", "rust"]"#));
        let tags = generate_tags(&generator, &tab(), "Coding", "content", 5).await;
        assert_eq!(tags, vec!["rust", "programming"]);
    }

    #[tokio::test]
    async fn generator_failure_is_empty() {
        let generator = Canned(Err("boom"));
        let tags = generate_tags(&generator, &tab(), "Coding", "content", 5).await;
        assert!(tags.is_empty());
    }
}
