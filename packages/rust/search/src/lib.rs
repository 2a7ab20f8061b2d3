//! Catalog search: case-insensitive substring filters over `all_tabs.md`.

use std::path::Path;

use tracing::{debug, instrument};

use tabcatalog_catalog::{catalog_path, load_catalog};
use tabcatalog_shared::{Result, TabRecord};

/// Search filters. Every field is optional; set fields are ANDed.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Matches title, URL, main category or any tag.
    pub term: Option<String>,
    /// Matches when any tag contains it.
    pub tag: Option<String>,
    /// Matches when the main category contains it.
    pub category: Option<String>,
}

impl SearchQuery {
    pub fn is_empty(&self) -> bool {
        [&self.term, &self.tag, &self.category]
            .iter()
            .all(|f| f.as_deref().is_none_or(str::is_empty))
    }

    /// Whether `tab` passes every set filter.
    pub fn matches(&self, tab: &TabRecord) -> bool {
        let title = tab.title.to_lowercase();
        let url = tab.url.to_lowercase();
        let category = tab.main_category.as_deref().unwrap_or_default().to_lowercase();
        let tags: Vec<String> = tab.tags.iter().map(|t| t.to_lowercase()).collect();

        if let Some(term) = needle(&self.term) {
            let hit = title.contains(&term)
                || url.contains(&term)
                || category.contains(&term)
                || tags.iter().any(|t| t.contains(&term));
            if !hit {
                return false;
            }
        }
        if let Some(tag) = needle(&self.tag) {
            if !tags.iter().any(|t| t.contains(&tag)) {
                return false;
            }
        }
        if let Some(wanted) = needle(&self.category) {
            if !category.contains(&wanted) {
                return false;
            }
        }
        true
    }
}

/// Empty filters are treated as absent. Anything else, surrounding spaces
/// included, is matched as given.
fn needle(filter: &Option<String>) -> Option<String> {
    filter
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Entries of the catalog in `catalog_dir` matching `query`, in file order.
/// A missing catalog yields no results.
#[instrument(skip_all, fields(dir = %catalog_dir.display()))]
pub fn search(query: &SearchQuery, catalog_dir: &Path) -> Result<Vec<TabRecord>> {
    let tabs = load_catalog(&catalog_path(catalog_dir))?;
    let total = tabs.len();

    let hits: Vec<TabRecord> = tabs.into_iter().filter(|t| query.matches(t)).collect();
    debug!(total, hits = hits.len(), "catalog searched");
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tc-search-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::copy(
            "../../../fixtures/catalog/all_tabs.fixture.md",
            dir.join("all_tabs.md"),
        )
        .expect("copy catalog fixture");
        dir
    }

    fn titles(tabs: &[TabRecord]) -> Vec<&str> {
        tabs.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn term_finds_rick() {
        let dir = fixture_dir();
        let query = SearchQuery {
            term: Some("rick".into()),
            ..Default::default()
        };
        let hits = search(&query, &dir).unwrap();
        assert_eq!(titles(&hits), vec!["Rick Astley - Never Gonna Give You Up"]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn category_filter_is_substring_and_case_insensitive() {
        let dir = fixture_dir();
        let query = SearchQuery {
            category: Some("coding".into()),
            ..Default::default()
        };
        let hits = search(&query, &dir).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|t| {
            t.main_category
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains("coding"))
        }));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn filters_combine_with_and_in_catalog_order() {
        let dir = fixture_dir();
        let query = SearchQuery {
            term: Some("RUST".into()),
            tag: Some("book".into()),
            category: Some("Coding".into()),
        };
        let hits = search(&query, &dir).unwrap();
        assert_eq!(titles(&hits), vec!["The Rust Programming Language"]);

        let query = SearchQuery {
            term: Some("rust".into()),
            ..Default::default()
        };
        let hits = search(&query, &dir).unwrap();
        assert_eq!(
            titles(&hits),
            vec![
                "rust-lang/rust: Empowering everyone to build reliable and efficient software.",
                "The Rust Programming Language",
            ]
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn term_spaces_are_part_of_the_match() {
        let dir = fixture_dir();
        let query = |term: &str| SearchQuery {
            term: Some(term.into()),
            ..Default::default()
        };
        assert_eq!(search(&query("rust-lang"), &dir).unwrap().len(), 2);
        assert!(search(&query(" rust-lang"), &dir).unwrap().is_empty());
        assert!(!query(" ").is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn term_matches_tags() {
        let dir = fixture_dir();
        let query = SearchQuery {
            term: Some("transformers".into()),
            ..Default::default()
        };
        let hits = search(&query, &dir).unwrap();
        assert_eq!(titles(&hits), vec!["Attention Is All You Need"]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_query_returns_everything() {
        let dir = fixture_dir();
        let query = SearchQuery::default();
        assert!(query.is_empty());
        assert_eq!(search(&query, &dir).unwrap().len(), 4);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_catalog_is_empty() {
        let dir = std::env::temp_dir().join(format!("tc-search-none-{}", uuid::Uuid::now_v7()));
        let hits = search(&SearchQuery::default(), &dir).unwrap();
        assert!(hits.is_empty());
    }
}
