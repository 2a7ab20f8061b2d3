//! Offline classifier: no network, no model.
//!
//! Each tab goes through, in order: user rules from `[[classifier.rules]]`,
//! a gazetteer of well-known hosts, the looser URL substring buckets of
//! [`url_main_category`], then keyword heuristics over the title.

use regex::Regex;
use tracing::debug;
use url::Url;

use tabcatalog_shared::{
    CategorizationResult, ClassifierConfig, ClassifierRule, Result, TabCatalogError, TabRecord,
};

/// Label when nothing else matches.
pub const MISC_CATEGORY: &str = "Miscellaneous";

/// [`url_main_category`] bucket for URLs with no recognised site.
pub const OTHER_URL_CATEGORY: &str = "Other";

/// Well-known hosts and the entity label they stand for. A host matches an
/// entry when it equals the domain or is a subdomain of it.
const GAZETTEER: &[(&str, &str)] = &[
    ("youtube.com", "YouTube"),
    ("youtu.be", "YouTube"),
    ("github.com", "Coding"),
    ("gitlab.com", "Coding"),
    ("bitbucket.org", "Coding"),
    ("stackoverflow.com", "Coding"),
    ("facebook.com", "Social Media"),
    ("twitter.com", "Social Media"),
    ("x.com", "Social Media"),
    ("instagram.com", "Social Media"),
    ("linkedin.com", "Social Media"),
    ("reddit.com", "Social Media"),
    ("arxiv.org", "Academic"),
    ("scholar.google.com", "Academic"),
    ("wikipedia.org", "Reference"),
];

/// Title keywords, checked in order.
const KEYWORDS: &[(&[&str], &str)] = &[
    (&["research", "paper", "study"], "Academic"),
    (&["github", "gitlab", "bitbucket"], "Development"),
];

#[derive(Debug, Clone, Default)]
pub struct OfflineClassifier {
    rules: Vec<ClassifierRule>,
}

impl OfflineClassifier {
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.rules.clone())
    }

    /// Classify every tab. Fails only when a user rule does not compile;
    /// callers degrade that to the fallback category.
    pub fn classify(&self, tabs: &[TabRecord]) -> Result<CategorizationResult> {
        let rules = self.compile_rules()?;
        let mut result = CategorizationResult::new(tabs.len());

        for (i, tab) in tabs.iter().enumerate() {
            let label = classify_one(&rules, tab);
            debug!(index = i, label, "offline label");
            result.add(label, [i]);
        }
        Ok(result)
    }

    fn compile_rules(&self) -> Result<Vec<(Regex, &str)>> {
        self.rules
            .iter()
            .map(|rule| {
                Regex::new(&format!("(?i){}", rule.pattern))
                    .map(|re| (re, rule.category.as_str()))
                    .map_err(|e| {
                        TabCatalogError::config(format!(
                            "invalid classifier rule {:?}: {e}",
                            rule.pattern
                        ))
                    })
            })
            .collect()
    }
}

fn classify_one<'a>(rules: &'a [(Regex, &'a str)], tab: &TabRecord) -> &'a str {
    let haystack = format!("{} {}", tab.title, tab.url);
    if let Some((_, category)) = rules.iter().find(|(re, _)| re.is_match(&haystack)) {
        return category;
    }

    if let Some(entity) = host_entity(&tab.url) {
        return entity;
    }
    match url_main_category(&tab.url) {
        OTHER_URL_CATEGORY => {}
        bucket => return bucket,
    }

    let title = tab.title.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(words, _)| words.iter().any(|w| title.contains(w)))
        .map(|(_, label)| *label)
        .unwrap_or(MISC_CATEGORY)
}

fn host_entity(url: &str) -> Option<&'static str> {
    let host = Url::parse(url).ok()?.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    GAZETTEER
        .iter()
        .find(|(domain, _)| {
            host == *domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|(_, label)| *label)
}

/// Coarse main category from the URL alone: `YouTube`, `Coding`,
/// `Social Media` or `Other`.
pub fn url_main_category(url: &str) -> &'static str {
    let url = url.to_lowercase();
    if url.contains("youtube") {
        "YouTube"
    } else if url.contains("github") {
        "Coding"
    } else if url.contains("facebook") {
        "Social Media"
    } else {
        OTHER_URL_CATEGORY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabcatalog_shared::TabKind;

    fn tab(title: &str, url: &str) -> TabRecord {
        TabRecord::new(title, url, TabKind::Page)
    }

    #[test]
    fn gazetteer_then_keywords_then_misc() {
        let tabs = vec![
            tab("Never Gonna Give You Up", "https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            tab("A study of borrow checking", "https://example.org/borrowck"),
            tab("Mirror of my github notes", "https://notes.example.com"),
            tab("Groceries", "https://shop.example.com"),
            tab("Rust", "https://en.wikipedia.org/wiki/Rust"),
        ];
        let result = OfflineClassifier::default().classify(&tabs).unwrap();
        let records = result.resolve(&tabs);
        let labels: Vec<_> = records
            .iter()
            .map(|r| r.main_category.as_deref().unwrap())
            .collect();
        assert_eq!(
            labels,
            vec!["YouTube", "Academic", "Development", "Miscellaneous", "Reference"]
        );
    }

    #[test]
    fn host_must_match_on_label_boundary() {
        assert_eq!(host_entity("https://gist.github.com/x"), Some("Coding"));
        assert_eq!(host_entity("https://notgithub.com/x"), None);
        assert_eq!(host_entity("not a url"), None);
    }

    #[test]
    fn user_rules_win() {
        let classifier = OfflineClassifier::new(vec![ClassifierRule {
            pattern: r"docs\.rs".into(),
            category: "Rust Docs".into(),
        }]);
        let tabs = vec![tab("serde - Rust", "https://docs.rs/serde")];
        let result = classifier.classify(&tabs).unwrap();
        assert_eq!(result.get("Rust Docs"), Some(&[0][..]));
    }

    #[test]
    fn invalid_rule_is_an_error() {
        let classifier = OfflineClassifier::new(vec![ClassifierRule {
            pattern: "(unclosed".into(),
            category: "Broken".into(),
        }]);
        let err = classifier.classify(&[tab("a", "https://a.com")]).unwrap_err();
        assert!(err.to_string().contains("invalid classifier rule"));
    }

    #[test]
    fn url_buckets_apply_when_no_host_matches() {
        let tabs = vec![
            tab("raw file", "https://raw.githubusercontent.com/rust-lang/rust/README.md"),
            tab("share link", "not a url, from youtube"),
            tab("A research github mirror", "https://mirror.example.org"),
        ];
        let result = OfflineClassifier::default().classify(&tabs).unwrap();
        assert_eq!(result.get("Coding"), Some(&[0][..]));
        assert_eq!(result.get("YouTube"), Some(&[1][..]));
        assert_eq!(result.get("Academic"), Some(&[2][..]));
    }

    #[test]
    fn url_main_category_buckets() {
        assert_eq!(url_main_category("https://YouTube.com/watch"), "YouTube");
        assert_eq!(url_main_category("https://github.com/rust-lang"), "Coding");
        assert_eq!(url_main_category("https://facebook.com/me"), "Social Media");
        assert_eq!(url_main_category("https://example.com"), "Other");
    }
}
