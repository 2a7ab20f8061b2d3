//! Core domain types for the tab catalog.

use serde::{Deserialize, Serialize};

/// Label used whenever categorization cannot say anything better.
pub const FALLBACK_CATEGORY: &str = "Uncategorized";

// ---------------------------------------------------------------------------
// TabKind
// ---------------------------------------------------------------------------

/// Origin classification reported by the tab source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabKind {
    #[default]
    Page,
    Iframe,
    #[serde(other)]
    Other,
}

impl TabKind {
    /// Map the source's loosely-typed `type` field.
    pub fn from_source(raw: &str) -> Self {
        match raw {
            "page" => Self::Page,
            "iframe" => Self::Iframe,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Iframe => "iframe",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for TabKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TabRecord
// ---------------------------------------------------------------------------

/// One browser tab, the unit of work throughout the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabRecord {
    /// Decoded, NFC-normalized title without control characters.
    pub title: String,
    /// Canonical address.
    pub url: String,
    /// Origin classification from the source.
    #[serde(default)]
    pub kind: TabKind,
    /// Assigned by categorization; absent until then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_category: Option<String>,
    /// Display-ordered tags; never contains empty strings.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TabRecord {
    /// An uncategorized record.
    pub fn new(title: impl Into<String>, url: impl Into<String>, kind: TabKind) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            kind,
            main_category: None,
            tags: Vec::new(),
        }
    }

    /// Builder-style category assignment. Empty labels become [`FALLBACK_CATEGORY`].
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.set_category(category);
        self
    }

    /// Builder-style tag assignment (empty tags are dropped).
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_tags(tags);
        self
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        let category = category.into();
        let category = category.trim();
        self.main_category = Some(if category.is_empty() {
            FALLBACK_CATEGORY.to_string()
        } else {
            category.to_string()
        });
    }

    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags
            .into_iter()
            .map(Into::into)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }
}

// ---------------------------------------------------------------------------
// CategorizationResult
// ---------------------------------------------------------------------------

/// Category label → indices into the originating tab list.
///
/// Every stored index is `< tab_count`; out-of-range indices are dropped on
/// insertion. Categories keep the order in which they were first added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizationResult {
    tab_count: usize,
    categories: Vec<(String, Vec<usize>)>,
}

impl CategorizationResult {
    /// Empty result for a tab list of length `tab_count`.
    pub fn new(tab_count: usize) -> Self {
        Self {
            tab_count,
            categories: Vec::new(),
        }
    }

    /// A single category spanning every index `0..tab_count`.
    pub fn single(label: impl Into<String>, tab_count: usize) -> Self {
        let mut result = Self::new(tab_count);
        result.add(label, 0..tab_count);
        result
    }

    /// The catch-all [`FALLBACK_CATEGORY`] result.
    pub fn fallback(tab_count: usize) -> Self {
        Self::single(FALLBACK_CATEGORY, tab_count)
    }

    /// Add indices under `label`, merging with an existing category of the same
    /// name. Returns the number of indices dropped as out of range.
    pub fn add(&mut self, label: impl Into<String>, indices: impl IntoIterator<Item = usize>) -> usize {
        let label = label.into();
        let label = match label.trim() {
            "" => FALLBACK_CATEGORY.to_string(),
            trimmed => trimmed.to_string(),
        };

        let mut dropped = 0;
        let mut valid = Vec::new();
        for index in indices {
            if index < self.tab_count {
                valid.push(index);
            } else {
                dropped += 1;
            }
        }

        if valid.is_empty() {
            return dropped;
        }

        let pos = match self.categories.iter().position(|(l, _)| *l == label) {
            Some(pos) => pos,
            None => {
                self.categories.push((label, Vec::new()));
                self.categories.len() - 1
            }
        };
        let slot = &mut self.categories[pos].1;
        for index in valid {
            if !slot.contains(&index) {
                slot.push(index);
            }
        }

        dropped
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Indices assigned to `label`.
    pub fn get(&self, label: &str) -> Option<&[usize]> {
        self.categories
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(l, _)| l.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.categories.iter().map(|(l, v)| (l.as_str(), v.as_slice()))
    }

    /// Resolve into categorized records, in input order.
    ///
    /// A tab takes the first category that lists it; tabs no category lists
    /// get [`FALLBACK_CATEGORY`].
    pub fn resolve(&self, tabs: &[TabRecord]) -> Vec<TabRecord> {
        tabs.iter()
            .enumerate()
            .map(|(i, tab)| {
                let label = self
                    .categories
                    .iter()
                    .find(|(_, indices)| indices.contains(&i))
                    .map(|(l, _)| l.as_str())
                    .unwrap_or(FALLBACK_CATEGORY);
                tab.clone().with_category(label)
            })
            .collect()
    }
}
