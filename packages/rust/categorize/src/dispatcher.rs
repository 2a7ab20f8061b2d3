//! Categorization dispatcher: one backend in, categorized records out.
//!
//! Backend failures never escape. A transport error, a malformed response or
//! an offline classifier error labels the whole batch with the fallback
//! category instead of partially processing it.

use tracing::{info, instrument, warn};

use tabcatalog_shared::{CategorizationResult, TabRecord, TaggingConfig};

use crate::capabilities::{Backend, BackendKind};
use crate::content::ContentFetcher;
use crate::parse::parse_categories;
use crate::prompt::categorize_prompt;
use crate::tags::generate_tags;

/// Progress callbacks for a categorization run.
pub trait CategorizeProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Task-level progress within the current phase.
    fn task_progress(&self, current: usize, total: usize, detail: &str);
}

/// No-op categorization progress.
pub struct SilentCategorizeProgress;

impl CategorizeProgress for SilentCategorizeProgress {
    fn phase(&self, _name: &str) {}
    fn task_progress(&self, _current: usize, _total: usize, _detail: &str) {}
}

pub struct Dispatcher {
    backend: Backend,
    tagging: TaggingConfig,
    content: ContentFetcher,
}

impl Dispatcher {
    pub fn new(backend: Backend, tagging: TaggingConfig, content: ContentFetcher) -> Self {
        Self {
            backend,
            tagging,
            content,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Produce a category → indices mapping for `tabs`. Never fails.
    #[instrument(skip_all, fields(backend = %self.backend.kind(), tabs = tabs.len()))]
    pub async fn categorize(&self, tabs: &[TabRecord]) -> CategorizationResult {
        let n = tabs.len();
        if n == 0 {
            return CategorizationResult::new(0);
        }

        match &self.backend {
            Backend::Offline(classifier) => match classifier.classify(tabs) {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "offline classifier failed, labelling batch as fallback");
                    CategorizationResult::fallback(n)
                }
            },
            Backend::Fallback => CategorizationResult::fallback(n),
            backend => {
                let Some(generator) = backend.generator() else {
                    return CategorizationResult::fallback(n);
                };
                match generator.generate(&categorize_prompt(tabs)).await {
                    Ok(text) => {
                        let parsed = parse_categories(&text, n);
                        info!(
                            stage = parsed.stage.as_str(),
                            categories = parsed.result.len(),
                            dropped = parsed.dropped,
                            "backend response parsed"
                        );
                        parsed.result
                    }
                    Err(e) => {
                        warn!(
                            provider = generator.name(),
                            error = %e,
                            "backend call failed, labelling batch as fallback"
                        );
                        CategorizationResult::fallback(n)
                    }
                }
            }
        }
    }

    /// Categorize, resolve to records in input order, then run the tag pass
    /// when the backend is a text generator and tagging is enabled.
    pub async fn categorize_tabs(
        &self,
        tabs: &[TabRecord],
        progress: &dyn CategorizeProgress,
    ) -> Vec<TabRecord> {
        progress.phase("Categorizing tabs");
        let result = self.categorize(tabs).await;
        let mut records = result.resolve(tabs);

        let generator = match self.backend.generator() {
            Some(g) if self.tagging.enabled && !records.is_empty() => g,
            _ => return records,
        };

        progress.phase("Generating tags");
        let total = records.len();
        for (i, record) in records.iter_mut().enumerate() {
            progress.task_progress(i + 1, total, &record.title);

            let content = self.content.content_for(record).await;
            let category = record.main_category.clone().unwrap_or_default();
            let tags = generate_tags(
                generator,
                record,
                &category,
                &content,
                self.tagging.max_tags,
            )
            .await;
            record.set_tags(tags);
        }

        records
    }
}
