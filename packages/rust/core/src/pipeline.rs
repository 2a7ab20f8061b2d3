//! End-to-end pipelines: tab source → filter → categorize → snapshot → catalog.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use tabcatalog_catalog::{append_snapshot, catalog_destination, relocate, save, to_catalog_format};
use tabcatalog_categorize::{
    BackendKind, Capabilities, CapabilityOverrides, CategorizeProgress, ContentFetcher, Dispatcher,
};
use tabcatalog_ingest::{TabSourceOptions, ingest};
use tabcatalog_shared::{AppConfig, CredentialStore, Result, TabRecord};

/// Configuration for [`fetch_and_save`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Where to reach the browser's tab list.
    pub tab_source: TabSourceOptions,
    /// Directory receiving the snapshot.
    pub output_dir: PathBuf,
}

impl FetchConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            tab_source: TabSourceOptions::from(config),
            output_dir: PathBuf::from(&config.defaults.output_dir),
        }
    }
}

/// Result of [`fetch_and_save`].
#[derive(Debug)]
pub struct FetchResult {
    /// Tabs kept after filtering.
    pub tab_count: usize,
    /// Snapshot written, `None` when there was nothing to save.
    pub snapshot: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Configuration for [`categorize_and_save`].
#[derive(Clone)]
pub struct CategorizeConfig {
    /// Loaded application config (backends, tagging, tab source).
    pub app: AppConfig,
    /// Stored API keys.
    pub credentials: CredentialStore,
    /// Keys and model names given on the command line.
    pub overrides: CapabilityOverrides,
    /// Backend requested with `--model`, honoured when available.
    pub preference: Option<BackendKind>,
    /// Directory receiving the snapshot and catalog.
    pub output_dir: PathBuf,
    /// Central catalog location (directory or file) to move the catalog to.
    pub central_repo: Option<PathBuf>,
}

impl CategorizeConfig {
    pub fn new(app: AppConfig, credentials: CredentialStore) -> Self {
        let output_dir = PathBuf::from(&app.defaults.output_dir);
        Self {
            app,
            credentials,
            overrides: CapabilityOverrides::default(),
            preference: None,
            output_dir,
            central_repo: None,
        }
    }
}

/// Result of [`categorize_and_save`].
#[derive(Debug)]
pub struct CategorizeResult {
    /// Tabs categorized and written.
    pub tab_count: usize,
    /// Backend that produced the categories.
    pub backend: BackendKind,
    /// Distinct categories among the written records.
    pub category_count: usize,
    /// Snapshot written, `None` when there was nothing to save.
    pub snapshot: Option<PathBuf>,
    /// Catalog appended to, `None` when there was nothing to save.
    pub catalog: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each tab finishes the tag pass.
    fn tab_categorized(&self, current: usize, total: usize, title: &str);
    /// Called when the categorize pipeline completes.
    fn done(&self, result: &CategorizeResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn tab_categorized(&self, _current: usize, _total: usize, _title: &str) {}
    fn done(&self, _result: &CategorizeResult) {}
}

/// Fetch and filter tabs, then save them uncategorized as a snapshot.
#[instrument(skip_all, fields(dir = %config.output_dir.display()))]
pub async fn fetch_and_save(
    config: &FetchConfig,
    progress: &dyn ProgressReporter,
) -> Result<FetchResult> {
    let start = Instant::now();

    progress.phase("Fetching tabs");
    let tabs = ingest(&config.tab_source).await?;

    if tabs.is_empty() {
        info!("no tabs to save");
        return Ok(FetchResult {
            tab_count: 0,
            snapshot: None,
            elapsed: start.elapsed(),
        });
    }

    progress.phase("Saving snapshot");
    let snapshot = save(&tabs, &config.output_dir)?;

    Ok(FetchResult {
        tab_count: tabs.len(),
        snapshot: Some(snapshot),
        elapsed: start.elapsed(),
    })
}

/// Run the full categorize pipeline.
///
/// 1. Fetch and filter tabs
/// 2. Discover backends and pick one
/// 3. Categorize (and tag) the tabs
/// 4. Save a snapshot and append it to the catalog
/// 5. Move the catalog to the central location, if one is configured
#[instrument(skip_all, fields(dir = %config.output_dir.display()))]
pub async fn categorize_and_save(
    config: &CategorizeConfig,
    progress: &dyn ProgressReporter,
) -> Result<CategorizeResult> {
    let start = Instant::now();

    // --- Phase 1: Ingest ---
    progress.phase("Fetching tabs");
    let tabs = ingest(&TabSourceOptions::from(&config.app)).await?;

    // --- Phase 2: Backend ---
    let capabilities = Capabilities::discover(&config.app, &config.credentials, &config.overrides);
    let dispatcher = Dispatcher::new(
        capabilities.backend(config.preference),
        config.app.tagging.clone(),
        ContentFetcher::from_config(&config.app)?,
    );
    let backend_kind = dispatcher.backend_kind();

    if tabs.is_empty() {
        info!("no tabs to categorize");
        let result = CategorizeResult {
            tab_count: 0,
            backend: backend_kind,
            category_count: 0,
            snapshot: None,
            catalog: None,
            elapsed: start.elapsed(),
        };
        progress.done(&result);
        return Ok(result);
    }

    // --- Phase 3: Categorize ---
    let adapter = PipelineCategorizeProgress { inner: progress };
    let records = dispatcher.categorize_tabs(&tabs, &adapter).await;

    // --- Phase 4: Store ---
    progress.phase("Writing catalog");
    let (snapshot, catalog) = store(&records, config)?;

    let result = CategorizeResult {
        tab_count: records.len(),
        backend: backend_kind,
        category_count: distinct_categories(&records),
        snapshot: Some(snapshot),
        catalog: Some(catalog),
        elapsed: start.elapsed(),
    };

    info!(
        tabs = result.tab_count,
        backend = %result.backend,
        categories = result.category_count,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "categorize pipeline complete"
    );
    progress.done(&result);
    Ok(result)
}

/// Write the snapshot and catalog, honouring the central location.
///
/// An existing central catalog is appended to directly. Otherwise the
/// catalog is built in the output directory and then moved there.
fn store(records: &[TabRecord], config: &CategorizeConfig) -> Result<(PathBuf, PathBuf)> {
    let central = config.central_repo.as_deref().map(catalog_destination);

    if let Some(target) = central.as_deref().filter(|t| t.is_file()) {
        let dir = catalog_dir(target);
        let snapshot = save(records, &dir)?;
        append_snapshot(&snapshot, target)?;
        return Ok((snapshot, target.to_path_buf()));
    }

    let snapshot = save(records, &config.output_dir)?;
    let catalog = to_catalog_format(&snapshot, &config.output_dir)?;

    match central {
        Some(target) => {
            let moved = relocate(&catalog, &target)?;
            let snapshot = match snapshot.file_name() {
                Some(name) => catalog_dir(&moved).join(name),
                None => snapshot,
            };
            Ok((snapshot, moved))
        }
        None => Ok((snapshot, catalog)),
    }
}

fn catalog_dir(catalog: &Path) -> PathBuf {
    match catalog.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn distinct_categories(records: &[TabRecord]) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for label in records.iter().filter_map(|r| r.main_category.as_deref()) {
        if !seen.contains(&label) {
            seen.push(label);
        }
    }
    seen.len()
}

// ---------------------------------------------------------------------------
// Categorize progress adapter
// ---------------------------------------------------------------------------

/// Adapts a `ProgressReporter` to the `CategorizeProgress` interface.
struct PipelineCategorizeProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl CategorizeProgress for PipelineCategorizeProgress<'_> {
    fn phase(&self, name: &str) {
        self.inner.phase(name);
    }

    fn task_progress(&self, current: usize, total: usize, detail: &str) {
        self.inner.tab_categorized(current, total, detail);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tabcatalog_catalog::load_catalog;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tc-pipeline-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    async fn tab_source() -> MockServer {
        let server = MockServer::start().await;
        let fixture = std::fs::read_to_string("../../../fixtures/json/tabs.fixture.json")
            .expect("read tabs fixture");

        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(fixture, "application/json"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {
                    "role": "assistant",
                    "content": "{\"Music\": [1], \"Coding\": [2], \"Ghost\": [42]}"
                },
                "done": true
            })))
            .mount(&server)
            .await;
        server
    }

    /// Config pointed at `server` for both the tab source and Ollama, with
    /// cloud key env vars that are never set.
    fn app_config(server: &MockServer, output_dir: &Path) -> AppConfig {
        let mut app = AppConfig::default();
        app.defaults.tab_source_url = format!("{}/json", server.uri());
        app.defaults.output_dir = output_dir.display().to_string();
        app.defaults.request_timeout_secs = 5;
        app.gemini.api_key_env = "TABCATALOG_TEST_UNSET_GEMINI".into();
        app.mistral.api_key_env = "TABCATALOG_TEST_UNSET_MISTRAL".into();
        app.ollama.api_base = server.uri();
        app.ollama.model = Some("llama2".into());
        app.tagging.enabled = false;
        app
    }

    #[test]
    fn ingested_records_survive_catalog_roundtrip() {
        use tabcatalog_ingest::{RawTab, filter_tabs};

        let raw = |title: &str, url: &str| RawTab {
            kind: "page".into(),
            title: title.into(),
            url: url.into(),
        };
        let mut tabs = filter_tabs(&[
            raw(" Padded Title\u{a0}", "https://padded.example/ "),
            raw("Caf&eacute; &amp; Cr&egrave;me\t", " https://cafe.example/menu"),
            raw("\u{200b}Plain", "https://plain.example"),
        ]);
        assert_eq!(tabs.len(), 3);
        tabs[0].main_category = Some("Reading".into());
        tabs[1].tags = vec!["food".into(), "paris".into()];

        let dir = temp_dir();
        let snapshot = save(&tabs, &dir).unwrap();
        let catalog = to_catalog_format(&snapshot, &dir).unwrap();
        let loaded = load_catalog(&catalog).unwrap();

        let fields = |records: &[TabRecord]| {
            records
                .iter()
                .map(|t| {
                    let category = t.main_category.clone().unwrap_or_else(|| "Uncategorized".into());
                    (t.title.clone(), t.url.clone(), category, t.tags.clone())
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(fields(&loaded), fields(&tabs));
        assert_eq!(loaded[0].title, "Padded Title");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn categorize_writes_snapshot_and_catalog() {
        let server = tab_source().await;
        let root = temp_dir();
        let out = root.join("data");

        let config = CategorizeConfig::new(app_config(&server, &out), CredentialStore::default());
        let result = categorize_and_save(&config, &SilentProgress).await.unwrap();

        assert_eq!(result.backend, BackendKind::Ollama);
        assert_eq!(result.tab_count, 4);
        assert_eq!(result.category_count, 3);
        assert!(result.snapshot.as_ref().unwrap().starts_with(&out));

        let catalog = result.catalog.unwrap();
        assert_eq!(catalog, out.join("all_tabs.md"));
        let entries = load_catalog(&catalog).unwrap();
        let categories: Vec<_> = entries
            .iter()
            .map(|e| e.main_category.as_deref().unwrap())
            .collect();
        assert_eq!(categories, vec!["Uncategorized", "Music", "Coding", "Uncategorized"]);
        assert_eq!(entries[0].title, "Test Page & Title");

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn offline_preference_without_network_backend() {
        let server = tab_source().await;
        let root = temp_dir();
        let out = root.join("data");

        let mut app = app_config(&server, &out);
        app.ollama.model = None;
        let config = CategorizeConfig::new(app, CredentialStore::default());
        let result = categorize_and_save(&config, &SilentProgress).await.unwrap();

        assert_eq!(result.backend, BackendKind::Offline);
        let entries = load_catalog(result.catalog.as_ref().unwrap()).unwrap();
        assert_eq!(entries[1].main_category.as_deref(), Some("YouTube"));
        assert_eq!(entries[2].main_category.as_deref(), Some("Coding"));

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn central_repo_moves_then_appends() {
        let server = tab_source().await;
        let root = temp_dir();
        let out = root.join("data");
        let central = root.join("central");

        let mut config =
            CategorizeConfig::new(app_config(&server, &out), CredentialStore::default());
        config.central_repo = Some(central.clone());

        let first = categorize_and_save(&config, &SilentProgress).await.unwrap();
        assert_eq!(first.catalog.as_deref(), Some(central.join("all_tabs.md").as_path()));
        assert!(first.snapshot.as_ref().unwrap().starts_with(&central));
        assert!(!out.exists());

        let second = categorize_and_save(&config, &SilentProgress).await.unwrap();
        assert_eq!(second.catalog, first.catalog);
        assert_eq!(load_catalog(&central.join("all_tabs.md")).unwrap().len(), 8);

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn unreachable_source_writes_nothing() {
        let root = temp_dir();
        let out = root.join("data");

        let mut app = AppConfig::default();
        app.defaults.tab_source_url = "http://127.0.0.1:9/json".into();
        app.defaults.output_dir = out.display().to_string();
        app.defaults.request_timeout_secs = 2;
        let config = CategorizeConfig::new(app.clone(), CredentialStore::default());

        let result = categorize_and_save(&config, &SilentProgress).await.unwrap();
        assert_eq!(result.tab_count, 0);
        assert!(result.catalog.is_none());

        let fetched = fetch_and_save(&FetchConfig::from_app(&app), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(fetched.tab_count, 0);
        assert!(fetched.snapshot.is_none());
        assert!(!out.exists());

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn fetch_saves_uncategorized_snapshot() {
        let server = tab_source().await;
        let root = temp_dir();
        let out = root.join("data");

        let config = FetchConfig::from_app(&app_config(&server, &out));
        let result = fetch_and_save(&config, &SilentProgress).await.unwrap();
        assert_eq!(result.tab_count, 4);

        let saved = tabcatalog_catalog::load_snapshot(result.snapshot.as_ref().unwrap()).unwrap();
        assert!(saved.iter().all(|t| t.main_category.is_none()));
        assert!(!out.join("all_tabs.md").exists());

        std::fs::remove_dir_all(&root).ok();
    }
}
