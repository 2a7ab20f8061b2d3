//! Application configuration for the tab catalog.
//!
//! User config lives at `~/.tabcatalog/tabcatalog.toml`.
//! CLI flags override environment variables and stored credentials,
//! which override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TabCatalogError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tabcatalog.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tabcatalog";

// ---------------------------------------------------------------------------
// Config structs (matching tabcatalog.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Google Gemini settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Mistral settings.
    #[serde(default)]
    pub mistral: MistralConfig,

    /// Local Ollama settings.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Offline classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Tag generation settings.
    #[serde(default)]
    pub tagging: TaggingConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Catalog directory (holds `all_tabs.md` and the per-run snapshots).
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Browser debugging endpoint listing open tabs.
    #[serde(default = "default_tab_source_url")]
    pub tab_source_url: String,

    /// Timeout for tab-source and page-content requests.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            tab_source_url: default_tab_source_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_output_dir() -> String {
    "data".into()
}
fn default_tab_source_url() -> String {
    "http://localhost:9222/json".into()
}
fn default_request_timeout() -> u64 {
    30
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key (never store the key here).
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,

    /// Model used for categorization and tagging.
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API base URL.
    #[serde(default = "default_gemini_base")]
    pub api_base: String,

    /// Request timeout in seconds.
    #[serde(default = "default_cloud_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_gemini_key_env(),
            model: default_gemini_model(),
            api_base: default_gemini_base(),
            timeout_secs: default_cloud_timeout(),
        }
    }
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_gemini_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_gemini_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_cloud_timeout() -> u64 {
    60
}

/// `[mistral]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistralConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_mistral_key_env")]
    pub api_key_env: String,

    /// Model used for categorization and tagging.
    #[serde(default = "default_mistral_model")]
    pub model: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_mistral_base")]
    pub api_base: String,

    /// Request timeout in seconds.
    #[serde(default = "default_cloud_timeout")]
    pub timeout_secs: u64,
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_mistral_key_env(),
            model: default_mistral_model(),
            api_base: default_mistral_base(),
            timeout_secs: default_cloud_timeout(),
        }
    }
}

fn default_mistral_key_env() -> String {
    "MISTRAL_API_KEY".into()
}
fn default_mistral_model() -> String {
    "mistral-small-latest".into()
}
fn default_mistral_base() -> String {
    "https://api.mistral.ai/v1".into()
}

/// `[ollama]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Local model name. The local backend is only available when set
    /// (here or via `--ollama-model`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Ollama server base URL.
    #[serde(default = "default_ollama_base")]
    pub api_base: String,

    /// Local inference is slow; use a generous timeout.
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            model: None,
            api_base: default_ollama_base(),
            timeout_secs: default_ollama_timeout(),
        }
    }
}

fn default_ollama_base() -> String {
    "http://localhost:11434".into()
}
fn default_ollama_timeout() -> u64 {
    300
}

/// `[classifier]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Whether the offline keyword/entity classifier tier is enabled.
    #[serde(default = "default_true")]
    pub offline: bool,

    /// Extra `[[classifier.rules]]`, tried before the built-in heuristics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<ClassifierRule>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            offline: true,
            rules: Vec::new(),
        }
    }
}

/// A user-defined offline rule: a regex over `"<title> <url>"` and the
/// category it assigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub pattern: String,
    pub category: String,
}

/// `[tagging]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingConfig {
    /// Run the per-tab tag generation pass.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Page text sent to the model is truncated to this many characters.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Upper bound on tags kept per tab.
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_content_chars: default_max_content_chars(),
            max_tags: default_max_tags(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_max_content_chars() -> usize {
    4_000
}
fn default_max_tags() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tabcatalog/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TabCatalogError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tabcatalog/tabcatalog.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    match load_config_from(&path) {
        Err(e) if e.is_not_found() => {
            tracing::debug!(?path, "config file not found, using defaults");
            Ok(AppConfig::default())
        }
        other => other,
    }
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TabCatalogError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TabCatalogError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TabCatalogError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TabCatalogError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TabCatalogError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("GEMINI_API_KEY"));
        assert!(toml_str.contains("localhost:9222"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.output_dir, "data");
        assert_eq!(parsed.mistral.model, "mistral-small-latest");
        assert!(parsed.ollama.model.is_none());
        assert!(parsed.classifier.offline);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
output_dir = "/tmp/tabs"

[ollama]
model = "llama3"

[classifier]
offline = false

[[classifier.rules]]
pattern = "docs\\.rs"
category = "Rust Docs"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.output_dir, "/tmp/tabs");
        assert_eq!(config.defaults.tab_source_url, "http://localhost:9222/json");
        assert_eq!(config.ollama.model.as_deref(), Some("llama3"));
        assert_eq!(config.ollama.api_base, "http://localhost:11434");
        assert!(!config.classifier.offline);
        assert_eq!(config.classifier.rules.len(), 1);
        assert_eq!(config.classifier.rules[0].pattern, r"docs\.rs");
        assert_eq!(config.tagging.max_tags, 5);
    }

    #[test]
    fn load_config_from_missing_file_is_io_error() {
        let err = load_config_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.is_not_found());
    }
}
