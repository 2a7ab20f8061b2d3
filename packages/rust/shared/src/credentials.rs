//! Stored API credentials (`~/.tabcatalog/credentials.toml`).
//!
//! Kept apart from `tabcatalog.toml` so the config file can be shared
//! or printed without leaking keys.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, config_dir};
use crate::error::{Result, TabCatalogError};

const CREDENTIALS_FILE_NAME: &str = "credentials.toml";

/// API keys saved with `tabcatalog keys save`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mistral_api_key: Option<String>,
}

impl CredentialStore {
    /// Resolve the Gemini key: explicit override, then env var, then stored key.
    pub fn gemini_key(&self, config: &AppConfig, explicit: Option<&str>) -> Option<String> {
        resolve_key(explicit, &config.gemini.api_key_env, self.gemini_api_key.as_deref())
    }

    /// Resolve the Mistral key: explicit override, then env var, then stored key.
    pub fn mistral_key(&self, config: &AppConfig, explicit: Option<&str>) -> Option<String> {
        resolve_key(explicit, &config.mistral.api_key_env, self.mistral_api_key.as_deref())
    }
}

fn resolve_key(explicit: Option<&str>, env_var: &str, stored: Option<&str>) -> Option<String> {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    explicit
        .and_then(non_empty)
        .or_else(|| std::env::var(env_var).ok().as_deref().and_then(non_empty))
        .or_else(|| stored.and_then(non_empty))
}

/// Path to the credentials file.
pub fn credentials_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CREDENTIALS_FILE_NAME))
}

/// Load stored credentials. A missing file yields an empty store.
pub fn load_credentials() -> Result<CredentialStore> {
    load_credentials_from(&credentials_file_path()?)
}

/// Load stored credentials from a specific path.
pub fn load_credentials_from(path: &Path) -> Result<CredentialStore> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(CredentialStore::default());
        }
        Err(e) => return Err(TabCatalogError::io(path, e)),
    };

    toml::from_str(&content)
        .map_err(|e| TabCatalogError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Merge the given keys into the stored credentials file.
pub fn save_credentials(gemini: Option<&str>, mistral: Option<&str>) -> Result<PathBuf> {
    let path = credentials_file_path()?;
    save_credentials_to(&path, gemini, mistral)?;
    Ok(path)
}

/// Merge the given keys into the credentials file at `path`.
/// Keys not supplied keep their stored value.
pub fn save_credentials_to(
    path: &Path,
    gemini: Option<&str>,
    mistral: Option<&str>,
) -> Result<CredentialStore> {
    let mut store = load_credentials_from(path)?;
    if let Some(key) = gemini.filter(|k| !k.trim().is_empty()) {
        store.gemini_api_key = Some(key.trim().to_string());
    }
    if let Some(key) = mistral.filter(|k| !k.trim().is_empty()) {
        store.mistral_api_key = Some(key.trim().to_string());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TabCatalogError::io(parent, e))?;
    }

    let content =
        toml::to_string_pretty(&store).map_err(|e| TabCatalogError::config(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| TabCatalogError::io(path, e))?;
    restrict_permissions(path)?;

    tracing::info!(
        ?path,
        gemini = store.gemini_api_key.is_some(),
        mistral = store.mistral_api_key.is_some(),
        "credentials saved"
    );

    Ok(store)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| TabCatalogError::io(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
