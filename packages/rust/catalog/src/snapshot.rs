use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, instrument};

use tabcatalog_shared::{Result, TabCatalogError, TabRecord};

/// Prefix shared by every snapshot file name.
pub(crate) const SNAPSHOT_PREFIX: &str = "tabs_";

/// Snapshot names are timestamped to the second; the counter covers the rest.
const MAX_SUFFIX: u32 = 10_000;

/// Serialize `tabs` to a new `tabs_<YYYYMMDD_HHMMSS>_<n>.json` in `output_dir`.
///
/// Creates `output_dir` if absent and never overwrites an existing snapshot.
#[instrument(skip_all, fields(dir = %output_dir.display(), tabs = tabs.len()))]
pub fn save(tabs: &[TabRecord], output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| TabCatalogError::io(output_dir, e))?;

    let json = serde_json::to_string_pretty(tabs)
        .map_err(|e| TabCatalogError::Serialization(e.to_string()))?;

    let path = reserve_snapshot_path(output_dir)?;
    let temp = output_dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("snapshot")
    ));

    std::fs::write(&temp, json).map_err(|e| TabCatalogError::io(&temp, e))?;
    std::fs::rename(&temp, &path).map_err(|e| TabCatalogError::io(&path, e))?;

    info!(path = %path.display(), "snapshot saved");
    Ok(path)
}

/// Claim a fresh snapshot name by creating it exclusively.
fn reserve_snapshot_path(dir: &Path) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");

    for n in 1..=MAX_SUFFIX {
        let path = dir.join(format!("{SNAPSHOT_PREFIX}{stamp}_{n}.json"));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "snapshot name taken");
            }
            Err(e) => return Err(TabCatalogError::io(&path, e)),
        }
    }

    Err(TabCatalogError::validation(format!(
        "no free snapshot name in {} for {stamp}",
        dir.display()
    )))
}

/// Read a snapshot written by [`save`].
pub fn load_snapshot(path: &Path) -> Result<Vec<TabRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| TabCatalogError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| TabCatalogError::parse(format!("{}: {e}", path.display())))
}

pub(crate) fn is_snapshot_name(name: &str) -> bool {
    name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(".json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temp_dir;
    use tabcatalog_shared::TabKind;

    #[test]
    fn save_creates_dir_and_never_overwrites() {
        let root = temp_dir("snapshot");
        let dir = root.join("nested").join("data");
        let tabs = vec![
            TabRecord::new("Rust", "https://rust-lang.org", TabKind::Page)
                .with_category("Coding")
                .with_tags(["rust", "language"]),
        ];

        let first = save(&tabs, &dir).unwrap();
        let second = save(&tabs, &dir).unwrap();
        assert_ne!(first, second);

        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(is_snapshot_name(name), "{name}");
        assert_eq!(load_snapshot(&first).unwrap(), tabs);

        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn snapshot_json_shape() {
        let root = temp_dir("snapshot-shape");
        let tabs = vec![TabRecord::new("A", "https://a.com", TabKind::Iframe).with_category("X")];
        let path = save(&tabs, &root).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["title"], "A");
        assert_eq!(value[0]["kind"], "iframe");
        assert_eq!(value[0]["main_category"], "X");
        assert!(value[0]["tags"].as_array().unwrap().is_empty());

        std::fs::remove_dir_all(&root).ok();
    }
}
