use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use tabcatalog_shared::{Result, TabCatalogError};

use crate::{CATALOG_FILE_NAME, parent_or_cwd};
use crate::lock::CatalogLock;
use crate::snapshot::is_snapshot_name;

/// Move a catalog, and the snapshots beside it, to a new location.
///
/// `new_catalog` is resolved by [`catalog_destination`]. The destination
/// directory is created as needed. An existing destination
/// catalog is never overwritten. The source directory is removed if the
/// move leaves it empty. Returns the new catalog path.
#[instrument(skip_all, fields(from = %current_catalog.display(), to = %new_catalog.display()))]
pub fn relocate(current_catalog: &Path, new_catalog: &Path) -> Result<PathBuf> {
    if !current_catalog.is_file() {
        return Err(TabCatalogError::validation(format!(
            "no catalog at {}",
            current_catalog.display()
        )));
    }

    let destination = catalog_destination(new_catalog);
    if same_file(current_catalog, &destination) {
        debug!("catalog already at destination");
        return Ok(destination);
    }
    if destination.exists() {
        return Err(TabCatalogError::validation(format!(
            "refusing to overwrite existing catalog at {}",
            destination.display()
        )));
    }

    let source_dir = parent_or_cwd(current_catalog);
    let dest_dir = parent_or_cwd(&destination);
    std::fs::create_dir_all(&dest_dir).map_err(|e| TabCatalogError::io(&dest_dir, e))?;

    {
        let _lock = CatalogLock::acquire(&source_dir)?;
        move_file(current_catalog, &destination)?;

        let moved = if same_file(&source_dir, &dest_dir) {
            0
        } else {
            move_snapshots(&source_dir, &dest_dir)?
        };
        info!(
            catalog = %destination.display(),
            snapshots = moved,
            "catalog relocated"
        );
    }

    remove_if_empty(&source_dir);
    Ok(destination)
}

/// Where a catalog moved to `new_catalog` ends up: `new_catalog/all_tabs.md`
/// for a directory (existing, or any path without an extension), otherwise
/// `new_catalog` itself.
pub fn catalog_destination(new_catalog: &Path) -> PathBuf {
    if new_catalog.is_dir() || new_catalog.extension().is_none() {
        new_catalog.join(CATALOG_FILE_NAME)
    } else {
        new_catalog.to_path_buf()
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Rename, falling back to copy and remove across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(error = %rename_err, "rename failed, copying instead");
            std::fs::copy(from, to).map_err(|e| TabCatalogError::io(to, e))?;
            std::fs::remove_file(from).map_err(|e| TabCatalogError::io(from, e))
        }
    }
}

fn move_snapshots(source_dir: &Path, dest_dir: &Path) -> Result<usize> {
    let entries = std::fs::read_dir(source_dir).map_err(|e| TabCatalogError::io(source_dir, e))?;

    let mut moved = 0;
    for entry in entries {
        let entry = entry.map_err(|e| TabCatalogError::io(source_dir, e))?;
        let name = entry.file_name();
        let Some(name_str) = name.to_str() else {
            continue;
        };
        if !is_snapshot_name(name_str) || !entry.path().is_file() {
            continue;
        }

        let target = dest_dir.join(&name);
        if target.exists() {
            warn!(snapshot = name_str, "snapshot already exists at destination, left in place");
            continue;
        }
        move_file(&entry.path(), &target)?;
        moved += 1;
    }
    Ok(moved)
}

fn remove_if_empty(dir: &Path) {
    let is_empty = std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if is_empty {
        match std::fs::remove_dir(dir) {
            Ok(()) => debug!(dir = %dir.display(), "removed empty catalog directory"),
            Err(e) => debug!(dir = %dir.display(), error = %e, "could not remove old directory"),
        }
    }
}
