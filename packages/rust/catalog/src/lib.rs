//! Catalog store: per-run JSON snapshots and the append-only markdown
//! catalog (`all_tabs.md`) built from them.
//!
//! Every catalog entry is a fixed 4-line block followed by a blank line:
//!
//! ```text
//! ## <title>
//! - **URL:** <url>
//! - **Main Category:** <category>
//! - **Tags:** <tag1, tag2>
//! ```
//!
//! The reader walks the file by fixed offsets, so writer and reader must
//! agree on this stride exactly. Changing it needs a new format version.

mod format;
mod lock;
mod relocate;
mod snapshot;

use std::path::{Path, PathBuf};

pub use format::{
    CATALOG_HEADER, FORMAT_VERSION, append_snapshot, load_catalog, parse_catalog, render_entry,
    to_catalog_format,
};
pub use lock::CatalogLock;
pub use relocate::{catalog_destination, relocate};
pub use snapshot::{load_snapshot, save};

/// Catalog file name inside a catalog directory.
pub const CATALOG_FILE_NAME: &str = "all_tabs.md";

/// Path of the catalog file inside `dir`.
pub fn catalog_path(dir: &Path) -> PathBuf {
    dir.join(CATALOG_FILE_NAME)
}

/// Directory holding `path`; `.` for a bare file name.
pub(crate) fn parent_or_cwd(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
pub(crate) fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tc-{label}-test-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
