use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use tabcatalog_shared::{FALLBACK_CATEGORY, Result, TabCatalogError, TabKind, TabRecord};

use crate::{catalog_path, parent_or_cwd};
use crate::lock::CatalogLock;
use crate::snapshot::load_snapshot;

/// First line of a catalog written by this crate.
pub const CATALOG_HEADER: &str = "# Tab Catalog";

/// Current catalog block format.
pub const FORMAT_VERSION: u32 = 1;

const TITLE_PREFIX: &str = "## ";

static URL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \*\*URL:\*\*\s?(.*)$").expect("valid regex"));

static CATEGORY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \*\*Main Category:\*\*\s?(.*)$").expect("valid regex"));

static TAGS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \*\*Tags:\*\*\s?(.*)$").expect("valid regex"));

static FORMAT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<!-- tabcatalog-format: (\d+) -->$").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Render one catalog block: four lines and a trailing blank line.
pub fn render_entry(tab: &TabRecord) -> String {
    let category = tab
        .main_category
        .as_deref()
        .map(flatten)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string());

    let tags = tab
        .tags
        .iter()
        .map(|t| flatten(&t.replace(',', " ")))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let tags_line = if tags.is_empty() {
        "- **Tags:**".to_string()
    } else {
        format!("- **Tags:** {tags}")
    };

    format!(
        "{TITLE_PREFIX}{}\n- **URL:** {}\n- **Main Category:** {category}\n{tags_line}\n\n",
        flatten(&tab.title),
        flatten(&tab.url),
    )
}

/// Field values must stay on one line or the stride breaks.
fn flatten(value: &str) -> String {
    value.replace(['\r', '\n'], " ").trim().to_string()
}

/// Append the records of `snapshot` to the catalog in `output_dir`,
/// creating it with a header on first use. Returns the catalog path.
pub fn to_catalog_format(snapshot: &Path, output_dir: &Path) -> Result<PathBuf> {
    let path = catalog_path(output_dir);
    append_snapshot(snapshot, &path)?;
    Ok(path)
}

/// Append the records of `snapshot` to the catalog file at `catalog`.
///
/// Holds the directory's [`CatalogLock`] while writing.
#[instrument(skip_all, fields(snapshot = %snapshot.display(), catalog = %catalog.display()))]
pub fn append_snapshot(snapshot: &Path, catalog: &Path) -> Result<()> {
    let tabs = load_snapshot(snapshot)?;

    let dir = parent_or_cwd(catalog);
    std::fs::create_dir_all(&dir).map_err(|e| TabCatalogError::io(&dir, e))?;
    let lock = CatalogLock::acquire(&dir)?;
    debug!(lock = %lock.path().display(), "writing catalog");

    let needs_header = match std::fs::metadata(catalog) {
        Ok(meta) => meta.len() == 0,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => return Err(TabCatalogError::io(catalog, e)),
    };

    let mut buf = String::new();
    if needs_header {
        buf.push_str(&format!(
            "{CATALOG_HEADER}\n<!-- tabcatalog-format: {FORMAT_VERSION} -->\n\n"
        ));
    }
    for tab in &tabs {
        buf.push_str(&render_entry(tab));
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(catalog)
        .map_err(|e| TabCatalogError::io(catalog, e))?;
    file.write_all(buf.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|e| TabCatalogError::io(catalog, e))?;

    info!(entries = tabs.len(), "catalog updated");
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Load every entry of the catalog at `path`.
///
/// A missing file is not an error: it is logged and yields no entries.
pub fn load_catalog(path: &Path) -> Result<Vec<TabRecord>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse_catalog(&content)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "no catalog yet, categorize some tabs first");
            Ok(Vec::new())
        }
        Err(e) => Err(TabCatalogError::io(path, e)),
    }
}

/// Parse catalog text by the fixed 4-line stride.
///
/// Lines that are not `## ` headings are skipped. After a heading, the
/// next three lines are read as URL, category and tags; a line that does
/// not match its field leaves that field empty.
pub fn parse_catalog(content: &str) -> Vec<TabRecord> {
    let lines: Vec<&str> = content.lines().collect();
    let mut tabs = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if let Some(version) = format_version(lines[i]) {
            if version != FORMAT_VERSION {
                warn!(version, expected = FORMAT_VERSION, "unknown catalog format version");
            }
            i += 1;
            continue;
        }

        let Some(title) = lines[i].strip_prefix(TITLE_PREFIX) else {
            i += 1;
            continue;
        };

        let field = |offset: usize, re: &Regex| -> String {
            lines
                .get(i + offset)
                .and_then(|line| re.captures(line))
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        };

        let url = field(1, &URL_LINE);
        let category = field(2, &CATEGORY_LINE);
        let tags: Vec<String> = field(3, &TAGS_LINE)
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let mut tab = TabRecord::new(title, url, TabKind::Page).with_tags(tags);
        if !category.is_empty() {
            tab.set_category(category);
        }
        tabs.push(tab);
        i += 4;
    }

    debug!(entries = tabs.len(), "catalog parsed");
    tabs
}

fn format_version(line: &str) -> Option<u32> {
    FORMAT_MARKER
        .captures(line.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
