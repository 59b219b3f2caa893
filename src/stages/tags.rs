//! Tag inventory: which non-table elements appear inside the HTML tables.
//!
//! Useful before conversion to see which inline markup the normaliser has
//! to deal with.

use crate::error::PrepError;
use crate::html::{self, HtmlFragment};
use crate::layout;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Table-structure elements left out of the inventory.
pub const EXCLUDED_TAGS: [&str; 6] = ["table", "caption", "tr", "td", "thead", "tbody"];

/// Unique element names in `html_text`, table-structure elements excluded.
pub fn collect_tags(html_text: &str) -> BTreeSet<String> {
    let doc = HtmlFragment::parse(html_text);
    html::descendants(doc.root())
        .iter()
        .filter_map(html::tag_name)
        .filter(|t| !EXCLUDED_TAGS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Tags per file plus their union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagReport {
    pub per_file: Vec<(PathBuf, BTreeSet<String>)>,
    pub all: BTreeSet<String>,
}

/// Scan every `.html` file directly inside `dir`.
pub fn tag_inventory(dir: &Path) -> Result<TagReport, PrepError> {
    if !dir.is_dir() {
        return Err(PrepError::DirectoryNotFound {
            what: "HTML",
            path: dir.to_path_buf(),
        });
    }
    let files = layout::list_html_files(dir, false).map_err(|e| PrepError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut report = TagReport::default();
    for path in files {
        let text = match layout::read_text(&path) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to read {}: {e}", path.display());
                continue;
            }
        };
        let tags = collect_tags(&text);
        report.all.extend(tags.iter().cloned());
        report.per_file.push((path, tags));
    }
    info!(
        "Found {} distinct tags across {} files",
        report.all.len(),
        report.per_file.len()
    );
    Ok(report)
}
