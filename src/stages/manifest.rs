//! Inventory stage: one manifest record per HTML table.
//!
//! Paths are derived purely by name substitution; nothing checks that the
//! TEX or image file actually exists. Records keep directory listing order.

use crate::error::PrepError;
use crate::layout::{HTML_SUBDIR, IMAGES_SUBDIR, TEX_SUBDIR};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Relative paths of one artifact triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub tex_path: String,
    pub html_path: String,
    pub image_path: String,
}

/// Record for an HTML file name such as `t1.html`.
pub fn manifest_record(html_file_name: &str) -> ManifestRecord {
    ManifestRecord {
        tex_path: format!("{TEX_SUBDIR}/{}", html_file_name.replace(".html", ".tex")),
        html_path: format!("{HTML_SUBDIR}/{html_file_name}"),
        image_path: format!("{IMAGES_SUBDIR}/{}", html_file_name.replace(".html", ".jpeg")),
    }
}

/// One record per entry of `html_dir`, in listing order.
pub fn build_manifest(html_dir: &Path) -> Result<Vec<ManifestRecord>, PrepError> {
    if !html_dir.is_dir() {
        return Err(PrepError::DirectoryNotFound {
            what: "HTML",
            path: html_dir.to_path_buf(),
        });
    }
    let read_failed = |e: std::io::Error| PrepError::ReadFailed {
        path: html_dir.to_path_buf(),
        source: e,
    };

    let mut records = Vec::new();
    for entry in std::fs::read_dir(html_dir).map_err(read_failed)? {
        let entry = entry.map_err(read_failed)?;
        records.push(manifest_record(&entry.file_name().to_string_lossy()));
    }
    info!("Collected {} manifest records from {}", records.len(), html_dir.display());
    Ok(records)
}

/// Serialise `records` as one JSON array with 4-space indentation.
pub fn manifest_json(records: &[ManifestRecord]) -> Result<String, PrepError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| PrepError::Internal(e.to_string()))
}

/// Write `records` to `path`.
pub fn write_manifest(records: &[ManifestRecord], path: &Path) -> Result<(), PrepError> {
    let json = manifest_json(records)?;
    std::fs::write(path, json).map_err(|e| PrepError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read a manifest written by [`write_manifest`].
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestRecord>, PrepError> {
    let raw = std::fs::read_to_string(path).map_err(|e| PrepError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&raw).map_err(|e| PrepError::ManifestParse {
        path: path.to_path_buf(),
        source: e,
    })
}
