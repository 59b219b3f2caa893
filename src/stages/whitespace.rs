//! Whitespace normalisation of HTML files.
//!
//! Two independent rewrites, each exposed as its own stage:
//!
//! * [`strip_invisible`] deletes newlines and the typographic Unicode spaces
//!   listed in [`INVISIBLE_SPACES`].
//! * [`collapse_space_runs`] deletes every run of two or more ASCII spaces.
//!   Single spaces are kept. The rule does not look at markup, so runs inside
//!   `<pre>` blocks go too.
//!
//! Both are idempotent. A file is rewritten only when its content changed;
//! unreadable or unwritable files are logged and skipped. Bytes that are not
//! valid UTF-8 are dropped from rewritten files.

use crate::config::ScanOptions;
use crate::error::{FileError, PrepError};
use crate::layout;
use crate::progress::StageProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{error, info};

/// Typographic spaces removed from HTML content and from converted OTSL.
pub const INVISIBLE_SPACES: [char; 10] = [
    '\u{2004}', // three-per-em space
    '\u{2005}', // four-per-em space
    '\u{2006}', // six-per-em space
    '\u{2007}', // figure space
    '\u{2008}', // punctuation space
    '\u{2009}', // thin space
    '\u{200A}', // hair space
    '\u{202F}', // narrow no-break space
    '\u{205F}', // medium mathematical space
    '\u{3000}', // ideographic space
];

static RE_SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Delete `\n` and every [`INVISIBLE_SPACES`] character.
pub fn strip_invisible(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '\n' && !INVISIBLE_SPACES.contains(c))
        .collect()
}

/// Delete every run of two or more literal spaces.
pub fn collapse_space_runs(input: &str) -> String {
    RE_SPACE_RUN.replace_all(input, "").into_owned()
}

/// Result of a rewrite stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub total: usize,
    pub modified: usize,
}

/// Run [`strip_invisible`] over every HTML file selected by `opts`.
pub fn strip_whitespace_dir(
    opts: &ScanOptions,
    progress: &dyn StageProgressCallback,
) -> Result<RewriteSummary, PrepError> {
    rewrite_dir("strip-whitespace", opts, progress, strip_invisible)
}

/// Run [`collapse_space_runs`] over every HTML file selected by `opts`.
pub fn collapse_spaces_dir(
    opts: &ScanOptions,
    progress: &dyn StageProgressCallback,
) -> Result<RewriteSummary, PrepError> {
    rewrite_dir("collapse-spaces", opts, progress, collapse_space_runs)
}

fn rewrite_dir(
    stage: &str,
    opts: &ScanOptions,
    progress: &dyn StageProgressCallback,
    transform: fn(&str) -> String,
) -> Result<RewriteSummary, PrepError> {
    if !opts.dir.is_dir() {
        error!("HTML directory not found: {}", opts.dir.display());
        return Err(PrepError::DirectoryNotFound {
            what: "HTML",
            path: opts.dir.clone(),
        });
    }

    let files = layout::list_html_files(&opts.dir, opts.recursive).map_err(|e| {
        PrepError::ReadFailed {
            path: opts.dir.clone(),
            source: e,
        }
    })?;

    let mut summary = RewriteSummary {
        total: files.len(),
        modified: 0,
    };
    progress.on_stage_start(stage, files.len());
    if files.is_empty() {
        info!(
            "No HTML files found in {} (recursive={}).",
            opts.dir.display(),
            opts.recursive
        );
        progress.on_stage_complete(stage, 0, 0);
        return Ok(summary);
    }

    info!(
        "Processing {} HTML files in {} (recursive={})...",
        files.len(),
        opts.dir.display(),
        opts.recursive
    );

    for (i, path) in files.iter().enumerate() {
        progress.on_file_start(i + 1, files.len(), path);
        match rewrite_file(path, transform) {
            Ok(changed) => {
                if changed {
                    summary.modified += 1;
                }
                progress.on_file_complete(i + 1, files.len(), path, changed);
            }
            Err(e) => {
                error!("{e}");
                progress.on_file_error(i + 1, files.len(), path, &e.to_string());
            }
        }
    }

    info!("Done. Modified {}/{} files.", summary.modified, summary.total);
    progress.on_stage_complete(stage, summary.total, summary.modified);
    Ok(summary)
}

/// Apply `transform` to one file; returns whether it was rewritten.
pub fn rewrite_file(path: &Path, transform: fn(&str) -> String) -> Result<bool, FileError> {
    let bytes = std::fs::read(path).map_err(|e| FileError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let original = layout::decode_text(&bytes);
    let cleaned = transform(&original);
    if cleaned == original {
        return Ok(false);
    }
    std::fs::write(path, cleaned).map_err(|e| FileError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(true)
}
