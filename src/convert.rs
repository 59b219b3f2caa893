//! HTML → OTSL conversion entry points.
//!
//! [`html_to_otsl`] converts one document and returns one OTSL string per
//! recognised table. [`convert_dataset`] runs it over a directory where
//! every file holds exactly one table and writes `<stem>.otsl` files.

use crate::config::ConvertConfig;
use crate::error::PrepError;
use crate::layout;
use crate::otsl::normalize::prepare_document;
use crate::otsl::postprocess::{attach_caption, clean_empty_cell_rows, clean_otsl_body, extract_otsl_body};
use crate::otsl::structurer::{structure_document, DoclingStructurer, DocumentStructurer};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Source of the HTML to convert.
#[derive(Debug, Clone, Copy)]
pub enum OtslInput<'a> {
    Html(&'a str),
    Path(&'a Path),
}

/// Convert every table of one HTML document to OTSL.
///
/// # Steps
/// 1. Normalise the markup and record each table's caption.
/// 2. Write the result to a temporary `.html` file and hand it to `structurer`.
/// 3. Clean each table's `<otsl>` block and splice its caption back in.
///
/// Tables whose export has no `<otsl>` block are skipped. Captions are
/// matched to blocks by position, so a skipped table shifts the pairing.
///
/// # Errors
/// Reading the input, writing the temporary file and the structurer call
/// all fail fatally; there is no retry.
pub fn html_to_otsl(
    input: OtslInput<'_>,
    structurer: &dyn DocumentStructurer,
) -> Result<Vec<String>, PrepError> {
    let owned;
    let html = match input {
        OtslInput::Html(html) => html,
        OtslInput::Path(path) => {
            owned = std::fs::read_to_string(path).map_err(|e| PrepError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
            owned.as_str()
        }
    };

    // ── Step 1: Normalise ────────────────────────────────────────────────
    let prepared = prepare_document(html)?;
    debug!("Recorded {} table captions", prepared.captions.len());

    // ── Step 2: Recognise structure ──────────────────────────────────────
    // The temp file is removed when `tmp` drops, on success and on error.
    let mut tmp = tempfile::Builder::new()
        .prefix("otsl-prep-")
        .suffix(".html")
        .tempfile()
        .map_err(|e| PrepError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(prepared.html.as_bytes())
        .map_err(|e| PrepError::Internal(format!("tempfile write: {e}")))?;
    let document = structure_document(structurer, tmp.path())?;

    // ── Step 3: Post-process ─────────────────────────────────────────────
    let bodies: Vec<String> = document
        .tables
        .iter()
        .filter_map(|t| extract_otsl_body(t.export_to_doctags()))
        .map(clean_otsl_body)
        .collect();
    if bodies.len() < document.tables.len() {
        warn!(
            "{} of {} recognised tables had no OTSL block",
            document.tables.len() - bodies.len(),
            document.tables.len()
        );
    }

    Ok(bodies
        .iter()
        .enumerate()
        .map(|(i, body)| attach_caption(body, prepared.captions.get(i)))
        .collect())
}

/// [`html_to_otsl`] for callers holding two optional inputs.
///
/// Exactly one of `html` and `html_path` must be given.
pub fn html_to_otsl_from(
    html: Option<&str>,
    html_path: Option<&Path>,
    structurer: &dyn DocumentStructurer,
) -> Result<Vec<String>, PrepError> {
    let input = match (html, html_path) {
        (Some(html), None) => OtslInput::Html(html),
        (None, Some(path)) => OtslInput::Path(path),
        _ => {
            return Err(PrepError::InvalidInvocation(
                "Provide exactly one of `html` or `html_path`.".into(),
            ))
        }
    };
    html_to_otsl(input, structurer)
}

/// Resolve the structure recogniser.
///
/// 1. **Pre-built structurer** (`config.structurer`), used as-is.
/// 2. **Docling** through the configured Python interpreter.
pub fn resolve_structurer(config: &ConvertConfig) -> Arc<dyn DocumentStructurer> {
    if let Some(ref structurer) = config.structurer {
        return Arc::clone(structurer);
    }
    Arc::new(DoclingStructurer::new(config.python.clone()))
}

/// Result of [`convert_dataset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    pub converted: usize,
}

/// Convert every `.html` file in `config.html_dir` to `<otsl_dir>/<stem>.otsl`.
///
/// Each file must yield exactly one OTSL block; anything else stops the run
/// with [`PrepError::UnexpectedTableCount`]. Files written before the failure
/// stay on disk.
pub fn convert_dataset(config: &ConvertConfig) -> Result<ConvertSummary, PrepError> {
    if !config.html_dir.is_dir() {
        return Err(PrepError::DirectoryNotFound {
            what: "HTML",
            path: config.html_dir.clone(),
        });
    }
    std::fs::create_dir_all(&config.otsl_dir).map_err(|e| PrepError::WriteFailed {
        path: config.otsl_dir.clone(),
        source: e,
    })?;

    let files = layout::list_html_files(&config.html_dir, false).map_err(|e| {
        PrepError::ReadFailed {
            path: config.html_dir.clone(),
            source: e,
        }
    })?;
    let structurer = resolve_structurer(config);
    info!(
        "Converting {} HTML files with {} into {}",
        files.len(),
        structurer.name(),
        config.otsl_dir.display()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start("convert", files.len());
    }

    let mut summary = ConvertSummary::default();
    for (i, path) in files.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(i + 1, files.len(), path);
        }

        let result = convert_file(path, &config.otsl_dir, structurer.as_ref());
        if let Err(ref e) = result {
            error!("{e}");
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_error(i + 1, files.len(), path, &e.to_string());
            }
        }
        result?;

        summary.converted += 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_complete(i + 1, files.len(), path, true);
        }
    }

    info!("Converted {} files", summary.converted);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete("convert", files.len(), summary.converted);
    }
    Ok(summary)
}

fn convert_file(
    path: &Path,
    otsl_dir: &Path,
    structurer: &dyn DocumentStructurer,
) -> Result<(), PrepError> {
    let blocks = html_to_otsl(OtslInput::Path(path), structurer)?;
    let [otsl] = blocks.as_slice() else {
        return Err(PrepError::UnexpectedTableCount {
            path: path.to_path_buf(),
            count: blocks.len(),
        });
    };

    let out = otsl_dir.join(format!("{}.otsl", layout::stem_of(path)));
    std::fs::write(&out, clean_empty_cell_rows(otsl)).map_err(|e| PrepError::WriteFailed {
        path: out.clone(),
        source: e,
    })?;
    debug!("Wrote {}", out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otsl::structurer::{StructuredDocument, StructuredTable};
    use std::sync::Mutex;

    /// Returns canned exports and remembers the HTML it was given.
    struct CannedStructurer {
        exports: Vec<&'static str>,
        seen: Mutex<Option<String>>,
    }

    impl CannedStructurer {
        fn new(exports: Vec<&'static str>) -> Self {
            Self {
                exports,
                seen: Mutex::new(None),
            }
        }
    }

    impl DocumentStructurer for CannedStructurer {
        fn name(&self) -> &str {
            "canned"
        }

        fn convert_path(&self, path: &Path) -> Result<StructuredDocument, PrepError> {
            *self.seen.lock().unwrap() = Some(std::fs::read_to_string(path).unwrap());
            Ok(StructuredDocument {
                tables: self.exports.iter().map(|e| StructuredTable::new(*e)).collect(),
            })
        }
    }

    #[test]
    fn both_or_neither_input_is_rejected() {
        let s = CannedStructurer::new(vec![]);
        for (html, path) in [(None, None), (Some("<table></table>"), Some(Path::new("t.html")))] {
            let err = html_to_otsl_from(html, path, &s).unwrap_err();
            assert!(matches!(err, PrepError::InvalidInvocation(_)), "got {err:?}");
        }
    }

    #[test]
    fn structurer_sees_normalised_html() {
        let s = CannedStructurer::new(vec!["<doctag><otsl><fcel>x<nl></otsl></doctag>"]);
        html_to_otsl(
            OtslInput::Html("<table><thead><tr><th>x<sup>2</sup></th></tr></thead></table>"),
            &s,
        )
        .unwrap();
        let seen = s.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen, "<table><tbody><tr><th>x$^{2}$</th></tr></tbody></table>");
    }

    #[test]
    fn caption_is_reinserted_on_recorded_side() {
        let s = CannedStructurer::new(vec!["<otsl><fcel>a\n<nl></otsl>"]);
        let out = html_to_otsl(
            OtslInput::Html("<table><tr><td>a</td></tr><caption>Cap</caption></table>"),
            &s,
        )
        .unwrap();
        assert_eq!(out, vec!["<otsl><fcel>a<nl><caption>Cap</caption></otsl>"]);
    }

    #[test]
    fn tables_without_otsl_block_are_skipped() {
        let s = CannedStructurer::new(vec!["<doctag></doctag>", "<otsl><fcel>b<nl></otsl>"]);
        let out = html_to_otsl(OtslInput::Html("<table></table><table></table>"), &s).unwrap();
        assert_eq!(out, vec!["<otsl><fcel>b<nl></otsl>"]);
    }

    #[test]
    fn configured_structurer_takes_precedence() {
        let config = ConvertConfig::builder()
            .structurer(Arc::new(CannedStructurer::new(vec![])))
            .build()
            .unwrap();
        assert_eq!(resolve_structurer(&config).name(), "canned");
        assert_eq!(resolve_structurer(&ConvertConfig::default()).name(), "docling");
    }
}
