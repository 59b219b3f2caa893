//! The external structure recogniser behind a trait.
//!
//! Conversion hands a normalised HTML file to a [`DocumentStructurer`] and
//! gets back the tables it recognised, each exportable as a flat doctags
//! string. A structurer may support converting from a path, from bytes, or
//! both; [`structure_document`] tries the path first and falls back to bytes.
//!
//! [`DoclingStructurer`] is the production implementation. Tests plug in
//! their own.

use crate::error::PrepError;
use crate::otsl::bridge::BRIDGE_SCRIPT;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// MIME type used for the bytes entry point.
pub const HTML_MIME: &str = "text/html";

/// One table recognised in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredTable {
    doctags: String,
}

impl StructuredTable {
    pub fn new(doctags: impl Into<String>) -> Self {
        Self {
            doctags: doctags.into(),
        }
    }

    /// The flat doctags export, containing an `<otsl>…</otsl>` block.
    pub fn export_to_doctags(&self) -> &str {
        &self.doctags
    }
}

/// Tables of a converted document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredDocument {
    pub tables: Vec<StructuredTable>,
}

/// A document-understanding backend.
///
/// Both entry points default to [`PrepError::StructurerUnsupported`].
pub trait DocumentStructurer: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn convert_path(&self, path: &Path) -> Result<StructuredDocument, PrepError> {
        let _ = path;
        Err(PrepError::StructurerUnsupported {
            structurer: self.name().to_string(),
            entry_point: "path",
        })
    }

    fn convert_bytes(&self, bytes: &[u8], mime: &str) -> Result<StructuredDocument, PrepError> {
        let _ = (bytes, mime);
        Err(PrepError::StructurerUnsupported {
            structurer: self.name().to_string(),
            entry_point: "bytes",
        })
    }
}

/// Convert the HTML file at `path`, trying each entry point once.
///
/// Fails with [`PrepError::ConversionFailed`] carrying the last error when
/// no entry point succeeds.
pub fn structure_document(
    structurer: &dyn DocumentStructurer,
    path: &Path,
) -> Result<StructuredDocument, PrepError> {
    let last_error = match structurer.convert_path(path) {
        Ok(doc) => return Ok(doc),
        Err(e) => e,
    };
    debug!("{} path conversion failed: {last_error}", structurer.name());

    let bytes = std::fs::read(path).map_err(|e| PrepError::ConversionFailed {
        detail: format!("{last_error}; reading {} for bytes conversion: {e}", path.display()),
    })?;
    match structurer.convert_bytes(&bytes, HTML_MIME) {
        Ok(doc) => Ok(doc),
        Err(e) => {
            warn!("{} could not convert {}: {e}", structurer.name(), path.display());
            Err(PrepError::ConversionFailed {
                detail: e.to_string(),
            })
        }
    }
}

/// Runs docling through a Python interpreter.
#[derive(Debug, Clone)]
pub struct DoclingStructurer {
    python: String,
}

impl DoclingStructurer {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    fn run(&self, mode: &str, arg: &str, stdin: Option<&[u8]>) -> Result<StructuredDocument, PrepError> {
        let output_error = |detail: String| PrepError::StructurerOutput {
            structurer: self.name().to_string(),
            detail,
        };

        let mut child = Command::new(&self.python)
            .arg("-c")
            .arg(BRIDGE_SCRIPT)
            .arg(mode)
            .arg(arg)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| output_error(format!("failed to start '{}': {e}", self.python)))?;

        if let (Some(data), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(data)
                .map_err(|e| output_error(format!("writing document to stdin: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| output_error(format!("waiting for interpreter: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().last().unwrap_or("").trim().to_string();
            return Err(output_error(format!("{} ({last_line})", output.status)));
        }

        parse_bridge_output(&output.stdout).map_err(output_error)
    }
}

impl DocumentStructurer for DoclingStructurer {
    fn name(&self) -> &str {
        "docling"
    }

    fn convert_path(&self, path: &Path) -> Result<StructuredDocument, PrepError> {
        self.run("path", &path.to_string_lossy(), None)
    }

    fn convert_bytes(&self, bytes: &[u8], mime: &str) -> Result<StructuredDocument, PrepError> {
        self.run("bytes", mime, Some(bytes))
    }
}

/// Decode the bridge's stdout: a JSON array of doctags strings.
fn parse_bridge_output(stdout: &[u8]) -> Result<StructuredDocument, String> {
    let exports: Vec<String> =
        serde_json::from_slice(stdout).map_err(|e| format!("unexpected bridge output: {e}"))?;
    Ok(StructuredDocument {
        tables: exports.into_iter().map(StructuredTable::new).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct PathOnly;

    impl DocumentStructurer for PathOnly {
        fn name(&self) -> &str {
            "path-only"
        }

        fn convert_path(&self, _path: &Path) -> Result<StructuredDocument, PrepError> {
            Ok(StructuredDocument {
                tables: vec![StructuredTable::new("<otsl><fcel>a<nl></otsl>")],
            })
        }
    }

    #[derive(Default)]
    struct BytesOnly {
        seen: AtomicUsize,
    }

    impl DocumentStructurer for BytesOnly {
        fn name(&self) -> &str {
            "bytes-only"
        }

        fn convert_bytes(&self, bytes: &[u8], mime: &str) -> Result<StructuredDocument, PrepError> {
            assert_eq!(mime, HTML_MIME);
            self.seen.store(bytes.len(), Ordering::SeqCst);
            Ok(StructuredDocument::default())
        }
    }

    struct Nothing;

    impl DocumentStructurer for Nothing {
        fn name(&self) -> &str {
            "nothing"
        }
    }

    fn temp_html() -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
        f.write_all(b"<table></table>").unwrap();
        f
    }

    #[test]
    fn path_entry_point_wins() {
        let f = temp_html();
        let doc = structure_document(&PathOnly, f.path()).unwrap();
        assert_eq!(doc.tables[0].export_to_doctags(), "<otsl><fcel>a<nl></otsl>");
    }

    #[test]
    fn falls_back_to_bytes() {
        let f = temp_html();
        let s = BytesOnly::default();
        structure_document(&s, f.path()).unwrap();
        assert_eq!(s.seen.load(Ordering::SeqCst), "<table></table>".len());
    }

    #[test]
    fn no_entry_point_reports_last_error() {
        let f = temp_html();
        let err = structure_document(&Nothing, f.path()).unwrap_err();
        match err {
            PrepError::ConversionFailed { detail } => {
                assert!(detail.contains("bytes"), "got: {detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bridge_output_is_a_json_array() {
        let doc = parse_bridge_output(br#"["<otsl>a</otsl>", "<otsl>b</otsl>"]"#).unwrap();
        assert_eq!(doc.tables.len(), 2);
        assert!(parse_bridge_output(b"Traceback").is_err());
    }

    #[test]
    fn missing_interpreter_is_an_output_error() {
        let s = DoclingStructurer::new("/nonexistent/python-for-otsl-prep");
        let err = s.convert_path(Path::new("t.html")).unwrap_err();
        assert!(matches!(err, PrepError::StructurerOutput { .. }));
    }
}
