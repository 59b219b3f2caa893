//! Configuration types for the curation stages.
//!
//! The file-system stages take small plain structs ([`ScanOptions`],
//! [`CopyOptions`]). The structure-conversion stage has more knobs and an
//! injectable converter, so [`ConvertConfig`] is built through
//! [`ConvertConfigBuilder`], which validates before handing it out.

use crate::error::PrepError;
use crate::otsl::structurer::DocumentStructurer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default manifest file written by the inventory stage.
pub const DEFAULT_MANIFEST: &str = "tables_english_data.json";

/// Default number of manifest entries the copy stage takes.
pub const DEFAULT_COPY_LIMIT: usize = 500;

/// Python interpreter used by the default structure converter.
pub const DEFAULT_PYTHON: &str = "python3";

/// Which files a whitespace stage rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Directory containing `.html` files.
    pub dir: PathBuf,
    /// Recurse into subdirectories.
    pub recursive: bool,
}

impl ScanOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            recursive: false,
        }
    }

    pub fn recursive(mut self, v: bool) -> Self {
        self.recursive = v;
        self
    }
}

/// Where the copy stage reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOptions {
    /// Root the manifest's relative paths are resolved against.
    pub source_root: PathBuf,
    /// Number of leading manifest entries to copy.
    pub limit: usize,
    pub html_out: PathBuf,
    pub image_out: PathBuf,
    pub tex_out: PathBuf,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            limit: DEFAULT_COPY_LIMIT,
            html_out: PathBuf::from("table_html"),
            image_out: PathBuf::from("table_images"),
            tex_out: PathBuf::from("table_tex"),
        }
    }
}

/// Configuration for the HTML → OTSL conversion stage.
///
/// Built via [`ConvertConfig::builder()`] or [`ConvertConfig::default()`].
///
/// # Example
/// ```rust
/// use otsl_prep::ConvertConfig;
///
/// let config = ConvertConfig::builder()
///     .html_dir("tables/html")
///     .otsl_dir("tables/otsl")
///     .python("/opt/venv/bin/python")
///     .build()
///     .unwrap();
/// assert_eq!(config.python, "/opt/venv/bin/python");
/// ```
#[derive(Clone)]
pub struct ConvertConfig {
    /// Directory of input `.html` tables. Default: `../html`.
    pub html_dir: PathBuf,

    /// Directory receiving one `.otsl` file per table. Default: `../otsl`.
    pub otsl_dir: PathBuf,

    /// Interpreter that runs the docling bridge. Default: `python3`.
    pub python: String,

    /// Pre-constructed structure converter. Takes precedence over `python`.
    pub structurer: Option<Arc<dyn DocumentStructurer>>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            html_dir: PathBuf::from("../html"),
            otsl_dir: PathBuf::from("../otsl"),
            python: DEFAULT_PYTHON.to_string(),
            structurer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConvertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertConfig")
            .field("html_dir", &self.html_dir)
            .field("otsl_dir", &self.otsl_dir)
            .field("python", &self.python)
            .field(
                "structurer",
                &self.structurer.as_ref().map(|s| s.name().to_string()),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn StageProgressCallback>"),
            )
            .finish()
    }
}

impl ConvertConfig {
    /// Create a new builder for `ConvertConfig`.
    pub fn builder() -> ConvertConfigBuilder {
        ConvertConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConvertConfig`].
#[derive(Debug)]
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    pub fn html_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.html_dir = dir.into();
        self
    }

    pub fn otsl_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.otsl_dir = dir.into();
        self
    }

    pub fn python(mut self, python: impl Into<String>) -> Self {
        self.config.python = python.into();
        self
    }

    pub fn structurer(mut self, structurer: Arc<dyn DocumentStructurer>) -> Self {
        self.config.structurer = Some(structurer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConvertConfig, PrepError> {
        let c = &self.config;
        if c.structurer.is_none() && c.python.trim().is_empty() {
            return Err(PrepError::InvalidConfig(
                "python interpreter must not be empty".into(),
            ));
        }
        if c.html_dir == c.otsl_dir {
            return Err(PrepError::InvalidConfig(format!(
                "HTML and OTSL directories must differ, both are '{}'",
                c.html_dir.display()
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_convert_config_uses_sibling_dirs() {
        let c = ConvertConfig::default();
        assert_eq!(c.html_dir, PathBuf::from("../html"));
        assert_eq!(c.otsl_dir, PathBuf::from("../otsl"));
        assert_eq!(c.python, "python3");
        assert!(c.structurer.is_none());
    }

    #[test]
    fn builder_rejects_empty_python() {
        let err = ConvertConfig::builder().python("  ").build().unwrap_err();
        assert!(matches!(err, PrepError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_same_input_and_output_dir() {
        let err = ConvertConfig::builder()
            .html_dir("x")
            .otsl_dir("x")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn scan_options_default_is_flat() {
        let opts = ScanOptions::new("tables/html");
        assert!(!opts.recursive);
        assert!(opts.recursive(true).recursive);
    }

    #[test]
    fn copy_defaults_match_working_dirs() {
        let c = CopyOptions::default();
        assert_eq!(c.limit, 500);
        assert_eq!(c.html_out, PathBuf::from("table_html"));
        assert_eq!(c.image_out, PathBuf::from("table_images"));
        assert_eq!(c.tex_out, PathBuf::from("table_tex"));
    }
}
