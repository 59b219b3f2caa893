//! # otsl-prep
//!
//! Curate a dataset of scientific tables and convert their HTML to OTSL.
//!
//! Each table in the dataset is an artifact triple sharing a file stem: the
//! HTML rendering, the LaTeX source and a rendered image. The stages below
//! clean that dataset up and finally turn every HTML table into OTSL, the
//! compact tag sequence (`<fcel>`, `<ecel>`, `<nl>`, …) table-structure
//! models are trained on.
//!
//! ## Pipeline Overview
//!
//! ```text
//! tables/{html,tex_files,images}
//!  │
//!  ├─ 1. Manifest     list triples into tables_english_data.json
//!  ├─ 2. Copy         take the first N triples out of a bulk source
//!  ├─ 3. Prune        drop tables with several captions or bodies
//!  ├─ 4. Whitespace   strip invisible spaces, collapse space runs
//!  ├─ 5. Captions     move <caption> to the side the LaTeX puts it
//!  └─ 6. Convert      normalise HTML, recognise structure, emit .otsl
//! ```
//!
//! Stages share no state and can be run one at a time from the `otsl-prep`
//! binary or called directly.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use otsl_prep::{convert_dataset, ConvertConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConvertConfig::builder()
//!         .html_dir("tables/html")
//!         .otsl_dir("tables/otsl")
//!         .build()?;
//!     let summary = convert_dataset(&config)?;
//!     eprintln!("converted {} tables", summary.converted);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `otsl-prep` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! The default structure recogniser shells out to Python with `docling`
//! installed. Library users can plug in their own via
//! [`ConvertConfigBuilder::structurer`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod html;
pub mod layout;
pub mod otsl;
pub mod progress;
pub mod stages;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConvertConfig, ConvertConfigBuilder, CopyOptions, ScanOptions};
pub use convert::{convert_dataset, html_to_otsl, html_to_otsl_from, ConvertSummary, OtslInput};
pub use error::{FileError, PrepError};
pub use layout::{ArtifactTriple, DatasetLayout};
pub use otsl::structurer::{DoclingStructurer, DocumentStructurer, StructuredDocument, StructuredTable};
pub use progress::{NoopProgressCallback, ProgressCallback, StageProgressCallback};
