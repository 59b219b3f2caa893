//! Error types for the otsl-prep library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PrepError`]: **Fatal**, the stage cannot proceed at all (missing
//!   input directory, conflicting arguments, the structure converter failed
//!   on a document). Returned as `Err(PrepError)` from the stage entry points.
//!
//! * [`FileError`]: **Non-fatal**, a single file could not be read, written
//!   or deleted. The stage logs it, reports it to the progress callback and
//!   moves on to the next file.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the otsl-prep library.
#[derive(Debug, Error)]
pub enum PrepError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A directory the stage depends on does not exist or is not a directory.
    #[error("{what} directory not found: '{path}'")]
    DirectoryNotFound { what: &'static str, path: PathBuf },

    /// The caller supplied conflicting or missing arguments.
    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),

    /// Reading an input file failed.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Manifest errors ───────────────────────────────────────────────────
    /// The manifest file is not a JSON array of manifest records.
    #[error("Manifest '{path}' is not valid: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The manifest could not be serialised.
    #[error("Failed to serialise manifest: {0}")]
    ManifestWrite(#[from] serde_json::Error),

    /// Copying one artifact out of the bulk source failed.
    #[error("Failed to copy '{from}' to '{to}': {source}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Structure conversion errors ───────────────────────────────────────
    /// Every conversion entry point of the structure converter failed.
    #[error("Could not convert HTML with the structure converter. Last error: {detail}")]
    ConversionFailed { detail: String },

    /// The structure converter does not offer the requested entry point.
    #[error("Structure converter '{structurer}' does not support {entry_point} conversion")]
    StructurerUnsupported {
        structurer: String,
        entry_point: &'static str,
    },

    /// The structure converter ran but its output could not be understood.
    #[error("Structure converter '{structurer}' failed: {detail}")]
    StructurerOutput { structurer: String, detail: String },

    /// A file expected to hold exactly one table produced a different count.
    #[error("File '{path}' produced {count} OTSL entries (expected exactly 1)")]
    UnexpectedTableCount { path: PathBuf, count: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrepError {
    /// Process exit code the CLI uses for this error.
    ///
    /// Missing directories exit with 2, everything else with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            PrepError::DirectoryNotFound { .. } => 2,
            _ => 1,
        }
    }
}

/// A non-fatal error for a single file.
///
/// Logged and handed to [`crate::progress::StageProgressCallback::on_file_error`];
/// the stage continues with the next file.
#[derive(Debug, Error)]
pub enum FileError {
    /// The file could not be read.
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rewritten content could not be written back.
    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file could not be deleted.
    #[error("Failed to remove {path:?}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
