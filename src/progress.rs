//! Progress-callback trait for per-file stage events.
//!
//! Every stage takes a `&dyn StageProgressCallback` and reports through it
//! instead of touching process-wide state. The CLI passes an indicatif-backed
//! implementation; library callers and tests pass [`NoopProgressCallback`] or
//! their own counter.
//!
//! # Example
//!
//! ```rust
//! use otsl_prep::StageProgressCallback;
//! use std::path::Path;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     changed: AtomicUsize,
//! }
//!
//! impl StageProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, _index: usize, _total: usize, path: &Path, changed: bool) {
//!         if changed {
//!             self.changed.fetch_add(1, Ordering::SeqCst);
//!             eprintln!("rewrote {}", path.display());
//!         }
//!     }
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by a stage as it walks its input files.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait StageProgressCallback: Send + Sync {
    /// Called once, after the input files were listed.
    fn on_stage_start(&self, stage: &str, total_files: usize) {
        let _ = (stage, total_files);
    }

    /// Called before a file is processed.
    fn on_file_start(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called when a file was processed; `changed` is true when the stage
    /// rewrote, moved or deleted something for it.
    fn on_file_complete(&self, index: usize, total: usize, path: &Path, changed: bool) {
        let _ = (index, total, path, changed);
    }

    /// Called when a file was skipped because of a non-fatal error.
    fn on_file_error(&self, index: usize, total: usize, path: &Path, error: &str) {
        let _ = (index, total, path, error);
    }

    /// Called once after every file has been attempted.
    fn on_stage_complete(&self, stage: &str, total_files: usize, changed: usize) {
        let _ = (stage, total_files, changed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl StageProgressCallback for NoopProgressCallback {}

/// Shared handle stored in [`crate::config::ConvertConfig`].
pub type ProgressCallback = Arc<dyn StageProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        starts: AtomicUsize,
        changed: AtomicUsize,
        errors: AtomicUsize,
        completed_changed: AtomicUsize,
    }

    impl StageProgressCallback for TrackingCallback {
        fn on_stage_start(&self, _stage: &str, total_files: usize) {
            self.started_total.store(total_files, Ordering::SeqCst);
        }

        fn on_file_start(&self, _index: usize, _total: usize, _path: &Path) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _index: usize, _total: usize, _path: &Path, changed: bool) {
            if changed {
                self.changed.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_file_error(&self, _index: usize, _total: usize, _path: &Path, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_complete(&self, _stage: &str, _total_files: usize, changed: usize) {
            self.completed_changed.store(changed, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start("prune", 2);
        cb.on_file_start(1, 2, Path::new("a.html"));
        cb.on_file_complete(1, 2, Path::new("a.html"), true);
        cb.on_file_error(2, 2, Path::new("b.html"), "unreadable");
        cb.on_stage_complete("prune", 2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_stage_start("strip-whitespace", 3);
        tracker.on_file_start(1, 3, Path::new("a.html"));
        tracker.on_file_complete(1, 3, Path::new("a.html"), true);
        tracker.on_file_start(2, 3, Path::new("b.html"));
        tracker.on_file_complete(2, 3, Path::new("b.html"), false);
        tracker.on_file_start(3, 3, Path::new("c.html"));
        tracker.on_file_error(3, 3, Path::new("c.html"), "permission denied");
        tracker.on_stage_complete("strip-whitespace", 3, 1);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.changed.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_changed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start("convert", 10);
        cb.on_file_complete(1, 10, Path::new("t1.html"), true);
    }
}
