//! Validation stage: delete tables whose HTML is structurally ambiguous.
//!
//! A table is dropped when its HTML carries more than one `<caption>` or
//! more than one `<tbody>`. The HTML file goes together with its image and
//! TEX siblings, so the dataset never keeps half a triple for a bad table.
//!
//! Counting runs on the token stream rather than the parsed tree: the HTML5
//! tree builder inserts `<tbody>` around bare rows, and those implicit
//! sections are not in the file.

use crate::error::{FileError, PrepError};
use crate::layout::{self, ArtifactTriple, DatasetLayout};
use crate::progress::StageProgressCallback;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Log file the CLI mirrors this stage's events to.
pub const PRUNE_LOG_FILE: &str = "html_removal.log";

/// One structural problem found in an HTML table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlIssue {
    MultipleCaptions(usize),
    MultipleBodies(usize),
}

impl fmt::Display for HtmlIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtmlIssue::MultipleCaptions(n) => write!(f, "Multiple <caption> tags found: {n}"),
            HtmlIssue::MultipleBodies(n) => write!(f, "Multiple <tbody> tags found: {n}"),
        }
    }
}

/// Start tags of interest, as written in the source.
#[derive(Debug, Default)]
struct SectionCounter {
    captions: usize,
    bodies: usize,
}

impl TokenSink for SectionCounter {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        if let Token::TagToken(Tag {
            kind: TagKind::StartTag,
            name,
            ..
        }) = token
        {
            match &*name {
                "caption" => self.captions += 1,
                "tbody" => self.bodies += 1,
                _ => {}
            }
        }
        TokenSinkResult::Continue
    }
}

fn count_sections(html: &str) -> SectionCounter {
    let mut input = BufferQueue::default();
    input.push_back(StrTendril::from(html));
    let mut tokenizer = Tokenizer::new(SectionCounter::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();
    tokenizer.sink
}

/// Every issue in `html`; empty when the file is fine.
pub fn inspect_html(html: &str) -> Vec<HtmlIssue> {
    let counts = count_sections(html);
    let mut issues = Vec::new();

    if counts.captions > 1 {
        issues.push(HtmlIssue::MultipleCaptions(counts.captions));
    }
    if counts.bodies > 1 {
        issues.push(HtmlIssue::MultipleBodies(counts.bodies));
    }
    issues
}

/// Counters reported at the end of the stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneSummary {
    pub processed: usize,
    pub with_issues: usize,
    /// HTML, image and TEX files actually deleted.
    pub removed_files: usize,
}

impl PruneSummary {
    /// Share of processed files that had issues, in percent.
    pub fn issue_percentage(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        self.with_issues as f64 * 100.0 / self.processed as f64
    }
}

/// Inspect every HTML file of `layout` and delete the flagged triples.
pub fn prune_dataset(
    layout: &DatasetLayout,
    progress: &dyn StageProgressCallback,
) -> Result<PruneSummary, PrepError> {
    info!("Starting HTML file processing...");

    let html_dir = layout.html_dir();
    if !html_dir.is_dir() {
        error!("HTML directory not found: {}", html_dir.display());
        return Err(PrepError::DirectoryNotFound {
            what: "HTML",
            path: html_dir,
        });
    }
    if !layout.images_dir().is_dir() {
        warn!("Images directory not found: {}", layout.images_dir().display());
    }
    if !layout.tex_dir().is_dir() {
        warn!("TEX directory not found: {}", layout.tex_dir().display());
    }

    let files = layout::list_html_files(&html_dir, false).map_err(|e| PrepError::ReadFailed {
        path: html_dir.clone(),
        source: e,
    })?;
    info!("Found {} HTML files to process", files.len());
    progress.on_stage_start("prune", files.len());

    let mut summary = PruneSummary::default();
    for (i, path) in files.iter().enumerate() {
        summary.processed += 1;
        progress.on_file_start(i + 1, files.len(), path);
        debug!("Processing: {}", path.display());

        let issues = match check_file(path) {
            Ok(issues) => issues,
            Err(e) => {
                error!("{e}");
                progress.on_file_error(i + 1, files.len(), path, &e.to_string());
                continue;
            }
        };
        if issues.is_empty() {
            progress.on_file_complete(i + 1, files.len(), path, false);
            continue;
        }

        summary.with_issues += 1;
        let described: Vec<String> = issues.iter().map(ToString::to_string).collect();
        warn!("Issues found in {}: {}", path.display(), described.join("; "));

        let triple = layout.triple_for(path);
        summary.removed_files += remove_triple(&triple, progress, i + 1, files.len());
        progress.on_file_complete(i + 1, files.len(), path, true);
    }

    info!("{}", "=".repeat(60));
    info!("PROCESSING COMPLETE");
    info!("{}", "=".repeat(60));
    info!("Total HTML files processed: {}", summary.processed);
    info!("Files with issues found: {}", summary.with_issues);
    info!("Total files removed: {}", summary.removed_files);
    info!("Percentage with issues: {:.2}%", summary.issue_percentage());
    if summary.with_issues > 0 {
        info!("Check '{PRUNE_LOG_FILE}' for detailed information about removed files.");
    }

    progress.on_stage_complete("prune", summary.processed, summary.with_issues);
    Ok(summary)
}

fn check_file(path: &Path) -> Result<Vec<HtmlIssue>, FileError> {
    let html = layout::read_text(path).map_err(|e| FileError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(inspect_html(&html))
}

/// Delete the HTML file and whichever siblings exist; returns how many went.
fn remove_triple(
    triple: &ArtifactTriple,
    progress: &dyn StageProgressCallback,
    index: usize,
    total: usize,
) -> usize {
    let siblings = triple.existing_siblings();
    let mut targets = vec![triple.html.as_path()];
    targets.extend(siblings);

    let listed: Vec<String> = targets.iter().map(|p| p.display().to_string()).collect();
    info!("Removing files: {}", listed.join(", "));

    let mut removed = 0;
    for target in targets {
        match std::fs::remove_file(target) {
            Ok(()) => {
                removed += 1;
                info!("Removed file: {}", target.display());
            }
            Err(e) => {
                let e = FileError::Remove {
                    path: target.to_path_buf(),
                    source: e,
                };
                error!("{e}");
                progress.on_file_error(index, total, target, &e.to_string());
            }
        }
    }
    removed
}
