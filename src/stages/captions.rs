//! Caption placement correction.
//!
//! The LaTeX source decides whether a table's caption belongs above or below
//! its body. This stage reads that decision out of `<stem>.tex` and moves the
//! `<caption>` of `<stem>.html` to the first or last child slot of its table.
//! Running it twice changes nothing the second time.

use crate::error::PrepError;
use crate::html::{self, HtmlFragment};
use crate::layout::{self, DatasetLayout};
use crate::progress::StageProgressCallback;
use markup5ever_rcdom::Handle;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Log file the CLI mirrors this stage's events to.
pub const CAPTION_LOG_FILE: &str = "caption_correction.log";

static RE_TEX_CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\caption(?:\[[^\]]*\])?\s*\{").unwrap());

static RE_TEX_TABLE_ENV: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\begin\{(tabular|tabularx|longtable|array)\}").unwrap());

/// Where the LaTeX source puts the caption relative to the table body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexCaptionPosition {
    Before,
    After,
    /// No caption, or no table environment to compare it with.
    None,
}

/// Where the caption currently sits among the table's element children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionPlacement {
    Before,
    After,
    Middle,
    /// The caption is nested deeper than a direct child.
    Unknown,
}

impl fmt::Display for CaptionPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaptionPlacement::Before => "before",
            CaptionPlacement::After => "after",
            CaptionPlacement::Middle => "middle",
            CaptionPlacement::Unknown => "unknown",
        })
    }
}

impl TexCaptionPosition {
    fn placement(self) -> Option<CaptionPlacement> {
        match self {
            TexCaptionPosition::Before => Some(CaptionPlacement::Before),
            TexCaptionPosition::After => Some(CaptionPlacement::After),
            TexCaptionPosition::None => None,
        }
    }
}

/// Drop everything from an unescaped `%` to the end of its line.
pub fn strip_tex_comments(tex: &str) -> String {
    let mut out = String::with_capacity(tex.len());
    for line in tex.split_inclusive('\n') {
        let bytes = line.as_bytes();
        let cut = (0..bytes.len()).find(|&i| bytes[i] == b'%' && (i == 0 || bytes[i - 1] != b'\\'));
        match cut {
            Some(i) => {
                out.push_str(&line[..i]);
                if line.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => out.push_str(line),
        }
    }
    out
}

/// Derive the caption position from LaTeX source.
pub fn caption_position_from_tex(tex: &str) -> TexCaptionPosition {
    let content = strip_tex_comments(tex);
    let Some(caption) = RE_TEX_CAPTION.find(&content) else {
        return TexCaptionPosition::None;
    };
    let Some(table_env) = RE_TEX_TABLE_ENV.find(&content) else {
        return TexCaptionPosition::None;
    };
    if caption.start() < table_env.start() {
        TexCaptionPosition::Before
    } else {
        TexCaptionPosition::After
    }
}

/// Position of `caption` among the direct element children of `table`.
pub fn current_placement(table: &Handle, caption: &Handle) -> CaptionPlacement {
    let children = html::element_children(table);
    match html::index_of(&children, caption) {
        Some(0) => CaptionPlacement::Before,
        Some(i) if i + 1 == children.len() => CaptionPlacement::After,
        Some(_) => CaptionPlacement::Middle,
        None => CaptionPlacement::Unknown,
    }
}

/// Outcome of [`correct_caption_placement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionFix {
    Unchanged,
    Moved {
        from: CaptionPlacement,
        to: CaptionPlacement,
        html: String,
    },
}

/// Move the single caption of the first table to `position`.
///
/// Documents without a table, without a caption in it, or with several
/// captions are left alone, as are captions already in place.
pub fn correct_caption_placement(
    html_text: &str,
    position: TexCaptionPosition,
) -> Result<CaptionFix, PrepError> {
    let Some(desired) = position.placement() else {
        return Ok(CaptionFix::Unchanged);
    };

    let doc = HtmlFragment::parse(html_text);
    let Some(table) = doc.find_first(&["table"]) else {
        warn!("No table found");
        return Ok(CaptionFix::Unchanged);
    };
    let captions = html::find_all(&table, &["caption"]);
    let caption = match captions.as_slice() {
        [] => {
            warn!("No caption found in table");
            return Ok(CaptionFix::Unchanged);
        }
        [only] => only.clone(),
        _ => {
            warn!("Multiple captions found, skipping");
            return Ok(CaptionFix::Unchanged);
        }
    };

    let current = current_placement(&table, &caption);
    if current == desired {
        debug!("Caption already in correct position ({desired})");
        return Ok(CaptionFix::Unchanged);
    }

    match desired {
        CaptionPlacement::Before => html::insert_child(&table, 0, &caption),
        _ => html::append_child(&table, &caption),
    }
    let html = doc
        .to_html()
        .map_err(|e| PrepError::Internal(format!("serialising HTML: {e}")))?;
    Ok(CaptionFix::Moved {
        from: current,
        to: desired,
        html,
    })
}

/// Counters reported at the end of the stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptionSummary {
    pub processed: usize,
    pub with_captions: usize,
    pub corrected: usize,
    pub tex_before: usize,
    pub tex_after: usize,
    pub tex_none: usize,
}

/// Correct every HTML file of `layout` against its TEX sibling.
pub fn fix_caption_dataset(
    layout: &DatasetLayout,
    progress: &dyn StageProgressCallback,
) -> Result<CaptionSummary, PrepError> {
    info!("Starting caption placement correction...");

    let html_dir = layout.html_dir();
    let tex_dir = layout.tex_dir();
    for (what, dir) in [("HTML", &html_dir), ("TEX", &tex_dir)] {
        if !dir.is_dir() {
            error!("{what} directory not found: {}", dir.display());
            return Err(PrepError::DirectoryNotFound {
                what,
                path: dir.clone(),
            });
        }
    }

    let files = layout::list_html_files(&html_dir, false).map_err(|e| PrepError::ReadFailed {
        path: html_dir.clone(),
        source: e,
    })?;
    info!("Found {} HTML files to process", files.len());
    progress.on_stage_start("fix-captions", files.len());

    let mut summary = CaptionSummary::default();
    for (i, path) in files.iter().enumerate() {
        summary.processed += 1;
        progress.on_file_start(i + 1, files.len(), path);
        match fix_file(layout, path, &mut summary) {
            Ok(changed) => progress.on_file_complete(i + 1, files.len(), path, changed),
            Err(e) => {
                error!("Error correcting caption placement in {}: {e}", path.display());
                progress.on_file_error(i + 1, files.len(), path, &e.to_string());
            }
        }
    }

    info!("{}", "=".repeat(60));
    info!("CAPTION CORRECTION COMPLETE");
    info!("{}", "=".repeat(60));
    info!("Total HTML files processed: {}", summary.processed);
    info!("HTML files with captions: {}", summary.with_captions);
    info!("Files corrected: {}", summary.corrected);
    info!("Caption positions in TEX files:");
    info!("  - Before tabular: {}", summary.tex_before);
    info!("  - After tabular: {}", summary.tex_after);
    info!("  - No caption found: {}", summary.tex_none);
    if summary.corrected > 0 {
        info!("Check '{CAPTION_LOG_FILE}' for detailed information about corrections.");
    }

    progress.on_stage_complete("fix-captions", summary.processed, summary.corrected);
    Ok(summary)
}

fn read_text(path: &Path) -> Result<String, PrepError> {
    layout::read_text(path).map_err(|e| PrepError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Why `tex` yields no caption position, naming the file.
fn unplaced_caption_message(tex: &str, tex_path: &Path) -> String {
    if RE_TEX_CAPTION.is_match(&strip_tex_comments(tex)) {
        format!("No tabular environment found in {}", tex_path.display())
    } else {
        format!("No caption found in TEX file {}", tex_path.display())
    }
}

fn fix_file(
    layout: &DatasetLayout,
    path: &Path,
    summary: &mut CaptionSummary,
) -> Result<bool, PrepError> {
    let html_text = read_text(path)?;
    if HtmlFragment::parse(&html_text).find_first(&["caption"]).is_none() {
        debug!("No caption found in {}, skipping", path.display());
        return Ok(false);
    }
    summary.with_captions += 1;

    let triple = layout.triple_for(path);
    if !triple.tex.exists() {
        warn!("No corresponding TEX file found for {}", path.display());
        return Ok(false);
    }

    let tex = read_text(&triple.tex)?;
    let position = caption_position_from_tex(&tex);
    match position {
        TexCaptionPosition::Before => summary.tex_before += 1,
        TexCaptionPosition::After => summary.tex_after += 1,
        TexCaptionPosition::None => {
            summary.tex_none += 1;
            warn!("{}", unplaced_caption_message(&tex, &triple.tex));
            return Ok(false);
        }
    }

    match correct_caption_placement(&html_text, position)? {
        CaptionFix::Unchanged => Ok(false),
        CaptionFix::Moved { from, to, html } => {
            std::fs::write(path, html).map_err(|e| PrepError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
            summary.corrected += 1;
            info!("Moved caption from {from} to {to} in {}", path.display());
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tex_caption_before_tabular() {
        let tex = "\\begin{table}\\caption{Results}\\begin{tabular}{cc}a&b\\end{tabular}\\end{table}";
        assert_eq!(caption_position_from_tex(tex), TexCaptionPosition::Before);
    }

    #[test]
    fn tex_caption_after_tabular_with_short_form() {
        let tex = "\\begin{tabularx}{\\linewidth}{X}x\\end{tabularx}\n\\caption[short] {Long}";
        assert_eq!(caption_position_from_tex(tex), TexCaptionPosition::After);
    }

    #[test]
    fn tex_without_caption_or_environment_is_none() {
        assert_eq!(
            caption_position_from_tex("\\begin{tabular}{c}x\\end{tabular}"),
            TexCaptionPosition::None
        );
        assert_eq!(
            caption_position_from_tex("\\caption{Lonely}"),
            TexCaptionPosition::None
        );
    }

    #[test]
    fn unplaced_caption_message_names_the_tex_file() {
        let path = Path::new("tables/tex_files/t9.tex");
        assert_eq!(
            unplaced_caption_message("\\caption{Lonely}", path),
            "No tabular environment found in tables/tex_files/t9.tex"
        );
        assert_eq!(
            unplaced_caption_message("% \\caption{gone}\n\\begin{tabular}{c}", path),
            "No caption found in TEX file tables/tex_files/t9.tex"
        );
    }

    #[test]
    fn commented_caption_is_ignored() {
        let tex = "% \\caption{old}\n\\begin{longtable}{c}\n\\caption{new}\n";
        assert_eq!(caption_position_from_tex(tex), TexCaptionPosition::After);
    }

    #[test]
    fn escaped_percent_is_not_a_comment() {
        assert_eq!(
            strip_tex_comments("50\\% of rows % note\nnext"),
            "50\\% of rows \nnext"
        );
    }

    #[test]
    fn moves_trailing_caption_to_front() {
        let html = "<table><tr><td>a</td></tr><caption>Cap</caption></table>";
        let fixed = correct_caption_placement(html, TexCaptionPosition::Before).unwrap();
        let CaptionFix::Moved { from, to, html } = fixed else {
            panic!("expected a move, got {fixed:?}");
        };
        assert_eq!(from, CaptionPlacement::After);
        assert_eq!(to, CaptionPlacement::Before);
        assert!(html.starts_with("<table><caption>Cap</caption>"), "got: {html}");

        assert_eq!(
            correct_caption_placement(&html, TexCaptionPosition::Before).unwrap(),
            CaptionFix::Unchanged
        );
    }

    #[test]
    fn moves_leading_caption_to_back() {
        let html = "<table><caption>Cap</caption><tbody><tr><td>a</td></tr></tbody></table>";
        let CaptionFix::Moved { html, .. } =
            correct_caption_placement(html, TexCaptionPosition::After).unwrap()
        else {
            panic!("expected a move");
        };
        assert!(html.ends_with("<caption>Cap</caption></table>"), "got: {html}");
    }

    #[test]
    fn ambiguous_or_missing_caption_is_left_alone() {
        let two = "<table><caption>a</caption><caption>b</caption></table>";
        assert_eq!(
            correct_caption_placement(two, TexCaptionPosition::After).unwrap(),
            CaptionFix::Unchanged
        );
        let none = "<table><tr><td>a</td></tr></table>";
        assert_eq!(
            correct_caption_placement(none, TexCaptionPosition::Before).unwrap(),
            CaptionFix::Unchanged
        );
        assert_eq!(
            correct_caption_placement("<p>no table</p>", TexCaptionPosition::Before).unwrap(),
            CaptionFix::Unchanged
        );
    }

    #[test]
    fn middle_placement_is_detected() {
        let doc = HtmlFragment::parse(
            "<table><thead><tr><td>h</td></tr></thead><caption>c</caption><tbody></tbody></table>",
        );
        let table = doc.find_first(&["table"]).unwrap();
        let caption = doc.find_first(&["caption"]).unwrap();
        assert_eq!(current_placement(&table, &caption), CaptionPlacement::Middle);
    }
}
