//! Post-processing of the recogniser's OTSL output.
//!
//! Each rule is a pure `&str -> String` transform applied per table:
//! extract the `<otsl>` body, strip whitespace artefacts and stray `$$`,
//! splice the recorded caption back in, and finally drop placeholder rows
//! made only of empty cells.

use crate::otsl::normalize::RecordedCaption;
use crate::stages::whitespace::INVISIBLE_SPACES;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_OTSL_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<otsl>(.*?)</otsl>").unwrap());

static RE_DOLLAR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\$+").unwrap());

static RE_EMPTY_CELL_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(</caption>|<nl>|<otsl>)(<ecel>)+<nl>").unwrap());

/// Content of the first `<otsl>…</otsl>` block, if any.
pub fn extract_otsl_body(doctags: &str) -> Option<&str> {
    RE_OTSL_BLOCK
        .captures(doctags)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Remove newlines, `<text>` wrappers, typographic spaces and `$$` runs.
pub fn clean_otsl_body(body: &str) -> String {
    let stripped: String = body
        .replace('\n', "")
        .replace("<text>", "")
        .replace("</text>", "")
        .chars()
        .filter(|c| !INVISIBLE_SPACES.contains(c))
        .collect();
    RE_DOLLAR_RUN.replace_all(&stripped, "").into_owned()
}

/// Wrap `body` in `<otsl>` tags, adding the caption on its recorded side.
///
/// The caption is skipped when its text is empty or the body already has one.
pub fn attach_caption(body: &str, caption: Option<&RecordedCaption>) -> String {
    match caption {
        Some(c) if !c.text.is_empty() && !body.contains("<caption>") => {
            let tag = format!("<caption>{}</caption>", c.text.replace('\n', " "));
            if c.at_top {
                format!("<otsl>{tag}{body}</otsl>")
            } else {
                format!("<otsl>{body}{tag}</otsl>")
            }
        }
        _ => format!("<otsl>{body}</otsl>"),
    }
}

/// Drop rows made only of `<ecel>` that follow a caption, a row end or the
/// opening tag. Single non-overlapping pass.
pub fn clean_empty_cell_rows(otsl: &str) -> String {
    RE_EMPTY_CELL_ROW.replace_all(otsl, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_block_across_lines() {
        let doctags = "<doctag><otsl><fcel>a\n<nl></otsl><otsl>second</otsl></doctag>";
        assert_eq!(extract_otsl_body(doctags), Some("<fcel>a\n<nl>"));
        assert_eq!(extract_otsl_body("<doctag><text>x</text></doctag>"), None);
    }

    #[test]
    fn cleans_artifacts() {
        let body = "<fcel><text>1\u{2009}000</text>\n<fcel>$$x$$<fcel>$$$<nl>";
        assert_eq!(clean_otsl_body(body), "<fcel>1000<fcel>x<fcel><nl>");
    }

    #[test]
    fn single_dollars_survive() {
        assert_eq!(clean_otsl_body("<fcel>$^{2}$<nl>"), "<fcel>$^{2}$<nl>");
    }

    #[test]
    fn caption_goes_on_recorded_side() {
        let top = RecordedCaption {
            text: "Table 1".into(),
            at_top: true,
        };
        let bottom = RecordedCaption {
            at_top: false,
            ..top.clone()
        };
        assert_eq!(
            attach_caption("<fcel>a<nl>", Some(&top)),
            "<otsl><caption>Table 1</caption><fcel>a<nl></otsl>"
        );
        assert_eq!(
            attach_caption("<fcel>a<nl>", Some(&bottom)),
            "<otsl><fcel>a<nl><caption>Table 1</caption></otsl>"
        );
    }

    #[test]
    fn caption_skipped_when_empty_present_or_missing() {
        let empty = RecordedCaption::default();
        assert_eq!(attach_caption("<fcel>a", Some(&empty)), "<otsl><fcel>a</otsl>");
        let cap = RecordedCaption {
            text: "T".into(),
            at_top: true,
        };
        assert_eq!(
            attach_caption("<caption>x</caption><fcel>a", Some(&cap)),
            "<otsl><caption>x</caption><fcel>a</otsl>"
        );
        assert_eq!(attach_caption("<fcel>a", None), "<otsl><fcel>a</otsl>");
    }

    #[test]
    fn degenerate_row_after_caption_is_dropped() {
        assert_eq!(
            clean_empty_cell_rows(
                "<otsl><caption>T</caption><ecel><ecel><nl><fcel>a<fcel>b<nl></otsl>"
            ),
            "<otsl><caption>T</caption><fcel>a<fcel>b<nl></otsl>"
        );
    }

    #[test]
    fn rows_with_content_are_kept() {
        let otsl = "<otsl><ecel><fcel>a<nl><fcel>b<ecel><nl></otsl>";
        assert_eq!(clean_empty_cell_rows(otsl), otsl);
    }

    #[test]
    fn consecutive_empty_rows_need_another_pass() {
        // The first match consumes the `<nl>` the second row would anchor on.
        let otsl = "<otsl><ecel><nl><ecel><nl><fcel>a<nl></otsl>";
        assert_eq!(
            clean_empty_cell_rows(otsl),
            "<otsl><ecel><nl><fcel>a<nl></otsl>"
        );
    }
}
