//! HTML normalisation ahead of structure recognition.
//!
//! The structure recogniser handles plain cell text and a single body best,
//! so table markup is reshaped first:
//!
//! 1. Inline formatting inside `<td>`/`<th>` becomes text, with superscripts,
//!    subscripts and math spans rewritten as inline LaTeX.
//! 2. Each table's caption is recorded with the side it sits on, because the
//!    recogniser drops captions.
//! 3. `<thead>` rows move to the front of the body and `<tfoot>` rows to its
//!    end; the emptied sections are removed.

use crate::error::PrepError;
use crate::html::{self, HtmlFragment};
use markup5ever_rcdom::Handle;
use tracing::debug;

/// Span classes that mark inline math.
const MATH_CLASSES: [&str; 3] = ["math", "formula", "equation"];

/// Elements that open the data part of a table.
const ROW_BEARING: [&str; 4] = ["thead", "tbody", "tfoot", "tr"];

/// Caption text of one table and whether it belongs above the rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCaption {
    /// Empty when the table has no caption.
    pub text: String,
    pub at_top: bool,
}

impl Default for RecordedCaption {
    fn default() -> Self {
        Self {
            text: String::new(),
            at_top: true,
        }
    }
}

/// Normalised markup plus one recorded caption per table, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDocument {
    pub html: String,
    pub captions: Vec<RecordedCaption>,
}

/// Rewrite inline formatting inside every table cell.
pub fn normalize_inline_formatting(doc: &HtmlFragment) {
    for cell in doc.find_all(&["td", "th"]) {
        rewrite_formatting(&cell);
    }
}

// Children first, so a parent's text already contains its children's markup.
fn rewrite_formatting(node: &Handle) {
    let children: Vec<Handle> = node.children.borrow().iter().cloned().collect();
    for child in children.iter().filter(|c| html::tag_name(c).is_some()) {
        rewrite_formatting(child);
    }

    let Some(tag) = html::tag_name(node) else {
        return;
    };
    let replacement = match tag {
        "sup" => format!("$^{{{}}}$", html::text_content(node)),
        "sub" => format!("$_{{{}}}$", html::text_content(node)),
        "em" | "i" | "b" | "strong" => html::text_content(node),
        "span"
            if html::class_list(node)
                .iter()
                .any(|c| MATH_CLASSES.contains(&c.as_str())) =>
        {
            format!("${}$", html::text_content(node))
        }
        _ => return,
    };
    html::replace_with_text(node, &replacement);
}

/// Caption of `table`: trimmed text fragments joined without separator.
pub fn record_caption(table: &Handle) -> RecordedCaption {
    let Some(caption) = html::find_first(table, &["caption"]) else {
        return RecordedCaption::default();
    };
    let text: String = html::text_fragments(&caption)
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    // Document order: the caption is on top when it comes before the first
    // row-bearing element.
    let order = html::descendants(table);
    let caption_at = html::index_of(&order, &caption);
    let data_at = order
        .iter()
        .position(|n| html::tag_name(n).is_some_and(|t| ROW_BEARING.contains(&t)));
    let at_top = match (caption_at, data_at) {
        (Some(c), Some(d)) => c < d,
        _ => true,
    };
    RecordedCaption { text, at_top }
}

/// Record the caption of every table in `doc`.
pub fn record_captions(doc: &HtmlFragment) -> Vec<RecordedCaption> {
    doc.find_all(&["table"]).iter().map(record_caption).collect()
}

/// Fold `<thead>` and `<tfoot>` rows into the table's first `<tbody>`.
pub fn fold_sections(table: &Handle) {
    let body = match html::find_first(table, &["tbody"]) {
        Some(body) => body,
        None => {
            let body = html::new_element("tbody");
            html::append_child(table, &body);
            body
        }
    };

    if let Some(head) = html::find_first(table, &["thead"]) {
        let rows = direct_rows(&head);
        for (i, row) in rows.iter().enumerate() {
            html::insert_child(&body, i, row);
        }
        html::detach(&head);
        debug!("Folded {} header rows into the body", rows.len());
    }

    if let Some(foot) = html::find_first(table, &["tfoot"]) {
        let rows = direct_rows(&foot);
        for row in &rows {
            html::append_child(&body, row);
        }
        html::detach(&foot);
        debug!("Folded {} footer rows into the body", rows.len());
    }
}

fn direct_rows(section: &Handle) -> Vec<Handle> {
    html::element_children(section)
        .into_iter()
        .filter(|c| html::is_element(c, "tr"))
        .collect()
}

/// Run every normalisation step over `html_text`.
pub fn prepare_document(html_text: &str) -> Result<PreparedDocument, PrepError> {
    let doc = HtmlFragment::parse(html_text);
    normalize_inline_formatting(&doc);

    let mut captions = Vec::new();
    for table in doc.find_all(&["table"]) {
        captions.push(record_caption(&table));
        fold_sections(&table);
    }

    let html = doc
        .to_html()
        .map_err(|e| PrepError::Internal(format!("serialising normalised HTML: {e}")))?;
    Ok(PreparedDocument { html, captions })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(html_text: &str) -> String {
        let doc = HtmlFragment::parse(html_text);
        normalize_inline_formatting(&doc);
        doc.to_html().unwrap()
    }

    #[test]
    fn sup_and_sub_become_inline_math() {
        assert_eq!(
            normalized("<table><tr><td>x<sup>2</sup>y<sub>i</sub></td></tr></table>"),
            "<table><tbody><tr><td>x$^{2}$y$_{i}$</td></tr></tbody></table>"
        );
    }

    #[test]
    fn emphasis_is_flattened_and_math_span_wrapped() {
        assert_eq!(
            normalized(
                r#"<table><tr><td><b>R</b><em>e</em> <span class="math">a+b</span> <span class="x">k</span></td></tr></table>"#
            ),
            r#"<table><tbody><tr><td>Re $a+b$ <span class="x">k</span></td></tr></tbody></table>"#
        );
    }

    #[test]
    fn nested_formatting_resolves_inside_out() {
        assert_eq!(
            normalized("<table><tr><th><b>x<sup>2</sup></b></th></tr></table>"),
            "<table><tbody><tr><th>x$^{2}$</th></tr></tbody></table>"
        );
    }

    #[test]
    fn formatting_outside_cells_is_kept() {
        assert_eq!(normalized("<p><b>bold</b></p>"), "<p><b>bold</b></p>");
    }

    #[test]
    fn caption_text_is_trimmed_and_joined() {
        let doc = HtmlFragment::parse(
            "<table><caption> Table 1: <b>Main</b>\n results </caption><tr><td>a</td></tr></table>",
        );
        let captions = record_captions(&doc);
        assert_eq!(
            captions,
            vec![RecordedCaption {
                text: "Table 1:Mainresults".into(),
                at_top: true,
            }]
        );
    }

    #[test]
    fn trailing_caption_is_recorded_at_bottom() {
        let doc = HtmlFragment::parse("<table><tr><td>a</td></tr><caption>Cap</caption></table>");
        let captions = record_captions(&doc);
        assert_eq!(captions[0].text, "Cap");
        assert!(!captions[0].at_top);
    }

    #[test]
    fn table_without_caption_defaults_to_top() {
        let doc = HtmlFragment::parse("<table><tr><td>a</td></tr></table>");
        assert_eq!(record_captions(&doc), vec![RecordedCaption::default()]);
    }

    #[test]
    fn head_and_foot_rows_fold_into_body_in_order() {
        let prepared = prepare_document(
            "<table><thead><tr><td>h1</td></tr><tr><td>h2</td></tr></thead>\
             <tbody><tr><td>b</td></tr></tbody>\
             <tfoot><tr><td>f</td></tr></tfoot></table>",
        )
        .unwrap();
        assert_eq!(
            prepared.html,
            "<table><tbody><tr><td>h1</td></tr><tr><td>h2</td></tr>\
             <tr><td>b</td></tr><tr><td>f</td></tr></tbody></table>"
        );
    }

    #[test]
    fn body_is_created_when_only_a_head_exists() {
        let prepared =
            prepare_document("<table><thead><tr><th>h</th></tr></thead></table>").unwrap();
        assert_eq!(
            prepared.html,
            "<table><tbody><tr><th>h</th></tr></tbody></table>"
        );
    }
}
