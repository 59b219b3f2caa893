//! Python bridge run by [`crate::otsl::structurer::DoclingStructurer`].
//!
//! Invoked as `python -c BRIDGE_SCRIPT path <file>` or
//! `python -c BRIDGE_SCRIPT bytes <mime>` with the document on stdin.
//! Prints a JSON array holding the doctags export of every table, in
//! document order.

/// Script body passed to the interpreter with `-c`.
pub const BRIDGE_SCRIPT: &str = r#"
import json
import sys
from io import BytesIO
from pathlib import Path

from docling.document_converter import DocumentConverter
from docling_core.types.doc import ContentLayer, TableItem


def load(conv, mode, arg):
    if mode == "path":
        return conv.convert(Path(arg))
    from docling.datamodel.base_models import DocumentStream
    name = "document.html" if "html" in arg else "document"
    data = sys.stdin.buffer.read()
    return conv.convert(DocumentStream(name=name, stream=BytesIO(data)))


def main():
    mode, arg = sys.argv[1], sys.argv[2]
    result = load(DocumentConverter(), mode, arg)
    doc = getattr(result, "document", result)
    tables = []
    for node, _ in doc.iterate_items(
        with_groups=False,
        traverse_pictures=False,
        page_no=None,
        included_content_layers={ContentLayer.BODY, ContentLayer.FURNITURE},
    ):
        if isinstance(node, TableItem):
            try:
                tables.append(node.export_to_doctags(doc, add_location=False))
            except TypeError:
                tables.append(node.export_to_doctags(doc))
    json.dump(tables, sys.stdout)


main()
"#;
