//! Small mutable-DOM toolkit over html5ever's reference tree.
//!
//! Table files are fragments (`<table>…</table>`), not full documents, so
//! they are parsed in fragment mode with a `<body>` context and serialised
//! back without any `<html>`/`<body>` wrapper.
//!
//! The html5ever tree builder applies HTML5 table rules: bare `<tr>` rows
//! directly under `<table>` get an implicit `<tbody>`, and stray text inside
//! a table is moved in front of it.

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_fragment, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

fn html_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(local))
}

/// A parsed HTML fragment that can be queried, rewritten and serialised.
pub struct HtmlFragment {
    // Dropping an rcdom node empties its whole subtree, so the document has
    // to outlive every handle handed out below.
    _dom: RcDom,
    root: Handle,
}

impl HtmlFragment {
    /// Parse `html` as the content of a `<body>` element.
    pub fn parse(html: &str) -> Self {
        let dom: RcDom = parse_fragment(RcDom::default(), Default::default(), html_name("body"), Vec::new())
            .one(html);
        // Fragment parsing wraps the parsed nodes in a synthetic <html> element.
        let root = dom
            .document
            .children
            .borrow()
            .first()
            .cloned()
            .unwrap_or_else(|| dom.document.clone());
        Self { _dom: dom, root }
    }

    /// The synthetic container whose children are the fragment's top-level nodes.
    pub fn root(&self) -> &Handle {
        &self.root
    }

    /// All elements named one of `tags`, in document order.
    pub fn find_all(&self, tags: &[&str]) -> Vec<Handle> {
        find_all(&self.root, tags)
    }

    /// First element named one of `tags`, in document order.
    pub fn find_first(&self, tags: &[&str]) -> Option<Handle> {
        find_first(&self.root, tags)
    }

    /// Serialise the fragment back to markup.
    pub fn to_html(&self) -> io::Result<String> {
        let mut out = Vec::new();
        let handle: SerializableHandle = self.root.clone().into();
        serialize(
            &mut out,
            &handle,
            SerializeOpts {
                traversal_scope: TraversalScope::ChildrenOnly(None),
                ..Default::default()
            },
        )?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

/// Local name of an element, `None` for text, comments and the like.
pub fn tag_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

pub fn is_element(node: &Handle, tag: &str) -> bool {
    tag_name(node) == Some(tag)
}

/// Every node below `node` in document (pre-)order, `node` itself excluded.
pub fn descendants(node: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    collect_descendants(node, &mut out);
    out
}

fn collect_descendants(node: &Handle, out: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        out.push(child.clone());
        collect_descendants(child, out);
    }
}

pub fn find_all(node: &Handle, tags: &[&str]) -> Vec<Handle> {
    descendants(node)
        .into_iter()
        .filter(|n| tag_name(n).is_some_and(|t| tags.contains(&t)))
        .collect()
}

pub fn find_first(node: &Handle, tags: &[&str]) -> Option<Handle> {
    find_all(node, tags).into_iter().next()
}

/// Direct children that are elements.
pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|c| tag_name(c).is_some())
        .cloned()
        .collect()
}

/// Position of `target` among `nodes`, compared by identity.
pub fn index_of(nodes: &[Handle], target: &Handle) -> Option<usize> {
    nodes.iter().position(|n| Rc::ptr_eq(n, target))
}

/// Every text node below `node`, in document order.
pub fn text_fragments(node: &Handle) -> Vec<String> {
    descendants(node)
        .iter()
        .filter_map(|n| match &n.data {
            NodeData::Text { contents } => Some(contents.borrow().to_string()),
            _ => None,
        })
        .collect()
}

/// Concatenated text content of `node`.
pub fn text_content(node: &Handle) -> String {
    if let NodeData::Text { contents } = &node.data {
        return contents.borrow().to_string();
    }
    text_fragments(node).concat()
}

/// Whitespace-separated values of the `class` attribute.
pub fn class_list(node: &Handle) -> Vec<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .filter(|a| &*a.name.local == "class")
            .flat_map(|a| {
                a.value
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Create a detached, attribute-less element.
pub fn new_element(tag: &str) -> Handle {
    Node::new(NodeData::Element {
        name: html_name(tag),
        attrs: RefCell::new(Vec::new()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// Create a detached text node.
pub fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    })
}

fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take()?;
    let parent = weak.upgrade();
    node.parent.set(Some(weak));
    parent
}

/// Remove `node` from its parent. No-op for detached nodes.
pub fn detach(node: &Handle) {
    if let Some(parent) = node.parent.take().and_then(|weak| weak.upgrade()) {
        parent.children.borrow_mut().retain(|c| !Rc::ptr_eq(c, node));
    }
}

/// Move `child` to the end of `parent`'s children.
pub fn append_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

/// Move `child` to position `index` of `parent`'s children (clamped).
pub fn insert_child(parent: &Handle, index: usize, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    let mut children = parent.children.borrow_mut();
    let index = index.min(children.len());
    children.insert(index, child.clone());
}

/// Replace `node` in its parent with a text node holding `text`.
pub fn replace_with_text(node: &Handle, text: &str) {
    let Some(parent) = parent_of(node) else {
        return;
    };
    let replacement = new_text(text);
    let position = index_of(&parent.children.borrow(), node);
    if let Some(position) = position {
        replacement.parent.set(Some(Rc::downgrade(&parent)));
        parent.children.borrow_mut()[position] = replacement;
        node.parent.set(None);
    }
}
