//! Document model over an `html5ever` reference-counted tree.
//!
//! Nodes are shared [`Handle`]s; every helper here works on handles so the
//! discovery, mutation and range code can hold on to individual nodes across
//! suspension points without borrowing the whole document.

pub mod range;

use html5ever::interface::{Attribute, QualName};
use html5ever::serialize::{SerializeOpts, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{LocalName, namespace_url, ns, parse_document};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use std::rc::Rc;

pub use range::{Boundary, DeletedContents, SelectionRange};

/// A parsed page (or iframe) document.
#[derive(Clone)]
pub struct Document {
    root: Handle,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        Self { root: dom.document }
    }

    pub fn root(&self) -> &Handle {
        &self.root
    }

    /// `<html>` element, when present.
    pub fn document_element(&self) -> Option<Handle> {
        self.root
            .children
            .borrow()
            .iter()
            .find(|c| is_element(c, "html"))
            .cloned()
    }

    /// `<body>`, falling back to the document root.
    pub fn body(&self) -> Handle {
        self.find_elements("body")
            .into_iter()
            .next()
            .unwrap_or_else(|| self.root.clone())
    }

    pub fn find_elements(&self, tag: &str) -> Vec<Handle> {
        preorder(&self.root)
            .into_iter()
            .filter(|n| is_element(n, tag))
            .collect()
    }

    /// True when `node` is attached somewhere below this document's root.
    pub fn contains(&self, node: &Handle) -> bool {
        Rc::ptr_eq(&root_of(node), &self.root)
    }

    /// First text node under `<body>` whose value contains `needle`.
    pub fn find_text(&self, needle: &str) -> Option<Handle> {
        preorder(&self.body())
            .into_iter()
            .find(|n| node_text(n).is_some_and(|t| t.contains(needle)))
    }

    /// Values of every non-whitespace text node under `<body>`, trimmed.
    pub fn visible_texts(&self) -> Vec<String> {
        preorder(&self.body())
            .iter()
            .filter_map(node_text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn to_html(&self) -> String {
        let mut buf: Vec<u8> = Vec::new();
        if let Err(e) = serialize(
            &mut buf,
            &SerializableHandle::from(self.root.clone()),
            SerializeOpts::default(),
        ) {
            tracing::warn!(error = %e, "failed to serialize document");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &preorder(&self.root).len())
            .finish()
    }
}

pub fn element_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn is_element(node: &Handle, tag: &str) -> bool {
    match &node.data {
        NodeData::Element { name, .. } => name.local.as_ref().eq_ignore_ascii_case(tag),
        _ => false,
    }
}

pub fn is_text(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

/// Value of a text node; `None` for anything else.
pub fn node_text(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

pub fn set_node_text(node: &Handle, value: &str) {
    if let NodeData::Text { contents } = &node.data {
        *contents.borrow_mut() = StrTendril::from_slice(value);
    }
}

/// Concatenated text of every descendant text node.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    for n in preorder(node) {
        if let NodeData::Text { contents } = &n.data {
            out.push_str(&contents.borrow());
        }
    }
    out
}

pub fn get_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attr_name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn has_attr(node: &Handle, attr_name: &str) -> bool {
    get_attr(node, attr_name).is_some()
}

pub fn set_attr(node: &Handle, attr_name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| &*a.name.local == attr_name) {
            Some(existing) => existing.value = StrTendril::from_slice(value),
            None => attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                value: StrTendril::from_slice(value),
            }),
        }
    }
}

pub fn remove_attr(node: &Handle, attr_name: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        attrs.borrow_mut().retain(|a| &*a.name.local != attr_name);
    }
}

pub fn create_text(value: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(value)),
    })
}

pub fn create_element(tag: &str, attributes: &[(&str, &str)]) -> Handle {
    let attrs = attributes
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: StrTendril::from_slice(value),
        })
        .collect();
    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

/// Position of `node` among its parent's children.
pub fn child_index(node: &Handle) -> Option<usize> {
    let parent = parent_of(node)?;
    let index = parent
        .children
        .borrow()
        .iter()
        .position(|c| Rc::ptr_eq(c, node));
    index
}

/// Insert `child` at `index` (clamped) under `parent`, detaching it first.
pub fn insert_child(parent: &Handle, index: usize, child: Handle) {
    remove_from_parent(&child);
    child.parent.set(Some(Rc::downgrade(parent)));
    let mut children = parent.children.borrow_mut();
    let index = index.min(children.len());
    children.insert(index, child);
}

pub fn append_child(parent: &Handle, child: Handle) {
    let len = parent.children.borrow().len();
    insert_child(parent, len, child);
}

/// Detach `node`, returning its former parent and index.
pub fn remove_from_parent(node: &Handle) -> Option<(Handle, usize)> {
    let parent = parent_of(node)?;
    let index = child_index(node)?;
    parent.children.borrow_mut().remove(index);
    node.parent.set(None);
    Some((parent, index))
}

/// Replace `old` with `new` in place.
pub fn replace_node(old: &Handle, new: Handle) -> bool {
    match remove_from_parent(old) {
        Some((parent, index)) => {
            insert_child(&parent, index, new);
            true
        }
        None => false,
    }
}

/// `node` and its descendants in document order.
pub fn preorder(node: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    let mut stack = vec![node.clone()];
    while let Some(n) = stack.pop() {
        for child in n.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
        out.push(n);
    }
    out
}

/// Chain from `node` up to the root, `node` first.
pub fn ancestors(node: &Handle) -> Vec<Handle> {
    let mut chain = vec![node.clone()];
    let mut current = node.clone();
    while let Some(parent) = parent_of(&current) {
        chain.push(parent.clone());
        current = parent;
    }
    chain
}

pub fn root_of(node: &Handle) -> Handle {
    ancestors(node)
        .pop()
        .unwrap_or_else(|| node.clone())
}

pub fn is_ancestor(ancestor: &Handle, node: &Handle) -> bool {
    ancestors(node)
        .iter()
        .skip(1)
        .any(|a| Rc::ptr_eq(a, ancestor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_body() {
        let doc = Document::parse("<html><body><p>Hello</p><p>World</p></body></html>");
        assert!(is_element(&doc.body(), "body"));
        assert!(is_element(&doc.body(), "BODY"));
        assert_eq!(doc.visible_texts(), vec!["Hello", "World"]);
    }

    #[test]
    fn test_attributes() {
        let doc = Document::parse("<p id=x title='Hi'>t</p>");
        let p = doc.find_elements("p").remove(0);
        assert_eq!(get_attr(&p, "title").as_deref(), Some("Hi"));
        set_attr(&p, "title", "Salut");
        set_attr(&p, "lang", "fr");
        assert_eq!(get_attr(&p, "title").as_deref(), Some("Salut"));
        assert_eq!(get_attr(&p, "lang").as_deref(), Some("fr"));
        remove_attr(&p, "lang");
        assert!(!has_attr(&p, "lang"));
    }

    #[test]
    fn test_parent_lookup_does_not_detach() {
        let doc = Document::parse("<p>Hello</p>");
        let text = doc.find_text("Hello").unwrap();
        assert!(parent_of(&text).is_some());
        assert!(parent_of(&text).is_some());
        assert!(doc.contains(&text));
    }

    #[test]
    fn test_insert_and_remove() {
        let doc = Document::parse("<p>a</p>");
        let p = doc.find_elements("p").remove(0);
        let span = create_element("span", &[("lang", "fr")]);
        append_child(&span, create_text("b"));
        append_child(&p, span.clone());
        assert_eq!(text_content(&p), "ab");
        assert_eq!(child_index(&span), Some(1));

        let (parent, index) = remove_from_parent(&span).unwrap();
        assert!(Rc::ptr_eq(&parent, &p));
        assert_eq!(index, 1);
        assert!(!doc.contains(&span));
        assert_eq!(text_content(&p), "a");
    }

    #[test]
    fn test_serialize_round_trip() {
        let doc = Document::parse("<html><head></head><body><p title=\"x\">Hi</p></body></html>");
        let html = doc.to_html();
        assert!(html.contains("<p title=\"x\">Hi</p>"));
    }

    #[test]
    fn test_preorder_is_document_order() {
        let doc = Document::parse("<div><p>1</p><p>2<b>3</b></p></div><p>4</p>");
        let texts: Vec<String> = preorder(doc.root()).iter().filter_map(node_text).collect();
        assert_eq!(texts, vec!["1", "2", "3", "4"]);
    }
}
