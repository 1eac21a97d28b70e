//! Text discovery.
//!
//! Walks a document (or a selection) and yields translatable units in
//! document order: visible text nodes and a fixed set of accessibility
//! attributes. Unit ids are handed out lazily by a [`UnitRegistry`] and stay
//! attached to the node for as long as it lives.

use crate::dom::{self, SelectionRange};
use markup5ever_rcdom::{Handle, Node};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Attributes translated alongside text, in discovery order.
pub const TRANSLATABLE_ATTRIBUTES: [&str; 6] = [
    "aria-label",
    "aria-labelledby",
    "aria-describedby",
    "aria-placeholder",
    "title",
    "alt",
];

/// Elements whose text is never translated.
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitId {
    Text(u64),
    Attribute { element: u64, attribute: String },
    Selection(u64),
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitId::Text(id) => write!(f, "text-{}", id),
            UnitId::Attribute { element, attribute } => write!(f, "attr-{}-{}", element, attribute),
            UnitId::Selection(id) => write!(f, "selection-{}", id),
        }
    }
}

/// Stable ids for DOM nodes.
///
/// Keyed by node address; the stored weak reference guards against an
/// address being reused by a new node after the old one was dropped.
#[derive(Default)]
pub struct UnitRegistry {
    ids: HashMap<*const Node, (Weak<Node>, u64)>,
    next: u64,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `node`, assigned on first request.
    pub fn id_for(&mut self, node: &Handle) -> u64 {
        let key = Rc::as_ptr(node);
        if let Some((weak, id)) = self.ids.get(&key) {
            if weak.upgrade().is_some_and(|n| Rc::ptr_eq(&n, node)) {
                return *id;
            }
        }
        self.next += 1;
        self.ids.insert(key, (Rc::downgrade(node), self.next));
        self.next
    }

    /// Fresh id for a selection operation.
    pub fn next_selection_id(&mut self) -> UnitId {
        self.next += 1;
        UnitId::Selection(self.next)
    }

    /// Drop entries whose nodes are gone.
    pub fn prune(&mut self) {
        self.ids.retain(|_, (weak, _)| weak.strong_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl std::fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("ids", &self.ids.len())
            .field("next", &self.next)
            .finish()
    }
}

#[derive(Clone)]
pub struct TextUnit {
    pub id: UnitId,
    pub node: Handle,
    /// Node value at discovery time, trimmed.
    pub original_text: String,
}

#[derive(Clone)]
pub struct AttributeUnit {
    pub id: UnitId,
    pub element: Handle,
    pub attribute: String,
    /// Raw attribute value at discovery time.
    pub original_value: String,
}

impl AttributeUnit {
    /// The text sent for translation.
    pub fn text(&self) -> &str {
        self.original_value.trim()
    }
}

#[derive(Clone)]
pub enum TranslationUnit {
    Text(TextUnit),
    Attribute(AttributeUnit),
}

impl TranslationUnit {
    pub fn id(&self) -> &UnitId {
        match self {
            TranslationUnit::Text(u) => &u.id,
            TranslationUnit::Attribute(u) => &u.id,
        }
    }

    pub fn source_text(&self) -> &str {
        match self {
            TranslationUnit::Text(u) => &u.original_text,
            TranslationUnit::Attribute(u) => u.text(),
        }
    }
}

impl std::fmt::Debug for TranslationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationUnit")
            .field("id", self.id())
            .field("text", &self.source_text())
            .finish()
    }
}

/// Visible text nodes under `root`, in document order.
pub fn discover_text_units(root: &Handle, registry: &mut UnitRegistry) -> Vec<TextUnit> {
    dom::preorder(root)
        .into_iter()
        .filter_map(|node| text_unit(node, registry))
        .collect()
}

/// Recognized attributes with non-blank values under `root`.
///
/// One pass per attribute in [`TRANSLATABLE_ATTRIBUTES`] order; each pass is
/// in document order.
pub fn discover_attribute_units(root: &Handle, registry: &mut UnitRegistry) -> Vec<AttributeUnit> {
    let elements: Vec<Handle> = dom::preorder(root)
        .into_iter()
        .filter(|n| dom::element_name(n).is_some())
        .collect();

    let mut units = Vec::new();
    for attribute in TRANSLATABLE_ATTRIBUTES {
        for element in &elements {
            let Some(value) = dom::get_attr(element, attribute) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }
            units.push(AttributeUnit {
                id: UnitId::Attribute {
                    element: registry.id_for(element),
                    attribute: attribute.to_string(),
                },
                element: element.clone(),
                attribute: attribute.to_string(),
                original_value: value,
            });
        }
    }
    units
}

/// Visible text nodes touched by `range`.
pub fn discover_units_in_selection(
    range: &SelectionRange,
    registry: &mut UnitRegistry,
) -> Vec<TextUnit> {
    range
        .text_nodes()
        .into_iter()
        .filter_map(|node| text_unit(node, registry))
        .collect()
}

fn text_unit(node: Handle, registry: &mut UnitRegistry) -> Option<TextUnit> {
    let value = dom::node_text(&node)?;
    let trimmed = value.trim();
    if trimmed.is_empty() || is_excluded(&node) {
        return None;
    }
    Some(TextUnit {
        id: UnitId::Text(registry.id_for(&node)),
        original_text: trimmed.to_string(),
        node,
    })
}

/// Inside a skipped element, or hidden by an ancestor.
pub fn is_excluded(node: &Handle) -> bool {
    let chain = dom::ancestors(node);
    let mut visibility_decided = false;
    for ancestor in chain.iter().skip(1) {
        let Some(tag) = dom::element_name(ancestor) else {
            continue;
        };
        if SKIPPED_ELEMENTS.iter().any(|s| tag.eq_ignore_ascii_case(s)) {
            return true;
        }
        if dom::has_attr(ancestor, "hidden") {
            return true;
        }
        let style = dom::get_attr(ancestor, "style").unwrap_or_default();
        let declarations = parse_inline_style(&style);
        if declarations.iter().any(|(p, v)| p == "display" && v == "none") {
            return true;
        }
        // visibility inherits: the nearest declaration wins
        if !visibility_decided {
            if let Some((_, v)) = declarations.iter().rev().find(|(p, _)| p == "visibility") {
                visibility_decided = true;
                if v == "hidden" || v == "collapse" {
                    return true;
                }
            }
        }
    }
    false
}

fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let value = value.trim().trim_end_matches("!important").trim();
            Some((prop.trim().to_lowercase(), value.to_lowercase()))
        })
        .collect()
}
