//! Selection ranges over text nodes.
//!
//! Both boundaries sit inside text nodes and offsets count characters, which
//! covers the selections the translator ever stores. Deleting a range returns
//! a [`DeletedContents`] record that puts every removed node and truncated
//! value back.

use super::{
    child_index, insert_child, is_ancestor, is_text, node_text, parent_of, preorder,
    remove_from_parent, root_of, set_node_text, Document,
};
use crate::error::RangeError;
use markup5ever_rcdom::Handle;
use std::rc::Rc;

#[derive(Clone)]
pub struct Boundary {
    pub node: Handle,
    pub offset: usize,
}

impl std::fmt::Debug for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Boundary")
            .field("text", &node_text(&self.node))
            .field("offset", &self.offset)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct SelectionRange {
    start: Boundary,
    end: Boundary,
}

impl SelectionRange {
    pub fn new(
        start_node: Handle,
        start_offset: usize,
        end_node: Handle,
        end_offset: usize,
    ) -> Result<Self, RangeError> {
        let range = Self {
            start: Boundary {
                node: start_node,
                offset: start_offset,
            },
            end: Boundary {
                node: end_node,
                offset: end_offset,
            },
        };
        range.validate()?;
        Ok(range)
    }

    /// Range covering the whole value of one text node.
    pub fn select_node_contents(node: &Handle) -> Result<Self, RangeError> {
        let len = node_text(node).ok_or(RangeError::NotText)?.chars().count();
        Self::new(node.clone(), 0, node.clone(), len)
    }

    /// Range over the first occurrence of `needle` inside a single text node.
    pub fn select_text(doc: &Document, needle: &str) -> Option<Self> {
        let node = doc.find_text(needle)?;
        let value = node_text(&node)?;
        let byte_start = value.find(needle)?;
        let start = value[..byte_start].chars().count();
        let end = start + needle.chars().count();
        Self::new(node.clone(), start, node, end).ok()
    }

    pub fn start(&self) -> &Boundary {
        &self.start
    }

    pub fn end(&self) -> &Boundary {
        &self.end
    }

    /// Checks that the range still describes live content.
    pub fn validate(&self) -> Result<(), RangeError> {
        for boundary in [&self.start, &self.end] {
            let value = node_text(&boundary.node).ok_or(RangeError::NotText)?;
            if parent_of(&boundary.node).is_none() {
                return Err(RangeError::Detached);
            }
            let len = value.chars().count();
            if boundary.offset > len {
                return Err(RangeError::OffsetOutOfBounds {
                    offset: boundary.offset,
                    len,
                });
            }
        }
        let root = root_of(&self.start.node);
        if !Rc::ptr_eq(&root, &root_of(&self.end.node)) {
            return Err(RangeError::ForeignDocument);
        }
        if Rc::ptr_eq(&self.start.node, &self.end.node) {
            if self.start.offset > self.end.offset {
                return Err(RangeError::Inverted);
            }
            return Ok(());
        }
        let order = preorder(&root);
        let position = |node: &Handle| order.iter().position(|n| Rc::ptr_eq(n, node));
        match (position(&self.start.node), position(&self.end.node)) {
            (Some(s), Some(e)) if s < e => Ok(()),
            (Some(_), Some(_)) => Err(RangeError::Inverted),
            _ => Err(RangeError::Detached),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        Rc::ptr_eq(&self.start.node, &self.end.node) && self.start.offset == self.end.offset
    }

    /// Text nodes from the start boundary to the end boundary, inclusive.
    pub fn text_nodes(&self) -> Vec<Handle> {
        let order = preorder(&root_of(&self.start.node));
        let mut out = Vec::new();
        let mut inside = false;
        for node in order {
            if Rc::ptr_eq(&node, &self.start.node) {
                inside = true;
            }
            if inside && is_text(&node) {
                out.push(node.clone());
            }
            if Rc::ptr_eq(&node, &self.end.node) {
                break;
            }
        }
        out
    }

    /// The selected string, including any surrounding whitespace.
    pub fn text(&self) -> String {
        let nodes = self.text_nodes();
        let last = nodes.len().saturating_sub(1);
        let mut out = String::new();
        for (i, node) in nodes.iter().enumerate() {
            let value = node_text(node).unwrap_or_default();
            let chars = value.chars();
            let from = if i == 0 { self.start.offset } else { 0 };
            if i == last {
                let to = self.end.offset;
                out.extend(chars.skip(from).take(to.saturating_sub(from)));
            } else {
                out.extend(chars.skip(from));
            }
        }
        out
    }

    /// True when a text node inside `node` (or `node` itself) is part of the range.
    pub fn intersects(&self, node: &Handle) -> bool {
        let selected = self.text_nodes();
        if is_ancestor(node, &self.start.node) || is_ancestor(node, &self.end.node) {
            return true;
        }
        preorder(node)
            .iter()
            .any(|n| selected.iter().any(|s| Rc::ptr_eq(s, n)))
    }

    /// Start and end sit in different nodes or under different parents.
    pub fn spans_multiple_elements(&self) -> bool {
        if !Rc::ptr_eq(&self.start.node, &self.end.node) {
            return true;
        }
        match (parent_of(&self.start.node), parent_of(&self.end.node)) {
            (Some(a), Some(b)) => !Rc::ptr_eq(&a, &b),
            _ => true,
        }
    }

    /// Remove the selected content from the tree.
    ///
    /// Nodes wholly inside the range are detached, the boundary text nodes are
    /// truncated, and a selection inside one node splits off the tail into a
    /// new sibling so replacement content lands between the two halves.
    pub fn delete_contents(&self) -> Result<DeletedContents, RangeError> {
        self.validate()?;
        let start_value = node_text(&self.start.node).unwrap_or_default();

        if Rc::ptr_eq(&self.start.node, &self.end.node) {
            let head: String = start_value.chars().take(self.start.offset).collect();
            let tail: String = start_value.chars().skip(self.end.offset).collect();
            set_node_text(&self.start.node, &head);
            let tail_node = if tail.is_empty() {
                None
            } else {
                let node = super::create_text(&tail);
                insert_after(&self.start.node, node.clone());
                Some(node)
            };
            return Ok(DeletedContents {
                start_node: self.start.node.clone(),
                start_value,
                end: None,
                removed: Vec::new(),
                tail_node,
            });
        }

        let end_value = node_text(&self.end.node).unwrap_or_default();
        let order = preorder(&root_of(&self.start.node));
        let s = order
            .iter()
            .position(|n| Rc::ptr_eq(n, &self.start.node))
            .ok_or(RangeError::Detached)?;
        let e = order
            .iter()
            .position(|n| Rc::ptr_eq(n, &self.end.node))
            .ok_or(RangeError::Detached)?;

        let contained: Vec<Handle> = order[s + 1..e]
            .iter()
            .filter(|n| !is_ancestor(n, &self.end.node))
            .cloned()
            .collect();
        let topmost: Vec<Handle> = contained
            .iter()
            .filter(|n| match parent_of(n) {
                Some(p) => !contained.iter().any(|c| Rc::ptr_eq(c, &p)),
                None => true,
            })
            .cloned()
            .collect();

        let mut removed = Vec::with_capacity(topmost.len());
        for node in topmost {
            if let Some((parent, index)) = remove_from_parent(&node) {
                removed.push(RemovedNode {
                    node,
                    parent,
                    index,
                });
            }
        }

        let head: String = start_value.chars().take(self.start.offset).collect();
        let tail: String = end_value.chars().skip(self.end.offset).collect();
        set_node_text(&self.start.node, &head);
        set_node_text(&self.end.node, &tail);

        Ok(DeletedContents {
            start_node: self.start.node.clone(),
            start_value,
            end: Some((self.end.node.clone(), end_value)),
            removed,
            tail_node: None,
        })
    }
}

struct RemovedNode {
    node: Handle,
    parent: Handle,
    index: usize,
}

/// Undo record for [`SelectionRange::delete_contents`].
pub struct DeletedContents {
    start_node: Handle,
    start_value: String,
    end: Option<(Handle, String)>,
    removed: Vec<RemovedNode>,
    tail_node: Option<Handle>,
}

impl DeletedContents {
    /// Parent and child index where replacement content belongs.
    pub fn insertion_point(&self) -> Option<(Handle, usize)> {
        let parent = parent_of(&self.start_node)?;
        let index = child_index(&self.start_node)?;
        Some((parent, index + 1))
    }

    /// Put the deleted content back. Replacement nodes must already be gone.
    pub fn undo(&self) {
        if let Some(tail) = &self.tail_node {
            remove_from_parent(tail);
        }
        for removed in self.removed.iter().rev() {
            insert_child(&removed.parent, removed.index, removed.node.clone());
        }
        set_node_text(&self.start_node, &self.start_value);
        if let Some((node, value)) = &self.end {
            set_node_text(node, value);
        }
    }
}

impl std::fmt::Debug for DeletedContents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletedContents")
            .field("start_value", &self.start_value)
            .field("removed", &self.removed.len())
            .finish()
    }
}

fn insert_after(reference: &Handle, node: Handle) {
    if let (Some(parent), Some(index)) = (parent_of(reference), child_index(reference)) {
        insert_child(&parent, index + 1, node);
    }
}
