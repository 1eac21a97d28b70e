//! Mutation engine.
//!
//! Writes translations into the document and records what it changed so
//! [`MutationEngine::restore_all`] can undo it. Every text mutation keeps the
//! exact node value before and after the write; restore puts the old value
//! back when the node still holds what was written, and falls back to
//! replacing the translated substring only when the live value drifted.
//! Mutations are undone newest first.

use crate::discovery::{AttributeUnit, TextUnit, UnitId};
use crate::dom::{self, DeletedContents, SelectionRange};
use crate::error::RangeError;
use markup5ever_rcdom::{Handle, Node};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// Marks a wrapper element inserted around translated content.
pub const TRANSLATED_MARKER: &str = "data-pgtr-translated";

/// Marks a wrapper whose translation was requested by an iframe.
pub const FRAME_MARKER: &str = "data-pgtr-frame-translation";

/// Holds an element's `lang` value from before page translation (empty when
/// it had none).
pub const ORIGINAL_LANG_ATTR: &str = "data-pgtr-original-lang";

/// Elements that never receive a `lang` decoration.
const UNDECORATED_ELEMENTS: [&str; 5] = ["script", "style", "meta", "head", "html"];

/// How replacement content is marked up.
#[derive(Debug, Clone, Copy)]
pub struct Decoration<'a> {
    /// Target language code written to `lang`.
    pub lang: &'a str,
    /// Add [`FRAME_MARKER`] to a selection wrapper.
    pub from_frame: bool,
}

impl<'a> Decoration<'a> {
    pub fn new(lang: &'a str) -> Self {
        Self {
            lang,
            from_frame: false,
        }
    }

    pub fn from_frame(lang: &'a str) -> Self {
        Self {
            lang,
            from_frame: true,
        }
    }
}

enum AppliedMutation {
    Text {
        node: Weak<Node>,
        original: String,
        translated: String,
        before: String,
        after: String,
        seq: u64,
    },
    Attribute {
        element: Weak<Node>,
        attribute: String,
        original: String,
        translated: String,
        seq: u64,
    },
}

impl AppliedMutation {
    fn seq(&self) -> u64 {
        match self {
            AppliedMutation::Text { seq, .. } | AppliedMutation::Attribute { seq, .. } => *seq,
        }
    }

    fn translated(&self) -> &str {
        match self {
            AppliedMutation::Text { translated, .. }
            | AppliedMutation::Attribute { translated, .. } => translated,
        }
    }
}

struct SelectionRecord {
    id: UnitId,
    inserted: Vec<Handle>,
    deleted: DeletedContents,
    seq: u64,
}

/// Counts from one [`MutationEngine::restore_all`] run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub text_nodes: usize,
    pub attributes: usize,
    pub selections: usize,
    pub markers_stripped: usize,
    pub langs_reinstated: usize,
    /// Records that could not be inverted (node gone or content drifted).
    pub skipped: usize,
}

#[derive(Default)]
pub struct MutationEngine {
    originals: HashMap<UnitId, String>,
    applied: BTreeMap<UnitId, AppliedMutation>,
    selections: Vec<SelectionRecord>,
    seq: u64,
}

impl MutationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-translation content recorded for `id`.
    pub fn original_for(&self, id: &UnitId) -> Option<&str> {
        self.originals.get(id).map(|s| s.as_str())
    }

    /// Translation currently applied for `id`.
    pub fn translated_for(&self, id: &UnitId) -> Option<&str> {
        self.applied.get(id).map(|m| m.translated())
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len() + self.selections.len()
    }

    pub fn original_count(&self) -> usize {
        self.originals.len()
    }

    pub fn has_applied(&self) -> bool {
        self.applied_count() > 0
    }

    /// True when `unit`'s node still shows the value this engine wrote.
    pub fn is_live_translation(&self, unit: &TextUnit) -> bool {
        match self.applied.get(&unit.id) {
            Some(AppliedMutation::Text { node, after, .. }) => node.upgrade().is_some_and(|n| {
                Rc::ptr_eq(&n, &unit.node) && dom::node_text(&n).as_deref() == Some(after.as_str())
            }),
            _ => false,
        }
    }

    /// True when `unit`'s attribute still holds the value this engine wrote.
    pub fn is_live_attribute(&self, unit: &AttributeUnit) -> bool {
        match self.applied.get(&unit.id) {
            Some(AppliedMutation::Attribute { translated, .. }) => {
                dom::get_attr(&unit.element, &unit.attribute).as_deref() == Some(translated.as_str())
            }
            _ => false,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Write `translated` into a text node.
    ///
    /// When the node still trims to the discovered text its surrounding
    /// whitespace is kept; otherwise the first occurrence of the discovered
    /// text is replaced. Returns false when neither applies.
    pub fn apply_to_text_node(
        &mut self,
        unit: &TextUnit,
        translated: &str,
        decoration: Option<Decoration<'_>>,
    ) -> bool {
        let Some(raw) = dom::node_text(&unit.node) else {
            return false;
        };
        let trimmed = raw.trim();
        let updated = if trimmed == unit.original_text {
            let start = raw.len() - raw.trim_start().len();
            let end = start + trimmed.len();
            format!("{}{}{}", &raw[..start], translated, &raw[end..])
        } else if raw.contains(&unit.original_text) {
            raw.replacen(&unit.original_text, translated, 1)
        } else {
            warn!(unit = %unit.id, "text changed since discovery; skipping");
            return false;
        };

        self.originals
            .entry(unit.id.clone())
            .or_insert_with(|| unit.original_text.clone());
        let seq = self.next_seq();
        match self.applied.get_mut(&unit.id) {
            Some(AppliedMutation::Text {
                translated: t,
                after,
                seq: s,
                ..
            }) => {
                *t = translated.to_string();
                *after = updated.clone();
                *s = seq;
            }
            _ => {
                self.applied.insert(
                    unit.id.clone(),
                    AppliedMutation::Text {
                        node: Rc::downgrade(&unit.node),
                        original: unit.original_text.clone(),
                        translated: translated.to_string(),
                        before: raw.clone(),
                        after: updated.clone(),
                        seq,
                    },
                );
            }
        }
        dom::set_node_text(&unit.node, &updated);

        if let Some(decoration) = decoration {
            if translated != unit.original_text {
                mark_parent_lang(&unit.node, decoration.lang);
            }
        }
        true
    }

    /// Overwrite an attribute with `translated`.
    pub fn apply_to_attribute(&mut self, unit: &AttributeUnit, translated: &str) {
        self.originals
            .entry(unit.id.clone())
            .or_insert_with(|| unit.original_value.clone());
        let seq = self.next_seq();
        match self.applied.get_mut(&unit.id) {
            Some(AppliedMutation::Attribute {
                translated: t,
                seq: s,
                ..
            }) => {
                *t = translated.to_string();
                *s = seq;
            }
            _ => {
                self.applied.insert(
                    unit.id.clone(),
                    AppliedMutation::Attribute {
                        element: Rc::downgrade(&unit.element),
                        attribute: unit.attribute.clone(),
                        original: unit.original_value.clone(),
                        translated: translated.to_string(),
                        seq,
                    },
                );
            }
        }
        dom::set_attr(&unit.element, &unit.attribute, translated);
    }

    /// Replace the content of `range` with `translated`.
    ///
    /// Inserts `leading + translated + trailing` as one text node, or, when
    /// decorating a changed translation, the whitespace around a marker span.
    /// A range spanning several elements is flattened and its surrounding
    /// whitespace dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_to_selection_range(
        &mut self,
        id: UnitId,
        range: &SelectionRange,
        original_text: &str,
        translated: &str,
        leading: &str,
        trailing: &str,
        decoration: Option<Decoration<'_>>,
    ) -> Result<(), RangeError> {
        range.validate()?;
        let (leading, trailing) = if range.spans_multiple_elements() {
            debug!(unit = %id, "selection spans several elements; flattening");
            ("", "")
        } else {
            (leading, trailing)
        };

        let deleted = range.delete_contents()?;
        let Some((parent, index)) = deleted.insertion_point() else {
            deleted.undo();
            return Err(RangeError::Detached);
        };

        let mut inserted = Vec::new();
        match decoration {
            Some(decoration) if translated != original_text.trim() => {
                if !leading.is_empty() {
                    inserted.push(dom::create_text(leading));
                }
                let mut attrs = vec![("lang", decoration.lang), (TRANSLATED_MARKER, "true")];
                if decoration.from_frame {
                    attrs.push((FRAME_MARKER, "true"));
                }
                let span = dom::create_element("span", &attrs);
                dom::append_child(&span, dom::create_text(translated));
                inserted.push(span);
                if !trailing.is_empty() {
                    inserted.push(dom::create_text(trailing));
                }
            }
            _ => inserted.push(dom::create_text(&format!("{}{}{}", leading, translated, trailing))),
        }

        for (offset, node) in inserted.iter().enumerate() {
            dom::insert_child(&parent, index + offset, node.clone());
        }

        self.originals
            .entry(id.clone())
            .or_insert_with(|| original_text.to_string());
        let seq = self.next_seq();
        self.selections.push(SelectionRecord {
            id,
            inserted,
            deleted,
            seq,
        });
        Ok(())
    }

    /// Undo every recorded mutation under `root`.
    ///
    /// Afterwards any remaining marker wrapper is replaced by a plain text
    /// node and every decorated element gets its previous `lang` back. The
    /// applied records are always cleared; recorded originals only when
    /// `clear_originals` is set.
    pub fn restore_all(&mut self, root: &Handle, clear_originals: bool) -> RestoreReport {
        let mut report = RestoreReport::default();

        enum Pending {
            Applied(UnitId),
            Selection(usize),
        }
        let mut order: Vec<(u64, Pending)> = self
            .applied
            .iter()
            .map(|(id, m)| (m.seq(), Pending::Applied(id.clone())))
            .chain(
                self.selections
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (s.seq, Pending::Selection(i))),
            )
            .collect();
        order.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, pending) in order {
            match pending {
                Pending::Applied(id) => {
                    if let Some(mutation) = self.applied.get(&id) {
                        restore_applied(mutation, &mut report);
                    }
                }
                Pending::Selection(index) => {
                    let record = &self.selections[index];
                    for node in &record.inserted {
                        dom::remove_from_parent(node);
                    }
                    record.deleted.undo();
                    debug!(unit = %record.id, "selection restored");
                    report.selections += 1;
                }
            }
        }

        for marker in dom::preorder(root)
            .into_iter()
            .filter(|n| dom::has_attr(n, TRANSLATED_MARKER))
        {
            let text = dom::create_text(&dom::text_content(&marker));
            if dom::replace_node(&marker, text) {
                report.markers_stripped += 1;
            }
        }

        for element in dom::preorder(root)
            .into_iter()
            .filter(|n| dom::has_attr(n, ORIGINAL_LANG_ATTR))
        {
            let previous = dom::get_attr(&element, ORIGINAL_LANG_ATTR).unwrap_or_default();
            if previous.is_empty() {
                dom::remove_attr(&element, "lang");
            } else {
                dom::set_attr(&element, "lang", &previous);
            }
            dom::remove_attr(&element, ORIGINAL_LANG_ATTR);
            report.langs_reinstated += 1;
        }

        self.applied.clear();
        self.selections.clear();
        if clear_originals {
            self.originals.clear();
        }
        debug!(?report, "restore complete");
        report
    }
}

impl std::fmt::Debug for MutationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationEngine")
            .field("originals", &self.originals.len())
            .field("applied", &self.applied.len())
            .field("selections", &self.selections.len())
            .finish()
    }
}

fn restore_applied(mutation: &AppliedMutation, report: &mut RestoreReport) {
    match mutation {
        AppliedMutation::Text {
            node,
            original,
            translated,
            before,
            after,
            ..
        } => {
            let Some(node) = node.upgrade() else {
                report.skipped += 1;
                return;
            };
            let live = dom::node_text(&node).unwrap_or_default();
            if &live == after {
                dom::set_node_text(&node, before);
            } else if !translated.is_empty() && live.contains(translated.as_str()) {
                dom::set_node_text(&node, &live.replacen(translated.as_str(), original, 1));
            } else {
                warn!(live = %live, "translated text no longer present; leaving node as is");
                report.skipped += 1;
                return;
            }
            report.text_nodes += 1;
        }
        AppliedMutation::Attribute {
            element,
            attribute,
            original,
            ..
        } => {
            let Some(element) = element.upgrade() else {
                report.skipped += 1;
                return;
            };
            dom::set_attr(&element, attribute, original);
            report.attributes += 1;
        }
    }
}

/// Set `lang` on the text node's parent, remembering the previous value once.
fn mark_parent_lang(node: &Handle, lang: &str) {
    let Some(parent) = dom::parent_of(node) else {
        return;
    };
    let Some(tag) = dom::element_name(&parent) else {
        return;
    };
    if UNDECORATED_ELEMENTS
        .iter()
        .any(|t| tag.eq_ignore_ascii_case(t))
    {
        return;
    }
    if !dom::has_attr(&parent, ORIGINAL_LANG_ATTR) {
        let previous = dom::get_attr(&parent, "lang").unwrap_or_default();
        dom::set_attr(&parent, ORIGINAL_LANG_ATTR, &previous);
    }
    dom::set_attr(&parent, "lang", lang);
}
