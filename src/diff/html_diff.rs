use std::collections::BTreeSet;

use tracing::debug;

use crate::dom::document::{Document, NodeId, NodeKind};
use crate::dom::xpath::is_unique;

/// A changed region of the "after" document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    /// The whole subtree is new or differs from its counterpart.
    Replaced(NodeId),
    /// The node itself is unchanged; only the listed children changed.
    Partial { node: NodeId, children: Vec<Delta> },
}

impl Delta {
    pub fn node(&self) -> NodeId {
        match self {
            Delta::Replaced(n) => *n,
            Delta::Partial { node, .. } => *node,
        }
    }
}

/// Structural delta between two captures, expressed over the "after" document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDiff {
    pub deltas: Vec<Delta>,
    /// Absolute paths (valid in both captures) under which new nodes appeared.
    pub parent_paths: Vec<String>,
}

impl HtmlDiff {
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Serialized changed fragment. Partial nodes keep only their changed children.
    pub fn fragment_html(&self, after: &Document) -> String {
        let mut out = String::new();
        for delta in &self.deltas {
            write_delta(after, delta, &mut out);
        }
        out
    }

    /// Flattened view used to walk the changed nodes.
    pub fn fragment<'d>(&self, after: &'d Document) -> Fragment<'d> {
        let mut included = BTreeSet::new();
        let mut replaced_roots = Vec::new();
        for delta in &self.deltas {
            collect_included(after, delta, &mut included, &mut replaced_roots);
        }
        Fragment { doc: after, included, replaced_roots }
    }
}

fn write_delta(doc: &Document, delta: &Delta, out: &mut String) {
    match delta {
        Delta::Replaced(n) => out.push_str(&doc.outer_html(*n)),
        Delta::Partial { node, children } => {
            let Some(tag) = doc.tag(*node) else { return };
            out.push_str(&doc.start_tag(*node));
            out.push_str(&doc.own_text(*node));
            for child in children {
                write_delta(doc, child, out);
            }
            out.push_str(&format!("</{}>", tag));
        }
    }
}

fn collect_included(doc: &Document, delta: &Delta, included: &mut BTreeSet<NodeId>, roots: &mut Vec<NodeId>) {
    match delta {
        Delta::Replaced(n) => {
            roots.push(*n);
            included.insert(*n);
            included.extend(doc.descendants(*n));
        }
        Delta::Partial { node, children } => {
            included.insert(*node);
            // direct text of a shallow copy survives
            included.extend(doc.children(*node).iter().copied().filter(|c| !doc.is_element(*c)));
            for child in children {
                collect_included(doc, child, included, roots);
            }
        }
    }
}

/// The changed nodes of a diff, addressed in the "after" document.
#[derive(Debug, Clone)]
pub struct Fragment<'d> {
    doc: &'d Document,
    included: BTreeSet<NodeId>,
    replaced_roots: Vec<NodeId>,
}

impl<'d> Fragment<'d> {
    pub fn doc(&self) -> &'d Document {
        self.doc
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }

    /// Elements of the fragment in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.included.iter().copied().filter(|n| self.doc.is_element(*n))
    }

    /// Element descendants of `id` that are part of the fragment.
    pub fn element_descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.doc.element_descendants(id).filter(|d| self.included.contains(d))
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.doc.element_children(id).filter(|c| self.included.contains(c))
    }

    /// Text of `id` as it appears in the fragment, trimmed.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in std::iter::once(id).chain(self.doc.descendants(id)) {
            if !self.included.contains(&n) {
                continue;
            }
            if let NodeKind::Text(t) = &self.doc.node(n).kind {
                out.push_str(t);
            }
        }
        out.trim().to_string()
    }

    /// Whole-fragment text, one line per top-level delta.
    pub fn inner_text(&self) -> String {
        self.included
            .iter()
            .copied()
            .filter(|n| self.doc.parent(*n).is_none_or(|p| !self.included.contains(&p)))
            .map(|n| self.text(n))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Nearest enclosing replaced subtree root, used for fragment-local paths.
    pub fn local_root(&self, id: NodeId) -> Option<NodeId> {
        self.replaced_roots
            .iter()
            .copied()
            .filter(|r| *r == id || self.doc.contains(*r, id))
            .max()
    }
}

// ============================================================================
// Diffing
// ============================================================================

/// Diff two captures. Children are aligned level by level: an identical
/// unused subtree wins, otherwise the next unused sibling with the same tag
/// and attributes. Unmatched children are new.
pub fn diff(before: &Document, after: &Document) -> HtmlDiff {
    let mut out = HtmlDiff::default();
    let Some(after_body) = after.body() else {
        return out;
    };
    let before_children: Vec<NodeId> = before.body().map(|b| before.element_children(b).collect()).unwrap_or_default();
    let after_children: Vec<NodeId> = after.element_children(after_body).collect();

    let counterparts = align(before, &before_children, after, &after_children);
    for (child, counterpart) in after_children.into_iter().zip(counterparts) {
        if let Some(delta) = compare(before, counterpart, after, child, &mut out.parent_paths) {
            out.deltas.push(delta);
        }
    }
    debug!(deltas = out.deltas.len(), parents = out.parent_paths.len(), "html diff computed");
    out
}

/// Counterpart in `before_kids` for each of `after_kids`. Each before node is
/// used at most once.
fn align(before: &Document, before_kids: &[NodeId], after: &Document, after_kids: &[NodeId]) -> Vec<Option<NodeId>> {
    let before_html: Vec<String> = before_kids.iter().map(|b| before.outer_html(*b)).collect();
    let mut used = vec![false; before_kids.len()];
    let mut matched: Vec<Option<NodeId>> = vec![None; after_kids.len()];

    for (i, a) in after_kids.iter().enumerate() {
        let html = after.outer_html(*a);
        if let Some(j) = (0..before_kids.len()).find(|j| !used[*j] && before_html[*j] == html) {
            used[j] = true;
            matched[i] = Some(before_kids[j]);
        }
    }

    let mut cursor = 0;
    for (i, a) in after_kids.iter().enumerate() {
        if let Some(b) = matched[i] {
            cursor = before_kids.iter().position(|x| *x == b).map_or(cursor, |j| j + 1);
            continue;
        }
        let found = (cursor..before_kids.len())
            .chain(0..cursor.min(before_kids.len()))
            .find(|j| !used[*j] && same_shell(before, before_kids[*j], after, *a));
        if let Some(j) = found {
            used[j] = true;
            matched[i] = Some(before_kids[j]);
            cursor = j + 1;
        }
    }
    matched
}

fn same_shell(before: &Document, b: NodeId, after: &Document, a: NodeId) -> bool {
    before.tag(b) == after.tag(a) && same_attrs(before.attrs(b), after.attrs(a))
}

fn same_attrs(left: &[(String, String)], right: &[(String, String)]) -> bool {
    left.len() == right.len() && left.iter().all(|pair| right.contains(pair))
}

fn compare(
    before: &Document,
    b: Option<NodeId>,
    after: &Document,
    a: NodeId,
    parent_paths: &mut Vec<String>,
) -> Option<Delta> {
    let Some(b) = b else {
        record_parent(before, after, a, parent_paths);
        return Some(Delta::Replaced(a));
    };
    if !same_shell(before, b, after, a) || before.own_text(b) != after.own_text(a) {
        return Some(Delta::Replaced(a));
    }

    let before_kids: Vec<NodeId> = before.element_children(b).collect();
    let after_kids: Vec<NodeId> = after.element_children(a).collect();
    let counterparts = align(before, &before_kids, after, &after_kids);
    let changed: Vec<Delta> = after_kids
        .into_iter()
        .zip(counterparts)
        .filter_map(|(child, counterpart)| compare(before, counterpart, after, child, parent_paths))
        .collect();

    if changed.is_empty() {
        None
    } else {
        Some(Delta::Partial { node: a, children: changed })
    }
}

fn record_parent(before: &Document, after: &Document, node: NodeId, parent_paths: &mut Vec<String>) {
    let Some(path) = after.parent_element(node).and_then(|p| after.absolute_path(p)) else {
        return;
    };
    if parent_paths.contains(&path) {
        return;
    }
    if is_unique(before, &path) {
        parent_paths.push(path);
    }
}
