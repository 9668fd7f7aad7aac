use std::collections::HashSet;

use sha1::{Digest, Sha1};
use tracing::debug;

use crate::dom::document::{Document, NodeId};
use crate::dom::xpath::select;
use crate::locator::synthesize::relative_unique;

const INTERACTIVE_TAGS: &[&str] = &["input", "select", "textarea", "button"];
const FINGERPRINT_ATTRS: &[&str] = &["name", "id", "placeholder", "type", "aria-label", "role"];

/// Queries used to find interactive elements revealed by an interaction.
pub const NEW_ELEMENT_QUERIES: &[&str] = &[
    "//input",
    "//textarea",
    "//select",
    "//button",
    "//*[@role='button']",
];

fn is_interactive(doc: &Document, id: NodeId) -> bool {
    doc.tag(id).is_some_and(|t| INTERACTIVE_TAGS.contains(&t)) || doc.attr(id, "role") == Some("button")
}

fn fingerprint(doc: &Document, id: NodeId) -> String {
    let key = FINGERPRINT_ATTRS
        .iter()
        .map(|a| format!("{}:{}", a, doc.attr(id, a).unwrap_or("")))
        .collect::<Vec<_>>()
        .join("|");
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Identity fingerprints of every interactive element.
pub fn interactive_fingerprints(doc: &Document) -> HashSet<String> {
    doc.all_elements().filter(|e| is_interactive(doc, *e)).map(|e| fingerprint(doc, e)).collect()
}

/// Share of the "before" interactive elements still present "after".
/// `None` when "before" had none.
pub fn preserved_ratio(before: &Document, after: &Document) -> Option<f64> {
    let before_prints = interactive_fingerprints(before);
    if before_prints.is_empty() {
        return None;
    }
    let after_prints = interactive_fingerprints(after);
    let kept = before_prints.intersection(&after_prints).count();
    Some(kept as f64 / before_prints.len() as f64)
}

/// The page changed significantly when fewer than `threshold` of its
/// interactive elements survived. An empty "before" always counts as changed.
pub fn has_significantly_changed(before: &Document, after: &Document, threshold: f64) -> bool {
    match preserved_ratio(before, after) {
        None => true,
        Some(ratio) => {
            debug!(ratio, threshold, "dom preservation ratio");
            ratio < threshold
        }
    }
}

/// A newly revealed element with its synthesized locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewElement {
    pub node: NodeId,
    pub locator: String,
}

/// Elements of `after` matched by `queries` whose serialized HTML did not
/// exist in `before`. Elements without a unique relative locator are dropped.
pub fn new_elements(before: &Document, after: &Document, queries: &[&str]) -> Vec<NewElement> {
    let known: HashSet<String> = queries
        .iter()
        .filter_map(|q| select(before, q).ok())
        .flatten()
        .map(|n| before.outer_html(n))
        .collect();

    let mut nodes: Vec<NodeId> = queries.iter().filter_map(|q| select(after, q).ok()).flatten().collect();
    nodes.sort_unstable();
    nodes.dedup();

    nodes
        .into_iter()
        .filter(|n| !known.contains(&after.outer_html(*n)))
        .filter_map(|node| relative_unique(after, node).map(|locator| NewElement { node, locator }))
        .collect()
}
