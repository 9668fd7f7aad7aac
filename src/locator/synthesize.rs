use crate::dom::document::{Document, NodeId};
use crate::dom::xpath::{is_unique, quote_literal};

/// Ancestor levels tried by [`parent_fallback`].
pub const MAX_PARENT_FALLBACKS: usize = 5;

/// `//tag[@a='v'][@b]...` from every attribute, unverified.
///
/// Values that look like inline code (parentheses or quotes) are reduced to a
/// `contains()` on their shortest leading token.
pub fn relative(doc: &Document, id: NodeId) -> Option<String> {
    let tag = doc.tag(id)?;
    let mut xpath = format!("//{}", tag);
    for (name, value) in doc.attrs(id) {
        if name.contains(['\'', '"', '=']) || name.is_empty() {
            continue;
        }
        if value.is_empty() {
            xpath.push_str(&format!("[@{}]", name));
        } else if value.contains('(') || value.contains('"') || value.contains("&quot;") {
            let token = [
                value.split('(').next().unwrap_or(""),
                value.split("&quot;").next().unwrap_or(""),
                value.split('"').next().unwrap_or(""),
            ]
            .into_iter()
            .map(str::trim)
            .min_by_key(|s| s.len())
            .unwrap_or("");
            xpath.push_str(&format!("[contains(@{}, {})]", name, quote_literal(token)));
        } else {
            xpath.push_str(&format!("[@{}={}]", name, quote_literal(value)));
        }
    }
    Some(xpath)
}

/// [`relative`], kept only when it matches exactly one element.
pub fn relative_unique(doc: &Document, id: NodeId) -> Option<String> {
    relative(doc, id).filter(|x| is_unique(doc, x))
}

/// Position-indexed path; unavailable when the document uses namespaces.
pub fn absolute(doc: &Document, id: NodeId) -> Option<String> {
    if doc.has_namespaces() {
        return None;
    }
    doc.absolute_path(id)
}

pub fn absolute_unique(doc: &Document, id: NodeId) -> Option<String> {
    absolute(doc, id).filter(|x| is_unique(doc, x))
}

/// Primary locator for a freshly extracted element.
pub fn get_xpath(doc: &Document, id: NodeId) -> Option<String> {
    if doc.has_namespaces() {
        return relative_unique(doc, id);
    }
    absolute_unique(doc, id).or_else(|| relative_unique(doc, id))
}

/// Unique relative locator of the nearest of up to `max` ancestors.
pub fn parent_fallback(doc: &Document, id: NodeId, max: usize) -> Option<String> {
    doc.ancestors(id)
        .take(max)
        .filter(|a| doc.tag(*a) != Some("html"))
        .find_map(|a| relative_unique(doc, a))
}

/// Rebuild absolute paths for `id` from ancestor paths reported by a diff.
///
/// The local chain runs from the fragment root `root` down to `id` and is
/// appended to each parent path; only unique results are kept.
pub fn build_absolute(doc: &Document, root: NodeId, id: NodeId, parent_paths: &[String]) -> Vec<String> {
    if doc.has_namespaces() || !(root == id || doc.contains(root, id)) {
        return Vec::new();
    }
    let mut chain = Vec::new();
    let mut cur = Some(id);
    while let Some(node) = cur {
        let Some(tag) = doc.tag(node) else { break };
        chain.push(format!("/{}[{}]", tag, doc.sibling_index(node)));
        if node == root {
            break;
        }
        cur = doc.parent_element(node);
    }
    chain.reverse();
    let local = chain.concat();

    parent_paths
        .iter()
        .map(|p| format!("{}{}", p.trim_end_matches('/'), local))
        .filter(|x| is_unique(doc, x))
        .collect()
}
