use crate::dom::document::{Document, NodeId, NodeKind};
use crate::dom::xpath::{is_absolute, select_unique};
use crate::text::normalize::{clean_text, collapse_whitespace, first_line, non_empty, word_count};

// ============================================================================
// Attribute search
// ============================================================================

/// Attributes whose name is `key`, ends with `-key`/`_key`, or starts with
/// `aria-key`. Matching is case-insensitive on the name.
pub fn search_attribute<'d>(doc: &'d Document, id: NodeId, key: &str) -> Vec<(&'d str, &'d str)> {
    let key = key.to_lowercase();
    doc.attrs(id)
        .iter()
        .filter(|(name, _)| {
            let name = name.to_lowercase();
            name == key
                || name.ends_with(&format!("-{}", key))
                || name.ends_with(&format!("_{}", key))
                || name.starts_with(&format!("aria-{}", key))
        })
        .map(|(n, v)| (n.as_str(), v.as_str()))
        .collect()
}

/// A matching attribute value that differs from the plain `key` attribute.
pub fn custom_attribute(doc: &Document, id: NodeId, key: &str) -> Option<String> {
    let plain = doc.attr(id, key);
    search_attribute(doc, id, key)
        .into_iter()
        .map(|(_, v)| v)
        .find(|v| Some(*v) != plain && !v.is_empty())
        .map(str::to_string)
}

/// Any attribute value contains one of `needles` (case-insensitive).
pub fn attribute_value_contains<S: AsRef<str>>(doc: &Document, id: NodeId, needles: &[S]) -> bool {
    doc.attrs(id).iter().any(|(_, v)| {
        let v = v.to_lowercase();
        needles.iter().any(|n| !n.as_ref().is_empty() && v.contains(&n.as_ref().to_lowercase()))
    })
}

/// Any attribute value equals one of `needles` (case-insensitive).
pub fn attribute_value_equals<S: AsRef<str>>(doc: &Document, id: NodeId, needles: &[S]) -> bool {
    doc.attrs(id)
        .iter()
        .any(|(_, v)| needles.iter().any(|n| n.as_ref().eq_ignore_ascii_case(v)))
}

// ============================================================================
// Tag-derived labels
// ============================================================================

/// `label[for]`/`label[id]` for any token of the custom label, id or custom id,
/// then an enclosing `label`, then a `label` right before the element.
pub fn label_tag(doc: &Document, id: NodeId) -> Option<String> {
    let mut keys: Vec<String> = Vec::new();
    for source in [custom_attribute(doc, id, "label"), doc.attr(id, "id").map(str::to_string), custom_attribute(doc, id, "id")]
        .into_iter()
        .flatten()
    {
        for token in source.split(' ').filter(|t| !t.is_empty()) {
            if !keys.iter().any(|k| k == token) {
                keys.push(token.to_string());
            }
        }
    }

    let labels: Vec<NodeId> = doc.elements_by_tag(&["label"]).collect();
    for key in &keys {
        for attr in ["for", "id"] {
            let found = labels
                .iter()
                .find(|l| doc.attr(**l, attr) == Some(key.as_str()))
                .map(|l| clean_text(&doc.inner_text(*l)));
            if let Some(text) = found.filter(|t| !t.is_empty()) {
                return Some(text);
            }
        }
    }

    if let Some(text) = doc
        .ancestors(id)
        .find(|a| doc.tag(*a) == Some("label"))
        .map(|l| clean_text(&doc.inner_text(l)))
        .filter(|t| !t.is_empty())
    {
        return Some(text);
    }

    let previous = doc
        .parent(id)
        .and_then(|p| doc.element_children(p).take_while(|c| *c != id).last())
        .filter(|s| doc.tag(*s) == Some("label"))?;
    Some(clean_text(&doc.text_content(previous))).filter(|t| !t.is_empty())
}

/// First `*label` attribute, else `aria-label`.
pub fn label_attribute(doc: &Document, id: NodeId) -> Option<String> {
    search_attribute(doc, id, "label")
        .first()
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| non_empty(doc.attr(id, "aria-label")).map(str::to_string))
}

// ============================================================================
// Associated-text walk
// ============================================================================

const MAX_TRACEBACKS: usize = 8;
const SPLIT_BOUNDARY: usize = 4;
const MAX_SPLIT_INDEX: usize = 5;
const MAX_SPLITS: i32 = 2;
const CAPTION_TAGS: &[&str] = &["label", "h1", "h2", "h3", "h4", "h5", "h6", "p"];

/// Text of `id` with nested buttons left out.
pub fn text_without_buttons(doc: &Document, id: NodeId) -> String {
    let mut raw = String::new();
    collect_without_buttons(doc, id, &mut raw);
    collapse_whitespace(&raw)
}

fn collect_without_buttons(doc: &Document, id: NodeId, out: &mut String) {
    for c in doc.children(id) {
        match &doc.node(*c).kind {
            NodeKind::Text(t) => {
                out.push(' ');
                out.push_str(t.trim());
            }
            NodeKind::Element { tag, .. } if tag != "button" => collect_without_buttons(doc, *c, out),
            _ => {}
        }
    }
}

fn split_index(component: &str) -> Option<usize> {
    let open = component.find('[')?;
    component[open + 1..].strip_suffix(']')?.parse().ok()
}

fn join_path(components: &[&str]) -> String {
    format!("/{}", components.join("/"))
}

/// Few-line ancestor text collapses to its first line.
fn open_text(doc: &Document, ancestor: NodeId, is_choice: bool) -> Option<String> {
    let text = doc.inner_text(ancestor);
    let max_lines = if is_choice { 9 } else { 6 };
    if text.is_empty() || text.lines().count() >= max_lines {
        return None;
    }
    first_line(&text).map(str::to_string)
}

/// Caption text found by walking up from the element's absolute path.
///
/// Each `[n]` step with n>1 marks a repeated row; the walk tolerates two of
/// them and stops at the first one above four levels so a caption shared by
/// many rows is not attributed to one of them.
pub fn associated_text(doc: &Document, target: NodeId, absolute_path: &str, is_choice: bool) -> Option<String> {
    if !is_absolute(absolute_path) || doc.has_namespaces() {
        return None;
    }
    let components: Vec<&str> = absolute_path.split('/').skip(1).collect();

    if !is_choice {
        if let Some(pos) = components.iter().position(|c| *c == "label" || c.starts_with("label[")) {
            let label = select_unique(doc, &join_path(&components[..=pos]));
            if let Some(text) = label.map(|l| doc.inner_text(l)).filter(|t| !t.is_empty()) {
                return Some(text);
            }
        }
    }

    if is_choice {
        if let Some(text) = legend_caption(doc, target) {
            return Some(text);
        }
    }

    if let Some(text) = fieldset_captions(doc, &components) {
        return Some(text);
    }

    let mut ignore: Vec<String> = Vec::new();
    let mut splits_left = MAX_SPLITS;
    let len = components.len();

    for step in 1..=MAX_TRACEBACKS {
        if step > len {
            break;
        }
        let component = components[len - step];
        if let Some(n) = split_index(component) {
            if is_choice && step < 5 {
                let tag = component.split('[').next().unwrap_or(component);
                let base = join_path(&components[..len - step]);
                for k in 1..=n {
                    let sibling = select_unique(doc, &format!("{}/{}[{}]", base, tag, k));
                    if let Some(s) = sibling {
                        ignore.push(text_without_buttons(doc, s));
                    }
                }
            }

            if (step > SPLIT_BOUNDARY && n != 1) || n > MAX_SPLIT_INDEX || splits_left < 0 {
                if step > SPLIT_BOUNDARY {
                    let ancestor = select_unique(doc, &join_path(&components[..len - step]));
                    return ancestor.and_then(|a| open_text(doc, a, is_choice));
                }
                break;
            } else if n != 1 {
                splits_left -= 1;
            }
        }

        let current = &components[..len - step];
        if current.is_empty() || current.last() == Some(&"body") {
            break;
        }
        let Some(ancestor) = select_unique(doc, &join_path(current)) else {
            continue;
        };

        let mut found: Option<String> = None;
        for el in doc.element_descendants(ancestor) {
            if !doc.tag(el).is_some_and(|t| CAPTION_TAGS.contains(&t)) {
                continue;
            }
            let text = text_without_buttons(doc, el);
            // precedes or contains the target
            if text.is_empty() || el >= target || ignore.contains(&text) {
                continue;
            }
            if is_choice {
                return Some(text);
            }
            found = Some(text);
        }
        if found.is_some() {
            return found;
        }

        if step == MAX_TRACEBACKS {
            return open_text(doc, ancestor, is_choice);
        }
    }
    None
}

/// `legend` of the nearest enclosing `fieldset`, the caption of a choice group.
fn legend_caption(doc: &Document, target: NodeId) -> Option<String> {
    let fieldset = doc.ancestors(target).take(MAX_TRACEBACKS).find(|a| doc.tag(*a) == Some("fieldset"))?;
    doc.element_children(fieldset)
        .find(|c| doc.tag(*c) == Some("legend"))
        .map(|legend| text_without_buttons(doc, legend))
        .filter(|t| !t.is_empty())
}

/// Captions of a field block wrapped in a `fieldset` near the end of the path.
fn fieldset_captions(doc: &Document, components: &[&str]) -> Option<String> {
    let boundary = components.len() * 3333 / 10000;
    let tail = &components[components.len() - boundary..];
    if !tail.iter().any(|c| c.contains("fieldset")) {
        return None;
    }
    let pos = components.iter().rposition(|c| c.contains("fieldset"))?;
    let fieldset = select_unique(doc, &join_path(&components[..=pos]))?;

    let qualified: Vec<String> = doc
        .element_descendants(fieldset)
        .filter(|d| doc.tag(*d).is_some_and(|t| CAPTION_TAGS.contains(&t)))
        .map(|d| doc.inner_text(d))
        .filter(|t| word_count(t) > 2)
        .collect();
    if qualified.is_empty() || qualified.len() >= 4 {
        return None;
    }
    Some(qualified.join("\n"))
}
