use tracing::{debug, warn};

use crate::dom::document::Document;
use crate::dom::xpath::{count, is_absolute, is_unique};
use crate::locator::locator_model::{Locator, RemapStage};
use crate::locator::strategy::{Chain, Tagged};

struct RemapCtx<'d> {
    doc: &'d Document,
    xpath: &'d str,
}

/// Re-establish a relative locator against the current document.
///
/// Stages run in order: as-is, longest unique predicate prefix, conservative
/// cleanup, aggressive cleanup. `None` means the element is misplaced.
pub fn remap(doc: &Document, xpath: &str) -> Option<Tagged<RemapStage, String>> {
    let chain = Chain::<RemapCtx<'_>, RemapStage, String>::new("remap")
        .then(RemapStage::Unique, |c: &mut RemapCtx<'_>| {
            is_unique(c.doc, c.xpath).then(|| c.xpath.to_string())
        })
        .then(RemapStage::Reduced, |c| reduce_to_unique(c.doc, c.xpath))
        .then(RemapStage::Conservative, |c| {
            let cleaned = clean_dynamic_attributes(c.xpath, false);
            is_unique(c.doc, &cleaned).then_some(cleaned)
        })
        .then(RemapStage::Aggressive, |c| {
            let cleaned = clean_dynamic_attributes(c.xpath, true);
            is_unique(c.doc, &cleaned).then_some(cleaned)
        });

    let found = chain.run(&mut RemapCtx { doc, xpath });
    if found.is_none() {
        warn!(xpath, matches = count(doc, xpath), "unable to remap relative locator");
    }
    found
}

/// Locator to use for an interaction with a previously extracted element.
///
/// Relative candidates (the primary when it differs from the fallback, then
/// the fallback) go through [`remap`]; a still-unique absolute primary is
/// the last resort.
pub fn validated_xpath(doc: &Document, locator: &Locator) -> Option<Tagged<RemapStage, String>> {
    let mut candidates: Vec<&str> = Vec::new();
    if !locator.is_primary_absolute() && Some(locator.primary.as_str()) != locator.relative.as_deref() {
        candidates.push(&locator.primary);
    }
    if let Some(rel) = locator.relative.as_deref() {
        candidates.push(rel);
    }

    for candidate in candidates {
        debug!(candidate, "checking relative locator");
        if let Some(found) = remap(doc, candidate) {
            return Some(found);
        }
    }

    if locator.is_primary_absolute() && is_unique(doc, &locator.primary) {
        warn!(xpath = %locator.primary, "no relative locator left, using absolute");
        return Some(Tagged { stage: RemapStage::Absolute, value: locator.primary.clone() });
    }
    None
}

/// Neither the relative primary nor the relative fallback matches exactly once.
pub fn is_misplaced(doc: &Document, locator: &Locator) -> bool {
    if !locator.is_primary_absolute() && is_unique(doc, &locator.primary) {
        return false;
    }
    !locator.relative.as_deref().is_some_and(|r| is_unique(doc, r))
}

/// Typing changes `value`-like attributes, so prefer a cleaned locator that is
/// still unique before typing.
pub fn typing_locator(doc: &Document, xpath: &str) -> String {
    if is_absolute(xpath) {
        return xpath.to_string();
    }
    let aggressive = clean_dynamic_attributes(xpath, true);
    if is_unique(doc, &aggressive) {
        return aggressive;
    }
    let conservative = clean_dynamic_attributes(xpath, false);
    if is_unique(doc, &conservative) {
        return conservative;
    }
    xpath.to_string()
}

// ============================================================================
// Predicate surgery
// ============================================================================

/// `//tag` plus its top-level predicate groups, for single-step relative locators.
fn split_predicates(xpath: &str) -> Option<(String, Vec<String>)> {
    let rest = xpath.trim().strip_prefix("//")?;
    let name_len = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_' || c == '*'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let head = format!("//{}", &rest[..name_len]);
    let groups = bracket_groups(&rest[name_len..])?;
    Some((head, groups))
}

/// Consecutive `[...]` groups covering the whole input, quote-aware.
fn bracket_groups(input: &str) -> Option<Vec<String>> {
    let mut groups = Vec::new();
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut start = None;
    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' => {
                    if depth == 0 {
                        start = Some(i);
                    }
                    depth += 1;
                }
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        groups.push(input[start?..=i].to_string());
                    }
                }
                _ if depth == 0 => return None,
                _ => {}
            },
        }
    }
    (depth == 0).then_some(groups)
}

/// Longest unique predicate prefix, down to the bare tag.
fn reduce_to_unique(doc: &Document, xpath: &str) -> Option<String> {
    let (head, groups) = split_predicates(xpath)?;
    (0..=groups.len())
        .rev()
        .map(|n| format!("{}{}", head, groups[..n].concat()))
        .find(|candidate| is_unique(doc, candidate))
}

/// Name of an `[@name=...]` equality predicate.
fn equality_attr(group: &str) -> Option<&str> {
    let inner = group.strip_prefix("[@")?.strip_suffix(']')?;
    let (name, _) = inner.split_once('=')?;
    Some(name.trim())
}

fn is_volatile(name: &str, aggressive: bool) -> bool {
    let lower = name.to_lowercase();
    if lower.contains("value") || lower == "tabindex" {
        return true;
    }
    aggressive
        && (matches!(lower.as_str(), "id" | "class" | "placeholder" | "style" | "autocomplete")
            || lower.starts_with("data-"))
}

/// Drop equality predicates on attributes that change while a page is used.
///
/// The conservative pass drops `*value*` and `tabindex`; the aggressive pass
/// additionally drops id, class, placeholder, style, autocomplete and data-*.
pub fn clean_dynamic_attributes(xpath: &str, aggressive: bool) -> String {
    let mut out = String::with_capacity(xpath.len());
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut group_start: Option<usize> = None;

    for (i, c) in xpath.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' => {
                    if depth == 0 {
                        group_start = Some(i);
                    }
                    depth += 1;
                }
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(start) = group_start.take() {
                            let group = &xpath[start..=i];
                            if !equality_attr(group).is_some_and(|n| is_volatile(n, aggressive)) {
                                out.push_str(group);
                            }
                        }
                    }
                    continue;
                }
                _ => {}
            },
        }
        if depth == 0 && group_start.is_none() && c != ']' {
            out.push(c);
        }
    }
    out.trim().to_string()
}
