use tracing::debug;

use crate::config::keywords::Blacklists;
use crate::diff::html_diff::{Fragment, HtmlDiff};
use crate::dom::document::{Document, NodeId};
use crate::dom::xpath::{is_unique, select_unique};
use crate::locator::synthesize::{MAX_PARENT_FALLBACKS, absolute, build_absolute, parent_fallback, relative_unique};
use crate::text::matching::{MatchOpts, matches_any};

/// Child text that does not disqualify an option container.
const ALLOWED_CHILD_TEXT: &[&str] = &["*"];

/// How revealed options are collected from a diff.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionScan<'a> {
    /// Options must follow this element in document order.
    pub owner: Option<NodeId>,
    /// Attribute value that marks option nodes of a multiselect.
    pub multiselect_identifier: Option<&'a str>,
    /// Once an input-backed option is found, keep only input-backed options.
    pub filter_if_input: bool,
}

/// A revealed option: displayed text and a unique locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredOption {
    pub text: String,
    pub locator: String,
}

struct Collector<'a> {
    doc: &'a Document,
    owner: Option<NodeId>,
    list_option_partial: &'a [String],
    found: Vec<DiscoveredOption>,
}

impl Collector<'_> {
    /// Store the option if its locator is unique, follows the owner and the
    /// text is not blacklisted. A repeated text keeps its first position.
    fn log(&mut self, text: &str, locator: Option<String>) -> bool {
        let Some(locator) = locator else { return false };
        let Some(node) = select_unique(self.doc, &locator) else { return false };
        if self.owner.is_some_and(|owner| !self.doc.is_after(node, owner)) {
            return false;
        }
        if matches_any(text, self.list_option_partial, MatchOpts::SUBSTRING) {
            return false;
        }
        match self.found.iter_mut().find(|o| o.text == text) {
            Some(existing) => existing.locator = locator,
            None => self.found.push(DiscoveredOption { text: text.to_string(), locator }),
        }
        true
    }

    fn has(&self, text: &str) -> bool {
        self.found.iter().any(|o| o.text == text)
    }
}

fn last_segment_is_input(locator: &str) -> bool {
    locator.rsplit('/').next().is_some_and(|s| s.contains("input"))
}

/// Map option text to a locator for every option-like node of a diff.
pub fn options_from_diff(
    diff: &HtmlDiff,
    after: &Document,
    scan: &OptionScan<'_>,
    blacklists: &Blacklists,
) -> Vec<DiscoveredOption> {
    let fragment = diff.fragment(after);
    let mut collector = Collector {
        doc: after,
        owner: scan.owner,
        list_option_partial: &blacklists.list_option_partial,
        found: Vec::new(),
    };
    let mut input_found = false;

    for el in fragment.elements() {
        if let Some(identifier) = scan.multiselect_identifier {
            let marks = |n: NodeId| after.attrs(n).iter().any(|(_, v)| v == identifier);
            if marks(el) && fragment.element_descendants(el).any(marks) {
                continue;
            }
        }

        let inputs: Vec<NodeId> = fragment.element_descendants(el).filter(|d| after.tag(*d) == Some("input")).collect();
        let buttons: Vec<NodeId> = fragment.element_descendants(el).filter(|d| after.tag(*d) == Some("button")).collect();
        if inputs.len() > 1 || buttons.len() > 1 {
            continue;
        }

        let text = fragment.text(el);
        if text.is_empty() || matches_any(&text, &blacklists.options_placeholder, MatchOpts::SUBSTRING) {
            continue;
        }
        if has_text_child(&fragment, el) {
            continue;
        }

        if let Some(&nested) = inputs.first().or(buttons.first()) {
            if collector.log(&text, relative_unique(after, nested)) {
                input_found |= after.tag(nested) == Some("input");
                continue;
            }
        }

        log_element(&mut collector, &fragment, el, &text, &diff.parent_paths);
    }

    if scan.filter_if_input && input_found {
        collector.found.retain(|o| last_segment_is_input(&o.locator));
    }
    debug!(options = collector.found.len(), "options discovered in diff");
    collector.found
}

fn has_text_child(fragment: &Fragment<'_>, el: NodeId) -> bool {
    fragment.element_children(el).any(|c| {
        let t = fragment.text(c);
        !t.is_empty() && !ALLOWED_CHILD_TEXT.contains(&t.as_str())
    })
}

/// Locator fallbacks for a text option: its own relative form, a unique
/// ancestor, a path rebuilt from the diff's parent paths, the absolute form.
fn log_element(collector: &mut Collector<'_>, fragment: &Fragment<'_>, el: NodeId, text: &str, parent_paths: &[String]) {
    let doc = collector.doc;
    let relative = relative_unique(doc, el);
    if relative.is_some() {
        if collector.log(text, relative) {
            return;
        }
    } else if collector.log(text, parent_fallback(doc, el, MAX_PARENT_FALLBACKS)) {
        return;
    }

    if parent_paths.is_empty() {
        return;
    }
    if let Some(root) = fragment.local_root(el) {
        for xpath in build_absolute(doc, root, el, parent_paths) {
            collector.log(text, Some(xpath));
        }
    }
    if !collector.has(text) {
        collector.log(text, absolute(doc, el).filter(|x| is_unique(doc, x)));
    }
}
