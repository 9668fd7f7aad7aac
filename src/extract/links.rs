use crate::dom::document::{Document, NodeId};
use crate::dom::xpath::is_absolute;
use crate::extract::labels::{associated_text, label_tag};
use crate::extract::page_model::LinkDescriptor;
use crate::locator::locator_model::Locator;
use crate::locator::synthesize::{get_xpath, relative};
use crate::text::matching::{MatchOpts, matches_any};
use crate::text::normalize::non_empty;

/// An anchor kept only when its text is exactly one of `identifiers`,
/// ignoring case and whitespace.
pub fn extract_link<S: AsRef<str>>(doc: &Document, id: NodeId, identifiers: &[S]) -> Option<LinkDescriptor> {
    let text = doc.inner_text(id).trim().to_string();
    if !matches_any(&text, identifiers, MatchOpts::EXACT.ignoring_whitespace()) {
        return None;
    }
    let primary = get_xpath(doc, id)?;
    let relative_locator = if is_absolute(&primary) { relative(doc, id) } else { Some(primary.clone()) };
    let label_text = if is_absolute(&primary) { associated_text(doc, id, &primary, false) } else { None };

    Some(LinkDescriptor {
        label_tag: label_tag(doc, id),
        label_text,
        text,
        href: non_empty(doc.attr(id, "href")).map(str::to_string),
        rel: non_empty(doc.attr(id, "rel")).map(str::to_string),
        locator: Locator::new(primary, relative_locator),
        node: Some(id),
    })
}
