use reqwest::Url;
use tracing::debug;

use crate::config::keywords::NavigationKeywords;
use crate::dom::document::Document;
use crate::dom::xpath::select_unique;
use crate::extract::page_model::{ButtonDescriptor, LinkDescriptor, PageModel};
use crate::locator::locator_model::Locator;
use crate::locator::revalidate::validated_xpath;
use crate::text::matching::{MatchOpts, any_matches, matches_any};

/// A button or link the navigator may click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionItem {
    pub text: String,
    pub locator: Locator,
    pub href: Option<String>,
    pub tag: String,
    pub submit: bool,
}

impl ActionItem {
    pub fn is_link(&self) -> bool {
        self.tag.eq_ignore_ascii_case("a")
    }
}

impl From<&ButtonDescriptor> for ActionItem {
    fn from(button: &ButtonDescriptor) -> Self {
        Self {
            text: button.display_text().to_string(),
            locator: button.locator.clone(),
            href: None,
            tag: button.tag.clone(),
            submit: button.is_submit(),
        }
    }
}

impl From<&LinkDescriptor> for ActionItem {
    fn from(link: &LinkDescriptor) -> Self {
        Self {
            text: link.text.clone(),
            locator: link.locator.clone(),
            href: link.href.clone(),
            tag: "a".to_string(),
            submit: false,
        }
    }
}

/// Something to do to the page before parsing it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Click(ActionItem),
    Open(String),
}

impl Step {
    /// Follow a link's target when it has one, click it otherwise.
    pub fn follow(item: ActionItem, base: &str) -> Self {
        match item.href.as_deref().and_then(|h| absolute_url(base, h)) {
            Some(url) => Step::Open(url),
            None => Step::Click(item),
        }
    }
}

/// Resolve `href` against the page URL. Script and fragment links have no target.
pub fn absolute_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_lowercase().starts_with("javascript:") {
        return None;
    }
    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(_) => Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string()),
    }
}

fn text_matches(text: Option<&str>, needles: &[String]) -> bool {
    text.is_some_and(|t| matches_any(t, needles, MatchOpts::SUBSTRING))
}

// ============================================================================
// Item searches
// ============================================================================

/// First apply button or link, trying identifiers in their configured order.
pub fn apply_item(model: &PageModel, nav: &NavigationKeywords) -> Option<ActionItem> {
    nav.start_apply.iter().find_map(|needle| {
        let needle = std::slice::from_ref(needle);
        model
            .buttons
            .iter()
            .find(|b| text_matches(b.text.as_deref(), needle))
            .map(ActionItem::from)
            .or_else(|| model.links.iter().find(|l| text_matches(Some(&l.text), needle)).map(ActionItem::from))
    })
}

/// Acknowledgement control: the last visible-text ack button, else a link
/// that opens terms in place rather than navigating away.
pub fn ack_item(model: &PageModel, doc: &Document, nav: &NavigationKeywords) -> Option<ActionItem> {
    let button = model.buttons.iter().rev().find(|b| {
        b.text.as_deref().is_some_and(|t| !t.trim().is_empty())
            && any_matches(b.search_values(), &nav.ack, MatchOpts::SUBSTRING)
    });
    if let Some(button) = button {
        return Some(button.into());
    }

    model
        .links
        .iter()
        .rev()
        .filter(|l| text_matches(Some(&l.text), &nav.ack_links))
        .find(|l| {
            let Some(node) = validated_xpath(doc, &l.locator).and_then(|x| select_unique(doc, &x.value)) else {
                return false;
            };
            let href = doc.attr(node, "href").unwrap_or("");
            let modal = doc.has_attr(node, "onclick")
                && !href.starts_with("http")
                && doc.attr(node, "target") != Some("_blank");
            if !modal {
                debug!(text = %l.text, "ack link navigates away, ignored");
            }
            modal
        })
        .map(ActionItem::from)
}

/// Control that moves the form forward. Submit-typed buttons first, then any
/// button; a lone submit button is taken as progress when nothing matches.
pub fn progress_item(model: &PageModel, nav: &NavigationKeywords) -> Option<ActionItem> {
    let submits: Vec<&ButtonDescriptor> = model.buttons.iter().rev().filter(|b| b.is_submit()).collect();
    submits
        .iter()
        .copied()
        .find(|b| text_matches(b.text.as_deref(), &nav.progress))
        .or_else(|| model.buttons.iter().rev().find(|b| text_matches(b.text.as_deref(), &nav.progress)))
        .or_else(|| if submits.len() == 1 { submits.first().copied() } else { None })
        .map(ActionItem::from)
}

/// Visible iframe sources that may host the application form.
pub fn frame_sources(doc: &Document, nav: &NavigationKeywords) -> Vec<String> {
    doc.elements_by_tag(&["iframe"])
        .filter(|f| doc.is_visible(*f))
        .filter_map(|f| doc.attr(f, "src"))
        .filter(|src| !src.is_empty() && !matches_any(src, &nav.iframe_blacklist, MatchOpts::SUBSTRING))
        .map(str::to_string)
        .collect()
}
