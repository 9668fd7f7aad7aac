use std::time::Duration;

use tracing::{debug, info, warn};

use crate::browser::{Browser, StabilityOpts};
use crate::config::keywords::{Blacklists, KeyBlacklist};
use crate::diff::change::{NEW_ELEMENT_QUERIES, has_significantly_changed, new_elements};
use crate::diff::html_diff::diff;
use crate::diff::options::{DiscoveredOption, OptionScan, options_from_diff};
use crate::dom::document::{Document, NodeId};
use crate::dom::xpath::select_unique;
use crate::error::{FormError, FormResult};
use crate::locator::locator_model::ClickStrategy;
use crate::locator::strategy::Chain;
use crate::resolve::decision::ClickOutcome;
use crate::text::matching::{hits_full, hits_partial};

/// Padding after clicking a control that may navigate.
pub const BUTTON_SETTLE_PADDING: Duration = Duration::from_secs(2);

struct ClickCtx<'x> {
    browser: &'x mut dyn Browser,
    locator: &'x str,
}

/// Options revealed by opening a list, with the snapshot they live in.
#[derive(Debug, Clone)]
pub struct RevealedOptions {
    pub doc: Document,
    pub options: Vec<DiscoveredOption>,
}

impl RevealedOptions {
    pub fn texts(&self) -> Vec<String> {
        self.options.iter().map(|o| o.text.clone()).collect()
    }
}

/// Drives the live page on behalf of the resolvers: layered clicks, text
/// entry and before/after captures.
pub struct Interactor<'b> {
    browser: &'b mut dyn Browser,
    stability: StabilityOpts,
}

impl<'b> Interactor<'b> {
    pub fn new(browser: &'b mut dyn Browser, stability: StabilityOpts) -> Self {
        Self { browser, stability }
    }

    pub fn browser(&mut self) -> &mut dyn Browser {
        &mut *self.browser
    }

    pub fn stability(&self) -> &StabilityOpts {
        &self.stability
    }

    /// Parse the current page once the DOM has settled.
    pub fn capture(&mut self) -> FormResult<Document> {
        let html = self.browser.wait_until_stable(&self.stability)?;
        Ok(Document::parse(&html))
    }

    /// Parse the current page without waiting.
    pub fn capture_now(&mut self) -> FormResult<Document> {
        let html = self.browser.snapshot()?;
        Ok(Document::parse(&html))
    }

    // ========================================================================
    // Primitive interactions
    // ========================================================================

    /// Click through native, scroll-then-click and script strategies; the
    /// first one the page accepts wins.
    pub fn click(&mut self, locator: &str) -> FormResult<ClickStrategy> {
        let chain = Chain::<ClickCtx<'_>, ClickStrategy, ()>::new("click")
            .then(ClickStrategy::Native, |c: &mut ClickCtx<'_>| attempt(c.browser.click(c.locator, ClickStrategy::Native), c.locator))
            .then(ClickStrategy::ScrollThenClick, |c| {
                let scrolled = c.browser.scroll_to(c.locator);
                attempt(scrolled.and_then(|_| c.browser.click(c.locator, ClickStrategy::ScrollThenClick)), c.locator)
            })
            .then(ClickStrategy::Script, |c| attempt(c.browser.click(c.locator, ClickStrategy::Script), c.locator));

        let mut ctx = ClickCtx { browser: &mut *self.browser, locator };
        match chain.run(&mut ctx) {
            Some(tagged) => Ok(tagged.stage),
            None => {
                warn!(locator, "every click strategy failed");
                Err(FormError::InteractionFailed { action: "click".into(), locator: locator.to_string() })
            }
        }
    }

    /// Replace the element's content: select all, clear, type.
    pub fn type_text(&mut self, locator: &str, text: &str) -> FormResult<()> {
        self.browser.scroll_to(locator)?;
        self.browser.select_all(locator)?;
        self.browser.clear(locator)?;
        self.browser.type_text(locator, text)?;
        debug!(locator, chars = text.chars().count(), "text entered");
        Ok(())
    }

    /// Click an answer and return interactive elements that appeared after
    /// the answered element.
    pub fn click_and_capture(&mut self, locator: &str, anchor: &str) -> FormResult<Vec<String>> {
        let before = self.capture_now()?;
        self.click(locator)?;
        let after = self.capture()?;
        Ok(revealed_after(&before, &after, anchor))
    }

    /// Choose a `<select>` option and return what it revealed.
    pub fn select_and_capture(&mut self, locator: &str, text: &str) -> FormResult<Vec<String>> {
        let before = self.capture_now()?;
        self.browser.select_option(locator, text)?;
        let after = self.capture()?;
        Ok(revealed_after(&before, &after, locator))
    }

    /// Open a list control and collect the options its click revealed.
    pub fn reveal_options(
        &mut self,
        target: &str,
        scan: RevealScan<'_>,
        blacklists: &Blacklists,
    ) -> FormResult<RevealedOptions> {
        let before = self.capture_now()?;
        self.click(target)?;
        let after = self.capture()?;
        Ok(self.options_between(&before, after, scan, blacklists))
    }

    /// Type a search term into a searchable list and collect what it revealed.
    pub fn search_options(
        &mut self,
        target: &str,
        term: &str,
        scan: RevealScan<'_>,
        blacklists: &Blacklists,
    ) -> FormResult<RevealedOptions> {
        let before = self.capture_now()?;
        self.type_text(target, term)?;
        let after = self.capture()?;
        Ok(self.options_between(&before, after, scan, blacklists))
    }

    /// Scroll an option into view and collect the options that scrolling
    /// brought in.
    pub fn scroll_options(
        &mut self,
        target: &str,
        scan: RevealScan<'_>,
        blacklists: &Blacklists,
    ) -> FormResult<RevealedOptions> {
        let before = self.capture_now()?;
        self.browser.scroll_to(target)?;
        let after = self.capture()?;
        Ok(self.options_between(&before, after, scan, blacklists))
    }

    fn options_between(
        &self,
        before: &Document,
        after: Document,
        scan: RevealScan<'_>,
        blacklists: &Blacklists,
    ) -> RevealedOptions {
        let delta = diff(before, &after);
        let owner = scan.owner.and_then(|l| select_unique(&after, l));
        let options = options_from_diff(
            &delta,
            &after,
            &OptionScan {
                owner,
                multiselect_identifier: scan.multiselect_identifier,
                filter_if_input: scan.filter_if_input,
            },
            blacklists,
        );
        RevealedOptions { doc: after, options }
    }

    // ========================================================================
    // Buttons
    // ========================================================================

    /// Click a control and classify what it did to the page.
    pub fn click_and_classify(
        &mut self,
        locator: &str,
        threshold: f64,
        blacklists: &Blacklists,
    ) -> FormResult<ClickOutcome> {
        let before = self.capture()?;
        self.click(locator)?;
        let html = self.browser.wait_until_stable(&self.stability.with_padding(BUTTON_SETTLE_PADDING))?;
        let after = Document::parse(&html);

        if has_significantly_changed(&before, &after, threshold) {
            info!(locator, "click advanced the page");
            return Ok(ClickOutcome::Advanced);
        }

        let revealed: Vec<String> = new_elements(&before, &after, NEW_ELEMENT_QUERIES)
            .into_iter()
            .filter(|e| after.is_visible(e.node) && keep_revealed(&after, e.node, blacklists))
            .map(|e| e.locator)
            .collect();
        if revealed.is_empty() {
            info!(locator, "click changed nothing");
            return Ok(ClickOutcome::NoChange);
        }
        info!(locator, revealed = revealed.len(), "click revealed new elements");
        Ok(ClickOutcome::NewElementsRevealed(revealed))
    }
}

/// Where revealed options are looked for.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevealScan<'a> {
    /// Options must follow the element this locator resolves to.
    pub owner: Option<&'a str>,
    pub multiselect_identifier: Option<&'a str>,
    pub filter_if_input: bool,
}

fn attempt(result: FormResult<()>, locator: &str) -> Option<()> {
    match result {
        Ok(()) => Some(()),
        Err(e) => {
            debug!(locator, error = %e, "click attempt rejected");
            None
        }
    }
}

/// New visible interactive elements after `anchor` in `after`.
fn revealed_after(before: &Document, after: &Document, anchor: &str) -> Vec<String> {
    let anchor = select_unique(after, anchor);
    new_elements(before, after, NEW_ELEMENT_QUERIES)
        .into_iter()
        .filter(|e| after.is_visible(e.node))
        .filter(|e| anchor.is_none_or(|a| after.is_after(e.node, a)))
        .map(|e| e.locator)
        .collect()
}

fn is_button_like(doc: &Document, node: NodeId) -> bool {
    match doc.tag(node) {
        Some("button") => true,
        Some("input") => matches!(
            doc.attr(node, "type").map(str::to_lowercase).as_deref(),
            Some("submit" | "button")
        ),
        _ => doc.attr(node, "role") == Some("button"),
    }
}

fn blacklisted(doc: &Document, node: NodeId, text: &str, list: &KeyBlacklist) -> bool {
    let ids = [doc.attr(node, "id"), doc.attr(node, "name")];
    let labels = [doc.attr(node, "aria-label")];
    hits_full(&list.id_full, ids)
        || hits_partial(&list.id_partial, ids)
        || hits_full(&list.label_full, labels)
        || hits_partial(&list.label_partial, labels)
        || hits_full(&list.text_full, [Some(text)])
        || hits_partial(&list.text_partial, [Some(text)])
}

/// Revealed buttons must carry text (or an onclick handler) outside the
/// new-button blacklist; revealed fields must not have blacklisted ids.
fn keep_revealed(doc: &Document, node: NodeId, blacklists: &Blacklists) -> bool {
    if is_button_like(doc, node) {
        let text = doc.inner_text(node);
        let text = text.trim();
        let value = doc.attr(node, "value").unwrap_or("");
        if text.is_empty() && value.is_empty() && !doc.has_attr(node, "onclick") {
            return false;
        }
        return !blacklisted(doc, node, if text.is_empty() { value } else { text }, &blacklists.new_button);
    }
    let ids = [doc.attr(node, "id"), doc.attr(node, "name")];
    !(hits_full(&blacklists.new_field.id_full, ids) || hits_partial(&blacklists.new_field.id_partial, ids))
}
