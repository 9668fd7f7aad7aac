use tracing::{debug, error, info};

use crate::diff::options::DiscoveredOption;
use crate::dom::document::Document;
use crate::dom::xpath::{is_unique, select_unique};
use crate::error::FormResult;
use crate::extract::page_model::{FieldDescriptor, SectionCategory};
use crate::resolve::decision::{Decision, FieldOutcome};
use crate::resolve::interact::RevealScan;
use crate::resolve::resolver::{FieldResolver, unresolved};
use crate::text::matching::{MatchOpts, any_matches, matches_any};

/// Nesting depth a multiselect tree is followed to.
pub const MAX_LEVELS: usize = 3;

const LOOSE: MatchOpts = MatchOpts { exact: false, case_sensitive: false, ignore_whitespace: true };

/// An option whose locator ends at an input is a leaf; anything else opens
/// another level.
pub fn is_leaf(locator: &str) -> bool {
    locator.starts_with("//input") || locator.rsplit('/').next().is_some_and(|s| s.contains("input"))
}

fn merge(into: &mut Vec<DiscoveredOption>, batch: &[DiscoveredOption]) {
    for option in batch {
        match into.iter_mut().find(|o| o.text == option.text) {
            Some(existing) => existing.locator = option.locator.clone(),
            None => into.push(option.clone()),
        }
    }
}

enum Level {
    /// Clicked a leaf.
    Done,
    /// Open this option's sub-level next.
    Descend(String),
    /// Nothing fits at this level.
    Unanswered,
    /// The chosen option could not be found again.
    Lost(String),
}

impl FieldResolver<'_, '_> {
    /// A selection is already shown next to the control.
    fn shows_selection(&self, field: &FieldDescriptor, doc: &Document, xpath: &str) -> bool {
        let escape = &self.engine.tables().escape_refresh;
        if !any_matches(field.search_values(), &escape.multiselect_partial, LOOSE) {
            return false;
        }
        let Some(node) = select_unique(doc, xpath) else {
            return false;
        };
        let Some(container) = doc.parent_element(node).and_then(|p| doc.parent_element(p)) else {
            return false;
        };
        let text = doc.inner_text(container).to_lowercase();
        escape.selection_markers.iter().any(|m| text.contains(&m.to_lowercase()))
    }

    /// Nested option trees. Each level is opened and matched exactly against
    /// the profile as options arrive; a match on an inner node drills down.
    /// Without a match the whole level is collected by scrolling, the oracle
    /// picks an option by text, and the option is found again by that text.
    pub(super) fn resolve_multiselect(
        &mut self,
        field: &FieldDescriptor,
        doc: &Document,
        xpath: &str,
    ) -> FormResult<FieldOutcome> {
        if self.shows_selection(field, doc, xpath) {
            info!(label = field.display_label(), "multiselect already has a selection");
            return Ok(FieldOutcome::Resolved);
        }

        let mut target = xpath.to_string();
        for level in 0..MAX_LEVELS {
            let scan = RevealScan {
                owner: None,
                multiselect_identifier: field.options.multiselect_identifier(),
                filter_if_input: true,
            };
            let revealed = self.collect_list_options(field, &target, scan)?;
            if revealed.options.is_empty() {
                self.io.browser().blur()?;
                if level == 0 && field.section().is_some_and(|t| t.category == SectionCategory::Education) {
                    return Ok(FieldOutcome::Failed("education multiselect revealed no options".to_string()));
                }
                return Ok(if level == 0 { unresolved(field, "multiselect revealed no options") } else { FieldOutcome::Resolved });
            }
            debug!(level, options = revealed.options.len(), "multiselect level opened");

            match self.answer_level(field, revealed.options)? {
                Level::Done => return Ok(FieldOutcome::Resolved),
                Level::Descend(next) => target = next,
                Level::Unanswered => {
                    self.io.browser().blur()?;
                    return Ok(FieldOutcome::Skipped);
                }
                Level::Lost(label) => {
                    self.io.browser().blur()?;
                    return Ok(FieldOutcome::Failed(format!("option '{}' lost during traceback", label)));
                }
            }
        }

        error!(label = field.display_label(), "multiselect deeper than {} levels", MAX_LEVELS);
        self.io.browser().blur()?;
        Ok(FieldOutcome::Failed("multiselect nesting too deep".to_string()))
    }

    /// Pick within one opened level.
    fn answer_level(&mut self, field: &FieldDescriptor, first: Vec<DiscoveredOption>) -> FormResult<Level> {
        let rules = self.engine.rules();
        let tables = self.engine.tables();
        let scan = RevealScan {
            owner: None,
            multiselect_identifier: field.options.multiselect_identifier(),
            filter_if_input: true,
        };

        let mut current = first;
        let mut all: Vec<DiscoveredOption> = Vec::new();
        merge(&mut all, &current);

        // Progressive exact match while scrolling down.
        loop {
            let texts: Vec<&str> = current.iter().map(|o| o.text.as_str()).collect();
            if let Some(i) = rules.progressive(field, &texts) {
                let option = current[i].clone();
                return self.take(option);
            }
            let Some(last) = self.last_unique(&current, true)? else { break };
            let more = self.io.scroll_options(&last, scan, &tables.blacklists)?;
            if more.options.is_empty() || same_texts(&more.options, &current) {
                break;
            }
            current = more.options;
            merge(&mut all, &current);
            debug!(collected = all.len(), "multiselect options collected");
        }

        all.retain(|o| {
            !tables.blacklists.multiselect_option_full.iter().any(|b| *b == o.text)
                && !matches_any(&o.locator, &tables.blacklists.multiselect_locator_partial, MatchOpts::CASE_SENSITIVE)
        });
        let texts: Vec<String> = all.iter().map(|o| o.text.clone()).collect();
        let label = match self.engine.resolve(field, &texts)? {
            Decision::Select(chosen) => chosen.first().and_then(|i| texts.get(*i)).cloned(),
            _ => None,
        };
        let Some(label) = label else {
            info!(label = field.display_label(), "no multiselect answer");
            return Ok(Level::Unanswered);
        };
        info!(answer = %label, "multiselect answer chosen, tracing back");

        // The chosen option's locator may be stale; find it again by text.
        loop {
            if let Some(option) = current.iter().find(|o| o.text == label) {
                let doc = self.io.capture_now()?;
                if is_unique(&doc, &option.locator) {
                    return self.take(option.clone());
                }
            }
            let Some(first_option) = self.last_unique(&current, false)? else { break };
            let more = self.io.scroll_options(&first_option, scan, &tables.blacklists)?;
            if more.options.is_empty() || same_texts(&more.options, &current) {
                break;
            }
            current = more.options;
        }
        error!(answer = %label, "answer lost during traceback");
        Ok(Level::Lost(label))
    }

    fn take(&mut self, option: DiscoveredOption) -> FormResult<Level> {
        if is_leaf(&option.locator) {
            self.io.click(&option.locator)?;
            info!(option = %option.text, "multiselect leaf selected");
            return Ok(Level::Done);
        }
        debug!(option = %option.text, "descending into multiselect option");
        Ok(Level::Descend(option.locator))
    }

    /// Locator of the last (or first) option still unique in the page.
    fn last_unique(&mut self, options: &[DiscoveredOption], from_end: bool) -> FormResult<Option<String>> {
        let doc = self.io.capture_now()?;
        let unique = |o: &&DiscoveredOption| is_unique(&doc, &o.locator);
        let found = if from_end { options.iter().rev().find(unique) } else { options.iter().find(unique) };
        Ok(found.map(|o| o.locator.clone()))
    }
}

fn same_texts(a: &[DiscoveredOption], b: &[DiscoveredOption]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.text == y.text)
}
