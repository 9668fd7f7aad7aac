use tracing::{debug, info};

use crate::error::FormResult;
use crate::extract::page_model::{FieldDescriptor, SectionCategory};
use crate::resolve::decision::{Decision, FieldOutcome};
use crate::resolve::interact::{RevealScan, RevealedOptions};
use crate::resolve::ranking::rank;
use crate::resolve::resolver::{FieldResolver, unresolved};
use crate::text::matching::{MatchOpts, any_matches, matches_any};
use crate::text::similarity::match_percentage;

const LOOSE: MatchOpts = MatchOpts { exact: false, case_sensitive: false, ignore_whitespace: true };
const EXACT_LOOSE: MatchOpts = MatchOpts { exact: true, case_sensitive: false, ignore_whitespace: true };

impl FieldResolver<'_, '_> {
    /// Search terms for an education list, each with the option texts it is
    /// expected to surface.
    pub(super) fn search_candidates(&self, field: &FieldDescriptor) -> Vec<(String, Vec<String>)> {
        let Some(tag) = field.section().filter(|t| t.category == SectionCategory::Education) else {
            return Vec::new();
        };
        let tables = &self.engine.tables().education.search_candidates;
        tag.ordinal
            .checked_sub(1)
            .and_then(|i| tables.get(i))
            .and_then(|by_subtype| by_subtype.get(tag.subtype.profile_key()))
            .map(|terms| terms.iter().map(|(t, e)| (t.clone(), e.clone())).collect())
            .unwrap_or_default()
    }

    /// Open the list; when nothing shows and the control takes input, type
    /// each search term until one surfaces an expected option.
    pub(super) fn collect_list_options(
        &mut self,
        field: &FieldDescriptor,
        xpath: &str,
        scan: RevealScan<'_>,
    ) -> FormResult<RevealedOptions> {
        let blacklists = &self.engine.tables().blacklists;
        let revealed = self.io.reveal_options(xpath, scan, blacklists)?;
        if !revealed.options.is_empty() || field.tag != "input" {
            return Ok(revealed);
        }

        let school_match = self.engine.thresholds().school_match;
        for (term, expected) in self.search_candidates(field) {
            let found = self.io.search_options(xpath, &term, scan, blacklists)?;
            let hit = found
                .options
                .iter()
                .any(|o| expected.iter().any(|e| match_percentage(&o.text, e) >= school_match));
            if hit {
                debug!(term = %term, options = found.options.len(), "search term surfaced options");
                return Ok(found);
            }
        }
        Ok(revealed)
    }

    /// The list already shows a selection that should not be redone.
    fn keeps_selection(&self, field: &FieldDescriptor, texts: &[String]) -> bool {
        let tables = self.engine.tables();
        let shown = [field.placeholder.as_deref(), field.value.as_deref()];
        let selected = shown.into_iter().flatten().any(|s| {
            texts.iter().any(|t| t == s) && !matches_any(s, &tables.blacklists.options_placeholder, MatchOpts::SUBSTRING)
        });
        let escape = &tables.escape_refresh;
        selected
            && (any_matches(field.search_values(), &escape.dynamic_list_partial, LOOSE)
                || any_matches(field.search_values(), &escape.dynamic_list_full, EXACT_LOOSE))
    }

    /// Lists whose options only exist once opened: reveal, choose, click.
    /// `answer` fixes the option text up front (dates, known values).
    pub(super) fn resolve_dynamic_list(
        &mut self,
        field: &FieldDescriptor,
        xpath: &str,
        answer: Option<String>,
    ) -> FormResult<FieldOutcome> {
        let scan = RevealScan { owner: Some(xpath), ..RevealScan::default() };
        let revealed = self.collect_list_options(field, xpath, scan)?;
        if revealed.options.is_empty() {
            self.io.browser().blur()?;
            return Ok(unresolved(field, "list revealed no options"));
        }
        let texts = revealed.texts();
        info!(label = field.display_label(), options = texts.len(), "list options revealed");

        if self.keeps_selection(field, &texts) {
            self.io.browser().blur()?;
            info!(label = field.display_label(), "list already answered");
            return Ok(FieldOutcome::Resolved);
        }

        let index = match answer {
            Some(answer) => texts
                .iter()
                .position(|t| *t == answer)
                .or_else(|| rank(&texts, &answer).first().map(|r| r.index)),
            None => match self.engine.resolve(field, &texts)? {
                Decision::Select(chosen) => chosen.first().copied(),
                _ => None,
            },
        };
        let Some(option) = index.and_then(|i| revealed.options.get(i)) else {
            self.io.browser().blur()?;
            return Ok(FieldOutcome::Skipped);
        };

        let locators = self.io.click_and_capture(&option.locator, xpath)?;
        info!(option = %option.text, revealed = locators.len(), "list option selected");
        if locators.is_empty() {
            Ok(FieldOutcome::Resolved)
        } else {
            Ok(FieldOutcome::Revealed(locators))
        }
    }
}
