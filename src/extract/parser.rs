use tracing::{debug, info};

use crate::config::keywords::KeywordTables;
use crate::config::thresholds::Thresholds;
use crate::dom::document::{Document, NodeId};
use crate::dom::xpath::select_unique;
use crate::extract::buttons::{extract_button, synchronize_button};
use crate::extract::classify::Classifier;
use crate::extract::context::{ExtractionContext, SectionLimits};
use crate::extract::fields::{ExtractOpts, extract_field, is_button_candidate, is_field_candidate, is_marked_hidden};
use crate::extract::links::extract_link;
use crate::extract::page_model::{FieldDescriptor, FieldType, PageMetadata, PageModel};
use crate::text::normalize::non_empty;

/// A parsed page together with the counters its sections were numbered with.
/// Revealed fields continue numbering from the same context.
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub model: PageModel,
    pub context: ExtractionContext,
}

/// Elements revealed by an interaction, to be merged into a parsed page.
#[derive(Debug, Clone, Copy)]
pub struct Reveal<'a> {
    /// Locators of the new elements in the current snapshot.
    pub locators: &'a [String],
    /// Fields are inserted starting at this position.
    pub index: usize,
    /// Carry the question of the field at `index - 1` as `label_parent`.
    pub include_parent_label: bool,
}

/// Builds a [`PageModel`] from a snapshot.
pub struct PageParser<'a> {
    tables: &'a KeywordTables,
    thresholds: &'a Thresholds,
    limits: SectionLimits,
}

impl<'a> PageParser<'a> {
    pub fn new(tables: &'a KeywordTables, thresholds: &'a Thresholds, limits: SectionLimits) -> Self {
        Self { tables, thresholds, limits }
    }

    pub fn parse(&self, doc: &Document, url: &str) -> PageModel {
        self.parse_page(doc, url).model
    }

    /// Full pass with a fresh context: fields, then buttons (which may fold
    /// into fields), then removal of leftover hidden fields, then links.
    pub fn parse_page(&self, doc: &Document, url: &str) -> ParsedPage {
        let mut context = ExtractionContext::new(self.limits);
        let classifier = Classifier::new(self.tables, self.thresholds);
        let blacklists = &self.tables.blacklists;

        let mut fields: Vec<FieldDescriptor> = Vec::new();
        for id in doc.all_elements() {
            if !is_field_candidate(doc, id) || is_marked_hidden(doc, id) {
                continue;
            }
            let Some(raw) = extract_field(doc, id, blacklists, ExtractOpts::default()) else {
                continue;
            };
            if let Some(field) = classifier.synchronize(doc, raw, &mut fields, &mut context) {
                fields.push(field);
            }
        }

        let mut buttons = Vec::new();
        for id in doc.all_elements() {
            if !is_button_candidate(doc, id) {
                continue;
            }
            let Some(raw) = extract_button(doc, id, blacklists, false) else {
                continue;
            };
            if let Some(button) = synchronize_button(doc, raw, &mut fields, &self.tables.field_identifiers) {
                buttons.push(button);
            }
        }

        fields.retain(|f| f.field_type != FieldType::Hidden);

        let identifiers = self.tables.navigation.link_identifiers();
        let links = doc
            .elements_by_tag(&["a"])
            .filter_map(|id| extract_link(doc, id, &identifiers))
            .collect();

        let model = PageModel { metadata: metadata(doc, url), fields, buttons, links };
        info!(
            fields = model.fields.len(),
            buttons = model.buttons.len(),
            links = model.links.len(),
            "page parsed"
        );
        ParsedPage { model, context }
    }

    /// Merge elements revealed by an interaction into `page`. Fields skip the
    /// blacklists and go in at `reveal.index`; buttons are appended. Returns
    /// how many descriptors were added.
    pub fn insert_revealed(&self, doc: &Document, page: &mut ParsedPage, reveal: Reveal<'_>) -> usize {
        let classifier = Classifier::new(self.tables, self.thresholds);
        let nodes: Vec<NodeId> = reveal
            .locators
            .iter()
            .filter_map(|l| select_unique(doc, l))
            .filter(|n| !is_marked_hidden(doc, *n))
            .collect();

        let label_parent = reveal
            .include_parent_label
            .then(|| reveal.index.checked_sub(1))
            .flatten()
            .and_then(|i| page.model.fields.get(i))
            .map(|f| f.labels().into_iter().flatten().collect::<Vec<_>>().join("\n"))
            .filter(|l| !l.is_empty());

        let mut position = reveal.index.min(page.model.fields.len());
        let mut inserted = 0;
        for &id in nodes.iter().filter(|n| is_field_candidate(doc, **n)) {
            let opts = ExtractOpts { force_insert: true, label_parent: label_parent.as_deref() };
            let Some(raw) = extract_field(doc, id, &self.tables.blacklists, opts) else {
                continue;
            };
            if let Some(field) = classifier.synchronize(doc, raw, &mut page.model.fields, &mut page.context) {
                debug!(label = field.display_label(), position, "revealed field inserted");
                page.model.fields.insert(position, field);
                position += 1;
                inserted += 1;
            }
        }

        for &id in nodes.iter().filter(|n| is_button_candidate(doc, **n)) {
            let Some(raw) = extract_button(doc, id, &self.tables.blacklists, true) else {
                continue;
            };
            let ids = &self.tables.field_identifiers;
            if let Some(button) = synchronize_button(doc, raw, &mut page.model.fields, ids) {
                page.model.buttons.push(button);
                inserted += 1;
            }
        }
        info!(inserted, "revealed elements synchronized");
        inserted
    }
}

fn metadata(doc: &Document, url: &str) -> PageMetadata {
    let title = doc
        .elements_by_tag(&["title"])
        .next()
        .map(|t| doc.text_content(t).trim().to_string())
        .unwrap_or_default();
    let description = doc
        .elements_by_tag(&["meta"])
        .find(|m| doc.attr(*m, "name").is_some_and(|n| n.eq_ignore_ascii_case("description")))
        .and_then(|m| non_empty(doc.attr(m, "content")).map(str::to_string));
    PageMetadata { title, url: url.to_string(), description }
}
