use tracing::{debug, warn};

use crate::config::keywords::KeywordTables;
use crate::config::thresholds::Thresholds;
use crate::dom::document::Document;
use crate::extract::context::ExtractionContext;
use crate::extract::labels::attribute_value_contains;
use crate::extract::page_model::{
    DateFormat, FieldDescriptor, FieldOptions, FieldType, SectionCategory, SectionTag, Subtype, UploadKind,
};
use crate::text::matching::{MatchOpts, any_matches, matches_any};
use crate::text::normalize::word_count;
use crate::text::similarity::match_percentage;

/// Substring, case-insensitive, whitespace ignored: the default way a field is
/// compared against identifier tables.
const LOOSE: MatchOpts = MatchOpts { exact: false, case_sensitive: false, ignore_whitespace: true };
const STRICT_CASE: MatchOpts = MatchOpts { exact: false, case_sensitive: true, ignore_whitespace: true };

const DATE_VARIANTS: &[(DateFormat, &[&str])] = &[
    (DateFormat::MonthDayYear, &["MM/DD/YYYY", "MM-DD-YYYY", "month.day.year", "month-day-year"]),
    (DateFormat::DayMonthYear, &["DD/MM/YYYY", "DD-MM-YYYY", "day.month.year", "day-month-year"]),
    (DateFormat::MonthYear, &["MM/YYYY", "Month/Year", "Month Year", "month-year"]),
    (DateFormat::Day, &["DD", "Day", ".day", "-day"]),
    (DateFormat::Month, &["MM", "Month", ".month", "-month"]),
    (DateFormat::Year, &["YYYY", "Year", ".year"]),
];

/// Checkbox labels this short can still describe a section flag.
const FLAG_LABEL_WORDS: usize = 8;
/// Currently-working/enrolled checkboxes with labels this short stay unmerged.
const MERGE_EXEMPT_LABEL_WORDS: usize = 5;

fn mentions<S: AsRef<str>>(field: &FieldDescriptor, needles: &[S]) -> bool {
    any_matches(field.search_values(), needles, LOOSE)
}

fn labels_shorter_than(field: &FieldDescriptor, words: usize) -> bool {
    field.labels().into_iter().flatten().all(|l| word_count(l) < words)
}

fn attribute_mentions<S: AsRef<str>>(doc: &Document, field: &FieldDescriptor, needles: &[S]) -> bool {
    field.node.is_some_and(|n| attribute_value_contains(doc, n, needles))
}

/// Turns raw descriptors into classified ones: verification digits, dates,
/// radio/checkbox groups, repeated sections and uploads.
pub struct Classifier<'a> {
    tables: &'a KeywordTables,
    thresholds: &'a Thresholds,
}

impl<'a> Classifier<'a> {
    pub fn new(tables: &'a KeywordTables, thresholds: &'a Thresholds) -> Self {
        Self { tables, thresholds }
    }

    /// Classify `field` against the fields kept so far. `None` means the field
    /// was merged into `existing` or dropped.
    pub fn synchronize(
        &self,
        doc: &Document,
        mut field: FieldDescriptor,
        existing: &mut [FieldDescriptor],
        ctx: &mut ExtractionContext,
    ) -> Option<FieldDescriptor> {
        let ids = &self.tables.field_identifiers;

        if matches!(field.field_type, FieldType::Text | FieldType::Number)
            && (mentions(&field, &ids.verification)
                || field.placeholder.as_deref().is_some_and(|p| p.contains("###")))
        {
            field.options = FieldOptions::Verification { ordinal: ctx.next_verification_digit() };
        }

        if self.is_date_field(&field) {
            field.field_type = if field.field_type == FieldType::List { FieldType::Datelist } else { FieldType::Date };
        }

        if field.field_type.is_choice() && self.merge_into(&field, existing) {
            return None;
        }

        let label_words = word_count(field.label_tag.as_deref().or(field.label_text.as_deref()).unwrap_or(""));
        let label_within_limit = label_words <= self.thresholds.section_label_words;
        if label_within_limit && !self.assign_section(doc, &mut field, ctx) {
            return None;
        }

        if matches!(field.field_type, FieldType::Date | FieldType::Datelist) {
            self.tag_date(&mut field, ctx, label_within_limit);
        }

        if matches!(field.tag.as_str(), "input" | "button")
            && (field.field_type == FieldType::File
                || attribute_mentions(doc, &field, &ids.resume)
                || mentions(&field, &ids.upload_file))
        {
            field.field_type = FieldType::File;
            if mentions(&field, &ids.cloud_or_manual_upload) {
                debug!(label = field.display_label(), "cloud upload field dropped");
                return None;
            }
            let upload = if mentions(&field, &ids.resume) || attribute_mentions(doc, &field, &ids.resume) {
                UploadKind::Resume
            } else {
                UploadKind::Other
            };
            field.options = FieldOptions::Upload { upload };
        }

        Some(field)
    }

    // ========================================================================
    // Dates
    // ========================================================================

    fn is_date_field(&self, field: &FieldDescriptor) -> bool {
        let ids = &self.tables.field_identifiers;
        if !matches!(field.field_type, FieldType::Text | FieldType::List | FieldType::Date) {
            return false;
        }
        if !mentions(field, &ids.date) {
            return false;
        }
        let long_date_label = field.labels().into_iter().flatten().any(|l| {
            ids.date.iter().any(|d| l.contains(d.as_str())) && word_count(l) > self.thresholds.date_label_words
        });
        !long_date_label && !mentions(field, &ids.date_misidentifiers)
    }

    fn tag_date(&self, field: &mut FieldDescriptor, ctx: &ExtractionContext, label_within_limit: bool) {
        let ids = &self.tables.field_identifiers;
        let format = date_base_format(field);

        let is_start = mentions(field, &ids.start_date)
            || any_matches(field.search_values(), &ids.start_date_case_sensitive, STRICT_CASE);
        let is_end = !is_start
            && (mentions(field, &ids.end_date)
                || any_matches(field.search_values(), &ids.end_date_case_sensitive, STRICT_CASE));

        let entry = ctx.current_entry().filter(|_| label_within_limit);
        let (category, ordinal) = match entry {
            Some(entry) if is_start || is_end => entry,
            _ => (SectionCategory::Other, 0),
        };
        let subtype = match (is_start, is_end, category) {
            (true, _, _) => Subtype::StartDate,
            (_, true, SectionCategory::Education) => Subtype::ExpectedEndDate,
            (_, true, _) => Subtype::EndDate,
            _ => Subtype::Unspecified,
        };
        field.options = FieldOptions::Section(SectionTag { category, ordinal, subtype, format });
    }

    // ========================================================================
    // Radio/checkbox groups
    // ========================================================================

    fn merge_exempt(&self, field: &FieldDescriptor) -> bool {
        let ids = &self.tables.field_identifiers;
        (mentions(field, &ids.currently_working) || mentions(field, &ids.currently_enrolled))
            && labels_shorter_than(field, MERGE_EXEMPT_LABEL_WORDS)
    }

    fn same_group(&self, a: &FieldDescriptor, b: &FieldDescriptor) -> bool {
        let keys = |f: &FieldDescriptor| {
            [
                f.label_text.clone(),
                f.label_attribute.clone(),
                f.label_custom.clone(),
                f.name.clone(),
                f.id.clone(),
                f.id_custom.clone(),
            ]
        };
        let shared_key = keys(a)
            .into_iter()
            .zip(keys(b))
            .any(|(x, y)| x.is_some_and(|x| !x.is_empty() && Some(&x) == y.as_ref()));
        shared_key
            || a.ids().into_iter().zip(b.ids()).any(|(x, y)| match (x, y) {
                (Some(x), Some(y)) if !x.is_empty() && !y.is_empty() => {
                    match_percentage(x, y) >= self.thresholds.id_merge_similarity
                }
                _ => false,
            })
    }

    /// Fold `field` into the first existing field of the same question.
    fn merge_into(&self, field: &FieldDescriptor, existing: &mut [FieldDescriptor]) -> bool {
        if self.merge_exempt(field) {
            return false;
        }
        let Some(target) = existing
            .iter_mut()
            .find(|e| e.field_type == field.field_type && self.same_group(field, e))
        else {
            return false;
        };
        if let FieldOptions::Choices { items } = &mut target.options {
            for option in field.options.choices() {
                if !items.iter().any(|o| o.text == option.text) {
                    items.push(option.clone());
                }
            }
        } else if !field.options.choices().is_empty() {
            target.options = field.options.clone();
        }
        target.label_tag = None;
        debug!(into = target.display_label(), "choice merged into existing group");
        true
    }

    // ========================================================================
    // Repeated sections
    // ========================================================================

    /// Tag work/education members. `false` drops the field: its subtype is
    /// already filled for every profile entry, or it is hidden.
    fn assign_section(&self, doc: &Document, field: &mut FieldDescriptor, ctx: &mut ExtractionContext) -> bool {
        let ids = &self.tables.field_identifiers;
        let can_open = !matches!(
            field.field_type,
            FieldType::Radio | FieldType::Checkbox | FieldType::Textarea | FieldType::Date | FieldType::Datelist
        );

        if ctx.work.opener.is_none() {
            if mentions(field, &ids.job_title) {
                ctx.work.opener = Some(ids.job_title.clone());
            } else if mentions(field, &ids.company) {
                ctx.work.opener = Some(ids.company.clone());
            }
        }
        if ctx.education.opener.is_none() {
            if mentions(field, &ids.school) {
                ctx.education.opener = Some(ids.school.clone());
            } else if mentions(field, &ids.degree) {
                ctx.education.opener = Some(ids.degree.clone());
            }
        }

        if let Some(opener) = ctx.work.opener.clone() {
            if can_open && mentions(field, &opener) {
                ctx.open_section(SectionCategory::WorkExperience);
            }
            let subtype = if can_open && mentions(field, &ids.job_title) {
                Some(Subtype::JobTitle)
            } else if can_open && mentions(field, &ids.company) {
                Some(Subtype::Company)
            } else if can_open && mentions(field, &ids.location) {
                let work_location = field.ids().into_iter().flatten().any(|i| matches_any(i, &["work"], LOOSE))
                    || attribute_mentions(doc, field, &["work", "experience"]);
                work_location.then_some(Subtype::Location)
            } else if field.field_type == FieldType::Checkbox
                && mentions(field, &ids.currently_working)
                && ctx.last_section == Some(SectionCategory::WorkExperience)
                && labels_shorter_than(field, FLAG_LABEL_WORDS)
            {
                Some(Subtype::CurrentlyWorking)
            } else if mentions(field, &ids.role_description)
                && (field.field_type == FieldType::Textarea || (field.field_type == FieldType::Text && !field.required))
            {
                Some(Subtype::RoleDescription)
            } else {
                None
            };
            if let Some(subtype) = subtype {
                if !self.claim(field, SectionCategory::WorkExperience, subtype, ctx) {
                    return false;
                }
            }
        }

        if let Some(opener) = ctx.education.opener.clone() {
            if can_open && mentions(field, &opener) {
                ctx.open_section(SectionCategory::Education);
            }
            let subtype = if can_open && mentions(field, &ids.school) {
                Some(Subtype::School)
            } else if can_open && mentions(field, &ids.degree) {
                Some(Subtype::Degree)
            } else if can_open && mentions(field, &ids.field_of_study) {
                Some(Subtype::FieldOfStudy)
            } else if can_open && mentions(field, &ids.gpa_or_grade) {
                Some(Subtype::Grade)
            } else if field.field_type == FieldType::Checkbox
                && mentions(field, &ids.currently_enrolled)
                && ctx.last_section == Some(SectionCategory::Education)
                && labels_shorter_than(field, FLAG_LABEL_WORDS)
            {
                Some(Subtype::Graduated)
            } else {
                None
            };
            if let Some(subtype) = subtype {
                if !self.claim(field, SectionCategory::Education, subtype, ctx) {
                    return false;
                }
            }
        }
        true
    }

    fn claim(&self, field: &mut FieldDescriptor, category: SectionCategory, subtype: Subtype, ctx: &mut ExtractionContext) -> bool {
        if field.field_type == FieldType::Hidden {
            return false;
        }
        let Some(ordinal) = ctx.claim(category, subtype) else {
            debug!(label = field.display_label(), ?subtype, "section field dropped past profile entries");
            return false;
        };
        field.options = FieldOptions::Section(SectionTag { category, ordinal, subtype, format: None });
        true
    }
}

/// Layout of a date field from its placeholder and metadata.
pub fn date_base_format(field: &FieldDescriptor) -> Option<DateFormat> {
    let metadata = [
        field.placeholder.as_deref(),
        field.label_attribute.as_deref(),
        field.label_custom.as_deref(),
        field.id.as_deref(),
        field.id_custom.as_deref(),
        field.label_tag.as_deref(),
        field.label_text.as_deref(),
        field.name.as_deref(),
    ];

    for (format, variants) in DATE_VARIANTS {
        let placeholder_exact = field
            .placeholder
            .as_deref()
            .is_some_and(|p| matches_any(p, variants, MatchOpts::EXACT));
        if placeholder_exact || any_matches(metadata, variants, STRICT_CASE) {
            return Some(*format);
        }
    }

    let flat = metadata.into_iter().flatten().collect::<Vec<_>>().join(" ");
    let (mut day, mut month, mut year) = (flat.contains("DD"), flat.contains("MM"), flat.contains("YYYY"));
    if !(day || month || year) {
        let lower = flat.to_lowercase();
        (day, month, year) = (lower.contains("day"), lower.contains("month"), lower.contains("year"));
    }

    match (day, month, year) {
        (false, false, false) if field.input_type.as_deref() == Some("text") => Some(DateFormat::MonthDayYear),
        (false, false, false) => {
            warn!(label = field.display_label(), "unable to determine date format");
            None
        }
        (true, true, true) => Some(DateFormat::MonthDayYear),
        (_, true, true) => Some(DateFormat::MonthYear),
        (true, false, false) => Some(DateFormat::Day),
        (false, true, false) => Some(DateFormat::Month),
        (false, false, true) => Some(DateFormat::Year),
        _ => None,
    }
}

/// Apply the radio/checkbox grouping step to an already extracted list.
/// Running it on its own output changes nothing.
pub fn merge_choice_groups(
    fields: Vec<FieldDescriptor>,
    tables: &KeywordTables,
    thresholds: &Thresholds,
) -> Vec<FieldDescriptor> {
    let classifier = Classifier::new(tables, thresholds);
    let mut merged: Vec<FieldDescriptor> = Vec::with_capacity(fields.len());
    for field in fields {
        if field.field_type.is_choice() && classifier.merge_into(&field, &mut merged) {
            continue;
        }
        merged.push(field);
    }
    merged
}
