use tracing::debug;

use crate::config::keywords::KeywordTables;
use crate::config::thresholds::Thresholds;
use crate::extract::page_model::{FieldDescriptor, SectionCategory, Subtype};
use crate::profile::{Profile, keys};
use crate::text::matching::{MatchOpts, any_matches, find_option, find_option_prefix};
use crate::text::similarity::best_match;

const LOOSE: MatchOpts = MatchOpts { exact: false, case_sensitive: false, ignore_whitespace: true };
const LOOSE_CASE: MatchOpts = MatchOpts { exact: false, case_sensitive: true, ignore_whitespace: true };
const EXACT_LOOSE: MatchOpts = MatchOpts { exact: true, case_sensitive: false, ignore_whitespace: true };

const DISABILITY_DENIAL_PREFIXES: &[&str] = &["No, I don't", "No, I do not", "No, I don’t"];

/// Fixed answers for a checkbox group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiRule {
    Select(Vec<usize>),
    /// The checkbox must stay as it is.
    Leave,
    Undecided,
}

/// Label rules, profile lookups and preference tables. Everything here is
/// deterministic: no page access, no oracle.
pub struct RuleBook<'a> {
    tables: &'a KeywordTables,
    thresholds: &'a Thresholds,
    profile: &'a Profile,
}

impl<'a> RuleBook<'a> {
    pub fn new(tables: &'a KeywordTables, thresholds: &'a Thresholds, profile: &'a Profile) -> Self {
        Self { tables, thresholds, profile }
    }

    fn labels_mention<S: AsRef<str>>(&self, field: &FieldDescriptor, needles: &[S], opts: MatchOpts) -> bool {
        any_matches(field.labels(), needles, opts)
    }

    fn mentions<S: AsRef<str>>(&self, field: &FieldDescriptor, needles: &[S], opts: MatchOpts) -> bool {
        any_matches(field.search_values(), needles, opts)
    }

    fn closest<S: AsRef<str>>(options: &[S], target: &str) -> Option<usize> {
        best_match(target, options).map(|(i, _, _)| i)
    }

    fn is_yes_no<S: AsRef<str>>(options: &[S]) -> bool {
        options.len() >= 2
            && options[0].as_ref().trim_start().starts_with("Yes")
            && options[1].as_ref().trim_start().starts_with("No")
    }

    // ========================================================================
    // Single choice
    // ========================================================================

    /// Fixed answer for a radio group or dropdown, by option count first and
    /// then by rules that apply to any count.
    pub fn single_choice<S: AsRef<str>>(&self, field: &FieldDescriptor, options: &[S]) -> Option<usize> {
        let found = match options.len() {
            0 => return None,
            1 => Some(0),
            2 => self.two_options(field, options),
            3 => self.three_options(field, options),
            _ => self.many_options(field, options),
        };
        let found = found.or_else(|| self.any_count(field, options));
        if let Some(index) = found {
            debug!(label = field.display_label(), option = options[index].as_ref(), "fixed rule answered");
        }
        found
    }

    fn two_options<S: AsRef<str>>(&self, field: &FieldDescriptor, options: &[S]) -> Option<usize> {
        let answers = &self.tables.answers;
        if self.mentions(field, &answers.agreement, LOOSE) && find_option_prefix(&options[..1], &["Yes", "I agree"]).is_some() {
            return Some(0);
        }
        if !Self::is_yes_no(options) {
            return None;
        }
        if self.labels_mention(field, &answers.yes_two_option, LOOSE) {
            return Some(0);
        }
        if self.labels_mention(field, &answers.no_two_option, LOOSE) {
            return Some(1);
        }
        if self.labels_mention(field, &answers.work_authorization, LOOSE) {
            let negated = self.labels_mention(field, &answers.work_authorization_negation, LOOSE);
            return Some(if negated { 1 } else { 0 });
        }
        None
    }

    fn three_options<S: AsRef<str>>(&self, field: &FieldDescriptor, options: &[S]) -> Option<usize> {
        let answers = &self.tables.answers;
        if Self::is_yes_no(options) {
            if self.labels_mention(field, &answers.yes_three_option, LOOSE) {
                return Some(0);
            }
            if self.labels_mention(field, &answers.no_three_option, LOOSE) {
                return Some(1);
            }
        }
        if self.mentions(field, &answers.disability, MatchOpts::SUBSTRING) {
            if find_option_prefix(&options[1..2], DISABILITY_DENIAL_PREFIXES).is_some() {
                return Some(1);
            }
            return Self::closest(options, &answers.disability_denial);
        }
        if self.mentions(field, &answers.hispanic, MatchOpts::SUBSTRING) {
            if options[1].as_ref().trim_start().starts_with("No") {
                return Some(1);
            }
            return find_option(options, &["No"], MatchOpts::EXACT)
                .or_else(|| find_option(options, &["Not hispanic or"], MatchOpts::SUBSTRING));
        }
        None
    }

    /// Preference tables: the first rule whose triggers match decides, even
    /// when none of its choices is offered.
    fn many_options<S: AsRef<str>>(&self, field: &FieldDescriptor, options: &[S]) -> Option<usize> {
        let rule = self.tables.answers.preferences.iter().find(|rule| {
            let opts = if rule.case_sensitive { MatchOpts::CASE_SENSITIVE } else { MatchOpts::SUBSTRING };
            self.mentions(field, &rule.triggers, opts)
        })?;
        let opts = if rule.exact { MatchOpts::EXACT } else { MatchOpts::SUBSTRING };
        let found = find_option(options, &rule.choices, opts);
        debug!(topic = %rule.topic, found = found.is_some(), "preference rule applied");
        found
    }

    fn any_count<S: AsRef<str>>(&self, field: &FieldDescriptor, options: &[S]) -> Option<usize> {
        let answers = &self.tables.answers;

        if let Some(tag) = field.section().filter(|t| t.category == SectionCategory::Education) {
            let expected = self.profile.section_text(tag)?;
            if let Some(exact) = options.iter().position(|o| o.as_ref() == expected) {
                return Some(exact);
            }
            return match tag.subtype {
                Subtype::School => match best_match(&expected, options) {
                    Some((i, _, score)) if score > self.thresholds.school_match => Some(i),
                    _ => Self::closest(options, "Other"),
                },
                Subtype::Degree | Subtype::FieldOfStudy => Self::closest(options, &expected),
                _ => None,
            };
        }

        if let Some(key) = self.location_key(field) {
            return self.profile.text(key).and_then(|v| Self::closest(options, &v));
        }
        if self.labels_mention(field, &["Phone Device Type", "Phone Type"], LOOSE) {
            return self.profile.text(keys::PHONE_DEVICE_TYPE).and_then(|v| Self::closest(options, &v));
        }
        if self.mentions(field, &["employed by"], MatchOpts::SUBSTRING)
            && self.mentions(field, &["subsidiar"], MatchOpts::SUBSTRING)
        {
            return find_option(options, &["No"], MatchOpts::CASE_SENSITIVE);
        }
        if self.mentions_salary(field) {
            return self.profile.text(keys::SALARY).and_then(|v| Self::closest(options, &v));
        }
        if self.mentions(field, &answers.relocation, MatchOpts::SUBSTRING)
            && !self.labels_mention(field, &answers.relocation_exclusions, MatchOpts::SUBSTRING)
        {
            return find_option_prefix(options, &["Yes"]);
        }
        None
    }

    /// Profile key of a City/State/Country question.
    fn location_key(&self, field: &FieldDescriptor) -> Option<&'static str> {
        if self.labels_mention(field, &["City"], LOOSE_CASE) {
            Some(keys::CITY)
        } else if self.labels_mention(field, &["State"], LOOSE_CASE) {
            Some(keys::STATE)
        } else if self.mentions(field, &["Country Territory", "Country/Territory"], LOOSE)
            || self.labels_mention(field, &["Country"], LOOSE_CASE)
        {
            Some(keys::COUNTRY)
        } else {
            None
        }
    }

    pub fn mentions_salary(&self, field: &FieldDescriptor) -> bool {
        let values = || field.search_values().into_iter().chain([field.placeholder.as_deref()]);
        any_matches(values(), &["salary"], MatchOpts::SUBSTRING)
            && any_matches(values(), &["desired", "expect"], MatchOpts::SUBSTRING)
    }

    // ========================================================================
    // Progressive (multiselect levels)
    // ========================================================================

    /// Exact profile matches only, for option lists that arrive level by
    /// level. Anything fuzzy waits until every option is known.
    pub fn progressive<S: AsRef<str>>(&self, field: &FieldDescriptor, options: &[S]) -> Option<usize> {
        if options.is_empty() {
            return None;
        }
        if let Some(tag) = field.section().filter(|t| t.category == SectionCategory::Education) {
            let expected = self.profile.section_text(tag);
            let exact = expected
                .as_deref()
                .and_then(|e| options.iter().position(|o| o.as_ref() == e));
            if exact.is_some() {
                return exact;
            }
            let alternatives = match tag.subtype {
                Subtype::Degree => &self.tables.education.degree_alternatives,
                Subtype::FieldOfStudy => &self.tables.education.field_of_study_alternatives,
                _ => return None,
            };
            let entry = alternatives.get(tag.ordinal.checked_sub(1)?)?;
            return find_option(options, entry, EXACT_LOOSE);
        }
        let key = self.location_key(field)?;
        let expected = self.profile.text(key)?;
        options.iter().position(|o| o.as_ref() == expected)
    }

    // ========================================================================
    // Checkbox groups
    // ========================================================================

    pub fn multi_choice<S: AsRef<str>>(&self, field: &FieldDescriptor, options: &[S]) -> MultiRule {
        let answers = &self.tables.answers;

        if let Some(tag) = field.section().filter(|t| t.category != SectionCategory::Other) {
            let flag = self.profile.section_flag(tag).unwrap_or(false);
            let wanted = match tag.category {
                SectionCategory::Education if self.mentions(field, &["current", "ongoing"], MatchOpts::SUBSTRING) => {
                    !flag
                }
                _ => flag,
            };
            return if wanted { MultiRule::Select(vec![0]) } else { MultiRule::Leave };
        }

        match options.len() {
            0 => MultiRule::Leave,
            1 if self.mentions(field, &answers.agreement, LOOSE) => MultiRule::Select(vec![0]),
            1 if self.mentions(field, &answers.preferred_name, LOOSE) => MultiRule::Leave,
            2 if self.mentions(field, &answers.agreement, LOOSE)
                && find_option_prefix(&options[..1], &["Yes", "I agree"]).is_some() =>
            {
                MultiRule::Select(vec![0])
            }
            n if n > 2 && self.mentions(field, &answers.disability, MatchOpts::SUBSTRING) => {
                if n == 3 && find_option_prefix(&options[1..2], DISABILITY_DENIAL_PREFIXES).is_some() {
                    MultiRule::Select(vec![1])
                } else {
                    Self::closest(options, &answers.disability_denial)
                        .map_or(MultiRule::Undecided, |i| MultiRule::Select(vec![i]))
                }
            }
            _ => MultiRule::Undecided,
        }
    }
}
