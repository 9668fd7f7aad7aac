use crate::extract::page_model::{FieldDescriptor, FieldType, SectionCategory};
use crate::profile::{Profile, keys};
use crate::text::matching::{MatchOpts, any_matches};

const LOOSE: MatchOpts = MatchOpts { exact: false, case_sensitive: false, ignore_whitespace: true };
const EXACT_LOOSE: MatchOpts = MatchOpts { exact: true, case_sensitive: false, ignore_whitespace: true };

/// Deterministic answer for a text-like field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRule {
    Answer(String),
    /// An optional field the applicant should leave empty.
    LeaveEmpty,
    NoRule,
}

struct Keys<'a> {
    field: &'a FieldDescriptor,
}

impl Keys<'_> {
    fn label(&self, needles: &[&str], opts: MatchOpts) -> bool {
        any_matches(self.field.labels(), needles, opts)
    }

    fn search(&self, needles: &[&str], opts: MatchOpts) -> bool {
        any_matches(self.field.search_values(), needles, opts)
    }

    fn search_or_placeholder(&self, needles: &[&str]) -> bool {
        let values = self.field.search_values().into_iter().chain([self.field.placeholder.as_deref()]);
        any_matches(values, needles, MatchOpts::SUBSTRING)
    }

    fn preferred_and_optional(&self) -> bool {
        !self.field.required && self.search(&["preferred"], MatchOpts::SUBSTRING)
    }
}

/// Profile key a field's label points at. Checked in order; the first
/// matching rule decides even when the profile lacks the value.
fn profile_key(field: &FieldDescriptor) -> Result<Option<&'static str>, ()> {
    let k = Keys { field };
    let key = if k.label(&["Email"], MatchOpts::CASE_SENSITIVE) {
        keys::EMAIL
    } else if field.field_type == FieldType::Password || k.label(&["Password"], MatchOpts::CASE_SENSITIVE) {
        keys::PASSWORD
    } else if k.search(&["first name"], LOOSE) {
        if k.preferred_and_optional() {
            return Err(());
        }
        keys::FIRST_NAME
    } else if k.search(&["last name"], LOOSE) {
        keys::LAST_NAME
    } else if k.search(&["Name", "Signature"], MatchOpts::CASE_SENSITIVE) && !k.search(&["Middle"], MatchOpts::SUBSTRING) {
        if k.preferred_and_optional() {
            return Err(());
        }
        keys::FULL_NAME
    } else if k.search(&["postal code", "zip code"], LOOSE) {
        keys::POSTAL_CODE
    } else if k.search(&["address line 2"], LOOSE) {
        keys::ADDRESS_LINE_2
    } else if k.search(&["address line 1", "address line"], LOOSE) {
        keys::ADDRESS_LINE_1
    } else if k.label(&["City"], MatchOpts::CASE_SENSITIVE) {
        keys::CITY
    } else if k.label(&["State"], MatchOpts::CASE_SENSITIVE) {
        keys::STATE
    } else if k.search(&["phone extension"], LOOSE) {
        keys::PHONE_EXTENSION
    } else if k.search(&["phone number", "mobile number", "mobile phone"], LOOSE) || k.search(&["phone", "phone*"], EXACT_LOOSE) {
        keys::PHONE_NUMBER
    } else if k.label(&["Country"], MatchOpts::CASE_SENSITIVE) {
        keys::COUNTRY
    } else if k.label(&["Location"], MatchOpts::CASE_SENSITIVE) {
        keys::LOCATION
    } else if k.label(&["Address"], MatchOpts::CASE_SENSITIVE) {
        keys::ADDRESS_LINE_1
    } else if k.search_or_placeholder(&["linkedin"]) {
        keys::LINKEDIN
    } else if k.search_or_placeholder(&["github"]) {
        keys::GITHUB
    } else if field.required && k.search_or_placeholder(&["salary"]) && k.search_or_placeholder(&["desired", "expect"]) {
        keys::SALARY
    } else {
        return Ok(None);
    };
    Ok(Some(key))
}

/// Section-tagged fields read their profile entry; the rest go through the
/// label rules.
pub fn predefined_text(field: &FieldDescriptor, profile: &Profile) -> TextRule {
    if let Some(tag) = field.section().filter(|t| t.category != SectionCategory::Other) {
        return profile.section_text(tag).map_or(TextRule::NoRule, TextRule::Answer);
    }
    match profile_key(field) {
        Err(()) => TextRule::LeaveEmpty,
        Ok(Some(key)) => profile.text(key).map_or(TextRule::NoRule, TextRule::Answer),
        Ok(None) => TextRule::NoRule,
    }
}
