use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::extract::page_model::{DateFormat, FieldDescriptor, SectionCategory, SectionTag, Subtype};
use crate::profile::Profile;

/// Layout profile dates are stored in.
pub const PROFILE_DATE_FORMAT: &str = "%m/%d/%Y";

/// What to enter into a date field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateAnswer {
    /// Digits in the field's layout, without separators.
    Value(String),
    Skip,
    Fail(String),
}

fn pattern(format: DateFormat) -> &'static str {
    match format {
        DateFormat::MonthDayYear => "%m%d%Y",
        DateFormat::DayMonthYear => "%d%m%Y",
        DateFormat::MonthYear => "%m%Y",
        DateFormat::Day => "%d",
        DateFormat::Month => "%m",
        DateFormat::Year => "%Y",
    }
}

pub fn format_date(date: NaiveDate, format: DateFormat) -> String {
    date.format(pattern(format)).to_string()
}

/// Parse a profile date. `MM/YYYY` entries are read as the first of the month.
pub fn parse_profile_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, PROFILE_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(&format!("01/{}", raw), "%d/%m/%Y"))
        .ok()
}

/// Date to enter for `field`, reformatted to its base layout.
///
/// Section dates come from the profile entry; untagged dates get today.
/// A field without a detectable layout is skipped when optional and
/// assumed to be `MMDDYYYY` otherwise.
pub fn date_answer(field: &FieldDescriptor, profile: &Profile, today: NaiveDate) -> DateAnswer {
    let Some(tag) = field.section() else {
        return DateAnswer::Fail("date field without a section tag".to_string());
    };
    let format = match tag.format {
        Some(format) => format,
        None if !field.required => return DateAnswer::Skip,
        None => DateFormat::MonthDayYear,
    };

    match tag.category {
        SectionCategory::Other if tag.subtype == Subtype::Unspecified => {
            DateAnswer::Value(format_date(today, format))
        }
        SectionCategory::Other if !field.required => DateAnswer::Skip,
        SectionCategory::Other => DateAnswer::Fail(format!("no profile entry for {:?} date", tag.subtype)),
        _ => profile_date(tag, profile, format),
    }
}

fn profile_date(tag: &SectionTag, profile: &Profile, format: DateFormat) -> DateAnswer {
    let Some(raw) = profile.section_text(tag) else {
        return DateAnswer::Fail(format!("profile has no {:?} #{} {:?}", tag.category, tag.ordinal, tag.subtype));
    };
    match parse_profile_date(&raw) {
        Some(date) => {
            let value = format_date(date, format);
            debug!(raw = %raw, value = %value, "profile date reformatted");
            DateAnswer::Value(value)
        }
        None => {
            warn!(raw = %raw, "profile date is not MM/DD/YYYY");
            DateAnswer::Fail(format!("unreadable profile date '{}'", raw))
        }
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
