use std::path::Path;

use serde_json::Value;

use crate::error::{FormError, FormResult};
use crate::extract::context::SectionLimits;
use crate::extract::page_model::{SectionCategory, SectionTag};

/// Top-level profile keys read by the text rules.
pub mod keys {
    pub const EMAIL: &str = "Email";
    pub const PASSWORD: &str = "Password";
    pub const FIRST_NAME: &str = "First Name";
    pub const LAST_NAME: &str = "Last Name";
    pub const FULL_NAME: &str = "Name / Full Name / Signature";
    pub const POSTAL_CODE: &str = "Postal_code";
    pub const ADDRESS_LINE_1: &str = "Address Line 1";
    pub const ADDRESS_LINE_2: &str = "Address Line 2";
    pub const CITY: &str = "City";
    pub const STATE: &str = "State";
    pub const PHONE_EXTENSION: &str = "Phone Extension";
    pub const PHONE_NUMBER: &str = "Phone Number";
    pub const PHONE_DEVICE_TYPE: &str = "Phone Device Type";
    pub const COUNTRY: &str = "Country";
    pub const LOCATION: &str = "Location";
    pub const LINKEDIN: &str = "LinkedIn Profile";
    pub const GITHUB: &str = "GitHub Profile";
    pub const SALARY: &str = "Salary Expectation";
    pub const RESUME: &str = "Resume";
}

/// Read-only applicant data. Repeated sections are arrays under
/// `Work Experience` and `Education`, indexed by section ordinal.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    data: Value,
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

impl Profile {
    pub fn from_value(data: Value) -> Self {
        Self { data }
    }

    pub fn from_json(content: &str, origin: &str) -> FormResult<Self> {
        let data = serde_json::from_str(content).map_err(|e| FormError::JsonParse {
            context: format!("profile {}", origin),
            source: e,
        })?;
        Ok(Self { data })
    }

    pub fn load(path: impl AsRef<Path>) -> FormResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content, &path.display().to_string())
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.data.get(key).and_then(render)
    }

    /// Like [`Profile::text`], for values a rule cannot do without.
    pub fn require_text(&self, key: &str) -> FormResult<String> {
        self.text(key).ok_or_else(|| FormError::Profile(format!("missing '{}'", key)))
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(truthy)
    }

    pub fn entries(&self, category: SectionCategory) -> &[Value] {
        category
            .profile_key()
            .and_then(|k| self.data.get(k))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn section_len(&self, category: SectionCategory) -> usize {
        self.entries(category).len()
    }

    /// Entry a section tag points at. Ordinals are 1-based.
    pub fn section_entry(&self, tag: &SectionTag) -> Option<&Value> {
        let index = tag.ordinal.checked_sub(1)?;
        self.entries(tag.category).get(index)
    }

    pub fn section_text(&self, tag: &SectionTag) -> Option<String> {
        self.section_entry(tag)?.get(tag.subtype.profile_key()).and_then(render)
    }

    pub fn section_flag(&self, tag: &SectionTag) -> Option<bool> {
        self.section_entry(tag)?.get(tag.subtype.profile_key()).and_then(truthy)
    }

    /// Upper bounds for section ordinals during extraction.
    pub fn limits(&self) -> SectionLimits {
        SectionLimits {
            work_experience: self.section_len(SectionCategory::WorkExperience),
            education: self.section_len(SectionCategory::Education),
        }
    }

    pub fn resume_path(&self) -> Option<String> {
        self.text(keys::RESUME)
    }

    /// File name component of the resume path, searched for in page text
    /// to tell whether an upload already happened.
    pub fn resume_file_name(&self) -> Option<String> {
        let path = self.resume_path()?;
        Path::new(&path).file_name().map(|n| n.to_string_lossy().into_owned())
    }
}
