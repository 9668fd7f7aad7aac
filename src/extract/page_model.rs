use serde::{Deserialize, Serialize};

use crate::dom::document::NodeId;
use crate::locator::locator_model::Locator;

// ============================================================================
// Field classification
// ============================================================================

/// Interaction kind of a field. Raw input types that the resolver treats as
/// plain text keep their own variant so prompts can mention them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Select,
    Radio,
    Checkbox,
    List,
    Multiselect,
    Date,
    Datelist,
    File,
    Hidden,
    Button,
    Email,
    Password,
    Number,
    Url,
    Tel,
}

impl FieldType {
    /// Map an input `type` attribute or tag name. Unknown input types behave as text.
    pub fn from_raw(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "textarea" => FieldType::Textarea,
            "select" => FieldType::Select,
            "radio" => FieldType::Radio,
            "checkbox" => FieldType::Checkbox,
            "date" | "month" | "week" => FieldType::Date,
            "file" => FieldType::File,
            "hidden" => FieldType::Hidden,
            "button" => FieldType::Button,
            "email" => FieldType::Email,
            "password" => FieldType::Password,
            "number" => FieldType::Number,
            "url" => FieldType::Url,
            "tel" => FieldType::Tel,
            _ => FieldType::Text,
        }
    }

    pub fn is_choice(self) -> bool {
        matches!(self, FieldType::Radio | FieldType::Checkbox)
    }

    /// Types answered by typing a value.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            FieldType::Text
                | FieldType::Textarea
                | FieldType::Email
                | FieldType::Password
                | FieldType::Number
                | FieldType::Url
                | FieldType::Tel
        )
    }

    /// Types answered by revealing and clicking an option.
    pub fn is_dynamic_list(self) -> bool {
        matches!(self, FieldType::List | FieldType::Datelist | FieldType::Select)
    }
}

/// Repeated profile section a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionCategory {
    #[serde(rename = "Work Experience")]
    WorkExperience,
    #[serde(rename = "Education")]
    Education,
    #[serde(rename = "other")]
    Other,
}

impl SectionCategory {
    /// Top-level key of the matching profile array.
    pub fn profile_key(self) -> Option<&'static str> {
        match self {
            SectionCategory::WorkExperience => Some("Work Experience"),
            SectionCategory::Education => Some("Education"),
            SectionCategory::Other => None,
        }
    }
}

/// Entry key inside a section. Serialized names double as profile keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subtype {
    #[serde(rename = "Job Title")]
    JobTitle,
    #[serde(rename = "Company")]
    Company,
    #[serde(rename = "Location")]
    Location,
    #[serde(rename = "I currently work here")]
    CurrentlyWorking,
    #[serde(rename = "Role Description")]
    RoleDescription,
    #[serde(rename = "School or University")]
    School,
    #[serde(rename = "Degree")]
    Degree,
    #[serde(rename = "Field of Study or Major")]
    FieldOfStudy,
    #[serde(rename = "Overall Result (GPA) or Grade")]
    Grade,
    #[serde(rename = "Graduated")]
    Graduated,
    #[serde(rename = "From Start Date")]
    StartDate,
    #[serde(rename = "To End Date")]
    EndDate,
    #[serde(rename = "To End Date (Actual or Expected)")]
    ExpectedEndDate,
    #[serde(rename = "")]
    Unspecified,
}

impl Subtype {
    pub fn profile_key(self) -> &'static str {
        match self {
            Subtype::JobTitle => "Job Title",
            Subtype::Company => "Company",
            Subtype::Location => "Location",
            Subtype::CurrentlyWorking => "I currently work here",
            Subtype::RoleDescription => "Role Description",
            Subtype::School => "School or University",
            Subtype::Degree => "Degree",
            Subtype::FieldOfStudy => "Field of Study or Major",
            Subtype::Grade => "Overall Result (GPA) or Grade",
            Subtype::Graduated => "Graduated",
            Subtype::StartDate => "From Start Date",
            Subtype::EndDate => "To End Date",
            Subtype::ExpectedEndDate => "To End Date (Actual or Expected)",
            Subtype::Unspecified => "",
        }
    }
}

/// Layout a date field expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    #[serde(rename = "MMDDYYYY")]
    MonthDayYear,
    #[serde(rename = "DDMMYYYY")]
    DayMonthYear,
    #[serde(rename = "MMYYYY")]
    MonthYear,
    #[serde(rename = "DD")]
    Day,
    #[serde(rename = "MM")]
    Month,
    #[serde(rename = "YYYY")]
    Year,
}

/// Section membership of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTag {
    pub category: SectionCategory,
    /// 1-based entry index into the profile array; 0 for `other`.
    pub ordinal: usize,
    pub subtype: Subtype,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DateFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Resume,
    Other,
}

/// One radio/checkbox option of a merged group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub text: String,
    pub locator: String,
}

/// What a field's `options` slot holds, depending on its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldOptions {
    #[default]
    None,
    /// Radio/checkbox options in document order.
    Choices { items: Vec<ChoiceOption> },
    /// `<select>` option texts.
    List { items: Vec<String> },
    /// Attribute value carried by the options of a multiselect.
    Multiselect { identifier: String },
    Section(SectionTag),
    Upload { upload: UploadKind },
    Verification { ordinal: usize },
}

impl FieldOptions {
    pub fn section(&self) -> Option<&SectionTag> {
        match self {
            FieldOptions::Section(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn choices(&self) -> &[ChoiceOption] {
        match self {
            FieldOptions::Choices { items } => items,
            _ => &[],
        }
    }

    pub fn multiselect_identifier(&self) -> Option<&str> {
        match self {
            FieldOptions::Multiselect { identifier } => Some(identifier),
            _ => None,
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// One interactive form element of a parsed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub label_tag: Option<String>,
    pub label_text: Option<String>,
    pub label_attribute: Option<String>,
    pub label_custom: Option<String>,
    /// Question of the field whose answer revealed this one.
    pub label_parent: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub id_custom: Option<String>,
    pub field_type: FieldType,
    pub required: bool,
    pub placeholder: Option<String>,
    pub value: Option<String>,
    pub options: FieldOptions,
    pub locator: Locator,
    /// Element tag in the snapshot the field was parsed from.
    pub tag: String,
    /// Raw `type` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    /// Handle into the snapshot the field was parsed from.
    #[serde(skip)]
    pub node: Option<NodeId>,
}

impl FieldDescriptor {
    /// Label sources in priority order: tag, text, attribute, custom.
    pub fn labels(&self) -> [Option<&str>; 4] {
        [
            self.label_tag.as_deref(),
            self.label_text.as_deref(),
            self.label_attribute.as_deref(),
            self.label_custom.as_deref(),
        ]
    }

    /// Every value consulted by keyword identification.
    pub fn search_values(&self) -> [Option<&str>; 7] {
        [
            self.label_tag.as_deref(),
            self.label_text.as_deref(),
            self.label_attribute.as_deref(),
            self.label_custom.as_deref(),
            self.name.as_deref(),
            self.id.as_deref(),
            self.id_custom.as_deref(),
        ]
    }

    pub fn ids(&self) -> [Option<&str>; 2] {
        [self.id.as_deref(), self.id_custom.as_deref()]
    }

    /// Label shown in logs: the first present label, else name or id.
    pub fn display_label(&self) -> &str {
        self.labels()
            .into_iter()
            .flatten()
            .chain([self.name.as_deref(), self.id.as_deref()].into_iter().flatten())
            .next()
            .unwrap_or("<unlabeled>")
    }

    pub fn section(&self) -> Option<&SectionTag> {
        self.options.section()
    }

    /// Values that identify the same element across two parses.
    pub fn identity(&self) -> [Option<&str>; 6] {
        [
            self.label_tag.as_deref(),
            self.label_text.as_deref(),
            self.label_custom.as_deref(),
            self.name.as_deref(),
            self.id.as_deref(),
            self.id_custom.as_deref(),
        ]
    }

    /// Two descriptors share a non-empty identity value at the same position.
    pub fn same_identity(&self, other: &FieldDescriptor) -> bool {
        self.identity()
            .into_iter()
            .zip(other.identity())
            .any(|(a, b)| a.is_some_and(|a| !a.is_empty() && Some(a) == b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonType {
    Submit,
    Button,
    File,
}

/// A clickable control that is not itself a form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonDescriptor {
    pub label_tag: Option<String>,
    pub label_text: Option<String>,
    pub label_custom: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub id: Option<String>,
    pub id_custom: Option<String>,
    pub button_type: ButtonType,
    pub value: Option<String>,
    pub disabled: bool,
    pub locator: Locator,
    pub tag: String,
    #[serde(skip)]
    pub node: Option<NodeId>,
}

impl ButtonDescriptor {
    pub fn search_values(&self) -> [Option<&str>; 7] {
        [
            self.text.as_deref(),
            self.label_tag.as_deref(),
            self.label_text.as_deref(),
            self.label_custom.as_deref(),
            self.name.as_deref(),
            self.id.as_deref(),
            self.id_custom.as_deref(),
        ]
    }

    pub fn ids(&self) -> [Option<&str>; 2] {
        [self.id.as_deref(), self.id_custom.as_deref()]
    }

    pub fn is_submit(&self) -> bool {
        self.button_type == ButtonType::Submit
    }

    pub fn display_text(&self) -> &str {
        self.search_values().into_iter().flatten().next().unwrap_or("<button>")
    }
}

/// An anchor whose text names an application or auth action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    pub label_tag: Option<String>,
    pub label_text: Option<String>,
    pub text: String,
    pub href: Option<String>,
    pub rel: Option<String>,
    pub locator: Locator,
    #[serde(skip)]
    pub node: Option<NodeId>,
}

// ============================================================================
// Page
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

/// Semantic model of one page snapshot. Rebuilt on every parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageModel {
    pub metadata: PageMetadata,
    pub fields: Vec<FieldDescriptor>,
    pub buttons: Vec<ButtonDescriptor>,
    pub links: Vec<LinkDescriptor>,
}

impl PageModel {
    pub fn fields_of_type(&self, field_type: FieldType) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(move |f| f.field_type == field_type)
    }

    pub fn count_of_type(&self, field_type: FieldType) -> usize {
        self.fields_of_type(field_type).count()
    }

    /// Fields carrying a verification tag, ordered by ordinal.
    pub fn verification_fields(&self) -> Vec<&FieldDescriptor> {
        let mut out: Vec<&FieldDescriptor> = self
            .fields
            .iter()
            .filter(|f| matches!(f.options, FieldOptions::Verification { .. }))
            .collect();
        out.sort_by_key(|f| match f.options {
            FieldOptions::Verification { ordinal } => ordinal,
            _ => 0,
        });
        out
    }

    pub fn count_section(&self, category: SectionCategory, subtype: Subtype) -> usize {
        self.fields
            .iter()
            .filter_map(|f| f.section())
            .filter(|s| s.category == category && s.subtype == subtype)
            .count()
    }
}
