use formpilot::config::keywords::KeywordTables;
use formpilot::config::thresholds::Thresholds;
use formpilot::dom::document::Document;
use formpilot::extract::context::SectionLimits;
use formpilot::extract::page_model::{FieldDescriptor, FieldOptions, FieldType, PageModel, SectionCategory, SectionTag, Subtype};
use formpilot::extract::parser::PageParser;
use formpilot::locator::locator_model::Locator;
use formpilot::profile::Profile;
use serde_json::json;

pub fn tables() -> KeywordTables {
    KeywordTables::builtin().expect("built-in keyword tables parse")
}

pub fn thresholds() -> Thresholds {
    Thresholds::default()
}

/// One work entry, one education entry.
pub fn profile() -> Profile {
    Profile::from_value(json!({
        "First Name": "Ada",
        "Last Name": "Lovelace",
        "Email": "ada@example.com",
        "Password": "correct-horse",
        "City": "Boston",
        "State": "Massachusetts",
        "Country": "United States",
        "Phone Number": "6175550100",
        "Phone Device Type": "Mobile",
        "Salary Expectation": "120000",
        "Work Experience": [
            {
                "Job Title": "Engineer",
                "Company": "Analytical Engines Ltd",
                "From Start Date": "03/01/2020",
                "I currently work here": true
            }
        ],
        "Education": [
            {
                "School or University": "University of London",
                "Degree": "Masters",
                "Field of Study or Major": "Mathematics",
                "From Start Date": "09/2014",
                "Graduated": true
            }
        ]
    }))
}

pub fn doc(html: &str) -> Document {
    Document::parse(html)
}

/// Parse with the default profile's section limits.
pub fn parse(html: &str) -> PageModel {
    parse_with_limits(html, profile().limits())
}

pub fn parse_with_limits(html: &str, limits: SectionLimits) -> PageModel {
    let tables = tables();
    let thresholds = thresholds();
    PageParser::new(&tables, &thresholds, limits).parse(&Document::parse(html), "https://jobs.example.com/apply")
}

/// Bare descriptor labelled `label`, for rule tests that never touch a page.
pub fn field(label: &str, field_type: FieldType) -> FieldDescriptor {
    FieldDescriptor {
        label_tag: Some(label.to_string()),
        label_text: None,
        label_attribute: None,
        label_custom: None,
        label_parent: None,
        name: None,
        id: None,
        id_custom: None,
        field_type,
        required: false,
        placeholder: None,
        value: None,
        options: FieldOptions::None,
        locator: Locator::relative_only(format!("//input[@aria-label='{}']", label)),
        tag: "input".to_string(),
        input_type: None,
        node: None,
    }
}

pub fn required(mut field: FieldDescriptor) -> FieldDescriptor {
    field.required = true;
    field
}

pub fn in_section(mut field: FieldDescriptor, category: SectionCategory, ordinal: usize, subtype: Subtype) -> FieldDescriptor {
    field.options = FieldOptions::Section(SectionTag { category, ordinal, subtype, format: None });
    field
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
