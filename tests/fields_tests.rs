use chrono::NaiveDate;
use formpilot::browser::{Reaction, SnapshotBrowser, StabilityOpts};
use formpilot::extract::page_model::{FieldType, SectionCategory, Subtype};
use formpilot::locator::locator_model::Locator;
use formpilot::oracle::MockOracle;
use formpilot::resolve::{AnswerEngine, FieldOutcome, FieldResolver, Interactor};

use crate::common::pages::{FORM_PAGE, FORM_URL, SPONSORSHIP_PAGE};
use crate::common::utils::{field, in_section, parse, profile, tables, thresholds};

mod common;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
}

// =========================================================================
// Text and choices
// =========================================================================

#[test]
fn profile_text_is_typed_into_the_page() {
    let tables = tables();
    let thresholds = thresholds();
    let profile = profile();
    let oracle = MockOracle::new();
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);
    let model = parse(FORM_PAGE);

    let mut browser = SnapshotBrowser::new(FORM_URL, FORM_PAGE);
    let outcome = {
        let mut resolver = FieldResolver::new(&engine, Interactor::new(&mut browser, StabilityOpts::immediate()), today());
        resolver.resolve(&model.fields[0]).expect("no oracle needed")
    };

    assert_eq!(outcome, FieldOutcome::Resolved);
    assert_eq!(browser.value_of("//input[@id='first_name']").as_deref(), Some("Ada"));
    assert_eq!(oracle.calls(), 0);
}

#[test]
fn sponsorship_radio_is_clicked() {
    let tables = tables();
    let thresholds = thresholds();
    let profile = profile();
    let oracle = MockOracle::new();
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);
    let model = parse(SPONSORSHIP_PAGE);
    let radio = model.fields_of_type(FieldType::Radio).next().expect("one radio group");

    let mut browser = SnapshotBrowser::new(FORM_URL, SPONSORSHIP_PAGE);
    let outcome = {
        let mut resolver = FieldResolver::new(&engine, Interactor::new(&mut browser, StabilityOpts::immediate()), today());
        resolver.resolve(radio).expect("fixed rule")
    };

    assert_eq!(outcome, FieldOutcome::Resolved);
    assert!(browser.is_checked("//input[@value='yes']"));
    assert!(!browser.is_checked("//input[@value='no']"));
    assert_eq!(oracle.calls(), 0, "Sponsorship is answered by rule");
}

// =========================================================================
// Nested multiselect
// =========================================================================

const STUDY_CLOSED: &str = r#"<html><body><div id="study"><button id="open">Field of Study</button></div></body></html>"#;

const STUDY_LEVEL_1: &str = r#"<html><body>
<div id="study"><button id="open">Field of Study</button></div>
<ul id="groups"><li><span id="eng">Engineering</span></li><li><span id="math">Mathematics</span></li></ul>
</body></html>"#;

const STUDY_LEVEL_2: &str = r#"<html><body>
<div id="study"><button id="open">Field of Study</button></div>
<ul id="groups"><li><span id="eng">Engineering</span></li><li><span id="math">Mathematics</span></li></ul>
<ul id="majors"><li><label>Applied Mathematics<input type="checkbox" id="applied"></label></li><li><label>Mathematics<input type="checkbox" id="pure"></label></li></ul>
</body></html>"#;

#[test]
fn multiselect_drills_to_matching_leaf() {
    let tables = tables();
    let thresholds = thresholds();
    let profile = profile();
    let oracle = MockOracle::new();
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);

    let mut study = in_section(
        field("Field of Study", FieldType::Multiselect),
        SectionCategory::Education,
        1,
        Subtype::FieldOfStudy,
    );
    study.locator = Locator::relative_only("//button[@id='open']");
    study.tag = "button".to_string();

    let mut browser = SnapshotBrowser::new(FORM_URL, STUDY_CLOSED)
        .on_click("//button[@id='open']", Reaction::Replace(STUDY_LEVEL_1.to_string()))
        .on_click("//span[@id='math']", Reaction::Replace(STUDY_LEVEL_2.to_string()));
    let outcome = {
        let mut resolver = FieldResolver::new(&engine, Interactor::new(&mut browser, StabilityOpts::immediate()), today());
        resolver.resolve(&study).expect("profile answers every level")
    };

    assert_eq!(outcome, FieldOutcome::Resolved);
    assert_eq!(browser.clicks().len(), 3, "Open, one inner level, then the leaf: {:?}", browser.clicks());
    assert!(browser.is_checked("//input[@id='pure']"));
    assert!(!browser.is_checked("//input[@id='applied']"));
    assert_eq!(oracle.calls(), 0, "Exact profile matches never consult the oracle");
}
