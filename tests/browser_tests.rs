use std::fs;
use std::time::Duration;

use formpilot::browser::session::BrowserRequest;
use formpilot::browser::{Browser, BrowserAction, Reaction, SnapshotBrowser, StabilityOpts};
use formpilot::dom::xpath::select_unique;
use formpilot::error::FormError;
use formpilot::locator::locator_model::ClickStrategy;
use formpilot::navigation::NavigationState;
use formpilot::oracle::{MockOracle, Oracle};
use formpilot::trace::{TraceEvent, TraceLogger};
use serde_json::{Value, json};

use crate::common::pages::{FORM_PAGE, FORM_URL, POSTING_URL};

mod common;

const CONTROLS: &str = r#"<html><body><form>
<input type="radio" name="relocate" id="yes" value="yes">
<input type="radio" name="relocate" id="no" value="no">
<input type="checkbox" id="terms">
<input type="text" id="city">
<select id="level"><option>Select...</option><option>Bachelors</option><option>Masters</option></select>
<button id="more">More</button>
</form></body></html>"#;

// =========================================================================
// Snapshot browser
// =========================================================================

#[test]
fn radios_and_checkboxes_toggle() {
    let mut browser = SnapshotBrowser::new(FORM_URL, CONTROLS);
    browser.click("//input[@id='yes']", ClickStrategy::Native).expect("radio clickable");
    assert!(browser.is_checked("//input[@id='yes']"));

    browser.click("//input[@id='no']", ClickStrategy::Script).expect("radio clickable");
    assert!(browser.is_checked("//input[@id='no']"));
    assert!(!browser.is_checked("//input[@id='yes']"), "Radios in a group are exclusive");

    browser.click("//input[@id='terms']", ClickStrategy::Native).expect("checkbox clickable");
    browser.click("//input[@id='terms']", ClickStrategy::Native).expect("checkbox clickable");
    assert!(!browser.is_checked("//input[@id='terms']"), "Two clicks leave a checkbox unchecked");
}

#[test]
fn typing_appends_and_clear_resets() {
    let mut browser = SnapshotBrowser::new(FORM_URL, CONTROLS);
    browser.type_text("//input[@id='city']", "Bos").expect("typeable");
    browser.type_text("//input[@id='city']", "ton").expect("typeable");
    assert_eq!(browser.value_of("//input[@id='city']").as_deref(), Some("Boston"));

    browser.clear("//input[@id='city']").expect("clearable");
    assert_eq!(browser.value_of("//input[@id='city']").as_deref(), Some(""));

    let state = browser.locate("//input[@id='city']").expect("locatable");
    assert!(state.is_interactable());
    assert_eq!(state.tag.as_deref(), Some("input"));
}

#[test]
fn select_option_by_text() {
    let mut browser = SnapshotBrowser::new(FORM_URL, CONTROLS);
    browser.select_option("//select[@id='level']", "Masters").expect("option exists");
    let doc = browser.document();
    let masters = select_unique(doc, "//select[@id='level']/option[3]").expect("third option");
    assert!(doc.has_attr(masters, "selected"));
    let placeholder = select_unique(doc, "//select[@id='level']/option[1]").expect("first option");
    assert!(!doc.has_attr(placeholder, "selected"));

    let err = browser.select_option("//select[@id='level']", "PhD").expect_err("no such option");
    assert!(matches!(err, FormError::InteractionFailed { .. }), "got {:?}", err);
}

#[test]
fn clicks_run_registered_reactions() {
    let mut browser = SnapshotBrowser::new(POSTING_URL, CONTROLS)
        .with_page(FORM_URL, FORM_PAGE)
        .on_click("//button[@id='more']", Reaction::Navigate(FORM_URL.to_string()));

    browser.click("//button[@id='more']", ClickStrategy::Native).expect("button clickable");
    assert_eq!(browser.current_url().expect("in memory"), FORM_URL);
    assert!(browser.snapshot().expect("in memory").contains("first_name"));
    assert_eq!(browser.clicks(), vec!["//button[@id='more']"]);
}

#[test]
fn replace_reaction_keeps_url() {
    let mut browser = SnapshotBrowser::new(FORM_URL, CONTROLS)
        .on_click("//button[@id='more']", Reaction::Replace("<html><body><p>Expanded</p></body></html>".to_string()));
    browser.click("//button[@id='more']", ClickStrategy::Native).expect("button clickable");
    assert_eq!(browser.url(), FORM_URL);
    assert!(browser.document().page_text().contains("Expanded"));
}

#[test]
fn blocked_native_click_fails_but_script_works() {
    let mut browser = SnapshotBrowser::new(FORM_URL, CONTROLS).block_native_click("//input[@id='terms']");
    let err = browser.click("//input[@id='terms']", ClickStrategy::Native).expect_err("overlay intercepts");
    assert!(matches!(err, FormError::InteractionFailed { .. }), "got {:?}", err);

    browser.click("//input[@id='terms']", ClickStrategy::Script).expect("script clicks ignore overlays");
    assert!(browser.is_checked("//input[@id='terms']"));
}

#[test]
fn unknown_pages_and_elements_are_errors() {
    let mut browser = SnapshotBrowser::new(FORM_URL, CONTROLS);
    assert!(browser.open("https://nowhere.example.com").is_err());
    assert_eq!(browser.url(), FORM_URL, "A failed open keeps the current page");

    let err = browser.click("//input[@id='missing']", ClickStrategy::Native).expect_err("nothing there");
    assert!(matches!(err, FormError::ElementNotFound(_)), "got {:?}", err);
    let err = browser.click("//input[@type='radio']", ClickStrategy::Native).expect_err("two radios");
    assert!(matches!(err, FormError::ElementMisplaced(_)), "got {:?}", err);
}

#[test]
fn actions_are_recorded_in_order() {
    let mut browser = SnapshotBrowser::new(FORM_URL, CONTROLS).on_evaluate("document.title", json!("Apply"));
    browser.open(FORM_URL).expect("registered page");
    assert_eq!(browser.evaluate("document.title").expect("scripted"), json!("Apply"));
    assert_eq!(browser.evaluate("window.x").expect("unscripted"), Value::Null);
    browser.refresh().expect("reloads");

    assert_eq!(
        browser.actions(),
        &[
            BrowserAction::Open(FORM_URL.to_string()),
            BrowserAction::Evaluate("document.title".to_string()),
            BrowserAction::Evaluate("window.x".to_string()),
            BrowserAction::Refresh,
        ]
    );
}

#[test]
fn static_page_is_stable_immediately() {
    let mut browser = SnapshotBrowser::new(FORM_URL, CONTROLS);
    let html = browser.wait_until_stable(&StabilityOpts::immediate()).expect("settles");
    assert_eq!(html, browser.snapshot().expect("in memory"));
}

#[test]
fn stability_defaults_bound_the_wait() {
    let opts = StabilityOpts::default();
    assert_eq!(opts.timeout, Duration::from_secs(10));
    assert_eq!(opts.required_identical, 3);
    assert_eq!(StabilityOpts::immediate().timeout, opts.timeout, "Immediate only drops the sleeps");
}

// =========================================================================
// Driver protocol
// =========================================================================

#[test]
fn browser_requests_serialize_flat() {
    let navigate = serde_json::to_value(BrowserRequest::navigate(FORM_URL)).expect("serializes");
    assert_eq!(navigate, json!({ "cmd": "navigate", "url": FORM_URL }));

    let click = serde_json::to_value(BrowserRequest::click("//a", ClickStrategy::Native)).expect("serializes");
    assert_eq!(click, json!({ "cmd": "click", "xpath": "//a", "strategy": "Native" }));

    let typed = serde_json::to_value(BrowserRequest::with_value("type", "//input", "Ada")).expect("serializes");
    assert_eq!(typed, json!({ "cmd": "type", "xpath": "//input", "value": "Ada" }));

    let page = serde_json::to_value(BrowserRequest::page("html")).expect("serializes");
    assert_eq!(page, json!({ "cmd": "html" }));
}

// =========================================================================
// Tracing and oracle doubles
// =========================================================================

#[test]
fn trace_logger_appends_json_lines() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("trace.jsonl");
    let tracer = TraceLogger::new(&path);
    assert!(tracer.is_enabled());

    tracer.log(&TraceEvent::now(1, NavigationState::Description).with_action("parse"));
    tracer.log(&TraceEvent::now(2, NavigationState::Auth).with_outcome("submitted"));

    let content = fs::read_to_string(&path).expect("trace written");
    let lines: Vec<Value> = content.lines().map(|l| serde_json::from_str(l).expect("valid json")).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["iteration"], 1);
    assert_eq!(lines[0]["action"], "parse");
    assert_eq!(lines[1]["state"], "Auth");
    assert_eq!(lines[1]["outcome"], "submitted");

    assert!(!TraceLogger::disabled().is_enabled());
}

#[test]
fn mock_oracle_follows_script_then_fallback() {
    let oracle = MockOracle::with_answers(["Blue"]).with_fallback("n/a");
    assert_eq!(oracle.resolve("Favourite colour").expect("scripted"), "Blue");
    assert_eq!(
        oracle.resolve_options("Office", &["London".to_string(), "Paris".to_string()], false, 1).expect("fallback"),
        "n/a"
    );
    assert_eq!(oracle.calls(), 2);
    assert_eq!(oracle.prompts()[1], "Office\n[London | Paris] multi=false");

    let strict = MockOracle::new();
    assert!(matches!(strict.resolve("anything"), Err(FormError::Oracle(_))));
    strict.push("later");
    assert_eq!(strict.resolve("again").expect("pushed"), "later");
}
