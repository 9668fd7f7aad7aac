use std::fs;
use std::time::Duration;

use formpilot::browser::{Reaction, SnapshotBrowser, StabilityOpts};
use formpilot::error::FormError;
use formpilot::locator::locator_model::Locator;
use formpilot::navigation::action_graph::ActionGraph;
use formpilot::navigation::actions::{ActionItem, Step, absolute_url, apply_item, progress_item};
use formpilot::navigation::auth::{AuthPlan, AuthType, plan_auth};
use formpilot::navigation::navigator::{Navigator, RunLimits};
use formpilot::navigation::state::{NavigationState, PageFacts, StateTracker, detect, is_submitted};
use formpilot::navigation::verify::{FileVerifier, NoVerifier, Verifier, accepts_code};
use formpilot::oracle::MockOracle;
use formpilot::resolve::engine::AnswerEngine;
use formpilot::trace::TraceLogger;

use crate::common::pages::{
    DESCRIPTION_PAGE, DONE_PAGE, DONE_URL, FORM_PAGE, FORM_URL, MISLABELLED_SIGN_IN_PAGE, POSTING_URL, SIGN_IN_PAGE,
    SIGN_UP_PAGE,
};
use crate::common::utils::{parse, profile, tables, thresholds};

mod common;

fn item(text: &str, id: &str, tag: &str) -> ActionItem {
    ActionItem {
        text: text.to_string(),
        locator: Locator::new(format!("/html/body/{}[@id='{}']", tag, id), Some(format!("//{}[@id='{}']", tag, id))),
        href: None,
        tag: tag.to_string(),
        submit: false,
    }
}

fn proceed(plan: AuthPlan) -> (AuthType, ActionItem) {
    match plan {
        AuthPlan::Proceed { auth_type, button, .. } => (auth_type, button),
        other => panic!("expected a proceed plan, got {:?}", other),
    }
}

// =========================================================================
// State detection
// =========================================================================

#[test]
fn description_page_keeps_initial_state() {
    let facts = PageFacts { apply: true, ..Default::default() };
    assert_eq!(detect(&facts, NavigationState::Description), None, "Description is never ahead of itself");
}

#[test]
fn detectors_pick_the_furthest_state() {
    let auth = PageFacts { password_fields: 1, email_fields: 1, field_count: 2, ..Default::default() };
    assert_eq!(detect(&auth, NavigationState::Description), Some(NavigationState::Auth));

    let form = PageFacts { first_name_field: true, field_count: 8, progress_button: true, ..Default::default() };
    assert_eq!(detect(&form, NavigationState::Auth), Some(NavigationState::LoggedIn));

    let emptied = PageFacts { field_count: 1, ..Default::default() };
    assert_eq!(
        detect(&emptied, NavigationState::LoggedIn),
        Some(NavigationState::Submitted),
        "A form page that lost its fields and progress control was submitted"
    );
}

#[test]
fn submission_text_needs_a_clean_page() {
    let with_login = PageFacts { submitted_text: true, password_fields: 1, ..Default::default() };
    assert!(!is_submitted(&with_login, NavigationState::Description));

    let clean = PageFacts { submitted_text: true, ..Default::default() };
    assert!(is_submitted(&clean, NavigationState::Description));

    let already = PageFacts { already_submitted_text: true, auth_button: true, ..Default::default() };
    assert!(is_submitted(&already, NavigationState::Description));
}

#[test]
fn tracker_never_moves_backwards() {
    let mut tracker = StateTracker::new();
    let auth = PageFacts { password_fields: 1, field_count: 2, ..Default::default() };
    let description = PageFacts { apply: true, ..Default::default() };

    assert_eq!(tracker.observe(&auth), NavigationState::Auth);
    assert_eq!(tracker.observe(&description), NavigationState::Auth);
    assert_eq!(tracker.history(), &[NavigationState::Auth, NavigationState::Auth]);
}

#[test]
fn facts_are_gathered_from_the_page() {
    let tables = tables();
    let model = parse(FORM_PAGE);
    let facts = PageFacts::gather(&model, "First Name Submit Application", &tables.navigation);
    assert!(facts.first_name_field);
    assert!(facts.progress_button);
    assert!(!facts.auth_control, "Submit is not a sign-up or sign-in control");
    assert_eq!(detect(&facts, NavigationState::Description), Some(NavigationState::LoggedIn));
}

// =========================================================================
// Auth planning
// =========================================================================

#[test]
fn sign_in_page_is_planned_as_sign_in() {
    let tables = tables();
    let (auth_type, button) = proceed(plan_auth(&parse(SIGN_IN_PAGE), &tables.navigation, FORM_URL));
    assert_eq!(auth_type, AuthType::SignIn);
    assert_eq!(button.text, "Sign In");
    assert!(button.submit);
}

#[test]
fn sign_up_button_with_one_password_signs_in() {
    let tables = tables();
    let plan = plan_auth(&parse(MISLABELLED_SIGN_IN_PAGE), &tables.navigation, FORM_URL);
    let AuthPlan::Proceed { auth_type, button, map } = plan else {
        panic!("expected a proceed plan");
    };
    assert_eq!(auth_type, AuthType::SignIn);
    assert_eq!(button.text, "Sign In");

    let create = map.items(AuthType::SignUp).first().cloned().expect("sign-up control mapped");
    assert_eq!(create.text, "Create Account");
    assert_eq!(map.toggle_for(&create).map(|b| b.text.as_str()), Some("Sign In"));
}

#[test]
fn two_passwords_sign_up() {
    let tables = tables();
    let (auth_type, button) = proceed(plan_auth(&parse(SIGN_UP_PAGE), &tables.navigation, FORM_URL));
    assert_eq!(auth_type, AuthType::SignUp);
    assert_eq!(button.text, "Create Account");
}

#[test]
fn auth_button_without_fields_is_just_clicked() {
    let tables = tables();
    let model = parse(r#"<html><body><main><button type="button" id="signin">Sign In</button></main></body></html>"#);
    match plan_auth(&model, &tables.navigation, FORM_URL) {
        AuthPlan::Step(Step::Click(item)) => assert_eq!(item.text, "Sign In"),
        other => panic!("expected a click, got {:?}", other),
    }
}

#[test]
fn auth_fallbacks() {
    let tables = tables();
    let link_only = parse(r#"<html><body><a href="/register">Create Account</a></body></html>"#);
    match plan_auth(&link_only, &tables.navigation, FORM_URL) {
        AuthPlan::Step(Step::Click(item)) => assert!(item.is_link(), "The sign-up link is clicked"),
        other => panic!("expected a link click, got {:?}", other),
    }

    let apply_only = parse(r#"<html><body><a href="/apply/9">Apply</a></body></html>"#);
    assert_eq!(
        plan_auth(&apply_only, &tables.navigation, FORM_URL),
        AuthPlan::Step(Step::Open("https://jobs.example.com/apply/9".to_string()))
    );

    let nothing = parse("<html><body><p>Loading</p></body></html>");
    assert_eq!(plan_auth(&nothing, &tables.navigation, FORM_URL), AuthPlan::Unresolvable);
}

// =========================================================================
// Actions
// =========================================================================

#[test]
fn apply_and_progress_items() {
    let tables = tables();
    let apply = apply_item(&parse(DESCRIPTION_PAGE), &tables.navigation).expect("apply link found");
    assert_eq!(apply.href.as_deref(), Some("/apply/1"));
    assert_eq!(Step::follow(apply, POSTING_URL), Step::Open(FORM_URL.to_string()));

    let progress = progress_item(&parse(FORM_PAGE), &tables.navigation).expect("submit found");
    assert_eq!(progress.text, "Submit Application");
}

#[test]
fn absolute_url_passes() {
    assert_eq!(absolute_url(POSTING_URL, "/apply/1").as_deref(), Some(FORM_URL));
    assert_eq!(
        absolute_url(POSTING_URL, "https://other.example.com/x").as_deref(),
        Some("https://other.example.com/x")
    );
    assert_eq!(absolute_url(POSTING_URL, "#top"), None);
    assert_eq!(absolute_url(POSTING_URL, "javascript:void(0)"), None);
    assert_eq!(absolute_url(POSTING_URL, "  "), None);
}

// =========================================================================
// Action graph
// =========================================================================

#[test]
fn fresh_candidates_are_preferred() {
    let mut graph = ActionGraph::new();
    let next = item("Next", "next", "button");
    let agree = item("I agree", "agree", "button");
    let candidates = [None, Some(next.clone()), Some(agree.clone())];

    assert_eq!(graph.select_fresh(&candidates, |_| true), Some(next.clone()));
    graph.record(&next, true);
    assert!(graph.is_visited(&next));
    assert_eq!(graph.select_fresh(&candidates, |_| true), Some(agree.clone()));
    assert_eq!(
        graph.select_fresh(&candidates, |c| c != &agree),
        Some(next),
        "With nothing fresh and live, the first candidate is retried"
    );
    assert_eq!(graph.select_fresh(&[None, None], |_| true), None);
}

#[test]
fn vanished_actions_are_not_parents() {
    let mut graph = ActionGraph::new();
    graph.record(&item("Next", "next", "button"), false);
    assert!(graph.parents().is_empty());
}

#[test]
fn parents_skip_links_and_unwind() {
    let mut graph = ActionGraph::new();
    let add = item("Add", "add", "button");
    let terms = item("Terms", "terms", "a");
    graph.record(&add, true);
    graph.record(&terms, true);
    graph.record(&add, true);
    assert_eq!(graph.parents().len(), 2, "Visited actions are recorded once");

    let (position, parent) = graph.next_parent(|_| true).expect("button parent");
    assert_eq!((position, parent.text.as_str()), (0, "Add"));
    assert_eq!(graph.next_parent(|p| p != &add), None);

    graph.unwind(position, true);
    assert_eq!(graph.parents().len(), 1);
    graph.unwind(position, false);
    assert!(graph.parents().is_empty());
}

// =========================================================================
// Verification
// =========================================================================

#[test]
fn accepts_code_passes() {
    assert!(accepts_code("1234", 1));
    assert!(accepts_code("482193", 1));
    assert!(!accepts_code("0123", 1), "Leading zeros are rejected");
    assert!(!accepts_code("12345", 1));
    assert!(!accepts_code("7", 1));
    assert!(accepts_code("123456", 6));
    assert!(!accepts_code("12-4", 4));
}

#[test]
fn file_verifier_consumes_dropped_code() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("code.txt");
    fs::write(&path, " 4821\n").expect("write code");

    let verifier = FileVerifier::new(dir.path()).with_wait(Duration::ZERO);
    assert_eq!(verifier.fetch_code(4).expect("read code"), Some("4821".to_string()));
    assert!(!path.exists(), "The code file is consumed");
    assert_eq!(verifier.fetch_code(4).expect("read code"), None);
    assert_eq!(verifier.fetch_link().expect("read link"), None);
}

#[test]
fn no_verifier_has_nothing() {
    assert_eq!(NoVerifier.fetch_code(6).expect("never fails"), None);
    assert_eq!(NoVerifier.fetch_link().expect("never fails"), None);
}

// =========================================================================
// Full runs
// =========================================================================

#[test]
fn run_reaches_submission() {
    let tables = tables();
    let thresholds = thresholds();
    let profile = profile();
    let oracle = MockOracle::new().with_fallback("n/a");
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);
    let tracer = TraceLogger::disabled();

    let mut browser = SnapshotBrowser::new(POSTING_URL, DESCRIPTION_PAGE)
        .with_page(FORM_URL, FORM_PAGE)
        .with_page(DONE_URL, DONE_PAGE)
        .on_click("//button[@id='submit']", Reaction::Navigate(DONE_URL.to_string()));

    let mut navigator = Navigator::new(&engine, &NoVerifier, &tracer).with_stability(StabilityOpts::immediate());
    let report = navigator.run(&mut browser, POSTING_URL).expect("application submitted");

    assert_eq!(report.iterations, 3);
    assert_eq!(
        report.states,
        vec![NavigationState::Description, NavigationState::LoggedIn, NavigationState::Submitted]
    );
    assert_eq!(navigator.state(), NavigationState::Submitted);
    assert_eq!(browser.url(), DONE_URL);
    assert_eq!(oracle.calls(), 0, "First name comes from the profile");
}

#[test]
fn run_without_apply_control_is_a_dead_end() {
    let tables = tables();
    let thresholds = thresholds();
    let profile = profile();
    let oracle = MockOracle::new();
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);
    let tracer = TraceLogger::disabled();

    let mut browser = SnapshotBrowser::new(POSTING_URL, "<html><body><p>This position is closed.</p></body></html>");
    let mut navigator = Navigator::new(&engine, &NoVerifier, &tracer).with_stability(StabilityOpts::immediate());
    let err = navigator.run(&mut browser, POSTING_URL).expect_err("nothing to click");
    assert!(matches!(err, FormError::DeadEnd(_)), "got {:?}", err);
}

#[test]
fn run_stops_when_iterations_run_out() {
    let tables = tables();
    let thresholds = thresholds();
    let profile = profile();
    let oracle = MockOracle::new();
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);
    let tracer = TraceLogger::disabled();

    let mut browser = SnapshotBrowser::new(POSTING_URL, DESCRIPTION_PAGE);
    let limits = RunLimits { max_iterations: 0, ..RunLimits::default() };
    let mut navigator = Navigator::new(&engine, &NoVerifier, &tracer)
        .with_limits(limits)
        .with_stability(StabilityOpts::immediate());
    let err = navigator.run(&mut browser, POSTING_URL).expect_err("no iterations allowed");
    assert!(matches!(err, FormError::DeadEnd(_)), "got {:?}", err);
    assert!(navigator.states().is_empty());
}
