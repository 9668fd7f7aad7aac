use serde::Serialize;
use tracing::info;

use crate::config::keywords::NavigationKeywords;
use crate::extract::page_model::{FieldDescriptor, FieldType, PageModel};
use crate::text::matching::{MatchOpts, any_matches, matches_any};

/// Where an application stands. Ordered; the navigator only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NavigationState {
    #[default]
    Description,
    Auth,
    LoggedIn,
    Submitted,
}

// ============================================================================
// Page facts
// ============================================================================

/// What the detectors look at, gathered once per parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFacts {
    pub field_count: usize,
    pub email_fields: usize,
    pub password_fields: usize,
    pub first_name_field: bool,
    /// Apply button or link.
    pub apply: bool,
    /// Any auth-flavoured button, including generic submit/continue ones.
    pub auth_button: bool,
    /// Sign-up or sign-in button or link.
    pub auth_control: bool,
    pub verify_button: bool,
    pub progress_button: bool,
    pub ack_button: bool,
    pub expand_all_button: bool,
    pub submitted_text: bool,
    pub already_submitted_text: bool,
}

fn button_texts(model: &PageModel) -> impl Iterator<Item = &str> {
    model.buttons.iter().filter_map(|b| b.text.as_deref())
}

fn link_texts(model: &PageModel) -> impl Iterator<Item = &str> {
    model.links.iter().map(|l| l.text.as_str())
}

fn any_text<'a, S: AsRef<str>>(mut texts: impl Iterator<Item = &'a str>, needles: &[S]) -> bool {
    texts.any(|t| matches_any(t, needles, MatchOpts::SUBSTRING))
}

/// Email inputs by type; failing that, text inputs labelled as email.
pub fn email_fields(model: &PageModel) -> Vec<&FieldDescriptor> {
    let typed: Vec<&FieldDescriptor> = model.fields_of_type(FieldType::Email).collect();
    if !typed.is_empty() {
        return typed;
    }
    model
        .fields_of_type(FieldType::Text)
        .filter(|f| any_matches(f.search_values(), &["email"], MatchOpts::SUBSTRING))
        .collect()
}

pub fn password_fields(model: &PageModel) -> Vec<&FieldDescriptor> {
    model.fields_of_type(FieldType::Password).collect()
}

impl PageFacts {
    pub fn gather(model: &PageModel, page_text: &str, nav: &NavigationKeywords) -> Self {
        let auth_buttons: Vec<&String> =
            nav.signup.iter().chain(&nav.signin).chain(&nav.verify).chain(&nav.other_auth).collect();
        let auth_controls = nav.auth_identifiers();
        let text = page_text.to_lowercase();
        let in_text = |needles: &[String]| needles.iter().any(|n| text.contains(&n.to_lowercase()));

        Self {
            field_count: model.fields.len(),
            email_fields: email_fields(model).len(),
            password_fields: password_fields(model).len(),
            first_name_field: model
                .fields_of_type(FieldType::Text)
                .any(|f| any_matches(f.search_values(), &["first name"], MatchOpts::SUBSTRING)),
            apply: any_text(button_texts(model).chain(link_texts(model)), &nav.start_apply),
            auth_button: any_text(button_texts(model), &auth_buttons),
            auth_control: any_text(button_texts(model).chain(link_texts(model)), &auth_controls),
            verify_button: any_text(button_texts(model), &nav.verify),
            progress_button: any_text(button_texts(model), &nav.progress),
            ack_button: any_text(button_texts(model), &nav.ack),
            expand_all_button: any_text(button_texts(model), &nav.expand_all),
            submitted_text: in_text(&nav.application_submitted),
            already_submitted_text: in_text(&nav.already_submitted),
        }
    }
}

// ============================================================================
// Detectors
// ============================================================================

pub fn is_submitted(facts: &PageFacts, current: NavigationState) -> bool {
    let few_fields = facts.field_count < 4;
    (facts.submitted_text
        && !facts.auth_button
        && facts.email_fields == 0
        && facts.password_fields == 0
        && !facts.ack_button)
        || facts.already_submitted_text
        || (current == NavigationState::LoggedIn && few_fields && !facts.progress_button && !facts.ack_button)
        || (current == NavigationState::Auth
            && few_fields
            && facts.email_fields == 0
            && facts.password_fields == 0
            && !facts.auth_button
            && !facts.ack_button
            && !facts.apply)
}

pub fn is_logged_in(facts: &PageFacts) -> bool {
    (facts.first_name_field && !facts.auth_control && !facts.verify_button)
        || (facts.expand_all_button && facts.progress_button && !facts.auth_control && !facts.verify_button)
}

pub fn is_auth(facts: &PageFacts) -> bool {
    facts.password_fields > 0
        || facts.auth_control
        || (facts.email_fields > 0 && facts.field_count < 7 && !facts.apply)
}

pub fn is_description(facts: &PageFacts) -> bool {
    facts.apply && facts.field_count < 5
}

/// The state the detectors point at, if it lies ahead of `current`.
/// Detectors are consulted from the last state backwards.
pub fn detect(facts: &PageFacts, current: NavigationState) -> Option<NavigationState> {
    let fired = [
        (NavigationState::Submitted, is_submitted(facts, current)),
        (NavigationState::LoggedIn, is_logged_in(facts)),
        (NavigationState::Auth, is_auth(facts)),
        (NavigationState::Description, is_description(facts)),
    ];
    fired.into_iter().find(|(state, hit)| *hit && *state > current).map(|(state, _)| state)
}

/// Forward-only state holder with the sequence of states it went through.
#[derive(Debug, Clone, Default)]
pub struct StateTracker {
    current: NavigationState,
    history: Vec<NavigationState>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> NavigationState {
        self.current
    }

    /// State after every observation, in order.
    pub fn history(&self) -> &[NavigationState] {
        &self.history
    }

    pub fn observe(&mut self, facts: &PageFacts) -> NavigationState {
        if let Some(next) = detect(facts, self.current) {
            info!(from = ?self.current, to = ?next, "state transition");
            self.current = next;
        }
        self.history.push(self.current);
        self.current
    }
}
