use serde::Serialize;
use tracing::{error, info};

use crate::config::keywords::NavigationKeywords;
use crate::extract::page_model::{ButtonDescriptor, PageModel};
use crate::navigation::actions::{ActionItem, Step, apply_item};
use crate::navigation::state::{email_fields, password_fields};
use crate::text::matching::{MatchOpts, matches_any};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AuthType {
    SignUp,
    SignIn,
    Verify,
}

/// Buttons that can complete each kind of auth step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthMap {
    pub sign_up: Vec<ActionItem>,
    pub sign_in: Vec<ActionItem>,
    pub verify: Vec<ActionItem>,
}

impl AuthMap {
    pub fn items(&self, auth_type: AuthType) -> &[ActionItem] {
        match auth_type {
            AuthType::SignUp => &self.sign_up,
            AuthType::SignIn => &self.sign_in,
            AuthType::Verify => &self.verify,
        }
    }

    /// Counterpart of the sign-up or sign-in control `clicked` belongs to.
    /// Sign-up is checked first, so a shared button toggles to sign-in.
    pub fn toggle_for(&self, clicked: &ActionItem) -> Option<&ActionItem> {
        if self.sign_up.contains(clicked) {
            return self.sign_in.first();
        }
        if self.sign_in.contains(clicked) {
            return self.sign_up.first();
        }
        None
    }
}

/// How an auth page is to be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPlan {
    /// Fill the page, then press `button`.
    Proceed { auth_type: AuthType, button: ActionItem, map: AuthMap },
    /// Nothing to fill; do this and look again.
    Step(Step),
    Unresolvable,
}

#[derive(Default)]
struct AuthButtons<'m> {
    sign_up: Option<&'m ButtonDescriptor>,
    sign_in: Option<&'m ButtonDescriptor>,
    verify: Option<&'m ButtonDescriptor>,
    other: Option<&'m ButtonDescriptor>,
}

fn keep_preferred<'m>(slot: &mut Option<&'m ButtonDescriptor>, candidate: &'m ButtonDescriptor) {
    let replace = match slot {
        None => true,
        Some(existing) => candidate.is_submit() && !existing.is_submit(),
    };
    if replace {
        *slot = Some(candidate);
    }
}

/// Scan buttons bottom-up, keeping one per kind and preferring submit-typed ones.
fn scan_buttons<'m>(model: &'m PageModel, nav: &NavigationKeywords) -> AuthButtons<'m> {
    let mut found = AuthButtons::default();
    let hit = |b: &ButtonDescriptor, needles: &[String]| {
        b.text.as_deref().is_some_and(|t| matches_any(t, needles, MatchOpts::SUBSTRING))
    };
    for button in model.buttons.iter().rev() {
        if hit(button, &nav.signup) {
            keep_preferred(&mut found.sign_up, button);
        } else if hit(button, &nav.signin) {
            keep_preferred(&mut found.sign_in, button);
        } else if hit(button, &nav.verify) {
            keep_preferred(&mut found.verify, button);
        } else if hit(button, &nav.other_auth) {
            keep_preferred(&mut found.other, button);
        }
    }
    found
}

fn infer_from_fields(model: &PageModel, emails: usize, passwords: usize) -> Option<AuthType> {
    match passwords {
        0 if emails == 1 => Some(AuthType::SignIn),
        0 if !model.verification_fields().is_empty() => Some(AuthType::Verify),
        1 => Some(AuthType::SignIn),
        2 => Some(AuthType::SignUp),
        _ => None,
    }
}

fn same(a: Option<&ButtonDescriptor>, b: &ButtonDescriptor) -> bool {
    a.is_some_and(|a| std::ptr::eq(a, b))
}

/// A sign-up button on a single-password page is really a sign-in, and the
/// reverse with two passwords.
fn correct<'m>(
    buttons: &AuthButtons<'m>,
    passwords: usize,
    button: &'m ButtonDescriptor,
    auth_type: AuthType,
    submit_only: bool,
) -> (&'m ButtonDescriptor, AuthType) {
    let usable = |b: Option<&'m ButtonDescriptor>| b.filter(|b| !submit_only || b.is_submit());
    if same(buttons.sign_up, button) && passwords == 1 {
        if let Some(b) = usable(buttons.sign_in).or(usable(buttons.other)) {
            return (b, AuthType::SignIn);
        }
    } else if same(buttons.sign_in, button) && passwords == 2 {
        if let Some(b) = buttons.sign_up.or(buttons.other) {
            return (b, AuthType::SignUp);
        }
    }
    (button, auth_type)
}

/// Pick the auth type and the button that completes it.
pub fn plan_auth(model: &PageModel, nav: &NavigationKeywords, url: &str) -> AuthPlan {
    let emails = email_fields(model).len();
    let passwords = password_fields(model).len();
    let buttons = scan_buttons(model, nav);

    let known = [
        (buttons.sign_up, AuthType::SignUp),
        (buttons.sign_in, AuthType::SignIn),
        (buttons.verify, AuthType::Verify),
    ];

    let mut chosen = known
        .iter()
        .find_map(|(b, t)| b.filter(|b| b.is_submit()).map(|b| correct(&buttons, passwords, b, *t, true)));

    if chosen.is_none() {
        if let Some(other) = buttons.other.filter(|b| b.is_submit()) {
            chosen = infer_from_fields(model, emails, passwords).map(|t| (other, t));
        }
    }
    if chosen.is_none() {
        chosen = known.iter().find_map(|(b, t)| b.map(|b| correct(&buttons, passwords, b, *t, false)));
    }
    if chosen.is_none() {
        if let Some(other) = buttons.other {
            chosen = infer_from_fields(model, emails, passwords).map(|t| (other, t));
        }
    }

    let Some((button, auth_type)) = chosen else {
        return fallback(model, nav, &buttons, url);
    };
    let button = ActionItem::from(button);
    info!(auth_type = ?auth_type, button = %button.text, "auth page identified");

    let nothing_to_fill = match auth_type {
        AuthType::SignUp | AuthType::SignIn => emails + passwords == 0,
        AuthType::Verify => model.fields.is_empty(),
    };
    if nothing_to_fill {
        return AuthPlan::Step(Step::Click(button));
    }

    let with_other = |b: Option<&ButtonDescriptor>| -> Vec<ActionItem> {
        [b, buttons.other].into_iter().flatten().map(ActionItem::from).collect()
    };
    let map = AuthMap {
        sign_up: with_other(buttons.sign_up),
        sign_in: with_other(buttons.sign_in),
        verify: with_other(buttons.verify),
    };
    AuthPlan::Proceed { auth_type, button, map }
}

/// No usable auth button: press a generic one, follow an auth link, or go
/// back through an apply control that reappeared.
fn fallback(model: &PageModel, nav: &NavigationKeywords, buttons: &AuthButtons<'_>, url: &str) -> AuthPlan {
    if let Some(other) = buttons.other {
        return AuthPlan::Step(Step::Click(other.into()));
    }
    let link = |needles: &[String]| {
        model
            .links
            .iter()
            .rev()
            .find(|l| matches_any(&l.text, needles, MatchOpts::SUBSTRING))
    };
    if let Some(link) = link(&nav.signup).or_else(|| link(&nav.signin)) {
        return AuthPlan::Step(Step::Click(link.into()));
    }
    if let Some(apply) = apply_item(model, nav) {
        return AuthPlan::Step(Step::follow(apply, url));
    }
    error!("no auth button or link found");
    AuthPlan::Unresolvable
}
