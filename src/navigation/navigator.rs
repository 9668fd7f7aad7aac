use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::browser::{Browser, StabilityOpts};
use crate::config::keywords::NavigationKeywords;
use crate::dom::document::Document;
use crate::error::{FormError, FormResult};
use crate::extract::page_model::{
    ButtonType, FieldDescriptor, FieldOptions, FieldType, PageModel, SectionCategory, UploadKind,
};
use crate::extract::parser::{PageParser, ParsedPage, Reveal};
use crate::locator::locator_model::Locator;
use crate::locator::revalidate::{is_misplaced, validated_xpath};
use crate::navigation::action_graph::ActionGraph;
use crate::navigation::actions::{
    ActionItem, Step, absolute_url, ack_item, apply_item, frame_sources, progress_item,
};
use crate::navigation::auth::{AuthMap, AuthPlan, AuthType, plan_auth};
use crate::navigation::state::{NavigationState, PageFacts, StateTracker, email_fields, password_fields};
use crate::navigation::verify::{DIGIT_FIELD_COUNTS, Verifier, accepts_code};
use crate::resolve::dates::today;
use crate::resolve::upload::{upload_button, upload_field};
use crate::resolve::{AnswerEngine, ClickOutcome, FieldOutcome, FieldResolver, Interactor};
use crate::text::matching::{MatchOpts, matches_any};
use crate::trace::{TraceEvent, TraceLogger};

/// Padding after a click or navigation the navigator triggers itself.
const STEP_PADDING: Duration = Duration::from_secs(1);

/// Padding after reloading a page that reported an error.
const RELOAD_PADDING: Duration = Duration::from_secs(2);

/// Bounds on one application run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunLimits {
    pub max_iterations: u32,
    pub max_duration: Duration,
    /// Click-and-retry rounds on a single form page.
    pub max_form_depth: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_iterations: 18,
            max_duration: Duration::from_secs(30 * 60),
            max_form_depth: 4,
        }
    }
}

/// A run that ended on a submitted application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub iterations: u32,
    pub elapsed: Duration,
    pub states: Vec<NavigationState>,
}

/// The auth button chosen for this page and its alternatives.
struct AuthStep {
    auth_type: AuthType,
    button: ActionItem,
    map: AuthMap,
}

fn answerable(field_type: FieldType) -> bool {
    !matches!(field_type, FieldType::File | FieldType::Hidden | FieldType::Button)
}

/// Interaction errors on one upload are that upload's failure, not the job's.
fn soft(result: FormResult<FieldOutcome>) -> FormResult<FieldOutcome> {
    match result {
        Err(e) if e.is_retryable() || matches!(e, FormError::InteractionFailed { .. }) => {
            Ok(FieldOutcome::Failed(e.to_string()))
        }
        other => other,
    }
}

fn page_mentions(doc: &Document, needles: &[String]) -> bool {
    matches_any(&doc.page_text(), needles, MatchOpts::SUBSTRING)
}

/// Drives one application from its landing page to submission.
pub struct Navigator<'a> {
    engine: &'a AnswerEngine<'a>,
    parser: PageParser<'a>,
    verifier: &'a dyn Verifier,
    tracer: &'a TraceLogger,
    limits: RunLimits,
    stability: StabilityOpts,
    today: NaiveDate,
    tracker: StateTracker,
    iteration: u32,
}

impl<'a> Navigator<'a> {
    pub fn new(engine: &'a AnswerEngine<'a>, verifier: &'a dyn Verifier, tracer: &'a TraceLogger) -> Self {
        let parser = PageParser::new(engine.tables(), engine.thresholds(), engine.profile().limits());
        Self {
            engine,
            parser,
            verifier,
            tracer,
            limits: RunLimits::default(),
            stability: StabilityOpts::default(),
            today: today(),
            tracker: StateTracker::new(),
            iteration: 0,
        }
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_stability(mut self, stability: StabilityOpts) -> Self {
        self.stability = stability;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn state(&self) -> NavigationState {
        self.tracker.current()
    }

    /// Every state observed so far, one per parse.
    pub fn states(&self) -> &[NavigationState] {
        self.tracker.history()
    }

    fn nav(&self) -> &'a NavigationKeywords {
        &self.engine.tables().navigation
    }

    fn trace(&self, event: TraceEvent) {
        self.tracer.log(&event);
    }

    fn event(&self) -> TraceEvent {
        TraceEvent::now(self.iteration, self.tracker.current())
    }

    // ========================================================================
    // Run loop
    // ========================================================================

    /// Open `url` and work through the application. Parse, move the state
    /// forward, stop on submission, otherwise resolve the page and repeat.
    pub fn run(&mut self, browser: &mut dyn Browser, url: &str) -> FormResult<RunReport> {
        let started = Instant::now();
        info!(url, "application started");
        browser.open(url)?;

        for iteration in 1..=self.limits.max_iterations {
            if started.elapsed() > self.limits.max_duration {
                warn!(elapsed = ?started.elapsed(), "time budget exceeded");
                self.trace(self.event().with_outcome("timeout"));
                return Err(FormError::JobTimeout(self.limits.max_duration));
            }
            self.iteration = iteration;

            let html = browser.wait_until_stable(&self.stability)?;
            let doc = Document::parse(&html);
            let current_url = browser.current_url()?;
            let mut page = self.parser.parse_page(&doc, &current_url);

            let facts = PageFacts::gather(&page.model, &doc.page_text(), self.nav());
            let state = self.tracker.observe(&facts);
            info!(iteration, state = ?state, elapsed = ?started.elapsed(), "page parsed");
            self.trace(self.event().with_page(&page.model).with_action("parse"));

            if state == NavigationState::Submitted {
                info!(iterations = iteration, "application submitted");
                self.trace(self.event().with_outcome("submitted"));
                return Ok(RunReport {
                    iterations: iteration,
                    elapsed: started.elapsed(),
                    states: self.tracker.history().to_vec(),
                });
            }

            let resolved = match state {
                NavigationState::Description => self.resolve_description(browser, &page.model, &doc, &current_url),
                _ => self.resolve_form_page(browser, &mut page, &current_url),
            };
            if let Err(e) = resolved {
                error!(error = %e, state = ?state, "page could not be resolved");
                self.trace(self.event().with_outcome(format!("failed: {}", e)));
                return Err(e);
            }
        }

        error!(iterations = self.limits.max_iterations, "iteration budget exhausted");
        self.trace(self.event().with_outcome("iterations exhausted"));
        Err(FormError::DeadEnd(format!(
            "not submitted after {} iterations",
            self.limits.max_iterations
        )))
    }

    fn perform(&self, io: &mut Interactor<'_>, step: Step) -> FormResult<()> {
        match step {
            Step::Open(url) => {
                info!(url = %url, "opening");
                self.trace(self.event().with_action(format!("open {}", url)));
                io.browser().open(&url)?;
            }
            Step::Click(item) => {
                let doc = io.capture_now()?;
                let xpath = validated_xpath(&doc, &item.locator)
                    .ok_or_else(|| FormError::ElementNotFound(item.text.clone()))?
                    .value;
                info!(action = %item.text, "clicking");
                self.trace(self.event().with_action(&item.text));
                io.click(&xpath)?;
            }
        }
        io.browser().wait_until_stable(&self.stability.with_padding(STEP_PADDING))?;
        Ok(())
    }

    // ========================================================================
    // Description page
    // ========================================================================

    fn resolve_description(
        &self,
        browser: &mut dyn Browser,
        model: &PageModel,
        doc: &Document,
        url: &str,
    ) -> FormResult<()> {
        let mut io = Interactor::new(browser, self.stability);
        if let Some(item) = apply_item(model, self.nav()) {
            return self.perform(&mut io, Step::follow(item, url));
        }
        if let Some(src) = frame_sources(doc, self.nav()).into_iter().next() {
            info!(src = %src, "entering embedded application frame");
            let target = absolute_url(url, &src).unwrap_or(src);
            return self.perform(&mut io, Step::Open(target));
        }
        Err(FormError::DeadEnd("description page without an apply control".to_string()))
    }

    // ========================================================================
    // Form pages
    // ========================================================================

    /// Fill the page and press its progress control. Clicks that reveal
    /// elements extend the page and go round again; clicks that change nothing
    /// fall back to auth toggles, parent actions and remaining candidates.
    fn resolve_form_page(&self, browser: &mut dyn Browser, page: &mut ParsedPage, url: &str) -> FormResult<()> {
        let nav = self.nav();
        let state = self.tracker.current();
        let mut res = FieldResolver::new(self.engine, Interactor::new(browser, self.stability), self.today);
        let mut graph = ActionGraph::new();
        let mut next_field = 0;

        for depth in 0..self.limits.max_form_depth {
            let doc = res.interactor().capture_now()?;
            if page.model.fields.len() < 3 && page_mentions(&doc, &nav.page_error) {
                warn!("page reports an error, reloading");
                let io = res.interactor();
                io.browser().refresh()?;
                io.browser().wait_until_stable(&self.stability.with_padding(RELOAD_PADDING))?;
                return Ok(());
            }

            let mut auth = None;
            if state == NavigationState::Auth {
                match plan_auth(&page.model, nav, url) {
                    AuthPlan::Unresolvable => {
                        return Err(FormError::DeadEnd("auth page without a usable control".to_string()));
                    }
                    AuthPlan::Step(step) => return self.perform(res.interactor(), step),
                    AuthPlan::Proceed { auth_type, button, map } => {
                        if auth_type == AuthType::Verify {
                            if let Some(after) = self.enter_code(&mut res, &page.model)? {
                                next_field = next_field.max(after);
                            }
                        }
                        auth = Some(AuthStep { auth_type, button, map });
                    }
                }
            }

            if state == NavigationState::LoggedIn && depth == 0 {
                self.upload_files(&mut res, &page.model)?;
            }

            next_field = self.resolve_fields(&mut res, page, next_field)?;

            let doc = res.interactor().capture_now()?;
            let ack = ack_item(&page.model, &doc, nav);
            let progress = match state {
                NavigationState::LoggedIn => match progress_item(&page.model, nav) {
                    Some(item) => Some(item),
                    None => return Err(FormError::DeadEnd("no progress control on form page".to_string())),
                },
                _ => None,
            };
            let candidates = [ack, progress, auth.as_ref().map(|a| a.button.clone())];
            let live = |item: &ActionItem| validated_xpath(&doc, &item.locator).is_some();
            let Some(action) = graph.select_fresh(&candidates, live) else {
                return Err(FormError::DeadEnd("no actionable control".to_string()));
            };

            let outcome = self.press(&mut res, &action)?;
            if outcome == ClickOutcome::Advanced {
                info!(action = %action.text, "form advanced");
                return Ok(());
            }

            let doc = res.interactor().capture_now()?;
            graph.record(&action, validated_xpath(&doc, &action.locator).is_some());

            if let ClickOutcome::NewElementsRevealed(locators) = &outcome {
                let reveal = Reveal { locators, index: next_field, include_parent_label: false };
                if self.parser.insert_revealed(&doc, page, reveal) > 0 {
                    continue;
                }
                info!("revealed elements held nothing to fill");
            }

            warn!(action = %action.text, "click did not move the form");
            if let Some(auth) = auth.as_ref().filter(|a| a.button == action) {
                if self.verification_lock(&mut res, auth, url)? {
                    return Ok(());
                }
                if let Some(toggle) = auth.map.toggle_for(&action) {
                    if let Some(found) = validated_xpath(&doc, &toggle.locator) {
                        info!(to = %toggle.text, "switching between sign-up and sign-in");
                        let io = res.interactor();
                        io.click(&found.value)?;
                        io.browser().wait_until_stable(&self.stability.with_padding(STEP_PADDING))?;
                        return Ok(());
                    }
                }
            }

            let live = |item: &ActionItem| validated_xpath(&doc, &item.locator).is_some();
            if let Some((position, parent)) = graph.next_parent(live) {
                info!(parent = %parent.text, "clicking parent action again");
                if self.press(&mut res, &parent)? == ClickOutcome::Advanced {
                    return Ok(());
                }
                let doc = res.interactor().capture_now()?;
                graph.unwind(position, validated_xpath(&doc, &parent.locator).is_some());
                continue;
            }

            if candidates.iter().flatten().any(|c| *c != action) {
                info!("trying the remaining action candidates");
                continue;
            }
            return Err(FormError::DeadEnd(format!("'{}' did not move the form", action.text)));
        }

        warn!(depth = self.limits.max_form_depth, "form page depth exhausted");
        Err(FormError::DeadEnd(format!(
            "form page unresolved after {} rounds",
            self.limits.max_form_depth
        )))
    }

    /// Click an action and classify the result. A control that refuses every
    /// click strategy counts as changing nothing.
    fn press(&self, res: &mut FieldResolver<'_, '_>, item: &ActionItem) -> FormResult<ClickOutcome> {
        let doc = res.interactor().capture_now()?;
        let Some(found) = validated_xpath(&doc, &item.locator) else {
            warn!(action = %item.text, "action no longer on the page");
            return Ok(ClickOutcome::NoChange);
        };
        info!(action = %item.text, stage = ?found.stage, "clicking action");
        let threshold = self.engine.thresholds().navigation_change;
        let blacklists = &self.engine.tables().blacklists;
        let outcome = match res.interactor().click_and_classify(&found.value, threshold, blacklists) {
            Err(e) if e.is_retryable() || matches!(e, FormError::InteractionFailed { .. }) => {
                warn!(action = %item.text, error = %e, "action could not be clicked");
                ClickOutcome::NoChange
            }
            other => other?,
        };
        let summary = match &outcome {
            ClickOutcome::NewElementsRevealed(l) => format!("revealed {}", l.len()),
            other => format!("{:?}", other),
        };
        self.trace(self.event().with_action(&item.text).with_outcome(summary));
        Ok(outcome)
    }

    /// Resolve fields from `start` on, in document order. Returns the index
    /// just past the last field.
    fn resolve_fields(
        &self,
        res: &mut FieldResolver<'_, '_>,
        page: &mut ParsedPage,
        start: usize,
    ) -> FormResult<usize> {
        let mut index = start;
        let mut remapped_at = None;

        while index < page.model.fields.len() {
            if !answerable(page.model.fields[index].field_type) {
                index += 1;
                continue;
            }

            let doc = res.interactor().capture_now()?;
            if is_misplaced(&doc, &page.model.fields[index].locator) {
                let field = &mut page.model.fields[index];
                warn!(label = field.display_label(), "field misplaced, revalidating");
                match validated_xpath(&doc, &field.locator) {
                    Some(found) => field.locator = Locator::relative_only(found.value),
                    None if remapped_at != Some(index) => {
                        remapped_at = Some(index);
                        let field = field.clone();
                        index = self.remap(page, &doc, &field, index);
                        continue;
                    }
                    None => {
                        error!(label = field.display_label(), "field left the page");
                        index += 1;
                        continue;
                    }
                }
            }

            match res.resolve(&page.model.fields[index])? {
                FieldOutcome::Revealed(locators) => {
                    let doc = res.interactor().capture_now()?;
                    let reveal = Reveal { locators: &locators, index: index + 1, include_parent_label: true };
                    self.parser.insert_revealed(&doc, page, reveal);
                }
                FieldOutcome::Failed(reason) => {
                    if let Some(resume_at) = self.drop_education_entry(res, &page.model, index)? {
                        index = resume_at;
                        continue;
                    }
                    warn!(label = page.model.fields[index].display_label(), reason = %reason, "field left unresolved");
                }
                FieldOutcome::Resolved | FieldOutcome::Skipped => {}
            }
            index += 1;
        }
        Ok(index)
    }

    /// Parse the page again and find where `field` went. Returns the index to
    /// continue at.
    fn remap(&self, page: &mut ParsedPage, doc: &Document, field: &FieldDescriptor, index: usize) -> usize {
        warn!(label = field.display_label(), "re-parsing page to remap fields");
        let fresh = self.parser.parse_page(doc, &page.model.metadata.url);
        if fresh.model.fields.len() == page.model.fields.len() {
            *page = fresh;
            info!(index, "fields remapped in place");
            return index;
        }
        match fresh.model.fields.iter().position(|f| f.same_identity(field)) {
            Some(found) => {
                *page = fresh;
                info!(from = index, to = found, "fields remapped");
                found
            }
            None => {
                error!(label = field.display_label(), "field disappeared from the page");
                index + 1
            }
        }
    }

    /// An education entry whose multiselect failed is removed through the
    /// page's own remove control. The n-th section entry on the page owns the
    /// n-th remove button. Returns the index past the entry's fields.
    fn drop_education_entry(
        &self,
        res: &mut FieldResolver<'_, '_>,
        model: &PageModel,
        index: usize,
    ) -> FormResult<Option<usize>> {
        let field = &model.fields[index];
        let Some(tag) = field
            .section()
            .filter(|t| field.field_type == FieldType::Multiselect && t.category == SectionCategory::Education)
        else {
            return Ok(None);
        };
        let entry = (tag.category, tag.ordinal);

        let mut entries: Vec<(SectionCategory, usize)> = Vec::new();
        for t in model.fields.iter().filter_map(FieldDescriptor::section) {
            if !entries.contains(&(t.category, t.ordinal)) {
                entries.push((t.category, t.ordinal));
            }
        }
        let Some(position) = entries.iter().position(|e| *e == entry) else {
            return Ok(None);
        };
        let remover = model
            .buttons
            .iter()
            .filter(|b| b.text.as_deref().is_some_and(|t| matches_any(t, &self.nav().remove_section, MatchOpts::SUBSTRING)))
            .nth(position);
        let Some(remover) = remover else {
            return Ok(None);
        };
        let doc = res.interactor().capture_now()?;
        let Some(found) = validated_xpath(&doc, &remover.locator) else {
            return Ok(None);
        };

        info!(ordinal = tag.ordinal, "removing education entry that could not be filled");
        res.interactor().click(&found.value)?;
        let past = model.fields[index..]
            .iter()
            .position(|f| f.section().is_none_or(|t| (t.category, t.ordinal) != entry))
            .map_or(model.fields.len(), |offset| index + offset);
        Ok(Some(past))
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    /// Resume inputs first, resume buttons when no input took the file, then
    /// required non-resume inputs. Failures are logged and the form goes on.
    fn upload_files(&self, res: &mut FieldResolver<'_, '_>, model: &PageModel) -> FormResult<()> {
        let profile = self.engine.profile();
        let is_upload = |f: &&FieldDescriptor, kind: UploadKind| {
            f.field_type == FieldType::File && f.options == FieldOptions::Upload { upload: kind }
        };

        let mut uploaded = false;
        for field in model.fields.iter().filter(|f| is_upload(f, UploadKind::Resume)) {
            let doc = res.interactor().capture_now()?;
            let Some(found) = validated_xpath(&doc, &field.locator) else {
                warn!(label = field.display_label(), "resume input not found");
                continue;
            };
            match soft(upload_field(res.interactor(), field, &found.value, profile))? {
                FieldOutcome::Failed(reason) => {
                    warn!(reason = %reason, "resume upload failed");
                    if field.required {
                        return Ok(());
                    }
                }
                _ => uploaded = true,
            }
        }

        if !uploaded {
            let buttons = model
                .buttons
                .iter()
                .filter(|b| b.button_type == ButtonType::File && b.name.as_deref() == Some("Resume"));
            for button in buttons {
                let doc = res.interactor().capture_now()?;
                let Some(found) = validated_xpath(&doc, &button.locator) else {
                    continue;
                };
                if let FieldOutcome::Failed(reason) = soft(upload_button(res.interactor(), button, &found.value, profile))? {
                    warn!(reason = %reason, "resume button upload failed");
                    return Ok(());
                }
            }
        }

        for field in model.fields.iter().filter(|f| f.required && is_upload(f, UploadKind::Other)) {
            let doc = res.interactor().capture_now()?;
            let Some(found) = validated_xpath(&doc, &field.locator) else {
                continue;
            };
            if let FieldOutcome::Failed(reason) = soft(upload_field(res.interactor(), field, &found.value, profile))? {
                warn!(label = field.display_label(), reason = %reason, "required upload failed");
                return Ok(());
            }
        }
        Ok(())
    }

    // ========================================================================
    // Verification
    // ========================================================================

    /// Enter a one-time code into the page's digit fields. Returns the index
    /// past the last digit field, or `None` when the page has no usable digit
    /// fields but can still be signed into.
    fn enter_code(&self, res: &mut FieldResolver<'_, '_>, model: &PageModel) -> FormResult<Option<usize>> {
        let digits = model.verification_fields();
        if !DIGIT_FIELD_COUNTS.contains(&digits.len()) {
            if email_fields(model).is_empty() && password_fields(model).is_empty() {
                return Err(FormError::DeadEnd("verification page without code fields".to_string()));
            }
            return Ok(None);
        }

        let code = self
            .verifier
            .fetch_code(digits.len())?
            .filter(|c| accepts_code(c, digits.len()))
            .ok_or_else(|| FormError::DeadEnd("no usable verification code".to_string()))?;
        info!(digit_fields = digits.len(), "verification code received");

        let parts: Vec<String> = if digits.len() == 1 {
            vec![code]
        } else {
            code.chars().map(String::from).collect()
        };
        let doc = res.interactor().capture_now()?;
        for (field, part) in digits.iter().zip(&parts) {
            let found = validated_xpath(&doc, &field.locator)
                .ok_or_else(|| FormError::ElementNotFound("verification field".to_string()))?;
            res.interactor().type_text(&found.value, part)?;
        }

        let past = model
            .fields
            .iter()
            .rposition(|f| digits.iter().any(|d| std::ptr::eq(f, *d)))
            .map_or(model.fields.len(), |i| i + 1);
        Ok(Some(past))
    }

    /// After an auth click that changed nothing: a page asking for email
    /// confirmation is unlocked through the collaborator's link. Returns true
    /// when the page should be parsed again.
    fn verification_lock(&self, res: &mut FieldResolver<'_, '_>, auth: &AuthStep, url: &str) -> FormResult<bool> {
        let nav = self.nav();
        let doc = res.interactor().capture_now()?;
        if page_mentions(&doc, &nav.otp_verification_page) {
            info!("code entry appeared, parsing again");
            return Ok(true);
        }
        if !page_mentions(&doc, &nav.email_verification_page) {
            return Ok(false);
        }

        let link = self
            .verifier
            .fetch_link()?
            .ok_or_else(|| FormError::DeadEnd("verification link not received".to_string()))?;
        info!("opening verification link");
        let io = res.interactor();
        let settle = self.stability.with_padding(STEP_PADDING);
        io.browser().open(&link)?;
        io.browser().wait_until_stable(&settle)?;
        io.browser().open(url)?;
        io.browser().wait_until_stable(&settle)?;
        info!("email verified");

        if auth.auth_type == AuthType::SignUp {
            let doc = io.capture_now()?;
            let sign_in = auth
                .map
                .items(AuthType::SignIn)
                .iter()
                .find_map(|b| validated_xpath(&doc, &b.locator));
            if let Some(found) = sign_in {
                io.click(&found.value)?;
                io.browser().wait_until_stable(&settle)?;
            }
        }
        Ok(true)
    }
}
