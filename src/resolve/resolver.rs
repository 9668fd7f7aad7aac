use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::dom::document::Document;
use crate::dom::xpath::select_unique;
use crate::error::{FormError, FormResult};
use crate::extract::page_model::{FieldDescriptor, FieldOptions, FieldType};
use crate::locator::revalidate::{remap, typing_locator, validated_xpath};
use crate::resolve::dates::{DateAnswer, date_answer};
use crate::resolve::decision::{Decision, FieldOutcome};
use crate::resolve::engine::AnswerEngine;
use crate::resolve::interact::Interactor;
use crate::resolve::upload::upload_field;

/// Skip an optional field, fail a required one.
pub fn unresolved(field: &FieldDescriptor, reason: impl Into<String>) -> FieldOutcome {
    if field.required {
        FieldOutcome::Failed(reason.into())
    } else {
        FieldOutcome::Skipped
    }
}

fn revealed_or_resolved(locators: Vec<String>) -> FieldOutcome {
    if locators.is_empty() {
        FieldOutcome::Resolved
    } else {
        FieldOutcome::Revealed(locators)
    }
}

/// Applies decisions to the live page, one field at a time.
pub struct FieldResolver<'e, 'b> {
    pub(super) engine: &'e AnswerEngine<'e>,
    pub(super) io: Interactor<'b>,
    pub(super) today: NaiveDate,
}

impl<'e, 'b> FieldResolver<'e, 'b> {
    pub fn new(engine: &'e AnswerEngine<'e>, io: Interactor<'b>, today: NaiveDate) -> Self {
        Self { engine, io, today }
    }

    pub fn interactor(&mut self) -> &mut Interactor<'b> {
        &mut self.io
    }

    /// Resolve one field against the current page. Interaction failures are
    /// an outcome, not an error; oracle and session errors propagate.
    pub fn resolve(&mut self, field: &FieldDescriptor) -> FormResult<FieldOutcome> {
        debug!(label = field.display_label(), field_type = ?field.field_type, "resolving field");
        let outcome = match self.dispatch(field) {
            Err(
                e @ (FormError::InteractionFailed { .. }
                | FormError::ElementNotFound(_)
                | FormError::ElementMisplaced(_)),
            ) => {
                warn!(label = field.display_label(), error = %e, "interaction failed");
                unresolved(field, e.to_string())
            }
            other => other?,
        };
        match &outcome {
            FieldOutcome::Failed(reason) => warn!(label = field.display_label(), reason = %reason, "field failed"),
            other => info!(label = field.display_label(), outcome = ?other, "field done"),
        }
        Ok(outcome)
    }

    fn dispatch(&mut self, field: &FieldDescriptor) -> FormResult<FieldOutcome> {
        if matches!(field.options, FieldOptions::Verification { .. })
            || matches!(field.field_type, FieldType::Hidden | FieldType::Button)
        {
            return Ok(FieldOutcome::Skipped);
        }

        let doc = self.io.capture_now()?;
        let Some(found) = validated_xpath(&doc, &field.locator) else {
            return Ok(unresolved(field, "locator no longer resolves"));
        };
        let xpath = found.value;

        let state = self.io.browser().locate(&xpath)?;
        if field.field_type != FieldType::File && !state.is_interactable() {
            info!(label = field.display_label(), "element not interactable, skipping");
            return Ok(FieldOutcome::Skipped);
        }

        match field.field_type {
            FieldType::Radio => self.resolve_radio(field, &doc),
            FieldType::Checkbox => self.resolve_checkbox(field, &doc),
            FieldType::Select => self.resolve_dropdown(field, &doc, &xpath),
            FieldType::List => self.resolve_dynamic_list(field, &xpath, None),
            FieldType::Multiselect => self.resolve_multiselect(field, &doc, &xpath),
            FieldType::Date | FieldType::Datelist => self.resolve_date(field, &doc, &xpath, state.value),
            FieldType::File => upload_field(&mut self.io, field, &xpath, self.engine.profile()),
            _ => self.resolve_text(field, &doc, &xpath, state.value),
        }
    }

    // ========================================================================
    // Text
    // ========================================================================

    fn resolve_text(
        &mut self,
        field: &FieldDescriptor,
        doc: &Document,
        xpath: &str,
        current: Option<String>,
    ) -> FormResult<FieldOutcome> {
        match self.engine.resolve(field, &[])? {
            Decision::Value(value) => self.enter(doc, xpath, &value, current.as_deref()),
            _ => Ok(FieldOutcome::Skipped),
        }
    }

    fn enter(&mut self, doc: &Document, xpath: &str, value: &str, current: Option<&str>) -> FormResult<FieldOutcome> {
        if current.is_some_and(|c| c == value) {
            debug!(xpath, "value already present");
            return Ok(FieldOutcome::Skipped);
        }
        let target = typing_locator(doc, xpath);
        self.io.type_text(&target, value)?;
        Ok(FieldOutcome::Resolved)
    }

    fn resolve_date(
        &mut self,
        field: &FieldDescriptor,
        doc: &Document,
        xpath: &str,
        current: Option<String>,
    ) -> FormResult<FieldOutcome> {
        match date_answer(field, self.engine.profile(), self.today) {
            DateAnswer::Skip => Ok(FieldOutcome::Skipped),
            DateAnswer::Fail(reason) => Ok(FieldOutcome::Failed(reason)),
            DateAnswer::Value(value) if field.field_type == FieldType::Datelist => {
                if field.placeholder.as_deref() == Some(value.as_str()) {
                    return Ok(FieldOutcome::Skipped);
                }
                self.resolve_dynamic_list(field, xpath, Some(value))
            }
            DateAnswer::Value(value) => self.enter(doc, xpath, &value, current.as_deref()),
        }
    }

    // ========================================================================
    // Radio, checkbox, dropdown
    // ========================================================================

    fn resolve_radio(&mut self, field: &FieldDescriptor, doc: &Document) -> FormResult<FieldOutcome> {
        let choices = field.options.choices();
        let texts: Vec<String> = choices.iter().map(|c| c.text.clone()).collect();
        let Decision::Select(chosen) = self.engine.resolve(field, &texts)? else {
            return Ok(FieldOutcome::Skipped);
        };
        let Some(choice) = chosen.first().and_then(|i| choices.get(*i)) else {
            return Ok(FieldOutcome::Skipped);
        };
        let Some(locator) = remap(doc, &choice.locator).map(|t| t.value) else {
            return Ok(unresolved(field, format!("option '{}' not found", choice.text)));
        };
        if self.io.browser().locate(&locator)?.checked {
            debug!(option = %choice.text, "option already selected");
            return Ok(FieldOutcome::Resolved);
        }
        self.io.browser().scroll_to(&locator)?;
        let revealed = self.io.click_and_capture(&locator, &locator)?;
        info!(option = %choice.text, revealed = revealed.len(), "radio option selected");
        Ok(revealed_or_resolved(revealed))
    }

    fn resolve_checkbox(&mut self, field: &FieldDescriptor, doc: &Document) -> FormResult<FieldOutcome> {
        let choices = field.options.choices();
        if choices.is_empty() {
            return Ok(FieldOutcome::Failed("checkbox without options".to_string()));
        }
        let texts: Vec<String> = choices.iter().map(|c| c.text.clone()).collect();
        let Decision::Select(chosen) = self.engine.resolve(field, &texts)? else {
            return Ok(FieldOutcome::Skipped);
        };

        for choice in chosen.iter().filter_map(|i| choices.get(*i)) {
            let Some(locator) = remap(doc, &choice.locator).map(|t| t.value) else {
                return Ok(FieldOutcome::Failed(format!("checkbox '{}' not found", choice.text)));
            };
            if self.io.browser().locate(&locator)?.checked {
                continue;
            }
            self.io.click(&locator)?;
            if !self.io.browser().locate(&locator)?.checked {
                return Ok(FieldOutcome::Failed(format!("checkbox '{}' did not toggle", choice.text)));
            }
            debug!(option = %choice.text, "checkbox checked");
        }
        Ok(FieldOutcome::Resolved)
    }

    fn resolve_dropdown(&mut self, field: &FieldDescriptor, doc: &Document, xpath: &str) -> FormResult<FieldOutcome> {
        let FieldOptions::List { items } = &field.options else {
            return Ok(unresolved(field, "dropdown without options"));
        };
        let multiple = select_unique(doc, xpath).is_some_and(|n| doc.has_attr(n, "multiple"));
        let decision = if multiple {
            self.engine.resolve_multiple(field, items)?
        } else {
            self.engine.resolve(field, items)?
        };
        let Decision::Select(chosen) = decision else {
            return Ok(FieldOutcome::Skipped);
        };
        let texts: Vec<&String> = chosen.iter().filter_map(|i| items.get(*i)).collect();
        let Some(first) = texts.first() else {
            return Ok(FieldOutcome::Skipped);
        };

        if multiple {
            for text in &texts {
                self.io.browser().select_option(xpath, text)?;
            }
            return Ok(FieldOutcome::Resolved);
        }
        if field.value.as_deref() == Some(first.as_str()) {
            return Ok(FieldOutcome::Skipped);
        }
        let revealed = self.io.select_and_capture(xpath, first)?;
        Ok(revealed_or_resolved(revealed))
    }
}
