use chrono::Utc;
use serde::Serialize;

use crate::extract::page_model::PageModel;
use crate::navigation::state::NavigationState;

/// One navigation step, written as a JSON line.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: i64,
    pub iteration: u32,

    pub state: String,
    pub url: Option<String>,

    pub action: Option<String>,
    pub outcome: Option<String>,

    pub fields: usize,
    pub buttons: usize,
    pub links: usize,
}

impl TraceEvent {
    pub fn now(iteration: u32, state: NavigationState) -> Self {
        Self {
            timestamp_ms: Utc::now().timestamp_millis(),
            iteration,
            state: format!("{:?}", state),
            url: None,
            action: None,
            outcome: None,
            fields: 0,
            buttons: 0,
            links: 0,
        }
    }

    pub fn with_page(mut self, page: &PageModel) -> Self {
        self.url = Some(page.metadata.url.clone());
        self.fields = page.fields.len();
        self.buttons = page.buttons.len();
        self.links = page.links.len();
        self
    }

    pub fn with_action(mut self, action: impl ToString) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub fn with_outcome(mut self, outcome: impl ToString) -> Self {
        self.outcome = Some(outcome.to_string());
        self
    }
}
