use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::browser::stability::{StabilityOpts, wait_until_stable};
use crate::error::FormResult;
use crate::locator::locator_model::ClickStrategy;

/// What the live document reports for a locator at the time of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    pub count: usize,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ElementState {
    pub fn is_unique(&self) -> bool {
        self.count == 1
    }

    pub fn is_interactable(&self) -> bool {
        self.is_unique() && self.visible && self.enabled
    }
}

/// A live page the core drives. Locators are XPath expressions produced by
/// the locator engine. Every call blocks for at most the implementation's
/// timeout.
pub trait Browser {
    fn open(&mut self, url: &str) -> FormResult<()>;

    fn current_url(&mut self) -> FormResult<String>;

    /// Serialized DOM of the current page.
    fn snapshot(&mut self) -> FormResult<String>;

    fn evaluate(&mut self, script: &str) -> FormResult<Value>;

    fn locate(&mut self, locator: &str) -> FormResult<ElementState>;

    fn click(&mut self, locator: &str, strategy: ClickStrategy) -> FormResult<()>;

    fn scroll_to(&mut self, locator: &str) -> FormResult<()>;

    /// Select the element's whole content, as Ctrl+A would.
    fn select_all(&mut self, locator: &str) -> FormResult<()>;

    fn clear(&mut self, locator: &str) -> FormResult<()>;

    /// Type at the current caret position.
    fn type_text(&mut self, locator: &str, text: &str) -> FormResult<()>;

    /// Choose a `<select>` option by its visible text.
    fn select_option(&mut self, locator: &str, text: &str) -> FormResult<()>;

    /// Attach a file to an `<input type=file>` directly.
    fn set_files(&mut self, locator: &str, path: &str) -> FormResult<()>;

    /// Click a control that opens the OS file picker and answer it with `path`.
    fn choose_file(&mut self, locator: &str, path: &str) -> FormResult<()>;

    fn refresh(&mut self) -> FormResult<()>;

    /// Move focus off the current element, closing open popups.
    fn blur(&mut self) -> FormResult<()>;

    /// Poll snapshots until the DOM stops changing, then return the last one.
    fn wait_until_stable(&mut self, opts: &StabilityOpts) -> FormResult<String> {
        wait_until_stable(self, opts)
    }
}
