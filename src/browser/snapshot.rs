use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::browser::browser::{Browser, ElementState};
use crate::dom::document::{Document, NodeId};
use crate::dom::xpath::{select, select_unique};
use crate::error::{FormError, FormResult};
use crate::locator::locator_model::ClickStrategy;

/// What clicking a registered element does to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Replace the current document, keeping the url.
    Replace(String),
    /// Navigate to a page registered with [`SnapshotBrowser::with_page`].
    Navigate(String),
}

/// Everything done to a [`SnapshotBrowser`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserAction {
    Open(String),
    Click { locator: String, strategy: ClickStrategy },
    Scroll(String),
    Clear(String),
    Type { locator: String, text: String },
    Select { locator: String, text: String },
    Upload { locator: String, path: String, picker: bool },
    Refresh,
    Evaluate(String),
}

/// In-memory browser over scripted HTML. Clicking an element runs the first
/// registered reaction whose locator resolves to the same node; radios and
/// checkboxes toggle `checked`, typing edits `value`.
#[derive(Debug, Clone)]
pub struct SnapshotBrowser {
    pages: HashMap<String, String>,
    url: String,
    doc: Document,
    reactions: Vec<(String, Reaction)>,
    scripts: HashMap<String, Value>,
    native_blocked: HashSet<String>,
    actions: Vec<BrowserAction>,
}

impl SnapshotBrowser {
    pub fn new(url: &str, html: &str) -> Self {
        let mut pages = HashMap::new();
        pages.insert(url.to_string(), html.to_string());
        Self {
            pages,
            url: url.to_string(),
            doc: Document::parse(html),
            reactions: Vec::new(),
            scripts: HashMap::new(),
            native_blocked: HashSet::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn on_click(mut self, locator: &str, reaction: Reaction) -> Self {
        self.reactions.push((locator.to_string(), reaction));
        self
    }

    pub fn on_evaluate(mut self, script: &str, result: Value) -> Self {
        self.scripts.insert(script.to_string(), result);
        self
    }

    /// Native clicks on this locator fail, as an overlay would make them.
    pub fn block_native_click(mut self, locator: &str) -> Self {
        self.native_blocked.insert(locator.to_string());
        self
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn actions(&self) -> &[BrowserAction] {
        &self.actions
    }

    /// Locators clicked so far, in order.
    pub fn clicks(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                BrowserAction::Click { locator, .. } => Some(locator.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Value attribute of the element `locator` resolves to.
    pub fn value_of(&self, locator: &str) -> Option<String> {
        select_unique(&self.doc, locator).and_then(|n| self.doc.attr(n, "value").map(str::to_string))
    }

    pub fn is_checked(&self, locator: &str) -> bool {
        select_unique(&self.doc, locator).is_some_and(|n| self.doc.has_attr(n, "checked"))
    }

    fn resolve(&self, locator: &str) -> FormResult<NodeId> {
        let found = select(&self.doc, locator)?;
        match found.as_slice() {
            [node] => Ok(*node),
            [] => Err(FormError::ElementNotFound(locator.to_string())),
            _ => Err(FormError::ElementMisplaced(locator.to_string())),
        }
    }

    fn load(&mut self, url: &str) -> FormResult<()> {
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| FormError::SessionProtocol { command: "navigate".into(), error: format!("no page for {}", url) })?;
        self.doc = Document::parse(html);
        self.url = url.to_string();
        Ok(())
    }

    fn toggle(&mut self, node: NodeId) {
        if self.doc.tag(node) != Some("input") {
            return;
        }
        match self.doc.attr(node, "type").map(str::to_lowercase).as_deref() {
            Some("checkbox") => {
                if self.doc.has_attr(node, "checked") {
                    self.doc.remove_attr(node, "checked");
                } else {
                    self.doc.set_attr(node, "checked", "");
                }
            }
            Some("radio") => {
                let name = self.doc.attr(node, "name").map(str::to_string);
                if let Some(name) = name {
                    let group: Vec<NodeId> = self
                        .doc
                        .elements_by_tag(&["input"])
                        .filter(|n| self.doc.attr(*n, "name") == Some(name.as_str()))
                        .collect();
                    for other in group {
                        self.doc.remove_attr(other, "checked");
                    }
                }
                self.doc.set_attr(node, "checked", "");
            }
            _ => {}
        }
    }

    fn react(&mut self, node: NodeId) -> FormResult<()> {
        let reaction = self
            .reactions
            .iter()
            .find(|(locator, _)| select_unique(&self.doc, locator) == Some(node))
            .map(|(_, r)| r.clone());
        match reaction {
            Some(Reaction::Replace(html)) => {
                debug!(url = %self.url, "click replaced document");
                self.doc = Document::parse(&html);
            }
            Some(Reaction::Navigate(url)) => {
                debug!(url = %url, "click navigated");
                self.load(&url)?;
            }
            None => self.toggle(node),
        }
        Ok(())
    }
}

impl Browser for SnapshotBrowser {
    fn open(&mut self, url: &str) -> FormResult<()> {
        self.actions.push(BrowserAction::Open(url.to_string()));
        self.load(url)
    }

    fn current_url(&mut self) -> FormResult<String> {
        Ok(self.url.clone())
    }

    fn snapshot(&mut self) -> FormResult<String> {
        Ok(self.doc.to_html())
    }

    fn evaluate(&mut self, script: &str) -> FormResult<Value> {
        self.actions.push(BrowserAction::Evaluate(script.to_string()));
        Ok(self.scripts.get(script).cloned().unwrap_or(Value::Null))
    }

    fn locate(&mut self, locator: &str) -> FormResult<ElementState> {
        let found = select(&self.doc, locator)?;
        let mut state = ElementState { count: found.len(), ..ElementState::default() };
        if let [node] = found.as_slice() {
            let node = *node;
            state.visible = self.doc.is_visible(node);
            state.enabled = !self.doc.has_attr(node, "disabled");
            state.checked = self.doc.has_attr(node, "checked");
            state.tag = self.doc.tag(node).map(str::to_string);
            state.value = self.doc.attr(node, "value").map(str::to_string);
        }
        Ok(state)
    }

    fn click(&mut self, locator: &str, strategy: ClickStrategy) -> FormResult<()> {
        if strategy == ClickStrategy::Native && self.native_blocked.contains(locator) {
            return Err(FormError::InteractionFailed { action: "click".into(), locator: locator.to_string() });
        }
        let node = self.resolve(locator)?;
        self.actions.push(BrowserAction::Click { locator: locator.to_string(), strategy });
        self.react(node)
    }

    fn scroll_to(&mut self, locator: &str) -> FormResult<()> {
        self.resolve(locator)?;
        self.actions.push(BrowserAction::Scroll(locator.to_string()));
        Ok(())
    }

    fn select_all(&mut self, locator: &str) -> FormResult<()> {
        self.resolve(locator).map(|_| ())
    }

    fn clear(&mut self, locator: &str) -> FormResult<()> {
        let node = self.resolve(locator)?;
        self.doc.set_attr(node, "value", "");
        self.actions.push(BrowserAction::Clear(locator.to_string()));
        Ok(())
    }

    fn type_text(&mut self, locator: &str, text: &str) -> FormResult<()> {
        let node = self.resolve(locator)?;
        let value = format!("{}{}", self.doc.attr(node, "value").unwrap_or(""), text);
        self.doc.set_attr(node, "value", &value);
        self.actions.push(BrowserAction::Type { locator: locator.to_string(), text: text.to_string() });
        Ok(())
    }

    fn select_option(&mut self, locator: &str, text: &str) -> FormResult<()> {
        let node = self.resolve(locator)?;
        let options: Vec<NodeId> = self
            .doc
            .element_descendants(node)
            .filter(|n| self.doc.tag(*n) == Some("option"))
            .collect();
        let chosen = options
            .iter()
            .copied()
            .find(|o| self.doc.inner_text(*o).trim() == text.trim())
            .ok_or_else(|| FormError::InteractionFailed { action: format!("select '{}'", text), locator: locator.to_string() })?;
        for option in options {
            self.doc.remove_attr(option, "selected");
        }
        self.doc.set_attr(chosen, "selected", "");
        self.actions.push(BrowserAction::Select { locator: locator.to_string(), text: text.to_string() });
        Ok(())
    }

    fn set_files(&mut self, locator: &str, path: &str) -> FormResult<()> {
        let node = self.resolve(locator)?;
        self.doc.set_attr(node, "value", path);
        self.actions.push(BrowserAction::Upload { locator: locator.to_string(), path: path.to_string(), picker: false });
        Ok(())
    }

    fn choose_file(&mut self, locator: &str, path: &str) -> FormResult<()> {
        let node = self.resolve(locator)?;
        self.doc.set_attr(node, "data-uploaded", path);
        self.actions.push(BrowserAction::Upload { locator: locator.to_string(), path: path.to_string(), picker: true });
        Ok(())
    }

    fn refresh(&mut self) -> FormResult<()> {
        self.actions.push(BrowserAction::Refresh);
        let url = self.url.clone();
        self.load(&url)
    }

    fn blur(&mut self) -> FormResult<()> {
        Ok(())
    }
}
