use std::collections::HashSet;

use tracing::{debug, info};

use crate::navigation::actions::ActionItem;

/// Locator strings that identify an action across parses.
pub fn fingerprints(item: &ActionItem) -> impl Iterator<Item = &str> {
    std::iter::once(item.locator.primary.as_str()).chain(item.locator.relative.as_deref())
}

/// Actions clicked on one form page that did not advance it.
///
/// Clicked controls still present afterwards are kept on a parent stack:
/// they may have opened a dialog whose own controls need answering first,
/// and clicking them again can close it. Every clicked control is marked
/// visited so fresher candidates are preferred.
#[derive(Debug, Clone, Default)]
pub struct ActionGraph {
    parents: Vec<ActionItem>,
    visited: HashSet<String>,
}

impl ActionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visited(&self, item: &ActionItem) -> bool {
        fingerprints(item).any(|f| self.visited.contains(f))
    }

    pub fn parents(&self) -> &[ActionItem] {
        &self.parents
    }

    /// Note a click that did not advance the page.
    pub fn record(&mut self, item: &ActionItem, still_present: bool) {
        if !still_present || self.is_visited(item) {
            return;
        }
        info!(action = %item.text, link = item.is_link(), "action kept as parent");
        self.parents.push(item.clone());
        self.visited.extend(fingerprints(item).map(str::to_string));
    }

    /// First live candidate not clicked before; with none, the first candidate.
    pub fn select_fresh(
        &self,
        candidates: &[Option<ActionItem>],
        live: impl Fn(&ActionItem) -> bool,
    ) -> Option<ActionItem> {
        let present = || candidates.iter().flatten();
        present()
            .find(|c| live(c) && !self.is_visited(c))
            .or_else(|| present().next())
            .cloned()
    }

    /// Most recent parent worth clicking again, with its stack position.
    /// Links are left alone; following them again reloads the page.
    pub fn next_parent(&self, live: impl Fn(&ActionItem) -> bool) -> Option<(usize, ActionItem)> {
        self.parents
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, p)| !p.is_link())
            .find(|(_, p)| live(p))
            .map(|(i, p)| (i, p.clone()))
    }

    /// Drop everything above the parent at `position`, and the parent itself
    /// unless it is still on the page.
    pub fn unwind(&mut self, position: usize, still_present: bool) {
        let keep = if still_present { position + 1 } else { position };
        if keep < self.parents.len() {
            debug!(from = self.parents.len(), to = keep, "parent stack unwound");
            self.parents.truncate(keep);
        }
    }
}
