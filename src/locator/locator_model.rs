use serde::{Deserialize, Serialize};

use crate::dom::xpath::is_absolute;

/// Primary locator plus the attribute-based relative fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative: Option<String>,
}

impl Locator {
    pub fn new(primary: impl Into<String>, relative: Option<String>) -> Self {
        Self { primary: primary.into(), relative }
    }

    pub fn relative_only(relative: impl Into<String>) -> Self {
        let relative = relative.into();
        Self { primary: relative.clone(), relative: Some(relative) }
    }

    pub fn is_primary_absolute(&self) -> bool {
        is_absolute(&self.primary)
    }

    /// Identity used by visited sets and remapping.
    pub fn key(&self) -> &str {
        self.relative.as_deref().unwrap_or(&self.primary)
    }
}

/// Which revalidation stage produced a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemapStage {
    /// The stored expression still matches exactly one element.
    Unique,
    /// A prefix of the predicate list matches uniquely.
    Reduced,
    /// Value-like and tabindex predicates removed.
    Conservative,
    /// All volatile attribute predicates removed.
    Aggressive,
    /// An absolute path used as the last resort.
    Absolute,
}

/// How an element was clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClickStrategy {
    Native,
    ScrollThenClick,
    Script,
}
