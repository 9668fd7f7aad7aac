use std::collections::BTreeMap;

use tracing::debug;

use crate::extract::page_model::{SectionCategory, Subtype};

/// Profile entry counts that bound section ordinals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionLimits {
    pub work_experience: usize,
    pub education: usize,
}

impl SectionLimits {
    pub fn for_category(&self, category: SectionCategory) -> usize {
        match category {
            SectionCategory::WorkExperience => self.work_experience,
            SectionCategory::Education => self.education,
            SectionCategory::Other => 0,
        }
    }
}

/// Running counters of one repeated section.
#[derive(Debug, Clone, Default)]
pub struct SectionCounters {
    /// Identifier set whose matches open a new entry. Fixed by the first
    /// field that looks like the section's leading field.
    pub opener: Option<Vec<String>>,
    /// Entries opened so far.
    pub primary: usize,
    per_subtype: BTreeMap<Subtype, usize>,
}

impl SectionCounters {
    pub fn count(&self, subtype: Subtype) -> usize {
        self.per_subtype.get(&subtype).copied().unwrap_or(0)
    }
}

/// Counters threaded through one parse pass. A fresh context is built for
/// every parse so no state leaks between pages.
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    pub limits: SectionLimits,
    pub work: SectionCounters,
    pub education: SectionCounters,
    /// Section most recently opened, used for dates and checkboxes.
    pub last_section: Option<SectionCategory>,
    pub verification_digits: usize,
}

impl ExtractionContext {
    pub fn new(limits: SectionLimits) -> Self {
        Self { limits, ..Self::default() }
    }

    pub fn counters(&self, category: SectionCategory) -> Option<&SectionCounters> {
        match category {
            SectionCategory::WorkExperience => Some(&self.work),
            SectionCategory::Education => Some(&self.education),
            SectionCategory::Other => None,
        }
    }

    fn counters_mut(&mut self, category: SectionCategory) -> Option<&mut SectionCounters> {
        match category {
            SectionCategory::WorkExperience => Some(&mut self.work),
            SectionCategory::Education => Some(&mut self.education),
            SectionCategory::Other => None,
        }
    }

    pub fn open_section(&mut self, category: SectionCategory) {
        self.last_section = Some(category);
        if let Some(c) = self.counters_mut(category) {
            c.primary += 1;
            debug!(?category, entry = c.primary, "section entry opened");
        }
    }

    /// Next ordinal for `subtype`, or `None` once the profile has no entry left.
    pub fn claim(&mut self, category: SectionCategory, subtype: Subtype) -> Option<usize> {
        let limit = self.limits.for_category(category);
        let counters = self.counters_mut(category)?;
        let current = counters.count(subtype);
        if current >= limit {
            debug!(?category, ?subtype, limit, "section ordinal cap reached");
            return None;
        }
        counters.per_subtype.insert(subtype, current + 1);
        Some(current + 1)
    }

    /// Ordinal of the current entry of the last opened section.
    pub fn current_entry(&self) -> Option<(SectionCategory, usize)> {
        let category = self.last_section?;
        self.counters(category).map(|c| (category, c.primary))
    }

    pub fn next_verification_digit(&mut self) -> usize {
        self.verification_digits += 1;
        self.verification_digits
    }
}
