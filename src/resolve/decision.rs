use serde::Serialize;

/// What the oracle is asked when rules and profile fall short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Prompt {
    /// A question built from the field's labels.
    Question(String),
    /// No usable label; relevant metadata the oracle first phrases into a question.
    Metadata(String),
    /// Nothing worth asking about.
    Orphan,
}

/// Outcome of deciding a single field before any interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Decision {
    /// Type this text.
    Value(String),
    /// Choose these options, as indexes into the options that were decided over.
    Select(Vec<usize>),
    Skip,
    DeferToOracle { prompt: Prompt, options: Vec<String> },
}

impl Decision {
    pub fn select_one(index: usize) -> Self {
        Decision::Select(vec![index])
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Decision::DeferToOracle { .. })
    }
}

/// Result of resolving one field against the live page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldOutcome {
    Resolved,
    Skipped,
    /// Answering revealed new elements; locators in the current snapshot.
    Revealed(Vec<String>),
    Failed(String),
}

impl FieldOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FieldOutcome::Failed(_))
    }
}

/// What clicking a control did to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ClickOutcome {
    Advanced,
    NewElementsRevealed(Vec<String>),
    NoChange,
}
