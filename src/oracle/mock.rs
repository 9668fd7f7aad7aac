use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::error::{FormError, FormResult};
use crate::oracle::oracle::Oracle;

// ============================================================================
// Mock Backend (for testing without Ollama)
// ============================================================================

/// Answers from a script, in order. Every call is recorded so tests can
/// assert how often (and with what) the oracle was consulted.
#[derive(Debug, Default)]
pub struct MockOracle {
    answers: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { answers: Mutex::new(answers.into_iter().map(Into::into).collect()), ..Self::default() }
    }

    /// Answer used once the script is exhausted. Without one, an exhausted
    /// script is an oracle failure.
    pub fn with_fallback(mut self, answer: impl Into<String>) -> Self {
        self.fallback = Some(answer.into());
        self
    }

    pub fn push(&self, answer: impl Into<String>) {
        self.answers.lock().push_back(answer.into());
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn next(&self, prompt: String) -> FormResult<String> {
        self.prompts.lock().push(prompt);
        match self.answers.lock().pop_front() {
            Some(answer) => Ok(answer),
            None => self.fallback.clone().ok_or_else(|| FormError::Oracle("mock script exhausted".into())),
        }
    }
}

impl Oracle for MockOracle {
    fn resolve(&self, prompt: &str) -> FormResult<String> {
        self.next(prompt.to_string())
    }

    fn resolve_options(&self, question: &str, options: &[String], multi_select: bool, _top_k: usize)
    -> FormResult<String> {
        self.next(format!("{}\n[{}] multi={}", question, options.join(" | "), multi_select))
    }
}
