use crate::error::FormResult;

/// External reasoning service consulted when no rule or profile value decides
/// a field. Calls are stateless; retries are the caller's business.
pub trait Oracle {
    /// Free-text answer to `prompt`.
    fn resolve(&self, prompt: &str) -> FormResult<String>;

    /// Answer `question` given the `options` shown on the page. With
    /// `multi_select` the answer may name several options, one per line.
    /// `top_k` bounds how many options the backend considers.
    fn resolve_options(&self, question: &str, options: &[String], multi_select: bool, top_k: usize)
    -> FormResult<String>;
}

/// Options offered to the oracle for one question.
pub const DEFAULT_TOP_K: usize = 15;

/// Marker an oracle returns when a question does not apply.
pub const NOT_APPLICABLE: &str = "n/a";

pub fn is_not_applicable(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(NOT_APPLICABLE)
}
