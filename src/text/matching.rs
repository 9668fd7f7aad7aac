use super::normalize::strip_whitespace;

/// How a value is compared against a keyword list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOpts {
    /// Whole-value equality instead of substring containment.
    pub exact: bool,
    pub case_sensitive: bool,
    /// Drop all whitespace on both sides before comparing.
    pub ignore_whitespace: bool,
}

impl MatchOpts {
    pub const SUBSTRING: MatchOpts = MatchOpts { exact: false, case_sensitive: false, ignore_whitespace: false };
    pub const EXACT: MatchOpts = MatchOpts { exact: true, case_sensitive: false, ignore_whitespace: false };
    pub const CASE_SENSITIVE: MatchOpts = MatchOpts { exact: false, case_sensitive: true, ignore_whitespace: false };
    pub const EXACT_CASE_SENSITIVE: MatchOpts = MatchOpts { exact: true, case_sensitive: true, ignore_whitespace: false };

    pub fn ignoring_whitespace(mut self) -> Self {
        self.ignore_whitespace = true;
        self
    }

    fn prepare(&self, text: &str) -> String {
        let text = if self.case_sensitive { text.to_string() } else { text.to_lowercase() };
        if self.ignore_whitespace { strip_whitespace(&text) } else { text }
    }
}

/// True when `value` matches any of `needles` under `opts`.
pub fn matches_any<S: AsRef<str>>(value: &str, needles: &[S], opts: MatchOpts) -> bool {
    if value.is_empty() {
        return false;
    }
    let value = opts.prepare(value);
    needles.iter().any(|needle| {
        let needle = opts.prepare(needle.as_ref());
        if opts.exact { value == needle } else { !needle.is_empty() && value.contains(&needle) }
    })
}

/// True when any present value matches any needle.
pub fn any_matches<'a, S: AsRef<str>>(
    values: impl IntoIterator<Item = Option<&'a str>>,
    needles: &[S],
    opts: MatchOpts,
) -> bool {
    values.into_iter().flatten().any(|v| matches_any(v, needles, opts))
}

/// First needle (in needle order) contained in `value`.
pub fn first_needle<'n, S: AsRef<str>>(value: &str, needles: &'n [S], opts: MatchOpts) -> Option<&'n str> {
    needles
        .iter()
        .map(AsRef::as_ref)
        .find(|n| matches_any(value, &[*n], opts))
}

// ============================================================================
// Blacklists
// ============================================================================

/// Lowercased candidate equals a blacklist entry.
pub fn hits_full<'a, S: AsRef<str>>(blacklist: &[S], candidates: impl IntoIterator<Item = Option<&'a str>>) -> bool {
    candidates
        .into_iter()
        .flatten()
        .any(|c| blacklist.iter().any(|b| b.as_ref().to_lowercase() == c.to_lowercase()))
}

/// A blacklist entry occurs inside a non-empty candidate.
pub fn hits_partial<'a, S: AsRef<str>>(blacklist: &[S], candidates: impl IntoIterator<Item = Option<&'a str>>) -> bool {
    candidates
        .into_iter()
        .flatten()
        .filter(|c| !c.is_empty())
        .any(|c| {
            let c = c.to_lowercase();
            blacklist
                .iter()
                .any(|b| !b.as_ref().is_empty() && c.contains(&b.as_ref().to_lowercase()))
        })
}

// ============================================================================
// Options
// ============================================================================

/// Index of the first option matching a needle. Needles are tried in order,
/// so earlier needles win over earlier options.
pub fn find_option<S: AsRef<str>, N: AsRef<str>>(options: &[S], needles: &[N], opts: MatchOpts) -> Option<usize> {
    needles.iter().find_map(|needle| {
        options
            .iter()
            .position(|o| matches_any(o.as_ref(), &[needle.as_ref()], opts))
    })
}

/// Index of the first option that starts with one of `prefixes`.
pub fn find_option_prefix<S: AsRef<str>>(options: &[S], prefixes: &[&str]) -> Option<usize> {
    options
        .iter()
        .position(|o| prefixes.iter().any(|p| o.as_ref().trim_start().starts_with(p)))
}
