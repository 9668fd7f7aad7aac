use sha1::{Digest, Sha1};

/// Strip everything except word characters, whitespace and basic punctuation,
/// then collapse whitespace runs to single spaces.
pub fn clean_text(raw: &str) -> String {
    let kept: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace() || ".,;:*()\"-".contains(*c))
        .collect();
    collapse_whitespace(&kept)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove all whitespace, used for id-like comparisons.
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First non-empty line, trimmed.
pub fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}

pub fn text_fingerprint(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Treat `Some("")` and whitespace-only values as missing.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
