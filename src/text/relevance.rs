use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::keywords::Lexicon;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("relevance pattern must compile")
}

static ADVERB_SUFFIX: LazyLock<Regex> = LazyLock::new(|| pattern(r"ly$"));
static ADJECTIVE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?:able|ible|ful|ous|ive|less|ical|ic|al)$"));
static VERB_SUFFIX: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?:ize|ise|ify|ing|ed)$"));
static WORD_SHAPE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[a-z]{3,}$"));
static VOWEL: LazyLock<Regex> = LazyLock::new(|| pattern(r"[aeiouy]"));
static CONSONANT_RUN: LazyLock<Regex> = LazyLock::new(|| pattern(r"[b-df-hj-np-tv-xz]{5}"));

static CAMEL_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| pattern(r"([a-z])([A-Z])"));
static LETTER_DIGIT: LazyLock<Regex> = LazyLock::new(|| pattern(r"([A-Za-z])([0-9])"));
static DIGIT_LETTER: LazyLock<Regex> = LazyLock::new(|| pattern(r"([0-9])([A-Za-z])"));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| pattern(r"[_-]+"));

static HEX_HASH: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[0-9a-fA-F]{32,}$"));
static UUID: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
});
static LOWER_UPPER: LazyLock<Regex> = LazyLock::new(|| pattern(r"[a-z][A-Z]"));
static IDENTIFIER_LIKE: LazyLock<Regex> = LazyLock::new(|| pattern(r"[_-]|[a-z][A-Z]|\w.*[0-9]"));

// ============================================================================
// Part-of-speech tagging
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PosTag {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Determiner,
    Pronoun,
    Preposition,
    Conjunction,
    Interjection,
    Modal,
    Number,
}

impl PosTag {
    /// Tags whose words may count towards relevance.
    pub fn is_content(self) -> bool {
        matches!(self, PosTag::Noun | PosTag::Verb | PosTag::Adjective | PosTag::Adverb)
    }
}

/// Bigrams that read as a phrase rather than a run of identifiers.
const PHRASE_PATTERNS: &[(PosTag, PosTag)] = &[
    (PosTag::Adjective, PosTag::Noun),
    (PosTag::Noun, PosTag::Noun),
    (PosTag::Verb, PosTag::Noun),
    (PosTag::Adverb, PosTag::Verb),
    (PosTag::Pronoun, PosTag::Verb),
    (PosTag::Determiner, PosTag::Noun),
    (PosTag::Verb, PosTag::Determiner),
    (PosTag::Interjection, PosTag::Verb),
];

/// Knobs for a single relevance check.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceOpts {
    /// Share of tokens that must be valid words.
    pub threshold: f64,
    pub min_token_length: usize,
    pub lemmatize: bool,
    pub min_relevant_words: usize,
    pub min_valid_phrases: usize,
    pub filter_technical_token: bool,
    pub filter_technical_text: bool,
}

impl RelevanceOpts {
    pub fn label(threshold: f64) -> Self {
        Self {
            threshold,
            min_token_length: 3,
            lemmatize: true,
            min_relevant_words: 2,
            min_valid_phrases: 1,
            filter_technical_token: true,
            filter_technical_text: true,
        }
    }

    pub fn identifier(threshold: f64) -> Self {
        Self {
            threshold,
            min_token_length: 3,
            lemmatize: false,
            min_relevant_words: 2,
            min_valid_phrases: 0,
            filter_technical_token: true,
            filter_technical_text: false,
        }
    }

    /// Single-word values such as `name` and `placeholder`.
    pub fn single(threshold: f64) -> Self {
        Self { min_relevant_words: 1, ..Self::identifier(threshold) }
    }
}

/// Label/identifier values gathered from a field, deduplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedMetadata {
    pub labels: Vec<String>,
    pub ids: Vec<String>,
    pub name: Option<String>,
    pub placeholder: Option<String>,
}

/// Decides whether field metadata is natural language worth asking about.
pub struct RelevanceEvaluator {
    lexicon: HashMap<String, PosTag>,
}

impl RelevanceEvaluator {
    pub fn new(lexicon: &Lexicon) -> Self {
        let mut tags = HashMap::new();
        // Later groups win, so closed classes are inserted last.
        let groups: [(&Vec<String>, PosTag); 10] = [
            (&lexicon.nouns, PosTag::Noun),
            (&lexicon.verbs, PosTag::Verb),
            (&lexicon.adjectives, PosTag::Adjective),
            (&lexicon.adverbs, PosTag::Adverb),
            (&lexicon.interjections, PosTag::Interjection),
            (&lexicon.conjunctions, PosTag::Conjunction),
            (&lexicon.prepositions, PosTag::Preposition),
            (&lexicon.modals, PosTag::Modal),
            (&lexicon.pronouns, PosTag::Pronoun),
            (&lexicon.determiners, PosTag::Determiner),
        ];
        for (words, tag) in groups {
            for w in words {
                tags.insert(w.to_lowercase(), tag);
            }
        }
        Self { lexicon: tags }
    }

    pub fn tag(&self, token: &str) -> PosTag {
        let lower = token.to_lowercase();
        if let Some(tag) = self.lexicon.get(&lower) {
            return *tag;
        }
        if lower.chars().all(|c| c.is_ascii_digit()) {
            return PosTag::Number;
        }
        if let Some(stem) = lower.strip_suffix('s') {
            if let Some(PosTag::Noun) = self.lexicon.get(stem) {
                return PosTag::Noun;
            }
        }
        suffix_tag(&lower)
    }

    /// Dictionary membership: lexicon entries, or a pronounceable lowercase word.
    pub fn is_english_word(&self, token: &str) -> bool {
        let lower = token.to_lowercase();
        if self.lexicon.contains_key(&lower) {
            return true;
        }
        looks_like_word(&lower)
    }

    fn lemmatize(&self, token: &str) -> String {
        let lower = token.to_lowercase();
        if let Some(stem) = lower.strip_suffix("ies") {
            return format!("{}y", stem);
        }
        if lower.len() > 3 && lower.ends_with('s') && !lower.ends_with("ss") {
            return lower[..lower.len() - 1].to_string();
        }
        lower
    }

    pub fn is_relevant(&self, text: &str, opts: RelevanceOpts) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        if opts.filter_technical_text && is_non_natural_text(text) {
            return false;
        }

        let tokens = split_tokens(text);
        if tokens.is_empty() {
            return false;
        }
        let tagged: Vec<(&str, PosTag)> = tokens.iter().map(|t| (t.as_str(), self.tag(t))).collect();

        let mut valid = 0usize;
        for (token, tag) in &tagged {
            if opts.filter_technical_token && is_technical_token(token) {
                continue;
            }
            if token.len() < 2 || !token.chars().all(|c| c.is_ascii_alphabetic()) {
                continue;
            }
            if token.len() < opts.min_token_length || !tag.is_content() {
                continue;
            }
            let word = if opts.lemmatize { self.lemmatize(token) } else { token.to_string() };
            if self.is_english_word(&word) {
                valid += 1;
            }
        }

        let phrases = tagged
            .windows(2)
            .filter(|w| PHRASE_PATTERNS.contains(&(w[0].1, w[1].1)))
            .count();

        valid as f64 / tokens.len() as f64 >= opts.threshold
            && valid >= opts.min_relevant_words
            && phrases >= opts.min_valid_phrases
    }

    /// Describe the relevant parts of the metadata, one line per kind, or
    /// `None` when nothing is worth showing to the oracle.
    pub fn filter_normalized_metadata(&self, meta: &NormalizedMetadata, threshold: f64) -> Option<String> {
        let mut parts = Vec::new();

        let labels: Vec<&str> = meta
            .labels
            .iter()
            .map(String::as_str)
            .filter(|l| self.is_relevant(l, RelevanceOpts::label(threshold)))
            .collect();
        if !labels.is_empty() {
            parts.push(format!("Label(s): {}", labels.join(", ")));
        }

        let ids: Vec<&str> = meta
            .ids
            .iter()
            .map(String::as_str)
            .filter(|i| self.is_relevant(i, RelevanceOpts::identifier(threshold)))
            .collect();
        if !ids.is_empty() {
            parts.push(format!("Id(s): {}", ids.join(", ")));
        }

        if let Some(name) = meta.name.as_deref().filter(|n| self.is_relevant(n, RelevanceOpts::single(threshold))) {
            parts.push(format!("Name: {}", name));
        }
        if let Some(p) = meta.placeholder.as_deref().filter(|p| self.is_relevant(p, RelevanceOpts::single(threshold))) {
            parts.push(format!("Placeholder: {}", p));
        }

        if parts.is_empty() { None } else { Some(parts.join("\n")) }
    }
}

fn suffix_tag(word: &str) -> PosTag {
    if word.len() <= 4 {
        PosTag::Noun
    } else if ADVERB_SUFFIX.is_match(word) {
        PosTag::Adverb
    } else if ADJECTIVE_SUFFIX.is_match(word) {
        PosTag::Adjective
    } else if VERB_SUFFIX.is_match(word) {
        PosTag::Verb
    } else {
        PosTag::Noun
    }
}

/// At least three lowercase letters with a vowel and no long consonant run.
fn looks_like_word(word: &str) -> bool {
    WORD_SHAPE.is_match(word) && VOWEL.is_match(word) && !CONSONANT_RUN.is_match(word)
}

// ============================================================================
// Tokenizing and identifier heuristics
// ============================================================================

/// Split camelCase, snake_case, kebab-case and letter/digit runs into
/// lowercase tokens.
pub fn split_tokens(text: &str) -> Vec<String> {
    let spaced = SEPARATORS.replace_all(text, " ");
    let spaced = CAMEL_BOUNDARY.replace_all(&spaced, "$1 $2");
    let spaced = LETTER_DIGIT.replace_all(&spaced, "$1 $2");
    let spaced = DIGIT_LETTER.replace_all(&spaced, "$1 $2");
    spaced.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Hashes, UUIDs, numeric codes and fragment soup.
pub fn is_technical_token(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return true;
    }
    let len = text.chars().count() as f64;

    if HEX_HASH.is_match(text) || UUID.is_match(text) {
        return true;
    }
    if !text.chars().any(|c| c.is_ascii_alphabetic()) {
        return true;
    }
    if text.chars().filter(|c| c.is_ascii_digit()).count() as f64 / len > 0.5 {
        return true;
    }
    if text.chars().filter(|c| c.is_ascii_punctuation()).count() as f64 / len > 0.5 {
        return true;
    }
    if text.contains("--") || text.contains('_') {
        let fragments = text.split(['-', '_']).count() as f64;
        if fragments / len > 0.25 {
            return true;
        }
    }
    if LOWER_UPPER.is_match(text) && text.contains(['_', '-']) {
        return true;
    }
    let parts: Vec<&str> = text.split(['-', '_']).collect();
    parts.len() >= 3 && parts.iter().all(|p| p.len() <= 4 || !looks_like_word(&p.to_lowercase()))
}

/// Whole-string check: does this read like an identifier rather than prose?
pub fn is_non_natural_text(text: &str) -> bool {
    let text = text.trim();
    if text.chars().count() < 5 {
        return true;
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    let total = words.len();

    let identifiers: Vec<&str> = words.iter().copied().filter(|w| IDENTIFIER_LIKE.is_match(w)).collect();

    let ratio = if total == 0 { 1.0 } else { identifiers.len() as f64 / total as f64 };
    if ratio > 0.3 {
        return true;
    }
    // A long sentence ending in one identifier is still a sentence.
    if total > 5 && identifiers.len() == 1 && words.last() == identifiers.first() {
        return false;
    }

    let compact: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    let non_alpha = compact.iter().filter(|c| !c.is_alphabetic()).count() as f64 / compact.len().max(1) as f64;
    if non_alpha > 0.5 && total <= 3 {
        return true;
    }

    if !text.contains(['.', '?', '!']) && total <= 4 && words.iter().all(|w| identifiers.contains(w)) {
        return true;
    }
    false
}
