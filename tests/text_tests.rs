use formpilot::text::matching::{MatchOpts, find_option, find_option_prefix, first_needle, hits_full, hits_partial, matches_any};
use formpilot::text::normalize::{clean_text, collapse_whitespace, first_line, non_empty, word_count};
use formpilot::text::relevance::{is_non_natural_text, is_technical_token, split_tokens};
use formpilot::text::similarity::{best_match, match_percentage, ratio};

// =========================================================================
// Similarity
// =========================================================================

#[test]
fn ratio_counts_shared_characters() {
    assert_eq!(ratio("", ""), 1.0, "Two empty strings are identical");
    assert_eq!(ratio("abc", ""), 0.0, "Nothing in common");
    assert_eq!(ratio("abcd", "bcde"), 0.75, "Three shared characters out of eight");
    assert_eq!(ratio("same", "same"), 1.0);
}

#[test]
fn match_percentage_ignores_case() {
    assert_eq!(match_percentage("Yes", "yes"), 100);
    assert_eq!(match_percentage("United States", "UNITED STATES"), 100);
    assert!(match_percentage("Yes", "No") < 40, "Unrelated answers score low");
}

#[test]
fn best_match_prefers_closest_and_earliest() {
    let options = ["Bachelors", "Masters Degree", "PhD"];
    let (index, text, score) = best_match("Masters", &options).expect("options are not empty");
    assert_eq!(index, 1);
    assert_eq!(text, "Masters Degree");
    assert!(score > 60, "score was {}", score);

    let ties = ["No", "No"];
    assert_eq!(best_match("No", &ties).map(|(i, _, _)| i), Some(0), "Ties keep the first option");

    let empty: [&str; 0] = [];
    assert!(best_match("anything", &empty).is_none());
}

// =========================================================================
// Keyword matching
// =========================================================================

#[test]
fn matches_any_respects_options() {
    let needles = ["sign in"];
    assert!(matches_any("Please Sign In here", &needles, MatchOpts::SUBSTRING));
    assert!(!matches_any("Please Sign In here", &needles, MatchOpts::EXACT));
    assert!(matches_any("SIGN IN", &needles, MatchOpts::EXACT));
    assert!(!matches_any("SIGN IN", &needles, MatchOpts::EXACT_CASE_SENSITIVE));
    assert!(matches_any("Sign  In", &["signin"], MatchOpts::EXACT.ignoring_whitespace()));
    assert!(!matches_any("", &needles, MatchOpts::SUBSTRING), "Empty values never match");
    assert!(!matches_any("text", &[""], MatchOpts::SUBSTRING), "Empty needles never match as substrings");
}

#[test]
fn first_needle_follows_needle_order() {
    let needles = ["submit application", "submit"];
    assert_eq!(first_needle("Submit Application", &needles, MatchOpts::SUBSTRING), Some("submit application"));
    assert_eq!(first_needle("Submit", &needles, MatchOpts::SUBSTRING), Some("submit"));
    assert_eq!(first_needle("Cancel", &needles, MatchOpts::SUBSTRING), None);
}

#[test]
fn blacklist_hits() {
    let full = ["back"];
    assert!(hits_full(&full, [Some("Back")]));
    assert!(!hits_full(&full, [Some("Back to top")]));

    let partial = ["cookie"];
    assert!(hits_partial(&partial, [None, Some("Accept Cookies")]));
    assert!(!hits_partial(&partial, [Some(""), None]));
}

#[test]
fn option_searches() {
    let options = ["Yes, I agree", "No", "Not hispanic or latino"];
    assert_eq!(find_option(&options, &["No"], MatchOpts::EXACT), Some(1));
    assert_eq!(find_option(&options, &["latino", "yes"], MatchOpts::SUBSTRING), Some(2), "Earlier needles win");
    assert_eq!(find_option_prefix(&options, &["Yes", "I agree"]), Some(0));
    assert_eq!(find_option_prefix(&options, &["Maybe"]), None);
}

// =========================================================================
// Normalization
// =========================================================================

#[test]
fn normalization_helpers() {
    assert_eq!(clean_text("  First   Name*  "), "First Name*");
    assert_eq!(clean_text("Résumé <upload> ✓"), "Résumé upload");
    assert_eq!(collapse_whitespace("a \n\t b"), "a b");
    assert_eq!(word_count("  one two   three "), 3);
    assert_eq!(first_line("\n  \n  second line\nthird"), Some("second line"));
    assert_eq!(non_empty(Some("   ")), None);
    assert_eq!(non_empty(Some(" x ")), Some("x"));
}

// =========================================================================
// Identifier heuristics
// =========================================================================

#[test]
fn identifiers_split_into_word_tokens() {
    assert_eq!(split_tokens("firstName_field2"), vec!["first", "name", "field", "2"]);
    assert_eq!(split_tokens("kebab-case-id"), vec!["kebab", "case", "id"]);
    assert_eq!(split_tokens("Phone Number"), vec!["phone", "number"]);
}

#[test]
fn technical_tokens_are_recognized() {
    assert!(is_technical_token("3f2a9c0e1b7d4a6f8e5c2b1a0d9e8f7c"), "hash");
    assert!(is_technical_token("123e4567-e89b-12d3-a456-426614174000"), "uuid");
    assert!(is_technical_token("12345"), "no letters");
    assert!(!is_technical_token("email"));
}

#[test]
fn prose_is_natural_text() {
    assert!(!is_non_natural_text("What is your current salary?"));
    assert!(is_non_natural_text("input_field_3"));
    assert!(is_non_natural_text("abc"), "Too short to be a question");
}
