use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FormError, FormResult};

const BUILTIN_KEYWORDS: &str = include_str!("../../config/keywords.yaml");

// ============================================================================
// Keyword Tables (YAML)
// ============================================================================

/// Every literal keyword, blacklist and answer table the core consults.
///
/// The built-in copy is compiled in; a file given with `keywords:` in the
/// app config replaces it wholesale. Missing sections fall back to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordTables {
    #[serde(default)]
    pub field_identifiers: FieldIdentifiers,
    #[serde(default)]
    pub field_types: FieldTypeSets,
    #[serde(default)]
    pub navigation: NavigationKeywords,
    #[serde(default)]
    pub escape_refresh: EscapeRefresh,
    #[serde(default)]
    pub blacklists: Blacklists,
    #[serde(default)]
    pub answers: AnswerTables,
    #[serde(default)]
    pub education: EducationTables,
    #[serde(default)]
    pub lexicon: Lexicon,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldIdentifiers {
    pub job_title: Vec<String>,
    pub company: Vec<String>,
    pub location: Vec<String>,
    pub currently_working: Vec<String>,
    pub school: Vec<String>,
    pub degree: Vec<String>,
    pub field_of_study: Vec<String>,
    pub gpa_or_grade: Vec<String>,
    pub currently_enrolled: Vec<String>,
    pub role_description: Vec<String>,
    pub date: Vec<String>,
    pub date_misidentifiers: Vec<String>,
    pub start_date: Vec<String>,
    pub start_date_case_sensitive: Vec<String>,
    pub end_date: Vec<String>,
    pub end_date_case_sensitive: Vec<String>,
    pub upload_file: Vec<String>,
    pub resume: Vec<String>,
    pub cloud_or_manual_upload: Vec<String>,
    pub verification: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTypeSets {
    pub text: Vec<String>,
    pub radio: Vec<String>,
    pub list: Vec<String>,
    pub multiselect: Vec<String>,
    pub checkbox: Vec<String>,
    pub dropdown: Vec<String>,
    pub date: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationKeywords {
    pub start_apply: Vec<String>,
    pub signup: Vec<String>,
    pub signin: Vec<String>,
    pub verify: Vec<String>,
    pub other_auth: Vec<String>,
    pub progress: Vec<String>,
    pub ack: Vec<String>,
    pub ack_links: Vec<String>,
    pub expand_all: Vec<String>,
    pub remove_section: Vec<String>,
    pub page_error: Vec<String>,
    pub iframe_blacklist: Vec<String>,
    pub email_verification_page: Vec<String>,
    pub otp_verification_page: Vec<String>,
    pub application_submitted: Vec<String>,
    pub already_submitted: Vec<String>,
}

impl NavigationKeywords {
    /// All texts a link may carry to be worth keeping.
    pub fn link_identifiers(&self) -> Vec<String> {
        self.start_apply
            .iter()
            .chain(&self.signup)
            .chain(&self.signin)
            .chain(&self.verify)
            .chain(&self.other_auth)
            .cloned()
            .collect()
    }

    pub fn auth_identifiers(&self) -> Vec<String> {
        self.signup
            .iter()
            .chain(&self.signin)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EscapeRefresh {
    pub multiselect_partial: Vec<String>,
    pub dynamic_list_full: Vec<String>,
    pub dynamic_list_partial: Vec<String>,
    pub selection_markers: Vec<String>,
}

/// Full (exact) and partial (substring) lists per identifying key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBlacklist {
    pub id_full: Vec<String>,
    pub id_partial: Vec<String>,
    pub label_full: Vec<String>,
    pub label_partial: Vec<String>,
    pub placeholder_full: Vec<String>,
    pub placeholder_partial: Vec<String>,
    pub text_full: Vec<String>,
    pub text_partial: Vec<String>,
    pub attribute_value_full: Vec<String>,
    pub attribute_value_partial: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTypeBlacklist {
    pub text_full: Vec<String>,
    pub text_partial: Vec<String>,
    pub list_full: Vec<String>,
    pub list_partial: Vec<String>,
    pub multiselect_full: Vec<String>,
    pub multiselect_partial: Vec<String>,
    pub dropdown_full: Vec<String>,
    pub dropdown_partial: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Blacklists {
    pub field: KeyBlacklist,
    pub button: KeyBlacklist,
    pub field_type: FieldTypeBlacklist,
    pub dropdown_option_full: Vec<String>,
    pub dropdown_option_partial: Vec<String>,
    pub list_option_partial: Vec<String>,
    pub multiselect_locator_partial: Vec<String>,
    pub options_placeholder: Vec<String>,
    pub new_button: KeyBlacklist,
    pub new_field: KeyBlacklist,
    pub associated_text: KeyBlacklist,
    pub multiselect_option_full: Vec<String>,
}

/// Fixed preference for questions with more than three options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceRule {
    pub topic: String,
    pub triggers: Vec<String>,
    pub choices: Vec<String>,
    #[serde(default)]
    pub exact: bool,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerTables {
    pub agreement: Vec<String>,
    pub yes_two_option: Vec<String>,
    pub no_two_option: Vec<String>,
    pub work_authorization: Vec<String>,
    pub work_authorization_negation: Vec<String>,
    pub yes_three_option: Vec<String>,
    pub no_three_option: Vec<String>,
    pub disability: Vec<String>,
    pub disability_denial: String,
    pub hispanic: Vec<String>,
    pub relocation: Vec<String>,
    pub relocation_exclusions: Vec<String>,
    pub preferred_name: Vec<String>,
    pub preferences: Vec<PreferenceRule>,
}

/// Search term → option texts it is expected to surface, per profile subtype.
pub type SearchCandidates = BTreeMap<String, BTreeMap<String, Vec<String>>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationTables {
    pub degree_alternatives: Vec<Vec<String>>,
    pub field_of_study_alternatives: Vec<Vec<String>>,
    pub search_candidates: Vec<SearchCandidates>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    pub determiners: Vec<String>,
    pub pronouns: Vec<String>,
    pub prepositions: Vec<String>,
    pub conjunctions: Vec<String>,
    pub interjections: Vec<String>,
    pub modals: Vec<String>,
    pub verbs: Vec<String>,
    pub adjectives: Vec<String>,
    pub adverbs: Vec<String>,
    pub nouns: Vec<String>,
}

// ============================================================================
// Loading
// ============================================================================

impl KeywordTables {
    /// The tables compiled into the binary.
    pub fn builtin() -> FormResult<Self> {
        Self::from_yaml(BUILTIN_KEYWORDS, "<builtin keywords.yaml>")
    }

    pub fn from_yaml(content: &str, origin: &str) -> FormResult<Self> {
        serde_yaml::from_str(content).map_err(|e| FormError::Config {
            path: origin.to_string(),
            source: e,
        })
    }

    /// Load from `path` when given, otherwise the built-in tables. A file that
    /// exists but does not parse is an error.
    pub fn load(path: Option<&str>) -> FormResult<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                Self::from_yaml(&content, p)
            }
            None => Self::builtin(),
        }
    }
}
