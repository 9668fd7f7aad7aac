use serde::{Deserialize, Serialize};

/// Empirically tuned constants. Percentages are on the 0-100 scale produced by
/// `text::similarity::match_percentage`; change ratios are 0.0-1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Tag and text labels this similar are treated as one label.
    #[serde(default = "default_label_similarity")]
    pub label_similarity: u32,

    /// Radio/checkbox ids this similar belong to one question.
    #[serde(default = "default_id_merge_similarity")]
    pub id_merge_similarity: u32,

    #[serde(default = "default_select_all")]
    pub select_all: u32,

    #[serde(default = "default_select_best")]
    pub select_best: u32,

    #[serde(default = "default_select_floor")]
    pub select_floor: u32,

    #[serde(default = "default_school_match")]
    pub school_match: u32,

    #[serde(default = "default_significant_change")]
    pub significant_change: f64,

    #[serde(default = "default_navigation_change")]
    pub navigation_change: f64,

    #[serde(default = "default_section_label_words")]
    pub section_label_words: usize,

    #[serde(default = "default_date_label_words")]
    pub date_label_words: usize,

    #[serde(default = "default_question_threshold_start")]
    pub question_threshold_start: f64,

    #[serde(default = "default_question_threshold_step")]
    pub question_threshold_step: f64,

    /// Minimum words for a label to be asked as a question.
    #[serde(default = "default_min_question_words")]
    pub min_question_words: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            label_similarity: default_label_similarity(),
            id_merge_similarity: default_id_merge_similarity(),
            select_all: default_select_all(),
            select_best: default_select_best(),
            select_floor: default_select_floor(),
            school_match: default_school_match(),
            significant_change: default_significant_change(),
            navigation_change: default_navigation_change(),
            section_label_words: default_section_label_words(),
            date_label_words: default_date_label_words(),
            question_threshold_start: default_question_threshold_start(),
            question_threshold_step: default_question_threshold_step(),
            min_question_words: default_min_question_words(),
        }
    }
}

fn default_label_similarity() -> u32 { 66 }
fn default_id_merge_similarity() -> u32 { 50 }
fn default_select_all() -> u32 { 90 }
fn default_select_best() -> u32 { 80 }
fn default_select_floor() -> u32 { 40 }
fn default_school_match() -> u32 { 92 }
fn default_significant_change() -> f64 { 0.6 }
fn default_navigation_change() -> f64 { 0.69 }
fn default_section_label_words() -> usize { 7 }
fn default_date_label_words() -> usize { 3 }
fn default_question_threshold_start() -> f64 { 0.2 }
fn default_question_threshold_step() -> f64 { 0.04 }
fn default_min_question_words() -> usize { 1 }
