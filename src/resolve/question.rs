use crate::config::thresholds::Thresholds;
use crate::extract::page_model::FieldDescriptor;
use crate::resolve::decision::Prompt;
use crate::text::normalize::word_count;
use crate::text::relevance::{NormalizedMetadata, RelevanceEvaluator};
use crate::text::similarity::match_percentage;

/// Question from the tag and text labels. Similar labels collapse to the
/// longer one, dissimilar ones are joined line by line.
pub fn label_question(field: &FieldDescriptor, thresholds: &Thresholds) -> Option<String> {
    let tag = field.label_tag.as_deref().filter(|l| !l.trim().is_empty());
    let text = field.label_text.as_deref().filter(|l| !l.trim().is_empty());
    let question = match (tag, text) {
        (Some(tag), Some(text)) if match_percentage(tag, text) > thresholds.label_similarity => {
            if text.len() > tag.len() { text.to_string() } else { tag.to_string() }
        }
        (Some(tag), Some(text)) => format!("{}\n{}", tag, text),
        (Some(one), None) | (None, Some(one)) => one.to_string(),
        (None, None) => return None,
    };
    (word_count(&question) >= thresholds.min_question_words).then_some(question)
}

pub fn with_parent(field: &FieldDescriptor, question: &str) -> String {
    match field.label_parent.as_deref() {
        Some(parent) => format!("Parent Question:\n{}\nMain Question (current question):\n{}", parent, question),
        None => question.to_string(),
    }
}

/// Label and identifier values of a field, deduplicated, for relevance filtering.
pub fn normalized_metadata(field: &FieldDescriptor) -> NormalizedMetadata {
    let mut labels: Vec<String> = Vec::new();
    for label in field.labels().into_iter().flatten().map(str::trim).filter(|l| !l.is_empty()) {
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    let mut ids: Vec<String> = Vec::new();
    for id in field.ids().into_iter().flatten().filter(|i| !i.is_empty()) {
        if !ids.iter().any(|i| i == id) {
            ids.push(id.to_string());
        }
    }
    NormalizedMetadata {
        labels,
        ids,
        name: field.name.clone(),
        placeholder: field.placeholder.clone(),
    }
}

/// Relevant metadata, relaxing the relevance threshold step by step until
/// something passes or the threshold reaches zero.
pub fn relevant_metadata(
    field: &FieldDescriptor,
    relevance: &RelevanceEvaluator,
    thresholds: &Thresholds,
) -> Option<String> {
    let metadata = normalized_metadata(field);
    let mut threshold = thresholds.question_threshold_start;
    while threshold > 0.0 {
        if let Some(found) = relevance.filter_normalized_metadata(&metadata, threshold) {
            if word_count(&found) >= thresholds.min_question_words {
                return Some(found);
            }
            return None;
        }
        threshold -= thresholds.question_threshold_step;
    }
    None
}

/// What to ask the oracle about `field`. A parent question is folded into
/// label questions here; metadata questions get it after phrasing.
pub fn build_prompt(field: &FieldDescriptor, relevance: &RelevanceEvaluator, thresholds: &Thresholds) -> Prompt {
    if let Some(question) = label_question(field, thresholds) {
        return Prompt::Question(with_parent(field, &question));
    }
    if let Some(metadata) = relevant_metadata(field, relevance, thresholds) {
        return Prompt::Metadata(metadata);
    }
    match field.label_parent.as_deref() {
        Some(parent) => Prompt::Question(format!("Parent Question:\n{}", parent)),
        None => Prompt::Orphan,
    }
}

// ============================================================================
// Prompt texts
// ============================================================================

pub fn phrase_question_prompt(metadata: &str) -> String {
    format!(
r#"Below is the metadata of a field from a job application form.

Extract a clear question or label from the metadata. If a relevant label is
already listed under 'Label(s):', return it exactly; otherwise use the overall
context of the metadata.

<metadata>
{}
</metadata>

Return the concise label only, with no explanation."#,
        metadata
    )
}

pub fn answer_prompt(question: &str) -> String {
    format!(
r#"You are filling out a job application on behalf of the applicant.
Answer the question below briefly, as the applicant would. Return the answer only.

<question>
{}
</question>"#,
        question
    )
}

pub fn orphan_options_prompt(options: &[String], multi_select: bool) -> String {
    let choices = options.iter().map(|o| format!("- {}", o)).collect::<Vec<_>>().join("\n");
    let (instruction, format) = if multi_select {
        ("Select all options that are most appropriate.", "options, one per line")
    } else {
        ("Select the one best option.", "option")
    };
    format!(
r#"The question for this job application field is not available.
Rely on typical job application behavior to choose.

<options>
{}
</options>

{}
Return only the exact text of the selected {}. If none clearly apply, return 'N/A'."#,
        choices, instruction, format
    )
}
