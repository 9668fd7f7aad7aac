use tracing::{debug, info};

use crate::config::keywords::KeywordTables;
use crate::config::thresholds::Thresholds;
use crate::error::FormResult;
use crate::extract::page_model::{FieldDescriptor, FieldType};
use crate::oracle::Oracle;
use crate::oracle::oracle::{DEFAULT_TOP_K, is_not_applicable};
use crate::profile::Profile;
use crate::resolve::decision::{Decision, Prompt};
use crate::resolve::question::{answer_prompt, build_prompt, orphan_options_prompt, phrase_question_prompt, with_parent};
use crate::resolve::ranking::{rank, select};
use crate::resolve::rules::{MultiRule, RuleBook};
use crate::resolve::text_rules::{TextRule, predefined_text};
use crate::text::normalize::word_count;
use crate::text::relevance::RelevanceEvaluator;
use crate::text::similarity::match_percentage;

/// Answer typed into a required field nobody can answer.
pub const FALLBACK_TEXT: &str = "N/A";

/// Decides what goes into a field: profile first, then fixed rules, then
/// the oracle. Deciding never touches the page.
pub struct AnswerEngine<'a> {
    tables: &'a KeywordTables,
    thresholds: &'a Thresholds,
    profile: &'a Profile,
    relevance: RelevanceEvaluator,
    oracle: &'a dyn Oracle,
}

impl<'a> AnswerEngine<'a> {
    pub fn new(
        tables: &'a KeywordTables,
        thresholds: &'a Thresholds,
        profile: &'a Profile,
        oracle: &'a dyn Oracle,
    ) -> Self {
        Self { tables, thresholds, profile, relevance: RelevanceEvaluator::new(&tables.lexicon), oracle }
    }

    pub fn rules(&self) -> RuleBook<'a> {
        RuleBook::new(self.tables, self.thresholds, self.profile)
    }

    pub fn profile(&self) -> &'a Profile {
        self.profile
    }

    pub fn tables(&self) -> &'a KeywordTables {
        self.tables
    }

    pub fn thresholds(&self) -> &'a Thresholds {
        self.thresholds
    }

    fn prompt(&self, field: &FieldDescriptor) -> Prompt {
        build_prompt(field, &self.relevance, self.thresholds)
    }

    // ========================================================================
    // Deciding
    // ========================================================================

    /// Decide `field` from profile and rules alone. `options` are the texts
    /// of a choice field, in page order; text fields pass none.
    pub fn decide(&self, field: &FieldDescriptor, options: &[String]) -> Decision {
        match field.field_type {
            FieldType::Checkbox => self.decide_multi(field, options),
            FieldType::Radio | FieldType::Select | FieldType::List | FieldType::Datelist | FieldType::Multiselect => {
                self.decide_single(field, options)
            }
            _ => self.decide_text(field),
        }
    }

    pub fn decide_text(&self, field: &FieldDescriptor) -> Decision {
        match predefined_text(field, self.profile) {
            TextRule::Answer(value) => Decision::Value(value),
            TextRule::LeaveEmpty => Decision::Skip,
            TextRule::NoRule if !field.required => Decision::Skip,
            TextRule::NoRule => Decision::DeferToOracle { prompt: self.prompt(field), options: Vec::new() },
        }
    }

    pub fn decide_single(&self, field: &FieldDescriptor, options: &[String]) -> Decision {
        if options.is_empty() {
            return Decision::Skip;
        }
        match self.rules().single_choice(field, options) {
            Some(index) => Decision::select_one(index),
            None => Decision::DeferToOracle { prompt: self.prompt(field), options: options.to_vec() },
        }
    }

    pub fn decide_multi(&self, field: &FieldDescriptor, options: &[String]) -> Decision {
        match self.rules().multi_choice(field, options) {
            MultiRule::Select(indexes) => Decision::Select(indexes),
            MultiRule::Leave => Decision::Skip,
            MultiRule::Undecided => Decision::DeferToOracle { prompt: self.prompt(field), options: options.to_vec() },
        }
    }

    // ========================================================================
    // Consulting the oracle
    // ========================================================================

    /// Decide, then settle a deferral through the oracle.
    pub fn resolve(&self, field: &FieldDescriptor, options: &[String]) -> FormResult<Decision> {
        let decision = self.decide(field, options);
        self.consult(field, decision)
    }

    /// Decide a multi-valued `<select>` the way a checkbox group is decided.
    pub fn resolve_multiple(&self, field: &FieldDescriptor, options: &[String]) -> FormResult<Decision> {
        let decision = self.decide_multi(field, options);
        self.settle(field, decision, true)
    }

    /// Turn a [`Decision::DeferToOracle`] into a final decision. Anything else
    /// passes through unchanged.
    pub fn consult(&self, field: &FieldDescriptor, decision: Decision) -> FormResult<Decision> {
        self.settle(field, decision, field.field_type == FieldType::Checkbox)
    }

    /// `checklike` fields may take several options and may be left empty
    /// when the oracle declines.
    fn settle(&self, field: &FieldDescriptor, decision: Decision, checklike: bool) -> FormResult<Decision> {
        let Decision::DeferToOracle { prompt, options } = decision else {
            return Ok(decision);
        };
        let question = self.question(field, &prompt)?;

        if options.is_empty() {
            let Some(question) = question else {
                info!(label = field.display_label(), "no question to ask, entering fallback text");
                return Ok(Decision::Value(FALLBACK_TEXT.to_string()));
            };
            let answer = self.oracle.resolve(&answer_prompt(&question))?;
            info!(label = field.display_label(), answer = %answer, "oracle answered");
            return Ok(Decision::Value(answer.trim().to_string()));
        }

        let multi = checklike && options.len() > 1;
        let answer = match question.as_deref() {
            Some(q) => self.oracle.resolve_options(q, &options, multi, DEFAULT_TOP_K)?,
            None => {
                let answer = self.oracle.resolve(&orphan_options_prompt(&options, multi))?;
                let skip_na = checklike || !field.required;
                if skip_na && mentions_not_applicable(&answer) {
                    info!(label = field.display_label(), "oracle found no applicable option");
                    return Ok(Decision::Skip);
                }
                answer
            }
        };
        info!(label = field.display_label(), answer = %answer, "oracle chose");

        if checklike && options.len() == 1 && denies(&answer, question.as_deref()) {
            info!(label = field.display_label(), "oracle declined the only checkbox");
            return Ok(Decision::Skip);
        }

        let chosen = self.pick(&options, &answer, multi, field.required);
        if chosen.is_empty() {
            return Ok(Decision::Skip);
        }
        Ok(Decision::Select(chosen))
    }

    /// The question for a prompt. Metadata is phrased into a question by the
    /// oracle first; an orphan has none.
    fn question(&self, field: &FieldDescriptor, prompt: &Prompt) -> FormResult<Option<String>> {
        match prompt {
            Prompt::Question(q) => Ok(Some(q.clone())),
            Prompt::Metadata(metadata) => {
                let phrased = self.oracle.resolve(&phrase_question_prompt(metadata))?;
                let phrased = phrased.trim();
                debug!(label = field.display_label(), question = phrased, "question phrased from metadata");
                if phrased.is_empty() {
                    return Ok(None);
                }
                Ok(Some(with_parent(field, phrased)))
            }
            Prompt::Orphan => Ok(None),
        }
    }

    /// Rank the options against a free-text answer. A multi-select answer is
    /// ranked line by line.
    fn pick(&self, options: &[String], answer: &str, multi: bool, required: bool) -> Vec<usize> {
        if !multi {
            return select(&rank(options, answer.trim()), options.len(), required, self.thresholds)
                .into_iter()
                .take(1)
                .collect();
        }
        let mut chosen: Vec<usize> = Vec::new();
        for line in answer.lines().map(|l| l.trim().trim_start_matches("- ")).filter(|l| !l.is_empty()) {
            for index in select(&rank(options, line), options.len(), false, self.thresholds) {
                if !chosen.contains(&index) {
                    chosen.push(index);
                }
            }
        }
        if chosen.is_empty() && required {
            chosen = select(&rank(options, answer), options.len(), true, self.thresholds);
        }
        chosen
    }
}

fn mentions_not_applicable(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    is_not_applicable(answer) || lower.contains("n/a") || lower.contains("not applicable")
}

/// A short "false" answer to a single checkbox, as opposed to the word
/// appearing inside a longer sentence.
fn denies(answer: &str, question: Option<&str>) -> bool {
    let lower = answer.to_lowercase();
    if !lower.contains("false") {
        return false;
    }
    match question {
        None => true,
        Some(q) => word_count(answer) < word_count(q) + 3 || match_percentage(&lower, &q.to_lowercase()) > 75,
    }
}
