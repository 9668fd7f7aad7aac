use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use formpilot::extract::page_model::{DateFormat, FieldDescriptor, FieldOptions, FieldType, SectionCategory, SectionTag, Subtype};
use formpilot::oracle::mock::MockOracle;
use formpilot::resolve::dates::{DateAnswer, date_answer, format_date, parse_profile_date};
use formpilot::resolve::decision::{Decision, Prompt};
use formpilot::resolve::engine::{AnswerEngine, FALLBACK_TEXT};
use formpilot::resolve::multiselect::is_leaf;
use formpilot::resolve::ranking::{Ranked, rank, select};
use formpilot::resolve::rules::{MultiRule, RuleBook};
use formpilot::resolve::text_rules::{TextRule, predefined_text};
use formpilot::resolve::upload::TicketLock;

use crate::common::utils::{field, in_section, profile, required, strings, tables, thresholds};

mod common;

const SPONSORSHIP: &str = "Will you now or in the future require sponsorship for employment visa status?";

fn unlabeled(field_type: FieldType) -> FieldDescriptor {
    let mut f = field("unused", field_type);
    f.label_tag = None;
    f
}

fn with_format(mut f: FieldDescriptor, format: DateFormat) -> FieldDescriptor {
    if let FieldOptions::Section(tag) = &mut f.options {
        tag.format = Some(format);
    }
    f
}

// =========================================================================
// Fixed rules
// =========================================================================

#[test]
fn sponsorship_question_answers_yes_without_oracle() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let oracle = MockOracle::new();
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);
    let q = field(SPONSORSHIP, FieldType::Radio);
    let options = strings(&["Yes", "No"]);

    assert_eq!(RuleBook::new(&tables, &thresholds, &profile).single_choice(&q, &options), Some(0));
    let decision = engine.resolve(&q, &options).expect("rules need no oracle");
    assert_eq!(decision, Decision::select_one(0));
    assert_eq!(oracle.calls(), 0, "The oracle is never consulted for a fixed rule");
}

#[test]
fn two_option_rules() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let rules = RuleBook::new(&tables, &thresholds, &profile);
    let yes_no = strings(&["Yes", "No"]);

    let applied = field("Have you previously applied to this company?", FieldType::Radio);
    assert_eq!(rules.single_choice(&applied, &yes_no), Some(1));

    let authorized = field("Are you legally eligible to work in this country?", FieldType::Radio);
    assert_eq!(rules.single_choice(&authorized, &yes_no), Some(0));

    let negated = field("Are you legally eligible to work without visa sponsorship?", FieldType::Radio);
    assert_eq!(rules.single_choice(&negated, &yes_no), Some(1));

    let terms = field("I have read the privacy policy", FieldType::Radio);
    assert_eq!(rules.single_choice(&terms, &strings(&["I agree", "I disagree"])), Some(0));

    let unknown = field("Do you enjoy hiking?", FieldType::Radio);
    assert_eq!(rules.single_choice(&unknown, &yes_no), None);
}

#[test]
fn single_option_is_always_chosen() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let rules = RuleBook::new(&tables, &thresholds, &profile);
    assert_eq!(rules.single_choice(&field("Anything", FieldType::Select), &strings(&["Only"])), Some(0));
    assert_eq!(rules.single_choice(&field("Anything", FieldType::Select), &strings(&[])), None);
}

#[test]
fn disability_prefers_denial() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let rules = RuleBook::new(&tables, &thresholds, &profile);
    let q = field("Disability status", FieldType::Radio);
    let options = strings(&["Yes, I have a disability", "No, I do not have a disability", "I don't wish to answer"]);
    assert_eq!(rules.single_choice(&q, &options), Some(1));

    let boxes = field("Please check one disability status", FieldType::Checkbox);
    assert_eq!(rules.multi_choice(&boxes, &options), MultiRule::Select(vec![1]));
}

#[test]
fn location_and_education_come_from_profile() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let rules = RuleBook::new(&tables, &thresholds, &profile);

    let city = field("City", FieldType::Select);
    assert_eq!(rules.single_choice(&city, &strings(&["New York", "Boston", "Chicago"])), Some(1));

    let degree = in_section(field("Degree", FieldType::Select), SectionCategory::Education, 1, Subtype::Degree);
    let options = strings(&["Bachelor's Degree", "Master's Degree", "PhD"]);
    assert_eq!(rules.single_choice(&degree, &options), Some(1));
}

#[test]
fn checkbox_rules() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let rules = RuleBook::new(&tables, &thresholds, &profile);

    let terms = field("I agree to the terms and conditions", FieldType::Checkbox);
    assert_eq!(rules.multi_choice(&terms, &strings(&["I agree"])), MultiRule::Select(vec![0]));

    let preferred = field("Use preferred name", FieldType::Checkbox);
    assert_eq!(rules.multi_choice(&preferred, &strings(&["Yes"])), MultiRule::Leave);

    let current = in_section(
        field("I currently work here", FieldType::Checkbox),
        SectionCategory::WorkExperience,
        1,
        Subtype::CurrentlyWorking,
    );
    assert_eq!(rules.multi_choice(&current, &strings(&["I currently work here"])), MultiRule::Select(vec![0]));

    let languages = field("Which languages do you speak?", FieldType::Checkbox);
    assert_eq!(rules.multi_choice(&languages, &strings(&["English", "French", "German"])), MultiRule::Undecided);
}

#[test]
fn progressive_matches_exactly_or_by_alternative() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let rules = RuleBook::new(&tables, &thresholds, &profile);

    let degree = in_section(field("Degree", FieldType::Multiselect), SectionCategory::Education, 1, Subtype::Degree);
    assert_eq!(rules.progressive(&degree, &strings(&["Bachelor's Degree", "Master's Degree"])), Some(1));
    assert_eq!(rules.progressive(&degree, &strings(&["Doctorate", "Diploma"])), None, "No fuzzy match mid-tree");

    let city = field("City", FieldType::Multiselect);
    assert_eq!(rules.progressive(&city, &strings(&["Bostonia", "Boston"])), Some(1));
}

#[test]
fn multiselect_leaves_end_at_inputs() {
    assert!(is_leaf("//input[@id='opt-3']"));
    assert!(is_leaf("/html/body/div[1]/label[2]/input[1]"));
    assert!(!is_leaf("//li[@id='group-2']"));
    assert!(!is_leaf("/html/body/ul[1]/li[3]"));
}

// =========================================================================
// Text rules
// =========================================================================

#[test]
fn predefined_text_reads_profile() {
    let profile = profile();
    assert_eq!(predefined_text(&field("First Name", FieldType::Text), &profile), TextRule::Answer("Ada".into()));
    assert_eq!(
        predefined_text(&field("Create a password", FieldType::Password), &profile),
        TextRule::Answer("correct-horse".into())
    );
    assert_eq!(
        predefined_text(&field("Preferred First Name", FieldType::Text), &profile),
        TextRule::LeaveEmpty,
        "Optional preferred names stay empty"
    );
    assert_eq!(
        predefined_text(&required(field("Preferred First Name", FieldType::Text)), &profile),
        TextRule::Answer("Ada".into())
    );

    let title = in_section(field("Job Title", FieldType::Text), SectionCategory::WorkExperience, 1, Subtype::JobTitle);
    assert_eq!(predefined_text(&title, &profile), TextRule::Answer("Engineer".into()));

    assert_eq!(predefined_text(&field("Favourite colour", FieldType::Text), &profile), TextRule::NoRule);
}

// =========================================================================
// Engine and oracle
// =========================================================================

#[test]
fn optional_unknown_text_is_skipped() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let oracle = MockOracle::new();
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);

    let decision = engine.resolve(&field("Favourite colour", FieldType::Text), &[]).expect("no oracle needed");
    assert_eq!(decision, Decision::Skip);
    assert_eq!(oracle.calls(), 0);
}

#[test]
fn required_unknown_text_asks_the_oracle() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let oracle = MockOracle::with_answers(["  Blue  "]);
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);
    let q = required(field("Favourite colour", FieldType::Text));

    let deferred = engine.decide(&q, &[]);
    assert_eq!(
        deferred,
        Decision::DeferToOracle { prompt: Prompt::Question("Favourite colour".into()), options: vec![] }
    );

    let decision = engine.consult(&q, deferred).expect("oracle answers");
    assert_eq!(decision, Decision::Value("Blue".into()));
    assert_eq!(oracle.calls(), 1);
    assert!(oracle.prompts()[0].contains("Favourite colour"));
}

#[test]
fn required_orphan_text_gets_fallback() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let oracle = MockOracle::new();
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);

    let decision = engine.resolve(&required(unlabeled(FieldType::Text)), &[]).expect("no oracle needed");
    assert_eq!(decision, Decision::Value(FALLBACK_TEXT.to_string()));
    assert_eq!(oracle.calls(), 0, "Nothing to ask about");
}

#[test]
fn oracle_answer_is_ranked_against_options() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let oracle = MockOracle::with_answers(["Paris"]);
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);
    let q = required(field("Preferred office", FieldType::Select));

    let decision = engine.resolve(&q, &strings(&["London", "Paris", "Berlin"])).expect("oracle answers");
    assert_eq!(decision, Decision::select_one(1));
    assert_eq!(oracle.prompts(), vec!["Preferred office\n[London | Paris | Berlin] multi=false".to_string()]);
}

#[test]
fn checkbox_answers_may_name_several_options() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let oracle = MockOracle::with_answers(["English\n- German"]);
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);
    let q = field("Which languages do you speak?", FieldType::Checkbox);

    let decision = engine.resolve(&q, &strings(&["English", "French", "German"])).expect("oracle answers");
    assert_eq!(decision, Decision::Select(vec![0, 2]));
    assert!(oracle.prompts()[0].ends_with("multi=true"));
}

#[test]
fn optional_orphan_options_can_be_declined() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let oracle = MockOracle::with_answers(["N/A"]);
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);

    let decision = engine.resolve(&unlabeled(FieldType::Select), &strings(&["Red", "Green"])).expect("oracle answers");
    assert_eq!(decision, Decision::Skip);
    assert_eq!(oracle.calls(), 1);
}

#[test]
fn exhausted_oracle_is_an_error() {
    let (tables, thresholds, profile) = (tables(), thresholds(), profile());
    let oracle = MockOracle::new();
    let engine = AnswerEngine::new(&tables, &thresholds, &profile, &oracle);
    let q = required(field("Favourite colour", FieldType::Text));
    assert!(engine.resolve(&q, &[]).is_err());
}

// =========================================================================
// Ranking
// =========================================================================

#[test]
fn select_keeps_only_the_clear_winner() {
    let thresholds = thresholds();
    let ranked = [Ranked { index: 2, score: 95 }, Ranked { index: 0, score: 60 }];
    assert_eq!(select(&ranked, 3, false, &thresholds), vec![2]);

    let close = [Ranked { index: 1, score: 85 }, Ranked { index: 3, score: 82 }, Ranked { index: 0, score: 10 }];
    assert_eq!(select(&close, 4, false, &thresholds), vec![1, 3], "Several good options among many");
    assert_eq!(select(&close, 3, false, &thresholds), vec![1], "Few options keep the best one");

    let weak = [Ranked { index: 0, score: 30 }];
    assert!(select(&weak, 2, false, &thresholds).is_empty());
    assert_eq!(select(&weak, 2, true, &thresholds), vec![0], "Required fields always get an option");
}

#[test]
fn rank_orders_by_similarity() {
    let ranked = rank(&["No", "Yes", "Maybe"], "yes");
    assert_eq!(ranked[0], Ranked { index: 1, score: 100 });
    assert_eq!(ranked.len(), 3);
}

// =========================================================================
// Dates
// =========================================================================

#[test]
fn dates_are_reformatted() {
    let date = NaiveDate::from_ymd_opt(2020, 3, 1).expect("valid date");
    assert_eq!(format_date(date, DateFormat::MonthDayYear), "03012020");
    assert_eq!(format_date(date, DateFormat::DayMonthYear), "01032020");
    assert_eq!(format_date(date, DateFormat::MonthYear), "032020");
    assert_eq!(format_date(date, DateFormat::Year), "2020");

    assert_eq!(parse_profile_date("09/2014"), NaiveDate::from_ymd_opt(2014, 9, 1));
    assert_eq!(parse_profile_date(" 03/01/2020 "), Some(date));
    assert_eq!(parse_profile_date("2020-03-01"), None);
}

#[test]
fn date_answers_follow_section_tags() {
    let profile = profile();
    let today = NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date");

    let start = with_format(
        in_section(field("Start Date", FieldType::Date), SectionCategory::WorkExperience, 1, Subtype::StartDate),
        DateFormat::MonthYear,
    );
    assert_eq!(date_answer(&start, &profile, today), DateAnswer::Value("032020".into()));

    let mut signed = field("Date", FieldType::Date);
    signed.options = FieldOptions::Section(SectionTag {
        category: SectionCategory::Other,
        ordinal: 0,
        subtype: Subtype::Unspecified,
        format: Some(DateFormat::MonthDayYear),
    });
    assert_eq!(date_answer(&signed, &profile, today), DateAnswer::Value("10162026".into()));

    let unknown_layout =
        in_section(field("Start Date", FieldType::Date), SectionCategory::WorkExperience, 1, Subtype::StartDate);
    assert_eq!(date_answer(&unknown_layout, &profile, today), DateAnswer::Skip);

    let missing = with_format(
        in_section(required(field("End Date", FieldType::Date)), SectionCategory::WorkExperience, 1, Subtype::EndDate),
        DateFormat::MonthYear,
    );
    assert!(matches!(date_answer(&missing, &profile, today), DateAnswer::Fail(_)), "Profile has no end date");

    assert!(matches!(date_answer(&field("Date", FieldType::Date), &profile, today), DateAnswer::Fail(_)));
}

// =========================================================================
// File picker queue
// =========================================================================

#[test]
fn ticket_lock_serves_in_order() {
    let lock = TicketLock::new();
    let first = lock.acquire();
    assert_eq!(first.ticket, 0);

    let second_done = AtomicBool::new(false);
    std::thread::scope(|s| {
        let waiter = s.spawn(|| {
            let turn = lock.acquire();
            second_done.store(true, Ordering::SeqCst);
            turn.ticket
        });
        std::thread::sleep(Duration::from_millis(50));
        assert!(!second_done.load(Ordering::SeqCst), "Second caller waits for the first");
        drop(first);
        assert_eq!(waiter.join().expect("waiter finishes"), 1);
    });
    assert!(second_done.load(Ordering::SeqCst));
    assert_eq!(lock.acquire().ticket, 2);
}
