use formpilot::extract::classify::merge_choice_groups;
use formpilot::extract::context::SectionLimits;
use formpilot::extract::page_model::{DateFormat, FieldOptions, FieldType, SectionCategory, Subtype, UploadKind};
use formpilot::extract::parser::{PageParser, Reveal};

use crate::common::pages::{SIGN_IN_PAGE, SPONSORSHIP_PAGE, TWO_JOBS_PAGE};
use crate::common::utils::{doc, parse, parse_with_limits, tables, thresholds};

mod common;

// =========================================================================
// Fields
// =========================================================================

#[test]
fn legend_captions_a_radio_group_without_labels_around_it() {
    let page = parse(
        r#"<html><body><main><div><form>
        <fieldset><legend>Are you willing to relocate?</legend>
        <div><label><input type="radio" name="move" value="y"> Yes</label></div>
        <div><label><input type="radio" name="move" value="n"> No</label></div>
        </fieldset></form></div></main></body></html>"#,
    );
    let radio = page.fields_of_type(FieldType::Radio).next().expect("one radio group");
    assert_eq!(radio.label_text.as_deref(), Some("Are you willing to relocate?"));
    assert_eq!(radio.options.choices().len(), 2);
}

#[test]
fn labels_and_types_are_read_from_markup() {
    let page = parse(SIGN_IN_PAGE);
    assert_eq!(page.fields.len(), 2, "fields: {:?}", page.fields);

    let email = &page.fields[0];
    assert_eq!(email.field_type, FieldType::Email);
    assert_eq!(email.label_tag.as_deref(), Some("Email Address"));
    assert_eq!(email.id.as_deref(), Some("email"));
    assert!(email.locator.is_primary_absolute(), "Fresh fields get an absolute primary locator");
    assert!(email.locator.relative.as_deref().is_some_and(|r| r.contains("@id='email'")));

    assert_eq!(page.fields[1].field_type, FieldType::Password);
}

#[test]
fn required_from_attribute_or_star() {
    let page = parse(
        r#"<html><body><form>
        <label for="a">Phone Number</label><input type="tel" id="a" required>
        <label for="b">Last Name*</label><input type="text" id="b">
        <label for="c">Middle Name</label><input type="text" id="c">
        </form></body></html>"#,
    );
    let required: Vec<bool> = page.fields.iter().map(|f| f.required).collect();
    assert_eq!(required, vec![true, true, false]);
}

#[test]
fn hidden_fields_are_removed() {
    let page = parse(
        r#"<html><body><form>
        <label for="nick">Nickname</label><input type="text" id="nick" style="display: none">
        <label for="city">City</label><input type="text" id="city">
        </form></body></html>"#,
    );
    let ids: Vec<_> = page.fields.iter().filter_map(|f| f.id.as_deref()).collect();
    assert_eq!(ids, vec!["city"]);
}

#[test]
fn blacklisted_optional_fields_are_dropped() {
    let page = parse(
        r#"<html><body><form>
        <label for="skills">Skills</label><input type="text" id="skills">
        <label for="captcha">Captcha</label><input type="text" id="captcha">
        <label for="city">City</label><input type="text" id="city">
        </form></body></html>"#,
    );
    assert_eq!(page.fields.len(), 1);
    assert_eq!(page.fields[0].id.as_deref(), Some("city"));
}

#[test]
fn select_options_skip_placeholders() {
    let page = parse(
        r#"<html><body><form>
        <label for="level">Highest level</label>
        <select id="level"><option>Select...</option><option>Bachelors</option><option>Masters</option></select>
        </form></body></html>"#,
    );
    let field = &page.fields[0];
    assert_eq!(field.field_type, FieldType::Select);
    assert_eq!(
        field.options,
        FieldOptions::List { items: vec!["Bachelors".to_string(), "Masters".to_string()] }
    );
}

// =========================================================================
// Classification
// =========================================================================

#[test]
fn radios_merge_into_one_question() {
    let page = parse(SPONSORSHIP_PAGE);
    assert_eq!(page.count_of_type(FieldType::Radio), 1, "fields: {:?}", page.fields);

    let radio = page.fields_of_type(FieldType::Radio).next().expect("one radio group");
    let texts: Vec<&str> = radio.options.choices().iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["Yes", "No"]);
    assert!(radio.label_tag.is_none(), "A merged group drops the first option's tag label");
    assert_eq!(
        radio.label_text.as_deref(),
        Some("Will you now or in the future require sponsorship for employment visa status?"),
        "The fieldset legend is the group question"
    );

    let again = merge_choice_groups(page.fields.clone(), &tables(), &thresholds());
    assert_eq!(again, page.fields, "Merging twice changes nothing");
}

#[test]
fn section_fields_are_capped_by_profile_entries() {
    let page = parse(TWO_JOBS_PAGE);
    assert_eq!(page.count_section(SectionCategory::WorkExperience, Subtype::JobTitle), 1);
    assert_eq!(page.fields.len(), 1, "The second job title has no profile entry");

    let tag = page.fields[0].section().expect("job title is tagged");
    assert_eq!(tag.ordinal, 1);

    let page = parse_with_limits(TWO_JOBS_PAGE, SectionLimits { work_experience: 2, education: 0 });
    assert_eq!(page.count_section(SectionCategory::WorkExperience, Subtype::JobTitle), 2);
    let ordinals: Vec<usize> = page.fields.iter().filter_map(|f| f.section()).map(|s| s.ordinal).collect();
    assert_eq!(ordinals, vec![1, 2]);
}

#[test]
fn date_fields_carry_their_format() {
    let page = parse(
        r#"<html><body><form>
        <label for="start">Start Date</label><input type="text" id="start" placeholder="MM/YYYY">
        </form></body></html>"#,
    );
    let field = &page.fields[0];
    assert_eq!(field.field_type, FieldType::Date);
    let tag = field.section().expect("dates are tagged");
    assert_eq!(tag.subtype, Subtype::StartDate);
    assert_eq!(tag.format, Some(DateFormat::MonthYear));
    assert_eq!(tag.category, SectionCategory::Other, "No section was open yet");
}

#[test]
fn verification_digits_are_numbered() {
    let page = parse(
        r####"<html><body><form>
        <input type="text" id="d1" placeholder="###">
        <input type="text" id="d2" placeholder="###">
        </form></body></html>"####,
    );
    let ordinals: Vec<_> = page.verification_fields().iter().map(|f| f.options.clone()).collect();
    assert_eq!(
        ordinals,
        vec![FieldOptions::Verification { ordinal: 1 }, FieldOptions::Verification { ordinal: 2 }]
    );
}

#[test]
fn uploads_are_classified() {
    let page = parse(
        r#"<html><body><form>
        <label for="resume">Upload your resume</label><input type="file" id="resume">
        <input type="file" id="drive" aria-label="Import from Google Drive">
        </form></body></html>"#,
    );
    assert_eq!(page.fields.len(), 1, "Cloud uploads are dropped: {:?}", page.fields);
    assert_eq!(page.fields[0].field_type, FieldType::File);
    assert_eq!(page.fields[0].options, FieldOptions::Upload { upload: UploadKind::Resume });
}

// =========================================================================
// Buttons, links and metadata
// =========================================================================

#[test]
fn navigation_buttons_are_blacklisted() {
    let page = parse(
        r#"<html><body><main>
        <button id="home">Home</button>
        <button id="posting">Back to Job Posting</button>
        <button type="submit" id="next">Next</button>
        </main></body></html>"#,
    );
    let texts: Vec<_> = page.buttons.iter().filter_map(|b| b.text.as_deref()).collect();
    assert_eq!(texts, vec!["Next"]);
    assert!(page.buttons[0].is_submit());
}

#[test]
fn header_buttons_are_ignored() {
    let page = parse(
        r#"<html><body><header><button id="menu-login">Log In</button></header>
        <button type="button" id="go">Continue</button></body></html>"#,
    );
    assert_eq!(page.buttons.len(), 1);
    assert_eq!(page.buttons[0].id.as_deref(), Some("go"));
}

#[test]
fn only_action_links_are_kept() {
    let page = parse(
        r#"<html><body>
        <a href="/apply/9">Apply</a>
        <a href="/jobs">Apply for other jobs</a>
        <a href="/about">About us</a>
        <a href="/register">Create Account</a>
        </body></html>"#,
    );
    let texts: Vec<&str> = page.links.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["Apply", "Create Account"]);
    assert_eq!(page.links[0].href.as_deref(), Some("/apply/9"));
}

#[test]
fn metadata_comes_from_head() {
    let page = parse(
        r#"<html><head><title> Apply - Engineer </title>
        <meta name="description" content="Join the team"></head><body></body></html>"#,
    );
    assert_eq!(page.metadata.title, "Apply - Engineer");
    assert_eq!(page.metadata.description.as_deref(), Some("Join the team"));
    assert_eq!(page.metadata.url, "https://jobs.example.com/apply");
}

// =========================================================================
// Revealed elements
// =========================================================================

#[test]
fn revealed_fields_are_inserted_after_their_parent() {
    const BEFORE: &str = r#"<html><body><form>
        <label for="visa">Visa status</label><input type="text" id="visa">
        <label for="city">City</label><input type="text" id="city">
        </form></body></html>"#;
    const AFTER: &str = r#"<html><body><form>
        <label for="visa">Visa status</label><input type="text" id="visa">
        <input type="text" id="explain" aria-label="Please explain">
        <label for="city">City</label><input type="text" id="city">
        </form></body></html>"#;

    let tables = tables();
    let thresholds = thresholds();
    let parser = PageParser::new(&tables, &thresholds, SectionLimits::default());
    let mut page = parser.parse_page(&doc(BEFORE), "https://jobs.example.com/apply");
    assert_eq!(page.model.fields.len(), 2);

    let locators = vec!["//input[@id='explain']".to_string()];
    let reveal = Reveal { locators: &locators, index: 1, include_parent_label: true };
    let inserted = parser.insert_revealed(&doc(AFTER), &mut page, reveal);

    assert_eq!(inserted, 1);
    let ids: Vec<_> = page.model.fields.iter().filter_map(|f| f.id.as_deref()).collect();
    assert_eq!(ids, vec!["visa", "explain", "city"]);
    let parent = page.model.fields[1].label_parent.as_deref().expect("parent label carried");
    assert!(parent.starts_with("Visa status"), "label_parent was {}", parent);
}
