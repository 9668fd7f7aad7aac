use formpilot::dom::document::Document;
use formpilot::dom::xpath::{count, is_absolute, is_unique, select_unique};
use formpilot::locator::locator_model::{Locator, RemapStage};
use formpilot::locator::revalidate::{clean_dynamic_attributes, is_misplaced, remap, typing_locator, validated_xpath};
use formpilot::locator::strategy::Chain;
use formpilot::locator::synthesize::{get_xpath, relative, relative_unique};

use crate::common::utils::doc;

mod common;

const TWO_INPUTS: &str = r#"
<html><body>
  <form>
    <input id="email" type="text" value="b" class="field">
    <input id="name" type="text" class="field">
  </form>
</body></html>"#;

// =========================================================================
// Remapping
// =========================================================================

#[test]
fn remap_keeps_unique_locator() {
    let d = doc(TWO_INPUTS);
    let found = remap(&d, "//input[@id='name']").expect("locator is unique");
    assert_eq!(found.stage, RemapStage::Unique);
    assert_eq!(found.value, "//input[@id='name']");
}

#[test]
fn remap_drops_value_predicate_after_typing() {
    let d = doc(TWO_INPUTS);
    let stale = "//input[@value='a'][@id='email']";
    assert_eq!(count(&d, stale), 0, "The typed value no longer matches");

    let found = remap(&d, stale).expect("conservative cleanup finds the input");
    assert_eq!(found.stage, RemapStage::Conservative);
    assert_eq!(found.value, "//input[@id='email']");
    assert!(is_unique(&d, &found.value));
}

#[test]
fn remap_reduces_to_longest_unique_prefix() {
    let d = doc(TWO_INPUTS);
    let found = remap(&d, "//input[@id='email'][@class='renamed']").expect("prefix is unique");
    assert_eq!(found.stage, RemapStage::Reduced);
    assert_eq!(found.value, "//input[@id='email']");
}

#[test]
fn remap_aggressive_drops_ids_and_classes() {
    let d = doc(r#"<html><body><textarea id="x-123" name="cover"></textarea></body></html>"#);
    let found = remap(&d, "//textarea[@id='x-999'][@name='cover']");
    // Reduction stops at the bare tag, which is unique here.
    assert_eq!(found.map(|f| f.stage), Some(RemapStage::Reduced));

    let d = doc(r#"<html><body><textarea id="x-123" name="cover"></textarea><textarea name="other"></textarea></body></html>"#);
    let found = remap(&d, "//textarea[@id='x-999'][@name='cover']").expect("aggressive cleanup finds it");
    assert_eq!(found.stage, RemapStage::Aggressive);
    assert_eq!(found.value, "//textarea[@name='cover']");
}

#[test]
fn remap_gives_up_on_ambiguous_locators() {
    let d = doc(TWO_INPUTS);
    assert!(remap(&d, "//input[@class='field']").is_none(), "Two inputs share the class");
}

#[test]
fn clean_dynamic_attributes_passes() {
    let xpath = "//input[@data-id='7'][@value='x'][@tabindex='2'][@name='q'][@class='c']";
    assert_eq!(clean_dynamic_attributes(xpath, false), "//input[@data-id='7'][@name='q'][@class='c']");
    assert_eq!(clean_dynamic_attributes(xpath, true), "//input[@name='q']");
    assert_eq!(
        clean_dynamic_attributes("//input[@aria-valuenow='3'][@name='q']", false),
        "//input[@name='q']",
        "Any attribute mentioning value is volatile"
    );
    assert_eq!(
        clean_dynamic_attributes("//a[contains(@href, 'x')][@title='a]b']", true),
        "//a[contains(@href, 'x')][@title='a]b']",
        "Brackets inside quotes and non-equality predicates stay"
    );
}

// =========================================================================
// Validation
// =========================================================================

#[test]
fn validated_xpath_prefers_relative_then_absolute() {
    let d = doc(TWO_INPUTS);
    let node = select_unique(&d, "//input[@id='name']").expect("input exists");
    let primary = get_xpath(&d, node).expect("element has a unique path");
    assert!(is_absolute(&primary), "Primary locators are absolute when possible: {}", primary);

    let locator = Locator::new(primary.clone(), Some("//input[@id='name']".to_string()));
    let found = validated_xpath(&d, &locator).expect("relative resolves");
    assert_eq!(found.stage, RemapStage::Unique);
    assert_eq!(found.value, "//input[@id='name']");

    let lost_relative = Locator::new(primary.clone(), Some("//input[@id='gone'][@class='field']".to_string()));
    let found = validated_xpath(&d, &lost_relative).expect("absolute still unique");
    assert_eq!(found.stage, RemapStage::Absolute);
    assert_eq!(found.value, primary);
}

#[test]
fn misplaced_when_nothing_resolves_once() {
    let d = doc(TWO_INPUTS);
    assert!(!is_misplaced(&d, &Locator::relative_only("//input[@id='email']")));
    assert!(is_misplaced(&d, &Locator::relative_only("//input[@class='field']")));
    assert!(is_misplaced(&d, &Locator::relative_only("//select")));
}

#[test]
fn typing_locator_prefers_cleaned_form() {
    let d = doc(TWO_INPUTS);
    assert_eq!(typing_locator(&d, "//input[@id='email'][@value='b']"), "//input[@id='email']");
    assert_eq!(typing_locator(&d, "//input[@class='field'][@value='b']"), "//input[@class='field'][@value='b']");
    assert_eq!(typing_locator(&d, "/html/body/form[1]/input[1]"), "/html/body/form[1]/input[1]");
}

// =========================================================================
// Synthesis
// =========================================================================

#[test]
fn relative_locator_reduces_inline_code() {
    let d: Document = doc(r#"<html><body><button onclick="submitForm('x')" id="go">Go</button></body></html>"#);
    let node = select_unique(&d, "//button[@id='go']").expect("button exists");
    let xpath = relative(&d, node).expect("element has a tag");
    assert!(xpath.contains("contains(@onclick, 'submitForm')"), "got {}", xpath);
    assert_eq!(relative_unique(&d, node).as_deref(), Some(xpath.as_str()));
}

#[test]
fn chain_reports_winning_stage() {
    let chain = Chain::<u32, &str, u32>::new("test")
        .then("never", |_| None)
        .then("double", |n| Some(*n * 2))
        .then("unreached", |_| Some(0));
    let mut input = 21;
    let found = chain.run(&mut input).expect("second stage succeeds");
    assert_eq!(found.stage, "double");
    assert_eq!(found.value, 42);
    assert_eq!(chain.len(), 3);
}
