use formpilot::diff::change::{NEW_ELEMENT_QUERIES, has_significantly_changed, new_elements, preserved_ratio};
use formpilot::diff::html_diff::{Delta, diff};
use formpilot::diff::options::{OptionScan, options_from_diff};
use formpilot::dom::xpath::select_unique;

use crate::common::utils::{doc, tables};

mod common;

const CLOSED: &str = r#"<html><body><div id="app"><input id="color" name="color"></div></body></html>"#;

const OPENED: &str = r#"<html><body>
<div id="app"><input id="color" name="color"></div>
<ul id="menu"><li id="opt-0" role="option">Select an option</li><li id="opt-1" role="option">Red</li><li id="opt-2" role="option">Blue</li></ul>
</body></html>"#;

// =========================================================================
// Structural diff
// =========================================================================

#[test]
fn identical_captures_have_empty_diff() {
    let before = doc(CLOSED);
    let after = doc(CLOSED);
    let d = diff(&before, &after);
    assert!(d.is_empty(), "Nothing changed: {:?}", d);
    assert!(d.parent_paths.is_empty());
}

#[test]
fn revealed_list_is_a_replaced_delta() {
    let before = doc(CLOSED);
    let after = doc(OPENED);
    let d = diff(&before, &after);

    assert_eq!(d.deltas.len(), 1, "Only the list is new: {:?}", d.deltas);
    let menu = select_unique(&after, "//ul[@id='menu']").expect("menu exists");
    assert_eq!(d.deltas[0], Delta::Replaced(menu));
    assert_eq!(d.parent_paths, vec!["/html/body".to_string()]);

    let html = d.fragment_html(&after);
    assert!(html.contains("Red") && html.contains("Blue"), "fragment was {}", html);
    assert!(!html.contains("color"), "Unchanged input stays out of the fragment");

    let fragment = d.fragment(&after);
    assert!(!fragment.is_empty());
    assert!(fragment.inner_text().contains("Red"));
}

const ROWS: &str = r#"<html><body><form id="f">
<div class="row"><input name="first"></div>
<div class="row"><input name="second"></div>
<div class="row"><input name="third"></div>
</form></body></html>"#;

#[test]
fn repeated_rows_diff_cleanly_against_themselves() {
    let before = doc(ROWS);
    let after = doc(ROWS);
    for _ in 0..3 {
        let d = diff(&before, &after);
        assert!(d.is_empty(), "Identical rows must align one to one: {}", d.fragment_html(&after));
    }
}

#[test]
fn attribute_order_does_not_matter() {
    let before = doc(r#"<html><body><div id="app"><input name="color" type="text" id="color"></div></body></html>"#);
    let after = doc(r#"<html><body><div id="app"><input id="color" type="text" name="color"></div></body></html>"#);
    assert!(diff(&before, &after).is_empty(), "Same attributes in another order");
    assert!(new_elements(&before, &after, NEW_ELEMENT_QUERIES).is_empty());
}

#[test]
fn row_inserted_mid_list_is_the_only_delta() {
    let before = doc(r#"<html><body><ul id="list"><li>One</li><li>Two</li><li>Three</li></ul></body></html>"#);
    let after = doc(r#"<html><body><ul id="list"><li>One</li><li>New</li><li>Two</li><li>Three</li></ul></body></html>"#);
    let d = diff(&before, &after);

    let list = select_unique(&after, "//ul[@id='list']").expect("list exists");
    let inserted = select_unique(&after, "//ul[@id='list']/li[2]").expect("second item");
    assert_eq!(d.deltas, vec![Delta::Partial { node: list, children: vec![Delta::Replaced(inserted)] }]);
    assert_eq!(d.fragment(&after).inner_text(), "New");

    assert_eq!(d.parent_paths.len(), 1, "paths were {:?}", d.parent_paths);
    assert_eq!(
        select_unique(&before, &d.parent_paths[0]),
        select_unique(&before, "//ul[@id='list']"),
        "Parent path points at the list in both captures"
    );
}

#[test]
fn changed_row_among_repeats_is_partial() {
    let before = doc(ROWS);
    let after = doc(&ROWS.replace(r#"<input name="second">"#, r#"<input name="second"><span>Required</span>"#));
    let d = diff(&before, &after);
    assert_eq!(d.deltas.len(), 1, "{:?}", d.deltas);
    assert_eq!(d.fragment(&after).inner_text(), "Required");
}

// =========================================================================
// Option discovery
// =========================================================================

#[test]
fn options_are_read_from_the_revealed_fragment() {
    let before = doc(CLOSED);
    let after = doc(OPENED);
    let d = diff(&before, &after);
    let owner = select_unique(&after, "//input[@id='color']");
    let scan = OptionScan { owner, ..Default::default() };

    let options = options_from_diff(&d, &after, &scan, &tables().blacklists);
    let texts: Vec<&str> = options.iter().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, vec!["Red", "Blue"], "Placeholder option is blacklisted");

    for option in &options {
        let node = select_unique(&after, &option.locator).expect("option locators are unique");
        assert_eq!(after.text_content(node).trim(), option.text);
    }
}

#[test]
fn options_before_owner_are_ignored() {
    let before = doc(r#"<html><body><div id="app"><input id="color"></div></body></html>"#);
    let after = doc(
        r#"<html><body><ul id="menu"><li id="a">Green</li></ul><div id="app"><input id="color"></div></body></html>"#,
    );
    let d = diff(&before, &after);
    let scan = OptionScan { owner: select_unique(&after, "//input[@id='color']"), ..Default::default() };
    assert!(options_from_diff(&d, &after, &scan, &tables().blacklists).is_empty());
}

// =========================================================================
// Change detection
// =========================================================================

#[test]
fn preserved_ratio_counts_surviving_controls() {
    let before = doc(r#"<html><body><input name="a"><input name="b"></body></html>"#);
    let after = doc(r#"<html><body><input name="a"><textarea name="c"></textarea></body></html>"#);
    assert_eq!(preserved_ratio(&before, &after), Some(0.5));
    assert!(has_significantly_changed(&before, &after, 0.6));
    assert!(!has_significantly_changed(&before, &after, 0.4));
}

#[test]
fn empty_before_always_counts_as_changed() {
    let before = doc("<html><body><p>Loading</p></body></html>");
    let after = doc(CLOSED);
    assert_eq!(preserved_ratio(&before, &after), None);
    assert!(has_significantly_changed(&before, &after, 0.0));
}

#[test]
fn new_elements_have_unique_locators() {
    let before = doc(CLOSED);
    let after = doc(
        r#"<html><body><div id="app"><input id="color" name="color"><input id="shade" name="shade"></div></body></html>"#,
    );
    let found = new_elements(&before, &after, NEW_ELEMENT_QUERIES);
    assert_eq!(found.len(), 1, "Only the shade input is new: {:?}", found);
    assert!(found[0].locator.contains("@id='shade'"), "locator was {}", found[0].locator);
    assert_eq!(select_unique(&after, &found[0].locator), Some(found[0].node));
}

#[test]
fn new_elements_skip_unchanged_rows() {
    let before = doc(ROWS);
    let after = doc(&ROWS.replace(
        r#"<div class="row"><input name="second"></div>"#,
        r#"<div class="row"><input name="second"></div><div class="row"><input name="middle"></div>"#,
    ));
    let found = new_elements(&before, &after, NEW_ELEMENT_QUERIES);
    assert_eq!(found.len(), 1, "Only the middle row is new: {:?}", found);
    assert_eq!(found[0].locator, "//input[@name='middle']");
}
