use tracing::debug;

use crate::config::keywords::{Blacklists, FieldIdentifiers};
use crate::dom::document::{Document, NodeId};
use crate::dom::xpath::is_absolute;
use crate::extract::fields::has_ancestor_tag;
use crate::extract::labels::{
    associated_text, attribute_value_contains, attribute_value_equals, custom_attribute, label_tag,
};
use crate::extract::page_model::{ButtonDescriptor, ButtonType, FieldDescriptor, FieldType};
use crate::locator::locator_model::Locator;
use crate::locator::synthesize::{get_xpath, relative};
use crate::text::matching::{MatchOpts, any_matches, hits_full, hits_partial};
use crate::text::normalize::{clean_text, non_empty};

const LOOSE: MatchOpts = MatchOpts { exact: false, case_sensitive: false, ignore_whitespace: true };

/// Raw descriptor of a button-like element. `force_insert` skips the
/// header/footer exclusion and every blacklist.
pub fn extract_button(doc: &Document, id: NodeId, blacklists: &Blacklists, force_insert: bool) -> Option<ButtonDescriptor> {
    let tag = doc.tag(id)?.to_string();
    let primary = get_xpath(doc, id)?;
    let relative_locator = if is_absolute(&primary) { relative(doc, id) } else { Some(primary.clone()) };

    let button_type = match doc.attr(id, "type") {
        Some(t) if t.eq_ignore_ascii_case("submit") => ButtonType::Submit,
        _ => ButtonType::Button,
    };

    let text = if tag == "input" {
        non_empty(doc.attr(id, "value")).map(str::to_string)
    } else {
        Some(clean_text(&doc.inner_text(id)))
            .filter(|t| !t.is_empty())
            .or_else(|| non_empty(doc.attr(id, "title")).map(str::to_string))
    };

    let button_id = non_empty(doc.attr(id, "id")).map(str::to_string);
    let id_custom = custom_attribute(doc, id, "id");
    let ids = [button_id.as_deref(), id_custom.as_deref()];

    let label_tag = label_tag(doc, id);
    let label_custom = custom_attribute(doc, id, "label");
    let name = non_empty(doc.attr(id, "name"))
        .or_else(|| non_empty(doc.attr(id, "title")))
        .map(str::to_string);

    let lookup_label = |doc: &Document| {
        if is_absolute(&primary) { associated_text(doc, id, &primary, false) } else { None }
    };

    let mut label_text = None;
    if force_insert {
        label_text = lookup_label(doc);
    } else {
        let in_header = has_ancestor_tag(doc, id, "header");
        let in_footer = has_ancestor_tag(doc, id, "footer");
        if in_header || (in_footer && button_type != ButtonType::Submit) {
            return None;
        }

        let bl = &blacklists.button;
        if attribute_value_equals(doc, id, &bl.attribute_value_full)
            || attribute_value_contains(doc, id, &bl.attribute_value_partial)
        {
            return None;
        }
        let text_only = [text.as_deref()];
        if hits_full(&bl.text_full, text_only) {
            let scripted_blank = text.as_deref().is_none_or(str::is_empty) && doc.has_attr(id, "onclick");
            if !scripted_blank {
                return None;
            }
        }
        if hits_partial(&bl.text_partial, text_only)
            || hits_full(&bl.id_full, ids)
            || hits_partial(&bl.id_partial, ids)
        {
            return None;
        }

        let at = &blacklists.associated_text;
        let has_visible_text = tag == "button" && !doc.inner_text(id).is_empty();
        let skip_lookup = has_visible_text
            && (hits_full(&at.text_full, text_only)
                || hits_full(&at.id_full, ids)
                || hits_partial(&at.text_partial, text_only)
                || hits_partial(&at.id_partial, ids));
        if !skip_lookup {
            label_text = lookup_label(doc);
        }

        let labels = [label_tag.as_deref(), label_text.as_deref(), label_custom.as_deref()];
        if hits_full(&bl.label_full, labels) || hits_partial(&bl.label_partial, labels) {
            return None;
        }
    }

    if label_text.is_none() && ids.iter().flatten().any(|i| i.to_lowercase().contains("resume")) {
        label_text = Some("Resume".to_string());
    }

    Some(ButtonDescriptor {
        label_tag,
        label_text,
        label_custom,
        name,
        text,
        id: button_id,
        id_custom,
        button_type,
        value: non_empty(doc.attr(id, "value")).map(str::to_string),
        disabled: doc.has_attr(id, "disabled"),
        locator: Locator::new(primary, relative_locator),
        tag,
        node: Some(id),
    })
}

fn button_mentions<S: AsRef<str>>(button: &ButtonDescriptor, needles: &[S]) -> bool {
    any_matches(button.search_values(), needles, LOOSE)
}

fn fill(slot: &mut Option<String>, value: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

/// Classify a button against the fields kept so far. `None` means it was
/// empty, a cloud upload, or merged into the field it controls.
pub fn synchronize_button(
    doc: &Document,
    mut button: ButtonDescriptor,
    fields: &mut [FieldDescriptor],
    ids: &FieldIdentifiers,
) -> Option<ButtonDescriptor> {
    if button.search_values().iter().all(|v| v.is_none_or(str::is_empty)) {
        return None;
    }

    let resume_attr = button.node.is_some_and(|n| attribute_value_contains(doc, n, &ids.resume));
    if matches!(button.tag.as_str(), "input" | "button")
        && (button.button_type == ButtonType::File || resume_attr || button_mentions(&button, &ids.upload_file))
    {
        button.button_type = ButtonType::File;
        if button_mentions(&button, &ids.cloud_or_manual_upload) {
            debug!(text = button.display_text(), "cloud upload button dropped");
            return None;
        }
        let is_resume = button_mentions(&button, &ids.resume) || resume_attr;
        button.name = Some(if is_resume { "Resume" } else { "Other" }.to_string());
        return Some(button);
    }

    if button.is_submit() {
        return Some(button);
    }

    let keys = |b: &ButtonDescriptor| {
        [
            b.label_tag.clone(),
            b.label_text.clone(),
            b.label_custom.clone(),
            b.name.clone(),
            b.id.clone(),
            b.id_custom.clone(),
            b.value.clone(),
        ]
    };
    let field_keys = |f: &FieldDescriptor| {
        [
            f.label_tag.clone(),
            f.label_text.clone(),
            f.label_custom.clone(),
            f.name.clone(),
            f.id.clone(),
            f.id_custom.clone(),
            f.value.clone(),
        ]
    };
    let shares_key = |f: &FieldDescriptor| {
        keys(&button)
            .into_iter()
            .zip(field_keys(f))
            .any(|(b, f)| b.is_some_and(|b| !b.is_empty() && Some(&b) == f.as_ref()))
    };
    let Some(field) = fields.iter_mut().find(|f| shares_key(&**f)) else {
        return Some(button);
    };

    let button_locator = button.locator.relative.clone().unwrap_or_else(|| button.locator.primary.clone());
    if field.field_type == FieldType::List {
        field.locator = Locator::relative_only(button_locator.clone());
    }
    fill(&mut field.label_tag, &button.label_tag);
    fill(&mut field.label_text, &button.label_text);
    fill(&mut field.label_custom, &button.label_custom);
    fill(&mut field.name, &button.name);
    fill(&mut field.value, &button.value);
    if field.field_type == FieldType::File {
        if button.id.is_some() {
            field.id.clone_from(&button.id);
        }
        if button.id_custom.is_some() {
            field.id_custom.clone_from(&button.id_custom);
        }
    } else {
        fill(&mut field.id, &button.id);
        fill(&mut field.id_custom, &button.id_custom);
    }
    if field.field_type == FieldType::Hidden {
        field.field_type = FieldType::Button;
        field.locator = Locator::relative_only(button_locator);
    }
    debug!(field = field.display_label(), "button merged into field");
    None
}
