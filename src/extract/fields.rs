use tracing::debug;

use crate::config::keywords::{Blacklists, FieldTypeBlacklist};
use crate::dom::document::{Document, NodeId};
use crate::dom::xpath::is_absolute;
use crate::extract::labels::{
    associated_text, attribute_value_contains, attribute_value_equals, custom_attribute, label_attribute, label_tag,
    search_attribute,
};
use crate::extract::page_model::{ChoiceOption, FieldDescriptor, FieldOptions, FieldType};
use crate::locator::locator_model::Locator;
use crate::locator::synthesize::{get_xpath, relative};
use crate::text::matching::{hits_full, hits_partial};
use crate::text::normalize::{clean_text, non_empty};

// ============================================================================
// Candidate selection
// ============================================================================

/// Dynamic dropdowns: comboboxes, autocomplete lists, datalist inputs and
/// any element whose markup mentions a listbox.
pub fn is_list_type(doc: &Document, id: NodeId) -> bool {
    doc.attr(id, "role") == Some("combobox")
        || doc.attr(id, "aria-autocomplete") == Some("list")
        || doc.has_attr(id, "list")
        || doc.outer_html(id).contains("listbox")
}

fn input_type(doc: &Document, id: NodeId) -> Option<String> {
    doc.attr(id, "type").map(str::to_lowercase)
}

pub fn is_field_candidate(doc: &Document, id: NodeId) -> bool {
    match doc.tag(id) {
        Some("input") => !matches!(input_type(doc, id).as_deref(), Some("submit" | "button" | "reset")),
        Some("textarea" | "select") => true,
        Some("button") => is_list_type(doc, id),
        _ => false,
    }
}

pub fn is_button_candidate(doc: &Document, id: NodeId) -> bool {
    if is_list_type(doc, id) {
        return false;
    }
    match doc.tag(id) {
        Some("button") => true,
        Some("input") => matches!(input_type(doc, id).as_deref(), Some("submit" | "button" | "reset")),
        Some(_) => doc.attr(id, "role") == Some("button"),
        None => false,
    }
}

/// A `*hidden` attribute set to `true`.
pub fn is_marked_hidden(doc: &Document, id: NodeId) -> bool {
    search_attribute(doc, id, "hidden")
        .iter()
        .any(|(_, v)| v.eq_ignore_ascii_case("true"))
}

pub fn has_ancestor_tag(doc: &Document, id: NodeId, tag: &str) -> bool {
    doc.ancestors(id).any(|a| doc.tag(a) == Some(tag))
}

/// Required from attributes, ARIA state, error classes or a visible marker
/// next to the element.
pub fn is_required(doc: &Document, id: NodeId) -> bool {
    if doc.has_attr(id, "required") {
        return true;
    }
    if doc
        .attr(id, "data-required")
        .is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "" | "true" | "1"))
    {
        return true;
    }
    if search_attribute(doc, id, "required").iter().any(|(_, v)| *v == "true") {
        return true;
    }
    if doc.attr(id, "aria-invalid") == Some("true") {
        return true;
    }
    let class = doc.attr(id, "class").unwrap_or("").to_lowercase();
    if ["required", "error", "has-error"].iter().any(|k| class.contains(k)) {
        return true;
    }
    let Some(parent) = doc.parent_element(id) else {
        return false;
    };
    doc.element_descendants(parent).filter(|d| *d != id).any(|d| {
        let marked = doc.own_text(d).contains("required") || doc.attr(d, "class").is_some_and(|c| c.contains("error"));
        marked && doc.is_visible(d)
    })
}

// ============================================================================
// Field extraction
// ============================================================================

/// Per-call switches for [`extract_field`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOpts<'a> {
    /// Skip every blacklist; used for fields revealed by an answer.
    pub force_insert: bool,
    pub label_parent: Option<&'a str>,
}

/// Build the raw descriptor of one candidate. `None` drops the node.
pub fn extract_field(doc: &Document, id: NodeId, blacklists: &Blacklists, opts: ExtractOpts<'_>) -> Option<FieldDescriptor> {
    let tag = doc.tag(id)?.to_string();
    let raw_type = input_type(doc, id);
    if raw_type.as_deref() == Some("hidden") && doc.has_attr(id, "disabled") {
        return None;
    }

    let Some(primary) = get_xpath(doc, id) else {
        debug!(tag, "field dropped: no unique locator");
        return None;
    };
    let relative_locator = if is_absolute(&primary) { relative(doc, id) } else { Some(primary.clone()) };
    let locator = Locator::new(primary.clone(), relative_locator);

    if has_ancestor_tag(doc, id, "header") || has_ancestor_tag(doc, id, "footer") {
        return None;
    }

    let mut field_type = match tag.as_str() {
        "select" => FieldType::Select,
        "textarea" => FieldType::Textarea,
        _ => FieldType::from_raw(raw_type.as_deref().unwrap_or(&tag)),
    };
    if is_list_type(doc, id) {
        field_type = FieldType::List;
    }

    let label_tag = label_tag(doc, id);
    let label_attribute = label_attribute(doc, id);
    let label_custom = custom_attribute(doc, id, "label");
    let label_text = associated_text(doc, id, &primary, field_type.is_choice());
    let field_id = non_empty(doc.attr(id, "id")).map(str::to_string);
    let id_custom = custom_attribute(doc, id, "id");

    let starred = |l: &Option<String>| l.as_deref().is_some_and(|l| l.starts_with('*') || l.ends_with('*'));
    let required = is_required(doc, id)
        || starred(&label_tag)
        || label_text.as_deref().is_some_and(|l| l.ends_with('*'));

    let placeholder = if tag == "button" {
        Some(clean_text(&doc.inner_text(id))).filter(|p| !p.is_empty())
    } else {
        non_empty(doc.attr(id, "placeholder")).map(str::to_string)
    };

    if !opts.force_insert && !required {
        let bl = &blacklists.field;
        let labels = [label_tag.as_deref(), label_text.as_deref(), label_attribute.as_deref(), label_custom.as_deref()];
        let ids = [field_id.as_deref(), id_custom.as_deref()];
        if hits_full(&bl.label_full, labels)
            || hits_partial(&bl.label_partial, labels)
            || hits_full(&bl.id_full, ids)
            || hits_partial(&bl.id_partial, ids)
            || hits_full(&bl.placeholder_full, [placeholder.as_deref()])
            || hits_partial(&bl.placeholder_partial, [placeholder.as_deref()])
            || attribute_value_equals(doc, id, &bl.attribute_value_full)
            || attribute_value_contains(doc, id, &bl.attribute_value_partial)
        {
            debug!(locator = %primary, "optional field blacklisted");
            return None;
        }
    }

    let name = non_empty(doc.attr(id, "name")).map(str::to_string);
    let value = non_empty(doc.attr(id, "value")).map(str::to_string);

    let multiselect_attr = doc.attrs(id).iter().find(|(n, _)| {
        let n = n.to_lowercase();
        n.contains("multiselect") && (n.ends_with("-id") || n.ends_with("_id"))
    });
    let options = if let Some((_, identifier)) = multiselect_attr {
        field_type = FieldType::Multiselect;
        FieldOptions::Multiselect { identifier: identifier.clone() }
    } else if field_type == FieldType::Select {
        FieldOptions::List { items: select_options(doc, id, blacklists) }
    } else if field_type.is_choice() {
        [&label_tag, &label_attribute, &label_custom, &label_text]
            .into_iter()
            .find_map(|l| l.clone())
            .map(|text| FieldOptions::Choices { items: vec![ChoiceOption { text, locator: primary.clone() }] })
            .unwrap_or_default()
    } else {
        FieldOptions::None
    };

    let mut field = FieldDescriptor {
        label_tag,
        label_text,
        label_attribute,
        label_custom,
        label_parent: opts.label_parent.map(str::to_string),
        name,
        id: field_id,
        id_custom,
        field_type,
        required,
        placeholder,
        value,
        options,
        locator,
        tag,
        input_type: raw_type,
        node: Some(id),
    };

    if !opts.force_insert && type_blacklisted(&field, &blacklists.field_type) {
        debug!(locator = %field.locator.primary, "field type blacklisted");
        return None;
    }

    if !doc.is_visible(id) {
        field.field_type = FieldType::Hidden;
    }
    Some(field)
}

fn type_blacklisted(field: &FieldDescriptor, bl: &FieldTypeBlacklist) -> bool {
    let (full, partial) = match field.field_type {
        FieldType::Text => (&bl.text_full, &bl.text_partial),
        FieldType::List => (&bl.list_full, &bl.list_partial),
        FieldType::Multiselect => (&bl.multiselect_full, &bl.multiselect_partial),
        FieldType::Select => (&bl.dropdown_full, &bl.dropdown_partial),
        _ => return false,
    };
    let values = field.search_values().into_iter().chain([field.placeholder.as_deref()]);
    hits_full(full, values.clone()) || hits_partial(partial, values)
}

/// Option texts of a `<select>`, minus blacklisted placeholders.
pub fn select_options(doc: &Document, select: NodeId, blacklists: &Blacklists) -> Vec<String> {
    doc.element_descendants(select)
        .filter(|d| doc.tag(*d) == Some("option"))
        .map(|o| clean_text(&doc.text_content(o)))
        .filter(|text| {
            !hits_full(&blacklists.dropdown_option_full, [Some(text.as_str())])
                && !hits_partial(&blacklists.dropdown_option_partial, [Some(text.as_str())])
        })
        .collect()
}
