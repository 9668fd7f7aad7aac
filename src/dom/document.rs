use std::collections::HashMap;

use scraper::Html;

use crate::text::normalize::collapse_whitespace;

/// Index into `Document::nodes`. Ids follow document (pre-)order, so a larger
/// id always comes later in the document.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Virtual root above `<html>`.
    Document,
    /// `attrs` are sorted by name.
    Element { tag: String, attrs: Vec<(String, String)> },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// One past the last descendant.
    end: NodeId,
}

/// Arena tree of a serialized DOM capture.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    has_namespaces: bool,
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset", "figcaption", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "label", "legend", "li", "main", "nav", "ol",
    "option", "p", "pre", "section", "table", "tr", "ul",
];

const NEVER_RENDERED: &[&str] = &["head", "script", "style", "template", "noscript", "title", "meta", "link"];

impl Document {
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut nodes = vec![Node { kind: NodeKind::Document, parent: None, children: Vec::new(), end: 1 }];
        let mut ids = HashMap::new();

        for source in parsed.tree.root().descendants() {
            let kind = match source.value() {
                scraper::Node::Document => {
                    ids.insert(source.id(), Self::ROOT);
                    continue;
                }
                scraper::Node::Element(el) => {
                    let mut attrs: Vec<(String, String)> =
                        el.attrs().map(|(k, v)| (k.to_string(), v.to_string())).collect();
                    // canonical order; scraper hands them out unordered
                    attrs.sort();
                    NodeKind::Element { tag: el.name().to_lowercase(), attrs }
                }
                scraper::Node::Text(t) => NodeKind::Text(t.text.to_string()),
                _ => continue,
            };
            let Some(parent) = source.parent().and_then(|p| ids.get(&p.id()).copied()) else {
                continue;
            };
            let id = nodes.len();
            ids.insert(source.id(), id);
            nodes.push(Node { kind, parent: Some(parent), children: Vec::new(), end: id + 1 });
            nodes[parent].children.push(id);
        }

        for i in (0..nodes.len()).rev() {
            nodes[i].end = match nodes[i].children.last() {
                Some(&last) => nodes[last].end,
                None => i + 1,
            };
        }

        Document { nodes, has_namespaces: detect_namespaces(html) }
    }

    // ========================================================================
    // Structure
    // ========================================================================

    pub const ROOT: NodeId = 0;

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Namespaced tags (`<svg:rect>`) make positional paths unreliable.
    pub fn has_namespaces(&self) -> bool {
        self.has_namespaces
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Parent only when it is an element.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id].children.iter().copied().filter(|c| self.is_element(*c))
    }

    /// Strict descendants in document order.
    pub fn descendants(&self, id: NodeId) -> std::ops::Range<NodeId> {
        id + 1..self.nodes[id].end
    }

    pub fn element_descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(id).filter(|d| self.is_element(*d))
    }

    /// Ancestor elements, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent_element(id), move |p| self.parent_element(*p))
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor < node && node < self.nodes[ancestor].end
    }

    /// `a` follows `b` in document order.
    pub fn is_after(&self, a: NodeId, b: NodeId) -> bool {
        a > b
    }

    pub fn all_elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(|i| self.is_element(*i))
    }

    pub fn elements_by_tag<'a>(&'a self, tags: &'a [&str]) -> impl Iterator<Item = NodeId> + 'a {
        self.all_elements().filter(move |i| self.tag(*i).is_some_and(|t| tags.contains(&t)))
    }

    pub fn body(&self) -> Option<NodeId> {
        self.elements_by_tag(&["body"]).next()
    }

    // ========================================================================
    // Elements
    // ========================================================================

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id).map(|n| &n.kind), Some(NodeKind::Element { .. }))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match self.nodes.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(NodeKind::Element { attrs, .. }) = self.nodes.get_mut(id).map(|n| &mut n.kind) {
            match attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some((_, v)) => *v = value.to_string(),
                None => {
                    let at = attrs.partition_point(|(k, _)| k.as_str() < name);
                    attrs.insert(at, (name.to_string(), value.to_string()));
                }
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(NodeKind::Element { attrs, .. }) = self.nodes.get_mut(id).map(|n| &mut n.kind) {
            attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        }
    }

    /// 1-based position among same-tag element siblings.
    pub fn sibling_index(&self, id: NodeId) -> usize {
        let Some(tag) = self.tag(id) else { return 1 };
        let Some(parent) = self.parent(id) else { return 1 };
        self.element_children(parent)
            .take_while(|c| *c != id)
            .filter(|c| self.tag(*c) == Some(tag))
            .count()
            + 1
    }

    /// `/html/body/div[2]/input[1]`. Indices are emitted for every step below body.
    pub fn absolute_path(&self, id: NodeId) -> Option<String> {
        let tag = self.tag(id)?;
        match tag {
            "html" => return Some("/html".to_string()),
            "body" => return Some("/html/body".to_string()),
            "head" => return Some("/html/head".to_string()),
            _ => {}
        }
        let parent = self.parent_element(id)?;
        let prefix = self.absolute_path(parent)?;
        Some(format!("{}/{}[{}]", prefix, tag, self.sibling_index(id)))
    }

    // ========================================================================
    // Text
    // ========================================================================

    /// Raw concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let NodeKind::Text(t) = &self.nodes[id].kind {
            out.push_str(t);
        }
        for d in self.descendants(id) {
            if let NodeKind::Text(t) = &self.nodes[d].kind {
                out.push_str(t);
            }
        }
        out
    }

    /// Text directly under this element, not inside child elements.
    pub fn own_text(&self, id: NodeId) -> String {
        let raw: String = self.nodes[id]
            .children
            .iter()
            .filter_map(|c| match &self.nodes[*c].kind {
                NodeKind::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        collapse_whitespace(&raw)
    }

    /// Rendered-ish text: hidden subtrees skipped, block elements on their own
    /// lines, whitespace collapsed within lines. `skip_tags` subtrees are left out.
    pub fn inner_text_excluding(&self, id: NodeId, skip_tags: &[&str]) -> String {
        let mut raw = String::new();
        self.collect_inner_text(id, skip_tags, &mut raw);
        raw.lines()
            .map(collapse_whitespace)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn inner_text(&self, id: NodeId) -> String {
        self.inner_text_excluding(id, &[])
    }

    fn collect_inner_text(&self, id: NodeId, skip_tags: &[&str], out: &mut String) {
        match &self.nodes[id].kind {
            NodeKind::Text(t) => out.push_str(&t.replace('\n', " ")),
            NodeKind::Element { tag, .. } => {
                if skip_tags.contains(&tag.as_str()) || !self.is_self_visible(id) {
                    return;
                }
                let block = BLOCK_TAGS.contains(&tag.as_str());
                if block {
                    out.push('\n');
                }
                for c in &self.nodes[id].children {
                    self.collect_inner_text(*c, skip_tags, out);
                }
                if block {
                    out.push('\n');
                }
            }
            NodeKind::Document => {
                for c in &self.nodes[id].children {
                    self.collect_inner_text(*c, skip_tags, out);
                }
            }
        }
    }

    /// Whole-page visible text, used by the page-state detectors.
    pub fn page_text(&self) -> String {
        match self.body() {
            Some(body) => self.inner_text(body),
            None => self.inner_text(Self::ROOT),
        }
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    fn is_self_visible(&self, id: NodeId) -> bool {
        let Some(tag) = self.tag(id) else { return true };
        if NEVER_RENDERED.contains(&tag) || self.has_attr(id, "hidden") {
            return false;
        }
        if tag == "input" && self.attr(id, "type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")) {
            return false;
        }
        match self.attr(id, "style") {
            Some(style) => {
                let style: String = style.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();
                !(style.contains("display:none") || style.contains("visibility:hidden"))
            }
            None => true,
        }
    }

    /// Static approximation of rendered visibility from attributes and inline style.
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.is_element(id) && self.is_self_visible(id) && self.ancestors(id).all(|a| self.is_self_visible(a))
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for c in &self.nodes[Self::ROOT].children {
            self.write_html(*c, &mut out);
        }
        out
    }

    /// Opening tag only, e.g. `<input id="a" type="text">`.
    pub fn start_tag(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let NodeKind::Element { tag, attrs } = &self.nodes[id].kind {
            write_start_tag(tag, attrs, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].kind {
            NodeKind::Document => {
                for c in &self.nodes[id].children {
                    self.write_html(*c, out);
                }
            }
            NodeKind::Text(t) => out.push_str(&escape_text(t)),
            NodeKind::Element { tag, attrs } => {
                write_start_tag(tag, attrs, out);
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for c in &self.nodes[id].children {
                    self.write_html(*c, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn write_start_tag(tag: &str, attrs: &[(String, String)], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    for (k, v) in attrs {
        out.push(' ');
        out.push_str(k);
        if !v.is_empty() {
            out.push_str("=\"");
            out.push_str(&v.replace('&', "&amp;").replace('"', "&quot;"));
            out.push('"');
        }
    }
    out.push('>');
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// `<prefix:name` anywhere in the source.
fn detect_namespaces(html: &str) -> bool {
    let bytes = html.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && bytes[j].is_ascii_alphanumeric() {
                j += 1;
            }
            if j > start && j + 1 < bytes.len() && bytes[j] == b':' && bytes[j + 1].is_ascii_alphanumeric() {
                return true;
            }
        }
        i += 1;
    }
    false
}
