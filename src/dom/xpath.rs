//! Evaluator for the XPath subset the locator engine produces:
//! `/` and `//` steps with a tag name or `*`, `|` unions, and predicates of
//! the form `[@a='v']`, `[@a]`, `[contains(@a,'v')]`, `[text()='v']`,
//! `[contains(text(),'v')]`, `[normalize-space()='v']` and `[n]`.

use crate::dom::document::{Document, NodeId};
use crate::error::{FormError, FormResult};

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    AttrEquals(String, String),
    AttrExists(String),
    AttrContains(String, String),
    TextEquals(String),
    TextContains(String),
    NormalizedTextEquals(String),
    Position(usize),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    descendant: bool,
    /// `None` for `*`.
    name: Option<String>,
    predicates: Vec<Predicate>,
}

/// A parsed locator expression.
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    branches: Vec<Vec<Step>>,
}

impl XPath {
    pub fn parse(expr: &str) -> FormResult<Self> {
        let invalid = |reason: &str| FormError::InvalidLocator {
            locator: expr.to_string(),
            reason: reason.to_string(),
        };
        let mut branches = Vec::new();
        for part in split_top_level(expr, '|') {
            let part = part.trim();
            if !part.starts_with('/') {
                return Err(invalid("expression must start with '/' or '//'"));
            }
            branches.push(parse_steps(part).map_err(|r| invalid(&r))?);
        }
        if branches.is_empty() {
            return Err(invalid("empty expression"));
        }
        Ok(XPath { branches })
    }

    /// Matching elements in document order, deduplicated.
    pub fn evaluate(&self, doc: &Document) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .branches
            .iter()
            .flat_map(|steps| evaluate_steps(doc, steps))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// Parse and evaluate in one go.
pub fn select(doc: &Document, expr: &str) -> FormResult<Vec<NodeId>> {
    Ok(XPath::parse(expr)?.evaluate(doc))
}

/// Number of matches; unparseable expressions count as zero.
pub fn count(doc: &Document, expr: &str) -> usize {
    select(doc, expr).map(|m| m.len()).unwrap_or(0)
}

pub fn is_unique(doc: &Document, expr: &str) -> bool {
    count(doc, expr) == 1
}

/// The single match, if exactly one element matches.
pub fn select_unique(doc: &Document, expr: &str) -> Option<NodeId> {
    match select(doc, expr) {
        Ok(m) if m.len() == 1 => Some(m[0]),
        _ => None,
    }
}

pub fn is_absolute(expr: &str) -> bool {
    let expr = expr.trim();
    expr.starts_with('/') && !expr.starts_with("//")
}

// ============================================================================
// Evaluation
// ============================================================================

fn evaluate_steps(doc: &Document, steps: &[Step]) -> Vec<NodeId> {
    let mut context = vec![Document::ROOT];
    for step in steps {
        let mut next = Vec::new();
        for &ctx in &context {
            if step.descendant {
                // descendant-or-self::node()/child::name
                apply_child_step(doc, ctx, step, &mut next);
                for d in doc.element_descendants(ctx) {
                    apply_child_step(doc, d, step, &mut next);
                }
            } else {
                apply_child_step(doc, ctx, step, &mut next);
            }
        }
        next.sort_unstable();
        next.dedup();
        context = next;
        if context.is_empty() {
            break;
        }
    }
    context
}

fn apply_child_step(doc: &Document, parent: NodeId, step: &Step, out: &mut Vec<NodeId>) {
    let mut candidates: Vec<NodeId> = doc
        .element_children(parent)
        .filter(|c| match &step.name {
            Some(name) => doc.tag(*c) == Some(name.as_str()),
            None => true,
        })
        .collect();
    for predicate in &step.predicates {
        candidates = match predicate {
            Predicate::Position(n) => candidates.get(n.wrapping_sub(1)).copied().into_iter().collect(),
            other => candidates.into_iter().filter(|c| matches(doc, *c, other)).collect(),
        };
    }
    out.extend(candidates);
}

fn matches(doc: &Document, node: NodeId, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::AttrEquals(name, value) => doc.attr(node, name) == Some(value.as_str()),
        Predicate::AttrExists(name) => doc.has_attr(node, name),
        Predicate::AttrContains(name, value) => doc.attr(node, name).is_some_and(|v| v.contains(value.as_str())),
        Predicate::TextEquals(value) => doc.own_text(node) == *value,
        Predicate::TextContains(value) => doc.own_text(node).contains(value.as_str()),
        Predicate::NormalizedTextEquals(value) => {
            crate::text::normalize::collapse_whitespace(&doc.text_content(node)) == *value
        }
        Predicate::Position(_) => true,
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Split on `sep` outside brackets and quotes.
fn split_top_level(expr: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in expr.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' | '(' => depth += 1,
                ']' | ')' => depth -= 1,
                _ if c == sep && depth == 0 => {
                    parts.push(&expr[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&expr[start..]);
    parts
}

fn parse_steps(expr: &str) -> Result<Vec<Step>, String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    let mut steps = Vec::new();

    while i < chars.len() {
        if chars[i] != '/' {
            return Err(format!("expected '/' at offset {}", i));
        }
        i += 1;
        let descendant = chars.get(i) == Some(&'/');
        if descendant {
            i += 1;
        }

        let name_start = i;
        while i < chars.len() && (chars[i].is_alphanumeric() || "-_:*.".contains(chars[i])) {
            i += 1;
        }
        let name: String = chars[name_start..i].iter().collect();
        if name.is_empty() {
            return Err(format!("missing node test at offset {}", name_start));
        }

        let mut predicates = Vec::new();
        while chars.get(i) == Some(&'[') {
            let end = find_closing_bracket(&chars, i).ok_or("unbalanced '['")?;
            let body: String = chars[i + 1..end].iter().collect();
            predicates.push(parse_predicate(body.trim())?);
            i = end + 1;
        }

        steps.push(Step {
            descendant,
            name: if name == "*" { None } else { Some(name.to_lowercase()) },
            predicates,
        });
    }
    if steps.is_empty() {
        return Err("no steps".into());
    }
    Ok(steps)
}

fn find_closing_bracket(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    for (offset, &c) in chars[open..].iter().enumerate() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(open + offset);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

fn parse_predicate(body: &str) -> Result<Predicate, String> {
    if let Ok(n) = body.parse::<usize>() {
        return Ok(Predicate::Position(n));
    }
    if let Some(attr) = body.strip_prefix('@') {
        return match attr.split_once('=') {
            Some((name, value)) => Ok(Predicate::AttrEquals(name.trim().to_string(), unquote(value)?)),
            None => Ok(Predicate::AttrExists(attr.trim().to_string())),
        };
    }
    if let Some(args) = body.strip_prefix("contains(").and_then(|r| r.strip_suffix(')')) {
        let parts = split_top_level(args, ',');
        let [target, value] = parts.as_slice() else {
            return Err(format!("contains() expects two arguments: {}", body));
        };
        let value = unquote(value)?;
        let target = target.trim();
        return match target.strip_prefix('@') {
            Some(name) => Ok(Predicate::AttrContains(name.trim().to_string(), value)),
            None if target == "text()" || target == "." => Ok(Predicate::TextContains(value)),
            None => Err(format!("unsupported contains() target: {}", target)),
        };
    }
    if let Some((lhs, rhs)) = body.split_once('=') {
        let lhs = lhs.trim();
        let value = unquote(rhs)?;
        return match lhs {
            "text()" | "." => Ok(Predicate::TextEquals(value)),
            "normalize-space()" | "normalize-space(.)" => Ok(Predicate::NormalizedTextEquals(value)),
            _ => Err(format!("unsupported predicate: {}", body)),
        };
    }
    Err(format!("unsupported predicate: {}", body))
}

fn unquote(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    let mut chars = raw.chars();
    match (chars.next(), raw.chars().last()) {
        (Some(q @ ('\'' | '"')), Some(end)) if q == end && raw.len() >= 2 => Ok(raw[1..raw.len() - 1].to_string()),
        _ => Err(format!("expected quoted literal, got {}", raw)),
    }
}

/// Quote a literal for use inside a predicate.
pub fn quote_literal(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value)
    }
}
