//! YAML helpers: document splitting, path lookup and text location.
//!
//! `serde_yaml` does not expose source positions, so nodes are located in
//! the raw text by walking block-style lines with their indentation. Nodes
//! that live inside flow-style collections have no location.

use crate::context::YamlDocument;
use serde_yaml::Value;
use std::ops::Range;

/// Splits a multi-document YAML text into document byte ranges.
///
/// Separator lines (`---`) are excluded. Segments holding only blank lines
/// or comments are skipped.
#[must_use]
pub fn document_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed.starts_with("--- ") {
            ranges.push(start..offset);
            start = offset + line.len();
        }
        offset += line.len();
    }
    ranges.push(start..text.len());
    ranges
        .into_iter()
        .filter(|r| has_content(&text[r.clone()]))
        .collect()
}

fn has_content(segment: &str) -> bool {
    segment.lines().any(|l| {
        let l = l.trim();
        !l.is_empty() && !l.starts_with('#') && l != "..."
    })
}

/// Parses every document of a YAML text.
///
/// # Errors
///
/// Returns the first parse error.
pub fn parse_documents(text: &str) -> Result<Vec<YamlDocument>, serde_yaml::Error> {
    document_ranges(text)
        .into_iter()
        .map(|range| {
            let value: Value = serde_yaml::from_str(&text[range.clone()])?;
            Ok(YamlDocument { value, range })
        })
        .collect()
}

/// One concrete step from a node to a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
}

/// Returns every node reached by `path`; `*` fans out over mappings and sequences.
#[must_use]
pub fn lookup<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Vec<&'a Value> {
    lookup_paths(root, path)
        .into_iter()
        .map(|(_, node)| node)
        .collect()
}

/// Like [`lookup`], pairing each node with the concrete steps that reach it.
#[must_use]
pub fn lookup_paths<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Vec<(Vec<Step>, &'a Value)> {
    let mut nodes = vec![(Vec::new(), root)];
    for seg in path {
        let mut next = Vec::new();
        for (steps, node) in nodes {
            match (seg.as_ref(), node) {
                ("*", Value::Mapping(m)) => next.extend(m.iter().map(|(k, v)| {
                    let key = scalar_string(k).unwrap_or_default();
                    (extend(&steps, Step::Key(key)), v)
                })),
                ("*", Value::Sequence(seq)) => next.extend(
                    seq.iter()
                        .enumerate()
                        .map(|(i, v)| (extend(&steps, Step::Index(i)), v)),
                ),
                (key, Value::Mapping(m)) => {
                    if let Some(v) = m.get(key) {
                        next.push((extend(&steps, Step::Key(key.to_string())), v));
                    }
                }
                _ => {}
            }
        }
        nodes = next;
        if nodes.is_empty() {
            break;
        }
    }
    nodes
}

fn extend(steps: &[Step], step: Step) -> Vec<Step> {
    let mut steps = steps.to_vec();
    steps.push(step);
    steps
}

/// Renders a scalar node as text; `None` for mappings, sequences and null.
#[must_use]
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(t) => scalar_string(&t.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Locates the node reached by `steps` within the document at `range`.
///
/// A final [`Step::Key`] yields the key token; a final [`Step::Index`]
/// yields the item's content after its `-`. Returns `None` when a step
/// cannot be followed through block-style lines.
#[must_use]
pub fn locate_path(text: &str, range: Range<usize>, steps: &[Step]) -> Option<Range<usize>> {
    let mut scope = content_lines(text, range);
    let mut found = None;
    for step in steps {
        let level = scope.first()?.indent;
        let (i, line) = match step {
            Step::Key(key) => scope
                .iter()
                .enumerate()
                .filter(|(_, l)| l.indent == level)
                .find(|(_, l)| key_offset(l.body, key).is_some())?,
            Step::Index(n) => scope
                .iter()
                .enumerate()
                .filter(|(_, l)| l.indent == level && is_item(l.body))
                .nth(*n)?,
        };
        let line = *line;

        match step {
            Step::Key(key) => {
                let start = line.start + key_offset(line.body, key)?;
                found = Some(start..start + key.len());
                scope = block_after(&scope, i, line.indent, true);
            }
            Step::Index(_) => {
                let rest = &line.body[1..];
                let inner = rest.trim_start_matches(' ');
                let pad = 1 + rest.len() - inner.len();
                let item = Line {
                    start: line.start + pad,
                    indent: line.indent + pad,
                    body: inner,
                };
                found = Some(item.start..item.start + strip_comment(inner).len());
                let mut child = Vec::new();
                if !inner.is_empty() && !inner.starts_with('#') {
                    child.push(item);
                }
                child.extend(block_after(&scope, i, line.indent, false));
                scope = child;
            }
        }
    }
    found
}

/// A non-blank, non-comment line with its indentation stripped.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    /// Byte offset of `body` in the full text.
    start: usize,
    indent: usize,
    body: &'a str,
}

fn content_lines(text: &str, range: Range<usize>) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = range.start;
    for raw in text[range].split_inclusive('\n') {
        let line_start = offset;
        offset += raw.len();

        let raw = raw.trim_end_matches(['\n', '\r']);
        let body = raw.trim_start_matches(' ');
        if body.trim().is_empty() || body.starts_with('#') {
            continue;
        }
        let indent = raw.len() - body.len();
        lines.push(Line {
            start: line_start + indent,
            indent,
            body: body.trim_end(),
        });
    }
    lines
}

/// Lines nested under `scope[i]`; `same_indent_items` admits a sequence
/// written at its parent key's indentation.
fn block_after<'a>(scope: &[Line<'a>], i: usize, indent: usize, same_indent_items: bool) -> Vec<Line<'a>> {
    scope[i + 1..]
        .iter()
        .take_while(|l| l.indent > indent || (same_indent_items && l.indent == indent && is_item(l.body)))
        .copied()
        .collect()
}

fn is_item(body: &str) -> bool {
    body == "-" || body.starts_with("- ")
}

/// Offset of `key` in a `key:` line body: 1 when the key is quoted.
fn key_offset(body: &str, key: &str) -> Option<usize> {
    let (quote, unquoted) = match body.strip_prefix(['"', '\'']) {
        Some(rest) => (body.chars().next(), rest),
        None => (None, body),
    };
    let mut rest = unquoted.strip_prefix(key)?;
    if let Some(q) = quote {
        rest = rest.strip_prefix(q)?;
    }
    let after = rest.trim_start_matches([' ', '\t']).strip_prefix(':')?;
    (after.is_empty() || after.starts_with([' ', '\t'])).then_some(usize::from(quote.is_some()))
}

fn strip_comment(value: &str) -> &str {
    value.find(" #").map_or(value, |i| &value[..i]).trim_end()
}

/// Locates the scalar value written after the key ending at `key_end`.
///
/// Surrounding quotes and trailing comments are excluded from the span.
#[must_use]
pub fn locate_value(text: &str, key_end: usize, limit: usize) -> Option<Range<usize>> {
    let after = &text[key_end..limit];
    let colon = after.find(':')?;
    let line_end = after[colon..].find('\n').map_or(after.len(), |i| colon + i);
    let raw = &after[colon + 1..line_end];

    let lead = raw.len() - raw.trim_start().len();
    let value = strip_comment(raw.trim_start());
    if value.is_empty() {
        return None;
    }
    let mut start = key_end + colon + 1 + lead;
    let mut end = start + value.len();
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && matches!(bytes[0], b'"' | b'\'') && bytes[bytes.len() - 1] == bytes[0] {
        start += 1;
        end -= 1;
    }
    Some(start..end)
}
