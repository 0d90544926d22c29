//! Unified diff synthesis for single-span edits.
//!
//! The original text is labelled `<path>.orig` and the edited text `<path>`.
//! Only path headers, hunk headers and content lines are emitted; there are
//! no `index` or mode lines.

use crate::utils::paths;

use std::fmt::Write;
use std::path::Path;
use thiserror::Error;

const CONTEXT: usize = 3;

/// Invalid splice offsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// Offsets outside the text or reversed.
    #[error("span {start}..{end} is out of bounds for text of {len} bytes")]
    OutOfBounds {
        /// Span start.
        start: usize,
        /// Span end.
        end: usize,
        /// Text length.
        len: usize,
    },

    /// An offset that splits a UTF-8 character.
    #[error("offset {offset} is not on a character boundary")]
    CharBoundary {
        /// Offending offset.
        offset: usize,
    },
}

/// Replaces `original[start..end]` with `replacement` and diffs the result
/// against `original`.
///
/// # Errors
///
/// Returns an error if the span is out of bounds or splits a character.
pub fn synthesize(
    original: &str,
    start: usize,
    end: usize,
    replacement: &str,
    path: &Path,
) -> Result<String, DiffError> {
    if start > end || end > original.len() {
        return Err(DiffError::OutOfBounds {
            start,
            end,
            len: original.len(),
        });
    }
    for offset in [start, end] {
        if !original.is_char_boundary(offset) {
            return Err(DiffError::CharBoundary { offset });
        }
    }

    let mut modified = String::with_capacity(original.len() + replacement.len());
    modified.push_str(&original[..start]);
    modified.push_str(replacement);
    modified.push_str(&original[end..]);

    Ok(unified(original, &modified, path))
}

/// Produces a unified diff between two texts.
#[must_use]
pub fn unified(old: &str, new: &str, path: &Path) -> String {
    let label = paths::to_slash(path);
    let mut out = format!("--- {label}.orig\n+++ {label}\n");

    let a: Vec<&str> = old.split_inclusive('\n').collect();
    let b: Vec<&str> = new.split_inclusive('\n').collect();
    let ops = line_ops(&a, &b);

    for hunk in hunks(&ops) {
        write_hunk(&mut out, &ops[hunk], &a, &b);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Equal,
    Delete,
    Insert,
}

/// One line operation; `old`/`new` are the line indices before it applies.
#[derive(Debug, Clone, Copy)]
struct Op {
    kind: Kind,
    old: usize,
    new: usize,
}

fn line_ops(a: &[&str], b: &[&str]) -> Vec<Op> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (ma, mb) = (&a[prefix..a.len() - suffix], &b[prefix..b.len() - suffix]);

    // lcs[i][j] = length of the common subsequence of ma[i..] and mb[j..]
    let mut lcs = vec![vec![0u32; mb.len() + 1]; ma.len() + 1];
    for i in (0..ma.len()).rev() {
        for j in (0..mb.len()).rev() {
            lcs[i][j] = if ma[i] == mb[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops: Vec<Op> = (0..prefix)
        .map(|k| Op {
            kind: Kind::Equal,
            old: k,
            new: k,
        })
        .collect();
    let (mut i, mut j) = (0, 0);
    while i < ma.len() || j < mb.len() {
        let (old, new) = (prefix + i, prefix + j);
        if i < ma.len() && j < mb.len() && ma[i] == mb[j] {
            ops.push(Op { kind: Kind::Equal, old, new });
            i += 1;
            j += 1;
        } else if j == mb.len() || (i < ma.len() && lcs[i + 1][j] >= lcs[i][j + 1]) {
            ops.push(Op { kind: Kind::Delete, old, new });
            i += 1;
        } else {
            ops.push(Op { kind: Kind::Insert, old, new });
            j += 1;
        }
    }
    let (old_tail, new_tail) = (prefix + ma.len(), prefix + mb.len());
    ops.extend((0..suffix).map(|k| Op {
        kind: Kind::Equal,
        old: old_tail + k,
        new: new_tail + k,
    }));
    ops
}

/// Groups changes into hunks with surrounding context, merging close ones.
fn hunks(ops: &[Op]) -> Vec<std::ops::Range<usize>> {
    let changes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| op.kind != Kind::Equal)
        .map(|(i, _)| i)
        .collect();

    let mut out: Vec<std::ops::Range<usize>> = Vec::new();
    for idx in changes {
        let start = idx.saturating_sub(CONTEXT);
        let end = (idx + CONTEXT + 1).min(ops.len());
        match out.last_mut() {
            Some(last) if start <= last.end => last.end = end,
            _ => out.push(start..end),
        }
    }
    out
}

fn write_hunk(out: &mut String, ops: &[Op], a: &[&str], b: &[&str]) {
    let Some(first) = ops.first() else {
        return;
    };
    let old_len = ops.iter().filter(|op| op.kind != Kind::Insert).count();
    let new_len = ops.iter().filter(|op| op.kind != Kind::Delete).count();
    let _ = writeln!(
        out,
        "@@ -{} +{} @@",
        hunk_range(first.old, old_len),
        hunk_range(first.new, new_len)
    );
    for op in ops {
        let (prefix, line) = match op.kind {
            Kind::Equal => (' ', a[op.old]),
            Kind::Delete => ('-', a[op.old]),
            Kind::Insert => ('+', b[op.new]),
        };
        out.push(prefix);
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push_str("\n\\ No newline at end of file\n");
        }
    }
}

fn hunk_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{len}", start + 1),
    }
}
