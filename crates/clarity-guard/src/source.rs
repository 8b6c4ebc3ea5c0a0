//! Source normalization and form scanning.
//!
//! Every check runs over the normalized copy of a contract: comments are cut
//! off each line, but the line structure is left alone so line numbers found
//! in the normalized text are valid against the original. Column positions
//! are valid too, because a normalized line is always a prefix of the
//! original line.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DEFINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\((define-public|define-read-only|define-private)\s*(\()\s*([^\s()]+)").unwrap()
});

/// Strip `;` comments from every line without touching line boundaries.
///
/// A `;` inside a string literal is not a comment marker.
pub fn normalize(source: &str) -> String {
    source
        .split('\n')
        .map(|line| match comment_start(line) {
            Some(idx) if line.ends_with('\r') => format!("{}\r", &line[..idx]),
            Some(idx) => line[..idx].to_string(),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Byte index of the first comment marker on a line, if any.
fn comment_start(line: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            ';' => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Offset one past the `)` that closes the form opened at or after `start`.
///
/// Falls back to `text.len()` when the form never closes. String literals
/// are not special-cased.
pub fn find_balanced_span(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut depth: i64 = 0;
    let mut opened = false;
    for (i, b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'(' => {
                depth += 1;
                opened = true;
            }
            b')' => depth -= 1,
            _ => {}
        }
        if opened && depth == 0 {
            return i + 1;
        }
    }
    text.len()
}

/// 1-indexed line containing `offset`.
pub fn line_of_offset(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

/// (0-indexed line, byte column) of `offset`.
pub fn position_of_offset(text: &str, offset: usize) -> (usize, usize) {
    let end = offset.min(text.len());
    let head = &text.as_bytes()[..end];
    let line = head.iter().filter(|b| **b == b'\n').count();
    let col = match head.iter().rposition(|b| *b == b'\n') {
        Some(nl) => end - nl - 1,
        None => end,
    };
    (line, col)
}

/// Up to `width` bytes of text ending at `offset`, clipped to a char boundary.
pub fn preceding_window(text: &str, offset: usize, width: usize) -> &str {
    let end = offset.min(text.len());
    let mut start = end.saturating_sub(width);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    Public,
    ReadOnly,
    Private,
}

impl Visibility {
    fn from_keyword(kw: &str) -> Self {
        match kw {
            "define-public" => Self::Public,
            "define-read-only" => Self::ReadOnly,
            _ => Self::Private,
        }
    }
}

/// One function definition located in normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpan {
    pub name: String,
    pub visibility: Visibility,
    /// Offset of the `(` opening the definition.
    pub start_offset: usize,
    /// One past the matching `)`, or end of text when unbalanced.
    pub end_offset: usize,
    pub start_line: usize,
    /// One past the `)` closing the `(name args...)` signature form.
    pub signature_end: usize,
}

impl FunctionSpan {
    pub fn body<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start_offset..self.end_offset]
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start_offset && offset < self.end_offset
    }
}

/// Locate every `define-public` / `define-read-only` / `define-private` form.
pub fn function_spans(text: &str) -> Vec<FunctionSpan> {
    DEFINE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let signature = caps.get(2)?;
            let start = whole.start();
            Some(FunctionSpan {
                name: caps[3].to_string(),
                visibility: Visibility::from_keyword(&caps[1]),
                start_offset: start,
                end_offset: find_balanced_span(text, start),
                start_line: line_of_offset(text, start),
                signature_end: find_balanced_span(text, signature.start()),
            })
        })
        .collect()
}

/// Innermost function span containing `offset`.
pub fn enclosing_function(spans: &[FunctionSpan], offset: usize) -> Option<&FunctionSpan> {
    spans
        .iter()
        .filter(|s| s.contains(offset))
        .min_by_key(|s| s.end_offset - s.start_offset)
}
