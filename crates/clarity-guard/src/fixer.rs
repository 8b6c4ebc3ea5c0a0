//! Fix Synthesizer -- line-scoped patches for the issues found by a fresh analysis
//!
//! The caller's issue list is only an acceptance set: positions always come
//! from re-analysing the source that is being patched. Two patch kinds exist:
//! - unchecked token call: wrap the call in `(try! ...)`
//! - missing authorization: insert the canonical assertion on its own line
//!   after the function header
//!
//! Patches are collected as pending edits keyed by (line, column) of the
//! original text and applied bottom-up, right-to-left, so no edit moves a
//! position another edit still depends on.

use crate::auth_checker::AUTH_ASSERTION;
use crate::call_checker::find_token_calls;
use crate::report::{Issue, Rule};
use crate::source::{find_balanced_span, function_spans, normalize, position_of_offset, FunctionSpan, Visibility};
use crate::ContractAnalyzer;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum EditKind {
    /// Inserted at a column. At a shared column the opener is applied first
    /// so the closer lands in front of it: `)(try! `.
    Close(&'static str),
    Open(&'static str),
    LineAfter(String),
}

#[derive(Debug, Clone)]
struct Edit {
    line: usize,
    col: usize,
    kind: EditKind,
}

impl Edit {
    fn sort_key(&self) -> (usize, usize, u8) {
        match self.kind {
            EditKind::LineAfter(_) => (self.line, usize::MAX, 2),
            EditKind::Open(_) => (self.line, self.col, 1),
            EditKind::Close(_) => (self.line, self.col, 0),
        }
    }
}

pub struct Fixer {
    analyzer: ContractAnalyzer,
}

impl Fixer {
    pub fn new() -> Self {
        Self {
            analyzer: ContractAnalyzer::new(),
        }
    }

    pub fn with_analyzer(analyzer: ContractAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Patch every freshly found issue whose id is present in `accepted`.
    pub fn synthesize(&self, source: &str, accepted: &[Issue]) -> String {
        let accepted: HashSet<&str> = accepted.iter().map(|i| i.id.as_str()).collect();
        let fresh = self.analyzer.analyze(source);

        let normalized = normalize(source);
        let spans = function_spans(&normalized);
        let calls = find_token_calls(&normalized, &spans);
        let lines: Vec<&str> = source.split('\n').collect();

        let mut edits = Vec::new();
        for issue in fresh.iter().filter(|i| accepted.contains(i.id.as_str())) {
            match issue.rule {
                Rule::UncheckedCall | Rule::BoundUncheckedCall => {
                    let call = calls
                        .iter()
                        .find(|c| c.rule() == Some(issue.rule) && c.issue_id(issue.rule) == issue.id);
                    if let Some(call) = call {
                        let (line, col) = position_of_offset(&normalized, call.start);
                        edits.push(Edit { line, col, kind: EditKind::Open("(try! ") });
                        let (line, col) = position_of_offset(&normalized, call.end);
                        edits.push(Edit { line, col, kind: EditKind::Close(")") });
                    }
                }
                Rule::MissingAuthorization => {
                    let span = spans.iter().find(|s| {
                        s.visibility == Visibility::Public && Some(&s.name) == issue.function.as_ref()
                    });
                    if let Some(edit) = span.and_then(|s| assertion_edit(&normalized, &lines, s)) {
                        edits.push(edit);
                    }
                }
                Rule::WeakAuthorization | Rule::MissingTokenTrait => {}
            }
        }

        debug!("{} of {} issues produced {} edits", accepted.len(), fresh.len(), edits.len());
        apply_edits(&lines, edits)
    }
}

impl Default for Fixer {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert the assertion after the line the signature closes on, or after a
/// `(begin` or `(let ((..))` opener directly below it so the body stays one
/// expression. Functions that close on their header line get no line-scoped
/// patch. The inserted line copies the anchor line's `\r`.
fn assertion_edit(normalized: &str, lines: &[&str], span: &FunctionSpan) -> Option<Edit> {
    let (header_line, _) = position_of_offset(normalized, span.signature_end.saturating_sub(1));
    let (end_line, _) = position_of_offset(normalized, span.end_offset.saturating_sub(1));
    if end_line <= header_line {
        debug!(function = %span.name, "single-line function, assertion not inserted");
        return None;
    }

    let norm_lines: Vec<&str> = normalized.split('\n').collect();
    let mut anchor = header_line;
    if let Some(next) = norm_lines.get(header_line + 1) {
        if opens_body_block(next) && header_line + 1 < end_line {
            anchor = header_line + 1;
        }
    }

    let header_indent = indent_of(lines.get(span.start_line - 1).copied().unwrap_or(""));
    let indent = lines
        .iter()
        .skip(anchor + 1)
        .find(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
        .filter(|i| i.len() > header_indent.len())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}  ", header_indent));

    let eol = match lines.get(anchor) {
        Some(line) if line.ends_with('\r') => "\r",
        _ => "",
    };

    Some(Edit {
        line: anchor,
        col: 0,
        kind: EditKind::LineAfter(format!("{}{}{}", indent, AUTH_ASSERTION, eol)),
    })
}

/// A line that only opens a `begin`, or a `let` whose binding list closes on
/// the same line with the body below.
fn opens_body_block(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed == "(begin" {
        return true;
    }
    let Some(rest) = trimmed.strip_prefix("(let") else {
        return false;
    };
    let bindings = rest.trim_start();
    if !bindings.starts_with('(') {
        return false;
    }
    let end = find_balanced_span(bindings, 0);
    let list = &bindings[..end];
    list.matches('(').count() == list.matches(')').count() && bindings[end..].trim().is_empty()
}

fn indent_of(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

fn apply_edits(lines: &[&str], mut edits: Vec<Edit>) -> String {
    let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    edits.sort_by_key(|e| std::cmp::Reverse(e.sort_key()));
    edits.dedup_by(|a, b| a.sort_key() == b.sort_key() && a.kind == b.kind);

    for edit in edits {
        match edit.kind {
            EditKind::LineAfter(text) => {
                let at = (edit.line + 1).min(out.len());
                out.insert(at, text);
            }
            EditKind::Open(text) | EditKind::Close(text) => {
                if let Some(line) = out.get_mut(edit.line) {
                    if line.is_char_boundary(edit.col) {
                        line.insert_str(edit.col, text);
                    }
                }
            }
        }
    }

    out.join("\n")
}

/// Fresh analysis of `source`, then patch the issues whose ids appear in `issues`.
pub fn synthesize_fix(source: &str, issues: &[Issue]) -> String {
    Fixer::new().synthesize(source, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze;

    fn fix(src: &str) -> String {
        synthesize_fix(src, &analyze(src))
    }

    #[test]
    fn test_wraps_unchecked_call() {
        let src = "(define-public (pay (to principal))\n  (begin\n    (asserts! (is-eq tx-sender OWNER) (err u1))\n    (contract-call? .usdc transfer u5 tx-sender to none) ;; pay\n    (ok true)))";
        let fixed = fix(src);
        assert!(fixed.contains("    (try! (contract-call? .usdc transfer u5 tx-sender to none)) ;; pay\n"));
        assert_eq!(fixed.split('\n').count(), src.split('\n').count());
    }

    #[test]
    fn test_inserts_assertion_inside_begin() {
        let src = "(define-public (set-owner (p principal))\n  (begin\n    (var-set owner p)\n    (ok true)))";
        let fixed = fix(src);
        let lines: Vec<&str> = fixed.split('\n').collect();
        assert_eq!(lines[1], "  (begin");
        assert_eq!(lines[2], format!("    {}", AUTH_ASSERTION));
        assert_eq!(lines[3], "    (var-set owner p)");
    }

    #[test]
    fn test_inserts_after_header_without_begin() {
        let src = "(define-public (set-owner (p principal))\n  (ok (var-set owner p)))";
        let fixed = fix(src);
        let lines: Vec<&str> = fixed.split('\n').collect();
        assert_eq!(lines[1], format!("  {}", AUTH_ASSERTION));
        assert_eq!(lines[2], "  (ok (var-set owner p)))");
    }

    #[test]
    fn test_multiline_signature_anchor() {
        let src = "(define-public (set-owner\n    (p principal))\n  (begin\n    (var-set owner p)\n    (ok true)))";
        let fixed = fix(src);
        let lines: Vec<&str> = fixed.split('\n').collect();
        assert_eq!(lines[1], "    (p principal))");
        assert_eq!(lines[2], "  (begin");
        assert_eq!(lines[3], format!("    {}", AUTH_ASSERTION));
    }

    #[test]
    fn test_inserts_assertion_inside_let() {
        let src = "(define-public (sweep (to principal))\n  (let ((amt u1))\n    (var-set swept amt)\n    (ok amt)))";
        let fixed = fix(src);
        let lines: Vec<&str> = fixed.split('\n').collect();
        assert_eq!(lines[1], "  (let ((amt u1))");
        assert_eq!(lines[2], format!("    {}", AUTH_ASSERTION));
        assert_eq!(lines[3], "    (var-set swept amt)");
        assert_eq!(fix(&fixed), fixed);
    }

    #[test]
    fn test_let_with_inline_body_is_not_an_anchor() {
        assert!(opens_body_block("  (let ((amt u1))\r"));
        assert!(opens_body_block("(begin"));
        assert!(!opens_body_block("  (let ((amt u1)) (ok amt))"));
        assert!(!opens_body_block("  (let ((amt\n"));
        assert!(!opens_body_block("  (let-bound x)"));
    }

    #[test]
    fn test_crlf_line_endings_are_kept() {
        let src = "(define-public (set-owner (p principal))\r\n  (begin\r\n    (var-set owner p)\r\n    (ok true)))\r\n";
        let fixed = fix(src);
        assert!(fixed.contains(&format!("  (begin\r\n    {}\r\n    (var-set owner p)\r\n", AUTH_ASSERTION)));
        let bare_lf = fixed.matches('\n').count() - fixed.matches("\r\n").count();
        assert_eq!(bare_lf, 0);
    }

    #[test]
    fn test_single_line_function_left_alone() {
        let src = "(define-public (set-owner (p principal)) (ok (var-set owner p)))";
        assert_eq!(fix(src), src);
    }

    #[test]
    fn test_only_accepted_issues_are_patched() {
        let src = "(define-public (pay)\n  (begin\n    (var-set paid true)\n    (ft-transfer? usdc u1 tx-sender 'ST1)\n    (ok true)))";
        let issues = analyze(src);
        let only_calls: Vec<Issue> = issues.iter().filter(|i| i.rule.is_unchecked_call()).cloned().collect();
        let fixed = synthesize_fix(src, &only_calls);
        assert!(fixed.contains("(try! (ft-transfer? usdc u1 tx-sender 'ST1))"));
        assert!(!fixed.contains("asserts!"));
        assert_eq!(synthesize_fix(src, &[]), src);
    }

    #[test]
    fn test_adjacent_calls_on_one_line() {
        let src = "(define-public (pay)\n  (begin\n    (asserts! (is-eq tx-sender OWNER) (err u1))\n    (ft-transfer? usdc u1 tx-sender 'ST1)(ft-burn? usdc u1 tx-sender)\n    (ok true)))";
        let fixed = fix(src);
        assert!(fixed.contains("(try! (ft-transfer? usdc u1 tx-sender 'ST1))(try! (ft-burn? usdc u1 tx-sender))"));
    }

    #[test]
    fn test_fix_is_idempotent() {
        let src = "(define-public (pay (to principal))\n  (begin\n    (ft-transfer? usdc u1 tx-sender to)\n    (var-set paid true)\n    (ok true)))";
        let once = fix(src);
        assert_eq!(fix(&once), once);
        assert!(analyze(&once).iter().all(|i| i.rule == Rule::MissingTokenTrait));
    }
}
