//! Unchecked Call Detector -- dropped responses from token-moving calls
//!
//! Finds `(contract-call? <target> transfer|mint|burn ...)` and the native
//! `ft-*?` / `stx-*?` token operations, then looks at a fixed window of text
//! in front of each call:
//! - `try!`, `unwrap!`, `unwrap-panic`, `unwrap-err!`, `unwrap-err-panic`, `match`:
//!   the response is consumed, nothing to report
//! - a `let` binding: accepted only if the bound name is unwrapped or matched
//!   later in the same function
//! - anything else: the response is dropped
//!
//! A dropped response is Medium, or High when the same function writes state
//! after the call.

use crate::metrics::ContractMetrics;
use crate::patterns::{RESULT_HANDLERS, STATE_WRITE_RE, TOKEN_CALL_RE};
use crate::report::{Issue, Rule, Severity};
use crate::source::{enclosing_function, find_balanced_span, line_of_offset, preceding_window, FunctionSpan};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Bytes of preceding text inspected for a wrapping form.
pub const WRAP_WINDOW: usize = 50;

static WRAPPED_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?:^|[\s(]){RESULT_HANDLERS}$")).unwrap());

static LET_BINDING_TAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\(\s*let\s*\(\s*(?:\((?:[^()]|\([^()]*\))*\)\s*)*\(\s*(?P<name>[A-Za-z][A-Za-z0-9_!?-]*)$",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    /// Directly consumed by a result handler.
    Wrapped,
    /// Bound by `let` and consumed later.
    BoundChecked(String),
    /// Bound by `let` and never consumed.
    BoundUnchecked(String),
    /// Response dropped.
    Unchecked,
}

/// One token-moving call located in normalized text.
#[derive(Debug, Clone)]
pub struct TokenCall {
    /// Offset of the call's `(`.
    pub start: usize,
    /// One past the call's closing `)`.
    pub end: usize,
    /// `transfer`/`mint`/`burn` for cross-contract calls, else the native form name.
    pub operation: String,
    pub line: usize,
    pub status: CallStatus,
    /// Unchecked and followed by a state write in the same function.
    pub escalated: bool,
    pub function: Option<String>,
}

impl TokenCall {
    pub fn rule(&self) -> Option<Rule> {
        match self.status {
            CallStatus::Unchecked => Some(Rule::UncheckedCall),
            CallStatus::BoundUnchecked(_) => Some(Rule::BoundUncheckedCall),
            _ => None,
        }
    }

    /// Content-derived id, stable across runs on the same source.
    pub fn issue_id(&self, rule: Rule) -> String {
        let mut h = Sha256::new();
        h.update(rule.tag().as_bytes());
        h.update(self.line.to_string().as_bytes());
        h.update(self.start.to_string().as_bytes());
        let fp = hex::encode(h.finalize());
        format!("{}-{}", rule.tag(), &fp[..8])
    }
}

/// Locate and classify every token-moving call.
pub fn find_token_calls(normalized: &str, spans: &[FunctionSpan]) -> Vec<TokenCall> {
    TOKEN_CALL_RE
        .captures_iter(normalized)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let operation = caps
                .name("op")
                .map(|m| m.as_str().to_string())
                .or_else(|| caps.name("native").map(|m| format!("{}?", m.as_str())))?;
            let end = find_balanced_span(normalized, start);
            let enclosing = enclosing_function(spans, start);
            let scope_end = enclosing.map_or(normalized.len(), |f| f.end_offset);

            let tail = preceding_window(normalized, start, WRAP_WINDOW).trim_end();
            let status = if WRAPPED_TAIL_RE.is_match(tail) {
                CallStatus::Wrapped
            } else if let Some(binding) = LET_BINDING_TAIL_RE.captures(tail) {
                let name = binding["name"].to_string();
                if is_consumed(&normalized[end.min(scope_end)..scope_end], &name) {
                    CallStatus::BoundChecked(name)
                } else {
                    CallStatus::BoundUnchecked(name)
                }
            } else {
                CallStatus::Unchecked
            };

            let escalated = match (&status, enclosing) {
                (CallStatus::Unchecked | CallStatus::BoundUnchecked(_), Some(f)) => {
                    STATE_WRITE_RE.is_match(&normalized[end.min(f.end_offset)..f.end_offset])
                }
                _ => false,
            };

            Some(TokenCall {
                start,
                end,
                operation,
                line: line_of_offset(normalized, start),
                status,
                escalated,
                function: enclosing.map(|f| f.name.clone()),
            })
        })
        .collect()
}

/// True if `name` is fed to a result handler or `is-ok`/`is-err` in `scope`.
fn is_consumed(scope: &str, name: &str) -> bool {
    let pattern = format!(
        r"\((?:try!|unwrap!|unwrap-panic|unwrap-err!|unwrap-err-panic|match|is-ok|is-err)\s+{}[\s)]",
        regex::escape(name)
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(scope))
        .unwrap_or(false)
}

pub struct UncheckedCallDetector;

impl UncheckedCallDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect_unchecked_calls(
        &self,
        normalized: &str,
        spans: &[FunctionSpan],
        metrics: &mut ContractMetrics,
    ) -> Vec<Issue> {
        let calls = find_token_calls(normalized, spans);
        metrics.token_calls += calls.len();

        let mut issues = Vec::new();
        for call in &calls {
            let Some(rule) = call.rule() else {
                continue;
            };
            match rule {
                Rule::BoundUncheckedCall => metrics.bound_unchecked_calls += 1,
                _ => metrics.unchecked_calls += 1,
            }
            if call.escalated {
                metrics.escalated_calls += 1;
            }
            debug!(
                line = call.line,
                operation = %call.operation,
                escalated = call.escalated,
                "unchecked token call"
            );
            issues.push(self.build_issue(normalized, call, rule));
        }
        issues
    }

    fn build_issue(&self, normalized: &str, call: &TokenCall, rule: Rule) -> Issue {
        let call_text = &normalized[call.start..call.end];
        let mut description = match &call.status {
            CallStatus::BoundUnchecked(name) => format!(
                "The response of a '{}' call is bound to `{}` but never unwrapped or matched. \
                 If the call fails the error is silently carried along and the transaction \
                 does not revert. Use (try! ...) or (unwrap! ...) on the call or the binding.",
                call.operation, name
            ),
            _ => format!(
                "A '{}' call was detected that does not check its return value. If the call \
                 fails and is not unwrapped, the transaction may not revert as expected. \
                 Use (try! ...) or (unwrap! ...).",
                call.operation
            ),
        };
        if call.escalated {
            description.push_str(
                " State is written after the call, so a failed transfer leaves the contract \
                 updated as if it had succeeded.",
            );
        }

        Issue {
            id: call.issue_id(rule),
            rule,
            severity: if call.escalated { Severity::High } else { Severity::Medium },
            title: "Unchecked Transfer Result".to_string(),
            description,
            line: Some(call.line),
            function: call.function.clone(),
            suggestion: Some(format!("(try! {})", call_text)),
        }
    }
}

impl Default for UncheckedCallDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::function_spans;

    fn calls(src: &str) -> Vec<TokenCall> {
        find_token_calls(src, &function_spans(src))
    }

    #[test]
    fn test_wrapping_forms() {
        for wrapper in ["try!", "unwrap-panic", "unwrap-err-panic"] {
            let src = format!("(define-public (f) (begin ({} (ft-transfer? usdc u1 tx-sender 'ST1)) (ok true)))", wrapper);
            assert_eq!(calls(&src)[0].status, CallStatus::Wrapped, "{}", wrapper);
        }
        let src = "(define-public (f) (ok (unwrap! (contract-call? .usdc transfer u1 tx-sender 'ST1 none) (err u1))))";
        assert_eq!(calls(src)[0].status, CallStatus::Wrapped);
        let src = "(define-public (f) (match (ft-burn? usdc u1 tx-sender) ok-v (ok ok-v) err-v (err err-v)))";
        assert_eq!(calls(src)[0].status, CallStatus::Wrapped);
    }

    #[test]
    fn test_direct_call_is_unchecked() {
        let src = "(define-public (f)\n  (begin\n    (contract-call? .usdc transfer u5 tx-sender 'ST1 none)\n    (ok true)))";
        let found = calls(src);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].status, CallStatus::Unchecked);
        assert_eq!(found[0].operation, "transfer");
        assert_eq!(found[0].line, 3);
        assert!(!found[0].escalated);
        assert_eq!(found[0].function.as_deref(), Some("f"));
    }

    #[test]
    fn test_bound_then_unwrapped_is_accepted() {
        let src = "(define-public (f)\n  (let ((res (ft-transfer? usdc u1 tx-sender 'ST1)))\n    (try! res)\n    (ok true)))";
        assert_eq!(calls(src)[0].status, CallStatus::BoundChecked("res".into()));
    }

    #[test]
    fn test_second_binding_is_recognized() {
        let src = "(define-public (f)\n  (let ((fee u1) (res (ft-transfer? usdc u1 tx-sender 'ST1)))\n    (ok res)))";
        assert_eq!(calls(src)[0].status, CallStatus::BoundUnchecked("res".into()));
    }

    #[test]
    fn test_escalation_requires_following_state_write() {
        let before = "(define-public (f)\n  (begin\n    (var-set paid true)\n    (ft-transfer? usdc u1 tx-sender 'ST1)\n    (ok true)))";
        assert!(!calls(before)[0].escalated);
        let after = "(define-public (f)\n  (begin\n    (ft-transfer? usdc u1 tx-sender 'ST1)\n    (map-set paid tx-sender true)\n    (ok true)))";
        assert!(calls(after)[0].escalated);
    }

    #[test]
    fn test_escalation_stays_inside_function() {
        let src = "(define-public (f)\n  (begin (ft-transfer? usdc u1 tx-sender 'ST1) (ok true)))\n(define-public (g) (begin (var-set x u1) (ok true)))";
        assert!(!calls(src)[0].escalated);
    }

    #[test]
    fn test_issue_ids_are_stable_and_distinct() {
        let src = "(define-public (f)\n  (begin\n    (ft-transfer? usdc u1 tx-sender 'ST1)\n    (ft-transfer? usdc u2 tx-sender 'ST1)\n    (ok true)))";
        let detector = UncheckedCallDetector::new();
        let spans = function_spans(src);
        let a = detector.detect_unchecked_calls(src, &spans, &mut ContractMetrics::new());
        let b = detector.detect_unchecked_calls(src, &spans, &mut ContractMetrics::new());
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_ne!(a[0].id, a[1].id);
        assert!(a[0].id.starts_with("deep-unchecked-call-"));
        assert_eq!(a[0].suggestion.as_deref(), Some("(try! (ft-transfer? usdc u1 tx-sender 'ST1))"));
    }
}
