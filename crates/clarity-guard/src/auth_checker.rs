//! Authorization Checker -- caller-identity gates on public functions
//!
//! Every `define-public` body is classified as:
//! - **sensitive**: writes a data var or map, or moves value (`stx-transfer?`,
//!   `ft-transfer?`, `contract-call?`, ...)
//! - **mentions-sender**: reads `tx-sender` / `contract-caller` but does nothing sensitive
//! - **neutral**: neither
//!
//! A body is guarded when any recognizer in the guard table accepts it. A
//! recognizer is one syntactic idiom comparing the caller against a principal
//! inside `asserts!`, `assert!`, `unwrap!`, `if` or `when`.

use crate::metrics::ContractMetrics;
use crate::patterns::{CALLER, CALLER_RE, OPERAND, STATE_WRITE_RE, VALUE_MOVE_RE};
use crate::report::{Issue, Rule, Severity};
use crate::source::{FunctionSpan, Visibility};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Assertion inserted by the fixer and offered as the suggestion.
pub const AUTH_ASSERTION: &str = "(asserts! (is-eq tx-sender (var-get owner)) (err u100))";

/// One named guard idiom.
pub struct GuardRecognizer {
    pub name: String,
    regex: Regex,
}

impl GuardRecognizer {
    fn new(name: String, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
        }
    }

    pub fn accepts(&self, body: &str) -> bool {
        self.regex.is_match(body)
    }
}

fn caller_equality(caller_first: bool) -> String {
    if caller_first {
        format!(r"\(\s*is-eq\s+{CALLER}\s+{OPERAND}\s*\)")
    } else {
        format!(r"\(\s*is-eq\s+{OPERAND}\s+{CALLER}\s*\)")
    }
}

static GUARD_RECOGNIZERS: Lazy<Vec<GuardRecognizer>> = Lazy::new(|| {
    let mut table = Vec::new();
    for (order, caller_first) in [("sender-first", true), ("sender-second", false)] {
        let eq = caller_equality(caller_first);
        for assertion in ["asserts!", "assert!", "unwrap!"] {
            table.push(GuardRecognizer::new(
                format!("{}-{}", assertion.trim_end_matches('!'), order),
                &format!(r"\({assertion}\s*{eq}\s+{OPERAND}\s*\)"),
            ));
        }
        table.push(GuardRecognizer::new(
            format!("asserts-any-{order}"),
            &format!(r"\(asserts!\s*\(\s*or\s+(?:{OPERAND}\s+)*{eq}"),
        ));
        for conditional in ["if", "when"] {
            table.push(GuardRecognizer::new(
                format!("{conditional}-{order}"),
                &format!(r"\({conditional}\s+{eq}"),
            ));
        }
    }
    table
});

/// All guard recognizers, in evaluation order.
pub fn guard_recognizers() -> &'static [GuardRecognizer] {
    &GUARD_RECOGNIZERS
}

/// First recognizer that accepts the body.
pub fn find_guard(body: &str) -> Option<&'static GuardRecognizer> {
    GUARD_RECOGNIZERS.iter().find(|g| g.accepts(body))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// `moves_value` is set for transfers, mints, burns and cross-contract calls.
    Sensitive { moves_value: bool },
    MentionsSender,
    Neutral,
}

pub fn classify(body: &str) -> Classification {
    if VALUE_MOVE_RE.is_match(body) {
        Classification::Sensitive { moves_value: true }
    } else if STATE_WRITE_RE.is_match(body) {
        Classification::Sensitive { moves_value: false }
    } else if CALLER_RE.is_match(body) {
        Classification::MentionsSender
    } else {
        Classification::Neutral
    }
}

pub struct AuthorizationChecker;

impl AuthorizationChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check_authorization(
        &self,
        normalized: &str,
        spans: &[FunctionSpan],
        metrics: &mut ContractMetrics,
    ) -> Vec<Issue> {
        let mut issues = Vec::new();

        for span in spans.iter().filter(|s| s.visibility == Visibility::Public) {
            metrics.public_functions += 1;
            let body = span.body(normalized);
            let class = classify(body);
            let guard = find_guard(body);

            if let Some(g) = guard {
                metrics.guarded_functions += 1;
                debug!(function = %span.name, guard = %g.name, "authorization gate recognized");
            }

            match (class, guard) {
                (Classification::Sensitive { moves_value }, None) => {
                    metrics.sensitive_functions += 1;
                    metrics.missing_authorization += 1;
                    issues.push(self.missing_issue(span, body, moves_value));
                }
                (Classification::Sensitive { .. }, Some(_)) => {
                    metrics.sensitive_functions += 1;
                }
                (Classification::MentionsSender, None) => {
                    metrics.weak_authorization += 1;
                    issues.push(self.weak_issue(span));
                }
                _ => {}
            }
        }

        issues
    }

    fn missing_issue(&self, span: &FunctionSpan, body: &str, moves_value: bool) -> Issue {
        let trigger = VALUE_MOVE_RE
            .captures(body)
            .or_else(|| STATE_WRITE_RE.captures(body))
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        Issue {
            id: format!("{}-{}", Rule::MissingAuthorization.tag(), span.name),
            rule: Rule::MissingAuthorization,
            severity: if moves_value { Severity::High } else { Severity::Medium },
            title: format!("Missing Authorization Check in '{}'", span.name),
            description: format!(
                "Public function '{}' performs `{}` without verifying tx-sender against an \
                 authorized principal. Any account can call it and trigger the operation.",
                span.name, trigger
            ),
            line: Some(span.start_line),
            function: Some(span.name.clone()),
            suggestion: Some(AUTH_ASSERTION.to_string()),
        }
    }

    fn weak_issue(&self, span: &FunctionSpan) -> Issue {
        Issue {
            id: format!("{}-{}", Rule::WeakAuthorization.tag(), span.name),
            rule: Rule::WeakAuthorization,
            severity: Severity::Low,
            title: format!("Caller identity used without explicit gate in '{}'", span.name),
            description: format!(
                "Public function '{}' references the caller identity but no explicit \
                 authorization guard was found.",
                span.name
            ),
            line: Some(span.start_line),
            function: Some(span.name.clone()),
            suggestion: Some(AUTH_ASSERTION.to_string()),
        }
    }
}

impl Default for AuthorizationChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::function_spans;

    fn check(src: &str) -> Vec<Issue> {
        let spans = function_spans(src);
        AuthorizationChecker::new().check_authorization(src, &spans, &mut ContractMetrics::new())
    }

    #[test]
    fn test_recognizers_cover_both_operand_orders() {
        let guarded = [
            "(asserts! (is-eq tx-sender (var-get owner)) (err u100))",
            "(asserts! (is-eq (var-get owner) tx-sender) (err u100))",
            "(asserts! (is-eq tx-sender CONTRACT-OWNER) ERR-NOT-OWNER)",
            "(assert! (is-eq contract-caller ADMIN) (err u1))",
            "(unwrap! (is-eq tx-sender ADMIN) (err u1))",
            "(if (is-eq tx-sender ADMIN) (ok true) (err u1))",
            "(when (is-eq ADMIN tx-sender) (var-set x u1))",
            "(asserts! (or (is-eq tx-sender ARBITER) (is-eq tx-sender OWNER)) (err u1))",
        ];
        for body in guarded {
            assert!(find_guard(body).is_some(), "should be guarded: {}", body);
        }
        assert!(find_guard("(asserts! (> amount u0) (err u1))").is_none());
        assert!(find_guard("(asserts! (is-eq recipient OWNER) (err u1))").is_none());
    }

    #[test]
    fn test_recognizer_names_are_unique() {
        let mut names: Vec<_> = guard_recognizers().iter().map(|g| g.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), guard_recognizers().len());
    }

    #[test]
    fn test_unguarded_transfer_is_high() {
        let issues = check(
            "(define-public (drain (amount uint))\n  (stx-transfer? amount (as-contract tx-sender) tx-sender))",
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "auth-missing-drain");
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].line, Some(1));
    }

    #[test]
    fn test_unguarded_nft_transfer_is_high() {
        let issues = check("(define-public (f (id uint))\n  (nft-transfer? badge id tx-sender 'ST1))");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "auth-missing-f");
        assert_eq!(issues[0].severity, Severity::High);
        assert!(issues[0].description.contains("`nft-transfer?`"));
    }

    #[test]
    fn test_unguarded_state_write_is_medium() {
        let issues = check("\n\n(define-public (set-fee (fee uint))\n  (ok (var-set fee-bps fee)))");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].line, Some(3));
    }

    #[test]
    fn test_guarded_sensitive_function_is_clean() {
        let issues = check(
            "(define-public (set-fee (fee uint))\n  (begin\n    (asserts! (is-eq tx-sender (var-get owner)) (err u100))\n    (ok (var-set fee-bps fee))))",
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_sender_mention_without_gate_is_low() {
        let issues = check("(define-public (whoami) (ok tx-sender))");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule, Rule::WeakAuthorization);
        assert_eq!(issues[0].severity, Severity::Low);
    }

    #[test]
    fn test_neutral_and_non_public_functions_are_ignored() {
        assert!(check("(define-public (ping) (ok true))").is_empty());
        assert!(check("(define-private (bump) (var-set n (+ (var-get n) u1)))").is_empty());
    }
}
