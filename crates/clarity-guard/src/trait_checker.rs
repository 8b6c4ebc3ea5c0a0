//! Contract-wide check for the SIP-010 trait import used by USDCx.

use crate::metrics::ContractMetrics;
use crate::patterns::TOKEN_TRAIT_RE;
use crate::report::{Issue, Rule, Severity};

pub const TRAIT_IMPORT: &str = "(use-trait sip-010-trait .sip-010-trait.sip-010-trait)";

pub struct TraitUsageChecker;

impl TraitUsageChecker {
    pub fn new() -> Self {
        Self
    }

    /// At most one issue, never tied to a line.
    pub fn check_trait_usage(&self, normalized: &str, metrics: &mut ContractMetrics) -> Option<Issue> {
        metrics.has_token_trait = TOKEN_TRAIT_RE.is_match(normalized);
        if metrics.has_token_trait {
            return None;
        }

        Some(Issue {
            id: Rule::MissingTokenTrait.tag().to_string(),
            rule: Rule::MissingTokenTrait,
            severity: Severity::Medium,
            title: "Missing USDCx Trait".to_string(),
            description: "The contract does not import the SIP-010 trait for USDCx. Ensure the \
                          correct trait definition is used for token parameters."
                .to_string(),
            line: None,
            function: None,
            suggestion: Some(TRAIT_IMPORT.to_string()),
        })
    }
}

impl Default for TraitUsageChecker {
    fn default() -> Self {
        Self::new()
    }
}
