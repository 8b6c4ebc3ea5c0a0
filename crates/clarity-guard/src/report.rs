//! Issue and report types shared by every check.

use crate::metrics::ContractMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ENGINE_VERSION: &str = concat!("clarity-guard-", env!("CARGO_PKG_VERSION"));

/// Severity of an issue. Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Points deducted from the safety score per issue.
    pub fn penalty(&self) -> f64 {
        match self {
            Self::High => 25.0,
            Self::Medium => 10.0,
            Self::Low => 3.0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity '{0}' (expected low, medium or high)")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}

/// Which detector path produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    /// Sensitive public function without a caller-identity gate.
    MissingAuthorization,
    /// Public function reads the caller identity but never gates on it.
    WeakAuthorization,
    /// Token-moving call whose response is dropped.
    UncheckedCall,
    /// Token-moving call bound by `let` and never unwrapped afterwards.
    BoundUncheckedCall,
    /// No `sip-010-trait` import.
    MissingTokenTrait,
}

impl Rule {
    /// Prefix used for issue ids.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::MissingAuthorization => "auth-missing",
            Self::WeakAuthorization => "auth-weak",
            Self::UncheckedCall => "deep-unchecked-call",
            Self::BoundUncheckedCall => "deep-unchecked-bound",
            Self::MissingTokenTrait => "missing-sip-010",
        }
    }

    pub fn is_unchecked_call(&self) -> bool {
        matches!(self, Self::UncheckedCall | Self::BoundUncheckedCall)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single issue raised against a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Stable, content-derived identifier. Re-analysing unchanged source
    /// yields the same id.
    pub id: String,
    pub rule: Rule,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    /// 1-indexed line in the analysed source. `None` for contract-wide issues.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Enclosing function name, when the issue is function-local.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Replacement or insertion text that resolves the issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Full result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub issues: Vec<Issue>,
    pub metrics: ContractMetrics,
    pub lines_scanned: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    /// 0-100, higher is safer.
    pub safety_score: u8,
    pub timestamp: String,
    pub engine_version: String,
}

impl AnalysisReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// True if any issue is at or above `threshold`.
    pub fn has_at_least(&self, threshold: Severity) -> bool {
        self.issues.iter().any(|i| i.severity >= threshold)
    }
}
