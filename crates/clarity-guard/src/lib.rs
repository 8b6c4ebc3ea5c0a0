//! # Clarity Guard
//!
//! Static analysis and auto-remediation for Clarity contracts that move
//! USDCx (SIP-010) tokens, plus a template generator for a safe escrow.
//!
//! The analyzer is pattern-driven: contract text is normalized (comments
//! stripped, lines kept), public functions are located by balanced-paren
//! scanning, and each check runs a small battery of regexes over the bodies.
//!
//! ```rust,ignore
//! let issues = clarity_guard::analyze(&source);
//! let fixed = clarity_guard::synthesize_fix(&source, &issues);
//! for row in clarity_guard::collapse_unchanged(&clarity_guard::align(&source, &fixed), 2) {
//!     println!("{:?}", row);
//! }
//! ```

pub mod auth_checker;
pub mod call_checker;
pub mod config;
pub mod diff;
pub mod fixer;
pub mod generator;
pub mod metrics;
pub mod patterns;
pub mod report;
pub mod source;
pub mod trait_checker;

pub use config::{ConfigError, GuardConfig, OutputFormat};
pub use diff::{align, change_count, collapse_unchanged, DiffKind, DiffRow, DEFAULT_CONTEXT_RADIUS};
pub use fixer::{synthesize_fix, Fixer};
pub use generator::{generate_escrow, looks_like_contract, EscrowConfig, GeneratorError, RawEscrowConfig};
pub use metrics::ContractMetrics;
pub use report::{AnalysisReport, Issue, Rule, Severity, ENGINE_VERSION};
pub use source::{find_balanced_span, function_spans, normalize, FunctionSpan};

use auth_checker::AuthorizationChecker;
use call_checker::UncheckedCallDetector;
use trait_checker::TraitUsageChecker;
use tracing::{debug, info};

/// Which checks to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// caller-identity gates on public functions
    pub check_authorization: bool,
    /// dropped responses from token-moving calls
    pub check_unchecked_calls: bool,
    /// SIP-010 trait import
    pub check_trait_usage: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            check_authorization: true,
            check_unchecked_calls: true,
            check_trait_usage: true,
        }
    }
}

/// Runs the enabled checks over one contract at a time. Holds no state
/// between calls.
pub struct ContractAnalyzer {
    config: AnalyzerConfig,
    auth_checker: AuthorizationChecker,
    call_detector: UncheckedCallDetector,
    trait_checker: TraitUsageChecker,
}

impl ContractAnalyzer {
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::default())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self {
            config,
            auth_checker: AuthorizationChecker::new(),
            call_detector: UncheckedCallDetector::new(),
            trait_checker: TraitUsageChecker::new(),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Issues in rule-evaluation order: authorization (per function), then
    /// unchecked calls (in text order), then the trait import.
    pub fn analyze(&self, source: &str) -> Vec<Issue> {
        self.run(source).0
    }

    /// Issues plus metrics, severity tallies and a safety score.
    pub fn analyze_report(&self, source: &str) -> AnalysisReport {
        let (issues, metrics) = self.run(source);

        let high_count = issues.iter().filter(|i| i.severity == Severity::High).count();
        let medium_count = issues.iter().filter(|i| i.severity == Severity::Medium).count();
        let low_count = issues.iter().filter(|i| i.severity == Severity::Low).count();
        let safety_score = self.calculate_safety_score(&metrics, &issues);

        info!(
            "Analysis complete: {} issues ({} high, {} medium, {} low). Safety score: {}/100",
            issues.len(),
            high_count,
            medium_count,
            low_count,
            safety_score
        );

        AnalysisReport {
            issues,
            metrics,
            lines_scanned: source.split('\n').count(),
            high_count,
            medium_count,
            low_count,
            safety_score,
            timestamp: chrono::Utc::now().to_rfc3339(),
            engine_version: ENGINE_VERSION.to_string(),
        }
    }

    fn run(&self, source: &str) -> (Vec<Issue>, ContractMetrics) {
        let normalized = normalize(source);
        let spans = function_spans(&normalized);
        let mut metrics = ContractMetrics::new();
        let mut issues = Vec::new();

        debug!("{} function definitions located", spans.len());

        if self.config.check_authorization {
            issues.extend(
                self.auth_checker
                    .check_authorization(&normalized, &spans, &mut metrics),
            );
        }

        if self.config.check_unchecked_calls {
            issues.extend(
                self.call_detector
                    .detect_unchecked_calls(&normalized, &spans, &mut metrics),
            );
        }

        if self.config.check_trait_usage {
            issues.extend(self.trait_checker.check_trait_usage(&normalized, &mut metrics));
        }

        (issues, metrics)
    }

    /// 100 minus per-issue penalties, with a small credit for guarded
    /// sensitive functions.
    fn calculate_safety_score(&self, metrics: &ContractMetrics, issues: &[Issue]) -> u8 {
        let mut score = 100.0;

        for issue in issues {
            score -= issue.severity.penalty();
        }
        score -= (metrics.escalated_calls as f64) * 5.0;
        score += (metrics.guarded_functions.min(metrics.sensitive_functions) as f64) * 2.0;

        f64::clamp(score, 0.0, 100.0) as u8
    }
}

impl Default for ContractAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Analyze with every check enabled.
pub fn analyze(source: &str) -> Vec<Issue> {
    ContractAnalyzer::new().analyze(source)
}
