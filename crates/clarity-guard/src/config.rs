//! # Configuration File Support
//!
//! Supports `.clarity-guard.toml` files so CI runs can pin thresholds and
//! suppressions next to the contracts.
//!
//! ## Example `.clarity-guard.toml`
//!
//! ```toml
//! [scan]
//! min_severity = "medium"      # Minimum severity to report
//! format = "json"              # Output format: human, json
//! fail_on = "high"             # Exit with error code if issues at this level ("none" disables)
//!
//! [checks]
//! authorization = true
//! unchecked_calls = true
//! trait_usage = false
//!
//! [ignore]
//! ids = ["missing-sip-010"]    # Suppress specific issue ids
//! functions = ["test-*"]       # Skip functions matching these patterns
//! ```

use crate::report::{Issue, Severity};
use crate::AnalyzerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const CONFIG_FILE_NAME: &str = ".clarity-guard.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Human,
    Json,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub scan: ScanConfig,
    pub checks: ChecksConfig,
    pub ignore: IgnoreConfig,
}

/// Scan settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub min_severity: Severity,
    pub format: OutputFormat,
    /// "low", "medium", "high" or "none"
    pub fail_on: String,
}

/// Which checks to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    pub authorization: bool,
    pub unchecked_calls: bool,
    pub trait_usage: bool,
}

/// Ignore rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Issue ids to suppress
    pub ids: Vec<String>,
    /// Function name patterns to skip; a trailing `*` matches any suffix
    pub functions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_severity: Severity::Low,
            format: OutputFormat::Human,
            fail_on: "high".into(),
        }
    }
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            authorization: true,
            unchecked_calls: true,
            trait_usage: true,
        }
    }
}

impl GuardConfig {
    /// Load `.clarity-guard.toml` from `project_dir`.
    /// Falls back to defaults if the file is missing or broken.
    pub fn load(project_dir: &Path) -> Self {
        let config_path = project_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            debug!("no {} in {}, using defaults", CONFIG_FILE_NAME, project_dir.display());
            return Self::default();
        }
        match Self::from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using default configuration", e);
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            check_authorization: self.checks.authorization,
            check_unchecked_calls: self.checks.unchecked_calls,
            check_trait_usage: self.checks.trait_usage,
        }
    }

    /// Threshold for a failing exit status, `None` when disabled.
    pub fn fail_on(&self) -> Result<Option<Severity>, ConfigError> {
        match self.scan.fail_on.trim() {
            "none" => Ok(None),
            level => level
                .parse()
                .map(Some)
                .map_err(|e: crate::report::UnknownSeverity| ConfigError::InvalidValue {
                    field: "scan.fail_on",
                    message: e.to_string(),
                }),
        }
    }

    pub fn is_ignored_id(&self, id: &str) -> bool {
        self.ignore.ids.iter().any(|ignored| id == ignored)
    }

    pub fn is_ignored_function(&self, func_name: &str) -> bool {
        self.ignore.functions.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => func_name.starts_with(prefix),
            None => func_name == pattern,
        })
    }

    /// Drop issues below `min_severity` or matched by an ignore rule.
    pub fn filter_issues(&self, issues: Vec<Issue>) -> Vec<Issue> {
        issues
            .into_iter()
            .filter(|i| i.severity >= self.scan.min_severity)
            .filter(|i| !self.is_ignored_id(&i.id))
            .filter(|i| !i.function.as_deref().is_some_and(|f| self.is_ignored_function(f)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Rule;

    fn issue(id: &str, severity: Severity, function: Option<&str>) -> Issue {
        Issue {
            id: id.to_string(),
            rule: Rule::WeakAuthorization,
            severity,
            title: String::new(),
            description: String::new(),
            line: None,
            function: function.map(str::to_string),
            suggestion: None,
        }
    }

    #[test]
    fn test_default_config() {
        let cfg = GuardConfig::default();
        assert_eq!(cfg.scan.min_severity, Severity::Low);
        assert_eq!(cfg.scan.format, OutputFormat::Human);
        assert_eq!(cfg.fail_on().unwrap(), Some(Severity::High));
        assert_eq!(cfg.analyzer_config(), AnalyzerConfig::default());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [scan]
            min_severity = "medium"
            format = "json"
            fail_on = "none"

            [checks]
            trait_usage = false

            [ignore]
            ids = ["missing-sip-010"]
        "#;
        let cfg: GuardConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.scan.min_severity, Severity::Medium);
        assert_eq!(cfg.scan.format, OutputFormat::Json);
        assert_eq!(cfg.fail_on().unwrap(), None);
        assert!(cfg.checks.authorization);
        assert!(!cfg.analyzer_config().check_trait_usage);
    }

    #[test]
    fn test_bad_fail_on_is_reported() {
        let mut cfg = GuardConfig::default();
        cfg.scan.fail_on = "critical".into();
        assert!(matches!(
            cfg.fail_on(),
            Err(ConfigError::InvalidValue { field: "scan.fail_on", .. })
        ));
    }

    #[test]
    fn test_filter_issues() {
        let mut cfg = GuardConfig::default();
        cfg.scan.min_severity = Severity::Medium;
        cfg.ignore.ids = vec!["missing-sip-010".into()];
        cfg.ignore.functions = vec!["test-*".into(), "helper".into()];

        let kept = cfg.filter_issues(vec![
            issue("auth-weak-greet", Severity::Low, Some("greet")),
            issue("missing-sip-010", Severity::Medium, None),
            issue("auth-missing-test-drain", Severity::High, Some("test-drain")),
            issue("auth-missing-helper", Severity::High, Some("helper")),
            issue("auth-missing-drain", Severity::High, Some("drain")),
        ]);
        let ids: Vec<&str> = kept.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["auth-missing-drain"]);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[scan]\nmin_severity = \"high\"\n",
        )
        .unwrap();
        let cfg = GuardConfig::load(dir.path());
        assert_eq!(cfg.scan.min_severity, Severity::High);
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[scan\nmin_severity = ").unwrap();
        assert_eq!(GuardConfig::load(dir.path()), GuardConfig::default());
        assert!(matches!(
            GuardConfig::from_file(&dir.path().join(CONFIG_FILE_NAME)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let cfg = GuardConfig::load(Path::new("/nonexistent"));
        assert_eq!(cfg, GuardConfig::default());
    }
}
