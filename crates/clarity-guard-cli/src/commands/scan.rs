//! `scan` command: analyze one contract or a directory of contracts.

use super::helpers::{collect_contracts, compute_grade, load_config, print_issue, read_contract};
use anyhow::{bail, Result};
use clarity_guard::{AnalysisReport, ContractAnalyzer, GuardConfig, OutputFormat, Severity};
use colored::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

/// Apply severity and ignore filters, keeping the tallies in step.
pub fn filter_report(mut report: AnalysisReport, config: &GuardConfig) -> AnalysisReport {
    report.issues = config.filter_issues(report.issues);
    report.high_count = report.issues.iter().filter(|i| i.severity == Severity::High).count();
    report.medium_count = report.issues.iter().filter(|i| i.severity == Severity::Medium).count();
    report.low_count = report.issues.iter().filter(|i| i.severity == Severity::Low).count();
    report
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    match value {
        "human" => Ok(OutputFormat::Human),
        "json" => Ok(OutputFormat::Json),
        other => bail!("unknown format '{}' (expected human or json)", other),
    }
}

pub fn cmd_scan(
    path: &Path,
    format: Option<&str>,
    min_severity: Option<Severity>,
    fail_on: Option<&str>,
    config_path: Option<&Path>,
) -> Result<ExitCode> {
    let failing = run_scan(path, format, min_severity, fail_on, config_path)?;
    Ok(if failing { ExitCode::from(1) } else { ExitCode::SUCCESS })
}

/// Print results and report whether the `fail_on` threshold was reached.
fn run_scan(
    path: &Path,
    format: Option<&str>,
    min_severity: Option<Severity>,
    fail_on: Option<&str>,
    config_path: Option<&Path>,
) -> Result<bool> {
    let mut config = load_config(config_path, path)?;
    if let Some(format) = format {
        config.scan.format = parse_format(format)?;
    }
    if let Some(min) = min_severity {
        config.scan.min_severity = min;
    }
    if let Some(level) = fail_on {
        config.scan.fail_on = level.to_string();
    }
    let threshold = config.fail_on()?;

    let files = collect_contracts(path)?;
    info!("scanning {} contract(s) under {}", files.len(), path.display());

    let analyzer = ContractAnalyzer::with_config(config.analyzer_config());
    let mut results: Vec<(PathBuf, AnalysisReport)> = Vec::with_capacity(files.len());
    for file in files {
        let source = read_contract(&file)?;
        let report = filter_report(analyzer.analyze_report(&source), &config);
        results.push((file, report));
    }

    match config.scan.format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = results
                .iter()
                .map(|(file, report)| serde_json::json!({ "file": file, "report": report }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => print_human(&results),
    }

    Ok(threshold.map_or(false, |level| {
        results.iter().any(|(_, report)| report.has_at_least(level))
    }))
}

fn print_human(results: &[(PathBuf, AnalysisReport)]) {
    if results.is_empty() {
        println!("\n  {} No .clar files found", "!".yellow());
        return;
    }

    for (file, report) in results {
        println!(
            "\n  {}  score {}/100 ({})  {} lines",
            file.display().to_string().bold(),
            report.safety_score,
            compute_grade(report.safety_score),
            report.lines_scanned
        );
        if report.issues.is_empty() {
            println!("  {} no issues", "✓".green().bold());
            continue;
        }
        println!(
            "  {} high · {} medium · {} low",
            report.high_count.to_string().red().bold(),
            report.medium_count.to_string().yellow().bold(),
            report.low_count.to_string().blue()
        );
        for (i, issue) in report.issues.iter().enumerate() {
            print_issue(i + 1, issue);
        }
    }

    let total: usize = results.iter().map(|(_, r)| r.issues.len()).sum();
    println!("\n  {} issue(s) across {} contract(s)\n", total, results.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNGUARDED: &str = "(define-public (drain (amount uint))\n  (begin\n    (ft-transfer? usdc amount (as-contract tx-sender) tx-sender)\n    (ok true)))\n";

    #[test]
    fn test_filter_report_recounts() {
        let report = ContractAnalyzer::new().analyze_report(UNGUARDED);
        assert!(report.medium_count > 0);
        let mut config = GuardConfig::default();
        config.scan.min_severity = Severity::High;
        let filtered = filter_report(report, &config);
        assert_eq!(filtered.medium_count, 0);
        assert_eq!(filtered.high_count, filtered.issues.len());
    }

    #[test]
    fn test_fail_on_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("drain.clar");
        std::fs::write(&file, UNGUARDED).unwrap();

        assert!(run_scan(&file, Some("json"), None, Some("high"), None).unwrap());
        assert!(!run_scan(&file, Some("json"), None, Some("none"), None).unwrap());
        assert!(run_scan(dir.path(), Some("json"), Some(Severity::High), Some("medium"), None).unwrap());
        assert!(run_scan(&file, Some("xml"), None, None, None).is_err());
        assert!(run_scan(&file, None, None, Some("critical"), None).is_err());
    }
}
