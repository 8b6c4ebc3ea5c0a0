//! Shared helper functions used across CLI commands.

use anyhow::{Context, Result};
use clarity_guard::{GuardConfig, Issue, Severity};
use colored::*;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Read a contract file as UTF-8.
pub fn read_contract(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map_or(false, |n| n.starts_with('.') || n == "target" || n == "node_modules")
}

/// `path` itself if it is a file, else every `.clar` file beneath it in
/// path order.
pub fn collect_contracts(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("path not found: {}", path.display());
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_entry(|e| !is_skipped_dir(e)) {
        let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
        if entry.file_type().is_file() && entry.path().extension().map_or(false, |e| e == "clar") {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// An explicit config file must load; otherwise look next to the target.
pub fn load_config(explicit: Option<&Path>, target: &Path) -> Result<GuardConfig> {
    if let Some(file) = explicit {
        return GuardConfig::from_file(file).context("invalid configuration");
    }
    let dir = if target.is_dir() {
        target
    } else {
        target.parent().unwrap_or_else(|| Path::new("."))
    };
    Ok(GuardConfig::load(dir))
}

pub fn severity_badge(severity: Severity) -> ColoredString {
    let label = format!(" {} ", severity.label().to_uppercase());
    match severity {
        Severity::High => label.on_red().white().bold(),
        Severity::Medium => label.on_yellow().black().bold(),
        Severity::Low => label.on_blue().white(),
    }
}

/// Compute a letter grade from a numeric score.
pub fn compute_grade(score: u8) -> &'static str {
    match score {
        95..=100 => "A+", 90..=94 => "A", 85..=89 => "A-", 80..=84 => "B+",
        75..=79 => "B", 70..=74 => "B-", 65..=69 => "C+", 60..=64 => "C",
        50..=59 => "D", _ => "F",
    }
}

pub fn print_issue(index: usize, issue: &Issue) {
    let location = match issue.line {
        Some(line) => format!("line {}", line),
        None => "contract".to_string(),
    };
    println!(
        "  {:>3}. {} {}  {}",
        index,
        severity_badge(issue.severity),
        issue.title.bold(),
        location.dimmed()
    );
    println!("       {}", issue.id.dimmed());
    println!("       {}", issue.description);
    if let Some(suggestion) = &issue.suggestion {
        println!("       {} {}", "fix:".green(), suggestion.green());
    }
}
