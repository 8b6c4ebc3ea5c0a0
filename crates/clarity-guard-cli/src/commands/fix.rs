//! `fix` and `diff` commands.

use super::helpers::{load_config, read_contract};
use anyhow::{Context, Result};
use clarity_guard::{align, change_count, collapse_unchanged, ContractAnalyzer, DiffKind, DiffRow, Fixer};
use colored::*;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

/// Original and remediated source. Ignored or filtered issues are not patched.
fn remediate(file: &Path, config_path: Option<&Path>) -> Result<(String, String)> {
    let config = load_config(config_path, file)?;
    let source = read_contract(file)?;
    let analyzer = ContractAnalyzer::with_config(config.analyzer_config());
    let accepted = config.filter_issues(analyzer.analyze(&source));
    let fixed = Fixer::with_analyzer(analyzer).synthesize(&source, &accepted);
    Ok((source, fixed))
}

pub fn cmd_fix(file: &Path, output: Option<&Path>, config_path: Option<&Path>) -> Result<ExitCode> {
    let (source, fixed) = remediate(file, config_path)?;
    let changed = change_count(&align(&source, &fixed));

    match output {
        Some(out) => {
            std::fs::write(out, &fixed).with_context(|| format!("failed to write {}", out.display()))?;
            info!("wrote {}", out.display());
        }
        None => print!("{}", fixed),
    }

    eprintln!(
        "  {} {} line change(s) in {}",
        if changed == 0 { "✓".green() } else { "✎".yellow() },
        changed,
        file.display()
    );
    Ok(ExitCode::SUCCESS)
}

pub fn cmd_diff(file: &Path, context: Option<usize>, config_path: Option<&Path>) -> Result<ExitCode> {
    let (source, fixed) = remediate(file, config_path)?;
    let rows = align(&source, &fixed);
    let shown = match context {
        Some(radius) => collapse_unchanged(&rows, radius),
        None => rows.clone(),
    };

    for row in &shown {
        println!("{}", render_row(row));
    }
    eprintln!("\n  {} changed row(s)", change_count(&rows));
    Ok(ExitCode::SUCCESS)
}

fn render_row(row: &DiffRow) -> String {
    match row.kind {
        DiffKind::Equal => format!("  {}", row.left.as_deref().unwrap_or_default()),
        DiffKind::Delete => format!("- {}", row.left.as_deref().unwrap_or_default()).red().to_string(),
        DiffKind::Insert => format!("+ {}", row.right.as_deref().unwrap_or_default()).green().to_string(),
    }
}
