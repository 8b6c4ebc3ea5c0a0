//! `generate` command: emit the USDCx escrow contract.

use super::helpers::print_issue;
use anyhow::{Context, Result};
use clarity_guard::{analyze, generate_escrow, looks_like_contract, EscrowConfig, RawEscrowConfig};
use colored::*;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

/// Escrow parameters given on the command line.
#[derive(Debug, Default)]
pub struct GenerateFlags {
    pub beneficiary: Option<String>,
    pub arbiter: Option<String>,
    pub unlock_height: Option<i64>,
    pub trait_contract: Option<String>,
}

impl GenerateFlags {
    fn into_raw(self) -> Result<RawEscrowConfig> {
        Ok(RawEscrowConfig {
            beneficiary: self.beneficiary.context("--beneficiary is required without --config")?,
            arbiter: self.arbiter.context("--arbiter is required without --config")?,
            unlock_height: self.unlock_height.context("--unlock-height is required without --config")?,
            usdc_trait_contract: self
                .trait_contract
                .context("--trait-contract is required without --config")?,
        })
    }
}

fn resolve_config(flags: GenerateFlags, config_path: Option<&Path>) -> Result<EscrowConfig> {
    let raw = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            RawEscrowConfig::from_toml_str(&content)
                .with_context(|| format!("invalid escrow config {}", path.display()))?
        }
        None => flags.into_raw()?,
    };
    Ok(EscrowConfig::try_from(raw)?)
}

pub fn cmd_generate(
    flags: GenerateFlags,
    config_path: Option<&Path>,
    output: Option<&Path>,
    check: bool,
) -> Result<ExitCode> {
    let config = resolve_config(flags, config_path)?;
    let contract = generate_escrow(&config);

    match output {
        Some(out) => {
            std::fs::write(out, &contract).with_context(|| format!("failed to write {}", out.display()))?;
            info!("escrow contract written to {}", out.display());
        }
        None => print!("{}", contract),
    }

    if !check {
        return Ok(ExitCode::SUCCESS);
    }
    if !looks_like_contract(&contract) {
        eprintln!("  {} generated text has no public functions", "✗".red());
        return Ok(ExitCode::from(1));
    }
    let issues = analyze(&contract);
    if issues.is_empty() {
        eprintln!("  {} generated contract passes all checks", "✓".green().bold());
        return Ok(ExitCode::SUCCESS);
    }
    for (i, issue) in issues.iter().enumerate() {
        print_issue(i + 1, issue);
    }
    Ok(ExitCode::from(1))
}
