mod commands;

use clap::{Parser, Subcommand};
use clarity_guard::Severity;
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "clarity-guard",
    version,
    about = "Clarity Guard: authorization and unchecked-transfer scanner for Clarity contracts",
    long_about = "Clarity Guard scans Clarity smart contracts that move USDCx (SIP-010) tokens.\n\n\
        Missing caller gates · unchecked transfer results · trait imports\n\
        Automatic try!/asserts! remediation · side-by-side review · escrow generator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output mode
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a contract or every .clar file under a directory
    Scan {
        path: PathBuf,
        /// Output format: human, json (overrides the config file)
        #[arg(long)]
        format: Option<String>,
        /// Minimum severity to report: low, medium, high
        #[arg(long)]
        min_severity: Option<Severity>,
        /// Exit non-zero if an issue at this level is reported: low, medium, high, none
        #[arg(long)]
        fail_on: Option<String>,
        /// Config file (defaults to .clarity-guard.toml next to the target)
        #[arg(long, env = "CLARITY_GUARD_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Write the remediated contract
    Fix {
        file: PathBuf,
        /// Write here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, env = "CLARITY_GUARD_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Show the original contract next to its remediated version
    Diff {
        file: PathBuf,
        /// Only changed lines plus surrounding context
        #[arg(long)]
        changes_only: bool,
        /// Context lines kept around each change with --changes-only
        #[arg(long, default_value_t = clarity_guard::DEFAULT_CONTEXT_RADIUS)]
        context: usize,
        #[arg(long, env = "CLARITY_GUARD_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Generate a USDCx escrow contract
    Generate {
        #[arg(long)]
        beneficiary: Option<String>,
        #[arg(long)]
        arbiter: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        unlock_height: Option<i64>,
        /// Contract that defines sip-010-trait, e.g. SP3...usdc-token
        #[arg(long)]
        trait_contract: Option<String>,
        /// TOML file with beneficiary, arbiter, unlock_height, usdc_trait_contract
        #[arg(long, conflicts_with_all = ["beneficiary", "arbiter", "unlock_height", "trait_contract"])]
        config: Option<PathBuf>,
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Run the analyzer over the generated contract
        #[arg(long)]
        check: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let result = match cli.command {
        Commands::Scan { path, format, min_severity, fail_on, config } => {
            commands::cmd_scan(&path, format.as_deref(), min_severity, fail_on.as_deref(), config.as_deref())
        }
        Commands::Fix { file, output, config } => {
            commands::cmd_fix(&file, output.as_deref(), config.as_deref())
        }
        Commands::Diff { file, changes_only, context, config } => {
            commands::cmd_diff(&file, changes_only.then_some(context), config.as_deref())
        }
        Commands::Generate { beneficiary, arbiter, unlock_height, trait_contract, config, output, check } => {
            let flags = commands::GenerateFlags { beneficiary, arbiter, unlock_height, trait_contract };
            commands::cmd_generate(flags, config.as_deref(), output.as_deref(), check)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("  {} {:#}", "✗".red(), e);
            ExitCode::from(2)
        }
    }
}
