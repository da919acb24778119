mod commands;
mod config;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::deal::{DealArgs, UnderwriteArgs};
use commands::sensitivity::SensitivityArgs;

/// Underwriting for income-producing real estate
#[derive(Parser)]
#[command(
    name = "uwa",
    version,
    about = "Underwriting for income-producing real estate",
    long_about = "A CLI for underwriting income-producing real estate with decimal precision. \
                  Projects a five-year levered pro forma, runs a rule-based audit, \
                  sweeps sensitivity grids and prints deal digests."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (JSON or YAML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Project the five-year pro forma
    Project(DealArgs),
    /// Run the underwriting audit battery
    Audit(DealArgs),
    /// Project, audit and wrap both in one report
    Underwrite(UnderwriteArgs),
    /// Two-way sensitivity grid over slider variables
    Sensitivity(SensitivityArgs),
    /// Plain-text deal digest
    Digest(DealArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level);

    if let Commands::Version = cli.command {
        println!("uwa {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::deal::run_project(args, &config),
        Commands::Audit(args) => commands::deal::run_audit(args, &config),
        Commands::Underwrite(args) => commands::deal::run_underwrite(args, &config),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args, &config),
        Commands::Digest(args) => commands::deal::run_digest(args, &config),
        Commands::Version => return,
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
