//! stackplot CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

mod stack_spec;

use stack_spec::read_processes_spec;

#[derive(Parser)]
#[command(name = "stackplot")]
#[command(about = "stackplot - Stacked histogram artifacts with combined uncertainties")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a full stack artifact (backgrounds + band + overlays + legend)
    Stack {
        /// Input processes spec (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the artifact (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Background total with combined uncertainty only (no plot bookkeeping)
    Aggregate {
        /// Input processes spec (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the result (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Per-histogram summaries (totals, under/overflow, per-bin errors)
    Summary {
        /// Input processes spec (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the summaries (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Stack { input, output } => cmd_stack(&input, output.as_ref()),
        Commands::Aggregate { input, output } => cmd_aggregate(&input, output.as_ref()),
        Commands::Summary { input, output } => cmd_summary(&input, output.as_ref()),
        Commands::Version => {
            println!("stackplot {}", sp_core::VERSION);
            Ok(())
        }
    }
}

fn emit_json<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))?;
            tracing::info!(path = %path.display(), "artifact written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_stack(input: &Path, output: Option<&PathBuf>) -> Result<()> {
    tracing::info!(path = %input.display(), "loading processes spec");
    let spec = read_processes_spec(input)?;
    tracing::info!(processes = spec.processes.len(), "spec loaded");

    let artifact = sp_viz::stack_artifact(&spec.processes, &spec.plot, &spec.aggregate)?;
    emit_json(&artifact, output)
}

fn cmd_aggregate(input: &Path, output: Option<&PathBuf>) -> Result<()> {
    tracing::info!(path = %input.display(), "loading processes spec");
    let spec = read_processes_spec(input)?;

    let backgrounds: Vec<_> = spec
        .processes
        .into_iter()
        .filter(|p| p.role == sp_hist::ProcessRole::Background)
        .collect();
    let result = sp_hist::aggregate(&backgrounds, &spec.aggregate)?;
    tracing::info!(bins = result.band.len(), "background total aggregated");
    emit_json(&result, output)
}

fn cmd_summary(input: &Path, output: Option<&PathBuf>) -> Result<()> {
    let spec = read_processes_spec(input)?;
    let summaries: Vec<_> = spec.processes.iter().map(|p| p.hist.summary()).collect();
    emit_json(&summaries, output)
}
