//! `prooflint` CLI: check the correctness proofs embedded in a codebase.
//!
//! Output is one JSON array on stdout, one entry per discovered property.
//! Exit status is non-zero when any proof failed to check or checked as
//! anything other than "correct".

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use prooflint_core::{CheckerConfig, OpenAiClient, ProofChecker};

#[derive(Debug, Parser)]
#[command(name = "prooflint", about = "Check hand-written correctness proofs with a reasoning model")]
struct Args {
    /// Repo to analyze.
    #[arg(default_value = ".")]
    directory: PathBuf,

    /// Max number of files in the codebase.
    #[arg(long, default_value_t = 1_000)]
    max_files: usize,

    /// Max number of messages in each conversation before aborting.
    #[arg(long, default_value_t = 50)]
    max_messages: usize,

    /// Min size of codebase (in characters) such that file contents are
    /// disclosed incrementally instead of all in the initial prompt.
    #[arg(long, default_value_t = 100_000)]
    min_length_to_exclude_full_files: usize,

    /// Path to exclude from the analysis, in .gitignore format. Repeat as
    /// needed.
    #[arg(long = "filter-path")]
    filter_paths: Vec<String>,

    /// Only check properties whose statement contains this text
    /// (case-insensitive).
    #[arg(long)]
    property_filter: Option<String>,

    /// Max number of tokens to use (approximate!).
    #[arg(long)]
    max_tokens_total: Option<u64>,

    /// Max number of tokens to use per property (approximate!).
    #[arg(long)]
    max_tokens_per_property: Option<u64>,

    /// Model identifier; overrides OPENAI_MODEL.
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("prooflint_core=debug")),
        )
        .init();

    let args = Args::parse();
    anyhow::ensure!(
        args.directory.is_dir(),
        "{} is not a directory",
        args.directory.display()
    );

    let service = OpenAiClient::from_env(args.model.as_deref())
        .context("building the reasoning-service client")?;
    let config = CheckerConfig {
        max_files: args.max_files,
        max_messages: args.max_messages,
        min_length_to_exclude_full_files: args.min_length_to_exclude_full_files,
        filter_paths: args.filter_paths,
        property_filter: args.property_filter,
        max_tokens_total: args.max_tokens_total,
        max_tokens_per_property: args.max_tokens_per_property,
    };

    let checker = ProofChecker::new(&args.directory, config, service)
        .context("preparing the proof checker")?;
    let results = checker.check_proofs().await?;

    println!("{}", serde_json::to_string_pretty(&results)?);

    let any_finding = results
        .iter()
        .any(|r| r.correctness_explanation.is_finding());
    Ok(if any_finding {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
