//! CLI argument parsing for the enrichment tool.
//!
//! The CLI is intentionally thin: each subcommand maps onto exactly one
//! library operation, so the same pipeline can be driven from other hosts
//! without going through argv.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use org_enrich::enrich::DEFAULT_BATCH_SIZE;

/// Root CLI entrypoint for the enrichment operations.
#[derive(Parser, Debug)]
#[command(
    name = "orgen",
    version,
    about = "AI-driven URL repair and research dossiers for organization spreadsheets",
    after_help = "Commands:\n  estimate --input <csv> --op urls|dossiers   Price an operation without running it\n  urls --input <csv> --output <csv>           Repair missing website URLs in batches\n  dossiers --input <csv> --output <csv>       Generate research dossiers row by row\n\nExamples:\n  orgen estimate --input orgs.csv --op urls\n  orgen urls --input orgs.csv --output orgs.clean.csv\n  orgen dossiers --input orgs.clean.csv --output orgs.final.csv --max-retries 0\n\nThe Gemini API key is read from --api-key, then GEMINI_API_KEY (a .env file\nis honored).",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level operations.
#[derive(Subcommand, Debug)]
pub enum Command {
    Estimate(EstimateArgs),
    Urls(UrlsArgs),
    Dossiers(DossiersArgs),
}

/// Which operation an estimate should price.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateOp {
    Urls,
    Dossiers,
}

/// Price an operation against the current sheet without generating anything.
#[derive(Parser, Debug)]
#[command(about = "Estimate tokens and cost for an operation")]
pub struct EstimateArgs {
    /// Input CSV (header row + one organization per row)
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Operation to price
    #[arg(long, value_enum)]
    pub op: EstimateOp,

    /// Rows per batch for the URL operation
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Override the model id
    #[arg(long)]
    pub model: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Repair missing website URLs batch by batch.
#[derive(Parser, Debug)]
#[command(about = "Repair missing website URLs in batches")]
pub struct UrlsArgs {
    /// Input CSV (header row + one organization per row)
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Where to write the enriched CSV
    #[arg(long, value_name = "FILE")]
    pub output: PathBuf,

    /// Rows per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Override the model id
    #[arg(long)]
    pub model: Option<String>,

    /// Override the retry budget per batch
    #[arg(long)]
    pub max_retries: Option<u32>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Generate research dossiers one row at a time.
#[derive(Parser, Debug)]
#[command(about = "Generate research dossiers row by row")]
pub struct DossiersArgs {
    /// Input CSV (header row + one organization per row)
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Where to write the enriched CSV
    #[arg(long, value_name = "FILE")]
    pub output: PathBuf,

    /// Override the model id
    #[arg(long)]
    pub model: Option<String>,

    /// Override the retry budget per row
    #[arg(long)]
    pub max_retries: Option<u32>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Flags shared by every subcommand.
#[derive(Parser, Debug)]
pub struct CommonArgs {
    /// Gemini API key (falls back to GEMINI_API_KEY)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Emit the operation summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Emit a verbose transcript of the run
    #[arg(long)]
    pub verbose: bool,
}
