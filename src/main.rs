//! Command routing for the `orgen` binary.
//!
//! Each subcommand reads the sheet, runs exactly one library operation, and
//! prints a summary. The session ledger lives here: the orchestrators
//! return finalized snapshots and the caller owns the accumulation.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;

mod cli;

use cli::{Command, CommonArgs, DossiersArgs, EstimateArgs, EstimateOp, RootArgs, UrlsArgs};
use org_enrich::client::{GeminiClient, GroundingSource};
use org_enrich::enrich::{
    run_dossier_enrichment, run_estimate, run_url_enrichment, CancelToken, DossierOptions,
    EstimateOptions, EstimateTarget, RetryPolicy, UrlEnrichmentOptions,
};
use org_enrich::pricing::{DOSSIER_MODEL, URL_MODEL};
use org_enrich::sheet_io::{read_csv, write_csv};
use org_enrich::stats::{OperationStats, OperationStatus, SessionLedger};

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let args = RootArgs::parse();
    // A .env next to the sheet is the usual place for the API key.
    dotenvy::dotenv().ok();

    match args.command {
        Command::Estimate(cmd) => run_estimate_cmd(cmd),
        Command::Urls(cmd) => run_urls_cmd(cmd),
        Command::Dossiers(cmd) => run_dossiers_cmd(cmd),
    }
}

fn run_estimate_cmd(cmd: EstimateArgs) -> Result<bool> {
    init_tracing(cmd.common.verbose);
    let dataset = read_csv(&cmd.input)?;
    let client = GeminiClient::new(resolve_api_key(&cmd.common)?);

    let (target, default_model) = match cmd.op {
        EstimateOp::Urls => (EstimateTarget::Urls, URL_MODEL),
        EstimateOp::Dossiers => (EstimateTarget::Dossiers, DOSSIER_MODEL),
    };
    let options = EstimateOptions {
        target,
        batch_size: cmd.batch_size,
        model: cmd.model.unwrap_or_else(|| default_model.to_string()),
    };

    let stats = run_estimate(&dataset, &client, &options);
    let mut ledger = SessionLedger::default();
    ledger.absorb(&stats);
    print_summary(&stats, &[], &[], &ledger, cmd.common.json)?;
    Ok(stats.status != OperationStatus::Error)
}

fn run_urls_cmd(cmd: UrlsArgs) -> Result<bool> {
    init_tracing(cmd.common.verbose);
    let mut dataset = read_csv(&cmd.input)?;
    let client = GeminiClient::new(resolve_api_key(&cmd.common)?);

    let mut options = UrlEnrichmentOptions {
        batch_size: cmd.batch_size,
        ..UrlEnrichmentOptions::default()
    };
    if let Some(model) = cmd.model {
        options.model = model;
    }
    if let Some(max_retries) = cmd.max_retries {
        options.retry = RetryPolicy {
            max_retries,
            ..RetryPolicy::url_default()
        };
    }

    let outcome = run_url_enrichment(&mut dataset, &client, &options, &CancelToken::new());
    write_csv(&dataset, &cmd.output)
        .with_context(|| format!("export enriched sheet to {}", cmd.output.display()))?;

    let mut ledger = SessionLedger::default();
    ledger.absorb(&outcome.stats);
    print_summary(
        &outcome.stats,
        &outcome.skipped_batches,
        &outcome.sources,
        &ledger,
        cmd.common.json,
    )?;
    Ok(outcome.stats.status == OperationStatus::Completed)
}

fn run_dossiers_cmd(cmd: DossiersArgs) -> Result<bool> {
    init_tracing(cmd.common.verbose);
    let mut dataset = read_csv(&cmd.input)?;
    let client = GeminiClient::new(resolve_api_key(&cmd.common)?);

    let mut options = DossierOptions::default();
    if let Some(model) = cmd.model {
        options.model = model;
    }
    if let Some(max_retries) = cmd.max_retries {
        options.retry = RetryPolicy {
            max_retries,
            ..RetryPolicy::dossier_default()
        };
    }

    let outcome = run_dossier_enrichment(&mut dataset, &client, &options, &CancelToken::new());
    write_csv(&dataset, &cmd.output)
        .with_context(|| format!("export enriched sheet to {}", cmd.output.display()))?;

    let mut ledger = SessionLedger::default();
    ledger.absorb(&outcome.stats);
    print_summary(
        &outcome.stats,
        &outcome.skipped_rows,
        &outcome.sources,
        &ledger,
        cmd.common.json,
    )?;
    Ok(outcome.stats.status == OperationStatus::Completed)
}

fn resolve_api_key(common: &CommonArgs) -> Result<String> {
    if let Some(key) = &common.api_key {
        return Ok(key.clone());
    }
    std::env::var("GEMINI_API_KEY")
        .map_err(|_| anyhow!("no API key: pass --api-key or set GEMINI_API_KEY"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Serialize)]
struct Summary<'a> {
    stats: &'a OperationStats,
    skipped: &'a [usize],
    sources: &'a [GroundingSource],
    session: &'a SessionLedger,
}

fn print_summary(
    stats: &OperationStats,
    skipped: &[usize],
    sources: &[GroundingSource],
    ledger: &SessionLedger,
    json: bool,
) -> Result<()> {
    if json {
        let summary = Summary {
            stats,
            skipped,
            sources,
            session: ledger,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serialize summary")?
        );
        return Ok(());
    }

    println!("status: {} ({})", stats.status, stats.progress);
    println!("model: {}", stats.model);
    println!(
        "tokens: {} in / {} out, {} requests, est. ${:.4}",
        stats.input_tokens, stats.output_tokens, stats.api_requests, stats.estimated_cost
    );
    if !skipped.is_empty() {
        let list = skipped
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("skipped: {list}");
    }
    if !sources.is_empty() {
        println!("sources:");
        for source in sources {
            if source.title.is_empty() {
                println!("  {}", source.uri);
            } else {
                println!("  {} ({})", source.uri, source.title);
            }
        }
    }
    println!(
        "session: {} in / {} out, {} requests, est. ${:.4}",
        ledger.input_tokens, ledger.output_tokens, ledger.api_requests, ledger.estimated_cost
    );
    Ok(())
}
