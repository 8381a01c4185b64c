//! The batched URL-repair orchestrator.
//!
//! Batches are processed strictly in order with no cross-batch concurrency:
//! progress surfaces batch-by-batch, service rate limits are respected, and
//! backoff delays actually spread load. Per-batch failures are contained:
//! the run always finishes and returns a finalized stats snapshot; only
//! input validation stops it before any batch work.
//!
//! Bookkeeping invariants:
//! - input tokens are counted once per batch, before the retry loop;
//! - exactly one API request is recorded per calling batch, however many
//!   attempts it takes, including exhausted batches;
//! - an exhausted batch keeps its original rows and lands in the skip list.

use crate::clean::cleaned;
use crate::client::{
    ClientError, GenerationClient, GenerationOptions, GenerationReply, GroundingSource,
};
use crate::dataset::{col, Dataset, Row};
use crate::pricing::URL_MODEL;
use crate::stats::{OperationKind, OperationStats, OperationStatus};

use super::parse::{parse_row_reply, ReplyParseError};
use super::partition::{partition, Lookup, RowBatch};
use super::retry::{jittered, RetryDecision, RetryPolicy};
use super::{CancelToken, DEFAULT_BATCH_SIZE};

const URL_BATCH_PROMPT: &str = include_str!("../../prompts/url_batch.md");

/// Knobs for one URL-repair run.
#[derive(Debug, Clone)]
pub struct UrlEnrichmentOptions {
    pub batch_size: usize,
    pub model: String,
    pub retry: RetryPolicy,
}

impl Default for UrlEnrichmentOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            model: URL_MODEL.to_string(),
            retry: RetryPolicy::url_default(),
        }
    }
}

/// Finalized result of one URL-repair run.
#[derive(Debug)]
pub struct UrlEnrichmentOutcome {
    pub stats: OperationStats,
    /// 1-based sequence numbers of batches that exhausted their retries.
    pub skipped_batches: Vec<usize>,
    /// Deduplicated citations across all successful batches.
    pub sources: Vec<GroundingSource>,
}

/// Why one submission attempt failed; always retryable.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Parse(#[from] ReplyParseError),
}

/// Repair missing website URLs across the whole sheet.
///
/// Mutates `dataset` in place through the partition's lookup mapping, so row
/// order is preserved by construction. Never returns an error: failures are
/// encoded in the outcome's stats and skip list.
pub fn run_url_enrichment(
    dataset: &mut Dataset,
    client: &dyn GenerationClient,
    options: &UrlEnrichmentOptions,
    cancel: &CancelToken,
) -> UrlEnrichmentOutcome {
    let mut stats = OperationStats::new(OperationKind::UrlRepair, &options.model);
    let mut skipped: Vec<usize> = Vec::new();
    let mut sources: Vec<GroundingSource> = Vec::new();

    if let Err(err) = dataset.validate() {
        stats.finalize(OperationStatus::Error, format!("invalid input: {err}"));
        return UrlEnrichmentOutcome {
            stats,
            skipped_batches: skipped,
            sources,
        };
    }
    if options.batch_size == 0 {
        stats.finalize(
            OperationStatus::Error,
            "invalid input: batch size must be at least 1".to_string(),
        );
        return UrlEnrichmentOutcome {
            stats,
            skipped_batches: skipped,
            sources,
        };
    }

    stats.status = OperationStatus::Running;
    let batches = partition(dataset, options.batch_size);
    let total = batches.len();
    let generation = GenerationOptions {
        search_grounding: true,
    };

    for batch in &batches {
        if cancel.is_cancelled() {
            let done = batch.seq - 1;
            tracing::info!(done, total, "run cancelled");
            stats.finalize(
                OperationStatus::Error,
                format!("cancelled after {done}/{total} batches"),
            );
            return UrlEnrichmentOutcome {
                stats,
                skipped_batches: skipped,
                sources,
            };
        }

        if batch.is_no_call() {
            tracing::debug!(batch = batch.seq, "all rows have plausible URLs, no call");
            continue;
        }

        let request = build_url_request(dataset, batch);
        // Counted once per batch; retries reuse the same request.
        match client.count_tokens(&options.model, &request) {
            Ok(tokens) => stats.input_tokens += tokens,
            Err(err) => tracing::warn!(
                batch = batch.seq,
                error = %err,
                "token count failed, recording zero"
            ),
        }
        // One request per batch regardless of retry count.
        stats.api_requests += 1;

        let mut failures = 0u32;
        loop {
            let attempt_result = client
                .generate_content(&options.model, &request, &generation)
                .map_err(AttemptError::from)
                .and_then(|reply| {
                    apply_reply(dataset, batch, &reply)?;
                    Ok(reply)
                });

            match attempt_result {
                Ok(reply) => {
                    match client.count_tokens(&options.model, &reply.text) {
                        Ok(tokens) => stats.output_tokens += tokens,
                        Err(err) => tracing::warn!(
                            batch = batch.seq,
                            error = %err,
                            "output token count failed, recording zero"
                        ),
                    }
                    record_sources(&mut sources, reply.citations);
                    eprintln!(
                        "  batch {}/{}: {} rows repaired",
                        batch.seq,
                        total,
                        batch.lookups.len()
                    );
                    break;
                }
                Err(err) => {
                    failures += 1;
                    tracing::warn!(
                        batch = batch.seq,
                        attempt = failures,
                        error = %err,
                        "batch attempt failed"
                    );
                    match options.retry.decide(failures) {
                        RetryDecision::Retry(delay) => std::thread::sleep(jittered(delay)),
                        RetryDecision::GiveUp => {
                            // Original rows stay untouched; no data loss.
                            skipped.push(batch.seq);
                            eprintln!(
                                "  batch {}/{} failed after {} attempts, keeping original rows",
                                batch.seq, total, failures
                            );
                            break;
                        }
                    }
                }
            }
        }
    }

    let successful = total - skipped.len();
    let status = if skipped.is_empty() {
        OperationStatus::Completed
    } else {
        OperationStatus::Error
    };
    stats.finalize(status, format!("{successful}/{total} batches successful"));
    UrlEnrichmentOutcome {
        stats,
        skipped_batches: skipped,
        sources,
    }
}

/// Serialize the header plus only the lookup rows into the instruction.
pub(crate) fn build_url_request(dataset: &Dataset, batch: &RowBatch) -> String {
    let mut rows: Vec<Row> = Vec::with_capacity(batch.lookups.len() + 1);
    rows.push(dataset.header().clone());
    for lookup in &batch.lookups {
        rows.push(dataset.padded_row(lookup.row));
    }
    let rows_json =
        serde_json::to_string_pretty(&rows).expect("string rows always serialize");
    let url_column = dataset.cell(0, col::WEBSITE);

    URL_BATCH_PROMPT
        .replace("{row_count}", &batch.lookups.len().to_string())
        .replace("{url_column}", url_column)
        .replace("{rows_json}", &rows_json)
}

/// Parse a reply and scatter its rows back onto the batch's lookup rows.
fn apply_reply(
    dataset: &mut Dataset,
    batch: &RowBatch,
    reply: &GenerationReply,
) -> Result<(), AttemptError> {
    let returned = parse_row_reply(&reply.text, batch.lookups.len())?;
    for (lookup, row) in batch.lookups.iter().zip(returned) {
        merge_returned_row(dataset, lookup, &row);
    }
    Ok(())
}

/// Overwrite cells of one original row with the returned row's values.
///
/// The name cell is row identity and never overwritten. The URL and
/// description cells go through placeholder cleaning first. A cell only
/// changes when the incoming value is non-empty, so a "not found" reply
/// leaves the original untouched.
fn merge_returned_row(dataset: &mut Dataset, lookup: &Lookup, returned: &[String]) {
    let width = dataset.width();
    for (column, raw) in returned.iter().enumerate().take(width) {
        if column == col::NAME {
            continue;
        }
        let value = if column == col::WEBSITE || column == col::DESCRIPTION {
            cleaned(raw)
        } else {
            raw.clone()
        };
        if value.trim().is_empty() {
            continue;
        }
        dataset.set_cell(lookup.row, column, value);
    }
}

fn record_sources(sources: &mut Vec<GroundingSource>, citations: Vec<GroundingSource>) {
    for citation in citations {
        if !sources.iter().any(|s| s.uri == citation.uri) {
            sources.push(citation);
        }
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
