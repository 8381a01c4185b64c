//! Per-row research dossier generation.
//!
//! Single-row analogue of the batch orchestrator: one request per eligible
//! row, a pro-tier model, and a smaller retry budget since each call is
//! expensive. A row that exhausts its retries keeps its current cells and the
//! run moves on.

use crate::clean::cleaned;
use crate::client::{GenerationClient, GenerationOptions, GroundingSource};
use crate::dataset::{col, Dataset};
use crate::pricing::DOSSIER_MODEL;
use crate::stats::{OperationKind, OperationStats, OperationStatus};

use super::partition::Lookup;
use super::retry::{jittered, RetryDecision, RetryPolicy};
use super::CancelToken;

const DOSSIER_PROMPT: &str = include_str!("../../prompts/dossier.md");

/// Knobs for one dossier run.
#[derive(Debug, Clone)]
pub struct DossierOptions {
    pub model: String,
    pub retry: RetryPolicy,
}

impl Default for DossierOptions {
    fn default() -> Self {
        Self {
            model: DOSSIER_MODEL.to_string(),
            retry: RetryPolicy::dossier_default(),
        }
    }
}

/// Finalized result of one dossier run.
#[derive(Debug)]
pub struct DossierOutcome {
    pub stats: OperationStats,
    /// 1-based data-row ordinals that exhausted their retries.
    pub skipped_rows: Vec<usize>,
    /// Deduplicated citations across all successful rows.
    pub sources: Vec<GroundingSource>,
}

/// Data rows that need a dossier: empty dossier cell and a usable name.
///
/// Returns the lookups plus the count of rows excluded for lacking a name;
/// nameless rows cannot be researched and are reported, not fatal.
pub(crate) fn eligible_rows(dataset: &Dataset) -> (Vec<Lookup>, usize) {
    let mut lookups = Vec::new();
    let mut missing_name = 0usize;
    for n in 0..dataset.data_len() {
        let row = Dataset::data_index(n);
        if !dataset.cell(row, col::DOSSIER).trim().is_empty() {
            continue;
        }
        let name = dataset.cell(row, col::NAME).trim();
        if name.is_empty() {
            missing_name += 1;
            tracing::warn!(row, "row has no organization name, excluded from dossiers");
            continue;
        }
        lookups.push(Lookup {
            row,
            name: name.to_string(),
        });
    }
    (lookups, missing_name)
}

/// Generate dossiers for every eligible row.
///
/// Never returns an error: failures are encoded in the outcome's stats and
/// skipped-row list. Token counting happens once per row; output tokens are
/// counted only on the attempt that succeeds.
pub fn run_dossier_enrichment(
    dataset: &mut Dataset,
    client: &dyn GenerationClient,
    options: &DossierOptions,
    cancel: &CancelToken,
) -> DossierOutcome {
    let mut stats = OperationStats::new(OperationKind::Dossier, &options.model);
    let mut skipped: Vec<usize> = Vec::new();
    let mut sources: Vec<GroundingSource> = Vec::new();

    if let Err(err) = dataset.validate() {
        stats.finalize(OperationStatus::Error, format!("invalid input: {err}"));
        return DossierOutcome {
            stats,
            skipped_rows: skipped,
            sources,
        };
    }

    stats.status = OperationStatus::Running;
    let (lookups, missing_name) = eligible_rows(dataset);
    let total = lookups.len();
    let generation = GenerationOptions {
        search_grounding: true,
    };

    for (ordinal, lookup) in lookups.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(done = ordinal, total, "run cancelled");
            stats.finalize(
                OperationStatus::Error,
                format!("cancelled after {ordinal}/{total} rows"),
            );
            return DossierOutcome {
                stats,
                skipped_rows: skipped,
                sources,
            };
        }

        let request = build_dossier_request(dataset, lookup.row);
        match client.count_tokens(&options.model, &request) {
            Ok(tokens) => stats.input_tokens += tokens,
            Err(err) => tracing::warn!(
                row = lookup.row,
                error = %err,
                "token count failed, recording zero"
            ),
        }
        stats.api_requests += 1;

        let mut failures = 0u32;
        loop {
            match client.generate_content(&options.model, &request, &generation) {
                Ok(reply) => {
                    match client.count_tokens(&options.model, &reply.text) {
                        Ok(tokens) => stats.output_tokens += tokens,
                        Err(err) => tracing::warn!(
                            row = lookup.row,
                            error = %err,
                            "output token count failed, recording zero"
                        ),
                    }
                    let text = cleaned(reply.text.trim());
                    if text.is_empty() {
                        tracing::info!(
                            row = lookup.row,
                            org = %lookup.name,
                            "service found insufficient information, cell unchanged"
                        );
                    } else {
                        dataset.set_cell(lookup.row, col::DOSSIER, text);
                    }
                    for citation in reply.citations {
                        if !sources.iter().any(|s| s.uri == citation.uri) {
                            sources.push(citation);
                        }
                    }
                    eprintln!("  dossier {}/{}: {}", ordinal + 1, total, lookup.name);
                    break;
                }
                Err(err) => {
                    failures += 1;
                    tracing::warn!(
                        row = lookup.row,
                        org = %lookup.name,
                        attempt = failures,
                        error = %err,
                        "dossier attempt failed"
                    );
                    match options.retry.decide(failures) {
                        RetryDecision::Retry(delay) => std::thread::sleep(jittered(delay)),
                        RetryDecision::GiveUp => {
                            // Target cell stays as it was; the run continues.
                            skipped.push(ordinal + 1);
                            eprintln!(
                                "  dossier {}/{} failed after {} attempts: {}",
                                ordinal + 1,
                                total,
                                failures,
                                lookup.name
                            );
                            break;
                        }
                    }
                }
            }
        }
    }

    let successful = total - skipped.len();
    let mut progress = format!("{successful}/{total} rows successful");
    if missing_name > 0 {
        progress.push_str(&format!(" ({missing_name} rows without a name excluded)"));
    }
    let status = if skipped.is_empty() {
        OperationStatus::Completed
    } else {
        OperationStatus::Error
    };
    stats.finalize(status, progress);
    DossierOutcome {
        stats,
        skipped_rows: skipped,
        sources,
    }
}

/// Fill the dossier instruction for one row.
pub(crate) fn build_dossier_request(dataset: &Dataset, row: usize) -> String {
    DOSSIER_PROMPT
        .replace("{name}", dataset.cell(row, col::NAME))
        .replace("{website}", dataset.cell(row, col::WEBSITE))
        .replace("{description}", dataset.cell(row, col::DESCRIPTION))
}

#[cfg(test)]
#[path = "dossier_tests.rs"]
mod tests;
