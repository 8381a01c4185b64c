//! Pre-run cost estimation.
//!
//! Performs the same partitioning or row selection as the live run, counts
//! input tokens for every request that would be made, and prices the result
//! without ever calling `generate_content`. Because the partition rule is
//! shared, the estimate and the real run agree on which batches trigger
//! calls. Output tokens are unknowable before generation and are reported as
//! zero.

use crate::client::GenerationClient;
use crate::dataset::Dataset;
use crate::stats::{OperationKind, OperationStats, OperationStatus};

use super::batch::build_url_request;
use super::dossier::{build_dossier_request, eligible_rows};
use super::partition::partition;

/// Which operation to price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateTarget {
    Urls,
    Dossiers,
}

/// Knobs for a dry-run estimate.
#[derive(Debug, Clone)]
pub struct EstimateOptions {
    pub target: EstimateTarget,
    /// Batch size the URL run would use; ignored for dossiers.
    pub batch_size: usize,
    pub model: String,
}

/// Price an operation without performing it.
///
/// The returned stats carry the would-be input tokens, request count, and
/// cost; status is `Completed` unless the input fails validation.
pub fn run_estimate(
    dataset: &Dataset,
    client: &dyn GenerationClient,
    options: &EstimateOptions,
) -> OperationStats {
    let mut stats = OperationStats::new(OperationKind::Estimate, &options.model);

    if let Err(err) = dataset.validate() {
        stats.finalize(OperationStatus::Error, format!("invalid input: {err}"));
        return stats;
    }
    if options.target == EstimateTarget::Urls && options.batch_size == 0 {
        stats.finalize(
            OperationStatus::Error,
            "invalid input: batch size must be at least 1".to_string(),
        );
        return stats;
    }

    stats.status = OperationStatus::Estimating;

    let requests: Vec<String> = match options.target {
        EstimateTarget::Urls => partition(dataset, options.batch_size)
            .iter()
            .filter(|batch| !batch.is_no_call())
            .map(|batch| build_url_request(dataset, batch))
            .collect(),
        EstimateTarget::Dossiers => {
            let (lookups, _) = eligible_rows(dataset);
            lookups
                .iter()
                .map(|lookup| build_dossier_request(dataset, lookup.row))
                .collect()
        }
    };

    for request in &requests {
        match client.count_tokens(&options.model, request) {
            Ok(tokens) => stats.input_tokens += tokens,
            Err(err) => {
                tracing::warn!(error = %err, "token count failed, recording zero")
            }
        }
    }
    stats.api_requests = requests.len() as u64;

    let progress = format!(
        "estimated {} requests, {} input tokens (output tokens unknown before generation)",
        stats.api_requests, stats.input_tokens
    );
    stats.finalize(OperationStatus::Completed, progress);
    stats
}
