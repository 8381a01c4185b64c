//! The enrichment pipeline: partitioning, orchestration, retries, parsing.
//!
//! Two flows share the machinery here. URL repair batches rows and submits
//! each batch once; dossier generation walks eligible rows one request at a
//! time. Both count tokens once per submission, count exactly one API request
//! per batch/row regardless of retries, and contain failures so a run always
//! finishes with a stats snapshot instead of an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Rows per batch when the caller does not override it.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Retry budget for URL batches (submissions = retries + 1).
pub const URL_MAX_RETRIES: u32 = 3;
/// Retry budget for dossier rows; pro-tier calls are expensive, so fewer.
pub const DOSSIER_MAX_RETRIES: u32 = 1;

/// First backoff delay; doubles per failed attempt.
pub const BACKOFF_BASE: Duration = Duration::from_millis(500);
/// Ceiling on a single backoff delay.
pub const BACKOFF_MAX: Duration = Duration::from_secs(8);

mod batch;
mod dossier;
mod estimate;
mod parse;
mod partition;
mod retry;

pub use batch::{run_url_enrichment, UrlEnrichmentOptions, UrlEnrichmentOutcome};
pub use dossier::{run_dossier_enrichment, DossierOptions, DossierOutcome};
pub use estimate::{run_estimate, EstimateOptions, EstimateTarget};
pub use parse::{parse_row_reply, ReplyParseError};
pub use partition::{partition, Lookup, RowBatch};
pub use retry::{jittered, RetryDecision, RetryPolicy};

/// Cooperative cancellation flag, checked at the top of each batch or row
/// iteration. Cancelling never rolls back merges already committed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
