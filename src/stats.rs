//! Per-operation counters and the session-wide cost ledger.
//!
//! `OperationStats` is owned by the orchestrator for the duration of one run
//! and returned as a finalized snapshot. The caller folds completed snapshots
//! into the `SessionLedger` it owns; nothing here is global state.

use serde::Serialize;
use std::fmt;

use crate::pricing::{estimate_cost, pricing_for};

/// Which enrichment operation a stats record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    UrlRepair,
    Dossier,
    Estimate,
}

/// Lifecycle of one operation; `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Idle,
    Estimating,
    Running,
    Completed,
    Error,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationStatus::Idle => "idle",
            OperationStatus::Estimating => "estimating",
            OperationStatus::Running => "running",
            OperationStatus::Completed => "completed",
            OperationStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Mutable counters scoped to one enrichment run.
#[derive(Debug, Clone, Serialize)]
pub struct OperationStats {
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub api_requests: u64,
    pub estimated_cost: f64,
    pub model: String,
    pub progress: String,
}

impl OperationStats {
    pub fn new(kind: OperationKind, model: &str) -> Self {
        Self {
            kind,
            status: OperationStatus::Idle,
            input_tokens: 0,
            output_tokens: 0,
            api_requests: 0,
            estimated_cost: 0.0,
            model: model.to_string(),
            progress: String::new(),
        }
    }

    /// Recompute the cost estimate from the current counters.
    pub fn reprice(&mut self) {
        let pricing = pricing_for(&self.model);
        self.estimated_cost = estimate_cost(
            &pricing,
            self.input_tokens,
            self.output_tokens,
            self.api_requests,
        );
    }

    /// Terminal transition; also fixes the final cost figure.
    pub fn finalize(&mut self, status: OperationStatus, progress: String) {
        self.reprice();
        self.status = status;
        self.progress = progress;
    }
}

/// Cumulative totals across all completed operations in this session.
///
/// Monotonically non-decreasing between explicit resets (a reset models
/// loading a new source file).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionLedger {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub api_requests: u64,
    pub estimated_cost: f64,
}

impl SessionLedger {
    /// Fold a finalized operation into the session totals.
    pub fn absorb(&mut self, stats: &OperationStats) {
        self.input_tokens += stats.input_tokens;
        self.output_tokens += stats.output_tokens;
        self.api_requests += stats.api_requests;
        self.estimated_cost += stats.estimated_cost;
    }

    pub fn reset(&mut self) {
        *self = SessionLedger::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::URL_MODEL;

    #[test]
    fn ledger_accumulates_across_operations() {
        let mut ledger = SessionLedger::default();

        let mut first = OperationStats::new(OperationKind::UrlRepair, URL_MODEL);
        first.input_tokens = 1000;
        first.output_tokens = 500;
        first.api_requests = 2;
        first.finalize(OperationStatus::Completed, "2/2 batches successful".into());
        ledger.absorb(&first);

        let mut second = OperationStats::new(OperationKind::Dossier, "gemini-2.5-pro");
        second.input_tokens = 200;
        second.api_requests = 1;
        second.finalize(OperationStatus::Completed, "1/1 rows successful".into());
        ledger.absorb(&second);

        assert_eq!(ledger.input_tokens, 1200);
        assert_eq!(ledger.output_tokens, 500);
        assert_eq!(ledger.api_requests, 3);
        assert!(ledger.estimated_cost > 0.0);

        ledger.reset();
        assert_eq!(ledger.api_requests, 0);
        assert_eq!(ledger.estimated_cost, 0.0);
    }

    #[test]
    fn finalize_prices_the_counters() {
        let mut stats = OperationStats::new(OperationKind::UrlRepair, URL_MODEL);
        stats.input_tokens = 1_000_000;
        stats.finalize(OperationStatus::Completed, String::new());
        assert!((stats.estimated_cost - 0.30).abs() < 1e-9);
        assert_eq!(stats.status, OperationStatus::Completed);
    }
}
