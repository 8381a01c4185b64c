//! Splitting the sheet into bounded batches and selecting lookup rows.
//!
//! Both the live run and the pre-run estimator call [`partition`], so the two
//! always agree on which batches would trigger an API call.

use std::ops::Range;

use crate::dataset::{col, Dataset};
use crate::urlcheck::is_plausible_url;

/// One row selected for AI lookup, addressed by absolute dataset row index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub row: usize,
    pub name: String,
}

/// A contiguous slice of data rows plus the subset needing lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBatch {
    /// 1-based batch sequence number, as reported in the skip list.
    pub seq: usize,
    /// Absolute dataset row indices covered by this batch.
    pub rows: Range<usize>,
    /// Rows whose website cell failed the plausibility check, in order.
    pub lookups: Vec<Lookup>,
}

impl RowBatch {
    /// A batch needing no lookups bypasses the generation client entirely.
    pub fn is_no_call(&self) -> bool {
        self.lookups.is_empty()
    }
}

/// Split the data rows into contiguous batches of at most `batch_size`.
///
/// `batch_size` of zero yields no batches; callers validate it as an input
/// error before starting a run.
pub fn partition(dataset: &Dataset, batch_size: usize) -> Vec<RowBatch> {
    if batch_size == 0 {
        return Vec::new();
    }
    let first_data_row = Dataset::data_index(0);
    let end = first_data_row + dataset.data_len();

    let mut batches = Vec::new();
    let mut start = first_data_row;
    while start < end {
        let stop = (start + batch_size).min(end);
        let lookups = (start..stop)
            .filter(|&row| !is_plausible_url(dataset.cell(row, col::WEBSITE)))
            .map(|row| Lookup {
                row,
                name: dataset.cell(row, col::NAME).to_string(),
            })
            .collect();
        batches.push(RowBatch {
            seq: batches.len() + 1,
            rows: start..stop,
            lookups,
        });
        start = stop;
    }
    batches
}
