//! CSV boundary: produces the initial dataset and consumes the final one.
//!
//! The core pipeline never touches files; everything funnels through these
//! two functions. Records may vary in width: short rows are preserved as-is
//! and read back as empty cells by the dataset accessors.

use anyhow::{Context, Result};
use std::path::Path;

use crate::dataset::Dataset;

/// Read a CSV file into a dataset; the first record is the header.
pub fn read_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("read {}", path.display()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let dataset = Dataset::from_rows(rows);
    dataset
        .validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(dataset)
}

/// Write the dataset back out, header first.
pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;

    for row in dataset.rows() {
        writer
            .write_record(row)
            .with_context(|| format!("write {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}
