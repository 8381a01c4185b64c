//! In-memory sheet representation: a header row plus untyped data rows.
//!
//! Rows stay `Vec<String>` so the wire format (JSON array of arrays) and the
//! CSV boundary need no conversion. Column meaning is positional; all indexed
//! access goes through the padded accessors here instead of raw indexing, so
//! short rows read as empty cells and writes widen the row first.

use anyhow::{bail, Result};

/// One record as an ordered list of string cells.
pub type Row = Vec<String>;

/// Named column positions for the organization sheet layout.
pub mod col {
    /// Organization name.
    pub const NAME: usize = 0;
    /// Website URL.
    pub const WEBSITE: usize = 1;
    /// Short description.
    pub const DESCRIPTION: usize = 2;
    /// Long-form research dossier.
    pub const DOSSIER: usize = 3;
}

/// A non-empty ordered sheet; row 0 is the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    /// Wrap raw rows without validation; call [`Dataset::validate`] before
    /// starting an operation.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Reject sheets no operation can work on: missing header or a header
    /// with no columns.
    pub fn validate(&self) -> Result<()> {
        let Some(header) = self.rows.first() else {
            bail!("sheet is empty (no header row)");
        };
        if header.iter().all(|cell| cell.trim().is_empty()) {
            bail!("header row is empty");
        }
        Ok(())
    }

    pub fn header(&self) -> &Row {
        &self.rows[0]
    }

    /// Logical column count, fixed by the header.
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Number of data rows (excludes the header).
    pub fn data_len(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// All rows including the header, e.g. for export.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Absolute row index of the `n`-th data row.
    pub fn data_index(n: usize) -> usize {
        n + 1
    }

    /// Read a cell by absolute row index; short rows read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map_or("", String::as_str)
    }

    /// Write a cell by absolute row index, padding the row to fit.
    pub fn set_cell(&mut self, row: usize, column: usize, value: String) {
        let Some(r) = self.rows.get_mut(row) else {
            return;
        };
        if r.len() <= column {
            r.resize(column + 1, String::new());
        }
        r[column] = value;
    }

    /// Clone one row padded out to the header width, for request payloads.
    pub fn padded_row(&self, row: usize) -> Row {
        let width = self.width();
        let mut out = self.rows.get(row).cloned().unwrap_or_default();
        if out.len() < width {
            out.resize(width, String::new());
        }
        out
    }
}
