//! AI-driven enrichment for organization spreadsheets.
//!
//! The pipeline ingests a sheet of organization records, repairs missing
//! website URLs in bounded batches against a text-generation service, writes
//! long-form research dossiers row by row, and re-exports the cleaned sheet.
//! Everything network-facing sits behind the [`client::GenerationClient`]
//! trait; the orchestrators in [`enrich`] own all retry, merge, and cost
//! bookkeeping and always return a finalized stats snapshot instead of
//! failing mid-run.

pub mod clean;
pub mod client;
pub mod dataset;
pub mod enrich;
pub mod pricing;
pub mod sheet_io;
pub mod stats;
pub mod urlcheck;
