//! Validation and Parquet conversion for reconciliation reports staged in object storage.
//!
//! A run loads one spreadsheet, discovers where its period metadata and real header
//! live, checks the period against the `year=`/`month=` folders of its key, checks
//! the required columns and writes the table as a Parquet dataset under `validated/`.

pub mod config;
pub mod emit;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod validate;

pub use error::PipelineError;
pub use pipeline::{Pipeline, RunReport, Stage};
