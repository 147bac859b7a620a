// src/error.rs
use thiserror::Error;

use crate::validate::PeriodFailure;

/// Everything that can fail a run. Every variant is fatal: the run stops at the
/// stage that produced it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("could not locate report structure: {}", describe_missing(.metadata_found, .header_found))]
    StructuralDiscovery {
        metadata_found: bool,
        header_found: bool,
    },

    #[error("report is empty: {0}")]
    EmptyInput(String),

    #[error("report period does not match its storage key: {0}")]
    PeriodMismatch(#[from] PeriodFailure),

    #[error("invalid report structure, missing columns: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),

    #[error("could not decode report: {0:#}")]
    Decode(anyhow::Error),

    #[error("could not encode parquet: {0:#}")]
    Encode(anyhow::Error),
}

fn describe_missing(metadata_found: &bool, header_found: &bool) -> &'static str {
    match (*metadata_found, *header_found) {
        (false, false) => "neither the metadata block nor the header row was found",
        (false, true) => "metadata block not found",
        (true, false) => "header row not found",
        (true, true) => "structure found",
    }
}

impl PipelineError {
    /// Short machine-friendly name of the failure kind, used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration",
            PipelineError::StructuralDiscovery { .. } => "structural_discovery",
            PipelineError::EmptyInput(_) => "empty_input",
            PipelineError::PeriodMismatch(_) => "period_mismatch",
            PipelineError::SchemaMismatch { .. } => "schema_mismatch",
            PipelineError::Storage(_) => "storage",
            PipelineError::Decode(_) => "decode",
            PipelineError::Encode(_) => "encode",
        }
    }
}
