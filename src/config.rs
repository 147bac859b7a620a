// src/config.rs
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::error::PipelineError;
use crate::validate::StructureLabels;

/// Where the bucket lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// `<root>/<bucket>` on the local filesystem
    Local,
    /// Google Cloud Storage (needs the `gcs` feature)
    Gcs,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub bucket: String,
    pub root: PathBuf,
}

/// Job parameters. Every flag can also come from the environment (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "recon-ingest",
    about = "Validate a staged reconciliation report and rewrite it as Parquet"
)]
pub struct JobArgs {
    /// Object key of the staged report, e.g. raw/year=2024/month=03/report.xlsx
    #[arg(long, env = "FILE_KEY", default_value = "")]
    pub file_key: String,

    /// Bucket holding both the raw report and the validated output
    #[arg(long, env = "BUCKET")]
    pub bucket: String,

    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = StoreBackend::Local)]
    pub backend: StoreBackend,

    /// Root directory for the local backend
    #[arg(long, env = "STORE_ROOT", default_value = "data")]
    pub root: PathBuf,

    /// Rows per Parquet part object
    #[arg(long, env = "MAX_ROWS_PER_PART", default_value_t = 1_000_000)]
    pub max_rows_per_part: usize,

    /// First-column prefix of the period metadata cell
    #[arg(long, env = "METADATA_LABEL", default_value = "Mercado")]
    pub metadata_label: String,

    /// First-column prefix of the header row
    #[arg(long, env = "HEADER_LABEL", default_value = "Número")]
    pub header_label: String,
}

/// Validated job configuration.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub file_key: String,
    pub store: StoreConfig,
    pub labels: StructureLabels,
    pub max_rows_per_part: usize,
}

impl JobConfig {
    /// Check the raw arguments. A blank `file_key` or bucket is a configuration
    /// error raised before any pipeline stage runs.
    pub fn from_args(args: JobArgs) -> Result<Self, PipelineError> {
        let file_key = args.file_key.trim().to_string();
        if file_key.is_empty() {
            return Err(PipelineError::Configuration(
                "the 'file_key' parameter is required".to_string(),
            ));
        }
        let bucket = args.bucket.trim().to_string();
        if bucket.is_empty() {
            return Err(PipelineError::Configuration(
                "the 'bucket' parameter is required".to_string(),
            ));
        }
        if args.max_rows_per_part == 0 {
            return Err(PipelineError::Configuration(
                "max_rows_per_part must be positive".to_string(),
            ));
        }

        Ok(Self {
            file_key,
            store: StoreConfig {
                backend: args.backend,
                bucket,
                root: args.root,
            },
            labels: StructureLabels {
                metadata: args.metadata_label,
                header: args.header_label,
            },
            max_rows_per_part: args.max_rows_per_part,
        })
    }
}
