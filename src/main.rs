// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use recon_ingest::{
    config::{JobArgs, JobConfig},
    storage::open_store,
    Pipeline,
};
use std::env;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .init();

    // ─── 2) parameters ───────────────────────────────────────────────
    let config = JobConfig::from_args(JobArgs::parse())?;
    info!(
        file_key = %config.file_key,
        bucket = %config.store.bucket,
        backend = ?config.store.backend,
        "starting run"
    );

    // ─── 3) store + pipeline ─────────────────────────────────────────
    let store = open_store(&config.store)
        .await
        .context("opening object store")?;
    let pipeline = Pipeline::new(store)
        .with_labels(config.labels)
        .with_max_rows_per_part(config.max_rows_per_part);

    let report = pipeline.run(&config.file_key).await?;

    // ─── 4) one JSON line for whoever launched the job ───────────────
    println!("{}", serde_json::to_string(&report)?);
    info!(
        destination = %report.destination,
        rows = report.rows,
        elapsed_ms = report.elapsed_ms as u64,
        "run complete"
    );
    Ok(())
}
