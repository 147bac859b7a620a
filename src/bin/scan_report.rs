// src/bin/scan_report.rs
//! Inspect a report on disk: where the metadata and header rows are, what period
//! the metadata declares and which required columns are missing. Writes nothing.
use anyhow::{Context, Result};
use clap::Parser;
use recon_ingest::{
    report::{read_report, Cell},
    validate::{check_period, locate_structure, missing_columns, parse_metadata_range, StructureLabels},
};
use std::{env, fs, path::PathBuf, process::exit};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "scan-report", about = "Show the structure discovered in a report file")]
struct Args {
    /// Report file (.xls/.xlsx/.xlsm/.xlsb/.ods/.csv)
    path: PathBuf,

    /// Storage key to check the period against, e.g. raw/year=2024/month=03/report.xlsx
    #[arg(long)]
    key: Option<String>,

    #[arg(long, env = "METADATA_LABEL", default_value = "Mercado")]
    metadata_label: String,

    #[arg(long, env = "HEADER_LABEL", default_value = "Número")]
    header_label: String,
}

fn main() {
    dotenv::dotenv().ok();
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(Level::WARN.into())),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = scan(&args) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

fn scan(args: &Args) -> Result<()> {
    // 1) Decode the file exactly as a run would
    let name = args.path.to_string_lossy().to_string();
    let bytes = fs::read(&args.path).with_context(|| format!("reading {}", name))?;
    let raw = read_report(&name, bytes)?;

    println!("=== Report: {} ===", args.path.display());
    println!("Rows:    {}", raw.height());
    println!("Columns: {}", raw.width);
    println!();

    // 2) Structure
    let labels = StructureLabels {
        metadata: args.metadata_label.clone(),
        header: args.header_label.clone(),
    };
    let location = locate_structure(raw.first_column(), &labels);
    println!("=== Structure ===");
    println!("Metadata row: {}", describe(location.metadata_index));
    println!("Header row:   {}", describe(location.header_index));
    println!();

    // 3) Period
    let metadata = location
        .metadata_index
        .and_then(|i| raw.cell(i, 0))
        .and_then(Cell::as_text);
    println!("=== Period ===");
    match metadata.as_deref().map(parse_metadata_range) {
        Some(Ok((start, end))) => println!("Declared: {} .. {}", start, end),
        Some(Err(e)) => println!("Declared: unreadable ({})", e),
        None => println!("Declared: <no metadata>"),
    }
    if let Some(key) = &args.key {
        match check_period(metadata.as_deref(), key) {
            Ok(period) => println!("Key {}: matches {}", key, period),
            Err(e) => println!("Key {}: {}", key, e),
        }
    }
    println!();

    // 4) Columns
    println!("=== Columns ===");
    let Some(table) = location.header_index.and_then(|i| raw.with_header(i)) else {
        println!("<no header row>");
        return Ok(());
    };
    for header in &table.headers {
        println!("- {}", header);
    }
    println!("Data rows: {}", table.num_rows());
    let missing = missing_columns(&table.headers);
    if missing.is_empty() {
        println!("All required columns present");
    } else {
        println!("Missing required columns: {}", missing.join(", "));
    }
    Ok(())
}

fn describe(index: Option<usize>) -> String {
    index.map_or("<not found>".to_string(), |i| i.to_string())
}
