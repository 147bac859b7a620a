// src/report/read.rs
use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::{debug, warn};

use super::{Cell, RawTable};

/// Source formats a report can be staged in, decided by the key's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// xls, xlsx, xlsm, xlsb, ods
    Workbook,
    Csv,
}

impl ReportFormat {
    pub fn from_key(key: &str) -> Option<Self> {
        let file = key.rsplit('/').next().unwrap_or(key);
        let (_, ext) = file.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Some(ReportFormat::Workbook),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }
}

/// Decode the object bytes behind `key` into a headerless grid of the first sheet.
#[tracing::instrument(level = "debug", skip(bytes), fields(bytes = bytes.len()))]
pub fn read_report(key: &str, bytes: Vec<u8>) -> Result<RawTable> {
    let format = ReportFormat::from_key(key)
        .ok_or_else(|| anyhow!("unsupported report extension in key {}", key))?;

    let raw = match format {
        ReportFormat::Workbook => read_workbook(bytes),
        ReportFormat::Csv => read_csv(&bytes),
    }
    .with_context(|| format!("decoding report {}", key))?;

    debug!(rows = raw.height(), cols = raw.width, "decoded report");
    Ok(raw)
}

/// Read the first worksheet. Rows and columns before the first used cell are kept
/// as empty cells so row indices match the sheet.
fn read_workbook(bytes: Vec<u8>) -> Result<RawTable> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).context("opening workbook")?;

    let sheet_names = workbook.sheet_names();
    let first = match sheet_names.first() {
        Some(name) => name.clone(),
        None => bail!("workbook has no sheets"),
    };
    if sheet_names.len() > 1 {
        debug!(sheet = %first, total = sheet_names.len(), "reading first sheet only");
    }

    let range = workbook
        .worksheet_range(&first)
        .with_context(|| format!("reading sheet {}", first))?;

    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for data_row in range.rows() {
        let mut row = vec![Cell::Empty; col_offset];
        row.extend(data_row.iter().map(cell_from_data));
        rows.push(row);
    }

    Ok(RawTable::from_rows(rows))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => whole_number(*f).map_or(Cell::Float(*f), Cell::Int),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Float(dt.as_f64())),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(Cell::DateTime)
            .unwrap_or_else(|_| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Workbooks store every number as a float; whole values within the exact f64
/// integer range load as integers, so an ID column reads the same as from CSV.
fn whole_number(f: f64) -> Option<i64> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    (f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT).then_some(f as i64)
}

/// CSV exports arrive in UTF-8 or Latin-1 depending on the tool that produced them.
/// UTF-8 is tried first; Latin-1 maps every byte, so it is the last resort.
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) => {
            warn!(error = %e, "report is not valid UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

fn read_csv(bytes: &[u8]) -> Result<RawTable> {
    let text = decode_text(bytes);
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // preamble rows are narrower than the table
        .from_reader(Cursor::new(text.as_bytes()));

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        rows.push(record.iter().map(Cell::from_csv_field).collect());
    }

    Ok(RawTable::from_rows(rows))
}
