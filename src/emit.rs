// src/emit.rs
use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use serde::Serialize;
use std::{collections::HashSet, io::Cursor};
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::report::{arrow::table_to_record_batch, Table};
use crate::storage::ObjectStore;

/// Default number of rows per part object.
pub const DEFAULT_MAX_ROWS_PER_PART: usize = 1_000_000;

/// Key of the validated dataset for a raw report key: the first `raw` folder becomes
/// `validated` and the file extension becomes `parquet`.
///
/// `raw/year=2024/month=01/x.xls` → `validated/year=2024/month=01/x.parquet`
pub fn destination_key(source_key: &str) -> String {
    let mut segments: Vec<String> = source_key.split('/').map(str::to_string).collect();

    let folders = segments.len().saturating_sub(1);
    if let Some(seg) = segments[..folders].iter_mut().find(|s| *s == "raw") {
        *seg = "validated".to_string();
    }

    if let Some(file) = segments.last_mut() {
        let stem = match file.rsplit_once('.') {
            Some((stem, _)) => stem.to_string(),
            None => file.clone(),
        };
        *file = format!("{}.parquet", stem);
    }

    segments.join("/")
}

/// Part object name inside a dataset.
fn part_key(dataset_key: &str, idx: usize) -> String {
    format!("{}/part-{:05}.snappy.parquet", dataset_key, idx)
}

/// Result of one emit.
#[derive(Debug, Clone, Serialize)]
pub struct EmittedDataset {
    /// Dataset key inside the bucket.
    pub key: String,
    /// Dataset location, e.g. `gs://bucket/validated/.../x.parquet`.
    pub uri: String,
    pub parts: Vec<String>,
    pub rows: usize,
    pub bytes: u64,
}

/// Writes validated tables as Parquet datasets.
pub struct Emitter<'a> {
    store: &'a dyn ObjectStore,
    max_rows_per_part: usize,
}

impl<'a> Emitter<'a> {
    pub fn new(store: &'a dyn ObjectStore, max_rows_per_part: usize) -> Self {
        Self {
            store,
            max_rows_per_part: max_rows_per_part.max(1),
        }
    }

    /// Write `table` under the dataset derived from `source_key`. Re-running with
    /// the same input rewrites the same part objects; parts left over from an
    /// earlier, larger run are removed once the new ones are stored.
    #[tracing::instrument(level = "info", skip(self, table), fields(rows = table.num_rows()))]
    pub async fn emit(&self, table: &Table, source_key: &str) -> Result<EmittedDataset, PipelineError> {
        let key = destination_key(source_key);
        let uri = self.store.uri(&key);

        let batch = table_to_record_batch(table).map_err(PipelineError::Encode)?;
        let encoded = encode_parts(&batch, self.max_rows_per_part).map_err(PipelineError::Encode)?;

        let existing = self
            .store
            .list(&format!("{}/", key))
            .await
            .map_err(PipelineError::Storage)?;

        let mut parts = Vec::with_capacity(encoded.len());
        let mut bytes = 0u64;
        for (idx, data) in encoded.into_iter().enumerate() {
            let part = part_key(&key, idx);
            bytes += data.len() as u64;
            self.store
                .put(&part, data)
                .await
                .map_err(PipelineError::Storage)?;
            debug!(part = %part, "wrote part");
            parts.push(part);
        }

        let written: HashSet<&String> = parts.iter().collect();
        for stale in existing.iter().filter(|k| !written.contains(k)) {
            self.store
                .delete(stale)
                .await
                .map_err(PipelineError::Storage)?;
            debug!(part = %stale, "removed stale part");
        }

        info!(uri = %uri, parts = parts.len(), bytes, "wrote parquet dataset");
        Ok(EmittedDataset {
            key,
            uri,
            parts,
            rows: batch.num_rows(),
            bytes,
        })
    }
}

/// Split `batch` into slices of at most `max_rows` rows and encode each as a
/// standalone Parquet file. An empty batch still yields one (empty) part so the
/// dataset carries its schema.
pub fn encode_parts(batch: &RecordBatch, max_rows: usize) -> Result<Vec<Vec<u8>>> {
    let total = batch.num_rows();
    let max_rows = max_rows.max(1);
    if total == 0 {
        return Ok(vec![write_parquet_to_memory(batch)?]);
    }

    let mut parts = Vec::with_capacity(total.div_ceil(max_rows));
    let mut offset = 0;
    while offset < total {
        let len = max_rows.min(total - offset);
        parts.push(
            write_parquet_to_memory(&batch.slice(offset, len))
                .with_context(|| format!("encoding rows {}..{}", offset, offset + len))?,
        );
        offset += len;
    }
    Ok(parts)
}

fn write_parquet_to_memory(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let cursor = Cursor::new(&mut buffer);

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_dictionary_enabled(true)
        .build();

    let mut writer = ArrowWriter::try_new(cursor, batch.schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(batch).context("writing batch to parquet")?;
    writer.close().context("closing parquet writer")?;

    Ok(buffer)
}
