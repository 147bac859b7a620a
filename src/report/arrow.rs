// src/report/arrow.rs
use anyhow::{Context, Result};
use arrow::{
    array::{
        ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder,
        TimestampMillisecondBuilder,
    },
    datatypes::{DataType, Field, Schema, TimeUnit},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use std::sync::Arc;

use super::{Cell, Table};

/// Infer the Arrow type of a column from its non-empty cells:
/// - only integers            → Int64
/// - integers and floats      → Float64, or Utf8 when an integer is beyond 2^53
///   and would lose precision as f64
/// - only booleans            → Boolean
/// - only datetimes           → Timestamp(ms)
/// - anything else / no value → Utf8
pub fn infer_column_type<'a>(cells: impl Iterator<Item = &'a Cell>) -> DataType {
    const MAX_EXACT_INT: u64 = 1 << 53;

    let (mut ints, mut floats, mut bools, mut dates, mut other) = (0, 0, 0, 0, 0);
    let mut inexact_ints = false;
    for cell in cells {
        match cell {
            Cell::Empty => {}
            Cell::Int(i) => {
                ints += 1;
                inexact_ints |= i.unsigned_abs() > MAX_EXACT_INT;
            }
            Cell::Float(_) => floats += 1,
            Cell::Bool(_) => bools += 1,
            Cell::DateTime(_) => dates += 1,
            Cell::Text(_) => other += 1,
        }
    }

    let numeric = ints + floats;
    let kinds = [numeric > 0, bools > 0, dates > 0, other > 0]
        .iter()
        .filter(|k| **k)
        .count();

    if kinds != 1 {
        DataType::Utf8
    } else if numeric > 0 {
        if floats == 0 {
            DataType::Int64
        } else if inexact_ints {
            DataType::Utf8
        } else {
            DataType::Float64
        }
    } else if bools > 0 {
        DataType::Boolean
    } else if dates > 0 {
        DataType::Timestamp(TimeUnit::Millisecond, None)
    } else {
        DataType::Utf8
    }
}

/// Build the Arrow schema for `table`, one nullable field per header.
pub fn build_arrow_schema(table: &Table) -> Arc<Schema> {
    let fields: Vec<Field> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, name)| Field::new(name, infer_column_type(table.column(i)), true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Convert the whole table into one RecordBatch. Values pass through unchanged;
/// only cells that do not fit the column type are rendered as text (Utf8 columns).
pub fn table_to_record_batch(table: &Table) -> Result<RecordBatch> {
    let schema = build_arrow_schema(table);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(table.num_columns());

    for (i, field) in schema.fields().iter().enumerate() {
        let cells = table.column(i);
        let col: ArrayRef = match field.data_type() {
            DataType::Int64 => {
                let mut b = Int64Builder::with_capacity(table.num_rows());
                for c in cells {
                    b.append_option(match c {
                        Cell::Int(v) => Some(*v),
                        _ => None,
                    });
                }
                Arc::new(b.finish())
            }
            DataType::Float64 => {
                let mut b = Float64Builder::with_capacity(table.num_rows());
                for c in cells {
                    b.append_option(match c {
                        Cell::Int(v) => Some(*v as f64),
                        Cell::Float(v) => Some(*v),
                        _ => None,
                    });
                }
                Arc::new(b.finish())
            }
            DataType::Boolean => {
                let mut b = BooleanBuilder::with_capacity(table.num_rows());
                for c in cells {
                    b.append_option(match c {
                        Cell::Bool(v) => Some(*v),
                        _ => None,
                    });
                }
                Arc::new(b.finish())
            }
            DataType::Timestamp(TimeUnit::Millisecond, None) => {
                let mut b = TimestampMillisecondBuilder::with_capacity(table.num_rows());
                for c in cells {
                    b.append_option(match c {
                        Cell::DateTime(dt) => Some(dt.and_utc().timestamp_millis()),
                        _ => None,
                    });
                }
                Arc::new(b.finish())
            }
            _ => {
                let mut b = StringBuilder::new();
                for c in cells {
                    b.append_option(c.as_text());
                }
                Arc::new(b.finish())
            }
        };
        columns.push(col);
    }

    // explicit row count keeps zero-column tables well-formed
    let options = RecordBatchOptions::new().with_row_count(Some(table.num_rows()));
    RecordBatch::try_new_with_options(schema, columns, &options)
        .context("building record batch from report table")
}
