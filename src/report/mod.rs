// src/report/mod.rs
pub mod arrow;
pub mod read;

use chrono::NaiveDateTime;
use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
};

pub use read::{read_report, ReportFormat};

/// A single spreadsheet cell, as decoded from the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text rendering of the cell. `None` for empty cells, so an empty cell never
    /// matches a label and never counts as content.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Cell::Int(i) => Some(Cow::Owned(i.to_string())),
            Cell::Float(f) => Some(Cow::Owned(f.to_string())),
            Cell::Bool(b) => Some(Cow::Owned(b.to_string())),
            Cell::DateTime(dt) => Some(Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S").to_string())),
        }
    }

    /// Typed cell from a CSV field: empty → Empty, integers and floats are
    /// recognised, everything else stays text.
    pub fn from_csv_field(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Cell::Empty;
        }
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Cell::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Cell::Float(f);
            }
        }
        Cell::Text(raw.to_string())
    }
}

/// The whole first sheet, read without a header. Row indices are absolute sheet rows.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Each row padded to `width` cells.
    pub rows: Vec<Vec<Cell>>,
    pub width: usize,
}

impl RawTable {
    /// Build from ragged rows, padding every row with `Cell::Empty` to the widest one.
    pub fn from_rows(mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }
        Self { rows, width }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// True when no cell anywhere carries a value.
    pub fn is_blank(&self) -> bool {
        self.rows.iter().flatten().all(Cell::is_empty)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// The first column, top to bottom: the preamble scanned for labels.
    pub fn first_column(&self) -> Vec<&Cell> {
        self.rows.iter().filter_map(|r| r.first()).collect()
    }

    /// Apply `header_row` as the header: its cells name the columns and every
    /// following row is data. Rows above the header are discarded.
    pub fn with_header(&self, header_row: usize) -> Option<Table> {
        let header = self.rows.get(header_row)?;
        let headers = disambiguate_headers(header);

        let mut rows: Vec<Vec<Cell>> = self.rows[header_row + 1..].to_vec();
        while rows
            .last()
            .is_some_and(|r| r.iter().all(Cell::is_empty))
        {
            rows.pop();
        }

        Some(Table { headers, rows })
    }
}

/// Header names in column order: empty names become `Unnamed: <col>` and repeats
/// get a `.<n>` suffix. A generated name that collides with one already taken is
/// suffixed again, so every column name is unique.
fn disambiguate_headers(header: &[Cell]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(header.len());

    for (col, cell) in header.iter().enumerate() {
        let base = match cell.as_text() {
            Some(t) if !t.trim().is_empty() => t.into_owned(),
            _ => format!("Unnamed: {}", col),
        };

        let mut name = base.clone();
        while taken.contains(&name) {
            let count = counts.entry(base.clone()).or_insert(0);
            *count += 1;
            name = format!("{}.{}", base, count);
        }
        taken.insert(name.clone());
        out.push(name);
    }
    out
}

/// Table loaded with the discovered header row.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    /// Data rows, each exactly `headers.len()` wide.
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    /// True when there are no rows, or every cell of every row is empty.
    pub fn is_blank(&self) -> bool {
        self.rows.iter().flatten().all(Cell::is_empty)
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Cell> + '_ {
        static EMPTY: Cell = Cell::Empty;
        self.rows.iter().map(move |r| r.get(idx).unwrap_or(&EMPTY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn as_text_tolerates_non_string_cells() {
        assert_eq!(Cell::Empty.as_text(), None);
        assert_eq!(Cell::Int(42).as_text().as_deref(), Some("42"));
        assert_eq!(Cell::Float(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(Cell::Bool(true).as_text().as_deref(), Some("true"));
        assert_eq!(text("Caja").as_text().as_deref(), Some("Caja"));
    }

    #[test]
    fn csv_fields_are_typed() {
        assert_eq!(Cell::from_csv_field(""), Cell::Empty);
        assert_eq!(Cell::from_csv_field("  "), Cell::Empty);
        assert_eq!(Cell::from_csv_field("17"), Cell::Int(17));
        assert_eq!(Cell::from_csv_field("-3.25"), Cell::Float(-3.25));
        assert_eq!(Cell::from_csv_field("aprobado"), text("aprobado"));
        assert_eq!(Cell::from_csv_field("NaN"), text("NaN"));
    }

    #[test]
    fn from_rows_pads_ragged_rows() {
        let raw = RawTable::from_rows(vec![vec![text("a")], vec![text("b"), Cell::Int(1)]]);
        assert_eq!(raw.width, 2);
        assert_eq!(raw.rows[0], vec![text("a"), Cell::Empty]);
    }

    #[test]
    fn with_header_slices_and_names_columns() {
        let raw = RawTable::from_rows(vec![
            vec![text("Mercado Pago"), Cell::Empty, Cell::Empty],
            vec![text("Número de operación"), text("Caja"), text("Caja")],
            vec![Cell::Int(1), text("A"), Cell::Empty],
            vec![Cell::Empty, Cell::Empty, Cell::Empty],
            vec![Cell::Int(2), Cell::Empty, text("B")],
            vec![Cell::Empty, Cell::Empty, Cell::Empty],
        ]);

        let table = raw.with_header(1).expect("header row exists");
        assert_eq!(table.headers, vec!["Número de operación", "Caja", "Caja.1"]);
        // interior blank row kept, trailing blank row dropped
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.rows[2][2], text("B"));
    }

    #[test]
    fn empty_header_cells_get_placeholder_names() {
        let raw = RawTable::from_rows(vec![vec![text("Estado"), Cell::Empty, text("")]]);
        let table = raw.with_header(0).expect("header row exists");
        assert_eq!(table.headers, vec!["Estado", "Unnamed: 1", "Unnamed: 2"]);
        assert!(table.is_blank());
    }

    #[test]
    fn generated_names_never_collide_with_real_headers() {
        let raw = RawTable::from_rows(vec![vec![
            text("Caja"),
            text("Caja"),
            text("Caja.1"),
            text("Caja"),
        ]]);
        let table = raw.with_header(0).expect("header row exists");
        assert_eq!(table.headers, vec!["Caja", "Caja.1", "Caja.1.1", "Caja.2"]);
    }

    #[test]
    fn with_header_out_of_range_is_none() {
        let raw = RawTable::from_rows(vec![vec![text("x")]]);
        assert!(raw.with_header(3).is_none());
    }
}
