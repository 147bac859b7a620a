// src/validate/locate.rs
use tracing::debug;

use crate::report::Cell;

/// Literal prefixes identifying the metadata block and the header row in the
/// first column of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureLabels {
    pub metadata: String,
    pub header: String,
}

impl Default for StructureLabels {
    fn default() -> Self {
        Self {
            metadata: "Mercado".to_string(),
            header: "Número".to_string(),
        }
    }
}

/// Row indices found in the preamble; `None` means the label never appeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StructureLocation {
    pub metadata_index: Option<usize>,
    pub header_index: Option<usize>,
}

/// Index of the first cell whose text starts with `label`. Empty cells never match.
pub fn find_labeled_row<'a, I>(column: I, label: &str) -> Option<usize>
where
    I: IntoIterator<Item = &'a Cell>,
{
    column
        .into_iter()
        .position(|cell| cell.as_text().is_some_and(|t| t.starts_with(label)))
}

/// Scan the first column top to bottom for the metadata and header labels.
pub fn locate_structure<'a, I>(column: I, labels: &StructureLabels) -> StructureLocation
where
    I: IntoIterator<Item = &'a Cell>,
    I::IntoIter: Clone,
{
    let column = column.into_iter();
    let location = StructureLocation {
        metadata_index: find_labeled_row(column.clone(), &labels.metadata),
        header_index: find_labeled_row(column, &labels.header),
    };
    debug!(
        metadata_index = ?location.metadata_index,
        header_index = ?location.header_index,
        "scanned preamble"
    );
    location
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn finds_metadata_before_header() {
        let column = vec![
            Cell::Empty,
            text("Reporte de ventas"),
            text("Mercado Libre - periodo marzo"),
            Cell::Float(3.0),
            Cell::Empty,
            text("Número de operación"),
            Cell::Int(12345),
        ];
        let loc = locate_structure(column.iter(), &StructureLabels::default());
        assert_eq!(loc.metadata_index, Some(2));
        assert_eq!(loc.header_index, Some(5));
    }

    #[test]
    fn no_labels_means_not_found() {
        let column = vec![Cell::Empty, Cell::Int(0), Cell::Float(2.5), text("otro")];
        let loc = locate_structure(column.iter(), &StructureLabels::default());
        assert_eq!(loc, StructureLocation::default());
    }

    #[test]
    fn empty_preamble_is_not_found() {
        let column: Vec<Cell> = Vec::new();
        let loc = locate_structure(column.iter(), &StructureLabels::default());
        assert_eq!(loc.metadata_index, None);
        assert_eq!(loc.header_index, None);
    }

    #[test]
    fn match_at_row_zero_is_distinct_from_not_found() {
        let column = vec![text("Número de operación")];
        assert_eq!(find_labeled_row(column.iter(), "Número"), Some(0));
    }

    #[test]
    fn first_match_wins() {
        let column = vec![text("Número A"), text("Número B")];
        assert_eq!(find_labeled_row(column.iter(), "Número"), Some(0));
    }

    #[test]
    fn numeric_cells_match_by_text() {
        let column = vec![Cell::Empty, Cell::Int(2024)];
        assert_eq!(find_labeled_row(column.iter(), "20"), Some(1));
    }

    #[test]
    fn prefix_match_is_case_sensitive() {
        let column = vec![text("mercado pago"), text("NÚMERO")];
        let loc = locate_structure(column.iter(), &StructureLabels::default());
        assert_eq!(loc, StructureLocation::default());
    }

    #[test]
    fn custom_labels() {
        let labels = StructureLabels {
            metadata: "Periodo".into(),
            header: "ID".into(),
        };
        let column = vec![text("ID"), text("Periodo: marzo")];
        let loc = locate_structure(column.iter(), &labels);
        assert_eq!(loc.metadata_index, Some(1));
        assert_eq!(loc.header_index, Some(0));
    }
}
