// src/validate/columns.rs
use std::collections::HashSet;
use tracing::{debug, error};

use crate::error::PipelineError;
use crate::report::Table;

/// Columns every reconciliation report must carry, exactly as exported.
pub const REQUIRED_COLUMNS: [&str; 15] = [
    "Número de operación",
    "Fecha de la compra",
    "Estado",
    "Descripción del estado",
    "Cobro",
    "Cargos e impuestos",
    "Anulaciones y reembolsos",
    "Total a recibir",
    "Herramienta de cobro",
    "Medio de pago",
    "Descripción del ítem",
    "Cantidad",
    "Local",
    "Caja",
    "Nombre de mi colaborador",
];

/// Required columns absent from `headers`, in declaration order.
pub fn missing_columns(headers: &[String]) -> Vec<String> {
    let present: HashSet<&str> = headers.iter().map(String::as_str).collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| c.to_string())
        .collect()
}

/// Fail with `SchemaMismatch` when any required column is missing. Extra columns
/// are allowed.
pub fn validate_columns(table: &Table) -> Result<(), PipelineError> {
    let missing = missing_columns(&table.headers);
    if !missing.is_empty() {
        error!(missing = ?missing, "report is missing required columns");
        return Err(PipelineError::SchemaMismatch { missing });
    }
    debug!(columns = table.num_columns(), "all required columns present");
    Ok(())
}

/// Fail with `EmptyInput` when the table has no rows or only empty cells.
pub fn ensure_not_blank(table: &Table) -> Result<(), PipelineError> {
    if table.num_rows() == 0 {
        return Err(PipelineError::EmptyInput(
            "no data rows below the header".to_string(),
        ));
    }
    if table.is_blank() {
        return Err(PipelineError::EmptyInput(format!(
            "all {} data rows are empty",
            table.num_rows()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Cell;

    fn headers_without(skip: &[&str]) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|c| !skip.contains(*c))
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn missing_caja_and_local_are_named() {
        let table = Table {
            headers: headers_without(&["Caja", "Local"]),
            rows: Vec::new(),
        };
        match validate_columns(&table) {
            Err(PipelineError::SchemaMismatch { missing }) => {
                assert_eq!(missing, vec!["Local".to_string(), "Caja".to_string()]);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn error_message_lists_missing_columns() {
        let table = Table {
            headers: headers_without(&["Caja", "Local"]),
            rows: Vec::new(),
        };
        let msg = validate_columns(&table).unwrap_err().to_string();
        assert!(msg.contains("Caja"), "{}", msg);
        assert!(msg.contains("Local"), "{}", msg);
    }

    #[test]
    fn all_columns_plus_extras_pass() {
        let mut headers = headers_without(&[]);
        headers.push("Código de referencia".to_string());
        headers.insert(0, "Unnamed: 0".to_string());
        let table = Table {
            headers,
            rows: Vec::new(),
        };
        assert!(validate_columns(&table).is_ok());
    }

    #[test]
    fn near_miss_names_do_not_count() {
        let mut headers = headers_without(&["Descripción del ítem"]);
        headers.push("Descripcion del item".to_string());
        assert_eq!(missing_columns(&headers), vec!["Descripción del ítem"]);
    }

    #[test]
    fn blank_tables_are_rejected() {
        let no_rows = Table {
            headers: headers_without(&[]),
            rows: Vec::new(),
        };
        assert!(matches!(
            ensure_not_blank(&no_rows),
            Err(PipelineError::EmptyInput(_))
        ));

        let all_empty = Table {
            headers: vec!["Caja".into(), "Local".into()],
            rows: vec![vec![Cell::Empty, Cell::Empty]; 3],
        };
        assert!(matches!(
            ensure_not_blank(&all_empty),
            Err(PipelineError::EmptyInput(_))
        ));

        let one_value = Table {
            headers: vec!["Caja".into(), "Local".into()],
            rows: vec![vec![Cell::Empty, Cell::Empty], vec![Cell::Empty, Cell::Int(4)]],
        };
        assert!(ensure_not_blank(&one_value).is_ok());
    }
}
