pub mod columns;
pub mod locate;
pub mod period;

pub use columns::{ensure_not_blank, missing_columns, validate_columns, REQUIRED_COLUMNS};
pub use locate::{locate_structure, StructureLabels, StructureLocation};
pub use period::{
    check_period, parse_metadata_range, period_from_key, validate_period, Period, PeriodFailure,
};
