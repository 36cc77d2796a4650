// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Row value objects and column names for catalog CSV files
// No I/O, no async, no external dependencies

pub mod columns;
mod csv_row;

pub use csv_row::{CsvField, CsvRow};
