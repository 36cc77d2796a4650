// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// CSV parsing, encoding detection, and cell value parsing

mod csv_parser;
pub mod encoding;
pub mod value_parser;

pub use csv_parser::{CsvParser, ParsedCsv, RowResult};
pub use encoding::{detect_encoding, DetectedEncoding};
pub use value_parser::{parse_date, parse_decimal};
