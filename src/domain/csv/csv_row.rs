// ============================================================
// CSV ROW TYPES
// ============================================================
// Normalized cells of one catalog CSV record

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single cell, keyed by its header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvField {
    /// Header as written in the file (trimmed)
    pub name: String,

    /// Trimmed value; `None` when the cell is empty after trimming
    pub value: Option<String>,
}

impl CsvField {
    pub fn new(name: &str, raw: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            value: normalize_cell(raw),
        }
    }
}

/// Strip surrounding whitespace and treat an empty result as absent.
pub fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A single record of a catalog CSV file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvRow {
    /// Line number in the source file (header is line 1)
    pub line: u64,

    /// Cells in header order
    pub fields: Vec<CsvField>,

    /// Non-empty cells by header
    pub field_map: HashMap<String, String>,
}

impl CsvRow {
    pub fn new(line: u64, fields: Vec<CsvField>) -> Self {
        let field_map = fields
            .iter()
            .filter_map(|f| f.value.as_ref().map(|v| (f.name.clone(), v.clone())))
            .collect();

        Self {
            line,
            fields,
            field_map,
        }
    }

    /// Value of a column, `None` when the column is missing or empty.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.field_map.get(column).map(String::as_str)
    }

    pub fn get_owned(&self, column: &str) -> Option<String> {
        self.field_map.get(column).cloned()
    }

    /// Non-empty cells of every column whose header starts with `prefix`,
    /// in header order.
    pub fn photo_references(&self, prefix: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.name.starts_with(prefix))
            .filter_map(|f| f.value.as_deref())
            .collect()
    }
}
