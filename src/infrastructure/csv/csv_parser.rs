// ============================================================
// CSV PARSER
// ============================================================
// Parse catalog CSV files with encoding detection and cell normalization

use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;
use tracing::{debug, warn};

use super::encoding::{detect_encoding, DetectedEncoding};
use crate::domain::csv::{CsvField, CsvRow};
use crate::domain::error::AppError;

/// Outcome of parsing one record: a normalized row, or the line number and
/// reason it could not be read.
pub type RowResult = Result<CsvRow, (u64, String)>;

/// Parsed file content
#[derive(Debug)]
pub struct ParsedCsv {
    pub encoding: DetectedEncoding,
    pub headers: Vec<String>,
    pub rows: Vec<RowResult>,
}

/// CSV parser with encoding detection
pub struct CsvParser {
    /// Delimiter character; `None` sniffs it from the content
    delimiter: Option<u8>,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            delimiter: Some(b','),
        }
    }
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Sniff the delimiter from the first lines of each file
    pub fn with_auto_delimiter(mut self) -> Self {
        self.delimiter = None;
        self
    }

    /// Read, decode and parse a CSV file.
    ///
    /// Fails as a whole when the file cannot be read or decoded; individual
    /// malformed records are reported per row.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedCsv, AppError> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("Nie znaleziono pliku: {}", path.display()))
            } else {
                AppError::IoError(format!("Nie można odczytać pliku {}: {}", path.display(), e))
            }
        })?;
        self.parse_bytes(&bytes)
    }

    /// Decode raw bytes with the detected encoding and parse them.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedCsv, AppError> {
        let encoding = detect_encoding(bytes);
        debug!(encoding = encoding.name(), "Detected CSV encoding");

        let content = encoding.decode(bytes).ok_or_else(|| {
            AppError::ParseError(format!(
                "Nie można zdekodować pliku jako {}",
                encoding.name()
            ))
        })?;

        let (headers, rows) = self.parse_content(&content)?;
        Ok(ParsedCsv {
            encoding,
            headers,
            rows,
        })
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<(Vec<String>, Vec<RowResult>), AppError> {
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Self::detect_delimiter(content));

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::All)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Nie można odczytać nagłówka CSV: {}", e)))?
            .clone();

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        loop {
            match reader.read_record(&mut record) {
                Ok(true) => {
                    let line = record.position().map(|p| p.line()).unwrap_or(0);
                    rows.push(Ok(Self::parse_row(line, &headers, &record)));
                }
                Ok(false) => break,
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    warn!(line, error = %e, "Skipping unreadable CSV record");
                    rows.push(Err((line, e.to_string())));
                }
            }
        }

        Ok((headers.iter().map(|h| h.trim().to_string()).collect(), rows))
    }

    /// Pair each header with its (normalized) cell
    fn parse_row(line: u64, headers: &StringRecord, record: &StringRecord) -> CsvRow {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| CsvField::new(header, record.get(idx).unwrap_or("")))
            .collect();

        CsvRow::new(line, fields)
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        let sample_lines: Vec<_> = content.lines().take(10).collect();
        if sample_lines.is_empty() {
            return best_delimiter;
        }

        for &delimiter in &candidates {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by consistency (low standard deviation) and frequency
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}
