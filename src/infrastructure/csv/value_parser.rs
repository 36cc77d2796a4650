// ============================================================
// CELL VALUE PARSERS
// ============================================================
// Tolerant decimal and date parsing for CSV cells

use chrono::NaiveDate;

use crate::domain::error::{AppError, Result};

/// Accepted date layouts, tried in this order
pub const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%Y.%m.%d",
];

/// Parse a decimal number written with either `.` or `,` as separator.
pub fn parse_decimal(raw: &str) -> Result<f64> {
    let normalized = raw.trim().replace(',', ".");
    let value = normalized.parse::<f64>().map_err(|_| {
        AppError::ParseError(format!("nieprawidłowa liczba: '{}'", raw.trim()))
    })?;
    if !value.is_finite() {
        return Err(AppError::ParseError(format!(
            "nieprawidłowa liczba: '{}'",
            raw.trim()
        )));
    }
    Ok(value)
}

/// Parse a date using the first matching layout in [`DATE_FORMATS`].
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}
