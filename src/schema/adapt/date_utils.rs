//! Module for parsing dates stored as text.

use chrono::NaiveDate;

/// Date formats tried, in order, when a date column is stored as text
#[derive(Debug, Clone)]
pub struct DateFormatConfig {
    /// List of date format strings to try when parsing dates
    pub date_formats: Vec<String>,
}

impl Default for DateFormatConfig {
    fn default() -> Self {
        Self {
            date_formats: vec![
                "%Y-%m-%d".to_string(), // ISO format: 2023-01-15
                "%Y%m%d".to_string(),   // Compact: 20230115
                "%Y/%m/%d".to_string(), // 2023/01/15
            ],
        }
    }
}

/// Parse a date string with multiple format attempts
///
/// Datetime strings ("2023-01-15 08:30:00", "2023-01-15T08:30:00") are
/// truncated to their date part.
#[must_use]
pub fn parse_date_string(s: &str, config: &DateFormatConfig) -> Option<NaiveDate> {
    let trimmed = s.trim();
    let date_part = trimmed
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);

    config
        .date_formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}
