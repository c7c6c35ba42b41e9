//! CSV codec for entity exports.
//!
//! Encoding takes its header row from the first record; records are assumed
//! to share one field set, and fields absent from the first record are not
//! exported. Decoding yields string values only, so numbers and booleans do
//! not survive a round trip with their original type. Quoted fields may not
//! span lines.

use serde_json::Value;

use super::record::{Record, stringify};
use crate::error::BackupError;

/// Serialize records as CSV text. An empty slice yields an empty string.
pub fn encode(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let headers: Vec<&String> = first.keys().collect();
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| h.as_str())
            .collect::<Vec<_>>()
            .join(","),
    );

    for record in records {
        let row: Vec<String> = headers
            .iter()
            .map(|h| escape_field(&record.get(*h).map(stringify).unwrap_or_default()))
            .collect();
        lines.push(row.join(","));
    }

    lines.join("\n")
}

/// Parse CSV text into records keyed by the header row.
///
/// Blank lines are skipped. Rows shorter than the header are padded with
/// empty strings; cells past the last header are dropped.
pub fn decode(text: &str) -> Result<Vec<Record>, BackupError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header_line = lines
        .next()
        .ok_or_else(|| BackupError::MalformedInput("CSV has no header row".to_string()))?;
    let headers: Vec<String> = header_line
        .split(',')
        .map(|h| h.trim().trim_matches('"').trim().to_string())
        .collect();

    let records: Vec<Record> = lines
        .map(|line| {
            let mut cells = parse_row(line).into_iter();
            headers
                .iter()
                .map(|h| (h.clone(), Value::String(cells.next().unwrap_or_default())))
                .collect()
        })
        .collect();

    if records.is_empty() {
        return Err(BackupError::MalformedInput(
            "CSV has a header but no data rows".to_string(),
        ));
    }
    Ok(records)
}

/// Quote-wrap a cell if it contains a comma or quote, doubling inner quotes.
fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Split one CSV line into trimmed cells, honouring quoted regions.
fn parse_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());

    cells
}
