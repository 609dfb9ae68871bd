// Sheet readers: spreadsheet workbooks via calamine, CSV via the csv crate.

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::Timelike;
use tracing::debug;

use super::{Cell, Table};

/// Read a table from a spreadsheet or CSV file, picking the format by extension.
///
/// Workbooks are read from their first worksheet and the first row becomes
/// the header.
pub fn read_table(path: &Path) -> Result<Table> {
    let ext = extension(path);
    let table = match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(path)?,
        "csv" => read_csv(path)?,
        _ => anyhow::bail!(
            "Unsupported sheet format '{}' for {} (expected .xlsx, .xls, .ods or .csv)",
            ext,
            path.display()
        ),
    };

    debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.headers.len(),
        "Loaded table"
    );
    Ok(table)
}

pub(crate) fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

fn read_workbook(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow::anyhow!("Workbook has no worksheets: {}", path.display()))?
        .with_context(|| format!("Failed to read first worksheet of {}", path.display()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|c| c.to_string()).collect(),
        None => return Ok(Table::default()),
    };

    let data = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(Table::new(headers, data))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(value) if value.num_seconds_from_midnight() == 0 && value.nanosecond() == 0 => {
                Cell::Date(value.date())
            }
            Some(value) => Cell::DateTime(value),
            None => Cell::Text(data.to_string()),
        },
        // Durations, ISO strings and error cells are carried as their display text
        other => Cell::Text(other.to_string()),
    }
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV: {}", path.display()))?;

    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("Failed to read CSV header of {}", path.display()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record =
            record.with_context(|| format!("Bad CSV record {} in {}", i + 1, path.display()))?;
        rows.push(record.iter().map(parse_csv_field).collect());
    }

    Ok(Table::new(headers, rows))
}

/// Infer a cell type from a CSV field.
///
/// Identifiers with leading zeros stay text so `007` doesn't become `7`.
pub(crate) fn parse_csv_field(field: &str) -> Cell {
    if field.is_empty() {
        return Cell::Empty;
    }
    let has_leading_zero = field.len() > 1 && field.starts_with('0') && !field.starts_with("0.");
    if !has_leading_zero {
        if let Ok(i) = field.parse::<i64>() {
            return Cell::Int(i);
        }
        if let Ok(f) = field.parse::<f64>() {
            if f.is_finite() {
                return Cell::Number(f);
            }
        }
    }
    Cell::Text(field.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_field() {
        assert_eq!(parse_csv_field(""), Cell::Empty);
        assert_eq!(parse_csv_field("42"), Cell::Int(42));
        assert_eq!(parse_csv_field("0.25"), Cell::Number(0.25));
        assert_eq!(parse_csv_field("007"), Cell::from("007"));
        assert_eq!(parse_csv_field("Q1 2020"), Cell::from("Q1 2020"));
        assert_eq!(parse_csv_field("inf"), Cell::from("inf"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = read_table(Path::new("data.parquet")).unwrap_err();
        assert!(err.to_string().contains("Unsupported sheet format"));
    }
}
