// Sheet writers: .xlsx via rust_xlsxwriter, .csv via the csv crate.
//
// Output never carries an index column: the header row followed by the data
// rows, exactly as the next script in the chain expects to read them.

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use super::reader::extension;
use super::{Cell, Table};

/// Write a table to `.xlsx` or `.csv`, creating parent directories as needed.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    match extension(path).as_str() {
        "xlsx" => write_xlsx(table, path)?,
        "csv" => write_csv(table, path)?,
        other => anyhow::bail!(
            "Unsupported output format '{}' for {} (expected .xlsx or .csv)",
            other,
            path.display()
        ),
    }

    info!(path = %path.display(), rows = table.len(), "Table written");
    Ok(())
}

/// Largest integer magnitude an xlsx number cell holds exactly.
const MAX_EXACT_INT: u64 = 1 << 53;

fn write_xlsx(table: &Table, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (col, header) in table.headers.iter().enumerate() {
        sheet.write_string(0, col_index(col)?, header)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let xl_row = u32::try_from(r + 1).context("Too many rows for an .xlsx sheet")?;
        for (c, cell) in row.iter().enumerate() {
            let xl_col = col_index(c)?;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    sheet.write_string(xl_row, xl_col, s)?;
                }
                Cell::Int(i) if i.unsigned_abs() <= MAX_EXACT_INT => {
                    sheet.write_number(xl_row, xl_col, *i as f64)?;
                }
                // Past 2^53 an f64 cell would round the value; keep the digits
                Cell::Int(i) => {
                    sheet.write_string(xl_row, xl_col, &i.to_string())?;
                }
                Cell::Number(n) if n.is_finite() => {
                    sheet.write_number(xl_row, xl_col, *n)?;
                }
                // NaN and infinities have no xlsx representation; leave blank
                Cell::Number(_) => {}
                Cell::Bool(b) => {
                    sheet.write_boolean(xl_row, xl_col, *b)?;
                }
                Cell::Date(d) => {
                    sheet.write_datetime_with_format(xl_row, xl_col, d, &date_format)?;
                }
                Cell::DateTime(dt) => {
                    sheet.write_datetime_with_format(xl_row, xl_col, dt, &datetime_format)?;
                }
            }
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save workbook: {}", path.display()))?;
    Ok(())
}

fn col_index(col: usize) -> Result<u16> {
    u16::try_from(col).context("Too many columns for an .xlsx sheet")
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV: {}", path.display()))?;

    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|c| c.to_string()))?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to flush CSV: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::read_table;

    #[test]
    fn test_xlsx_keeps_large_integers_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.xlsx");
        let table = Table::new(
            vec!["gvkey".to_string()],
            vec![vec![Cell::Int(9_007_199_254_740_993)], vec![Cell::Int(42)]],
        );

        write_table(&table, &path).unwrap();
        let reread = read_table(&path).unwrap();
        assert_eq!(reread.rows[0][0], Cell::from("9007199254740993"));
        assert_eq!(reread.rows[1][0].as_f64(), Some(42.0));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_table(&Table::default(), &dir.path().join("out.parquet")).unwrap_err();
        assert!(err.to_string().contains("parquet"));
    }
}
