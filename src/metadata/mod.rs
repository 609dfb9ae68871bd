// Transcript metadata scraping.
//
// Vendor transcript files are JSON, but their layout varies between
// exports, so fields are pulled straight out of the raw text with patterns
// instead of a schema.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

use crate::sheet::{Cell, Table};

/// Placeholder for a field that wasn't found.
pub const NOT_AVAILABLE: &str = "N/A";

static COMPANY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""companyid":\s*(\d+)"#).unwrap());
static COMPANY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""companyname":\s*"([^"]+)""#).unwrap());
static PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bQ[1-4]\s\d{4}\b").unwrap());

/// Fields extracted from one transcript file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptInfo {
    pub file: String,
    pub company_id: String,
    pub company_name: String,
    pub earnings_call_period: String,
}

/// Extract `(company_id, company_name, earnings_call_period)` from raw
/// text, taking the first match of each and `N/A` when absent.
pub fn extract_fields(content: &str) -> (String, String, String) {
    let capture = |re: &Regex| {
        re.captures(content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };

    let period = PERIOD_RE
        .find(content)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    (capture(&*COMPANY_ID_RE), capture(&*COMPANY_NAME_RE), period)
}

/// Files in `dir` whose names end in `json` (any case), sorted by name.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_json = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase().ends_with("json"))
            .unwrap_or(false);
        if path.is_file() && is_json {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Extract metadata from one file.
pub fn extract_from_file(path: &Path) -> Result<TranscriptInfo> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content = String::from_utf8_lossy(&bytes);
    let (company_id, company_name, earnings_call_period) = extract_fields(&content);

    if company_id == NOT_AVAILABLE {
        warn!(file = %path.display(), "No company id found");
    }

    Ok(TranscriptInfo {
        file: path.display().to_string(),
        company_id,
        company_name,
        earnings_call_period,
    })
}

/// Extract metadata for every JSON file in a directory.
pub fn extract_directory(dir: &Path) -> Result<Vec<TranscriptInfo>> {
    let files = list_json_files(dir)?;
    let infos = files
        .iter()
        .map(|f| extract_from_file(f))
        .collect::<Result<Vec<_>>>()?;
    info!(dir = %dir.display(), files = infos.len(), "Extracted transcript metadata");
    Ok(infos)
}

/// Lay extracted metadata out as a sheet.
///
/// Every column is text, so ids keep any leading zeros.
pub fn to_table(infos: &[TranscriptInfo]) -> Table {
    let headers = ["file", "company_id", "company_name", "earnings_call_period"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = infos
        .iter()
        .map(|i| {
            vec![
                Cell::from(i.file.as_str()),
                Cell::from(i.company_id.as_str()),
                Cell::from(i.company_name.as_str()),
                Cell::from(i.earnings_call_period.as_str()),
            ]
        })
        .collect();
    Table::new(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_fields() {
        let raw = r#"{"companyid": 24937, "companyname": "Apple Inc.", "headline": "Apple Inc., Q2 2021 Earnings Call, Apr 28, 2021", "x": "Q3 2021"}"#;
        let (id, name, period) = extract_fields(raw);
        assert_eq!(id, "24937");
        assert_eq!(name, "Apple Inc.");
        assert_eq!(period, "Q2 2021");
    }

    #[test]
    fn test_missing_fields_are_na() {
        let (id, name, period) = extract_fields(r#"{"title": "Q5 2021 or Q1 20211"}"#);
        assert_eq!(id, NOT_AVAILABLE);
        assert_eq!(name, NOT_AVAILABLE);
        assert_eq!(period, NOT_AVAILABLE);
    }
}
