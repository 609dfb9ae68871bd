// Company-name normalization for joining transcripts against other datasets.
//
// Names from different vendors disagree on punctuation, case, legal
// suffixes and abbreviations. Normalizing all of them the same way gives a
// stable `formatted_name` join key.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::info;

use crate::sheet::{self, Cell};

/// Output column added by `normalize_file`.
pub const FORMATTED_COLUMN: &str = "formatted_name";

/// Legal-form suffixes removed as whole words.
pub const SUFFIXES: &[&str] = &["Inc", "Corp", "Ltd", "LLC", "PLC", "Co", "Limited"];

/// Abbreviation → expansion, applied as whole words.
pub const ABBREVIATIONS: &[(&str, &str)] = &[
    ("Intl", "International"),
    ("Tech", "Technology"),
    ("Sys", "Systems"),
    ("Mfg", "Manufacturing"),
    ("Inds", "Industries"),
];

static NON_ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s]").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\b(?:{})\b", SUFFIXES.join("|"))).unwrap());
static ABBREVIATION_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    ABBREVIATIONS
        .iter()
        .map(|(abbr, full)| (Regex::new(&format!(r"(?i)\b{abbr}\b")).unwrap(), *full))
        .collect()
});

/// Strip everything but ASCII letters, digits and whitespace, then collapse
/// whitespace.
pub fn clean_company_name(name: &str) -> String {
    let stripped = NON_ALNUM_RE.replace_all(name, "");
    collapse_whitespace(&stripped)
}

/// Title-case: the first letter of each alphabetic run is uppercased and
/// the rest lowercased, so digits start a new run (`3m` → `3M`).
pub fn standardize_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_is_letter = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Remove legal-form suffixes anywhere in the name, case-insensitively.
pub fn remove_suffixes(name: &str) -> String {
    let removed = SUFFIX_RE.replace_all(name, "");
    collapse_whitespace(&removed)
}

/// Expand common abbreviations, case-insensitively.
pub fn handle_abbreviations(name: &str) -> String {
    let mut out = name.to_string();
    for (re, full) in ABBREVIATION_RES.iter() {
        out = re.replace_all(&out, *full).into_owned();
    }
    out
}

/// Full normalization: clean → title-case → drop suffixes → expand
/// abbreviations.
pub fn format_company_name(name: &str) -> String {
    let name = clean_company_name(name);
    let name = standardize_case(&name);
    let name = remove_suffixes(&name);
    handle_abbreviations(&name)
}

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RE.replace_all(s, " ").trim().to_string()
}

/// Add a `formatted_name` column derived from `column` and write the sheet.
///
/// Missing names produce an empty formatted name. Returns the row count.
pub fn normalize_file(input: &Path, output: &Path, column: &str) -> Result<usize> {
    let mut table = sheet::read_table(input)?;

    let formatted: Vec<Cell> = table
        .column(column)?
        .into_iter()
        .map(|c| {
            if c.is_missing() {
                Cell::Empty
            } else {
                Cell::Text(format_company_name(&c.to_string()))
            }
        })
        .collect();

    table.set_column(FORMATTED_COLUMN, formatted)?;
    sheet::write_table(&table, output)?;

    info!(rows = table.len(), output = %output.display(), "Company names normalized");
    Ok(table.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_company_name() {
        assert_eq!(clean_company_name("  AT&T,   Inc. "), "ATT Inc");
    }

    #[test]
    fn test_standardize_case() {
        assert_eq!(standardize_case("ACME gold MINES"), "Acme Gold Mines");
        assert_eq!(standardize_case("3m co"), "3M Co");
    }

    #[test]
    fn test_remove_suffixes_is_whole_word() {
        assert_eq!(remove_suffixes("Costco Wholesale Corp"), "Costco Wholesale");
        assert_eq!(remove_suffixes("Co Incorporated Ltd"), "Incorporated");
    }

    #[test]
    fn test_handle_abbreviations() {
        assert_eq!(handle_abbreviations("Acme Intl Tech"), "Acme International Technology");
        assert_eq!(handle_abbreviations("Techne Sys"), "Techne Systems");
    }

    #[test]
    fn test_format_company_name() {
        assert_eq!(format_company_name("INTL. BUSINESS MACHINES CORP."), "International Business Machines");
        assert_eq!(format_company_name("acme mfg co., ltd"), "Acme Manufacturing");
        assert_eq!(format_company_name("!!!"), "");
    }
}
