// Sector classification by company-name keywords.
//
// Two passes over a company sheet:
//   1. Propagate: a company whose sector is known on one row gets that
//      sector on every other row with the same name.
//   2. Keywords: rows still unclassified take the sector of the first
//      keyword (in table order) found in the uppercased company name.
// Rows that already carry a sector are never overwritten.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use crate::sheet::{self, Cell, Table};

/// Default company-name column.
pub const DEFAULT_NAME_COLUMN: &str = "company_name";
/// Default sector column.
pub const DEFAULT_SECTOR_COLUMN: &str = "LEVEL 2 SECTOR CLASSIFICATION";

/// Keyword → sector rules, checked in order. A trailing `*` marks a stem.
///
/// SYSTEM (Technology) precedes SYSTEMS (Industrials); whole-word matching
/// keeps them apart.
pub const DEFAULT_KEYWORDS: &[(&str, &str)] = &[
    ("TECHNOLOGIES", "Technology"),
    ("TECHNOLOGY", "Technology"),
    ("BIOTECHNOLOGY", "Healthcare"),
    ("SOFTWARE", "Technology"),
    ("SYSTEM", "Technology"),
    ("HEALTH", "Healthcare"),
    ("PHARMA", "Healthcare"),
    ("PHARMACEUTICALS", "Healthcare"),
    ("ENERGY", "Energy"),
    ("ENERGIES", "Energy"),
    ("INDUSTRIES", "Industrials"),
    ("INDUSTRIAL", "Industrials"),
    ("AIR", "Industrials"),
    ("POWER", "Industrials"),
    ("CAPITAL", "Financials"),
    ("ASSET", "Financials"),
    ("EXCHANGE", "Financials"),
    ("SYSTEMS", "Industrials"),
    ("PROPERTY", "Real Estate"),
    ("FINANCIAL", "Financials"),
    ("FINANCE", "Financials"),
    ("MATERIALS", "Basic Materials"),
    ("INVESTOR", "Financials"),
    ("INVESTMENT", "Financials"),
    ("GAMING", "Technology"),
    ("ELECTR*", "Industrials"),
    ("GOLD", "Industrials"),
];

struct Rule {
    keyword: String,
    sector: String,
    pattern: Regex,
}

/// Ordered keyword matcher.
pub struct SectorClassifier {
    rules: Vec<Rule>,
}

impl SectorClassifier {
    /// Build a classifier from `(keyword, sector)` pairs, keeping their order.
    pub fn from_pairs<K, S>(pairs: impl IntoIterator<Item = (K, S)>) -> Result<Self>
    where
        K: AsRef<str>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for (keyword, sector) in pairs {
            let keyword = keyword.as_ref().trim().to_uppercase();
            if keyword.is_empty() || keyword == "*" {
                anyhow::bail!("Empty sector keyword");
            }
            let pattern = match keyword.strip_suffix('*') {
                Some(stem) => format!(r"\b{}", regex::escape(stem)),
                None => format!(r"\b{}\b", regex::escape(&keyword)),
            };
            let pattern = Regex::new(&pattern)
                .with_context(|| format!("Invalid sector keyword '{keyword}'"))?;
            rules.push(Rule {
                keyword,
                sector: sector.as_ref().to_string(),
                pattern,
            });
        }
        Ok(Self { rules })
    }

    /// Load rules from a JSON array of `[keyword, sector]` pairs.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sector keywords: {}", path.display()))?;
        let pairs: Vec<(String, String)> = serde_json::from_str(&raw).with_context(|| {
            format!(
                "Sector keywords must be a JSON array of [keyword, sector] pairs: {}",
                path.display()
            )
        })?;
        let classifier = Self::from_pairs(pairs)?;
        info!(path = %path.display(), rules = classifier.len(), "Loaded sector keywords");
        Ok(classifier)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Sector of the first keyword found in the name, if any.
    pub fn classify(&self, company_name: &str) -> Option<&str> {
        self.matching_rule(company_name).map(|(_, sector)| sector)
    }

    /// The first matching `(keyword, sector)` pair.
    pub fn matching_rule(&self, company_name: &str) -> Option<(&str, &str)> {
        let upper = company_name.to_uppercase();
        self.rules
            .iter()
            .find(|r| r.pattern.is_match(&upper))
            .map(|r| (r.keyword.as_str(), r.sector.as_str()))
    }
}

impl Default for SectorClassifier {
    fn default() -> Self {
        // The built-in table is made of plain uppercase words, so this
        // cannot fail.
        Self::from_pairs(DEFAULT_KEYWORDS.iter().copied())
            .expect("built-in sector keywords are valid")
    }
}

/// How a classification pass changed the sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationReport {
    pub rows: usize,
    /// Rows that already had a sector
    pub already_classified: usize,
    /// Rows filled from another row with the same company name
    pub filled_by_propagation: usize,
    /// Rows filled by a keyword match
    pub filled_by_keyword: usize,
    /// Rows still without a sector
    pub unclassified: usize,
}

/// Copy known sectors onto same-named rows that lack one.
///
/// The first known sector in row order wins. Blank names never propagate.
/// Returns the number of rows filled.
pub fn propagate_known(names: &[String], sectors: &mut [Option<String>]) -> usize {
    let mut known: HashMap<&str, String> = HashMap::new();
    for (name, sector) in names.iter().zip(sectors.iter()) {
        if let Some(sector) = sector {
            if !name.trim().is_empty() {
                known.entry(name.as_str()).or_insert_with(|| sector.clone());
            }
        }
    }

    let mut filled = 0;
    for (name, sector) in names.iter().zip(sectors.iter_mut()) {
        if sector.is_none() {
            if let Some(found) = known.get(name.as_str()) {
                *sector = Some(found.clone());
                filled += 1;
            }
        }
    }
    filled
}

/// Fill remaining gaps by keyword match. Returns the number of rows filled.
pub fn assign_by_keyword(
    classifier: &SectorClassifier,
    names: &[String],
    sectors: &mut [Option<String>],
) -> usize {
    let mut filled = 0;
    for (name, sector) in names.iter().zip(sectors.iter_mut()) {
        if sector.is_none() {
            if let Some(found) = classifier.classify(name) {
                *sector = Some(found.to_string());
                filled += 1;
            }
        }
    }
    filled
}

/// Run both passes over a table in place.
///
/// The sector column is created empty if the sheet doesn't have one yet.
pub fn classify_table(
    table: &mut Table,
    classifier: &SectorClassifier,
    name_column: &str,
    sector_column: &str,
) -> Result<ClassificationReport> {
    let names: Vec<String> = table
        .column(name_column)?
        .into_iter()
        .map(|c| if c.is_missing() { String::new() } else { c.to_string() })
        .collect();

    if table.column_index(sector_column).is_none() {
        table.set_column(sector_column, vec![Cell::Empty; table.len()])?;
    }
    let original: Vec<Cell> = table.column(sector_column)?.into_iter().cloned().collect();

    let mut sectors: Vec<Option<String>> = original
        .iter()
        .map(|c| if c.is_missing() { None } else { Some(c.to_string()) })
        .collect();
    let already_classified = sectors.iter().filter(|s| s.is_some()).count();

    let filled_by_propagation = propagate_known(&names, &mut sectors);
    let filled_by_keyword = assign_by_keyword(classifier, &names, &mut sectors);

    // Keep the original cells untouched; only gaps get new text
    let cells = original
        .into_iter()
        .zip(&sectors)
        .map(|(cell, sector)| match (cell.is_missing(), sector) {
            (true, Some(s)) => Cell::Text(s.clone()),
            _ => cell,
        })
        .collect();
    table.set_column(sector_column, cells)?;

    let report = ClassificationReport {
        rows: table.len(),
        already_classified,
        filled_by_propagation,
        filled_by_keyword,
        unclassified: sectors.iter().filter(|s| s.is_none()).count(),
    };

    info!(
        rows = report.rows,
        propagated = report.filled_by_propagation,
        keyword = report.filled_by_keyword,
        unclassified = report.unclassified,
        "Sector classification complete"
    );
    Ok(report)
}

/// Read a sheet, classify it, and write the result.
pub fn classify_file(
    input: &Path,
    output: &Path,
    classifier: &SectorClassifier,
    name_column: &str,
    sector_column: &str,
) -> Result<ClassificationReport> {
    let mut table = sheet::read_table(input)?;
    let report = classify_table(&mut table, classifier, name_column, sector_column)?;
    sheet::write_table(&table, output)?;
    Ok(report)
}
