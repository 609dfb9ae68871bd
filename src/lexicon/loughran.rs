// Loughran-McDonald master dictionary split.
//
// The master dictionary is one big CSV with a row per word and a numeric
// column per sentiment category (non-zero = member, the value is the year
// the word was added). The sentiment scorer only needs three of those
// categories as plain word lists.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::Lexicon;

/// Category columns we extract, paired with the output file stem.
pub const CATEGORIES: &[(&str, &str)] = &[
    ("Positive", "positive_words"),
    ("Negative", "negative_words"),
    ("Uncertainty", "uncertainty_words"),
];

/// Split the master dictionary into per-category word lists.
///
/// Writes `<stem>.csv` (single `Word` column) and `<stem>.txt` (one word
/// per line) for each category into `out_dir`. Returns the CSV paths in
/// category order.
pub fn split_loughran_mcdonald(master_csv: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut rdr = csv::Reader::from_path(master_csv)
        .with_context(|| format!("Failed to open word list: {}", master_csv.display()))?;

    let headers = rdr.headers()?.clone();
    let word_idx = header_position(&headers, "Word")?;
    let category_idx: Vec<usize> = CATEGORIES
        .iter()
        .map(|(col, _)| header_position(&headers, col))
        .collect::<Result<_>>()?;

    let mut buckets: Vec<Vec<String>> = vec![Vec::new(); CATEGORIES.len()];
    for (line, record) in rdr.records().enumerate() {
        let record = record
            .with_context(|| format!("Bad record {} in {}", line + 1, master_csv.display()))?;
        let word = record.get(word_idx).unwrap_or("").trim();
        if word.is_empty() {
            continue;
        }
        for (bucket, &idx) in buckets.iter_mut().zip(&category_idx) {
            let value: f64 = record.get(idx).unwrap_or("").trim().parse().unwrap_or(0.0);
            if value > 0.0 {
                bucket.push(word.to_string());
            }
        }
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create directory: {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(CATEGORIES.len());
    for ((column, stem), words) in CATEGORIES.iter().zip(buckets) {
        let csv_path = out_dir.join(format!("{stem}.csv"));
        let mut wtr = csv::Writer::from_path(&csv_path)
            .with_context(|| format!("Failed to create {}", csv_path.display()))?;
        wtr.write_record(["Word"])?;
        for w in &words {
            wtr.write_record([w])?;
        }
        wtr.flush()?;

        Lexicon::from_terms(&words).save(&out_dir.join(format!("{stem}.txt")))?;

        info!(category = *column, words = words.len(), path = %csv_path.display(), "Category list written");
        written.push(csv_path);
    }

    Ok(written)
}

/// Read the `Word` column of a split category list into a lowercase set.
///
/// The master dictionary is uppercase while the tokenizer lowercases
/// transcript text, so the set is lowercased on load.
pub fn load_word_column(path: &Path) -> Result<HashSet<String>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open word list: {}", path.display()))?;
    let idx = header_position(rdr.headers()?, "Word")?;

    let mut words = HashSet::new();
    for record in rdr.records() {
        let record = record.with_context(|| format!("Bad record in {}", path.display()))?;
        if let Some(w) = record.get(idx) {
            let w = w.trim();
            if !w.is_empty() {
                words.insert(w.to_lowercase());
            }
        }
    }
    Ok(words)
}

fn header_position(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| anyhow::anyhow!("Word list is missing the '{name}' column"))
}
