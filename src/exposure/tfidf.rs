// TF-IDF weighted exposure.
//
// Two passes over the corpus:
//   1. Document frequency: for each lexicon term, how many transcripts
//      contain it at least once. idf = ln(N / df), or 0 for unseen terms.
//   2. Per document: tf = term count / total tokens, and the exposure is
//      sum(tf * idf) over the lexicon, divided by lexicon size and rounded
//      to three decimals.
//
// Tokens are the whitespace-separated words of the cleaned transcript, so
// only single-word lexicon terms can ever match here.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::traits::ExposureScorer;
use super::{round3, ExposureMethod};
use crate::lexicon::Lexicon;
use crate::text::clean_text;

/// Corpus IDF per lexicon term. Ordered so the JSON side file is stable.
pub type IdfTable = BTreeMap<String, f64>;

/// Count lexicon-term tokens in a transcript.
///
/// Returns the per-term counts (terms that never occur are absent) and the
/// total number of tokens in the document.
pub fn count_terms<'a>(text: &str, terms: &'a HashSet<String>) -> (HashMap<&'a str, usize>, usize) {
    let cleaned = clean_text(text);
    let mut counts: HashMap<&'a str, usize> = HashMap::new();
    let mut total = 0;

    for word in cleaned.split_whitespace() {
        total += 1;
        if let Some(term) = terms.get(word) {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }
    }

    (counts, total)
}

/// The set of lexicon terms present at least once in a transcript.
pub fn document_terms(text: &str, terms: &HashSet<String>) -> HashSet<String> {
    let cleaned = clean_text(text);
    cleaned
        .split_whitespace()
        .filter(|w| terms.contains(*w))
        .map(|w| w.to_string())
        .collect()
}

/// Turn document frequencies into an IDF table covering every lexicon term.
pub fn idf_from_document_frequency(
    lexicon: &Lexicon,
    doc_freq: &HashMap<String, usize>,
    n_docs: usize,
) -> IdfTable {
    lexicon
        .terms()
        .iter()
        .map(|term| {
            let df = doc_freq.get(term).copied().unwrap_or(0);
            let idf = if df > 0 && n_docs > 0 {
                (n_docs as f64 / df as f64).ln()
            } else {
                0.0
            };
            (term.clone(), idf)
        })
        .collect()
}

/// First pass: compute corpus IDF over every transcript.
///
/// Files are read concurrently (up to `concurrency` at a time) on blocking
/// threads. Any unreadable file fails the whole pass.
pub async fn compute_idf(
    files: &[PathBuf],
    lexicon: &Lexicon,
    concurrency: usize,
) -> Result<IdfTable> {
    let terms: Arc<HashSet<String>> = Arc::new(lexicon.terms().iter().cloned().collect());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  IDF     [{bar:30}] {pos}/{len} ({eta})")
            .unwrap(),
    );

    let results: Vec<Result<HashSet<String>>> = stream::iter(files.iter().cloned().map(|path| {
        let terms = Arc::clone(&terms);
        let pb = pb.clone();
        async move {
            let handle = tokio::task::spawn_blocking(move || -> Result<HashSet<String>> {
                let text = read_transcript(&path)?;
                Ok(document_terms(&text, &terms))
            });
            let result = match handle.await {
                Ok(r) => r,
                Err(e) => Err(anyhow::anyhow!("IDF task failed: {e}")),
            };
            pb.inc(1);
            result
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;
    pb.finish_and_clear();

    let mut doc_freq: HashMap<String, usize> = HashMap::new();
    for present in results {
        for term in present? {
            *doc_freq.entry(term).or_insert(0) += 1;
        }
    }

    let idf = idf_from_document_frequency(lexicon, &doc_freq, files.len());
    info!(
        documents = files.len(),
        terms_seen = doc_freq.len(),
        terms = lexicon.len(),
        "Computed corpus IDF"
    );
    Ok(idf)
}

/// Persist an IDF table as JSON.
pub fn save_idf(idf: &IdfTable, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(idf)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write IDF table: {}", path.display()))
}

/// Load an IDF table saved by `save_idf`.
pub fn load_idf(path: &Path) -> Result<IdfTable> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read IDF table: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("IDF table is not valid JSON: {}", path.display()))
}

/// Read a transcript, replacing invalid UTF-8 rather than failing on it.
pub fn read_transcript(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read transcript: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Second-pass scorer holding the lexicon and a finished IDF table.
pub struct TfIdfScorer {
    terms: HashSet<String>,
    idf: IdfTable,
    lexicon_len: usize,
}

impl TfIdfScorer {
    pub fn new(lexicon: &Lexicon, idf: IdfTable) -> Self {
        Self {
            terms: lexicon.terms().iter().cloned().collect(),
            idf,
            lexicon_len: lexicon.len(),
        }
    }

    /// Per-term TF × IDF contributions for one document.
    pub fn term_scores(&self, text: &str) -> HashMap<String, f64> {
        let (counts, total) = count_terms(text, &self.terms);
        if total == 0 {
            return HashMap::new();
        }
        counts
            .into_iter()
            .map(|(term, count)| {
                let tf = count as f64 / total as f64;
                let idf = self.idf.get(term).copied().unwrap_or(0.0);
                (term.to_string(), tf * idf)
            })
            .collect()
    }
}

impl ExposureScorer for TfIdfScorer {
    fn method(&self) -> ExposureMethod {
        ExposureMethod::Tfidf
    }

    fn score(&self, text: &str) -> f64 {
        if self.lexicon_len == 0 {
            return 0.0;
        }
        let total: f64 = self.term_scores(text).values().sum();
        round3(total / self.lexicon_len as f64)
    }
}
