// Curated word lists: exposure unigrams and finance sentiment categories.

pub mod loughran;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// An ordered, de-duplicated list of lexicon terms.
///
/// Order is kept so per-term breakdowns print in the same order as the
/// source list.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexicon {
    terms: Vec<String>,
}

impl Lexicon {
    /// Load one term per line from a text file.
    ///
    /// Lines are trimmed, blanks skipped, and repeated terms kept once.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lexicon: {}", path.display()))?;

        let lexicon = Self::from_terms(raw.lines());
        if lexicon.is_empty() {
            anyhow::bail!("Lexicon {} contains no terms", path.display());
        }

        info!(path = %path.display(), terms = lexicon.len(), "Loaded lexicon");
        Ok(lexicon)
    }

    /// Build a lexicon from in-memory terms with the same rules as `load`.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Self { terms }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t == term)
    }

    /// Write the lexicon back out, one term per line.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut body = self.terms.join("\n");
        body.push('\n');
        std::fs::write(path, body)
            .with_context(|| format!("Failed to write lexicon: {}", path.display()))
    }
}
