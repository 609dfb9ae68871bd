// Lexicon exposure scoring: how much a transcript talks about a word list.
//
// Two scorers share one trait: equal-weighted term frequency and TF-IDF
// weighted term frequency. The batch runner in `pipeline::exposure` drives
// either one over a transcript directory with checkpoint/resume.

pub mod checkpoint;
pub mod equal;
pub mod tfidf;
pub mod traits;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which exposure formula a run uses. Stored in checkpoints so a resume
/// can't silently mix methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposureMethod {
    /// Total lexicon hits divided by lexicon size
    Equal,
    /// Sum of per-term TF × corpus IDF divided by lexicon size
    Tfidf,
}

impl ExposureMethod {
    /// Output column used when the caller doesn't name one.
    pub fn default_column(self) -> &'static str {
        match self {
            ExposureMethod::Equal => "ph_expo_ew",
            ExposureMethod::Tfidf => "cc_expo_tfidf",
        }
    }

    /// Files per checkpointed batch when the caller doesn't choose.
    /// TF-IDF batches are smaller because each batch fans out in parallel.
    pub fn default_batch_size(self) -> usize {
        match self {
            ExposureMethod::Equal => 100,
            ExposureMethod::Tfidf => 20,
        }
    }
}

impl fmt::Display for ExposureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExposureMethod::Equal => write!(f, "equal-weighted"),
            ExposureMethod::Tfidf => write!(f, "tf-idf"),
        }
    }
}

/// Round to three decimal places, the precision exposures are reported at.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
