// Exposure scorer trait: one interface for every lexicon weighting scheme.
//
// Scorers are pure and synchronous: the batch runner reads files and moves
// scoring onto blocking threads, so implementations only see text.

use super::ExposureMethod;

/// Trait for scoring a transcript's exposure to a lexicon.
pub trait ExposureScorer: Send + Sync {
    /// Which formula this scorer implements.
    fn method(&self) -> ExposureMethod;

    /// Score one raw transcript. Cleaning is the scorer's job.
    fn score(&self, text: &str) -> f64;
}
