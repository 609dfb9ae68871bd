// Equal-weighted exposure: every lexicon term counts the same.
//
// Each term is matched as a whole word (word boundaries on both sides,
// literal text, case-sensitive) against the whitespace-normalized
// transcript. The exposure is the total hit count divided by the number
// of terms in the lexicon, so it reads as "average hits per term".

use anyhow::{Context, Result};
use regex::Regex;

use super::traits::ExposureScorer;
use super::ExposureMethod;
use crate::lexicon::Lexicon;
use crate::text::clean_text;

/// Scorer with one pre-compiled whole-word pattern per lexicon term.
pub struct EqualWeightedScorer {
    patterns: Vec<(String, Regex)>,
}

impl EqualWeightedScorer {
    pub fn new(lexicon: &Lexicon) -> Result<Self> {
        let patterns = lexicon
            .terms()
            .iter()
            .map(|term| {
                let pattern = format!(r"\b{}\b", regex::escape(term));
                let re = Regex::new(&pattern)
                    .with_context(|| format!("Failed to build pattern for term '{term}'"))?;
                Ok((term.clone(), re))
            })
            .collect::<Result<_>>()?;
        Ok(Self { patterns })
    }

    /// Hit count per lexicon term, in lexicon order.
    pub fn term_counts(&self, text: &str) -> Vec<(&str, usize)> {
        let cleaned = clean_text(text);
        self.patterns
            .iter()
            .map(|(term, re)| (term.as_str(), re.find_iter(&cleaned).count()))
            .collect()
    }
}

impl ExposureScorer for EqualWeightedScorer {
    fn method(&self) -> ExposureMethod {
        ExposureMethod::Equal
    }

    fn score(&self, text: &str) -> f64 {
        let total: usize = self.term_counts(text).iter().map(|(_, n)| n).sum();
        equal_weighted_exposure(total, self.patterns.len())
    }
}

/// Total hits over lexicon size; zero when nothing matched or the lexicon
/// is empty.
pub fn equal_weighted_exposure(total_count: usize, lexicon_len: usize) -> f64 {
    if total_count == 0 || lexicon_len == 0 {
        return 0.0;
    }
    total_count as f64 / lexicon_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_matching() {
        let lexicon = Lexicon::from_terms(["flood", "heat"]);
        let scorer = EqualWeightedScorer::new(&lexicon).unwrap();

        let counts = scorer.term_counts("flood floods heat heatwave flood");
        assert_eq!(counts, vec![("flood", 2), ("heat", 1)]);
        assert!((scorer.score("flood floods heat heatwave flood") - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_case_sensitive() {
        let lexicon = Lexicon::from_terms(["carbon"]);
        let scorer = EqualWeightedScorer::new(&lexicon).unwrap();
        assert_eq!(scorer.score("Carbon CARBON"), 0.0);
    }

    #[test]
    fn test_multiword_term_spans_collapsed_whitespace() {
        let lexicon = Lexicon::from_terms(["climate change", "storm"]);
        let scorer = EqualWeightedScorer::new(&lexicon).unwrap();
        assert!((scorer.score("climate\n\n   change ahead") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_special_characters_are_literal() {
        let lexicon = Lexicon::from_terms(["co2.e"]);
        let scorer = EqualWeightedScorer::new(&lexicon).unwrap();
        assert_eq!(scorer.score("co2xe"), 0.0);
        assert_eq!(scorer.score("co2.e"), 1.0);
    }
}
