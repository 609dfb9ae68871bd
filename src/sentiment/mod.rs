// Finance-lexicon sentiment counts.
//
// Tokens are matched against three category lists (positive, negative,
// uncertainty). The net sentiment score is positive hits minus negative
// hits; uncertainty hits are reported separately as the risk count.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;

use crate::lexicon::loughran::load_word_column;
use crate::text::tokenize_alpha;

/// Lowercase category word sets.
#[derive(Debug, Clone, Default)]
pub struct SentimentLexicon {
    pub positive: HashSet<String>,
    pub negative: HashSet<String>,
    pub uncertainty: HashSet<String>,
}

impl SentimentLexicon {
    /// Load the three split category lists (each a CSV with a `Word` column).
    pub fn load(positive: &Path, negative: &Path, uncertainty: &Path) -> Result<Self> {
        Ok(Self {
            positive: load_word_column(positive)?,
            negative: load_word_column(negative)?,
            uncertainty: load_word_column(uncertainty)?,
        })
    }

    /// Build from in-memory words; lowercased like the file loader.
    pub fn from_words(positive: &[&str], negative: &[&str], uncertainty: &[&str]) -> Self {
        let set = |words: &[&str]| -> HashSet<String> { words.iter().map(|w| w.to_lowercase()).collect() };
        Self {
            positive: set(positive),
            negative: set(negative),
            uncertainty: set(uncertainty),
        }
    }

    /// Count category hits in one transcript.
    pub fn score(&self, text: &str) -> SentimentScore {
        let mut score = SentimentScore::default();
        for token in tokenize_alpha(text) {
            if self.positive.contains(&token) {
                score.positive_count += 1;
            }
            if self.negative.contains(&token) {
                score.negative_count += 1;
            }
            if self.uncertainty.contains(&token) {
                score.risk_count += 1;
            }
        }
        score.sentiment_score = score.positive_count as i64 - score.negative_count as i64;
        score
    }
}

/// Category counts for one transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentScore {
    /// positive_count − negative_count
    pub sentiment_score: i64,
    pub positive_count: usize,
    pub negative_count: usize,
    /// Uncertainty-category hits
    pub risk_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_counts_each_category() {
        let lex = SentimentLexicon::from_words(
            &["GAIN", "strong"],
            &["loss", "decline"],
            &["uncertain", "may"],
        );
        let s = lex.score("Strong gains? No: a strong GAIN, one loss, and we may see a decline. Uncertain!");
        assert_eq!(s.positive_count, 3);
        assert_eq!(s.negative_count, 2);
        assert_eq!(s.risk_count, 2);
        assert_eq!(s.sentiment_score, 1);
    }

    #[test]
    fn test_word_in_two_categories_counts_in_both() {
        let lex = SentimentLexicon::from_words(&["volatile"], &["volatile"], &["volatile"]);
        let s = lex.score("volatile");
        assert_eq!((s.positive_count, s.negative_count, s.risk_count), (1, 1, 1));
        assert_eq!(s.sentiment_score, 0);
    }
}
