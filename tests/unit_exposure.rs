// Unit tests for the exposure scorers and checkpoint state.
//
// Tests the pure scoring functions through the public API: equal-weighted
// whole-word counting, TF-IDF term weighting, IDF construction, and the
// checkpoint consistency checks a resumed run relies on.

use std::collections::HashMap;

use callscore::exposure::checkpoint::{self, Checkpoint};
use callscore::exposure::equal::{equal_weighted_exposure, EqualWeightedScorer};
use callscore::exposure::tfidf::{idf_from_document_frequency, IdfTable, TfIdfScorer};
use callscore::exposure::traits::ExposureScorer;
use callscore::exposure::{round3, ExposureMethod};
use callscore::lexicon::Lexicon;

// ============================================================
// Equal-weighted exposure
// ============================================================

#[test]
fn equal_weighted_formula() {
    assert_eq!(equal_weighted_exposure(0, 10), 0.0);
    assert_eq!(equal_weighted_exposure(5, 0), 0.0);
    assert!((equal_weighted_exposure(3, 4) - 0.75).abs() < 1e-12);
}

#[test]
fn equal_weighted_counts_every_occurrence() {
    let lexicon = Lexicon::from_terms(["pandemic", "lockdown", "vaccine", "outbreak"]);
    let scorer = EqualWeightedScorer::new(&lexicon).unwrap();

    let text = "The pandemic hit demand. After the lockdown, pandemic-related costs fell.";
    // "pandemic" twice (hyphen is a word boundary), "lockdown" once
    assert!((scorer.score(text) - 0.75).abs() < 1e-12);
    assert_eq!(scorer.method(), ExposureMethod::Equal);
}

#[test]
fn equal_weighted_no_hits_is_zero() {
    let lexicon = Lexicon::from_terms(["pandemic"]);
    let scorer = EqualWeightedScorer::new(&lexicon).unwrap();
    assert_eq!(scorer.score("Revenue grew eight percent in the quarter."), 0.0);
    assert_eq!(scorer.score(""), 0.0);
}

#[test]
fn equal_weighted_word_boundaries_are_unicode_aware() {
    let lexicon = Lexicon::from_terms(["émission"]);
    let scorer = EqualWeightedScorer::new(&lexicon).unwrap();
    assert_eq!(scorer.score("les émission ici"), 1.0);
    assert_eq!(scorer.score("réémission"), 0.0);

    let lexicon = Lexicon::from_terms(["café"]);
    let scorer = EqualWeightedScorer::new(&lexicon).unwrap();
    assert_eq!(scorer.score("cafés"), 0.0);
    assert_eq!(scorer.score("un café, deux"), 1.0);
}

#[test]
fn equal_weighted_multiword_term_spans_non_breaking_space() {
    let lexicon = Lexicon::from_terms(["climate change"]);
    let scorer = EqualWeightedScorer::new(&lexicon).unwrap();
    assert_eq!(scorer.score("climate\u{a0}\u{a0}change"), 1.0);
}

#[test]
fn equal_weighted_term_counts_follow_lexicon_order() {
    let lexicon = Lexicon::from_terms(["storm", "drought"]);
    let scorer = EqualWeightedScorer::new(&lexicon).unwrap();
    let counts = scorer.term_counts("drought drought storm");
    assert_eq!(counts, vec![("storm", 1), ("drought", 2)]);
}

// ============================================================
// TF-IDF exposure
// ============================================================

#[test]
fn idf_is_log_ratio_and_zero_when_unseen() {
    let lexicon = Lexicon::from_terms(["risk", "hedge", "swap"]);
    let df: HashMap<String, usize> = [("risk".to_string(), 2), ("hedge".to_string(), 1)].into();
    let idf = idf_from_document_frequency(&lexicon, &df, 4);

    assert!((idf["risk"] - 2.0_f64.ln()).abs() < 1e-12);
    assert!((idf["hedge"] - 4.0_f64.ln()).abs() < 1e-12);
    assert_eq!(idf["swap"], 0.0);
    assert_eq!(idf.len(), 3);
}

#[test]
fn idf_term_in_every_document_is_zero() {
    let lexicon = Lexicon::from_terms(["the"]);
    let df: HashMap<String, usize> = [("the".to_string(), 7)].into();
    let idf = idf_from_document_frequency(&lexicon, &df, 7);
    assert_eq!(idf["the"], 0.0);
}

#[test]
fn tfidf_score_matches_hand_computation() {
    let lexicon = Lexicon::from_terms(["risk", "hedge"]);
    let mut idf = IdfTable::new();
    idf.insert("risk".to_string(), 1.0);
    idf.insert("hedge".to_string(), 2.0);
    let scorer = TfIdfScorer::new(&lexicon, idf);

    // 5 tokens: tf(risk) = 2/5, tf(hedge) = 1/5
    // sum = 0.4 * 1 + 0.2 * 2 = 0.8, / 2 terms = 0.4
    let score = scorer.score("risk and hedge the risk");
    assert_eq!(score, 0.4);
    assert_eq!(scorer.method(), ExposureMethod::Tfidf);

    let per_term = scorer.term_scores("risk and hedge the risk");
    assert!((per_term["risk"] - 0.4).abs() < 1e-12);
    assert!((per_term["hedge"] - 0.4).abs() < 1e-12);
}

#[test]
fn tfidf_missing_idf_entry_contributes_nothing() {
    let lexicon = Lexicon::from_terms(["risk", "hedge"]);
    let mut idf = IdfTable::new();
    idf.insert("risk".to_string(), 3.0);
    let scorer = TfIdfScorer::new(&lexicon, idf);

    // tf(risk) = 1/2 -> 1.5, tf(hedge) has no idf -> 0; / 2 terms
    assert_eq!(scorer.score("hedge risk"), 0.75);
}

#[test]
fn round3_keeps_three_decimals() {
    assert_eq!(round3(0.12345), 0.123);
    assert_eq!(round3(1.25 / 3.0), 0.417);
    assert_eq!(round3(2.0), 2.0);
}

// ============================================================
// Exposure method defaults
// ============================================================

#[test]
fn method_defaults() {
    assert_eq!(ExposureMethod::Equal.default_column(), "ph_expo_ew");
    assert_eq!(ExposureMethod::Tfidf.default_column(), "cc_expo_tfidf");
    assert_eq!(ExposureMethod::Equal.default_batch_size(), 100);
    assert_eq!(ExposureMethod::Tfidf.default_batch_size(), 20);
}

// ============================================================
// Checkpoints
// ============================================================

#[test]
fn checkpoint_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("checkpoint.json");

    assert!(Checkpoint::load(&path).unwrap().is_none());

    let cp = Checkpoint::new(2, vec![0.5, 0.25, 0.0, 1.0], 6, ExposureMethod::Equal);
    cp.save(&path).unwrap();

    let loaded = Checkpoint::load(&path).unwrap().unwrap();
    assert_eq!(loaded, cp);
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn checkpoint_corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Checkpoint::load(&path).is_err());
}

#[test]
fn checkpoint_validate_catches_changed_batch_size() {
    let cp = Checkpoint::new(2, vec![0.0; 4], 10, ExposureMethod::Equal);
    assert!(cp.validate(ExposureMethod::Equal, 10, 2).is_ok());

    let err = cp.validate(ExposureMethod::Equal, 10, 3).unwrap_err();
    assert!(err.to_string().contains("batch size"));
}

#[test]
fn clear_removes_checkpoint_and_idf_side_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    let idf = checkpoint::idf_path(&path);
    std::fs::write(&path, "{}").unwrap();
    std::fs::write(&idf, "{}").unwrap();

    checkpoint::clear(&path).unwrap();
    assert!(!path.exists());
    assert!(!idf.exists());

    // Clearing again is a no-op
    checkpoint::clear(&path).unwrap();
}
