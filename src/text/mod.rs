// Transcript text preprocessing: whitespace cleanup, tokenization, and
// transcript discovery.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Contraction suffixes split off a token before the alphabetic filter.
/// `n't` must come first so "don't" splits as "do" + "n't".
const CONTRACTIONS: &[&str] = &["n't", "'s", "'re", "'ve", "'ll", "'d", "'m"];

/// Collapse every Unicode whitespace run (spaces, tabs, newlines, NBSP)
/// into one space.
///
/// Leading and trailing whitespace become a single space rather than being
/// trimmed; the exposure scorers only ever split or match on word
/// boundaries, so the distinction doesn't matter to them.
pub fn clean_text(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").into_owned()
}

/// Tokenize for lexicon sentiment: lowercase, purely alphabetic words only.
///
/// Punctuation is stripped from token edges and English contractions are
/// split off, so "company's" yields "company" and "don't" yields "do".
/// Anything left that isn't all letters (numbers, hyphenated compounds,
/// URLs) is dropped.
pub fn tokenize_alpha(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for chunk in text.split_whitespace() {
        let chunk = chunk.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
        let chunk = chunk.trim_matches('\'');
        if chunk.is_empty() {
            continue;
        }

        let lower = chunk.to_lowercase();
        let stem = split_contraction(&lower);

        if !stem.is_empty() && stem.chars().all(char::is_alphabetic) {
            tokens.push(stem.to_string());
        }
    }

    tokens
}

fn split_contraction(word: &str) -> &str {
    for suffix in CONTRACTIONS {
        if let Some(stem) = word.strip_suffix(suffix) {
            return stem;
        }
    }
    word
}

/// List the entries in `dir` whose name ends in `.{extension}`, sorted by
/// file name.
///
/// Transcript order is the join key against spreadsheet rows, so every
/// matching entry counts toward it. An entry that turns out not to be a
/// readable file fails when it is read, not here.
pub fn list_transcripts(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read transcript directory: {}", dir.display()))?;

    let suffix = format!(".{extension}");
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if entry.file_name().to_string_lossy().ends_with(&suffix) {
            files.push(entry.path());
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// File name of a path as a lossy string (empty if the path has none).
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
