// Sentiment pipeline: score every transcript in a directory, one row each.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::exposure::tfidf::read_transcript;
use crate::sentiment::{SentimentLexicon, SentimentScore};
use crate::sheet::{self, Cell, Table};
use crate::text::{file_name, list_transcripts};

/// One scored transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentRow {
    pub filename: String,
    pub score: SentimentScore,
}

/// Score all `.txt` transcripts in `dir`, in file-name order.
pub async fn score_directory(
    dir: &Path,
    lexicon: Arc<SentimentLexicon>,
    concurrency: usize,
) -> Result<Vec<SentimentRow>> {
    let files = list_transcripts(dir, "txt")?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Sentiment [{bar:30}] {pos}/{len} ({eta})")
            .unwrap(),
    );

    let results: Vec<Result<SentimentRow>> = stream::iter(files.into_iter().map(|path: PathBuf| {
        let lexicon = Arc::clone(&lexicon);
        let pb = pb.clone();
        async move {
            let handle = tokio::task::spawn_blocking(move || -> Result<SentimentRow> {
                let text = read_transcript(&path)?;
                Ok(SentimentRow {
                    filename: file_name(&path),
                    score: lexicon.score(&text),
                })
            });
            let result = match handle.await {
                Ok(r) => r,
                Err(e) => Err(anyhow::anyhow!("Sentiment task failed: {e}")),
            };
            pb.inc(1);
            result
        }
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await;
    pb.finish_and_clear();

    results.into_iter().collect()
}

/// Lay scored rows out as the results sheet.
pub fn to_table(rows: &[SentimentRow]) -> Table {
    let headers = [
        "filename",
        "sentiment_score",
        "positive_count",
        "negative_count",
        "risk_count",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();

    let data = rows
        .iter()
        .map(|r| {
            vec![
                Cell::from(r.filename.as_str()),
                Cell::Int(r.score.sentiment_score),
                Cell::Int(r.score.positive_count as i64),
                Cell::Int(r.score.negative_count as i64),
                Cell::Int(r.score.risk_count as i64),
            ]
        })
        .collect();

    Table::new(headers, data)
}

/// Score a directory and write the results sheet.
///
/// `expected` is the transcript count the caller believes the corpus has; a
/// different count is logged, not fatal.
pub async fn run(
    dir: &Path,
    lexicon: SentimentLexicon,
    output: &Path,
    expected: Option<usize>,
    concurrency: usize,
) -> Result<Vec<SentimentRow>> {
    let rows = score_directory(dir, Arc::new(lexicon), concurrency).await?;

    if let Some(expected) = expected {
        if rows.len() != expected {
            warn!(
                processed = rows.len(),
                expected, "Processed transcript count differs from expected"
            );
        }
    }

    sheet::write_table(&to_table(&rows), output)?;
    Ok(rows)
}
