// Exposure batch pipeline: transcripts → scores → spreadsheet column.
//
// The transcript directory and the input sheet are joined by position:
// the n-th transcript in name order belongs to the n-th sheet row. Files
// are processed in fixed-size batches. After each batch the accumulated
// exposures go to a checkpoint so an interrupted run resumes at the first
// unfinished batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::exposure::checkpoint::{self, Checkpoint};
use crate::exposure::equal::EqualWeightedScorer;
use crate::exposure::tfidf::{self, read_transcript, TfIdfScorer};
use crate::exposure::traits::ExposureScorer;
use crate::exposure::ExposureMethod;
use crate::lexicon::Lexicon;
use crate::sheet::{self, Cell};
use crate::text::{file_name, list_transcripts};

/// Everything one exposure run needs.
#[derive(Debug, Clone)]
pub struct ExposureJob {
    pub method: ExposureMethod,
    pub transcript_dir: PathBuf,
    pub input_sheet: PathBuf,
    pub output_sheet: PathBuf,
    /// Name of the column the exposures are written to
    pub column: String,
    pub checkpoint: PathBuf,
    pub batch_size: usize,
    pub concurrency: usize,
    /// Discard any existing checkpoint before starting
    pub fresh: bool,
}

/// What a finished run did.
#[derive(Debug, Clone)]
pub struct ExposureOutcome {
    pub files: usize,
    pub total_batches: usize,
    /// Batches skipped because the checkpoint already covered them
    pub resumed_batches: usize,
    pub exposures: Vec<f64>,
}

/// Run an exposure job end to end.
pub async fn run(job: &ExposureJob, lexicon: &Lexicon) -> Result<ExposureOutcome> {
    if job.batch_size == 0 {
        anyhow::bail!("Batch size must be at least 1");
    }

    if job.fresh {
        checkpoint::clear(&job.checkpoint)?;
    }

    let files = list_transcripts(&job.transcript_dir, "txt")?;
    let mut table = sheet::read_table(&job.input_sheet)?;

    if files.len() != table.len() {
        anyhow::bail!(
            "The number of transcript files ({}) does not match the number of rows in {} ({})",
            files.len(),
            job.input_sheet.display(),
            table.len()
        );
    }

    let total_batches = files.len().div_ceil(job.batch_size);

    let (start_batch, mut exposures) = match Checkpoint::load(&job.checkpoint)? {
        Some(cp) => {
            cp.validate(job.method, files.len(), job.batch_size)?;
            println!(
                "Resuming from batch {} of {} ({} exposures already saved)",
                cp.batch_number,
                total_batches,
                cp.exposures.len()
            );
            (cp.batch_number, cp.exposures)
        }
        None => (0, Vec::with_capacity(files.len())),
    };

    let scorer = build_scorer(job, lexicon, &files, start_batch > 0).await?;

    info!(
        method = %job.method,
        files = files.len(),
        batches = total_batches,
        start_batch,
        terms = lexicon.len(),
        "Starting exposure run"
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Scoring [{bar:30}] {pos}/{len} batch {msg} ({eta})")
            .unwrap(),
    );
    pb.set_position(exposures.len() as u64);

    for batch in start_batch..total_batches {
        let start = batch * job.batch_size;
        let end = (start + job.batch_size).min(files.len());
        pb.set_message(format!("{}/{}", batch + 1, total_batches));

        let batch_exposures =
            score_files(&files[start..end], Arc::clone(&scorer), job.concurrency, &pb).await?;
        exposures.extend(batch_exposures);

        Checkpoint::new(batch + 1, exposures.clone(), files.len(), job.method)
            .save(&job.checkpoint)?;
    }
    pb.finish_and_clear();

    if exposures.len() != table.len() {
        anyhow::bail!(
            "Computed {} exposures but the sheet has {} rows",
            exposures.len(),
            table.len()
        );
    }

    table.set_column(&job.column, exposures.iter().map(|&e| Cell::Number(e)).collect())?;
    sheet::write_table(&table, &job.output_sheet)?;

    Ok(ExposureOutcome {
        files: files.len(),
        total_batches,
        resumed_batches: start_batch,
        exposures,
    })
}

/// Build the scorer for a run. TF-IDF needs its corpus pass first; a
/// resumed run reuses the IDF table saved beside the checkpoint.
async fn build_scorer(
    job: &ExposureJob,
    lexicon: &Lexicon,
    files: &[PathBuf],
    resuming: bool,
) -> Result<Arc<dyn ExposureScorer>> {
    match job.method {
        ExposureMethod::Equal => Ok(Arc::new(EqualWeightedScorer::new(lexicon)?)),
        ExposureMethod::Tfidf => {
            let idf_path = checkpoint::idf_path(&job.checkpoint);
            let idf = if resuming && idf_path.exists() {
                info!(path = %idf_path.display(), "Reusing saved IDF table");
                tfidf::load_idf(&idf_path)?
            } else {
                println!("Computing corpus IDF over {} transcripts...", files.len());
                let idf = tfidf::compute_idf(files, lexicon, job.concurrency).await?;
                if let Some(parent) = idf_path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                tfidf::save_idf(&idf, &idf_path)?;
                idf
            };
            Ok(Arc::new(TfIdfScorer::new(lexicon, idf)))
        }
    }
}

/// Score a slice of transcripts concurrently, returning exposures in the
/// same order as `files`.
///
/// Up to `concurrency` files are in flight at once, each read and scored on
/// a blocking thread. The first unreadable file fails the call.
pub async fn score_files(
    files: &[PathBuf],
    scorer: Arc<dyn ExposureScorer>,
    concurrency: usize,
    pb: &ProgressBar,
) -> Result<Vec<f64>> {
    let results: Vec<Result<f64>> = stream::iter(files.iter().cloned().map(|path| {
        let scorer = Arc::clone(&scorer);
        let pb = pb.clone();
        async move {
            let handle = tokio::task::spawn_blocking(move || score_file(&path, scorer.as_ref()));
            let result = match handle.await {
                Ok(r) => r,
                Err(e) => Err(anyhow::anyhow!("Scoring task failed: {e}")),
            };
            pb.inc(1);
            result
        }
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await;

    results.into_iter().collect()
}

fn score_file(path: &Path, scorer: &dyn ExposureScorer) -> Result<f64> {
    let text = read_transcript(path)?;
    let exposure = scorer.score(&text);
    debug!(file = %file_name(path), exposure, "Scored transcript");
    Ok(exposure)
}
