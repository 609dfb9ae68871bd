// Batch checkpoints: the only persistent state an exposure run keeps.
//
// After each completed batch the runner writes the batch number and every
// exposure computed so far. A restarted run loads this file, skips the
// completed batches and carries on. TF-IDF runs also keep the corpus IDF
// table in a side file next to the checkpoint so a resume doesn't repeat
// the first pass.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ExposureMethod;

/// Progress saved after each batch.
///
/// The extra fields are optional on load so a bare
/// `{"batch_number": .., "exposures": [..]}` file is still accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Number of batches fully completed
    pub batch_number: usize,
    /// Exposures for every file in the completed batches, in file order
    pub exposures: Vec<f64>,
    /// Transcript count of the run that wrote this checkpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<ExposureMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    pub fn new(
        batch_number: usize,
        exposures: Vec<f64>,
        total_files: usize,
        method: ExposureMethod,
    ) -> Self {
        Self {
            batch_number,
            exposures,
            total_files: Some(total_files),
            method: Some(method),
            saved_at: Some(Utc::now()),
        }
    }

    /// Load a checkpoint if the file exists.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read checkpoint: {}", path.display()))?;
        let checkpoint: Checkpoint = serde_json::from_str(&raw)
            .with_context(|| format!("Checkpoint is not valid JSON: {}", path.display()))?;
        Ok(Some(checkpoint))
    }

    /// Write the checkpoint via a temp file and rename, so an interrupted
    /// write never leaves a truncated checkpoint behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create checkpoint directory: {}", parent.display())
                })?;
            }
        }

        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(self)?;
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write checkpoint: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move checkpoint into place: {}", path.display()))?;

        info!(batch = self.batch_number, exposures = self.exposures.len(), "Checkpoint saved");
        Ok(())
    }

    /// Check that this checkpoint belongs to the run about to resume it.
    ///
    /// The exposure count must match what `batch_number` batches of
    /// `batch_size` files produce, which also catches a changed batch size.
    pub fn validate(
        &self,
        method: ExposureMethod,
        total_files: usize,
        batch_size: usize,
    ) -> Result<()> {
        if let Some(saved) = self.method {
            if saved != method {
                anyhow::bail!(
                    "Checkpoint was written by a {saved} run but this run is {method}. \
                     Use --fresh to start over."
                );
            }
        }

        if let Some(saved) = self.total_files {
            if saved != total_files {
                anyhow::bail!(
                    "Checkpoint covers {saved} transcripts but the directory now has {total_files}. \
                     Use --fresh to start over."
                );
            }
        }

        let expected = (self.batch_number * batch_size).min(total_files);
        if self.exposures.len() != expected {
            anyhow::bail!(
                "Checkpoint holds {} exposures after {} batches, expected {} at batch size {}. \
                 Was the batch size changed? Use --fresh to start over.",
                self.exposures.len(),
                self.batch_number,
                expected,
                batch_size
            );
        }
        Ok(())
    }
}

/// Path of the IDF side file that belongs to a checkpoint.
///
/// `run/checkpoint.json` → `run/checkpoint.idf.json`
pub fn idf_path(checkpoint: &Path) -> PathBuf {
    let stem = checkpoint
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "checkpoint".to_string());
    checkpoint.with_file_name(format!("{stem}.idf.json"))
}

/// Delete a checkpoint and its IDF side file, if present.
pub fn clear(checkpoint: &Path) -> Result<()> {
    for path in [checkpoint.to_path_buf(), idf_path(checkpoint)] {
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            info!(path = %path.display(), "Removed previous run state");
        }
    }
    Ok(())
}
