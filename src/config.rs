use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::exposure::ExposureMethod;

/// Default checkpoint location for exposure runs.
pub const DEFAULT_CHECKPOINT: &str = "./checkpoint.json";

/// Run-wide settings loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy, so every setting can
/// live there. Command-line flags win over anything set here.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Where exposure runs keep their checkpoint (CALLSCORE_CHECKPOINT)
    pub checkpoint_path: PathBuf,
    /// Files per checkpointed batch (CALLSCORE_BATCH_SIZE); when unset each
    /// method uses its own default
    pub batch_size: Option<usize>,
    /// Files scored in parallel (CALLSCORE_CONCURRENCY); defaults to the
    /// machine's available parallelism
    pub concurrency: usize,
    /// Optional JSON keyword table for `classify` (CALLSCORE_SECTOR_KEYWORDS)
    pub sector_keywords: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let checkpoint_path = lookup("CALLSCORE_CHECKPOINT")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKPOINT));

        let batch_size = parse_positive(&lookup, "CALLSCORE_BATCH_SIZE")?;

        let concurrency = match parse_positive(&lookup, "CALLSCORE_CONCURRENCY")? {
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        };

        let sector_keywords = lookup("CALLSCORE_SECTOR_KEYWORDS")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            checkpoint_path,
            batch_size,
            concurrency,
            sector_keywords,
        })
    }

    /// Batch size for a run: flag, then environment, then the method default.
    pub fn batch_size_for(&self, flag: Option<usize>, method: ExposureMethod) -> usize {
        flag.or(self.batch_size)
            .unwrap_or_else(|| method.default_batch_size())
    }

    /// Concurrency for a run: flag, then environment/default.
    pub fn concurrency_for(&self, flag: Option<usize>) -> usize {
        flag.unwrap_or(self.concurrency).max(1)
    }
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<usize>> {
    let Some(raw) = lookup(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let value: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))?;
    if value == 0 {
        anyhow::bail!("{key} must be at least 1");
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.checkpoint_path, PathBuf::from(DEFAULT_CHECKPOINT));
        assert_eq!(config.batch_size, None);
        assert!(config.concurrency >= 1);
        assert_eq!(config.batch_size_for(None, ExposureMethod::Tfidf), 20);
        assert_eq!(config.batch_size_for(None, ExposureMethod::Equal), 100);
    }

    #[test]
    fn test_flags_override_env() {
        let config = config_from(&[
            ("CALLSCORE_BATCH_SIZE", "50"),
            ("CALLSCORE_CONCURRENCY", "3"),
        ])
        .unwrap();
        assert_eq!(config.batch_size_for(None, ExposureMethod::Tfidf), 50);
        assert_eq!(config.batch_size_for(Some(7), ExposureMethod::Tfidf), 7);
        assert_eq!(config.concurrency_for(None), 3);
        assert_eq!(config.concurrency_for(Some(0)), 1);
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(config_from(&[("CALLSCORE_BATCH_SIZE", "ten")]).is_err());
        assert!(config_from(&[("CALLSCORE_CONCURRENCY", "0")]).is_err());
    }
}
