//! Loader configuration

use serde::{Deserialize, Serialize};

use crate::error::{Result, SourceDataError};

/// Configuration for a batch loader
///
/// Immutable once the loader is constructed. Defaults follow the upstream
/// activation-collection pipeline: 512-prompt batches shuffled through a
/// 10,000-record reservoir by two workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderOptions {
    /// Dataset split to load
    pub split: String,
    /// Number of prompts per batch
    pub batch_size: usize,
    /// Minimum number of records held for shuffling
    pub shuffle_buffer_size: usize,
    /// Seed for shard permutation and record shuffling
    pub seed: u64,
    /// Worker threads for prefetch and collation (0 = load inline)
    ///
    /// Recommended above 1 and below the number of CPU cores.
    pub num_workers: usize,
    /// Ready batches buffered per worker before the pool blocks
    pub prefetch_batches: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            split: "train".to_string(),
            batch_size: 512,
            shuffle_buffer_size: 10_000,
            seed: 0,
            num_workers: 2,
            prefetch_batches: 4,
        }
    }
}

impl LoaderOptions {
    /// Create options with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dataset split
    #[must_use]
    pub fn split(mut self, split: impl Into<String>) -> Self {
        self.split = split.into();
        self
    }

    /// Set the batch size
    #[must_use]
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    /// Set the shuffle buffer size
    #[must_use]
    pub fn shuffle_buffer_size(mut self, n: usize) -> Self {
        self.shuffle_buffer_size = n;
        self
    }

    /// Set the random seed
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the worker count
    #[must_use]
    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    /// Set the per-worker prefetch depth
    #[must_use]
    pub fn prefetch_batches(mut self, n: usize) -> Self {
        self.prefetch_batches = n;
        self
    }

    /// Validate the configuration
    ///
    /// Misconfiguration surfaces here, at loader construction, never at
    /// first batch pull.
    pub fn validate(&self) -> Result<()> {
        if self.split.is_empty() {
            return Err(SourceDataError::InvalidConfig(
                "split must be non-empty".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(SourceDataError::InvalidConfig(
                "batch_size must be positive".into(),
            ));
        }
        if self.shuffle_buffer_size == 0 {
            return Err(SourceDataError::InvalidConfig(
                "shuffle_buffer_size must be positive".into(),
            ));
        }
        if self.num_workers > 0 && self.prefetch_batches == 0 {
            return Err(SourceDataError::InvalidConfig(
                "prefetch_batches must be positive when workers are enabled".into(),
            ));
        }
        Ok(())
    }
}
