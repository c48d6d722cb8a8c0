//! Record stream abstraction
//!
//! The remote/sharded dataset transport is an external concern. This module
//! defines the narrow interface the loader consumes, an in-memory
//! implementation for tests and local corpora, and a shard-order permuting
//! wrapper for sharded sources.

use std::collections::HashMap;

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::error::{Result, SourceDataError};
use crate::record::Record;

/// A lazy sequence of records
///
/// Implementations yield records one at a time until exhaustion. Errors are
/// yielded in-band and are terminal for the stream.
pub trait RecordStream: Send {
    /// Pull the next record, or `None` at end of stream
    fn next_record(&mut self) -> Option<Result<Record>>;
}

impl std::fmt::Debug for dyn RecordStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream").finish_non_exhaustive()
    }
}

/// Opens record streams for a named dataset and split
///
/// Returns one stream per shard (a single-element vec for unsharded sets).
/// Unknown dataset identifiers or splits fail here, at loader-creation
/// time, never lazily at first batch pull.
pub trait StreamSource {
    /// Open all shards of the given dataset split
    fn open(&self, dataset: &str, split: &str) -> Result<Vec<Box<dyn RecordStream>>>;
}

/// In-memory record stream
pub struct MemoryStream {
    records: std::vec::IntoIter<Record>,
}

impl MemoryStream {
    /// Create a stream over a vec of records
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

impl RecordStream for MemoryStream {
    fn next_record(&mut self) -> Option<Result<Record>> {
        self.records.next().map(Ok)
    }
}

/// In-memory stream source for tests and local corpora
pub struct MemorySource {
    dataset: String,
    splits: HashMap<String, Vec<Vec<Record>>>,
}

impl MemorySource {
    /// Create a source serving the given dataset name
    #[must_use]
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            splits: HashMap::new(),
        }
    }

    /// Add an unsharded split
    #[must_use]
    pub fn with_split(mut self, split: impl Into<String>, records: Vec<Record>) -> Self {
        self.splits.insert(split.into(), vec![records]);
        self
    }

    /// Add a sharded split
    #[must_use]
    pub fn with_shards(mut self, split: impl Into<String>, shards: Vec<Vec<Record>>) -> Self {
        self.splits.insert(split.into(), shards);
        self
    }
}

impl StreamSource for MemorySource {
    fn open(&self, dataset: &str, split: &str) -> Result<Vec<Box<dyn RecordStream>>> {
        if dataset != self.dataset {
            return Err(SourceDataError::DatasetNotFound {
                dataset: dataset.into(),
                split: split.into(),
            });
        }
        let shards = self
            .splits
            .get(split)
            .ok_or_else(|| SourceDataError::DatasetNotFound {
                dataset: dataset.into(),
                split: split.into(),
            })?;
        Ok(shards
            .iter()
            .cloned()
            .map(|records| Box::new(MemoryStream::new(records)) as Box<dyn RecordStream>)
            .collect())
    }
}

/// Drains shards in an order permuted by the loader seed
///
/// Shard order and record order are shuffled from the same configured seed,
/// so a sharded source stays deterministic end to end.
pub struct ShardedStream {
    shards: Vec<Box<dyn RecordStream>>,
    current: usize,
}

impl ShardedStream {
    /// Permute shard order with the given seed
    #[must_use]
    pub fn new(mut shards: Vec<Box<dyn RecordStream>>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        shards.shuffle(&mut rng);
        Self { shards, current: 0 }
    }
}

impl RecordStream for ShardedStream {
    fn next_record(&mut self) -> Option<Result<Record>> {
        while self.current < self.shards.len() {
            match self.shards[self.current].next_record() {
                Some(item) => return Some(item),
                None => self.current += 1,
            }
        }
        None
    }
}
