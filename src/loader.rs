//! Streaming batch loader
//!
//! Wires a record stream, the reservoir shuffle, batching, and collation
//! into an iterator of tokenized batches, with an optional worker pool that
//! prefetches and collates batches in parallel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::batch::TokenBatch;
use crate::collator::Collator;
use crate::error::{Result, SourceDataError};
use crate::options::LoaderOptions;
use crate::record::Record;
use crate::shuffle::ShuffledStream;
use crate::stream::{RecordStream, ShardedStream, StreamSource};

type SharedStream = Arc<Mutex<ShuffledStream<ShardedStream>>>;

/// Create a loader over tokenized batches of the named dataset
///
/// Convenience wrapper around [`BatchLoader::new`].
pub fn create_loader(
    source: &dyn StreamSource,
    dataset_name: &str,
    collator: Arc<dyn Collator>,
    options: LoaderOptions,
) -> Result<BatchLoader> {
    BatchLoader::new(source, dataset_name, collator, options)
}

/// Iterator over `(input_ids, attention_mask)` batches
///
/// Records are pulled lazily from the (possibly sharded) source, reservoir
/// shuffled, grouped into batches, and collated. With `num_workers > 0`,
/// workers share the shuffled stream and emit complete, self-contained
/// batches as they finish; inter-batch ordering across workers is NOT
/// guaranteed to match a single-worker run. Each `next()` blocks until a
/// batch is ready or the stream is exhausted. Dropping the loader releases
/// its workers.
pub struct BatchLoader {
    state: State,
}

impl std::fmt::Debug for BatchLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLoader").finish_non_exhaustive()
    }
}

enum State {
    /// Synchronous path: pull and collate on the caller's thread
    Inline {
        stream: ShuffledStream<ShardedStream>,
        collator: Arc<dyn Collator>,
        batch_size: usize,
        done: bool,
    },
    /// Worker pool prefetching batches over a bounded channel
    Pool {
        batch_rx: Receiver<Result<TokenBatch>>,
        workers: Vec<JoinHandle<()>>,
        shutdown: Arc<AtomicBool>,
    },
}

impl BatchLoader {
    /// Construct a loader for `dataset_name`
    ///
    /// Opens the stream eagerly: misconfiguration and unknown datasets or
    /// splits error here, not at first batch pull. Shard order and record
    /// order are both shuffled from `options.seed`.
    pub fn new(
        source: &dyn StreamSource,
        dataset_name: &str,
        collator: Arc<dyn Collator>,
        options: LoaderOptions,
    ) -> Result<Self> {
        if dataset_name.is_empty() {
            return Err(SourceDataError::InvalidConfig(
                "dataset_name must be non-empty".into(),
            ));
        }
        options.validate()?;

        let shards = source.open(dataset_name, &options.split)?;
        let sharded = ShardedStream::new(shards, options.seed);
        let stream = ShuffledStream::new(sharded, options.shuffle_buffer_size, options.seed);

        if options.num_workers == 0 {
            return Ok(Self {
                state: State::Inline {
                    stream,
                    collator,
                    batch_size: options.batch_size,
                    done: false,
                },
            });
        }

        let capacity = options.prefetch_batches * options.num_workers;
        let (batch_tx, batch_rx) = bounded(capacity);
        let shutdown = Arc::new(AtomicBool::new(false));
        let stream: SharedStream = Arc::new(Mutex::new(stream));

        let mut workers = Vec::with_capacity(options.num_workers);
        for _ in 0..options.num_workers {
            let stream = Arc::clone(&stream);
            let collator = Arc::clone(&collator);
            let batch_tx = batch_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let batch_size = options.batch_size;
            workers.push(thread::spawn(move || {
                worker_loop(&stream, collator.as_ref(), batch_size, &batch_tx, &shutdown);
            }));
        }
        // Channel closes once every worker has finished
        drop(batch_tx);

        Ok(Self {
            state: State::Pool {
                batch_rx,
                workers,
                shutdown,
            },
        })
    }
}

/// Pull up to `batch_size` records; a short vec means the stream ended
fn pull_records(stream: &mut dyn RecordStream, batch_size: usize) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(batch_size);
    while records.len() < batch_size {
        match stream.next_record() {
            Some(Ok(record)) => records.push(record),
            Some(Err(e)) => return Err(e),
            None => break,
        }
    }
    Ok(records)
}

fn worker_loop(
    stream: &SharedStream,
    collator: &dyn Collator,
    batch_size: usize,
    batch_tx: &Sender<Result<TokenBatch>>,
    shutdown: &AtomicBool,
) {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        // Hold the lock only while pulling records; collate outside it
        let pulled = {
            let Ok(mut stream) = stream.lock() else { break };
            pull_records(&mut *stream, batch_size)
        };
        let records = match pulled {
            Ok(records) => records,
            Err(e) => {
                let _ = batch_tx.send(Err(e));
                break;
            }
        };
        if records.is_empty() {
            break;
        }
        let exhausted = records.len() < batch_size;
        let batch = collator.collate(&records);
        let failed = batch.is_err();
        if batch_tx.send(batch).is_err() || failed || exhausted {
            break;
        }
    }
}

impl Iterator for BatchLoader {
    type Item = Result<TokenBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            State::Inline {
                stream,
                collator,
                batch_size,
                done,
            } => {
                if *done {
                    return None;
                }
                let records = match pull_records(stream, *batch_size) {
                    Ok(records) => records,
                    Err(e) => {
                        *done = true;
                        return Some(Err(e));
                    }
                };
                if records.is_empty() {
                    *done = true;
                    return None;
                }
                if records.len() < *batch_size {
                    *done = true;
                }
                let batch = collator.collate(&records);
                if batch.is_err() {
                    *done = true;
                }
                Some(batch)
            }
            // Blocks until a worker has a batch ready; the channel closes
            // when all workers finish, ending iteration cleanly
            State::Pool { batch_rx, .. } => batch_rx.recv().ok(),
        }
    }
}

impl Drop for BatchLoader {
    fn drop(&mut self) {
        if let State::Pool {
            batch_rx,
            workers,
            shutdown,
        } = &mut self.state
        {
            shutdown.store(true, Ordering::Relaxed);
            // Unblock workers parked on the bounded channel
            while batch_rx.try_recv().is_ok() {}
            for worker in workers.drain(..) {
                let _ = worker.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collator::{PretokenizedCollator, TextCollator};
    use crate::stream::MemorySource;
    use crate::tokenizer::WhitespaceTokenizer;

    fn numbered(n: u32) -> Vec<Record> {
        (0..n).map(|i| Record::from_tokens(vec![i])).collect()
    }

    fn pile_source(n: u32) -> MemorySource {
        MemorySource::new("pile").with_split("train", numbered(n))
    }

    fn collect_rows(loader: BatchLoader) -> Vec<u32> {
        let mut rows = Vec::new();
        for batch in loader {
            let batch = batch.unwrap();
            for row in batch.input_ids.rows() {
                rows.push(row[0]);
            }
        }
        rows
    }

    #[test]
    fn test_inline_batching_and_final_short_batch() {
        let loader = BatchLoader::new(
            &pile_source(10),
            "pile",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new().batch_size(4).num_workers(0),
        )
        .unwrap();
        let sizes: Vec<usize> = loader.map(|b| b.unwrap().batch_size()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_inline_terminates_after_exhaustion() {
        let mut loader = BatchLoader::new(
            &pile_source(3),
            "pile",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new().batch_size(8).num_workers(0),
        )
        .unwrap();
        assert_eq!(loader.next().unwrap().unwrap().batch_size(), 3);
        assert!(loader.next().is_none());
        assert!(loader.next().is_none());
    }

    #[test]
    fn test_same_seed_same_batches() {
        let make = || {
            BatchLoader::new(
                &pile_source(100),
                "pile",
                Arc::new(PretokenizedCollator),
                LoaderOptions::new()
                    .batch_size(8)
                    .shuffle_buffer_size(16)
                    .seed(42)
                    .num_workers(0),
            )
            .unwrap()
        };
        assert_eq!(collect_rows(make()), collect_rows(make()));
    }

    #[test]
    fn test_buffer_size_one_preserves_input_order() {
        let loader = BatchLoader::new(
            &pile_source(20),
            "pile",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new()
                .batch_size(6)
                .shuffle_buffer_size(1)
                .num_workers(0),
        )
        .unwrap();
        assert_eq!(collect_rows(loader), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_every_record_emitted_exactly_once() {
        let loader = BatchLoader::new(
            &pile_source(97),
            "pile",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new()
                .batch_size(10)
                .shuffle_buffer_size(32)
                .num_workers(0),
        )
        .unwrap();
        let mut rows = collect_rows(loader);
        rows.sort_unstable();
        assert_eq!(rows, (0..97).collect::<Vec<_>>());
    }

    #[test]
    fn test_pool_emits_same_records_as_inline() {
        let opts = LoaderOptions::new()
            .batch_size(8)
            .shuffle_buffer_size(16)
            .seed(3);
        let inline = BatchLoader::new(
            &pile_source(64),
            "pile",
            Arc::new(PretokenizedCollator),
            opts.clone().num_workers(0),
        )
        .unwrap();
        let pooled = BatchLoader::new(
            &pile_source(64),
            "pile",
            Arc::new(PretokenizedCollator),
            opts.num_workers(3),
        )
        .unwrap();
        let mut a = collect_rows(inline);
        let mut b = collect_rows(pooled);
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pool_terminates_without_hanging() {
        let loader = BatchLoader::new(
            &pile_source(30),
            "pile",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new().batch_size(7).num_workers(4),
        )
        .unwrap();
        let mut total = 0;
        for batch in loader {
            let batch = batch.unwrap();
            assert!(batch.batch_size() <= 7);
            total += batch.batch_size();
        }
        assert_eq!(total, 30);
    }

    #[test]
    fn test_dropping_pool_mid_iteration_releases_workers() {
        let mut loader = BatchLoader::new(
            &pile_source(500),
            "pile",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new().batch_size(4).num_workers(2),
        )
        .unwrap();
        assert!(loader.next().is_some());
        drop(loader);
    }

    #[test]
    fn test_sharded_source_emits_all_shards() {
        let source = MemorySource::new("pile").with_shards(
            "train",
            vec![numbered(10), (10..20).map(|i| Record::from_tokens(vec![i])).collect()],
        );
        let loader = BatchLoader::new(
            &source,
            "pile",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new()
                .batch_size(5)
                .shuffle_buffer_size(4)
                .num_workers(0),
        )
        .unwrap();
        let mut rows = collect_rows(loader);
        rows.sort_unstable();
        assert_eq!(rows, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_unknown_dataset_fails_at_construction() {
        let err = BatchLoader::new(
            &pile_source(4),
            "c4",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new().num_workers(0),
        )
        .unwrap_err();
        assert!(matches!(err, SourceDataError::DatasetNotFound { .. }));
    }

    #[test]
    fn test_unknown_split_fails_at_construction() {
        let err = BatchLoader::new(
            &pile_source(4),
            "pile",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new().split("validation").num_workers(0),
        )
        .unwrap_err();
        assert!(matches!(err, SourceDataError::DatasetNotFound { .. }));
    }

    #[test]
    fn test_zero_batch_size_fails_at_construction() {
        let err = BatchLoader::new(
            &pile_source(4),
            "pile",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new().batch_size(0),
        )
        .unwrap_err();
        assert!(matches!(err, SourceDataError::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_dataset_name_fails_at_construction() {
        let err = BatchLoader::new(
            &pile_source(4),
            "",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, SourceDataError::InvalidConfig(_)));
    }

    #[test]
    fn test_collation_error_ends_inline_iteration() {
        let source = MemorySource::new("pile").with_split(
            "train",
            vec![
                Record::from_tokens(vec![1, 2]),
                Record::from_tokens(vec![3]),
            ],
        );
        let mut loader = BatchLoader::new(
            &source,
            "pile",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new()
                .batch_size(2)
                .shuffle_buffer_size(1)
                .num_workers(0),
        )
        .unwrap();
        assert!(loader.next().unwrap().is_err());
        assert!(loader.next().is_none());
    }

    #[test]
    fn test_text_pipeline_end_to_end() {
        let corpus = ["the quick brown fox", "jumps over the lazy dog"];
        let source = MemorySource::new("tiny").with_split(
            "train",
            corpus.iter().map(|text| Record::from_text(*text)).collect(),
        );
        let tokenizer = Arc::new(WhitespaceTokenizer::from_corpus(&corpus));
        let pad = crate::tokenizer::PAD_TOKEN_ID;
        let collator = Arc::new(TextCollator::new(tokenizer).max_length(8));
        let loader = BatchLoader::new(
            &source,
            "tiny",
            collator,
            LoaderOptions::new().batch_size(2).num_workers(0),
        )
        .unwrap();
        for batch in loader {
            let batch = batch.unwrap();
            assert_eq!(batch.input_ids.dim(), batch.attention_mask.dim());
            for ((i, j), &mask) in batch.attention_mask.indexed_iter() {
                if mask == 0 {
                    assert_eq!(batch.input_ids[[i, j]], pad);
                }
            }
        }
    }

    #[test]
    fn test_create_loader_factory() {
        let loader = create_loader(
            &pile_source(8),
            "pile",
            Arc::new(PretokenizedCollator),
            LoaderOptions::new().batch_size(4).num_workers(0),
        )
        .unwrap();
        assert_eq!(loader.count(), 2);
    }
}
