//! fuente — streaming source-data batching for activation collection
//!
//! Assembles batches of tokenized text from a streaming dataset source, for
//! downstream collection of neural-network activations. A loader wraps a
//! (possibly sharded) record stream with a seeded reservoir shuffle, groups
//! records into batches, and collates each batch into a token-id matrix
//! plus an attention mask, optionally fanning the work out across a worker
//! pool.
//!
//! Tokenization and the remote dataset transport stay behind narrow traits
//! ([`BatchTokenizer`], [`StreamSource`]); only the shuffling, batching,
//! and collation glue lives here.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fuente::{
//!     create_loader, LoaderOptions, MemorySource, PretokenizedCollator, Record,
//! };
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let records = (0..32u32).map(|i| Record::from_tokens(vec![i; 8])).collect();
//!     let source = MemorySource::new("tiny-corpus").with_split("train", records);
//!
//!     let loader = create_loader(
//!         &source,
//!         "tiny-corpus",
//!         Arc::new(PretokenizedCollator),
//!         LoaderOptions::new().batch_size(4).shuffle_buffer_size(16),
//!     )?;
//!
//!     for batch in loader {
//!         let batch = batch?;
//!         assert_eq!(batch.input_ids.dim(), batch.attention_mask.dim());
//!     }
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

mod batch;
mod collator;
mod error;
mod loader;
mod options;
mod record;
mod shuffle;
mod stream;
mod tokenizer;

pub use batch::TokenBatch;
pub use collator::{Collator, PretokenizedCollator, TextCollator, DEFAULT_MAX_LENGTH};
pub use error::{Result, SourceDataError};
pub use loader::{create_loader, BatchLoader};
pub use options::LoaderOptions;
pub use record::Record;
pub use shuffle::ShuffledStream;
pub use stream::{MemorySource, MemoryStream, RecordStream, ShardedStream, StreamSource};
pub use tokenizer::{BatchTokenizer, WhitespaceTokenizer, PAD_TOKEN_ID, UNK_TOKEN_ID};
