//! Collators for batching source-data records

use std::sync::Arc;

use ndarray::Array2;

use crate::batch::TokenBatch;
use crate::error::{Result, SourceDataError};
use crate::record::Record;
use crate::tokenizer::BatchTokenizer;

/// Default truncation length for the raw-text path
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Converts a batch of records into aligned id and mask tensors
///
/// A collator is a pure per-batch transform; state such as a tokenizer is
/// held by the implementing struct rather than bound through closures.
pub trait Collator: Send + Sync {
    /// Collate records into a tokenized batch
    fn collate(&self, batch: &[Record]) -> Result<TokenBatch>;
}

/// Collator for pre-tokenized, fixed-length corpora
///
/// Rows are stacked verbatim; every record in a batch must carry the same
/// number of tokens or collation fails with a shape mismatch. No padding is
/// ever introduced, so the mask is all ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct PretokenizedCollator;

impl Collator for PretokenizedCollator {
    fn collate(&self, batch: &[Record]) -> Result<TokenBatch> {
        if batch.is_empty() {
            return Ok(TokenBatch {
                input_ids: Array2::zeros((0, 0)),
                attention_mask: Array2::zeros((0, 0)),
            });
        }

        let first = batch[0]
            .tokens
            .as_deref()
            .ok_or(SourceDataError::MissingField { field: "tokens" })?;
        let seq_len = first.len();

        let mut input_ids = Array2::<u32>::zeros((batch.len(), seq_len));
        for (row, record) in batch.iter().enumerate() {
            let tokens = record
                .tokens
                .as_deref()
                .ok_or(SourceDataError::MissingField { field: "tokens" })?;
            if tokens.len() != seq_len {
                return Err(SourceDataError::ShapeMismatch {
                    row,
                    expected: seq_len,
                    actual: tokens.len(),
                });
            }
            for (col, &token) in tokens.iter().enumerate() {
                input_ids[[row, col]] = token;
            }
        }

        Ok(TokenBatch {
            attention_mask: Array2::ones((batch.len(), seq_len)),
            input_ids,
        })
    }
}

/// Collator for raw-text corpora
///
/// Extracts texts in batch order and hands tokenization, padding, and
/// truncation to the tokenizer capability. Content beyond `max_length`
/// tokens is discarded rather than chunked; long documents are not
/// preserved at full length.
pub struct TextCollator {
    tokenizer: Arc<dyn BatchTokenizer>,
    max_length: usize,
}

impl TextCollator {
    /// Create a collator delegating to the given tokenizer
    #[must_use]
    pub fn new(tokenizer: Arc<dyn BatchTokenizer>) -> Self {
        Self {
            tokenizer,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    /// Set the truncation length
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = len;
        self
    }
}

impl Collator for TextCollator {
    fn collate(&self, batch: &[Record]) -> Result<TokenBatch> {
        let texts = batch
            .iter()
            .map(|record| {
                record
                    .text
                    .as_deref()
                    .ok_or(SourceDataError::MissingField { field: "text" })
            })
            .collect::<Result<Vec<_>>>()?;
        self.tokenizer.encode_batch(&texts, self.max_length)
    }
}
