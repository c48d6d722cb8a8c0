//! Tokenizer capability for the raw-text path
//!
//! Text-to-id encoding and padding are delegated to an external tokenizer;
//! this module defines only the surface the text collator consumes, plus a
//! small word-level implementation for tests and local smoke corpora.

use std::collections::HashMap;

use ndarray::Array2;

use crate::batch::TokenBatch;
use crate::error::{Result, SourceDataError};

/// Batch encoder with padding and truncation
///
/// `encode_batch` returns ids and mask with identical `[batch, max_length]`
/// shape, rows aligned with the input texts. Everywhere `mask == 0`, the id
/// must equal `pad_token_id`.
pub trait BatchTokenizer: Send + Sync {
    /// ID used for padding positions
    fn pad_token_id(&self) -> u32;

    /// Encode texts with padding on and truncation at `max_length`
    fn encode_batch(&self, texts: &[&str], max_length: usize) -> Result<TokenBatch>;
}

/// Padding token ID of [`WhitespaceTokenizer`]
pub const PAD_TOKEN_ID: u32 = 0;
/// Unknown-word token ID of [`WhitespaceTokenizer`]
pub const UNK_TOKEN_ID: u32 = 1;

/// Word-level tokenizer splitting on whitespace
///
/// Vocabulary is built from a corpus at construction; words outside it map
/// to [`UNK_TOKEN_ID`]. Every row is padded to exactly `max_length`.
pub struct WhitespaceTokenizer {
    vocab: HashMap<String, u32>,
}

impl WhitespaceTokenizer {
    /// Build a vocabulary from a corpus, assigning IDs in first-seen order
    #[must_use]
    pub fn from_corpus(corpus: &[&str]) -> Self {
        let mut vocab = HashMap::new();
        let mut next_id = UNK_TOKEN_ID + 1;
        for text in corpus {
            for word in text.split_whitespace() {
                vocab.entry(word.to_string()).or_insert_with(|| {
                    let id = next_id;
                    next_id += 1;
                    id
                });
            }
        }
        Self { vocab }
    }

    /// Get vocabulary size (excluding pad and unk)
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }
}

impl BatchTokenizer for WhitespaceTokenizer {
    fn pad_token_id(&self) -> u32 {
        PAD_TOKEN_ID
    }

    fn encode_batch(&self, texts: &[&str], max_length: usize) -> Result<TokenBatch> {
        if texts.is_empty() {
            return Err(SourceDataError::Tokenizer("empty batch".into()));
        }
        if max_length == 0 {
            return Err(SourceDataError::Tokenizer(
                "max_length must be positive".into(),
            ));
        }

        let mut input_ids = Array2::from_elem((texts.len(), max_length), PAD_TOKEN_ID);
        let mut attention_mask = Array2::<u8>::zeros((texts.len(), max_length));

        for (i, text) in texts.iter().enumerate() {
            for (j, word) in text.split_whitespace().take(max_length).enumerate() {
                input_ids[[i, j]] = self.vocab.get(word).copied().unwrap_or(UNK_TOKEN_ID);
                attention_mask[[i, j]] = 1;
            }
        }

        Ok(TokenBatch {
            input_ids,
            attention_mask,
        })
    }
}
