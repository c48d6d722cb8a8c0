//! Tokenized batch produced by collation

use ndarray::Array2;

/// Batch of tokenized prompts with attention masks
///
/// `input_ids` and `attention_mask` always share the same
/// `[batch_size, seq_len]` shape. A mask value of 1 marks a real token,
/// 0 marks padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBatch {
    /// Token IDs [batch_size, seq_len]
    pub input_ids: Array2<u32>,
    /// Attention mask [batch_size, seq_len]
    pub attention_mask: Array2<u8>,
}

impl TokenBatch {
    /// Get batch size
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.input_ids.nrows()
    }

    /// Get sequence length
    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.input_ids.ncols()
    }
}
