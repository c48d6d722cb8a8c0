//! Error types for source-data loading.

use thiserror::Error;

/// Result type for source-data operations
pub type Result<T> = std::result::Result<T, SourceDataError>;

/// Errors that can occur while assembling tokenized batches
///
/// Failures are terminal for the affected batch or loader; there is no
/// retry or fallback policy. Recovery is the caller's responsibility.
#[derive(Debug, Error)]
pub enum SourceDataError {
    /// Pretokenized records of unequal length within one batch
    #[error("Sequence length mismatch at row {row}: expected {expected}, got {actual}")]
    ShapeMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A record lacks the field its collator requires
    #[error("Record is missing required field: {field}")]
    MissingField { field: &'static str },

    /// Invalid loader configuration, raised at construction time
    #[error("Invalid loader configuration: {0}")]
    InvalidConfig(String),

    /// Unknown dataset identifier or split
    #[error("Dataset not found: {dataset} (split: {split})")]
    DatasetNotFound { dataset: String, split: String },

    /// Upstream stream failure, propagated unmodified
    #[error("Stream error: {0}")]
    Stream(String),

    /// Tokenizer capability failure, propagated unmodified
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}
