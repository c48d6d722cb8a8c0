//! Source-data record

use serde::{Deserialize, Serialize};

/// A single raw example from a source dataset
///
/// Records carry either a pre-tokenized id sequence (tokenized corpora) or
/// raw text (plain-text corpora). Which field a pipeline consumes is decided
/// by the collator paired with the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Pre-tokenized token IDs (if the corpus is tokenized)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<u32>>,
    /// Raw text content (if the corpus is plain text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Record {
    /// Create a record from pre-tokenized IDs
    #[must_use]
    pub fn from_tokens(tokens: Vec<u32>) -> Self {
        Self {
            tokens: Some(tokens),
            text: None,
        }
    }

    /// Create a record from raw text
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            tokens: None,
            text: Some(text.into()),
        }
    }
}
