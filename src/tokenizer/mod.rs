//! Text-to-index tokenizers built from a persisted definition.
//!
//! Two definitions are understood: the document written by Keras'
//! `Tokenizer.to_json()` and a Hugging Face `tokenizer.json`. The format is
//! detected from the document itself.

mod keras;

use std::str::FromStr;

use thiserror::Error;
use tokenizers::Tokenizer;

pub use keras::KerasTokenizer;

/// Errors raised while building a tokenizer or encoding text.
#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("tokenizer definition is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("tokenizer definition is neither a Keras nor a Hugging Face tokenizer")]
    UnknownFormat,
    #[error("invalid Keras tokenizer: {0}")]
    Keras(String),
    #[error("invalid Hugging Face tokenizer: {0}")]
    Load(#[source] tokenizers::Error),
    #[error("failed to disable tokenizer truncation: {0}")]
    ConfigureTruncation(#[source] tokenizers::Error),
    #[error("failed to encode text: {0}")]
    Encode(#[source] tokenizers::Error),
}

/// Tokenizer restored from disk; immutable after construction.
#[derive(Debug, Clone)]
pub enum TextTokenizer {
    Keras(KerasTokenizer),
    HuggingFace(Box<Tokenizer>),
}

impl TextTokenizer {
    /// Builds a tokenizer from the text of its persisted definition.
    ///
    /// The document may be JSON-string encoded once more, as happens when
    /// the output of `to_json()` is itself passed through `json.dump`.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenizerError`] when the text is not JSON or does not
    /// describe a supported tokenizer.
    pub fn from_json(text: &str) -> Result<Self, TokenizerError> {
        let mut value: serde_json::Value =
            serde_json::from_str(text).map_err(TokenizerError::Json)?;
        let mut raw = text.to_owned();
        if let serde_json::Value::String(inner) = value {
            value = serde_json::from_str(&inner).map_err(TokenizerError::Json)?;
            raw = inner;
        }

        if value.get("class_name").is_some() {
            return KerasTokenizer::from_value(value).map(Self::Keras);
        }
        if value.get("model").is_some() {
            return Self::hugging_face(&raw);
        }
        Err(TokenizerError::UnknownFormat)
    }

    fn hugging_face(raw: &str) -> Result<Self, TokenizerError> {
        let mut tokenizer = Tokenizer::from_str(raw).map_err(TokenizerError::Load)?;
        // The pipeline pads and truncates to the model's input length itself.
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(TokenizerError::ConfigureTruncation)?;
        Ok(Self::HuggingFace(Box::new(tokenizer)))
    }

    /// Number of entries in the vocabulary.
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        match self {
            Self::Keras(tokenizer) => tokenizer.vocabulary_size(),
            Self::HuggingFace(tokenizer) => tokenizer.get_vocab_size(true),
        }
    }

    /// Maps `text` to vocabulary indices without padding.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizerError::Encode`] when a Hugging Face tokenizer fails.
    pub fn encode(&self, text: &str) -> Result<Vec<i64>, TokenizerError> {
        match self {
            Self::Keras(tokenizer) => Ok(tokenizer.encode(text)),
            Self::HuggingFace(tokenizer) => {
                let encoding = tokenizer
                    .encode(text, true)
                    .map_err(TokenizerError::Encode)?;
                Ok(encoding.get_ids().iter().map(|id| i64::from(*id)).collect())
            }
        }
    }
}
