//! Word-index tokenizer compatible with documents written by Keras'
//! `Tokenizer.to_json()`.

use std::collections::HashMap;

use serde::Deserialize;

use super::TokenizerError;

const DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// Field that Keras stores either as a JSON-encoded string or inline.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Embedded<T> {
    Inline(T),
    Encoded(String),
}

impl<T: serde::de::DeserializeOwned> Embedded<T> {
    fn decode(self) -> Result<T, serde_json::Error> {
        match self {
            Self::Inline(value) => Ok(value),
            Self::Encoded(text) => serde_json::from_str(&text),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Document {
    class_name: String,
    config: DocumentConfig,
}

#[derive(Debug, Deserialize)]
struct DocumentConfig {
    #[serde(default)]
    num_words: Option<usize>,
    #[serde(default = "default_filters")]
    filters: String,
    #[serde(default = "default_lower")]
    lower: bool,
    #[serde(default = "default_split")]
    split: String,
    #[serde(default)]
    char_level: bool,
    #[serde(default)]
    oov_token: Option<String>,
    word_index: Embedded<HashMap<String, i64>>,
}

fn default_filters() -> String {
    DEFAULT_FILTERS.to_owned()
}

fn default_lower() -> bool {
    true
}

fn default_split() -> String {
    " ".to_owned()
}

/// Vocabulary lookup plus the text normalisation rules it was fitted with.
#[derive(Debug, Clone)]
pub struct KerasTokenizer {
    word_index: HashMap<String, i64>,
    num_words: Option<usize>,
    filters: Vec<char>,
    lower: bool,
    split: String,
    char_level: bool,
    oov_index: Option<i64>,
}

impl KerasTokenizer {
    /// Parses a `to_json()` document that has already been unwrapped to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizerError::Keras`] when the document is not a Keras
    /// tokenizer or its vocabulary cannot be decoded.
    pub fn from_value(value: serde_json::Value) -> Result<Self, TokenizerError> {
        let document: Document =
            serde_json::from_value(value).map_err(|e| TokenizerError::Keras(e.to_string()))?;
        if document.class_name != "Tokenizer" {
            return Err(TokenizerError::Keras(format!(
                "expected class_name \"Tokenizer\" but found {:?}",
                document.class_name
            )));
        }
        let config = document.config;
        let word_index = config
            .word_index
            .decode()
            .map_err(|e| TokenizerError::Keras(format!("invalid word_index: {e}")))?;
        if config.split.is_empty() && !config.char_level {
            return Err(TokenizerError::Keras("split string is empty".into()));
        }
        let oov_index = config
            .oov_token
            .as_ref()
            .and_then(|token| word_index.get(token).copied());
        Ok(Self {
            word_index,
            num_words: config.num_words,
            filters: config.filters.chars().collect(),
            lower: config.lower,
            split: config.split,
            char_level: config.char_level,
            oov_index,
        })
    }

    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.word_index.len()
    }

    /// Maps `text` to vocabulary indices, applying the OOV and `num_words` policy.
    #[must_use]
    pub fn encode(&self, text: &str) -> Vec<i64> {
        self.tokens(text)
            .iter()
            .filter_map(|token| self.lookup(token))
            .collect()
    }

    fn lookup(&self, token: &str) -> Option<i64> {
        match self.word_index.get(token) {
            Some(&index) if self.exceeds_num_words(index) => self.oov_index,
            Some(&index) => Some(index),
            None => self.oov_index,
        }
    }

    fn exceeds_num_words(&self, index: i64) -> bool {
        match self.num_words {
            Some(limit) if limit > 0 => usize::try_from(index).map_or(true, |i| i >= limit),
            _ => false,
        }
    }

    fn tokens(&self, text: &str) -> Vec<String> {
        let text = if self.lower {
            text.to_lowercase()
        } else {
            text.to_owned()
        };
        if self.char_level {
            return text.chars().map(String::from).collect();
        }
        let mut cleaned = String::with_capacity(text.len());
        for c in text.chars() {
            if self.filters.contains(&c) {
                cleaned.push_str(&self.split);
            } else {
                cleaned.push(c);
            }
        }
        cleaned
            .split(self.split.as_str())
            .filter(|piece| !piece.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn tokenizer(config: serde_json::Value) -> KerasTokenizer {
        KerasTokenizer::from_value(json!({ "class_name": "Tokenizer", "config": config }))
            .unwrap_or_else(|e| panic!("parse tokenizer: {e}"))
    }

    #[fixture]
    fn restaurant() -> KerasTokenizer {
        tokenizer(json!({
            "num_words": null,
            "oov_token": null,
            "word_index": "{\"a\": 1, \"restaurant\": 2, \"with\": 3, \"great\": 4, \"food\": 5}"
        }))
    }

    #[rstest]
    fn lowercases_and_strips_punctuation(restaurant: KerasTokenizer) {
        assert_eq!(restaurant.encode("A restaurant, with GREAT food!"), [1, 2, 3, 4, 5]);
    }

    #[rstest]
    fn drops_unknown_words_without_oov_token(restaurant: KerasTokenizer) {
        assert_eq!(restaurant.encode("A restaurant with great ambiance"), [1, 2, 3, 4]);
    }

    #[rstest]
    fn empty_text_has_no_tokens(restaurant: KerasTokenizer) {
        assert!(restaurant.encode("").is_empty());
        assert!(restaurant.encode(" ,.! ").is_empty());
    }

    #[test]
    fn maps_unknown_words_to_oov_index() {
        let t = tokenizer(json!({
            "oov_token": "<OOV>",
            "word_index": { "<OOV>": 1, "good": 2, "bad": 3 }
        }));
        assert_eq!(t.encode("good vibes bad"), [2, 1, 3]);
    }

    #[rstest]
    #[case(Some("<OOV>"), vec![1, 2, 1])]
    #[case(None, vec![2])]
    fn applies_num_words_limit(#[case] oov: Option<&str>, #[case] expected: Vec<i64>) {
        let t = tokenizer(json!({
            "num_words": 3,
            "oov_token": oov,
            "word_index": { "<OOV>": 1, "good": 2, "rare": 3 }
        }));
        assert_eq!(t.encode("unseen good rare"), expected);
    }

    #[test]
    fn keeps_case_when_lower_is_false() {
        let t = tokenizer(json!({
            "lower": false,
            "word_index": { "Good": 1, "good": 2 }
        }));
        assert_eq!(t.encode("Good good"), [1, 2]);
    }

    #[test]
    fn splits_characters_at_char_level() {
        let t = tokenizer(json!({
            "char_level": true,
            "word_index": { "a": 1, "b": 2 }
        }));
        assert_eq!(t.encode("AbC"), [1, 2]);
    }

    #[rstest]
    #[case(json!({ "class_name": "Tokenizer", "config": { "word_index": "{not json" } }))]
    #[case(json!({ "class_name": "TextVectorization", "config": { "word_index": {} } }))]
    #[case(json!({ "class_name": "Tokenizer", "config": {} }))]
    fn rejects_malformed_documents(#[case] document: serde_json::Value) {
        assert!(KerasTokenizer::from_value(document).is_err());
    }
}
