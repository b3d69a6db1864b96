use serde::{Deserialize, Serialize};

/// Side of a sequence that padding or truncation applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Work on the start of the sequence.
    #[default]
    Pre,
    /// Work on the end of the sequence.
    Post,
}

/// Fixed-length padding matching the model's input shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePadding {
    pub max_len: usize,
    pub padding: Side,
    pub truncating: Side,
    pub value: i64,
}

impl SequencePadding {
    /// Left padding and left truncation with zeros.
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            padding: Side::Pre,
            truncating: Side::Pre,
            value: 0,
        }
    }

    /// Truncates or pads `tokens` to exactly `max_len` entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use text_classifier_service::pipeline::SequencePadding;
    ///
    /// let padding = SequencePadding::new(4);
    /// assert_eq!(padding.apply(&[7, 8]), vec![0, 0, 7, 8]);
    /// assert_eq!(padding.apply(&[1, 2, 3, 4, 5]), vec![2, 3, 4, 5]);
    /// ```
    #[must_use]
    pub fn apply(&self, tokens: &[i64]) -> Vec<i64> {
        let kept = if tokens.len() > self.max_len {
            match self.truncating {
                Side::Pre => &tokens[tokens.len() - self.max_len..],
                Side::Post => &tokens[..self.max_len],
            }
        } else {
            tokens
        };
        let fill = std::iter::repeat_n(self.value, self.max_len - kept.len());
        match self.padding {
            Side::Pre => fill.chain(kept.iter().copied()).collect(),
            Side::Post => kept.iter().copied().chain(fill).collect(),
        }
    }
}
