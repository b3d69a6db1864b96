//! The inference request pipeline: tokenize, pad, predict, decode.

mod padding;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use padding::{SequencePadding, Side};

use crate::{
    api::{Prediction, TextClassifier},
    artefact::{Artefacts, LabelEncoder},
    config::PreprocessingConfig,
    model::SequenceModel,
    tokenizer::{TextTokenizer, TokenizerError},
};

/// Errors raised while running a single classification.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Tokenize(#[from] TokenizerError),
    #[error("sequence has {actual} entries but the model expects {expected}")]
    SequenceLength { expected: usize, actual: usize },
    #[error("model failed to score sequence: {0}")]
    Model(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("model produced an empty distribution")]
    EmptyDistribution,
    #[error("model produced no comparable scores")]
    NonFiniteDistribution,
    #[error("model produced {actual} scores but {expected} classes are known")]
    ClassCountMismatch { expected: usize, actual: usize },
    #[error("winning score {value} is not a probability; check model.activation")]
    ProbabilityOutOfRange { value: f32 },
}

/// Transformation applied to raw model scores before decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputActivation {
    /// The graph already ends in a softmax or sigmoid.
    #[default]
    Identity,
    /// The graph emits logits.
    Softmax,
}

impl OutputActivation {
    fn apply(self, scores: Vec<f32>) -> Vec<f32> {
        match self {
            Self::Identity => scores,
            Self::Softmax => softmax(&scores),
        }
    }
}

#[expect(clippy::float_arithmetic, reason = "softmax requires float operations")]
fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores
        .iter()
        .copied()
        .filter(|s| !s.is_nan())
        .fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Tokenizer, label encoder, padding rule, and model bound together.
///
/// Every field is fixed at construction, so a pipeline can be shared across
/// request handlers behind an `Arc` without locking.
#[derive(Debug)]
pub struct InferencePipeline<M> {
    tokenizer: TextTokenizer,
    labels: LabelEncoder,
    padding: SequencePadding,
    activation: OutputActivation,
    model: M,
}

impl<M: SequenceModel> InferencePipeline<M> {
    /// Builds a pipeline from loaded artefacts.
    #[must_use]
    pub fn new(
        artefacts: Artefacts<M>,
        preprocessing: PreprocessingConfig,
        activation: OutputActivation,
    ) -> Self {
        Self {
            tokenizer: artefacts.tokenizer,
            labels: artefacts.labels,
            padding: SequencePadding {
                max_len: artefacts.max_pad_len,
                padding: preprocessing.padding,
                truncating: preprocessing.truncating,
                value: 0,
            },
            activation,
            model: artefacts.model,
        }
    }

    #[must_use]
    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    #[must_use]
    pub fn max_pad_len(&self) -> usize {
        self.padding.max_len
    }

    /// Converts raw text to a sequence of exactly `max_pad_len` indices.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::Tokenize`] when the tokenizer rejects the text.
    pub fn pre_process(&self, text: &str) -> Result<Vec<i64>, InferenceError> {
        let tokens = self.tokenizer.encode(text)?;
        Ok(self.padding.apply(&tokens))
    }

    /// Scores a padded sequence, one value per known class.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::SequenceLength`] for a sequence of the wrong
    /// length and [`InferenceError::Model`] when the model fails.
    pub fn predict(&self, sequence: &[i64]) -> Result<Vec<f32>, InferenceError> {
        if sequence.len() != self.padding.max_len {
            return Err(InferenceError::SequenceLength {
                expected: self.padding.max_len,
                actual: sequence.len(),
            });
        }
        let scores = self
            .model
            .predict(sequence)
            .map_err(|e| InferenceError::Model(Box::new(e)))?;
        Ok(self.activation.apply(scores))
    }

    /// Picks the most probable class and pairs its label with the probability.
    ///
    /// Ties go to the lowest class index. NaN scores never win, and the
    /// winning score must lie in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns an error when the distribution is empty, has no comparable
    /// scores, does not have one score per known label, or its maximum is
    /// not a probability.
    pub fn post_process(&self, distribution: &[f32]) -> Result<Prediction, InferenceError> {
        if distribution.is_empty() {
            return Err(InferenceError::EmptyDistribution);
        }
        if distribution.len() != self.labels.len() {
            return Err(InferenceError::ClassCountMismatch {
                expected: self.labels.len(),
                actual: distribution.len(),
            });
        }
        let (index, probability) = argmax(distribution).ok_or(InferenceError::NonFiniteDistribution)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::ProbabilityOutOfRange { value: probability });
        }
        let label = self
            .labels
            .label(index)
            .ok_or(InferenceError::ClassCountMismatch {
                expected: self.labels.len(),
                actual: distribution.len(),
            })?;
        Ok(Prediction::new(label, probability))
    }

    /// Runs `pre_process`, `predict`, and `post_process` on one text.
    ///
    /// # Errors
    ///
    /// Propagates the first failing stage's error.
    pub fn classify(&self, text: &str) -> Result<Prediction, InferenceError> {
        let sequence = self.pre_process(text)?;
        let distribution = self.predict(&sequence)?;
        self.post_process(&distribution)
    }
}

impl<M: SequenceModel> TextClassifier for InferencePipeline<M> {
    type Error = InferenceError;

    fn classify(&self, text: &str) -> Result<Prediction, Self::Error> {
        InferencePipeline::classify(self, text)
    }
}

/// First index holding the maximum non-NaN value.
fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best, (i, v)| match best {
            Some((_, top)) if v <= top => best,
            _ => Some((i, v)),
        })
}
