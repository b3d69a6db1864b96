//! Shared fixtures: a scripted model and a populated artefact directory.
#![allow(dead_code, reason = "each test crate uses a different subset")]

use std::{fs, path::Path};

use serde::Deserialize;
use tempfile::TempDir;
use text_classifier_service::{
    ArtefactError, ArtefactKind, ArtefactLoader, InferencePipeline, LoadModel, OutputActivation,
    SequenceModel, ServeConfig,
    config::{ArtefactFile, ModelConfig, PreprocessingConfig},
};
use thiserror::Error;

pub const MAX_PAD_LEN: usize = 10;
pub const LABELS: [&str; 2] = ["positive", "negative"];

pub const TOKENS_JSON: &str = r#"{"class_name": "Tokenizer", "config": {"num_words": null, "lower": true, "split": " ", "char_level": false, "oov_token": null, "word_index": "{\"a\": 1, \"restaurant\": 2, \"with\": 3, \"great\": 4, \"ambiance\": 5, \"terrible\": 6, \"food\": 7, \"service\": 8}"}}"#;

#[expect(clippy::float_arithmetic, reason = "tolerance comparison")]
#[must_use]
pub fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() < tol
}

#[derive(Debug, Error)]
pub enum MockModelError {
    #[error("engine refused the sequence")]
    Refused,
}

/// Scores `[positive, negative]` from counts of sentiment-bearing tokens.
///
/// With no such tokens, including an all-padding sequence, both classes
/// score 0.5.
#[derive(Debug, Clone, Deserialize)]
pub struct MockModel {
    pub positive_tokens: Vec<i64>,
    #[serde(default)]
    pub negative_tokens: Vec<i64>,
    #[serde(default)]
    pub fail: bool,
}

impl SequenceModel for MockModel {
    type Error = MockModelError;

    #[expect(clippy::float_arithmetic, reason = "mock scoring")]
    #[expect(clippy::cast_precision_loss, reason = "token counts are tiny")]
    fn predict(&self, sequence: &[i64]) -> Result<Vec<f32>, Self::Error> {
        if self.fail {
            return Err(MockModelError::Refused);
        }
        let count = |tokens: &[i64]| sequence.iter().filter(|t| tokens.contains(t)).count() as f32;
        let positive = count(self.positive_tokens.as_slice());
        let negative = count(self.negative_tokens.as_slice());
        let p = (1.0 + positive) / (2.0 + positive + negative);
        Ok(vec![p, 1.0 - p])
    }
}

impl LoadModel for MockModel {
    fn load(path: &Path, _config: &ModelConfig) -> Result<Self, ArtefactError> {
        let bytes = fs::read(path).map_err(|source| ArtefactError::Io {
            kind: ArtefactKind::Model,
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ArtefactError::corrupt(ArtefactKind::Model, path, e))
    }

    fn describe(&self) -> String {
        format!("mock model over {} positive tokens", self.positive_tokens.len())
    }
}

/// A temporary artefact directory plus the configuration that points at it.
pub struct ArtefactDir {
    pub dir: TempDir,
    pub config: ServeConfig,
}

impl ArtefactDir {
    /// Writes a complete, valid set of artefacts.
    #[must_use]
    pub fn valid() -> Self {
        Self::with_model(r#"{"positive_tokens": [4, 5], "negative_tokens": [6]}"#)
    }

    #[must_use]
    pub fn with_model(model_json: &str) -> Self {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("create temp dir: {e}"));
        let mut config = ServeConfig {
            files_path: dir.path().to_path_buf(),
            ..ServeConfig::default()
        };
        config.artefacts.model = ArtefactFile::named("model.json");
        config.artefacts.labels = ArtefactFile::named("label_encoded_classes.json");
        let this = Self { dir, config };
        this.write(ArtefactKind::Model, model_json);
        this.write(ArtefactKind::Tokenizer, TOKENS_JSON);
        this.write(
            ArtefactKind::Labels,
            &serde_json::to_string(&LABELS).unwrap_or_else(|e| panic!("encode labels: {e}")),
        );
        this.write(ArtefactKind::MaxPadLen, &format!("{MAX_PAD_LEN}\n"));
        this
    }

    pub fn write(&self, kind: ArtefactKind, content: &str) {
        fs::write(self.config.artefact_path(kind), content)
            .unwrap_or_else(|e| panic!("write {kind} artefact: {e}"));
    }

    pub fn remove(&self, kind: ArtefactKind) {
        fs::remove_file(self.config.artefact_path(kind))
            .unwrap_or_else(|e| panic!("remove {kind} artefact: {e}"));
    }

    /// Loads the artefacts and builds a pipeline around [`MockModel`].
    #[must_use]
    pub fn pipeline(&self) -> InferencePipeline<MockModel> {
        let artefacts = ArtefactLoader::new(&self.config)
            .load::<MockModel>()
            .unwrap_or_else(|e| panic!("load artefacts: {e}"));
        InferencePipeline::new(
            artefacts,
            PreprocessingConfig::default(),
            OutputActivation::Identity,
        )
    }
}
