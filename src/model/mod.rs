//! The narrow interface between the pipeline and an inference engine.

#[cfg(feature = "onnx")]
pub mod onnx;

use std::path::Path;

use crate::{artefact::ArtefactError, config::ModelConfig};

/// Scores a fixed-length token sequence.
///
/// Implementations hold read-only state after loading and may be called from
/// several request handlers at once.
pub trait SequenceModel: Send + Sync {
    /// Error type returned when scoring fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Produce one score per class for `sequence`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails on this input.
    fn predict(&self, sequence: &[i64]) -> Result<Vec<f32>, Self::Error>;
}

/// A model that can be restored from its artefact file.
pub trait LoadModel: SequenceModel + Sized {
    /// Load the model stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::CorruptArtefact`] when the engine rejects the file.
    fn load(path: &Path, config: &ModelConfig) -> Result<Self, ArtefactError>;

    /// One-line description logged after a successful load.
    fn describe(&self) -> String;
}
