//! Serve a pre-trained text classifier behind a single prediction route.
//!
//! Artefacts are loaded once by [`ArtefactLoader`], bound into an immutable
//! [`InferencePipeline`], and shared with the HTTP handler.

pub mod api;
pub mod artefact;
#[cfg(feature = "server")]
pub mod cli;
pub mod config;
pub mod model;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod tokenizer;

pub use api::{PredictRequest, Prediction, TextClassifier};
pub use artefact::{ArtefactError, ArtefactKind, ArtefactLoader, Artefacts, LabelEncoder};
#[cfg(feature = "server")]
pub use cli::TcsArgs;
pub use config::{ConfigError, ServeConfig};
pub use model::{LoadModel, SequenceModel};
#[cfg(feature = "onnx")]
pub use model::onnx::{OnnxModel, OnnxModelError};
pub use pipeline::{InferenceError, InferencePipeline, OutputActivation};
pub use tokenizer::{TextTokenizer, TokenizerError};
