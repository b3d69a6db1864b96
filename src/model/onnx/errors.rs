use thiserror::Error;

/// Errors produced by the ONNX Runtime model.
#[derive(Debug, Error)]
pub enum OnnxModelError {
    #[error("failed to construct ONNX session builder: {0}")]
    CreateSessionBuilder(#[source] ort::Error),
    #[error("failed to create ONNX session: {0}")]
    CreateSession(#[source] ort::Error),
    #[error("model graph declares no inputs")]
    MissingInputs,
    #[error("model graph declares no outputs")]
    MissingOutputs,
    #[error("model graph has no input named \"{name}\"")]
    UnknownInput { name: String },
    #[error("model graph has no output named \"{name}\"")]
    UnknownOutput { name: String },
    #[error("token index {index} does not fit the model's int32 input")]
    IndexOverflow { index: i64 },
    #[error("failed to convert sequence into tensor: {0}")]
    EncodeTensor(#[source] ort::Error),
    #[error("session mutex was poisoned by a previous panic")]
    SessionPoisoned,
    #[error("failed to run inference: {0}")]
    Inference(#[source] ort::Error),
    #[error("ONNX output \"{name}\" missing from session results")]
    OutputMissing { name: String },
}
