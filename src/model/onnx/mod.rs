//! ONNX Runtime backed sequence model.
//!
//! The exported classifier graph takes a `[1, max_pad_len]` tensor of token
//! indices and returns a `[1, n_classes]` tensor of scores.

mod errors;

use std::{path::Path, sync::Mutex};

use ort::{session::Session, value::TensorRef};

pub use errors::OnnxModelError;

use super::{LoadModel, SequenceModel};
use crate::{
    artefact::{ArtefactError, ArtefactKind},
    config::{InputType, ModelConfig},
};

#[derive(Debug)]
pub struct OnnxModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    input_type: InputType,
}

impl OnnxModel {
    /// Creates a session for the graph at `path` and binds its input and output.
    ///
    /// # Errors
    ///
    /// Returns an error when the session cannot be created or the configured
    /// input or output name is not declared by the graph.
    pub fn from_file(path: &Path, config: &ModelConfig) -> Result<Self, OnnxModelError> {
        let session = Session::builder()
            .map_err(OnnxModelError::CreateSessionBuilder)?
            .commit_from_file(path)
            .map_err(OnnxModelError::CreateSession)?;

        let inputs: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        let input_name = bind_name(
            &inputs,
            config.input_name.as_deref(),
            |name| OnnxModelError::UnknownInput { name },
            OnnxModelError::MissingInputs,
        )?;
        if inputs.len() > 1 {
            tracing::warn!(
                inputs = ?inputs,
                bound = %input_name,
                "model declares several inputs; only one is fed"
            );
        }

        let outputs: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        let output_name = bind_name(
            &outputs,
            config.output_name.as_deref(),
            |name| OnnxModelError::UnknownOutput { name },
            OnnxModelError::MissingOutputs,
        )?;

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            input_type: config.input_type,
        })
    }

    /// Runs the graph on one sequence, batched as `[1, len]`.
    ///
    /// # Errors
    ///
    /// Returns encoding or runtime errors from ONNX Runtime.
    pub fn run(&self, sequence: &[i64]) -> Result<Vec<f32>, OnnxModelError> {
        let shape = [1_usize, sequence.len()];
        let input = InputData::convert(self.input_type, sequence)?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| OnnxModelError::SessionPoisoned)?;

        macro_rules! score {
            ($data:expr) => {{
                let tensor = TensorRef::from_array_view((shape, $data))
                    .map_err(OnnxModelError::EncodeTensor)?;
                let outputs = session
                    .run(ort::inputs! { self.input_name.as_str() => tensor })
                    .map_err(OnnxModelError::Inference)?;
                let value = outputs.get(self.output_name.as_str()).ok_or_else(|| {
                    OnnxModelError::OutputMissing {
                        name: self.output_name.clone(),
                    }
                })?;
                let (_, scores) = value
                    .try_extract_tensor::<f32>()
                    .map_err(OnnxModelError::Inference)?;
                scores.to_vec()
            }};
        }

        let scores = match input {
            InputData::Int64(data) => score!(data),
            InputData::Int32(data) => score!(data.as_slice()),
            InputData::Float32(data) => score!(data.as_slice()),
        };
        Ok(scores)
    }
}

/// Picks the configured graph name, or the first declared one when unset.
fn bind_name(
    declared: &[&str],
    configured: Option<&str>,
    unknown: impl FnOnce(String) -> OnnxModelError,
    missing: OnnxModelError,
) -> Result<String, OnnxModelError> {
    match configured {
        Some(name) if declared.contains(&name) => Ok(name.to_owned()),
        Some(name) => Err(unknown(name.to_owned())),
        None => declared
            .first()
            .map(|name| (*name).to_owned())
            .ok_or(missing),
    }
}

/// Token indices in the element type the graph input declares.
#[derive(Debug, PartialEq)]
enum InputData<'s> {
    Int64(&'s [i64]),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
}

impl<'s> InputData<'s> {
    fn convert(input_type: InputType, sequence: &'s [i64]) -> Result<Self, OnnxModelError> {
        match input_type {
            InputType::Int64 => Ok(Self::Int64(sequence)),
            InputType::Int32 => sequence
                .iter()
                .map(|&index| i32::try_from(index).map_err(|_| OnnxModelError::IndexOverflow { index }))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Int32),
            InputType::Float32 => {
                #[expect(
                    clippy::cast_precision_loss,
                    reason = "vocabulary indices stay far below 2^24"
                )]
                let data = sequence.iter().map(|&index| index as f32).collect();
                Ok(Self::Float32(data))
            }
        }
    }
}

impl SequenceModel for OnnxModel {
    type Error = OnnxModelError;

    fn predict(&self, sequence: &[i64]) -> Result<Vec<f32>, Self::Error> {
        self.run(sequence)
    }
}

impl LoadModel for OnnxModel {
    fn load(path: &Path, config: &ModelConfig) -> Result<Self, ArtefactError> {
        Self::from_file(path, config).map_err(|e| ArtefactError::corrupt(ArtefactKind::Model, path, e))
    }

    fn describe(&self) -> String {
        format!(
            "ONNX graph, input \"{}\" ({:?}), output \"{}\"",
            self.input_name, self.input_type, self.output_name
        )
    }
}
