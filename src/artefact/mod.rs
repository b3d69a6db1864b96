//! Start-up loading of the four artefacts a classifier needs.
//!
//! Loading is all-or-nothing: every file is checked for existence before any
//! is parsed, optional checksums are verified next, and only then are the
//! contents decoded.
mod checksum;
mod errors;
mod labels;

use std::{fs, path::PathBuf};

pub use checksum::{compute_sha256, verify_sha256};
pub use errors::{ArtefactError, ArtefactKind, BoxedSource};
pub use labels::{LabelEncoder, LabelsError};

use crate::{config::ServeConfig, model::LoadModel, tokenizer::TextTokenizer};

/// Everything restored from the artefact directory.
#[derive(Debug)]
pub struct Artefacts<M> {
    pub tokenizer: TextTokenizer,
    pub labels: LabelEncoder,
    pub max_pad_len: usize,
    pub model: M,
}

/// Resolves and loads artefacts described by a [`ServeConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ArtefactLoader<'c> {
    config: &'c ServeConfig,
}

impl<'c> ArtefactLoader<'c> {
    #[must_use]
    pub fn new(config: &'c ServeConfig) -> Self {
        Self { config }
    }

    /// Loads all four artefacts, restoring the model with `M`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::MissingDirectory`] or
    /// [`ArtefactError::MissingArtefact`] when files are absent, and a corrupt
    /// variant when any content fails to parse or verify.
    pub fn load<M: LoadModel>(&self) -> Result<Artefacts<M>, ArtefactError> {
        let dir = &self.config.files_path;
        if !dir.is_dir() {
            return Err(ArtefactError::MissingDirectory { path: dir.clone() });
        }
        for kind in ArtefactKind::ALL {
            let path = self.path(kind);
            if !path.is_file() {
                return Err(ArtefactError::MissingArtefact { kind, path });
            }
        }
        for kind in ArtefactKind::ALL {
            if let Some(expected) = &self.config.artefacts.get(kind).sha256 {
                verify_sha256(kind, &self.path(kind), expected)?;
                tracing::debug!(%kind, "checksum verified");
            }
        }

        let max_pad_len = self.load_max_pad_len()?;
        let labels = self.load_labels()?;
        let tokenizer = self.load_tokenizer()?;
        let model_path = self.path(ArtefactKind::Model);
        let model = M::load(&model_path, &self.config.model)?;

        tracing::info!(
            dir = %dir.display(),
            max_pad_len,
            labels = labels.len(),
            vocabulary = tokenizer.vocabulary_size(),
            model = %model.describe(),
            "artefacts loaded"
        );
        Ok(Artefacts {
            tokenizer,
            labels,
            max_pad_len,
            model,
        })
    }

    fn path(&self, kind: ArtefactKind) -> PathBuf {
        self.config.artefact_path(kind)
    }

    fn read(&self, kind: ArtefactKind) -> Result<(PathBuf, Vec<u8>), ArtefactError> {
        let path = self.path(kind);
        match fs::read(&path) {
            Ok(bytes) => Ok((path, bytes)),
            Err(source) => Err(ArtefactError::Io { kind, path, source }),
        }
    }

    fn read_text(&self, kind: ArtefactKind) -> Result<(PathBuf, String), ArtefactError> {
        let (path, bytes) = self.read(kind)?;
        match String::from_utf8(bytes) {
            Ok(text) => Ok((path, text)),
            Err(e) => Err(ArtefactError::corrupt(kind, path, e)),
        }
    }

    fn load_max_pad_len(&self) -> Result<usize, ArtefactError> {
        let kind = ArtefactKind::MaxPadLen;
        let (path, text) = self.read_text(kind)?;
        let value = text.trim();
        match value.parse::<usize>() {
            Ok(0) => Err(ArtefactError::corrupt(kind, path, "max pad length must be greater than zero")),
            Ok(len) => Ok(len),
            Err(e) => Err(ArtefactError::corrupt(
                kind,
                path,
                format!("{value:?} is not a positive integer: {e}"),
            )),
        }
    }

    fn load_labels(&self) -> Result<LabelEncoder, ArtefactError> {
        let kind = ArtefactKind::Labels;
        let (path, bytes) = self.read(kind)?;
        LabelEncoder::from_bytes(&self.config.artefacts.labels.file, &bytes)
            .map_err(|e| ArtefactError::corrupt(kind, path, e))
    }

    fn load_tokenizer(&self) -> Result<TextTokenizer, ArtefactError> {
        let kind = ArtefactKind::Tokenizer;
        let (path, text) = self.read_text(kind)?;
        TextTokenizer::from_json(&text).map_err(|e| ArtefactError::corrupt(kind, path, e))
    }
}
