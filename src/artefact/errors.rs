use std::{fmt, path::PathBuf};

use thiserror::Error;

/// Boxed cause attached to a corrupt artefact.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The four files that make up a servable model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtefactKind {
    Model,
    Tokenizer,
    Labels,
    MaxPadLen,
}

impl ArtefactKind {
    /// All kinds in load order.
    pub const ALL: [Self; 4] = [Self::Model, Self::Tokenizer, Self::Labels, Self::MaxPadLen];
}

impl fmt::Display for ArtefactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Model => "model",
            Self::Tokenizer => "tokenizer",
            Self::Labels => "label classes",
            Self::MaxPadLen => "max pad length",
        };
        f.write_str(name)
    }
}

/// Start-up failures raised while loading artefacts.
///
/// Every variant is fatal: a service that cannot load all four artefacts must
/// not accept traffic.
#[derive(Debug, Error)]
pub enum ArtefactError {
    #[error("artefact directory {path} does not exist")]
    MissingDirectory { path: PathBuf },
    #[error("missing {kind} artefact at {path}")]
    MissingArtefact { kind: ArtefactKind, path: PathBuf },
    #[error("failed to read {kind} artefact at {path}: {source}")]
    Io {
        kind: ArtefactKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt {kind} artefact at {path}: {source}")]
    CorruptArtefact {
        kind: ArtefactKind,
        path: PathBuf,
        #[source]
        source: BoxedSource,
    },
    #[error("{kind} artefact at {path} expected SHA-256 {expected} but found {actual}")]
    ChecksumMismatch {
        kind: ArtefactKind,
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl ArtefactError {
    /// Builds a [`ArtefactError::CorruptArtefact`] from any error or message.
    pub fn corrupt(kind: ArtefactKind, path: impl Into<PathBuf>, source: impl Into<BoxedSource>) -> Self {
        Self::CorruptArtefact {
            kind,
            path: path.into(),
            source: source.into(),
        }
    }

    /// Returns `true` when the failure means an artefact or its directory is absent.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingDirectory { .. } | Self::MissingArtefact { .. })
    }

    /// Returns `true` when an artefact exists but its content is unusable.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptArtefact { .. } | Self::ChecksumMismatch { .. })
    }
}
