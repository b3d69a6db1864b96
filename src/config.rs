//! Service configuration and its layered loading.
//!
//! Values are resolved from built-in defaults, an optional TOML file, and
//! environment variables prefixed with `SERVE_`, in that order. Nested keys
//! use a double underscore, so `SERVE_MODEL__ACTIVATION=softmax` sets
//! `model.activation`.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    artefact::ArtefactKind,
    pipeline::{OutputActivation, Side},
};

/// Prefix shared by every environment variable the service reads.
pub const ENV_PREFIX: &str = "SERVE_";

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("configuration file {path} does not exist")]
    MissingFile { path: PathBuf },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Directory holding the four artefacts. Read from `SERVE_FILES_PATH`.
    pub files_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub artefacts: ArtefactsConfig,
    pub preprocessing: PreprocessingConfig,
    pub model: ModelConfig,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            files_path: PathBuf::from("artefacts"),
            host: "0.0.0.0".into(),
            port: 9001,
            artefacts: ArtefactsConfig::default(),
            preprocessing: PreprocessingConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

/// File names, relative to `files_path`, and optional pinned digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtefactsConfig {
    pub model: ArtefactFile,
    pub tokenizer: ArtefactFile,
    pub labels: ArtefactFile,
    pub max_pad_len: ArtefactFile,
}

impl Default for ArtefactsConfig {
    fn default() -> Self {
        Self {
            model: ArtefactFile::named("model.onnx"),
            tokenizer: ArtefactFile::named("tokens.json"),
            labels: ArtefactFile::named("label_encoded_classes.npy"),
            max_pad_len: ArtefactFile::named("max_pad_len.txt"),
        }
    }
}

impl ArtefactsConfig {
    #[must_use]
    pub fn get(&self, kind: ArtefactKind) -> &ArtefactFile {
        match kind {
            ArtefactKind::Model => &self.model,
            ArtefactKind::Tokenizer => &self.tokenizer,
            ArtefactKind::Labels => &self.labels,
            ArtefactKind::MaxPadLen => &self.max_pad_len,
        }
    }
}

/// A single artefact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtefactFile {
    pub file: String,
    /// Expected SHA-256 digest as hexadecimal; unchecked when absent.
    #[serde(default)]
    pub sha256: Option<String>,
}

impl ArtefactFile {
    #[must_use]
    pub fn named(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            sha256: None,
        }
    }
}

/// How token sequences are fitted to the model's input length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreprocessingConfig {
    pub padding: Side,
    pub truncating: Side,
}

/// Element type of the model's input tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    #[default]
    Int64,
    Int32,
    /// Keras graphs exported without an explicit input dtype take floats.
    Float32,
}

/// Model graph bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Graph input to feed; the first declared input when unset.
    pub input_name: Option<String>,
    /// Graph output to read; the first declared output when unset.
    pub output_name: Option<String>,
    pub input_type: InputType,
    pub activation: OutputActivation,
}

impl ServeConfig {
    /// Load configuration from defaults and environment variables.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any variable cannot be parsed.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        Self::extract(Self::base().merge(Self::env()))
    }

    /// Load configuration from defaults and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from_config(path: &Path) -> Result<Self, ConfigError> {
        Self::extract(Self::base().merge(Self::file(path)?))
    }

    /// Load configuration from defaults, a TOML file, then the environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if either source contains invalid values.
    pub fn load_from_env_and_config(path: &Path) -> Result<Self, ConfigError> {
        Self::extract(Self::base().merge(Self::file(path)?).merge(Self::env()))
    }

    /// Resolves the path of an artefact inside `files_path`.
    #[must_use]
    pub fn artefact_path(&self, kind: ArtefactKind) -> PathBuf {
        self.files_path.join(&self.artefacts.get(kind).file)
    }

    /// Ensure the configuration values are within acceptable bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for empty paths or file names.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.files_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("files_path must not be empty".into()));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        for kind in ArtefactKind::ALL {
            if self.artefacts.get(kind).file.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{kind} file name must not be empty")));
            }
        }
        Ok(self)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    fn file(path: &Path) -> Result<figment::providers::Data<Toml>, ConfigError> {
        if path.is_file() {
            Ok(Toml::file(path))
        } else {
            Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            })
        }
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract::<Self>()
            .map_err(|e| ConfigError::Load(Box::new(e)))?
            .validate()
    }
}
