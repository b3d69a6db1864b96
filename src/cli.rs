//! Command-line arguments for the `tcs` binary.
//!
//! Flags override values resolved by [`ServeConfig`]'s layered loading, so a
//! deployment can keep its settings in `SERVE_*` variables or a TOML file and
//! still adjust a single value at launch.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, ServeConfig};

/// Serve a pre-trained text classifier over HTTP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "tcs", version, about)]
pub struct TcsArgs {
    /// Optional path to a TOML configuration file.
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Directory holding the model artefacts; overrides `SERVE_FILES_PATH`.
    #[arg(long)]
    pub files_path: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind.
    #[arg(long)]
    pub port: Option<u16>,

    /// Load and verify the artefacts, then exit without serving.
    #[arg(long)]
    pub check: bool,
}

impl TcsArgs {
    /// Resolve the effective configuration for these arguments.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a source is unreadable or a value invalid.
    pub fn resolve(&self) -> Result<ServeConfig, ConfigError> {
        let mut config = match &self.config_path {
            Some(path) => ServeConfig::load_from_env_and_config(path)?,
            None => ServeConfig::load_from_env()?,
        };
        if let Some(files_path) = &self.files_path {
            config.files_path.clone_from(files_path);
        }
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        config.validate()
    }
}
