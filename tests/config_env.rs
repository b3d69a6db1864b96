//! Layered configuration: defaults, TOML file, `SERVE_*` environment, flags.

use std::{
    env,
    io::Write,
    path::PathBuf,
    sync::{LazyLock, Mutex, MutexGuard},
};

use rstest::{fixture, rstest};
use serial_test::serial;
use tempfile::NamedTempFile;
use text_classifier_service::{
    ServeConfig, TcsArgs,
    config::InputType,
    pipeline::{OutputActivation, Side},
};

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

struct EnvVarGuard {
    keys: Vec<String>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvVarGuard {
    fn set(vars: &[(&str, &str)]) -> Self {
        let lock = ENV_LOCK
            .lock()
            .unwrap_or_else(|e| panic!("env lock poisoned: {e}"));
        for (key, val) in vars {
            // Safety: process-wide env mutation is synchronised by ENV_LOCK.
            unsafe { env::set_var(key, val) };
        }
        Self {
            keys: vars.iter().map(|(key, _)| (*key).to_owned()).collect(),
            _lock: lock,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            // Safety: process-wide env mutation is synchronised by ENV_LOCK.
            unsafe { env::remove_var(key) };
        }
    }
}

#[fixture]
fn temp_toml_file() -> NamedTempFile {
    NamedTempFile::new().unwrap_or_else(|e| panic!("create temp file: {e}"))
}

fn write_toml_content(file: &mut NamedTempFile, content: &str) {
    writeln!(file, "{content}").unwrap_or_else(|e| panic!("write config: {e}"));
}

#[rstest]
#[serial]
fn files_path_comes_from_environment() {
    let _guard = EnvVarGuard::set(&[("SERVE_FILES_PATH", "/srv/sentiment")]);
    let cfg = ServeConfig::load_from_env().unwrap_or_else(|e| panic!("load config: {e}"));
    assert_eq!(cfg.files_path, PathBuf::from("/srv/sentiment"));
    assert_eq!(cfg.port, 9001);
}

#[rstest]
#[serial]
fn files_path_has_a_default() {
    let _guard = EnvVarGuard::set(&[]);
    let cfg = ServeConfig::load_from_env().unwrap_or_else(|e| panic!("load config: {e}"));
    assert_eq!(cfg.files_path, PathBuf::from("artefacts"));
}

#[rstest]
#[serial]
fn nested_keys_use_double_underscore() {
    let _guard = EnvVarGuard::set(&[
        ("SERVE_MODEL__INPUT_TYPE", "float32"),
        ("SERVE_MODEL__ACTIVATION", "softmax"),
        ("SERVE_PREPROCESSING__PADDING", "post"),
        ("SERVE_ARTEFACTS__LABELS__FILE", "classes.json"),
    ]);
    let cfg = ServeConfig::load_from_env().unwrap_or_else(|e| panic!("load config: {e}"));
    assert_eq!(cfg.model.input_type, InputType::Float32);
    assert_eq!(cfg.model.activation, OutputActivation::Softmax);
    assert_eq!(cfg.preprocessing.padding, Side::Post);
    assert_eq!(cfg.preprocessing.truncating, Side::Pre);
    assert_eq!(cfg.artefacts.labels.file, "classes.json");
}

#[rstest]
#[serial]
fn environment_overrides_file(mut temp_toml_file: NamedTempFile) {
    write_toml_content(&mut temp_toml_file, "files_path = \"/from/file\"\nport = 8000");
    let _guard = EnvVarGuard::set(&[("SERVE_FILES_PATH", "/from/env")]);
    let cfg = ServeConfig::load_from_env_and_config(temp_toml_file.path())
        .unwrap_or_else(|e| panic!("load config: {e}"));
    assert_eq!(cfg.files_path, PathBuf::from("/from/env"));
    assert_eq!(cfg.port, 8000);
}

#[rstest]
#[serial]
fn invalid_values_are_errors() {
    let _guard = EnvVarGuard::set(&[("SERVE_PORT", "ninety")]);
    assert!(ServeConfig::load_from_env().is_err());
}

#[rstest]
#[serial]
fn missing_config_file_is_an_error() {
    let _guard = EnvVarGuard::set(&[]);
    assert!(ServeConfig::load_from_config(&PathBuf::from("/no/such/config.toml")).is_err());
}

#[rstest]
#[serial]
fn flags_override_every_layer(mut temp_toml_file: NamedTempFile) {
    write_toml_content(&mut temp_toml_file, "port = 8000\nhost = \"127.0.0.1\"");
    let _guard = EnvVarGuard::set(&[("SERVE_FILES_PATH", "/from/env")]);
    let args = TcsArgs {
        config_path: Some(temp_toml_file.path().to_path_buf()),
        files_path: Some(PathBuf::from("/from/flag")),
        port: Some(7000),
        ..TcsArgs::default()
    };
    let cfg = args.resolve().unwrap_or_else(|e| panic!("resolve config: {e}"));
    assert_eq!(cfg.files_path, PathBuf::from("/from/flag"));
    assert_eq!(cfg.port, 7000);
    assert_eq!(cfg.host, "127.0.0.1");
}
