//! Integration tests for the config crate

use pnp_sequencer_config::{validate_config, AppConfig, ConfigError, ConfigLoader, LogFormat};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_default_config() {
    let config = ConfigLoader::from_file(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../config/default.toml")
            .as_path(),
    )
    .expect("Failed to load default config");

    assert_eq!(config, AppConfig::default());
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_yaml_file_round_trip() {
    let mut config = AppConfig::default();
    config.engine.park_when_complete = true;
    config.logging.format = LogFormat::Json;

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(serde_yaml::to_string(&config).unwrap().as_bytes())
        .unwrap();

    let loaded = ConfigLoader::from_file(file.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_builder_file_and_env_layers() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(b"[engine]\nmax_cycle_size = 3\n").unwrap();

    std::env::set_var("PNP_IT_LAYER_LOGGING__LEVEL", "debug");
    let config = ConfigLoader::builder()
        .add_file(file.path(), true)
        .add_env("PNP_IT_LAYER")
        .build()
        .unwrap();
    std::env::remove_var("PNP_IT_LAYER_LOGGING__LEVEL");

    assert_eq!(config.engine.max_cycle_size, Some(3));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_missing_required_file_fails() {
    let result = ConfigLoader::builder()
        .add_file(std::path::Path::new("/nonexistent/pnp.toml"), true)
        .build();
    assert!(matches!(result, Err(ConfigError::ConfigLibError(_))));
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let mut file: NamedTempFile = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(b"[engine\npark_when_complete = ").unwrap();

    let result = ConfigLoader::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::TomlError(_))));
}
