//! Tests for configuration loading and root folder resolution
//!
//! Tests that touch SURVEY_ROOT_FOLDER are marked #[serial] so they never
//! race each other on the process environment.

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use survey_common::config::{
    CompiledDefaults, LoggingConfig, RecommenderConfig, RootFolderInitializer,
    RootFolderResolver, TomlConfig, DEFAULT_PORT, ROOT_FOLDER_ENV,
};
use tempfile::TempDir;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults.root_folder.ends_with("survey") || defaults.root_folder.ends_with("survey_data"));
    assert_eq!(defaults.port, DEFAULT_PORT);
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root_folder = RootFolderResolver::new("test-module").resolve();

    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_env_var() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/survey-test-env-folder");

    let root_folder = RootFolderResolver::new("test-module")
        .with_toml_root(Some(PathBuf::from("/tmp/from-toml")))
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/survey-test-env-folder"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_cli_arg_takes_precedence() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/survey-test-env-folder");

    let root_folder = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/from-cli")))
        .with_toml_root(Some(PathBuf::from("/tmp/from-toml")))
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_toml_root_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root_folder = RootFolderResolver::new("test-module")
        .with_toml_root(Some(PathBuf::from("/tmp/from-toml")))
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/from-toml"));
}

#[test]
fn test_initializer_creates_directory_idempotently() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("a").join("b");
    let initializer = RootFolderInitializer::new(root.clone());

    assert!(!initializer.database_exists());
    initializer.ensure_directory_exists().unwrap();
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join("survey.db"));
    assert_eq!(initializer.export_path(), root.join("responses.ndjson"));
    assert_eq!(initializer.root_folder(), root.as_path());

    std::fs::write(initializer.database_path(), b"").unwrap();
    assert!(initializer.database_exists());
}

#[test]
fn test_load_or_default_reads_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("survey-server.toml");
    std::fs::write(
        &path,
        r#"
        root_folder = "/var/lib/survey"
        port = 8080
        static_dir = "frontend"

        [logging]
        level = "debug"

        [recommender]
        timeout_secs = 5
        top = 3
        "#,
    )
    .unwrap();

    let config = TomlConfig::load_or_default(Some(&path), "survey-server").unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/var/lib/survey")));
    assert_eq!(config.port, Some(8080));
    assert_eq!(config.static_dir, Some(PathBuf::from("frontend")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.recommender.timeout_secs, 5);
    assert_eq!(config.recommender.top, 3);
    assert_eq!(config.recommender.program, RecommenderConfig::default().program);
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let result = TomlConfig::load_or_default(Some(&path), "survey-server");

    assert!(result.is_err());
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let err = TomlConfig::load(&path).unwrap_err();

    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_toml_roundtrip() {
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/data")),
        port: Some(4000),
        bind: Some("127.0.0.1".to_string()),
        static_dir: None,
        logging: LoggingConfig::default(),
        recommender: RecommenderConfig::default(),
    };

    let toml_str = toml::to_string(&config).unwrap();
    let parsed: TomlConfig = toml::from_str(&toml_str).unwrap();

    assert_eq!(parsed.root_folder, Some(PathBuf::from("/data")));
    assert_eq!(parsed.port, Some(4000));
    assert_eq!(parsed.recommender, RecommenderConfig::default());
}
