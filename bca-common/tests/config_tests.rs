//! Configuration resolution and graceful degradation tests
//!
//! Tests that manipulate BCA_* environment variables are marked #[serial]
//! so they never run concurrently.

use bca_common::config::{ConfigResolver, TomlConfig, CONFIG_ENV_VAR};
use bca_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(CONFIG_ENV_VAR);
    env::remove_var("BCA_LOG_LEVEL");
    env::remove_var("BCA_GENERATIVE_URL");
    env::remove_var("BCA_GENERATIVE_MODEL");
    env::remove_var("BCA_GENERATIVE_API_KEY");
}

#[test]
#[serial]
fn test_explicit_path_wins_over_env() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let explicit = dir.path().join("explicit.toml");
    let from_env = dir.path().join("env.toml");
    fs::write(&explicit, "[pipeline]\nbatch_size = 12\n").unwrap();
    fs::write(&from_env, "[pipeline]\nbatch_size = 99\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &from_env);

    let config = ConfigResolver::new(Some(explicit)).load().unwrap();
    assert_eq!(config.pipeline.batch_size, 12);

    clear_env();
}

#[test]
#[serial]
fn test_env_path_used_without_explicit_path() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let from_env = dir.path().join("env.toml");
    fs::write(&from_env, "[scoring]\nmax_evidence_items = 4\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &from_env);

    let config = ConfigResolver::new(None).load().unwrap();
    assert_eq!(config.scoring.max_evidence_items, 4);

    clear_env();
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let config = ConfigResolver::new(Some(missing)).load().unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_malformed_file_is_fatal() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "this is = = not toml").unwrap();

    let result = ConfigResolver::new(Some(bad)).load();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_invalid_weights_rejected_at_load() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("weights.toml");
    fs::write(
        &path,
        "[pipeline.segment_weights]\nconsumer = 0.5\nmarket = 0.5\nproduct = 0.5\nbrand = 0.0\nexperience = 0.0\n",
    )
    .unwrap();

    let result = ConfigResolver::new(Some(path)).load();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_overrides_toml_values() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[logging]\nlevel = \"warn\"\n\n[generative]\nmodel = \"from-toml\"\n",
    )
    .unwrap();
    env::set_var("BCA_LOG_LEVEL", "debug");
    env::set_var("BCA_GENERATIVE_URL", "http://10.0.0.5:11434");
    env::set_var("BCA_GENERATIVE_MODEL", "from-env");

    let config = ConfigResolver::new(Some(path)).load().unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.generative.base_url, "http://10.0.0.5:11434");
    assert_eq!(config.generative.model, "from-env");
    assert!(config.generative.enabled, "setting a URL enables the backend");

    clear_env();
}

#[test]
#[serial]
fn test_blank_env_values_are_ignored() {
    clear_env();
    env::set_var("BCA_LOG_LEVEL", "   ");

    let mut config = TomlConfig::default();
    config.apply_env_overrides();
    assert_eq!(config.logging.level, "info");

    clear_env();
}
