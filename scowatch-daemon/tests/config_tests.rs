//! Configuration loading tests.
//!
//! Tests file loading, CLI precedence over env and file, and validation
//! of the rule configuration.

use clap::Parser;
use serial_test::serial;

use scowatch_core::error::{ConfigError, PipelineError, ScowatchError};
use scowatch_daemon::cli::DaemonCli;
use scowatch_daemon::orchestrator::{load_config, validate_config};

fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("scowatch.toml");
    std::fs::write(&path, content).expect("write config");
    path
}

#[tokio::test]
#[serial]
async fn test_load_without_file_uses_defaults() {
    // Given: no config file
    let cli = DaemonCli::try_parse_from(["scowatch"]).expect("cli");

    // When: loading
    let config = load_config(&cli).await.expect("defaults should load");

    // Then: built-in defaults
    assert_eq!(config.monitor.log_path, "logSelfcheckout.log");
    assert_eq!(config.monitor.poll_interval_ms, 100);
    assert!(config.monitor.aggregate_transactions);
}

#[tokio::test]
#[serial]
async fn test_load_file_then_cli_overrides() {
    // Given: a config file and CLI overrides
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(
        &dir,
        r#"
[general]
log_level = "debug"

[monitor]
log_path = "/var/log/sco/logSelfcheckout.log"
poll_interval_ms = 250
"#,
    );
    let cli = DaemonCli::try_parse_from([
        "scowatch",
        "--config",
        path.to_str().expect("utf-8 path"),
        "--log-file",
        "/tmp/replay.log",
    ])
    .expect("cli");

    // When: loading
    let config = load_config(&cli).await.expect("config should load");

    // Then: CLI wins, file values survive elsewhere
    assert_eq!(config.monitor.log_path, "/tmp/replay.log");
    assert_eq!(config.monitor.poll_interval_ms, 250);
    assert_eq!(config.general.log_level, "debug");
}

#[tokio::test]
#[serial]
async fn test_cli_override_takes_precedence_over_env() {
    let original = std::env::var("SCOWATCH_GENERAL_LOG_LEVEL").ok();
    // SAFETY: env-mutating tests are serialized
    unsafe {
        std::env::set_var("SCOWATCH_GENERAL_LOG_LEVEL", "error");
    }

    let cli = DaemonCli::try_parse_from(["scowatch", "--log-level", "trace"]).expect("cli");
    let result = load_config(&cli).await;

    // SAFETY: env-mutating tests are serialized
    unsafe {
        match original {
            Some(val) => std::env::set_var("SCOWATCH_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("SCOWATCH_GENERAL_LOG_LEVEL"),
        }
    }

    let config = result.expect("config should load");
    assert_eq!(config.general.log_level, "trace");
}

#[tokio::test]
#[serial]
async fn test_missing_config_file_fails() {
    let cli = DaemonCli::try_parse_from(["scowatch", "--config", "/nonexistent/scowatch.toml"])
        .expect("cli");
    let err = load_config(&cli).await.expect_err("missing file should fail");
    assert!(err.to_string().contains("failed to load config"));
    assert!(matches!(
        err.downcast_ref::<ScowatchError>(),
        Some(ScowatchError::Config(ConfigError::FileNotFound { .. }))
    ));
}

#[tokio::test]
#[serial]
async fn test_invalid_cli_log_level_fails_validation() {
    let cli = DaemonCli::try_parse_from(["scowatch", "--log-level", "verbose"]).expect("cli");
    let err = load_config(&cli).await.expect_err("invalid level should fail");
    assert!(err.to_string().contains("config validation failed"));
}

#[tokio::test]
#[serial]
async fn test_validate_with_builtin_rules() {
    let cli = DaemonCli::try_parse_from(["scowatch"]).expect("cli");
    let config = load_config(&cli).await.expect("config");

    let definitions = validate_config(&config).await.expect("built-in rules are valid");
    assert!(definitions > 0);
}

#[tokio::test]
#[serial]
async fn test_validate_rejects_unknown_event_type() {
    // Given: a rule file naming an event kind that does not exist
    let dir = tempfile::tempdir().expect("tempdir");
    let rules = dir.path().join("rules.json");
    std::fs::write(
        &rules,
        r#"{
  "event_definitions": [
    {"match_type": "id", "match_value": "ItemSold", "event_type": "ITEM_RETURNED", "fields_to_extract": {}}
  ],
  "default_event": {"event_type": "GENERIC_MESSAGE", "fields_to_extract": {}}
}"#,
    )
    .expect("write rules");

    let cli = DaemonCli::try_parse_from(["scowatch", "--rules", rules.to_str().expect("utf-8")])
        .expect("cli");
    let config = load_config(&cli).await.expect("config");

    // When/Then: validation fails before any tailing
    let err = validate_config(&config).await.expect_err("unknown event type");
    assert!(err.to_string().contains("invalid rule configuration"));
    assert!(matches!(
        err.downcast_ref::<ScowatchError>(),
        Some(ScowatchError::Pipeline(PipelineError::InitFailed(_)))
    ));
}

#[tokio::test]
#[serial]
async fn test_validate_rejects_missing_rule_file() {
    let cli = DaemonCli::try_parse_from(["scowatch", "--rules", "/nonexistent/rules.yaml"])
        .expect("cli");
    let config = load_config(&cli).await.expect("config");
    assert!(validate_config(&config).await.is_err());
}
