//! scowatch.toml integration tests
//!
//! - scowatch.toml.example parsing
//! - partial configs (single sections)
//! - environment variable precedence
//! - empty and malformed input

use scowatch_core::config::ScowatchConfig;
use scowatch_core::error::{ConfigError, ScowatchError};

// =============================================================================
// scowatch.toml.example
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../scowatch.toml.example");
    let config = ScowatchConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../scowatch.toml.example");
    let config = ScowatchConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_defaults() {
    let content = include_str!("../../../scowatch.toml.example");
    let config = ScowatchConfig::parse(content).expect("should parse");
    let defaults = ScowatchConfig::default();

    assert_eq!(config.monitor.log_path, defaults.monitor.log_path);
    assert_eq!(config.monitor.rules_path, defaults.monitor.rules_path);
    assert_eq!(
        config.monitor.poll_interval_ms,
        defaults.monitor.poll_interval_ms
    );
    assert_eq!(config.monitor.max_block_bytes, defaults.monitor.max_block_bytes);
    assert_eq!(
        config.monitor.aggregate_transactions,
        defaults.monitor.aggregate_transactions
    );
    assert_eq!(config.output.events_path, defaults.output.events_path);
    assert_eq!(
        config.output.transactions_path,
        defaults.output.transactions_path
    );
}

// =============================================================================
// partial configs
// =============================================================================

#[test]
fn output_section_only() {
    let toml = r#"
[output]
events_path = ""
echo_stdout = true
"#;
    let config = ScowatchConfig::parse(toml).expect("should parse");
    assert!(config.output.events_path.is_empty());
    assert!(config.output.echo_stdout);
    // other sections keep their defaults
    assert_eq!(config.monitor.poll_interval_ms, 100);
    config.validate().expect("should validate");
}

#[test]
fn events_only_mode() {
    let toml = r#"
[monitor]
aggregate_transactions = false

[output]
transactions_path = ""
"#;
    let config = ScowatchConfig::parse(toml).expect("should parse");
    assert!(!config.monitor.aggregate_transactions);
    config.validate().expect("events-only config should validate");
}

// =============================================================================
// env precedence
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;

    let original = std::env::var("SCOWATCH_GENERAL_LOG_LEVEL").ok();
    // SAFETY: env-mutating tests are serialized
    unsafe {
        std::env::set_var("SCOWATCH_GENERAL_LOG_LEVEL", "error");
    }

    let mut config = ScowatchConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: cleanup
    unsafe {
        match original {
            Some(val) => std::env::set_var("SCOWATCH_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("SCOWATCH_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_of_rules_path() {
    let original = std::env::var("SCOWATCH_MONITOR_RULES_PATH").ok();
    // SAFETY: env-mutating tests are serialized
    unsafe {
        std::env::set_var("SCOWATCH_MONITOR_RULES_PATH", "/etc/scowatch/rules.json");
    }

    let mut config = ScowatchConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.monitor.rules_path.clone();

    // SAFETY: cleanup
    unsafe {
        match original {
            Some(val) => std::env::set_var("SCOWATCH_MONITOR_RULES_PATH", val),
            None => std::env::remove_var("SCOWATCH_MONITOR_RULES_PATH"),
        }
    }

    assert_eq!(result, "/etc/scowatch/rules.json");
}

// =============================================================================
// errors
// =============================================================================

#[test]
fn unknown_section_type_mismatch_is_rejected() {
    let toml = r#"
[monitor]
poll_interval_ms = "fast"
"#;
    let err = ScowatchConfig::parse(toml).unwrap_err();
    assert!(matches!(
        err,
        ScowatchError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[tokio::test]
async fn load_from_file_validates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("scowatch.toml");
    std::fs::write(&path, "[general]\nlog_format = \"xml\"\n").expect("write");

    let err = ScowatchConfig::from_file(&path).await.unwrap_err();
    assert!(matches!(
        err,
        ScowatchError::Config(ConfigError::InvalidValue { .. })
    ));
}
