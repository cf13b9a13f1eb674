//! Configuration -- `scowatch.toml` parsing and runtime settings
//!
//! [`ScowatchConfig`] is the top-level structure; each component reads only
//! its own section.
//!
//! # Precedence
//! 1. CLI arguments (highest)
//! 2. Environment variables (`SCOWATCH_MONITOR_LOG_PATH=/data/sco.log`)
//! 3. Config file (`scowatch.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), scowatch_core::error::ScowatchError> {
//! use scowatch_core::config::ScowatchConfig;
//!
//! let config = ScowatchConfig::load("scowatch.toml").await?;
//! let config = ScowatchConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ScowatchError};

const MAX_POLL_INTERVAL_MS: u64 = 60_000;
const MAX_BLOCK_BYTES: usize = 64 * 1024 * 1024;

/// Complete scowatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScowatchConfig {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Input file and rule settings
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Output sink settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl ScowatchConfig {
    /// Loads a TOML file and applies environment overrides.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScowatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file without environment overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ScowatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScowatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ScowatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ScowatchError> {
        toml::from_str(toml_str).map_err(|e| {
            ScowatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies `SCOWATCH_{SECTION}_{FIELD}` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SCOWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SCOWATCH_GENERAL_LOG_FORMAT");

        // Monitor
        override_string(&mut self.monitor.log_path, "SCOWATCH_MONITOR_LOG_PATH");
        override_string(&mut self.monitor.rules_path, "SCOWATCH_MONITOR_RULES_PATH");
        override_u64(
            &mut self.monitor.poll_interval_ms,
            "SCOWATCH_MONITOR_POLL_INTERVAL_MS",
        );
        override_usize(
            &mut self.monitor.max_block_bytes,
            "SCOWATCH_MONITOR_MAX_BLOCK_BYTES",
        );
        override_bool(
            &mut self.monitor.aggregate_transactions,
            "SCOWATCH_MONITOR_AGGREGATE_TRANSACTIONS",
        );
        override_bool(&mut self.monitor.start_at_end, "SCOWATCH_MONITOR_START_AT_END");

        // Output
        override_string(&mut self.output.events_path, "SCOWATCH_OUTPUT_EVENTS_PATH");
        override_string(
            &mut self.output.transactions_path,
            "SCOWATCH_OUTPUT_TRANSACTIONS_PATH",
        );
        override_bool(&mut self.output.echo_stdout, "SCOWATCH_OUTPUT_ECHO_STDOUT");
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ScowatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.monitor.log_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "monitor.log_path".to_owned(),
                reason: "log path must not be empty".to_owned(),
            }
            .into());
        }

        if self.monitor.poll_interval_ms == 0 || self.monitor.poll_interval_ms > MAX_POLL_INTERVAL_MS
        {
            return Err(ConfigError::InvalidValue {
                field: "monitor.poll_interval_ms".to_owned(),
                reason: format!("must be 1-{MAX_POLL_INTERVAL_MS}"),
            }
            .into());
        }

        if self.monitor.max_block_bytes == 0 || self.monitor.max_block_bytes > MAX_BLOCK_BYTES {
            return Err(ConfigError::InvalidValue {
                field: "monitor.max_block_bytes".to_owned(),
                reason: format!("must be 1-{MAX_BLOCK_BYTES}"),
            }
            .into());
        }

        if !self.monitor.aggregate_transactions
            && self.output.events_path.is_empty()
            && !self.output.echo_stdout
        {
            return Err(ConfigError::InvalidValue {
                field: "output".to_owned(),
                reason: "no output configured: set events_path, echo_stdout or enable aggregate_transactions".to_owned(),
            }
            .into());
        }

        if self.monitor.aggregate_transactions
            && self.output.transactions_path.is_empty()
            && !self.output.echo_stdout
        {
            return Err(ConfigError::InvalidValue {
                field: "output.transactions_path".to_owned(),
                reason: "transaction aggregation needs transactions_path or echo_stdout".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Input file and rule settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Self-checkout log file to tail
    pub log_path: String,
    /// Rule configuration file (JSON or YAML). Empty selects the built-in rules.
    pub rules_path: String,
    /// Wait between polls when no new bytes are available (milliseconds)
    pub poll_interval_ms: u64,
    /// Upper bound for one buffered block; larger blocks are discarded
    pub max_block_bytes: usize,
    /// Correlate events into transactions
    pub aggregate_transactions: bool,
    /// Begin tailing at end-of-file (existing content is never read)
    pub start_at_end: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_path: "logSelfcheckout.log".to_owned(),
            rules_path: String::new(),
            poll_interval_ms: 100,
            max_block_bytes: 1024 * 1024,
            aggregate_transactions: true,
            start_at_end: true,
        }
    }
}

/// Output sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSON-lines file for classified events. Empty disables it.
    pub events_path: String,
    /// JSON-lines file for finished transactions. Empty disables it.
    pub transactions_path: String,
    /// Also write every record to stdout
    pub echo_stdout: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            events_path: "events.jsonl".to_owned(),
            transactions_path: "parser.log".to_owned(),
            echo_stdout: false,
        }
    }
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
