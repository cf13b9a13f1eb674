//! Monitor settings
//!
//! [`PipelineConfig`] is derived from the `[monitor]` and `[output]` sections
//! of [`ScowatchConfig`](scowatch_core::config::ScowatchConfig). Empty paths
//! in the TOML file become `None` here.
//!
//! # Example
//! ```ignore
//! use scowatch_core::config::ScowatchConfig;
//! use scowatch_log_pipeline::config::PipelineConfig;
//!
//! let core_config = ScowatchConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use scowatch_core::config::ScowatchConfig;

use crate::assembler::DEFAULT_MAX_BLOCK_BYTES;
use crate::collector::{StartPosition, TailerConfig};
use crate::error::LogPipelineError;

/// Longest accepted poll interval (1 minute)
const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Largest accepted block limit (64MB)
const MAX_BLOCK_BYTES_LIMIT: usize = 64 * 1024 * 1024;

/// Monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Log file to follow
    pub log_path: PathBuf,
    /// Rule document; `None` uses the built-in rules
    pub rules_path: Option<PathBuf>,
    /// Wait between polls when the file has no new line (milliseconds)
    pub poll_interval_ms: u64,
    /// Upper bound for one buffered block
    pub max_block_bytes: usize,
    /// Correlate events into transactions
    pub aggregate_transactions: bool,
    /// Skip content present when the monitor starts
    pub start_at_end: bool,
    /// JSON-lines file for classified events
    pub events_path: Option<PathBuf>,
    /// JSON-lines file for finished transactions
    pub transactions_path: Option<PathBuf>,
    /// Also write records to stdout
    pub echo_stdout: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("logSelfcheckout.log"),
            rules_path: None,
            poll_interval_ms: 100,
            max_block_bytes: DEFAULT_MAX_BLOCK_BYTES,
            aggregate_transactions: true,
            start_at_end: true,
            events_path: Some(PathBuf::from("events.jsonl")),
            transactions_path: Some(PathBuf::from("parser.log")),
            echo_stdout: false,
        }
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    (!value.trim().is_empty()).then(|| PathBuf::from(value))
}

impl PipelineConfig {
    /// Builds the monitor settings from the daemon configuration.
    pub fn from_core(core: &ScowatchConfig) -> Self {
        Self {
            log_path: PathBuf::from(&core.monitor.log_path),
            rules_path: non_empty_path(&core.monitor.rules_path),
            poll_interval_ms: core.monitor.poll_interval_ms,
            max_block_bytes: core.monitor.max_block_bytes,
            aggregate_transactions: core.monitor.aggregate_transactions,
            start_at_end: core.monitor.start_at_end,
            events_path: non_empty_path(&core.output.events_path),
            transactions_path: non_empty_path(&core.output.transactions_path),
            echo_stdout: core.output.echo_stdout,
        }
    }

    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Tailer settings derived from these settings
    pub fn tailer_config(&self) -> TailerConfig {
        TailerConfig {
            poll_interval: self.poll_interval(),
            max_line_bytes: self.max_block_bytes,
            start: if self.start_at_end {
                StartPosition::End
            } else {
                StartPosition::Beginning
            },
        }
    }

    /// Checks value ranges and output consistency.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.log_path.as_os_str().is_empty() {
            return Err(LogPipelineError::Config {
                field: "log_path".to_owned(),
                reason: "log path must not be empty".to_owned(),
            });
        }

        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(LogPipelineError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: format!("must be between 1 and {MAX_POLL_INTERVAL_MS}"),
            });
        }

        if self.max_block_bytes == 0 || self.max_block_bytes > MAX_BLOCK_BYTES_LIMIT {
            return Err(LogPipelineError::Config {
                field: "max_block_bytes".to_owned(),
                reason: format!("must be between 1 and {MAX_BLOCK_BYTES_LIMIT}"),
            });
        }

        if self.events_path.is_none() && self.transactions_path.is_none() && !self.echo_stdout {
            return Err(LogPipelineError::Config {
                field: "output".to_owned(),
                reason: "at least one output (events_path, transactions_path, echo_stdout) is required"
                    .to_owned(),
            });
        }

        if self.aggregate_transactions && self.transactions_path.is_none() && !self.echo_stdout {
            return Err(LogPipelineError::Config {
                field: "transactions_path".to_owned(),
                reason: "transaction aggregation needs transactions_path or echo_stdout".to_owned(),
            });
        }

        Ok(())
    }
}

/// Builder for [`PipelineConfig`]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Starts from the defaults.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Log file to follow
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    /// Rule document
    pub fn rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rules_path = Some(path.into());
        self
    }

    /// Poll interval in milliseconds
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Block size limit
    pub fn max_block_bytes(mut self, bytes: usize) -> Self {
        self.config.max_block_bytes = bytes;
        self
    }

    /// Enables or disables transaction aggregation
    pub fn aggregate_transactions(mut self, enabled: bool) -> Self {
        self.config.aggregate_transactions = enabled;
        self
    }

    /// Skip or replay existing content
    pub fn start_at_end(mut self, at_end: bool) -> Self {
        self.config.start_at_end = at_end;
        self
    }

    /// Event output file (`None` disables it)
    pub fn events_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.events_path = path;
        self
    }

    /// Transaction output file (`None` disables it)
    pub fn transactions_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.transactions_path = path;
        self
    }

    /// Echo records to stdout
    pub fn echo_stdout(mut self, echo: bool) -> Self {
        self.config.echo_stdout = echo;
        self
    }

    /// Validates and returns the settings.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
