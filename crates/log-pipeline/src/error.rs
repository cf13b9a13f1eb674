//! Log pipeline error types
//!
//! [`LogPipelineError`] covers every failure inside the pipeline crate.
//! `From<LogPipelineError> for ScowatchError` lifts them into the
//! workspace error the daemon reports.
//!
//! Only startup failures (rules, config, opening the source or a sink) ever
//! reach a caller. Per-line problems are counted and logged instead.

use scowatch_core::error::{ConfigError, PipelineError, ScowatchError, SinkError};

/// Log pipeline domain error
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// Rule file could not be read or parsed
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// Rule file path
        path: String,
        /// Reason
        reason: String,
    },

    /// A rule definition is inconsistent
    #[error("rule validation error: {rule}: {reason}")]
    RuleValidation {
        /// Definition locator (e.g. `event_definitions[3]`)
        rule: String,
        /// Reason
        reason: String,
    },

    /// Tailed source could not be opened or read
    #[error("collector error: {path}: {reason}")]
    Collector {
        /// Source path
        path: String,
        /// Reason
        reason: String,
    },

    /// Output sink failure
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Invalid pipeline setting
    #[error("config error: {field}: {reason}")]
    Config {
        /// Setting name
        field: String,
        /// Reason
        reason: String,
    },

    /// Regex compilation error
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<LogPipelineError> for ScowatchError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Sink(e) => ScowatchError::Sink(e),
            LogPipelineError::Config { field, reason } => {
                ScowatchError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::Collector { path, reason } => {
                ScowatchError::Pipeline(PipelineError::SourceUnavailable(format!("{path}: {reason}")))
            }
            other => ScowatchError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
