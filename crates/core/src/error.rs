//! Error types -- per-domain error definitions

/// Top-level scowatch error type
#[derive(Debug, thiserror::Error)]
pub enum ScowatchError {
    /// Configuration errors
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Output sink errors
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// I/O errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A configuration value is out of range or malformed
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Pipeline processing errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Monitored log file could not be opened or read
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// Pipeline could not be assembled (rules, sinks, tailer)
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}

/// Output sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Record could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// Record could not be written or flushed
    #[error("write failed for {target}: {reason}")]
    Write { target: String, reason: String },
}
