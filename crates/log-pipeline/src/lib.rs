#![doc = include_str!("../README.md")]
//!
//! # Modules
//!
//! - [`collector`]: follows the log file line by line
//! - [`assembler`]: multi-line block reconstruction
//! - [`parser`]: message markup to raw fields
//! - [`rule`]: rule documents, validation and first-match classification
//! - [`transform`]: field renaming, scaling and type coercion
//! - [`aggregator`]: single-slot transaction correlation
//! - [`sink`]: JSON-lines outputs
//! - [`pipeline`]: orchestration ([`LogMonitor`])
//! - [`config`]: monitor settings (derived from the core config)
//! - [`error`]: domain error type

pub mod aggregator;
pub mod assembler;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod transform;

pub mod collector;
pub mod parser;
pub mod rule;

// --- re-exports ---

// pipeline
pub use pipeline::{EventPipeline, LogMonitor, LogMonitorBuilder, MonitorStats};

// config
pub use config::{PipelineConfig, PipelineConfigBuilder};

// error
pub use error::LogPipelineError;

// stages
pub use aggregator::TransactionAggregator;
pub use assembler::{BlockAssembler, LogBlock};
pub use collector::{FileTailer, StartPosition, TailerConfig};
pub use parser::{ExtractedMessage, FieldExtractor};
pub use rule::{RuleClassifier, RuleLoader, RuleSet};
pub use sink::JsonLinesSink;
pub use transform::FieldTransformer;
