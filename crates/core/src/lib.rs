#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- re-exports ---

// errors
pub use error::{ConfigError, PipelineError, ScowatchError, SinkError};

// config
pub use config::ScowatchConfig;

// sink traits
pub use pipeline::{EventSink, TransactionSink};

// domain types
pub use types::{
    AuxEvent, ClassifiedEvent, Details, EventKind, EventRole, FieldType, FieldValue, Item,
    Transaction, TransactionStatus,
};
