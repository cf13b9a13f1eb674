//! Log collection -- reads physical lines from the monitored source.
//!
//! The only source is a local, append-only file followed by
//! [`FileTailer`]. Lines are pulled one at a time; nothing is read ahead of
//! the consumer.

pub mod file;

pub use file::{FileTailer, StartPosition, TailerConfig};
