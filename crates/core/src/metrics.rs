//! Metric name constants
//!
//! Every counter the monitor emits is named here. Modules call
//! `metrics::counter!()` with these constants; nothing is exported unless the
//! embedding application installs a recorder.
//!
//! # Naming
//!
//! - prefix: `scowatch_`
//! - suffix: `_total` for counters
//!
//! ```ignore
//! metrics::counter!(scowatch_core::metrics::LINES_READ_TOTAL).increment(1);
//! ```

/// Transaction status label key (completed, aborted, force_closed)
pub const LABEL_STATUS: &str = "status";

/// Event kind label key
pub const LABEL_EVENT_TYPE: &str = "event_type";

/// Drop reason label key (malformed, oversized, superseded)
pub const LABEL_REASON: &str = "reason";

/// Physical lines read from the monitored file
pub const LINES_READ_TOTAL: &str = "scowatch_lines_read_total";

/// Complete blocks reconstructed by the assembler
pub const BLOCKS_ASSEMBLED_TOTAL: &str = "scowatch_blocks_assembled_total";

/// Blocks dropped before classification (label: reason)
pub const BLOCKS_DROPPED_TOTAL: &str = "scowatch_blocks_dropped_total";

/// Classified events emitted (label: event_type)
pub const EVENTS_CLASSIFIED_TOTAL: &str = "scowatch_events_classified_total";

/// Transactions handed to the sink (label: status)
pub const TRANSACTIONS_CLOSED_TOTAL: &str = "scowatch_transactions_closed_total";

/// Sink write failures
pub const SINK_ERRORS_TOTAL: &str = "scowatch_sink_errors_total";
