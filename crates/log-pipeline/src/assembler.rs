//! Block assembler -- rebuilds logical message blocks from physical lines.
//!
//! The terminal writes each protocol message as
//! `[timestamp][LEVEL]: ... [ScoAdapter] CONTENT [<message ...>...</message>]`,
//! and long messages continue over several physical lines. [`BlockAssembler`]
//! buffers from the start marker until the trimmed buffer ends with the
//! closing `]`, then emits one [`LogBlock`].
//!
//! # Rules
//! - A new start line while a block is buffered discards the partial block.
//! - Lines seen while idle are ignored.
//! - A buffer larger than `max_block_bytes` is discarded.
//! - A block is emitted at most once.

use regex::Regex;

use scowatch_core::metrics as m;

/// Start-of-block line: timestamp, level, anything, then the content marker.
/// Group 1 is the timestamp, group 2 the first content fragment.
const BLOCK_START_PATTERN: &str = r"(?s)^\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}:\d{3})\]\[[A-Za-z]+\]:.*?\[ScoAdapter\] CONTENT \[(.*)";

/// Default upper bound for one buffered block (1 MiB)
pub const DEFAULT_MAX_BLOCK_BYTES: usize = 1024 * 1024;

/// One logical message reconstructed from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBlock {
    /// Timestamp from the start line
    pub timestamp: String,
    /// Markup text without the closing `]`
    pub content: String,
}

/// Why a partially buffered block was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Another start line arrived before the block closed
    Superseded,
    /// The buffer grew past the size limit
    Oversized,
}

impl DropReason {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Superseded => "superseded",
            Self::Oversized => "oversized",
        }
    }
}

#[derive(Debug)]
struct PendingBlock {
    timestamp: String,
    buffer: String,
}

/// Line-driven block reassembly state machine.
pub struct BlockAssembler {
    start: Regex,
    max_block_bytes: usize,
    pending: Option<PendingBlock>,
    assembled: u64,
    dropped: u64,
}

impl BlockAssembler {
    /// Creates an assembler with the given per-block size limit.
    pub fn new(max_block_bytes: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            start: Regex::new(BLOCK_START_PATTERN)?,
            max_block_bytes,
            pending: None,
            assembled: 0,
            dropped: 0,
        })
    }

    /// Feeds one physical line (with or without its terminator).
    ///
    /// Returns the completed block when this line closes one.
    pub fn push_line(&mut self, line: &str) -> Option<LogBlock> {
        if let Some(caps) = self.start.captures(line) {
            if let Some(stale) = self.pending.take() {
                self.record_drop(&stale, DropReason::Superseded);
            }
            let timestamp = caps.get(1).map_or("", |g| g.as_str());
            let fragment = caps.get(2).map_or("", |g| g.as_str());
            self.pending = Some(PendingBlock {
                timestamp: timestamp.to_owned(),
                buffer: fragment.to_owned(),
            });
        } else if let Some(pending) = self.pending.as_mut() {
            pending.buffer.push_str(line);
        } else {
            return None;
        }

        self.try_close()
    }

    /// Whether a partial block is currently buffered.
    pub fn is_buffering(&self) -> bool {
        self.pending.is_some()
    }

    /// Blocks emitted so far
    pub fn assembled(&self) -> u64 {
        self.assembled
    }

    /// Partial blocks discarded so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn try_close(&mut self) -> Option<LogBlock> {
        let pending = self.pending.as_ref()?;

        if pending.buffer.len() > self.max_block_bytes {
            if let Some(stale) = self.pending.take() {
                self.record_drop(&stale, DropReason::Oversized);
            }
            return None;
        }

        let trimmed = pending.buffer.trim();
        let content = trimmed.strip_suffix(']')?.to_owned();
        let pending = self.pending.take()?;

        self.assembled += 1;
        metrics::counter!(m::BLOCKS_ASSEMBLED_TOTAL).increment(1);

        Some(LogBlock {
            timestamp: pending.timestamp,
            content,
        })
    }

    fn record_drop(&mut self, stale: &PendingBlock, reason: DropReason) {
        self.dropped += 1;
        metrics::counter!(m::BLOCKS_DROPPED_TOTAL, m::LABEL_REASON => reason.as_str())
            .increment(1);
        match reason {
            DropReason::Superseded => tracing::debug!(
                timestamp = %stale.timestamp,
                buffered = stale.buffer.len(),
                "discarding unterminated block"
            ),
            DropReason::Oversized => tracing::warn!(
                timestamp = %stale.timestamp,
                buffered = stale.buffer.len(),
                limit = self.max_block_bytes,
                "discarding oversized block"
            ),
        }
    }
}
