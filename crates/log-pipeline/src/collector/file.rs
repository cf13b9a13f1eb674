//! File tailer
//!
//! Follows an append-only log file like `tail -f`. Only complete lines are
//! returned; a trailing fragment without a newline stays buffered until the
//! rest of the line is written. Undecodable bytes are replaced, never fatal.
//!
//! # Truncation
//! When the file shrinks below the current read position (log rotated in
//! place or truncated), the tailer starts over from the beginning.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

use crate::error::LogPipelineError;

/// Where a newly opened tailer starts reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// Skip existing content
    End,
    /// Read existing content first
    Beginning,
}

/// Tailer settings
#[derive(Debug, Clone)]
pub struct TailerConfig {
    /// Wait between polls when no new line is available
    pub poll_interval: Duration,
    /// Longest line kept; longer lines are skipped
    pub max_line_bytes: usize,
    /// Initial position
    pub start: StartPosition,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_line_bytes: 1024 * 1024, // 1MB
            start: StartPosition::End,
        }
    }
}

/// Pull-based line cursor over a growing file
pub struct FileTailer {
    path: PathBuf,
    config: TailerConfig,
    reader: BufReader<File>,
    /// Bytes consumed from the current file
    offset: u64,
    /// Bytes of the current, not yet terminated line
    partial: Vec<u8>,
    /// Dropping an overlong line until its newline shows up
    skipping: bool,
    lines_read: u64,
}

impl FileTailer {
    /// Opens `path` and positions the cursor.
    ///
    /// # Errors
    /// The file is missing or cannot be read.
    pub async fn open(path: impl AsRef<Path>, config: TailerConfig) -> Result<Self, LogPipelineError> {
        let path = path.as_ref().to_path_buf();
        let (reader, offset) = Self::open_at(&path, config.start).await?;

        tracing::info!(
            path = %path.display(),
            offset,
            start = ?config.start,
            "tailing log file"
        );

        Ok(Self {
            path,
            config,
            reader,
            offset,
            partial: Vec::new(),
            skipping: false,
            lines_read: 0,
        })
    }

    async fn open_at(
        path: &Path,
        start: StartPosition,
    ) -> Result<(BufReader<File>, u64), LogPipelineError> {
        let collector_err = |e: std::io::Error| LogPipelineError::Collector {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let mut file = File::open(path).await.map_err(collector_err)?;
        let offset = match start {
            StartPosition::End => file.seek(SeekFrom::End(0)).await.map_err(collector_err)?,
            StartPosition::Beginning => 0,
        };
        Ok((BufReader::new(file), offset))
    }

    /// Monitored path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Complete lines returned so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Poll interval in use
    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// Returns the next complete line, or `None` when none is available yet.
    ///
    /// The line keeps its terminator.
    pub async fn try_next_line(&mut self) -> Result<Option<String>, LogPipelineError> {
        loop {
            let read = self
                .reader
                .read_until(b'\n', &mut self.partial)
                .await
                .map_err(|e| LogPipelineError::Collector {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                })?;
            self.offset += read as u64;

            let complete = self.partial.last() == Some(&b'\n');
            if !complete {
                if self.partial.len() > self.config.max_line_bytes {
                    tracing::warn!(
                        path = %self.path.display(),
                        limit = self.config.max_line_bytes,
                        "skipping overlong line"
                    );
                    self.partial.clear();
                    self.skipping = true;
                }
                if read == 0 {
                    self.check_truncation().await?;
                }
                return Ok(None);
            }

            let bytes = std::mem::take(&mut self.partial);
            if self.skipping {
                self.skipping = false;
                continue;
            }

            self.lines_read += 1;
            return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
        }
    }

    /// Waits until a complete line is available.
    ///
    /// Sleeps `poll_interval` between attempts; this is the only place the
    /// monitor blocks.
    pub async fn next_line(&mut self) -> Result<String, LogPipelineError> {
        loop {
            if let Some(line) = self.try_next_line().await? {
                return Ok(line);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn check_truncation(&mut self) -> Result<(), LogPipelineError> {
        let len = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            // Missing for a moment during rotation; keep the old handle
            Err(_) => return Ok(()),
        };

        if len < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                offset = self.offset,
                len,
                "log file truncated, reading from start"
            );
            let (reader, offset) = Self::open_at(&self.path, StartPosition::Beginning).await?;
            self.reader = reader;
            self.offset = offset;
            self.partial.clear();
            self.skipping = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(start: StartPosition) -> TailerConfig {
        TailerConfig {
            poll_interval: Duration::from_millis(5),
            start,
            ..TailerConfig::default()
        }
    }

    fn append(path: &Path, data: &[u8]) {
        let mut f = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        f.write_all(data).unwrap();
        f.flush().unwrap();
    }

    #[test]
    fn default_config() {
        let config = TailerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.start, StartPosition::End);
    }

    #[tokio::test]
    async fn open_missing_file_fails() {
        let result = FileTailer::open("/nonexistent/logSelfcheckout.log", TailerConfig::default()).await;
        assert!(matches!(result, Err(LogPipelineError::Collector { .. })));
    }

    #[tokio::test]
    async fn starts_at_end_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sco.log");
        std::fs::write(&path, "old line\n").unwrap();

        let mut tailer = FileTailer::open(&path, config(StartPosition::End)).await.unwrap();
        assert_eq!(tailer.try_next_line().await.unwrap(), None);

        append(&path, b"new line\n");
        assert_eq!(tailer.next_line().await.unwrap(), "new line\n");
        assert_eq!(tailer.lines_read(), 1);
    }

    #[tokio::test]
    async fn beginning_replays_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sco.log");
        std::fs::write(&path, "a\nb\n").unwrap();

        let mut tailer = FileTailer::open(&path, config(StartPosition::Beginning)).await.unwrap();
        assert_eq!(tailer.next_line().await.unwrap(), "a\n");
        assert_eq!(tailer.next_line().await.unwrap(), "b\n");
        assert_eq!(tailer.try_next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn partial_line_waits_for_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sco.log");
        std::fs::write(&path, "").unwrap();

        let mut tailer = FileTailer::open(&path, config(StartPosition::End)).await.unwrap();
        append(&path, b"[2026-02-01 16:16:01:879][INFO]: half");
        assert_eq!(tailer.try_next_line().await.unwrap(), None);

        append(&path, b" and the rest\n");
        assert_eq!(
            tailer.try_next_line().await.unwrap().as_deref(),
            Some("[2026-02-01 16:16:01:879][INFO]: half and the rest\n")
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sco.log");
        std::fs::write(&path, b"caf\xe9 ok\n").unwrap();

        let mut tailer = FileTailer::open(&path, config(StartPosition::Beginning)).await.unwrap();
        let line = tailer.next_line().await.unwrap();
        assert!(line.starts_with("caf"));
        assert!(line.ends_with(" ok\n"));
        assert!(line.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn overlong_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sco.log");
        std::fs::write(&path, "").unwrap();

        let mut tailer = FileTailer::open(
            &path,
            TailerConfig {
                max_line_bytes: 8,
                ..config(StartPosition::End)
            },
        )
        .await
        .unwrap();

        append(&path, b"0123456789abcdef");
        assert_eq!(tailer.try_next_line().await.unwrap(), None);
        append(&path, b"tail\nshort\n");
        assert_eq!(tailer.next_line().await.unwrap(), "short\n");
    }

    #[tokio::test]
    async fn truncation_restarts_from_beginning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sco.log");
        std::fs::write(&path, "first line that is long\n").unwrap();

        let mut tailer = FileTailer::open(&path, config(StartPosition::Beginning)).await.unwrap();
        assert_eq!(tailer.next_line().await.unwrap(), "first line that is long\n");

        std::fs::write(&path, "new\n").unwrap();
        // First poll notices the truncation, the next one reads
        assert_eq!(tailer.try_next_line().await.unwrap(), None);
        assert_eq!(tailer.next_line().await.unwrap(), "new\n");
    }
}
