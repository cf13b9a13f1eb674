//! JSON-lines sinks
//!
//! [`JsonLinesSink`] writes one JSON document per line and flushes after
//! every record, so an interrupted process leaves only whole records behind.
//! The same type serves classified events and finished transactions.

use std::fs::{File, OpenOptions};
use std::io::{self, Stdout, Write};
use std::path::Path;

use serde::Serialize;

use scowatch_core::error::SinkError;
use scowatch_core::pipeline::{EventSink, TransactionSink};
use scowatch_core::types::{ClassifiedEvent, Transaction};

use crate::error::LogPipelineError;

/// Appends JSON documents, one per line, to any writer.
pub struct JsonLinesSink<W: Write + Send> {
    name: String,
    writer: W,
    records: u64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wraps a writer.
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
            records: 0,
        }
    }

    /// Records written so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// The underlying writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwraps the sink.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record<T: Serialize>(&mut self, record: &T) -> Result<(), SinkError> {
        let mut line =
            serde_json::to_vec(record).map_err(|e| SinkError::Serialize(e.to_string()))?;
        line.push(b'\n');

        self.writer
            .write_all(&line)
            .and_then(|()| self.writer.flush())
            .map_err(|e| SinkError::Write {
                target: self.name.clone(),
                reason: e.to_string(),
            })?;

        self.records += 1;
        Ok(())
    }
}

impl JsonLinesSink<File> {
    /// Opens `path` for appending, creating it when missing.
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self, LogPipelineError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LogPipelineError::Sink(SinkError::Write {
                    target: path.display().to_string(),
                    reason: format!("failed to open: {e}"),
                })
            })?;
        Ok(Self::new(path.display().to_string(), file))
    }
}

impl JsonLinesSink<Stdout> {
    /// Writes to standard output.
    pub fn stdout() -> Self {
        Self::new("stdout", io::stdout())
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_event(&mut self, event: &ClassifiedEvent) -> Result<(), SinkError> {
        self.write_record(event)
    }
}

impl<W: Write + Send> TransactionSink for JsonLinesSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_transaction(&mut self, transaction: Transaction) -> Result<(), SinkError> {
        self.write_record(&transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scowatch_core::types::{Details, EventKind, FieldValue, Item, TransactionStatus};

    fn lines(buf: &[u8]) -> Vec<serde_json::Value> {
        std::str::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn event_record_shape() {
        let mut sink = JsonLinesSink::new("mem", Vec::new());
        let mut details = Details::new();
        details.insert("TransactionId".to_owned(), "A".into());
        details.insert("SuspendAllowed".to_owned(), FieldValue::Bool(true));
        let event = ClassifiedEvent::new("2026-02-01 16:16:01:879", EventKind::TransactionStart, details);

        sink.write_event(&event).unwrap();
        sink.write_event(&event).unwrap();
        assert_eq!(sink.records(), 2);

        let out = lines(sink.get_ref());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["timestamp"], "2026-02-01 16:16:01:879");
        assert_eq!(out[0]["event_type"], "StartTransaction");
        assert_eq!(out[0]["details"]["TransactionId"], "A");
        assert_eq!(out[0]["details"]["SuspendAllowed"], true);
    }

    #[test]
    fn transaction_record_shape() {
        let mut sink = JsonLinesSink::new("mem", Vec::new());
        let mut tx = Transaction::open("A", "t0");
        tx.add_item(Item {
            timestamp: "t1".to_owned(),
            description: "LEITE".to_owned(),
            quantity: 1,
            value: 0.89,
        });
        sink.write_transaction(tx.close(TransactionStatus::ForceClosed, None))
            .unwrap();

        let out = lines(&sink.into_inner());
        assert_eq!(out[0]["status"], "FORCE_CLOSE_NEW_STARTED");
        assert!(out[0]["end_time"].is_null());
        assert_eq!(out[0]["items"][0]["description"], "LEITE");
        assert_eq!(out[0]["total_value"], 0.89);
    }

    #[test]
    fn append_to_keeps_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parser.log");
        std::fs::write(&path, "{\"existing\":true}\n").unwrap();

        let mut sink = JsonLinesSink::append_to(&path).unwrap();
        let tx = Transaction::open("B", "t0").close(TransactionStatus::Aborted, None);
        sink.write_transaction(tx).unwrap();
        drop(sink);

        let content = std::fs::read(&path).unwrap();
        let out = lines(&content);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["existing"], true);
        assert_eq!(out[1]["status"], "ABORTED_BY_USER");
    }

    #[test]
    fn append_to_missing_directory_fails() {
        let result = JsonLinesSink::append_to("/nonexistent/dir/events.jsonl");
        assert!(matches!(result, Err(LogPipelineError::Sink(_))));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_reported() {
        let mut sink = JsonLinesSink::new("broken", FailingWriter);
        let event = ClassifiedEvent::new("t", EventKind::GenericMessage, Details::new());
        let err = sink.write_event(&event).unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert_eq!(sink.records(), 0);
    }
}
