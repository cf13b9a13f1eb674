//! Pipeline orchestration -- tail, assemble, extract, classify, aggregate.
//!
//! [`EventPipeline`] is the synchronous core: one physical line in, at most
//! one classified event out. [`LogMonitor`] drives it from a [`FileTailer`],
//! feeds the [`TransactionAggregator`] and writes to the sinks until its
//! cancellation token fires.
//!
//! # Flow
//! ```text
//! FileTailer -> BlockAssembler -> FieldExtractor -> RuleClassifier -> FieldTransformer
//!                                                                        |-> EventSink
//!                                                                        '-> TransactionAggregator -> TransactionSink
//! ```
//!
//! Events are handled strictly in file order, one at a time.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use scowatch_core::metrics as m;
use scowatch_core::pipeline::{EventSink, TransactionSink};
use scowatch_core::types::{ClassifiedEvent, Transaction};

use crate::aggregator::TransactionAggregator;
use crate::assembler::{BlockAssembler, LogBlock};
use crate::collector::FileTailer;
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::parser::FieldExtractor;
use crate::rule::{RuleClassifier, RuleLoader, RuleSet};
use crate::sink::JsonLinesSink;
use crate::transform::FieldTransformer;

/// Line-to-event pipeline
pub struct EventPipeline {
    assembler: BlockAssembler,
    classifier: RuleClassifier,
    malformed: u64,
}

impl EventPipeline {
    /// Creates a pipeline over a validated rule set.
    pub fn new(rules: RuleSet, max_block_bytes: usize) -> Result<Self, LogPipelineError> {
        Ok(Self {
            assembler: BlockAssembler::new(max_block_bytes)?,
            classifier: RuleClassifier::new(rules),
            malformed: 0,
        })
    }

    /// Feeds one physical line.
    ///
    /// Returns the classified event when the line completes a block whose
    /// markup parses.
    pub fn process_line(&mut self, line: &str) -> Option<ClassifiedEvent> {
        let block = self.assembler.push_line(line)?;
        self.process_block(&block)
    }

    /// Classifies one assembled block.
    pub fn process_block(&mut self, block: &LogBlock) -> Option<ClassifiedEvent> {
        let Some(msg) = FieldExtractor::extract(&block.content) else {
            self.malformed += 1;
            metrics::counter!(m::BLOCKS_DROPPED_TOTAL, m::LABEL_REASON => "malformed").increment(1);
            tracing::debug!(timestamp = %block.timestamp, "dropping block with malformed markup");
            return None;
        };

        let output = self.classifier.classify(&msg);
        let details = FieldTransformer::apply(output, &msg);
        let event = ClassifiedEvent::new(block.timestamp.clone(), output.event_type, details);

        metrics::counter!(m::EVENTS_CLASSIFIED_TOTAL, m::LABEL_EVENT_TYPE => event.event_type.as_str())
            .increment(1);
        tracing::debug!(
            timestamp = %event.timestamp,
            event_type = %event.event_type,
            fields = event.details.len(),
            "event classified"
        );
        Some(event)
    }

    /// Classifier in use
    pub fn classifier(&self) -> &RuleClassifier {
        &self.classifier
    }

    /// Blocks emitted by the assembler
    pub fn blocks_assembled(&self) -> u64 {
        self.assembler.assembled()
    }

    /// Blocks dropped: discarded partial blocks plus malformed markup
    pub fn blocks_dropped(&self) -> u64 {
        self.assembler.dropped() + self.malformed
    }
}

/// Counters reported when the monitor stops
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    /// Physical lines read
    pub lines_read: u64,
    /// Blocks reconstructed
    pub blocks_assembled: u64,
    /// Blocks dropped (unterminated, oversized, malformed)
    pub blocks_dropped: u64,
    /// Classified events produced
    pub events_emitted: u64,
    /// Transactions handed to the sinks
    pub transactions_closed: u64,
    /// Failed sink writes
    pub sink_errors: u64,
}

/// Follows the log file and writes events and transactions to the sinks.
///
/// # Example
/// ```ignore
/// use scowatch_log_pipeline::{LogMonitorBuilder, PipelineConfig};
/// use tokio_util::sync::CancellationToken;
///
/// let monitor = LogMonitorBuilder::new()
///     .config(PipelineConfig::default())
///     .build()
///     .await?;
///
/// let cancel = CancellationToken::new();
/// let stats = monitor.run(cancel.child_token()).await?;
/// ```
pub struct LogMonitor {
    config: PipelineConfig,
    pipeline: EventPipeline,
    aggregator: Option<TransactionAggregator>,
    event_sinks: Vec<Box<dyn EventSink>>,
    transaction_sinks: Vec<Box<dyn TransactionSink>>,
    stats: MonitorStats,
}

impl LogMonitor {
    /// Settings in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Counters so far
    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    /// The open transaction, if aggregation is enabled and one is open
    pub fn open_transaction(&self) -> Option<&Transaction> {
        self.aggregator.as_ref().and_then(TransactionAggregator::current)
    }

    /// Tails the log file until `cancel` fires.
    ///
    /// On cancellation the open transaction, if any, is closed as aborted
    /// and written before returning.
    ///
    /// # Errors
    /// The log file cannot be opened or read.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<MonitorStats, LogPipelineError> {
        let mut tailer = FileTailer::open(&self.config.log_path, self.config.tailer_config()).await?;

        tracing::info!(
            path = %self.config.log_path.display(),
            definitions = self.pipeline.classifier().rules().len(),
            aggregate = self.aggregator.is_some(),
            "log monitor started"
        );

        let result = loop {
            if cancel.is_cancelled() {
                break Ok(());
            }

            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Ok(()),
                line = tailer.next_line() => line,
            };

            match line {
                Ok(line) => self.handle_line(&line),
                Err(e) => break Err(e),
            }
        };

        // Close out even when the source failed
        self.shutdown();
        tracing::info!(stats = ?self.stats, "log monitor stopped");

        result.map(|()| self.stats)
    }

    /// Processes one physical line through every stage.
    pub fn handle_line(&mut self, line: &str) {
        self.stats.lines_read += 1;
        metrics::counter!(m::LINES_READ_TOTAL).increment(1);

        let event = self.pipeline.process_line(line);
        self.stats.blocks_assembled = self.pipeline.blocks_assembled();
        self.stats.blocks_dropped = self.pipeline.blocks_dropped();

        let Some(event) = event else {
            return;
        };
        self.stats.events_emitted += 1;
        self.emit_event(&event);

        let closed = self.aggregator.as_mut().and_then(|agg| agg.handle(&event));
        if let Some(tx) = closed {
            self.emit_transaction(tx);
        }
    }

    /// Aborts the open transaction, if any, and writes it.
    pub fn shutdown(&mut self) {
        let aborted = self.aggregator.as_mut().and_then(TransactionAggregator::abort);
        if let Some(tx) = aborted {
            self.emit_transaction(tx);
        }
    }

    fn emit_event(&mut self, event: &ClassifiedEvent) {
        for sink in &mut self.event_sinks {
            if let Err(e) = sink.write_event(event) {
                self.stats.sink_errors += 1;
                metrics::counter!(m::SINK_ERRORS_TOTAL).increment(1);
                tracing::warn!(sink = sink.name(), error = %e, "failed to write event");
            }
        }
    }

    fn emit_transaction(&mut self, tx: Transaction) {
        self.stats.transactions_closed += 1;

        let Some((last, rest)) = self.transaction_sinks.split_last_mut() else {
            return;
        };
        let mut failures = 0;
        for sink in rest {
            if let Err(e) = sink.write_transaction(tx.clone()) {
                failures += 1;
                tracing::warn!(sink = sink.name(), transaction_id = %tx.id, error = %e, "failed to write transaction");
            }
        }
        let id = tx.id.clone();
        if let Err(e) = last.write_transaction(tx) {
            failures += 1;
            tracing::warn!(sink = last.name(), transaction_id = %id, error = %e, "failed to write transaction");
        }

        if failures > 0 {
            self.stats.sink_errors += failures;
            metrics::counter!(m::SINK_ERRORS_TOTAL).increment(failures);
        }
    }
}

/// Builder for [`LogMonitor`]
///
/// Sinks added explicitly replace the outputs named in the config.
pub struct LogMonitorBuilder {
    config: PipelineConfig,
    rules: Option<RuleSet>,
    event_sinks: Vec<Box<dyn EventSink>>,
    transaction_sinks: Vec<Box<dyn TransactionSink>>,
}

impl LogMonitorBuilder {
    /// Starts from the default settings.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            rules: None,
            event_sinks: Vec::new(),
            transaction_sinks: Vec::new(),
        }
    }

    /// Monitor settings
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses an already loaded rule set instead of `rules_path`.
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Adds an event sink.
    pub fn event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.event_sinks.push(Box::new(sink));
        self
    }

    /// Adds a transaction sink.
    pub fn transaction_sink(mut self, sink: impl TransactionSink + 'static) -> Self {
        self.transaction_sinks.push(Box::new(sink));
        self
    }

    /// Validates settings, loads rules and opens the sinks.
    ///
    /// # Errors
    /// Invalid settings, an unreadable or invalid rule document, or an
    /// output file that cannot be opened.
    pub async fn build(self) -> Result<LogMonitor, LogPipelineError> {
        self.config.validate()?;

        let rules = match self.rules {
            Some(rules) => rules,
            None => RuleLoader::load_or_builtin(self.config.rules_path.as_deref()).await?,
        };

        let (event_sinks, transaction_sinks) =
            if self.event_sinks.is_empty() && self.transaction_sinks.is_empty() {
                Self::configured_sinks(&self.config)?
            } else {
                (self.event_sinks, self.transaction_sinks)
            };

        let aggregator = self
            .config
            .aggregate_transactions
            .then(TransactionAggregator::new);

        Ok(LogMonitor {
            pipeline: EventPipeline::new(rules, self.config.max_block_bytes)?,
            config: self.config,
            aggregator,
            event_sinks,
            transaction_sinks,
            stats: MonitorStats::default(),
        })
    }

    #[allow(clippy::type_complexity)]
    fn configured_sinks(
        config: &PipelineConfig,
    ) -> Result<(Vec<Box<dyn EventSink>>, Vec<Box<dyn TransactionSink>>), LogPipelineError> {
        let mut event_sinks: Vec<Box<dyn EventSink>> = Vec::new();
        let mut transaction_sinks: Vec<Box<dyn TransactionSink>> = Vec::new();

        if let Some(path) = &config.events_path {
            event_sinks.push(Box::new(JsonLinesSink::append_to(path)?));
        }
        if config.aggregate_transactions {
            if let Some(path) = &config.transactions_path {
                transaction_sinks.push(Box::new(JsonLinesSink::append_to(path)?));
            }
        }
        if config.echo_stdout {
            event_sinks.push(Box::new(JsonLinesSink::stdout()));
            if config.aggregate_transactions {
                transaction_sinks.push(Box::new(JsonLinesSink::stdout()));
            }
        }

        Ok((event_sinks, transaction_sinks))
    }
}

impl Default for LogMonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use scowatch_core::types::{EventKind, FieldValue};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn records(&self) -> Vec<serde_json::Value> {
            let buf = self.0.lock().unwrap();
            std::str::from_utf8(&buf)
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    const START: &str = r#"[2026-02-01 16:16:01:879][INFO]: TID(4801bb8b) [ScoAdapter] CONTENT [<message id="StartTransaction" name="Transaction" version="1" primary="1"><fields><field name="Id" ftype="string">A</field><field name="SuspendAllowed" ftype="boolean">1</field></fields></message>]"#;
    const ITEM: &str = r#"[2026-02-01 16:16:02:879][INFO]: TID(4801bb8b) [ScoAdapter] CONTENT [<message id="ItemSold" name="Item" version="1" primary="1"><fields><field name="Description" ftype="string">LEITE UHT M/G 1L</field><field name="Price" ftype="int">0</field><field name="ExtendedPrice" ftype="int">89</field><field name="Quantity" ftype="int">1</field></fields></message>]"#;
    const END: &str = r#"[2026-02-01 16:16:10:880][INFO]: TID(4801bb8b) [ScoAdapter] CONTENT [<message id="EndTransaction" name="Transaction" version="1" primary="1"><fields><field name="Id" ftype="string">A</field><field name="Complete" ftype="boolean">1</field></fields></message>]"#;

    fn pipeline() -> EventPipeline {
        EventPipeline::new(RuleLoader::builtin().unwrap(), 1024 * 1024).unwrap()
    }

    #[test]
    fn process_line_classifies_start() {
        let mut p = pipeline();
        let event = p.process_line(START).unwrap();
        assert_eq!(event.timestamp, "2026-02-01 16:16:01:879");
        assert_eq!(event.event_type, EventKind::TransactionStart);
        assert_eq!(event.detail("TransactionId"), Some(&FieldValue::from("A")));
        assert_eq!(event.detail("SuspendAllowed"), Some(&FieldValue::Bool(true)));
        assert_eq!(p.blocks_assembled(), 1);
    }

    #[test]
    fn malformed_block_is_counted_and_skipped() {
        let mut p = pipeline();
        let bad = r#"[2026-02-01 16:16:00:000][INFO]: TID(...) [ScoAdapter] CONTENT [<message id="MalformedXML"<field>value</field></message>]"#;
        assert!(p.process_line(bad).is_none());
        assert_eq!(p.blocks_dropped(), 1);
        assert!(p.process_line(START).is_some());
    }

    #[test]
    fn every_parseable_block_yields_one_event() {
        let mut p = pipeline();
        let unknown = r#"[2026-02-01 16:16:00:000][INFO]: TID(...) [ScoAdapter] CONTENT [<message id="UnknownMessage" name="Generic" version="1"><fields><field name="Status" ftype="string">OK</field></fields></message>]"#;
        let event = p.process_line(unknown).unwrap();
        assert_eq!(event.event_type, EventKind::GenericMessage);
        assert_eq!(event.detail("MessageId"), Some(&FieldValue::from("UnknownMessage")));
        assert_eq!(event.detail("MessageName"), Some(&FieldValue::from("Generic")));
        assert_eq!(event.detail("Status"), Some(&FieldValue::from("OK")));
    }

    async fn monitor_with_buffers(
        config: PipelineConfig,
    ) -> (LogMonitor, SharedBuf, SharedBuf) {
        let events = SharedBuf::default();
        let transactions = SharedBuf::default();
        let monitor = LogMonitorBuilder::new()
            .config(config)
            .event_sink(JsonLinesSink::new("events", events.clone()))
            .transaction_sink(JsonLinesSink::new("transactions", transactions.clone()))
            .build()
            .await
            .unwrap();
        (monitor, events, transactions)
    }

    #[tokio::test]
    async fn handle_line_aggregates_transaction() {
        let (mut monitor, events, transactions) =
            monitor_with_buffers(PipelineConfig::default()).await;

        for line in [START, ITEM, END] {
            monitor.handle_line(line);
        }

        assert_eq!(events.records().len(), 3);
        let txs = transactions.records();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0]["id"], "A");
        assert_eq!(txs[0]["status"], "COMPLETED");
        assert_eq!(txs[0]["total_value"], 0.89);
        assert_eq!(monitor.stats().transactions_closed, 1);
        assert!(monitor.open_transaction().is_none());
    }

    #[tokio::test]
    async fn shutdown_aborts_open_transaction() {
        let (mut monitor, _events, transactions) =
            monitor_with_buffers(PipelineConfig::default()).await;
        monitor.handle_line(START);
        assert!(monitor.open_transaction().is_some());

        monitor.shutdown();
        let txs = transactions.records();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0]["status"], "ABORTED_BY_USER");
    }

    #[tokio::test]
    async fn aggregation_can_be_disabled() {
        let config = PipelineConfig {
            aggregate_transactions: false,
            ..PipelineConfig::default()
        };
        let (mut monitor, events, transactions) = monitor_with_buffers(config).await;
        for line in [START, ITEM, END] {
            monitor.handle_line(line);
        }
        monitor.shutdown();
        assert_eq!(events.records().len(), 3);
        assert!(transactions.records().is_empty());
        assert_eq!(monitor.stats().transactions_closed, 0);
    }

    #[tokio::test]
    async fn builder_with_invalid_config_fails() {
        let config = PipelineConfig {
            poll_interval_ms: 0,
            ..PipelineConfig::default()
        };
        let result = LogMonitorBuilder::new().config(config).build().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn builder_with_missing_rules_fails() {
        let config = PipelineConfig {
            rules_path: Some("/nonexistent/rules.json".into()),
            ..PipelineConfig::default()
        };
        let result = LogMonitorBuilder::new().config(config).build().await;
        assert!(matches!(result, Err(LogPipelineError::RuleLoad { .. })));
    }

    #[tokio::test]
    async fn run_until_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logSelfcheckout.log");
        std::fs::write(&log, format!("{START}\n{ITEM}\n")).unwrap();

        let config = PipelineConfig {
            log_path: log,
            poll_interval_ms: 5,
            start_at_end: false,
            ..PipelineConfig::default()
        };
        let (monitor, events, transactions) = monitor_with_buffers(config).await;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor.run(cancel.clone()));

        tokio::time::timeout(Duration::from_secs(5), async {
            while events.records().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        let stats = handle.await.unwrap().unwrap();

        assert_eq!(stats.lines_read, 2);
        assert_eq!(stats.events_emitted, 2);
        assert_eq!(stats.transactions_closed, 1);
        let txs = transactions.records();
        assert_eq!(txs[0]["status"], "ABORTED_BY_USER");
        assert_eq!(txs[0]["items"][0]["value"], 0.89);
    }

    #[tokio::test]
    async fn run_with_missing_log_fails() {
        let config = PipelineConfig {
            log_path: "/nonexistent/logSelfcheckout.log".into(),
            ..PipelineConfig::default()
        };
        let (monitor, _, _) = monitor_with_buffers(config).await;
        let result = monitor.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(LogPipelineError::Collector { .. })));
    }
}
