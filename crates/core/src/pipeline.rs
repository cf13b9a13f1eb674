//! Pipeline traits -- the seams where results leave the monitor

use crate::error::SinkError;
use crate::types::{ClassifiedEvent, Transaction};

/// Destination for classified events.
///
/// Implementations must make each call a complete append-and-flush so an
/// interrupted process never leaves a half-written record behind.
pub trait EventSink: Send {
    /// Sink name, used in logs
    fn name(&self) -> &str;

    /// Accepts one classified event
    fn write_event(&mut self, event: &ClassifiedEvent) -> Result<(), SinkError>;
}

/// Destination for finished transactions.
///
/// The transaction is passed by value: the aggregator gives up ownership
/// when a transaction closes, and each transaction reaches a sink once.
pub trait TransactionSink: Send {
    /// Sink name, used in logs
    fn name(&self) -> &str;

    /// Accepts one closed transaction
    fn write_transaction(&mut self, transaction: Transaction) -> Result<(), SinkError>;
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_event(&mut self, event: &ClassifiedEvent) -> Result<(), SinkError> {
        (**self).write_event(event)
    }
}

impl<S: TransactionSink + ?Sized> TransactionSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_transaction(&mut self, transaction: Transaction) -> Result<(), SinkError> {
        (**self).write_transaction(transaction)
    }
}
