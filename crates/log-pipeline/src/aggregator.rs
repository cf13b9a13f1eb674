//! Transaction aggregator -- correlates classified events into transactions.
//!
//! A single-slot state machine: at most one transaction is open. Start
//! events open one (force-closing any stale one first), item and auxiliary
//! events attach to it, end events complete it, and [`TransactionAggregator::abort`]
//! closes it on shutdown. Every close hands the transaction out by value,
//! so it leaves the aggregator exactly once.
//!
//! Events arriving while no transaction is open are ignored.

use scowatch_core::metrics as m;
use scowatch_core::types::{
    AuxEvent, ClassifiedEvent, EventRole, Item, Transaction, TransactionStatus,
};

/// Detail holding the transaction id on start events
const ID_FIELD: &str = "TransactionId";
/// Fallback id detail when the rules keep the markup name
const ID_FALLBACK_FIELD: &str = "Id";
const DESCRIPTION_FIELD: &str = "Description";
const PRICE_FIELD: &str = "Price";
const EXTENDED_PRICE_FIELD: &str = "ExtendedPrice";
const QUANTITY_FIELD: &str = "Quantity";

/// Minor currency units per major unit
const MINOR_UNITS: f64 = 100.0;

/// Single-slot transaction state machine
#[derive(Debug, Default)]
pub struct TransactionAggregator {
    current: Option<Transaction>,
}

impl TransactionAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// The open transaction, if any
    pub fn current(&self) -> Option<&Transaction> {
        self.current.as_ref()
    }

    /// Whether a transaction is open
    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Consumes one event.
    ///
    /// Returns the transaction this event closed: the completed one for an
    /// end event, or the force-closed one when a start event arrives while
    /// another transaction is still open.
    pub fn handle(&mut self, event: &ClassifiedEvent) -> Option<Transaction> {
        match event.event_type.role() {
            EventRole::Start => {
                let closed = self.close(TransactionStatus::ForceClosed, None);
                self.open(event);
                closed
            }
            EventRole::Item => {
                if let Some(tx) = self.current.as_mut() {
                    let item = Self::item_from(event);
                    tracing::debug!(
                        transaction_id = %tx.id,
                        description = %item.description,
                        quantity = item.quantity,
                        value = item.value,
                        "item added"
                    );
                    tx.add_item(item);
                }
                None
            }
            EventRole::Auxiliary => {
                if let Some(tx) = self.current.as_mut() {
                    tx.add_event(AuxEvent {
                        timestamp: event.timestamp.clone(),
                        event_type: event.event_type,
                        details: event.details.clone(),
                    });
                }
                None
            }
            EventRole::End => self.close(TransactionStatus::Completed, Some(event.timestamp.clone())),
            EventRole::Ignored => None,
        }
    }

    /// Closes the open transaction as aborted (monitor shutdown).
    pub fn abort(&mut self) -> Option<Transaction> {
        self.close(TransactionStatus::Aborted, None)
    }

    fn open(&mut self, event: &ClassifiedEvent) {
        let id = event
            .detail(ID_FIELD)
            .or_else(|| event.detail(ID_FALLBACK_FIELD))
            .map(|v| v.to_text())
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        tracing::info!(transaction_id = %id, start_time = %event.timestamp, "transaction started");
        self.current = Some(Transaction::open(id, event.timestamp.clone()));
    }

    fn close(
        &mut self,
        status: TransactionStatus,
        end_time: Option<String>,
    ) -> Option<Transaction> {
        let tx = self.current.take()?.close(status, end_time);

        metrics::counter!(m::TRANSACTIONS_CLOSED_TOTAL, m::LABEL_STATUS => status.as_str())
            .increment(1);
        tracing::info!(
            transaction_id = %tx.id,
            status = %status,
            items = tx.items.len(),
            total_value = tx.total_value,
            "transaction closed"
        );
        Some(tx)
    }

    /// Builds an item from an item event.
    ///
    /// The extended price is the line total and is used whether or not the
    /// unit price is zero. Prices are minor currency units.
    fn item_from(event: &ClassifiedEvent) -> Item {
        let unit_cents = event
            .detail(PRICE_FIELD)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let extended_cents = event
            .detail(EXTENDED_PRICE_FIELD)
            .and_then(|v| v.as_f64());

        let line_cents = if unit_cents == 0.0 {
            extended_cents.unwrap_or(0.0)
        } else {
            // TODO: confirm with the terminal vendor whether a non-zero unit
            // price should ever override ExtendedPrice on multi-quantity lines
            extended_cents.unwrap_or(unit_cents)
        };

        Item {
            timestamp: event.timestamp.clone(),
            description: event
                .detail(DESCRIPTION_FIELD)
                .map(|v| v.to_text())
                .unwrap_or_default(),
            quantity: event
                .detail(QUANTITY_FIELD)
                .and_then(|v| v.as_i64())
                .unwrap_or(1),
            value: line_cents / MINOR_UNITS,
        }
    }
}
