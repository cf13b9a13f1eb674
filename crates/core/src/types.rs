//! Domain types -- data shared by every stage of the monitor
//!
//! Classified events are produced once by the extraction pipeline and never
//! mutated afterwards. A [`Transaction`] is the only mutable record and is
//! owned by exactly one aggregator until it is closed and handed to a sink.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Event payload: target field name -> typed value, in extraction order.
pub type Details = IndexMap<String, FieldValue>;

/// Primitive type a field can be declared as, either by the `ftype`
/// attribute in the message markup or by a rule's field spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Signed integer
    Int,
    /// Floating point
    Float,
    /// `1`/`true`/`yes` are true, anything else false
    Boolean,
    /// Plain text
    String,
}

impl FieldType {
    /// Parses a declared type attribute. Unknown names yield `None` so the
    /// field is kept as text.
    pub fn from_attr(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "boolean" | "bool" => Some(Self::Boolean),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// A typed field value inside an event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text, kept verbatim
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value. Text is parsed after trimming; booleans
    /// have no numeric view. Only finite numbers count: `NaN` and `inf`
    /// have no JSON form.
    pub fn as_f64(&self) -> Option<f64> {
        let n = match self {
            Self::Int(v) => *v as f64,
            Self::Float(v) => *v,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Bool(_) => return None,
        };
        n.is_finite().then_some(n)
    }

    /// Integer view of the value. Floats and numeric text are truncated
    /// toward zero; non-finite or out-of-range numbers yield `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(_) => None,
            other => other.as_f64().and_then(truncate_to_i64),
        }
    }

    /// Text view of the value, as the value would print.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

fn truncate_to_i64(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return None;
    }
    Some(truncated as i64)
}

/// Semantic event kinds a rule may emit.
///
/// The set is closed: rule files name kinds by their config name
/// (`TRANSACTION_START`) or wire name (`StartTransaction`), and any other
/// name is rejected when the rules are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A new transaction began
    TransactionStart,
    /// The current transaction finished
    TransactionEnd,
    /// An item was scanned
    ItemSold,
    /// Discount or other modification attached to an item
    ItemModifier,
    /// Running totals
    TransactionSummary,
    /// The customer entered tender mode
    TenderStart,
    /// A payment was accepted
    TenderAccepted,
    /// Operator assistance requested
    AssistModeEnter,
    /// Operator assistance resolved
    AssistModeExit,
    /// Terminal switched to store (operator) mode
    StoreModeEnter,
    /// Any message without a more specific definition
    GenericMessage,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 11] = [
        Self::TransactionStart,
        Self::TransactionEnd,
        Self::ItemSold,
        Self::ItemModifier,
        Self::TransactionSummary,
        Self::TenderStart,
        Self::TenderAccepted,
        Self::AssistModeEnter,
        Self::AssistModeExit,
        Self::StoreModeEnter,
        Self::GenericMessage,
    ];

    /// Name written to output records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransactionStart => "StartTransaction",
            Self::TransactionEnd => "EndTransaction",
            Self::ItemSold => "ItemSold",
            Self::ItemModifier => "ItemModifier",
            Self::TransactionSummary => "TransactionSummary",
            Self::TenderStart => "TenderStart",
            Self::TenderAccepted => "TenderAccepted",
            Self::AssistModeEnter => "AssistModeEnter",
            Self::AssistModeExit => "AssistModeExit",
            Self::StoreModeEnter => "StoreModeEnter",
            Self::GenericMessage => "GenericMessage",
        }
    }

    /// Name used in rule files.
    pub fn config_name(&self) -> &'static str {
        match self {
            Self::TransactionStart => "TRANSACTION_START",
            Self::TransactionEnd => "TRANSACTION_END",
            Self::ItemSold => "ITEM_SOLD",
            Self::ItemModifier => "ITEM_MODIFIER",
            Self::TransactionSummary => "TRANSACTION_SUMMARY",
            Self::TenderStart => "TENDER_START",
            Self::TenderAccepted => "TENDER_ACCEPTED",
            Self::AssistModeEnter => "ASSIST_MODE_ENTER",
            Self::AssistModeExit => "ASSIST_MODE_EXIT",
            Self::StoreModeEnter => "STORE_MODE_ENTER",
            Self::GenericMessage => "GENERIC_MESSAGE",
        }
    }

    /// Resolves a config name or a wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.config_name() == name || kind.as_str() == name)
    }

    /// How the transaction aggregator treats this kind.
    pub fn role(&self) -> EventRole {
        match self {
            Self::TransactionStart => EventRole::Start,
            Self::TransactionEnd => EventRole::End,
            Self::ItemSold => EventRole::Item,
            Self::ItemModifier
            | Self::TenderStart
            | Self::TenderAccepted
            | Self::AssistModeEnter
            | Self::AssistModeExit
            | Self::StoreModeEnter => EventRole::Auxiliary,
            Self::TransactionSummary | Self::GenericMessage => EventRole::Ignored,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown event type '{name}'")))
    }
}

/// Aggregator role of an event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRole {
    /// Opens a transaction
    Start,
    /// Adds a line item
    Item,
    /// Recorded verbatim on the open transaction
    Auxiliary,
    /// Completes the open transaction
    End,
    /// Not part of transaction tracking
    Ignored,
}

/// A classified terminal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    /// Timestamp copied from the log line
    pub timestamp: String,
    /// Winning event kind
    pub event_type: EventKind,
    /// Transformed fields
    pub details: Details,
}

impl ClassifiedEvent {
    /// Creates an event.
    pub fn new(timestamp: impl Into<String>, event_type: EventKind, details: Details) -> Self {
        Self {
            timestamp: timestamp.into(),
            event_type,
            details,
        }
    }

    /// Looks up a detail by name.
    pub fn detail(&self, name: &str) -> Option<&FieldValue> {
        self.details.get(name)
    }
}

impl fmt::Display for ClassifiedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} fields)",
            self.timestamp,
            self.event_type,
            self.details.len()
        )
    }
}

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Open and accepting events
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    /// Closed by an end event
    #[serde(rename = "COMPLETED")]
    Completed,
    /// Closed because the monitor was interrupted
    #[serde(rename = "ABORTED_BY_USER")]
    Aborted,
    /// Closed because a new start event arrived first
    #[serde(rename = "FORCE_CLOSE_NEW_STARTED")]
    ForceClosed,
}

impl TransactionStatus {
    /// Whether the status is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::ForceClosed => "force_closed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchased line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Event timestamp
    pub timestamp: String,
    /// Item description as printed by the terminal
    pub description: String,
    /// Quantity
    pub quantity: i64,
    /// Line total in currency units
    pub value: f64,
}

/// An intervention, payment or other non-item event attached to a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxEvent {
    /// Event timestamp
    pub timestamp: String,
    /// Event kind
    #[serde(rename = "type")]
    pub event_type: EventKind,
    /// Event details, verbatim
    pub details: Details,
}

/// A single customer transaction, correlated from classified events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identity
    pub id: String,
    /// Timestamp of the start event
    pub start_time: String,
    /// Timestamp of the end event, if it was seen
    pub end_time: Option<String>,
    status: TransactionStatus,
    /// Items in scan order
    pub items: Vec<Item>,
    /// Auxiliary events in arrival order
    #[serde(rename = "events")]
    pub aux_events: Vec<AuxEvent>,
    /// Sum of item values
    pub total_value: f64,
}

impl Transaction {
    /// Opens a new in-progress transaction.
    pub fn open(id: impl Into<String>, start_time: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_time: start_time.into(),
            end_time: None,
            status: TransactionStatus::InProgress,
            items: Vec::new(),
            aux_events: Vec::new(),
            total_value: 0.0,
        }
    }

    /// Current status.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Appends an item and adds its value to the running total.
    pub fn add_item(&mut self, item: Item) {
        self.total_value += item.value;
        self.items.push(item);
    }

    /// Appends an auxiliary event.
    pub fn add_event(&mut self, event: AuxEvent) {
        self.aux_events.push(event);
    }

    /// Closes the transaction with a terminal status.
    ///
    /// Closing is one-way: a transaction that is already closed keeps its
    /// first terminal status, and `InProgress` is never accepted here.
    pub fn close(mut self, status: TransactionStatus, end_time: Option<String>) -> Self {
        if self.status.is_terminal() || !status.is_terminal() {
            return self;
        }
        self.status = status;
        if end_time.is_some() {
            self.end_time = end_time;
        }
        self
    }
}
