//! Message parsing -- turns a block's markup into raw named fields.
//!
//! [`FieldExtractor`] reads the root element's `id`/`name` attributes and
//! every `field` element below it. Values stay as text here; typing happens
//! later in the [`FieldTransformer`](crate::transform::FieldTransformer).
//!
//! # Example
//! ```ignore
//! use scowatch_log_pipeline::parser::FieldExtractor;
//!
//! let msg = FieldExtractor::extract(
//!     r#"<message id="ItemSold"><fields><field name="Price" ftype="int">89</field></fields></message>"#,
//! ).unwrap();
//! assert_eq!(msg.descriptor.id.as_deref(), Some("ItemSold"));
//! ```

pub mod markup;

pub use markup::FieldExtractor;

use indexmap::IndexMap;
use scowatch_core::types::FieldType;

/// Root element attributes of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageDescriptor {
    /// `id` attribute
    pub id: Option<String>,
    /// `name` attribute
    pub name: Option<String>,
}

/// One field as written in the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    /// Element text. `None` when the element has no text at all.
    pub value: Option<String>,
    /// `ftype` attribute, if it names a known type
    pub declared_type: Option<FieldType>,
}

impl RawField {
    /// Field with a text value and no declared type.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            declared_type: None,
        }
    }

    /// Sets the declared type.
    pub fn with_type(mut self, declared_type: FieldType) -> Self {
        self.declared_type = Some(declared_type);
        self
    }

    /// Whether the value is missing or blank after trimming.
    pub fn is_blank(&self) -> bool {
        self.value.as_deref().is_none_or(|v| v.trim().is_empty())
    }
}

/// Raw fields by name, in document order. A repeated name keeps the last value.
pub type RawFields = IndexMap<String, RawField>;

/// Result of extracting one block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedMessage {
    /// Root attributes
    pub descriptor: MessageDescriptor,
    /// Field elements
    pub fields: RawFields,
}

impl ExtractedMessage {
    /// Looks up a raw field value.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|f| f.value.as_deref())
    }
}
