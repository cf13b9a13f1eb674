//! Field transformer -- builds an event payload from a winning definition.
//!
//! For each field spec, in order:
//! 1. resolve the value (root descriptor for virtual sources, raw field otherwise)
//! 2. skip the target entirely when nothing resolves
//! 3. apply the arithmetic transform, if any
//! 4. coerce to the spec's type, or the markup's declared type
//!
//! Nothing here fails. A value that cannot be converted keeps its previous
//! form.

use scowatch_core::types::{Details, FieldType, FieldValue};

use crate::parser::ExtractedMessage;
use crate::rule::{EventOutput, FieldSource, FieldSpec, Transform};

/// Truthy spellings for boolean coercion, compared after lower-casing
const TRUTHY: [&str; 3] = ["1", "true", "yes"];

/// Stateless payload builder
pub struct FieldTransformer;

impl FieldTransformer {
    /// Builds the details map for `output` from `msg`.
    pub fn apply(output: &EventOutput, msg: &ExtractedMessage) -> Details {
        let mut details = Details::with_capacity(output.fields.len());
        for spec in &output.fields {
            if let Some(value) = Self::resolve_field(spec, msg) {
                details.insert(spec.target_name.clone(), value);
            }
        }
        details
    }

    fn resolve_field(spec: &FieldSpec, msg: &ExtractedMessage) -> Option<FieldValue> {
        let (raw, declared) = match &spec.source {
            FieldSource::MessageId => (msg.descriptor.id.as_deref()?, None),
            FieldSource::MessageName => (msg.descriptor.name.as_deref()?, None),
            FieldSource::Raw(name) => {
                let field = msg.fields.get(name)?;
                (field.value.as_deref()?, field.declared_type)
            }
        };

        let mut value = FieldValue::from(raw);
        if let Some(transform) = spec.transform {
            value = Self::transform(value, transform);
        }
        Some(Self::coerce(value, spec.type_override.or(declared)))
    }

    /// Applies an arithmetic transform. Non-numeric input, or a result
    /// that is not finite, passes through unchanged.
    pub fn transform(value: FieldValue, transform: Transform) -> FieldValue {
        match transform {
            Transform::Divide(divisor) => match value.as_f64().map(|n| n / divisor) {
                Some(q) if q.is_finite() => FieldValue::Float(q),
                _ => value,
            },
        }
    }

    /// Coerces a value to `target`. Failed conversions leave it unchanged;
    /// `None` and `String` keep the value as it is.
    pub fn coerce(value: FieldValue, target: Option<FieldType>) -> FieldValue {
        match target {
            Some(FieldType::Int) => match value.as_i64() {
                Some(n) => FieldValue::Int(n),
                None => value,
            },
            Some(FieldType::Float) => match value.as_f64() {
                Some(n) => FieldValue::Float(n),
                None => value,
            },
            Some(FieldType::Boolean) => {
                let text = value.to_text().to_lowercase();
                FieldValue::Bool(TRUTHY.contains(&text.as_str()))
            }
            Some(FieldType::String) | None => value,
        }
    }
}
