//! Rule configuration types
//!
//! Two layers live here. The `*Config` structs mirror the rule document as
//! written (JSON or YAML). [`RuleConfig::compile`] validates them once and
//! produces a [`RuleSet`] of typed definitions, so no lookup can fail while
//! messages are being classified.
//!
//! # Rule document
//! ```json
//! {
//!   "event_definitions": [
//!     {
//!       "match_type": "id",
//!       "match_value": "ItemSold",
//!       "conditions": [
//!         { "field": "DiscountAmount", "operator": "is_null_or_empty" },
//!         { "field": "Price", "operator": "is_not_null_or_empty", "logical_operator": "and" }
//!       ],
//!       "event_type": "ITEM_SOLD",
//!       "fields_to_extract": {
//!         "Price": { "ftype": "int" },
//!         "Amount": { "transform": "divide", "value": 100 },
//!         "Id": { "target_name": "TransactionId" }
//!       }
//!     }
//!   ],
//!   "default_event": {
//!     "event_type": "GENERIC_MESSAGE",
//!     "fields_to_extract": { "MessageId": { "source_name": "message_id" } }
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use scowatch_core::types::{EventKind, FieldType, FieldValue};

use crate::error::LogPipelineError;

/// Upper bound on the number of definitions in one document
pub const MAX_DEFINITIONS: usize = 10_000;

// ---------------------------------------------------------------------------
// Document layer
// ---------------------------------------------------------------------------

/// Rule document as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Definitions, evaluated in order
    #[serde(default)]
    pub event_definitions: Vec<EventDefinitionConfig>,
    /// Fallback used when no definition matches
    pub default_event: DefaultEventConfig,
}

/// One event definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDefinitionConfig {
    /// Primary test
    pub match_type: MatchType,
    /// Literal for `id` / `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_value: Option<String>,
    /// Field names for `any_field_present`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_values: Vec<String>,
    /// Condition chain
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionConfig>,
    /// Emitted kind (config or wire name)
    pub event_type: String,
    /// Source field name -> extraction spec
    #[serde(default)]
    pub fields_to_extract: IndexMap<String, FieldSpecConfig>,
}

/// Primary test kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Root `id` equals `match_value`
    Id,
    /// Root `name` equals `match_value`
    Name,
    /// Some field in `match_values` has a non-blank value
    AnyFieldPresent,
}

/// One condition as written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// Raw field name
    pub field: String,
    /// Test applied to the field
    pub operator: ConditionOperator,
    /// How this result joins the previous ones (ignored on the first condition)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<Combinator>,
    /// Operand for `equals` / `not_equals` / `contains` / `not_contains`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
}

/// Condition operator as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Field missing, without text, or blank
    IsNullOrEmpty,
    /// Field present with non-blank text
    IsNotNullOrEmpty,
    /// Field text equals the operand
    Equals,
    /// Field missing or text differs from the operand
    NotEquals,
    /// Field text contains the operand
    Contains,
    /// Field missing or text does not contain the operand
    NotContains,
}

/// Boolean combinator between conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// Both must hold
    #[default]
    #[serde(alias = "AND")]
    And,
    /// Either may hold
    #[serde(alias = "OR")]
    Or,
}

/// Extraction spec for one field as written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSpecConfig {
    /// Output key (defaults to the source name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    /// Arithmetic transform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformKind>,
    /// Transform operand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Type override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ftype: Option<FieldType>,
    /// Read from the root descriptor instead of the field map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<VirtualSource>,
}

/// Arithmetic transform kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Numeric parse, then divide by `value`
    Divide,
}

/// Pseudo-fields backed by the root descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualSource {
    /// Root `id` attribute
    MessageId,
    /// Root `name` attribute
    MessageName,
}

/// Fallback definition as written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultEventConfig {
    /// Emitted kind
    #[serde(default = "default_event_type")]
    pub event_type: String,
    /// Source field name -> extraction spec
    #[serde(default)]
    pub fields_to_extract: IndexMap<String, FieldSpecConfig>,
}

fn default_event_type() -> String {
    EventKind::GenericMessage.config_name().to_owned()
}

// ---------------------------------------------------------------------------
// Compiled layer
// ---------------------------------------------------------------------------

/// Validated primary test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryMatch {
    /// Root id literal
    Id(String),
    /// Root name literal
    Name(String),
    /// Any of these fields present and non-blank
    AnyFieldPresent(Vec<String>),
}

/// Validated condition operator with its operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    /// See [`ConditionOperator::IsNullOrEmpty`]
    IsNullOrEmpty,
    /// See [`ConditionOperator::IsNotNullOrEmpty`]
    IsNotNullOrEmpty,
    /// Exact text equality
    Equals(String),
    /// Negated equality; a missing field counts as different
    NotEquals(String),
    /// Substring test
    Contains(String),
    /// Negated substring test; a missing field never contains anything
    NotContains(String),
}

/// Validated condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Raw field name
    pub field: String,
    /// Test
    pub operator: Operator,
    /// Join with the accumulated result
    pub combinator: Combinator,
}

/// Where a field value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// Named raw field
    Raw(String),
    /// Root `id`
    MessageId,
    /// Root `name`
    MessageName,
}

/// Validated arithmetic transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Divide by a non-zero constant
    Divide(f64),
}

/// Validated extraction spec.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Value source
    pub source: FieldSource,
    /// Output key
    pub target_name: String,
    /// Optional transform
    pub transform: Option<Transform>,
    /// Overrides the markup's declared type
    pub type_override: Option<FieldType>,
}

/// What a matching definition produces.
#[derive(Debug, Clone, PartialEq)]
pub struct EventOutput {
    /// Emitted kind
    pub event_type: EventKind,
    /// Specs in document order
    pub fields: Vec<FieldSpec>,
}

/// Validated event definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    /// Primary test
    pub primary: PrimaryMatch,
    /// Condition chain
    pub conditions: Vec<Condition>,
    /// Output
    pub output: EventOutput,
}

/// Ordered definitions plus the mandatory default.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    definitions: Vec<EventDefinition>,
    default: EventOutput,
}

impl RuleSet {
    /// Builds a rule set from already validated parts.
    pub fn new(definitions: Vec<EventDefinition>, default: EventOutput) -> Self {
        Self {
            definitions,
            default,
        }
    }

    /// Definitions in evaluation order
    pub fn definitions(&self) -> &[EventDefinition] {
        &self.definitions
    }

    /// Fallback output
    pub fn default_output(&self) -> &EventOutput {
        &self.default
    }

    /// Number of definitions, default excluded
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether only the default exists
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl RuleConfig {
    /// Validates every definition and produces a [`RuleSet`].
    ///
    /// Fails on the first inconsistency: unknown event type, missing match
    /// literal, operator without operand, or divide without a usable constant.
    pub fn compile(self) -> Result<RuleSet, LogPipelineError> {
        if self.event_definitions.len() > MAX_DEFINITIONS {
            return Err(LogPipelineError::RuleValidation {
                rule: "event_definitions".to_owned(),
                reason: format!("too many definitions: max {MAX_DEFINITIONS}"),
            });
        }

        let definitions = self
            .event_definitions
            .into_iter()
            .enumerate()
            .map(|(idx, def)| def.compile(&format!("event_definitions[{idx}]")))
            .collect::<Result<Vec<_>, _>>()?;

        let default = compile_output(
            &self.default_event.event_type,
            self.default_event.fields_to_extract,
            "default_event",
        )?;

        Ok(RuleSet::new(definitions, default))
    }
}

impl EventDefinitionConfig {
    fn compile(self, locator: &str) -> Result<EventDefinition, LogPipelineError> {
        let invalid = |reason: String| LogPipelineError::RuleValidation {
            rule: locator.to_owned(),
            reason,
        };

        let primary = match self.match_type {
            MatchType::Id | MatchType::Name => {
                let literal = self
                    .match_value
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| invalid("match_value is required for this match_type".to_owned()))?;
                if self.match_type == MatchType::Id {
                    PrimaryMatch::Id(literal)
                } else {
                    PrimaryMatch::Name(literal)
                }
            }
            MatchType::AnyFieldPresent => {
                if self.match_values.is_empty() || self.match_values.iter().any(String::is_empty) {
                    return Err(invalid(
                        "any_field_present needs a non-empty match_values list".to_owned(),
                    ));
                }
                PrimaryMatch::AnyFieldPresent(self.match_values)
            }
        };

        let conditions = self
            .conditions
            .into_iter()
            .enumerate()
            .map(|(idx, cond)| cond.compile(locator, idx))
            .collect::<Result<Vec<_>, _>>()?;

        let output = compile_output(&self.event_type, self.fields_to_extract, locator)?;

        Ok(EventDefinition {
            primary,
            conditions,
            output,
        })
    }
}

impl ConditionConfig {
    fn compile(self, locator: &str, idx: usize) -> Result<Condition, LogPipelineError> {
        let invalid = |reason: String| LogPipelineError::RuleValidation {
            rule: format!("{locator}.conditions[{idx}]"),
            reason,
        };

        if self.field.is_empty() {
            return Err(invalid("condition field must not be empty".to_owned()));
        }

        let operand = self.value.map(|v| v.to_text());
        let operator = match (self.operator, operand) {
            (ConditionOperator::IsNullOrEmpty, _) => Operator::IsNullOrEmpty,
            (ConditionOperator::IsNotNullOrEmpty, _) => Operator::IsNotNullOrEmpty,
            (ConditionOperator::Equals, Some(v)) => Operator::Equals(v),
            (ConditionOperator::NotEquals, Some(v)) => Operator::NotEquals(v),
            (ConditionOperator::Contains, Some(v)) => Operator::Contains(v),
            (ConditionOperator::NotContains, Some(v)) => Operator::NotContains(v),
            (op, None) => return Err(invalid(format!("operator {op:?} requires a value"))),
        };

        Ok(Condition {
            field: self.field,
            operator,
            combinator: self.logical_operator.unwrap_or_default(),
        })
    }
}

fn compile_output(
    event_type: &str,
    fields: IndexMap<String, FieldSpecConfig>,
    locator: &str,
) -> Result<EventOutput, LogPipelineError> {
    let event_type =
        EventKind::from_name(event_type).ok_or_else(|| LogPipelineError::RuleValidation {
            rule: locator.to_owned(),
            reason: format!("unknown event_type '{event_type}'"),
        })?;

    let fields = fields
        .into_iter()
        .map(|(source, spec)| compile_field(source, spec, locator))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EventOutput { event_type, fields })
}

fn compile_field(
    source: String,
    spec: FieldSpecConfig,
    locator: &str,
) -> Result<FieldSpec, LogPipelineError> {
    let invalid = |reason: String| LogPipelineError::RuleValidation {
        rule: format!("{locator}.fields_to_extract.{source}"),
        reason,
    };

    if source.is_empty() {
        return Err(invalid("field name must not be empty".to_owned()));
    }
    if spec.target_name.as_deref() == Some("") {
        return Err(invalid("target_name must not be empty".to_owned()));
    }

    let transform = match spec.transform {
        None => None,
        Some(TransformKind::Divide) => match spec.value {
            Some(divisor) if divisor.is_finite() && divisor != 0.0 => {
                Some(Transform::Divide(divisor))
            }
            _ => {
                return Err(invalid(
                    "divide requires a finite, non-zero value".to_owned(),
                ));
            }
        },
    };

    let field_source = match spec.source_name {
        Some(VirtualSource::MessageId) => FieldSource::MessageId,
        Some(VirtualSource::MessageName) => FieldSource::MessageName,
        None => FieldSource::Raw(source.clone()),
    };

    Ok(FieldSpec {
        source: field_source,
        target_name: spec.target_name.unwrap_or(source),
        transform,
        type_override: spec.ftype,
    })
}
