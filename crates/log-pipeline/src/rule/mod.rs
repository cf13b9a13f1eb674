//! Classification rules -- data-driven mapping from messages to event kinds
//!
//! A rule document lists event definitions in precedence order plus a
//! mandatory default. Each definition has a primary test (`id`, `name` or
//! `any_field_present`), an optional condition chain, the emitted event kind
//! and the fields to extract.
//!
//! # Architecture
//! - [`loader`]: reads JSON/YAML rule files, or the built-in set
//! - [`types`]: document structs and their validated, compiled form
//! - [`matcher`]: ordered first-match evaluation ([`RuleClassifier`])

pub mod loader;
pub mod matcher;
pub mod types;

pub use loader::{RuleFormat, RuleLoader};
pub use matcher::RuleClassifier;
pub use types::{
    Combinator, Condition, EventDefinition, EventOutput, FieldSource, FieldSpec, Operator,
    PrimaryMatch, RuleConfig, RuleSet, Transform,
};
