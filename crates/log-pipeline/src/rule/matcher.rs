//! Rule classifier -- ordered first-match over validated definitions.
//!
//! [`RuleClassifier`] evaluates each definition's primary test, then its
//! condition chain, and returns the first definition that passes. When none
//! does, the rule set's default output applies, so every parsed message is
//! classified exactly once.

use crate::parser::{ExtractedMessage, RawField};

use super::types::{
    Combinator, Condition, EventDefinition, EventOutput, Operator, PrimaryMatch, RuleSet,
};

/// Ordered first-match classifier
pub struct RuleClassifier {
    rules: RuleSet,
}

impl RuleClassifier {
    /// Creates a classifier over a validated rule set.
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// The rule set in use
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Output of the winning definition, or the default output.
    pub fn classify(&self, msg: &ExtractedMessage) -> &EventOutput {
        self.find_match(msg)
            .map_or(self.rules.default_output(), |(_, def)| &def.output)
    }

    /// Index and definition of the first match, if any.
    pub fn find_match(&self, msg: &ExtractedMessage) -> Option<(usize, &EventDefinition)> {
        self.rules
            .definitions()
            .iter()
            .enumerate()
            .find(|(_, def)| Self::matches(def, msg))
    }

    /// Whether one definition accepts the message.
    pub fn matches(def: &EventDefinition, msg: &ExtractedMessage) -> bool {
        Self::primary_matches(&def.primary, msg) && Self::conditions_hold(&def.conditions, msg)
    }

    fn primary_matches(primary: &PrimaryMatch, msg: &ExtractedMessage) -> bool {
        match primary {
            PrimaryMatch::Id(literal) => msg.descriptor.id.as_deref() == Some(literal.as_str()),
            PrimaryMatch::Name(literal) => {
                msg.descriptor.name.as_deref() == Some(literal.as_str())
            }
            PrimaryMatch::AnyFieldPresent(names) => names
                .iter()
                .any(|name| msg.fields.get(name).is_some_and(|f| !f.is_blank())),
        }
    }

    /// Folds the chain left to right: the first result seeds the
    /// accumulator, each later result joins it with its own combinator.
    /// An empty chain holds.
    fn conditions_hold(conditions: &[Condition], msg: &ExtractedMessage) -> bool {
        let mut iter = conditions.iter();
        let Some(first) = iter.next() else {
            return true;
        };

        let mut acc = Self::evaluate(first, msg);
        for cond in iter {
            let result = Self::evaluate(cond, msg);
            acc = match cond.combinator {
                Combinator::And => acc && result,
                Combinator::Or => acc || result,
            };
        }
        acc
    }

    fn evaluate(cond: &Condition, msg: &ExtractedMessage) -> bool {
        let field = msg.fields.get(&cond.field);
        let value = field.and_then(|f| f.value.as_deref());

        match &cond.operator {
            Operator::IsNullOrEmpty => field.is_none_or(RawField::is_blank),
            Operator::IsNotNullOrEmpty => field.is_some_and(|f| !f.is_blank()),
            Operator::Equals(expected) => value == Some(expected.as_str()),
            Operator::NotEquals(expected) => value != Some(expected.as_str()),
            Operator::Contains(needle) => value.is_some_and(|v| v.contains(needle.as_str())),
            Operator::NotContains(needle) => !value.is_some_and(|v| v.contains(needle.as_str())),
        }
    }
}
