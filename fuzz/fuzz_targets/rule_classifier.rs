#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::json;

use scowatch_log_pipeline::parser::FieldExtractor;
use scowatch_log_pipeline::rule::{RuleClassifier, RuleFormat, RuleLoader};
use scowatch_log_pipeline::transform::FieldTransformer;

/// Structured fuzzer input
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// Condition chain of the single definition (capped at 8)
    conditions: Vec<FuzzCondition>,
    /// Fields of the message being classified
    fields: Vec<(FuzzField, String)>,
    divisor: f64,
}

#[derive(Arbitrary, Debug)]
struct FuzzCondition {
    field: FuzzField,
    operator: FuzzOperator,
    or: bool,
    value: String,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzField {
    Price,
    Quantity,
    Description,
    VoidFlag,
}

#[derive(Arbitrary, Debug)]
enum FuzzOperator {
    IsNullOrEmpty,
    IsNotNullOrEmpty,
    Equals,
    NotEquals,
    Contains,
    NotContains,
}

impl FuzzField {
    fn as_str(self) -> &'static str {
        match self {
            FuzzField::Price => "Price",
            FuzzField::Quantity => "Quantity",
            FuzzField::Description => "Description",
            FuzzField::VoidFlag => "VoidFlag",
        }
    }
}

impl FuzzOperator {
    fn as_str(&self) -> &'static str {
        match self {
            FuzzOperator::IsNullOrEmpty => "is_null_or_empty",
            FuzzOperator::IsNotNullOrEmpty => "is_not_null_or_empty",
            FuzzOperator::Equals => "equals",
            FuzzOperator::NotEquals => "not_equals",
            FuzzOperator::Contains => "contains",
            FuzzOperator::NotContains => "not_contains",
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fuzz_target!(|input: FuzzInput| {
    let conditions: Vec<_> = input
        .conditions
        .iter()
        .take(8)
        .map(|c| {
            json!({
                "field": c.field.as_str(),
                "operator": c.operator.as_str(),
                "logical_operator": if c.or { "or" } else { "and" },
                "value": c.value,
            })
        })
        .collect();

    let document = json!({
        "event_definitions": [{
            "match_type": "id",
            "match_value": "ItemSold",
            "conditions": conditions,
            "event_type": "ITEM_SOLD",
            "fields_to_extract": {
                "Price": {"transform": "divide", "value": input.divisor, "ftype": "float"},
                "Quantity": {"ftype": "int"},
                "VoidFlag": {"ftype": "boolean"},
                "Description": {}
            }
        }],
        "default_event": {"event_type": "GENERIC_MESSAGE", "fields_to_extract": {}}
    });

    // Zero or non-finite divisors are rejected at load time
    let Ok(rules) = RuleLoader::parse(&document.to_string(), RuleFormat::Json, "fuzz") else {
        return;
    };
    let classifier = RuleClassifier::new(rules);

    let mut markup = String::from(r#"<message id="ItemSold"><fields>"#);
    for (field, value) in input.fields.iter().take(16) {
        markup.push_str(&format!(
            r#"<field name="{}">{}</field>"#,
            field.as_str(),
            escape(value)
        ));
    }
    markup.push_str("</fields></message>");

    if let Some(msg) = FieldExtractor::extract(&markup) {
        let first = classifier.classify(&msg);
        let second = classifier.classify(&msg);
        assert_eq!(first, second);
        let _ = FieldTransformer::apply(first, &msg);
    }
});
