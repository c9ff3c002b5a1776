//! Predicate evaluation against one entity plus graph-wide context.

use serde::Serialize;
use serde_json::{json, Value};

use zonal_geometry::{try_parse_number, EntityRef, GeometryGraph};

use crate::predicate::{ComparisonOp, FieldPredicate, Predicate};
use crate::resolve::resolve_field;

/// Outcome of evaluating one predicate tree against one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub passed: bool,
    pub messages: Vec<String>,
    pub facts: Vec<Fact>,
}

impl Evaluation {
    fn pass() -> Self {
        Self {
            passed: true,
            messages: Vec::new(),
            facts: Vec::new(),
        }
    }

    fn fail(message: String, fact: Fact) -> Self {
        Self {
            passed: false,
            messages: vec![message],
            facts: vec![fact],
        }
    }
}

/// Structured record of one failed comparison, for audit and report
/// rendering downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    pub field: String,
    pub operator: String,
    pub expected: Value,
    pub actual: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Evaluate a predicate tree.
pub fn evaluate(predicate: &Predicate, entity: EntityRef<'_>, graph: &GeometryGraph) -> Evaluation {
    match predicate {
        Predicate::All { all, message } => {
            let mut messages = Vec::new();
            let mut facts = Vec::new();
            let mut passed = true;
            // Every child runs so the report carries every failure.
            for child in all {
                let result = evaluate(child, entity, graph);
                if !result.passed {
                    passed = false;
                    messages.extend(result.messages);
                    facts.extend(result.facts);
                }
            }
            if passed {
                Evaluation::pass()
            } else {
                if let Some(prefix) = message {
                    messages.insert(0, prefix.clone());
                }
                Evaluation {
                    passed: false,
                    messages,
                    facts,
                }
            }
        }

        Predicate::Any { any, message } => {
            let mut messages = Vec::new();
            let mut facts = Vec::new();
            for child in any {
                let result = evaluate(child, entity, graph);
                if result.passed {
                    return Evaluation::pass();
                }
                messages.extend(result.messages);
                facts.extend(result.facts);
            }
            let synthetic = message
                .clone()
                .unwrap_or_else(|| "none of the alternatives was satisfied".to_string());
            messages.insert(0, synthetic);
            Evaluation {
                passed: false,
                messages,
                facts,
            }
        }

        Predicate::Not { not, message } => {
            let result = evaluate(not, entity, graph);
            if result.passed {
                Evaluation {
                    passed: false,
                    messages: vec![message
                        .clone()
                        .unwrap_or_else(|| "negated predicate evaluated to true".to_string())],
                    facts: Vec::new(),
                }
            } else {
                Evaluation::pass()
            }
        }

        Predicate::Exists { exists } => {
            let actual = resolve_field(exists, entity, graph);
            if actual.is_null() {
                Evaluation::fail(
                    format!("field '{exists}' is missing"),
                    Fact {
                        field: exists.clone(),
                        operator: "exists".to_string(),
                        expected: json!("present"),
                        actual: Value::Null,
                        message: None,
                    },
                )
            } else {
                Evaluation::pass()
            }
        }

        Predicate::Field(field) => evaluate_field(field, entity, graph),
    }
}

fn evaluate_field(
    pred: &FieldPredicate,
    entity: EntityRef<'_>,
    graph: &GeometryGraph,
) -> Evaluation {
    let actual = resolve_field(&pred.field, entity, graph);
    let expected = expected_value(pred, entity, graph);

    match compare(pred.operator, &actual, &expected) {
        Ok(true) => Evaluation::pass(),
        Ok(false) => {
            let message = pred
                .message
                .clone()
                .unwrap_or_else(|| default_message(pred, &actual, &expected));
            Evaluation::fail(
                message,
                Fact {
                    field: pred.field.clone(),
                    operator: pred.operator.to_string(),
                    expected,
                    actual,
                    message: pred.message.clone(),
                },
            )
        }
        // Data-coercion failure: a failing comparison with a diagnostic,
        // not a raised error.
        Err(reason) => {
            let message = pred.message.clone().unwrap_or_else(|| reason.clone());
            Evaluation::fail(
                message,
                Fact {
                    field: pred.field.clone(),
                    operator: pred.operator.to_string(),
                    expected,
                    actual,
                    message: Some(reason),
                },
            )
        }
    }
}

fn expected_value(pred: &FieldPredicate, entity: EntityRef<'_>, graph: &GeometryGraph) -> Value {
    if let Some(path) = pred.value_field.as_deref().or(pred.value_path.as_deref()) {
        return resolve_field(path, entity, graph);
    }
    match &pred.value {
        Some(Value::String(s)) if s.starts_with('$') => resolve_field(&s[1..], entity, graph),
        Some(v) => v.clone(),
        None => Value::Null,
    }
}

/// Loose equality: numeric when both sides coerce, raw JSON otherwise.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (try_parse_number(a), try_parse_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Truthiness used by `is_truthy` / `is_falsy` and the overlay heuristics:
/// null and empty containers are false, numbers compare against zero.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn compare(op: ComparisonOp, actual: &Value, expected: &Value) -> Result<bool, String> {
    match op {
        ComparisonOp::Eq => Ok(values_equal(actual, expected)),
        ComparisonOp::Ne => Ok(!values_equal(actual, expected)),

        ComparisonOp::Gt | ComparisonOp::Ge | ComparisonOp::Lt | ComparisonOp::Le => {
            let (a, b) = match (try_parse_number(actual), try_parse_number(expected)) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    return Err(format!(
                        "ordering comparison requires numeric operands, got {actual} and {expected}"
                    ))
                }
            };
            Ok(match op {
                ComparisonOp::Gt => a > b,
                ComparisonOp::Ge => a >= b,
                ComparisonOp::Lt => a < b,
                ComparisonOp::Le => a <= b,
                _ => unreachable!(),
            })
        }

        ComparisonOp::In => membership(actual, expected),
        ComparisonOp::NotIn => membership(actual, expected).map(|found| !found),

        ComparisonOp::Contains => containment(actual, expected),
        ComparisonOp::NotContains => containment(actual, expected).map(|found| !found),

        ComparisonOp::IsTruthy => Ok(is_truthy(actual)),
        ComparisonOp::IsFalsy => Ok(!is_truthy(actual)),
    }
}

/// `actual in expected` — the right side must be an array or string.
fn membership(actual: &Value, expected: &Value) -> Result<bool, String> {
    match expected {
        Value::Array(items) => Ok(items.iter().any(|item| values_equal(item, actual))),
        Value::String(haystack) => match actual {
            Value::String(needle) => Ok(haystack.contains(needle.as_str())),
            _ => Err(format!(
                "'in' against a string requires a string operand, got {actual}"
            )),
        },
        _ => Err(format!(
            "'in' requires an array or string on the right side, got {expected}"
        )),
    }
}

/// `actual contains expected` — polymorphic over object key/value, string
/// substring, and array membership.
fn containment(actual: &Value, expected: &Value) -> Result<bool, String> {
    match actual {
        Value::Object(map) => {
            if let Value::String(key) = expected {
                if map.contains_key(key) {
                    return Ok(true);
                }
            }
            Ok(map.values().any(|v| values_equal(v, expected)))
        }
        Value::Array(items) => Ok(items.iter().any(|item| values_equal(item, expected))),
        Value::String(haystack) => match expected {
            Value::String(needle) => Ok(haystack.contains(needle.as_str())),
            _ => Err(format!(
                "'contains' on a string requires a string operand, got {expected}"
            )),
        },
        _ => Err(format!(
            "'contains' requires a container or string on the left side, got {actual}"
        )),
    }
}

fn default_message(pred: &FieldPredicate, actual: &Value, expected: &Value) -> String {
    let field = &pred.field;
    match pred.operator {
        ComparisonOp::Eq => format!("{field} ({actual}) does not equal {expected}"),
        ComparisonOp::Ne => format!("{field} ({actual}) must not equal {expected}"),
        ComparisonOp::Gt | ComparisonOp::Ge | ComparisonOp::Lt | ComparisonOp::Le => {
            format!("{field} ({actual}) is not {} {expected}", pred.operator)
        }
        ComparisonOp::In => format!("{field} ({actual}) is not one of {expected}"),
        ComparisonOp::NotIn => format!("{field} ({actual}) must not be one of {expected}"),
        ComparisonOp::Contains => format!("{field} does not contain {expected}"),
        ComparisonOp::NotContains => format!("{field} must not contain {expected}"),
        ComparisonOp::IsTruthy => format!("{field} is not set"),
        ComparisonOp::IsFalsy => format!("{field} must be unset or false"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn graph() -> GeometryGraph {
        GeometryGraph::from_export(&json!({
            "levels": [{"id": "L1", "metadata": {"heritage_zone": true}}],
            "spaces": [{"id": "S1", "name": "Unit A", "level_id": "L1",
                        "metadata": {"x": 2, "y": 5, "use": "residential",
                                     "window_area_m2": 4.5,
                                     "required_window_area_m2": 4.0},
                        "boundary": [{"x": 0.0, "y": 0.0}, {"x": 8.0, "y": 0.0},
                                     {"x": 8.0, "y": 5.0}, {"x": 0.0, "y": 5.0}]}]
        }))
        .unwrap()
    }

    fn space(graph: &GeometryGraph) -> EntityRef<'_> {
        EntityRef::Space(graph.space("S1").unwrap())
    }

    fn eval_json(pred: serde_json::Value, graph: &GeometryGraph) -> Evaluation {
        let predicate: Predicate = serde_json::from_value(pred).unwrap();
        evaluate(&predicate, space(graph), graph)
    }

    #[test]
    fn all_reports_every_failing_child() {
        let g = graph();
        let result = eval_json(
            json!({"all": [
                {"field": "x", "operator": ">=", "value": 1},
                {"field": "y", "operator": "<", "value": 0}
            ]}),
            &g,
        );
        assert!(!result.passed);
        // x >= 1 passes, y < 0 fails: exactly one fact per failing child.
        assert_eq!(result.facts.len(), 1);

        let result = eval_json(
            json!({"all": [
                {"field": "x", "operator": ">=", "value": 10},
                {"field": "y", "operator": "<", "value": 0}
            ]}),
            &g,
        );
        assert!(!result.passed);
        assert_eq!(result.facts.len(), 2);
        assert_eq!(result.messages.len(), 2);
    }

    #[test]
    fn any_passes_silently_on_first_match() {
        let g = graph();
        let result = eval_json(
            json!({"any": [
                {"field": "use", "operator": "==", "value": "industrial"},
                {"field": "use", "operator": "==", "value": "residential"}
            ]}),
            &g,
        );
        assert!(result.passed);
        assert!(result.messages.is_empty());
        assert!(result.facts.is_empty());
    }

    #[test]
    fn any_failure_includes_synthetic_message() {
        let g = graph();
        let result = eval_json(
            json!({"any": [
                {"field": "use", "operator": "==", "value": "industrial"},
                {"field": "use", "operator": "==", "value": "office"}
            ]}),
            &g,
        );
        assert!(!result.passed);
        assert_eq!(result.messages[0], "none of the alternatives was satisfied");
        assert_eq!(result.facts.len(), 2);
    }

    #[test]
    fn not_inverts_child() {
        let g = graph();
        let result = eval_json(
            json!({"not": {"field": "use", "operator": "==", "value": "residential"}}),
            &g,
        );
        assert!(!result.passed);
        assert_eq!(result.messages, vec!["negated predicate evaluated to true"]);

        let result = eval_json(
            json!({"not": {"field": "use", "operator": "==", "value": "industrial"}}),
            &g,
        );
        assert!(result.passed);
    }

    #[test]
    fn exists_checks_for_null() {
        let g = graph();
        assert!(eval_json(json!({"exists": "metadata.use"}), &g).passed);

        let result = eval_json(json!({"exists": "metadata.nope"}), &g);
        assert!(!result.passed);
        assert_eq!(result.facts[0].operator, "exists");
    }

    #[test]
    fn ordering_on_non_numeric_fails_soft_with_diagnostic() {
        let g = graph();
        let result = eval_json(json!({"field": "use", "operator": ">", "value": 3}), &g);
        assert!(!result.passed);
        assert_eq!(result.facts.len(), 1);
        let diag = result.facts[0].message.as_deref().unwrap();
        assert!(diag.contains("numeric"), "diagnostic was: {diag}");
    }

    #[test]
    fn numeric_strings_coerce_in_comparisons() {
        let g = graph();
        assert!(eval_json(json!({"field": "x", "operator": "==", "value": "2"}), &g).passed);
        assert!(eval_json(json!({"field": "x", "operator": "<=", "value": "2.0"}), &g).passed);
    }

    #[test]
    fn dollar_prefixed_value_resolves_as_path() {
        let g = graph();
        let result = eval_json(
            json!({"field": "metadata.window_area_m2", "operator": ">=",
                   "value": "$metadata.required_window_area_m2"}),
            &g,
        );
        assert!(result.passed);
    }

    #[test]
    fn value_field_resolves_as_path() {
        let g = graph();
        let result = eval_json(
            json!({"field": "metadata.window_area_m2", "operator": "<",
                   "value_field": "metadata.required_window_area_m2"}),
            &g,
        );
        assert!(!result.passed);
        assert_eq!(result.facts[0].expected, json!(4.0));
        assert_eq!(result.facts[0].actual, json!(4.5));
    }

    #[test]
    fn membership_and_containment() {
        let g = graph();
        assert!(eval_json(
            json!({"field": "use", "operator": "in", "value": ["residential", "mixed"]}),
            &g
        )
        .passed);
        assert!(eval_json(
            json!({"field": "use", "operator": "not_in", "value": ["industrial"]}),
            &g
        )
        .passed);
        // Object containment matches keys.
        assert!(eval_json(
            json!({"field": "metadata", "operator": "contains", "value": "use"}),
            &g
        )
        .passed);
        // String containment is substring.
        assert!(eval_json(
            json!({"field": "use", "operator": "contains", "value": "resid"}),
            &g
        )
        .passed);
    }

    #[test]
    fn in_with_non_container_fails_soft() {
        let g = graph();
        let result = eval_json(json!({"field": "use", "operator": "in", "value": 7}), &g);
        assert!(!result.passed);
        assert!(result.facts[0].message.is_some());
    }

    #[test]
    fn truthiness_operators() {
        let g = graph();
        let level = EntityRef::Level(g.level("L1").unwrap());
        let pred: Predicate = serde_json::from_value(
            json!({"field": "heritage_zone", "operator": "is_truthy"}),
        )
        .unwrap();
        assert!(evaluate(&pred, level, &g).passed);

        let result = eval_json(json!({"field": "metadata.nope", "operator": "is_truthy"}), &g);
        assert!(!result.passed);
        assert!(eval_json(json!({"field": "metadata.nope", "operator": "is_falsy"}), &g).passed);
    }

    #[test]
    fn rule_supplied_message_wins() {
        let g = graph();
        let result = eval_json(
            json!({"field": "x", "operator": ">", "value": 100,
                   "message": "unit count too low for this zone"}),
            &g,
        );
        assert_eq!(result.messages, vec!["unit count too low for this zone"]);
    }
}
