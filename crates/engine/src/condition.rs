//! Condition evaluation for the `condition` step kind.
//!
//! Operand sides may be literals, `$` expression strings, or nested
//! conditions. Before applying the operator both sides are coerced by
//! dominant type: numeric first, then string, then boolean. A comparison
//! that cannot be made under those rules evaluates to false; only failed
//! *resolution* is an error.

use serde_json::Value;

use crate::context::Context;
use crate::model::{Condition, Operand, Operator};
use crate::resolve::{self, ResolveError};

/// Evaluate a condition tree against the run context.
pub fn evaluate(condition: &Condition, ctx: &Context) -> Result<bool, ResolveError> {
    let left = operand_value(&condition.left, ctx)?;
    let right = operand_value(&condition.right, ctx)?;
    Ok(apply(&left, &right, condition.operator))
}

fn operand_value(operand: &Operand, ctx: &Context) -> Result<Value, ResolveError> {
    match operand {
        Operand::Nested(inner) => evaluate(inner, ctx).map(Value::Bool),
        Operand::Literal(Value::String(s)) => resolve::resolve_str(s, ctx),
        Operand::Literal(value) => Ok(value.clone()),
    }
}

fn apply(left: &Value, right: &Value, operator: Operator) -> bool {
    use Operator::*;

    match operator {
        In | NotIn => {
            let contained = match (left, right) {
                (Value::String(needle), Value::Array(haystack)) => haystack
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|item| item == needle),
                _ => return false,
            };
            if operator == In {
                contained
            } else {
                !contained
            }
        }

        And | Or => match (left.as_bool(), right.as_bool()) {
            (Some(l), Some(r)) => {
                if operator == And {
                    l && r
                } else {
                    l || r
                }
            }
            _ => false,
        },

        Eq | Ne | Gt | Gte | Lt | Lte => {
            if left.is_number() || right.is_number() {
                let (Some(l), Some(r)) = (as_f64(left), as_f64(right)) else {
                    return false;
                };
                match operator {
                    Eq => l == r,
                    Ne => l != r,
                    Gt => l > r,
                    Gte => l >= r,
                    Lt => l < r,
                    Lte => l <= r,
                    _ => unreachable!(),
                }
            } else if left.is_string() || right.is_string() {
                let l = resolve::stringify(left);
                let r = resolve::stringify(right);
                match operator {
                    Eq => l == r,
                    Ne => l != r,
                    // Ordering is defined for numbers only.
                    _ => false,
                }
            } else if left.is_boolean() && right.is_boolean() {
                match operator {
                    Eq => left == right,
                    Ne => left != right,
                    _ => false,
                }
            } else {
                match operator {
                    Eq => left == right,
                    Ne => left != right,
                    _ => false,
                }
            }
        }
    }
}

/// Numeric coercion: numbers directly, numeric strings parsed.
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cond(left: Value, right: Value, operator: Operator) -> Condition {
        Condition {
            left: Operand::Literal(left),
            right: Operand::Literal(right),
            operator,
        }
    }

    fn eval(condition: &Condition) -> bool {
        evaluate(condition, &Context::new(json!({}))).unwrap()
    }

    #[test]
    fn numeric_ordering() {
        assert!(eval(&cond(json!(50), json!(10), Operator::Gt)));
        assert!(!eval(&cond(json!(5), json!(10), Operator::Gt)));
        assert!(eval(&cond(json!(10), json!(10), Operator::Gte)));
        assert!(eval(&cond(json!(3), json!(10), Operator::Lt)));
        assert!(eval(&cond(json!(10.0), json!(10), Operator::Lte)));
    }

    #[test]
    fn numeric_strings_coerce_against_numbers() {
        assert!(eval(&cond(json!("12"), json!(10), Operator::Gt)));
        assert!(eval(&cond(json!(7), json!("7"), Operator::Eq)));
        // A non-numeric string cannot be coerced — the comparison fails.
        assert!(!eval(&cond(json!("twelve"), json!(10), Operator::Gt)));
    }

    #[test]
    fn string_equality_via_stringification() {
        assert!(eval(&cond(json!("a"), json!("a"), Operator::Eq)));
        assert!(eval(&cond(json!("a"), json!("b"), Operator::Ne)));
        assert!(eval(&cond(json!(true), json!("true"), Operator::Eq)));
        // Order operators are undefined for strings.
        assert!(!eval(&cond(json!("b"), json!("a"), Operator::Gt)));
    }

    #[test]
    fn boolean_operators() {
        assert!(eval(&cond(json!(true), json!(true), Operator::And)));
        assert!(!eval(&cond(json!(true), json!(false), Operator::And)));
        assert!(eval(&cond(json!(false), json!(true), Operator::Or)));
        assert!(!eval(&cond(json!(1), json!(true), Operator::And)));
    }

    #[test]
    fn membership_operators() {
        let list = json!(["a", "b"]);
        assert!(eval(&cond(json!("a"), list.clone(), Operator::In)));
        assert!(eval(&cond(json!("c"), list.clone(), Operator::NotIn)));
        // Wrong operand shapes never hold.
        assert!(!eval(&cond(json!(1), list, Operator::In)));
        assert!(!eval(&cond(json!("a"), json!("ab"), Operator::In)));
    }

    #[test]
    fn expressions_resolve_before_comparison() {
        let ctx = Context::new(json!({ "n": 50 }));
        let condition = cond(json!("$input.n"), json!(10), Operator::Gt);
        assert!(evaluate(&condition, &ctx).unwrap());
    }

    #[test]
    fn missing_operand_path_is_an_error() {
        let ctx = Context::new(json!({}));
        let condition = cond(json!("$input.n"), json!(10), Operator::Gt);
        assert!(evaluate(&condition, &ctx).is_err());
    }

    #[test]
    fn nested_conditions_reduce_to_booleans() {
        let ctx = Context::new(json!({ "n": 50 }));
        let condition = Condition {
            left: Operand::Nested(Box::new(cond(json!("$input.n"), json!(10), Operator::Gt))),
            right: Operand::Nested(Box::new(cond(json!("x"), json!("x"), Operator::Eq))),
            operator: Operator::And,
        };
        assert!(evaluate(&condition, &ctx).unwrap());
    }

    #[test]
    fn null_equality_holds() {
        assert!(eval(&cond(Value::Null, Value::Null, Operator::Eq)));
        assert!(!eval(&cond(Value::Null, Value::Null, Operator::Gt)));
    }
}
