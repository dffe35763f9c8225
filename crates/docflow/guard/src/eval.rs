//! Evaluator: runs an expression tree against a document snapshot
//!
//! `try_evaluate` is strict about types and reports the first issue it
//! hits. `evaluate` is the fail-closed wrapper used for routing: any
//! issue, including a missing field or a non-boolean result, yields
//! `false` and a warning.

use docflow_types::{DocumentSnapshot, FieldValue};
use thiserror::Error;
use tracing::warn;

use crate::parser::{BinaryOp, Expr, Literal};

/// A problem encountered while evaluating an expression
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalIssue {
    #[error("Field not present in document: {0}")]
    MissingField(String),

    #[error("Type mismatch: {op} requires {expected}, got {found}")]
    TypeMismatch {
        op: String,
        expected: String,
        found: String,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Guard did not produce a boolean, got {0}")]
    NonBooleanResult(String),
}

fn type_name(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Number(_) => "number",
        FieldValue::Text(_) => "text",
        FieldValue::Bool(_) => "bool",
    }
}

fn literal_value(lit: &Literal) -> FieldValue {
    match lit {
        Literal::Number(n) => FieldValue::Number(*n),
        Literal::Text(s) => FieldValue::Text(s.clone()),
        Literal::Bool(b) => FieldValue::Bool(*b),
    }
}

/// Evaluate an expression against a snapshot, reporting any issue.
pub fn try_evaluate(expr: &Expr, snapshot: &DocumentSnapshot) -> Result<FieldValue, EvalIssue> {
    match expr {
        Expr::Literal(lit) => Ok(literal_value(lit)),

        Expr::Field(name) => snapshot
            .get(name)
            .cloned()
            .ok_or_else(|| EvalIssue::MissingField(name.clone())),

        Expr::Not(inner) => {
            let value = try_evaluate(inner, snapshot)?;
            match value {
                FieldValue::Bool(b) => Ok(FieldValue::Bool(!b)),
                other => Err(EvalIssue::TypeMismatch {
                    op: "not".into(),
                    expected: "bool".into(),
                    found: type_name(&other).into(),
                }),
            }
        }

        Expr::Neg(inner) => {
            let value = try_evaluate(inner, snapshot)?;
            match value {
                FieldValue::Number(n) => Ok(FieldValue::Number(-n)),
                other => Err(EvalIssue::TypeMismatch {
                    op: "-".into(),
                    expected: "number".into(),
                    found: type_name(&other).into(),
                }),
            }
        }

        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, snapshot),

        Expr::InList { needle, items } => {
            let value = try_evaluate(needle, snapshot)?;
            for item in items {
                let candidate = literal_value(item);
                if type_name(&value) != type_name(&candidate) {
                    return Err(EvalIssue::TypeMismatch {
                        op: "in".into(),
                        expected: type_name(&value).into(),
                        found: type_name(&candidate).into(),
                    });
                }
                if values_equal(&value, &candidate) {
                    return Ok(FieldValue::Bool(true));
                }
            }
            Ok(FieldValue::Bool(false))
        }
    }
}

fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    snapshot: &DocumentSnapshot,
) -> Result<FieldValue, EvalIssue> {
    // Short-circuit logical operators before evaluating the right side
    match op {
        BinaryOp::And => {
            let left = expect_bool(try_evaluate(lhs, snapshot)?, "and")?;
            if !left {
                return Ok(FieldValue::Bool(false));
            }
            let right = expect_bool(try_evaluate(rhs, snapshot)?, "and")?;
            return Ok(FieldValue::Bool(right));
        }
        BinaryOp::Or => {
            let left = expect_bool(try_evaluate(lhs, snapshot)?, "or")?;
            if left {
                return Ok(FieldValue::Bool(true));
            }
            let right = expect_bool(try_evaluate(rhs, snapshot)?, "or")?;
            return Ok(FieldValue::Bool(right));
        }
        _ => {}
    }

    let left = try_evaluate(lhs, snapshot)?;
    let right = try_evaluate(rhs, snapshot)?;

    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            if type_name(&left) != type_name(&right) {
                return Err(EvalIssue::TypeMismatch {
                    op: op.to_string(),
                    expected: type_name(&left).into(),
                    found: type_name(&right).into(),
                });
            }
            let equal = values_equal(&left, &right);
            Ok(FieldValue::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }

        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (a, b) = expect_numbers(&left, &right, op)?;
            let result = match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Le => a <= b,
                BinaryOp::Gt => a > b,
                BinaryOp::Ge => a >= b,
                _ => unreachable!(),
            };
            Ok(FieldValue::Bool(result))
        }

        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let (a, b) = expect_numbers(&left, &right, op)?;
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err(EvalIssue::DivisionByZero);
                    }
                    a / b
                }
                _ => unreachable!(),
            };
            Ok(FieldValue::Number(result))
        }

        BinaryOp::And | BinaryOp::Or => unreachable!(),
    }
}

fn expect_bool(value: FieldValue, op: &str) -> Result<bool, EvalIssue> {
    match value {
        FieldValue::Bool(b) => Ok(b),
        other => Err(EvalIssue::TypeMismatch {
            op: op.into(),
            expected: "bool".into(),
            found: type_name(&other).into(),
        }),
    }
}

fn expect_numbers(
    left: &FieldValue,
    right: &FieldValue,
    op: BinaryOp,
) -> Result<(f64, f64), EvalIssue> {
    match (left, right) {
        (FieldValue::Number(a), FieldValue::Number(b)) => Ok((*a, *b)),
        (FieldValue::Number(_), other) | (other, _) => Err(EvalIssue::TypeMismatch {
            op: op.to_string(),
            expected: "number".into(),
            found: type_name(other).into(),
        }),
    }
}

fn values_equal(a: &FieldValue, b: &FieldValue) -> bool {
    match (a, b) {
        (FieldValue::Number(x), FieldValue::Number(y)) => x == y,
        (FieldValue::Text(x), FieldValue::Text(y)) => x == y,
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x == y,
        _ => false,
    }
}

/// Evaluate a guard for routing. Fail-closed: any issue yields `false`.
pub fn evaluate(expr: &Expr, snapshot: &DocumentSnapshot) -> bool {
    match try_evaluate(expr, snapshot) {
        Ok(FieldValue::Bool(b)) => b,
        Ok(other) => {
            warn!(
                result = %other.display_string(),
                "Guard produced a non-boolean value, treating as false"
            );
            false
        }
        Err(issue) => {
            warn!(issue = %issue, "Guard evaluation failed, treating as false");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn snapshot() -> DocumentSnapshot {
        DocumentSnapshot::new()
            .with_field("grand_total", 7500.0)
            .with_field("priority", "High")
            .with_field("urgent", true)
            .with_field("discount", 250.0)
    }

    fn eval(source: &str, snap: &DocumentSnapshot) -> Result<FieldValue, EvalIssue> {
        let expr = Parser::parse(source).unwrap();
        try_evaluate(&expr, snap)
    }

    #[test]
    fn test_numeric_comparison() {
        let snap = snapshot();
        assert_eq!(
            eval("grand_total > 5000", &snap).unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(
            eval("grand_total <= 5000", &snap).unwrap(),
            FieldValue::Bool(false)
        );
    }

    #[test]
    fn test_string_equality() {
        let snap = snapshot();
        assert_eq!(
            eval("priority == \"High\"", &snap).unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(
            eval("priority != \"High\"", &snap).unwrap(),
            FieldValue::Bool(false)
        );
    }

    #[test]
    fn test_logical_operators() {
        let snap = snapshot();
        assert_eq!(
            eval("grand_total > 5000 and priority == \"High\"", &snap).unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(
            eval("grand_total > 10000 or urgent", &snap).unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(eval("not urgent", &snap).unwrap(), FieldValue::Bool(false));
    }

    #[test]
    fn test_short_circuit_skips_rhs_issues() {
        let snap = snapshot();
        // rhs references a missing field but lhs already decides
        assert_eq!(
            eval("urgent or no_such_field", &snap).unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(
            eval("not urgent and no_such_field", &snap).unwrap(),
            FieldValue::Bool(false)
        );
    }

    #[test]
    fn test_arithmetic() {
        let snap = snapshot();
        assert_eq!(
            eval("grand_total - discount > 7000", &snap).unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(
            eval("grand_total / 3", &snap).unwrap(),
            FieldValue::Number(2500.0)
        );
    }

    #[test]
    fn test_division_by_zero() {
        let snap = snapshot();
        assert_eq!(
            eval("grand_total / 0", &snap).unwrap_err(),
            EvalIssue::DivisionByZero
        );
    }

    #[test]
    fn test_missing_field_reported() {
        let snap = snapshot();
        assert!(matches!(
            eval("supplier_rating > 3", &snap).unwrap_err(),
            EvalIssue::MissingField(f) if f == "supplier_rating"
        ));
    }

    #[test]
    fn test_type_mismatch_reported() {
        let snap = snapshot();
        assert!(matches!(
            eval("priority > 5", &snap).unwrap_err(),
            EvalIssue::TypeMismatch { .. }
        ));
        assert!(matches!(
            eval("grand_total == \"High\"", &snap).unwrap_err(),
            EvalIssue::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_in_list() {
        let snap = snapshot();
        assert_eq!(
            eval("priority in [\"High\", \"Urgent\"]", &snap).unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(
            eval("priority in [\"Low\", \"Medium\"]", &snap).unwrap(),
            FieldValue::Bool(false)
        );
    }

    #[test]
    fn test_in_list_type_mismatch() {
        let snap = snapshot();
        assert!(matches!(
            eval("priority in [1, 2]", &snap).unwrap_err(),
            EvalIssue::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_fail_closed_evaluate() {
        let snap = snapshot();

        let missing = Parser::parse("no_such_field > 10").unwrap();
        assert!(!evaluate(&missing, &snap));

        let mismatch = Parser::parse("priority > 10").unwrap();
        assert!(!evaluate(&mismatch, &snap));

        let non_boolean = Parser::parse("grand_total + 1").unwrap();
        assert!(!evaluate(&non_boolean, &snap));

        let ok = Parser::parse("grand_total > 5000").unwrap();
        assert!(evaluate(&ok, &snap));
    }

    #[test]
    fn test_unary_negation() {
        let snap = snapshot();
        assert_eq!(
            eval("-discount < 0", &snap).unwrap(),
            FieldValue::Bool(true)
        );
    }
}
