//! Binary and unary operators on evaluated values
//!
//! `and`/`or` short-circuit and are handled by the evaluator.

use crate::compiler::frontend::ast::{BinaryOp, UnaryOp};
use crate::compiler::value::{SassNumber, SassString, Value};
use crate::error::{ExtractError, Result};
use std::cmp::Ordering;

pub fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match op {
        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
        BinaryOp::Less => compare(&left, &right, op, |o| o == Ordering::Less),
        BinaryOp::LessEqual => compare(&left, &right, op, |o| o != Ordering::Greater),
        BinaryOp::Greater => compare(&left, &right, op, |o| o == Ordering::Greater),
        BinaryOp::GreaterEqual => compare(&left, &right, op, |o| o != Ordering::Less),
        BinaryOp::Plus => plus(left, right),
        BinaryOp::Minus => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.minus(b)?)),
            (Value::Color(_), _) | (_, Value::Color(_)) => Err(undefined(op, &left, &right)),
            _ => Ok(Value::unquoted(format!("{}-{}", left, right))),
        },
        BinaryOp::Times => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.times(b))),
            _ => Err(undefined(op, &left, &right)),
        },
        BinaryOp::Divide => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.divided_by(b))),
            (Value::Color(_), _) | (_, Value::Color(_)) => Err(undefined(op, &left, &right)),
            _ => Ok(Value::unquoted(format!("{}/{}", left, right))),
        },
        BinaryOp::Modulo => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.modulo(b)?)),
            _ => Err(undefined(op, &left, &right)),
        },
        BinaryOp::And => Ok(if left.is_truthy() { right } else { left }),
        BinaryOp::Or => Ok(if left.is_truthy() { left } else { right }),
    }
}

pub fn unary(op: UnaryOp, operand: Value) -> Result<Value> {
    match (op, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Minus, Value::Number(n)) => Ok(Value::Number(SassNumber {
            value: -n.value,
            ..n
        })),
        (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(n)),
        (UnaryOp::Minus, other) => Ok(Value::unquoted(format!("-{}", other))),
        (UnaryOp::Plus, other) => Ok(Value::unquoted(format!("+{}", other))),
    }
}

fn plus(left: Value, right: Value) -> Result<Value> {
    match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.plus(b)?)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(SassString {
            text: format!("{}{}", a.text, b.text),
            quoted: a.quoted,
        })),
        (Value::String(a), other) => Ok(Value::String(SassString {
            text: format!("{}{}", a.text, other),
            quoted: a.quoted,
        })),
        (other, Value::String(b)) => Ok(Value::String(SassString {
            text: format!("{}{}", other, b.text),
            quoted: b.quoted,
        })),
        (Value::Color(_), _) | (_, Value::Color(_)) => Err(undefined(BinaryOp::Plus, &left, &right)),
        _ => Ok(Value::unquoted(format!("{}{}", left, right))),
    }
}

fn compare<F>(left: &Value, right: &Value, op: BinaryOp, accept: F) -> Result<Value>
where
    F: Fn(Ordering) -> bool,
{
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(accept(a.compare(b)?))),
        _ => Err(undefined(op, left, right)),
    }
}

fn undefined(op: BinaryOp, left: &Value, right: &Value) -> ExtractError {
    ExtractError::eval(format!("Undefined operation \"{} {} {}\".", left, op.symbol(), right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::value::SassColor;

    fn px(value: f64) -> Value {
        Value::number_with_unit(value, "px")
    }

    #[test]
    fn test_arithmetic_with_units() {
        assert_eq!(binary(BinaryOp::Plus, px(10.0), px(5.0)).unwrap(), px(15.0));
        assert_eq!(binary(BinaryOp::Times, px(10.0), Value::number(2.0)).unwrap(), px(20.0));
        assert_eq!(binary(BinaryOp::Divide, px(10.0), px(5.0)).unwrap(), Value::number(2.0));
        assert_eq!(
            binary(BinaryOp::Plus, Value::number_with_unit(1.0, "in"), px(4.0)).unwrap(),
            Value::number_with_unit(1.0 + 4.0 / 96.0, "in")
        );
        assert!(binary(BinaryOp::Plus, px(1.0), Value::number_with_unit(1.0, "s")).is_err());
    }

    #[test]
    fn test_string_concatenation() {
        let joined = binary(BinaryOp::Plus, Value::quoted("foo"), Value::unquoted("bar")).unwrap();
        assert_eq!(joined.to_string(), "\"foobar\"");

        let joined = binary(BinaryOp::Plus, Value::unquoted("foo"), Value::quoted("bar")).unwrap();
        assert_eq!(joined.to_string(), "foobar");

        let joined = binary(BinaryOp::Plus, Value::number(1.0), Value::quoted("x")).unwrap();
        assert_eq!(joined.to_string(), "\"1x\"");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(binary(BinaryOp::Less, px(1.0), px(2.0)).unwrap(), Value::Bool(true));
        assert_eq!(binary(BinaryOp::GreaterEqual, px(2.0), px(2.0)).unwrap(), Value::Bool(true));
        assert!(binary(BinaryOp::Less, Value::quoted("a"), px(2.0)).is_err());
        assert_eq!(binary(BinaryOp::Equal, px(1.0), px(1.0)).unwrap(), Value::Bool(true));
        assert_eq!(binary(BinaryOp::NotEqual, px(1.0), Value::number(1.0)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_colors_reject_arithmetic() {
        let black = Value::Color(SassColor::rgb(0, 0, 0));
        assert!(binary(BinaryOp::Plus, black.clone(), Value::number(1.0)).is_err());
        assert!(binary(BinaryOp::Minus, black, Value::number(1.0)).is_err());
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnaryOp::Minus, px(3.0)).unwrap(), px(-3.0));
        assert_eq!(unary(UnaryOp::Not, Value::Null).unwrap(), Value::Bool(true));
        assert_eq!(unary(UnaryOp::Minus, Value::unquoted("foo")).unwrap().to_string(), "-foo");
    }

    #[test]
    fn test_slash_between_strings() {
        let value = binary(BinaryOp::Divide, Value::unquoted("a"), Value::unquoted("b")).unwrap();
        assert_eq!(value.to_string(), "a/b");
    }
}
