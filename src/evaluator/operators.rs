// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Operator semantics for evaluate and describe modes
//!
//! Null propagates through arithmetic and comparisons. `and` / `or` use
//! three-valued logic. Division or modulo by zero yields null.

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::error::{ExpressionError, Result};
use crate::model::{ExpressionValue, ValueKind};
use std::cmp::Ordering;

/// Apply a binary operator to two values
pub fn evaluate_binary(
    op: BinaryOperator,
    left: &ExpressionValue,
    right: &ExpressionValue,
) -> Result<ExpressionValue> {
    if op.is_logical() {
        let l = logical_operand(op, left)?;
        let r = logical_operand(op, right)?;
        let result = match (op, l, r) {
            (BinaryOperator::And, Some(false), _) | (BinaryOperator::And, _, Some(false)) => {
                Some(false)
            }
            (BinaryOperator::Or, Some(true), _) | (BinaryOperator::Or, _, Some(true)) => {
                Some(true)
            }
            (BinaryOperator::And, Some(true), Some(true)) => Some(true),
            (BinaryOperator::Or, Some(false), Some(false)) => Some(false),
            _ => None,
        };
        return Ok(result.map_or(ExpressionValue::Null, ExpressionValue::Boolean));
    }

    if left.is_null() || right.is_null() {
        return Ok(ExpressionValue::Null);
    }

    if op.is_arithmetic() {
        let (Some(l), Some(r)) = (left.as_number(), right.as_number()) else {
            let offender = if left.as_number().is_none() { left } else { right };
            return Err(ExpressionError::type_mismatch(
                ValueKind::Number.type_name(),
                offender.type_name(),
                format!("operator '{op}'"),
            ));
        };
        let value = match op {
            BinaryOperator::Add => l + r,
            BinaryOperator::Subtract => l - r,
            BinaryOperator::Multiply => l * r,
            BinaryOperator::Divide if r == 0.0 => return Ok(ExpressionValue::Null),
            BinaryOperator::Divide => l / r,
            BinaryOperator::Modulo if r == 0.0 => return Ok(ExpressionValue::Null),
            BinaryOperator::Modulo => l % r,
            _ => l.powf(r),
        };
        return Ok(ExpressionValue::Number(value));
    }

    let ordering = compare_values(op, left, right)?;
    let result = match op {
        BinaryOperator::Equal => ordering == Ordering::Equal,
        BinaryOperator::NotEqual => ordering != Ordering::Equal,
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(ExpressionValue::Boolean(result))
}

fn logical_operand(op: BinaryOperator, value: &ExpressionValue) -> Result<Option<bool>> {
    match value {
        ExpressionValue::Null => Ok(None),
        ExpressionValue::Boolean(b) => Ok(Some(*b)),
        other => Err(ExpressionError::type_mismatch(
            ValueKind::Boolean.type_name(),
            other.type_name(),
            format!("operator '{op}'"),
        )),
    }
}

/// Order two non-null values of comparable kinds
///
/// Dates compare with `YYYY-MM-DD` text.
pub fn compare_values(
    op: BinaryOperator,
    left: &ExpressionValue,
    right: &ExpressionValue,
) -> Result<Ordering> {
    let mismatch = || {
        ExpressionError::type_mismatch(
            left.type_name(),
            right.type_name(),
            format!("operator '{op}'"),
        )
    };
    match (left, right) {
        (ExpressionValue::Number(l), ExpressionValue::Number(r)) => {
            Ok(l.partial_cmp(r).unwrap_or(Ordering::Equal))
        }
        (ExpressionValue::Boolean(l), ExpressionValue::Boolean(r)) => Ok(l.cmp(r)),
        (ExpressionValue::String(l), ExpressionValue::String(r)) => Ok(l.cmp(r)),
        (ExpressionValue::Date(_), _) | (_, ExpressionValue::Date(_)) => {
            match (left.as_date(), right.as_date()) {
                (Some(l), Some(r)) => Ok(l.cmp(&r)),
                _ => Err(mismatch()),
            }
        }
        _ => Err(mismatch()),
    }
}

/// Apply a unary operator
pub fn evaluate_unary(op: UnaryOperator, operand: &ExpressionValue) -> Result<ExpressionValue> {
    match (op, operand) {
        (_, ExpressionValue::Null) => Ok(ExpressionValue::Null),
        (UnaryOperator::Negate, ExpressionValue::Number(n)) => Ok(ExpressionValue::Number(-n)),
        (UnaryOperator::Positive, ExpressionValue::Number(n)) => Ok(ExpressionValue::Number(*n)),
        (UnaryOperator::Not, ExpressionValue::Boolean(b)) => Ok(ExpressionValue::Boolean(!b)),
        (UnaryOperator::Not, other) => Err(ExpressionError::type_mismatch(
            ValueKind::Boolean.type_name(),
            other.type_name(),
            format!("operator '{op}'"),
        )),
        (_, other) => Err(ExpressionError::type_mismatch(
            ValueKind::Number.type_name(),
            other.type_name(),
            format!("operator '{op}'"),
        )),
    }
}

/// Test `low <= value <= high`
pub fn evaluate_between(
    value: &ExpressionValue,
    low: &ExpressionValue,
    high: &ExpressionValue,
) -> Result<ExpressionValue> {
    if value.is_null() || low.is_null() || high.is_null() {
        return Ok(ExpressionValue::Null);
    }
    let above = compare_values(BinaryOperator::GreaterThanOrEqual, value, low)? != Ordering::Less;
    let below = compare_values(BinaryOperator::LessThanOrEqual, value, high)? != Ordering::Greater;
    Ok(ExpressionValue::Boolean(above && below))
}

/// Test membership of `value` in `list`; null entries never match
pub fn evaluate_in(value: &ExpressionValue, list: &[ExpressionValue]) -> Result<ExpressionValue> {
    if value.is_null() {
        return Ok(ExpressionValue::Null);
    }
    for candidate in list.iter().filter(|c| !c.is_null()) {
        if compare_values(BinaryOperator::Equal, value, candidate)? == Ordering::Equal {
            return Ok(ExpressionValue::Boolean(true));
        }
    }
    Ok(ExpressionValue::Boolean(false))
}

/// Type-check a binary operator and return a typed stand-in
pub fn describe_binary(
    op: BinaryOperator,
    left: &ExpressionValue,
    right: &ExpressionValue,
) -> Result<ExpressionValue> {
    let context = format!("operator '{op}'");
    if op.is_arithmetic() {
        expect_kind(ValueKind::Number, left, &context)?;
        expect_kind(ValueKind::Number, right, &context)?;
        return Ok(ValueKind::Number.default_value());
    }
    if op.is_logical() {
        expect_kind(ValueKind::Boolean, left, &context)?;
        expect_kind(ValueKind::Boolean, right, &context)?;
        return Ok(ValueKind::Boolean.default_value());
    }
    expect_comparable(left, right, &context)?;
    Ok(ValueKind::Boolean.default_value())
}

/// Type-check a unary operator and return a typed stand-in
pub fn describe_unary(op: UnaryOperator, operand: &ExpressionValue) -> Result<ExpressionValue> {
    let kind = match op {
        UnaryOperator::Not => ValueKind::Boolean,
        UnaryOperator::Negate | UnaryOperator::Positive => ValueKind::Number,
    };
    expect_kind(kind, operand, &format!("operator '{op}'"))?;
    Ok(kind.default_value())
}

/// Type-check a range test
pub fn describe_between(
    value: &ExpressionValue,
    low: &ExpressionValue,
    high: &ExpressionValue,
) -> Result<ExpressionValue> {
    expect_comparable(value, low, "between")?;
    expect_comparable(value, high, "between")?;
    Ok(ValueKind::Boolean.default_value())
}

/// Type-check a membership test
pub fn describe_in(value: &ExpressionValue, list: &[ExpressionValue]) -> Result<ExpressionValue> {
    for candidate in list {
        expect_comparable(value, candidate, "in")?;
    }
    Ok(ValueKind::Boolean.default_value())
}

fn expect_kind(expected: ValueKind, value: &ExpressionValue, context: &str) -> Result<()> {
    match value.kind() {
        Some(actual) if !expected.accepts(actual) => Err(ExpressionError::type_mismatch(
            expected.type_name(),
            actual.type_name(),
            context,
        )),
        _ => Ok(()),
    }
}

fn expect_comparable(left: &ExpressionValue, right: &ExpressionValue, context: &str) -> Result<()> {
    match (left.kind(), right.kind()) {
        (Some(l), Some(r)) if !l.accepts(r) && !r.accepts(l) => Err(
            ExpressionError::type_mismatch(l.type_name(), r.type_name(), context),
        ),
        _ => Ok(()),
    }
}
