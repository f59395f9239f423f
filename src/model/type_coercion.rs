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

//! Casting of a compiled root value into the type the caller expects

use super::value::ExpressionValue;
use crate::error::{ExpressionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type a caller expects from an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultType {
    /// Numerator or denominator
    Double,
    /// Filter
    Boolean,
    /// Free text
    Text,
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Double => "Double",
            Self::Boolean => "Boolean",
            Self::Text => "Text",
        };
        f.write_str(name)
    }
}

/// Strict type coercion
///
/// There is no conversion between numbers, booleans and text. Null satisfies
/// every expected type.
pub struct TypeCoercion;

impl TypeCoercion {
    /// Check `value` against `expected`; no expectation accepts anything
    pub fn coerce(value: ExpressionValue, expected: Option<ResultType>) -> Result<ExpressionValue> {
        let Some(expected) = expected else {
            return Ok(value);
        };

        let accepted = match (&value, expected) {
            (ExpressionValue::Null, _) => true,
            (ExpressionValue::Number(_), ResultType::Double) => true,
            (ExpressionValue::Boolean(_), ResultType::Boolean) => true,
            (ExpressionValue::String(_) | ExpressionValue::Date(_), ResultType::Text) => true,
            _ => false,
        };

        if accepted {
            Ok(value)
        } else {
            Err(ExpressionError::type_mismatch(
                expected.to_string(),
                value.type_name(),
                "expression result",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_types_pass() {
        assert_eq!(
            TypeCoercion::coerce(ExpressionValue::Number(2.0), Some(ResultType::Double)).unwrap(),
            ExpressionValue::Number(2.0)
        );
        assert!(
            TypeCoercion::coerce(ExpressionValue::Boolean(true), Some(ResultType::Boolean)).is_ok()
        );
        assert!(TypeCoercion::coerce(ExpressionValue::from("x"), None).is_ok());
    }

    #[test]
    fn test_null_satisfies_everything() {
        for expected in [ResultType::Double, ResultType::Boolean, ResultType::Text] {
            assert!(TypeCoercion::coerce(ExpressionValue::Null, Some(expected)).is_ok());
        }
    }

    #[test]
    fn test_no_cross_conversion() {
        let err = TypeCoercion::coerce(ExpressionValue::Number(1.0), Some(ResultType::Boolean))
            .unwrap_err();
        assert!(matches!(err, ExpressionError::TypeMismatch { .. }));
        assert!(
            TypeCoercion::coerce(ExpressionValue::from("3"), Some(ResultType::Double)).is_err()
        );
        assert!(
            TypeCoercion::coerce(ExpressionValue::Boolean(true), Some(ResultType::Double)).is_err()
        );
    }
}
