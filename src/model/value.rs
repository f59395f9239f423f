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

//! Runtime values produced by evaluating or describing an expression

use super::types::ValueKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date format used for date literals and date strings
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single expression value
///
/// Deserializes from plain JSON: `null`, booleans, numbers, `YYYY-MM-DD`
/// strings as dates and any other string as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpressionValue {
    /// Missing value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Numeric value; integers and decimals share one representation
    Number(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Text value
    String(String),
}

impl ExpressionValue {
    /// Kind of the value, `None` for null
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(ValueKind::Boolean),
            Self::Number(_) => Some(ValueKind::Number),
            Self::Date(_) => Some(ValueKind::Date),
            Self::String(_) => Some(ValueKind::Text),
        }
    }

    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        self.kind().map_or("Null", ValueKind::type_name)
    }

    /// Check if this is the null value
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric content, if any
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean content, if any
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Date content; text in `YYYY-MM-DD` form is read as a date
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::String(s) => parse_date(s),
            _ => None,
        }
    }

    /// Text content, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Parse a `YYYY-MM-DD` date, ignoring a trailing time part
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

/// Render a number without a trailing `.0` for whole values
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

impl fmt::Display for ExpressionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ExpressionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ExpressionValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDate> for ExpressionValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<&str> for ExpressionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ExpressionValue::Null.kind(), None);
        assert_eq!(ExpressionValue::from(1.5).kind(), Some(ValueKind::Number));
        assert_eq!(ExpressionValue::from("x").type_name(), "Text");
    }

    #[test]
    fn test_display_numbers() {
        assert_eq!(ExpressionValue::Number(14.0).to_string(), "14");
        assert_eq!(ExpressionValue::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn test_deserialize_untagged() {
        let values: Vec<ExpressionValue> =
            serde_json::from_str(r#"[null, true, 3, "2024-01-31", "text"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ExpressionValue::Null,
                ExpressionValue::Boolean(true),
                ExpressionValue::Number(3.0),
                ExpressionValue::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
                ExpressionValue::String("text".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_as_date() {
        assert_eq!(
            ExpressionValue::from("2024-02-29T10:00:00").as_date(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(ExpressionValue::from("soon").as_date(), None);
    }
}
