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

//! Declared value types of data elements and attributes, and the value kinds
//! the compiler reasons about

use super::value::ExpressionValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared value type of a data element or tracked entity attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    /// Short text
    Text,
    /// Long text
    LongText,
    /// Multiple selected options
    MultiText,
    /// Single letter
    Letter,
    /// Phone number
    PhoneNumber,
    /// Email address
    Email,
    /// Yes / no
    Boolean,
    /// Yes only
    TrueOnly,
    /// Calendar date
    Date,
    /// Date and time
    Datetime,
    /// Time of day
    Time,
    /// Decimal number
    Number,
    /// Decimal between 0 and 1
    UnitInterval,
    /// Decimal between 0 and 100
    Percentage,
    /// Integer
    Integer,
    /// Positive integer
    IntegerPositive,
    /// Negative integer
    IntegerNegative,
    /// Zero or positive integer
    IntegerZeroOrPositive,
    /// Reference to a tracked entity
    TrackerAssociate,
    /// User name
    Username,
    /// Point coordinate as `[lng, lat]`
    Coordinate,
    /// Organisation unit uid
    OrganisationUnit,
    /// Reference value
    Reference,
    /// Age, stored as a birth date
    Age,
    /// URL
    Url,
    /// File resource uid
    File,
    /// Image resource uid
    Image,
    /// GeoJSON geometry
    #[serde(rename = "GEOJSON")]
    GeoJson,
}

impl ValueType {
    /// Decimal types
    pub fn is_decimal(self) -> bool {
        matches!(self, Self::Number | Self::UnitInterval | Self::Percentage)
    }

    /// Integer types
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::IntegerPositive
                | Self::IntegerNegative
                | Self::IntegerZeroOrPositive
        )
    }

    /// Decimal or integer types
    pub fn is_numeric(self) -> bool {
        self.is_decimal() || self.is_integer()
    }

    /// Boolean types
    pub fn is_boolean(self) -> bool {
        matches!(self, Self::Boolean | Self::TrueOnly)
    }

    /// Date types; age is stored as a date
    pub fn is_date(self) -> bool {
        matches!(self, Self::Date | Self::Datetime | Self::Age)
    }

    /// Geometry types
    pub fn is_geo(self) -> bool {
        matches!(self, Self::Coordinate | Self::GeoJson)
    }

    /// Organisation unit reference
    pub fn is_organisation_unit(self) -> bool {
        matches!(self, Self::OrganisationUnit)
    }

    /// Kind of values of this type inside expressions
    pub fn kind(self) -> ValueKind {
        if self.is_numeric() {
            ValueKind::Number
        } else if self.is_boolean() {
            ValueKind::Boolean
        } else if self.is_date() {
            ValueKind::Date
        } else {
            ValueKind::Text
        }
    }
}

/// Kind of an expression value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Integer or decimal number
    Number,
    /// Boolean
    Boolean,
    /// Text
    Text,
    /// Date
    Date,
}

impl ValueKind {
    /// Type name used in error messages
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Text => "Text",
            Self::Date => "Date",
        }
    }

    /// Typed stand-in used when describing and for null replacement
    pub fn default_value(self) -> ExpressionValue {
        match self {
            Self::Number => ExpressionValue::Number(0.0),
            Self::Boolean => ExpressionValue::Boolean(false),
            Self::Text => ExpressionValue::String(String::new()),
            Self::Date => ExpressionValue::Date(NaiveDate::default()),
        }
    }

    /// Whether a value of kind `other` is acceptable where `self` is expected
    ///
    /// Text is accepted for dates so that `'2024-01-01'` literals work as dates.
    pub fn accepts(self, other: ValueKind) -> bool {
        self == other || (self == Self::Date && other == Self::Text)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_groups() {
        assert!(ValueType::Percentage.is_decimal());
        assert!(ValueType::IntegerZeroOrPositive.is_integer());
        assert!(ValueType::TrueOnly.is_boolean());
        assert!(ValueType::Age.is_date());
        assert!(!ValueType::Time.is_date());
        assert!(ValueType::Coordinate.is_geo());
        assert_eq!(ValueType::Email.kind(), ValueKind::Text);
        assert_eq!(ValueType::Integer.kind(), ValueKind::Number);
    }

    #[test]
    fn test_serde_names() {
        let parsed: ValueType = serde_json::from_str("\"INTEGER_ZERO_OR_POSITIVE\"").unwrap();
        assert_eq!(parsed, ValueType::IntegerZeroOrPositive);
        let parsed: ValueType = serde_json::from_str("\"DATETIME\"").unwrap();
        assert_eq!(parsed, ValueType::Datetime);
    }

    #[test]
    fn test_default_values() {
        assert_eq!(ValueKind::Number.default_value(), ExpressionValue::Number(0.0));
        assert_eq!(
            ValueKind::Date.default_value(),
            ExpressionValue::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
        );
    }
}
