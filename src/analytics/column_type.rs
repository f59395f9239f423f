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

//! Mapping of declared value types to analytics column types and select clauses

use crate::model::ValueType;
use crate::sql::StatementBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column type of an analytics table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnDataType {
    /// Double precision number
    Double,
    /// 64-bit integer
    BigInt,
    /// 32-bit integer, used for booleans as 1 / 0
    Integer,
    /// Timestamp
    Timestamp,
    /// PostGIS point in EPSG:4326
    GeometryPoint,
    /// Text
    Text,
}

impl ColumnDataType {
    /// SQL type name
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Double => "double precision",
            Self::BigInt => "bigint",
            Self::Integer => "integer",
            Self::Timestamp => "timestamp",
            Self::GeometryPoint => "geometry(Point, 4326)",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for ColumnDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type())
    }
}

/// Capabilities of the analytics database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    /// PostGIS is installed
    pub spatial_support: bool,
}

/// Maps value types to column types and select clauses
#[derive(Clone, Copy)]
pub struct ValueTypeSqlMapper<'a> {
    statement_builder: &'a dyn StatementBuilder,
    database: DatabaseInfo,
}

impl<'a> ValueTypeSqlMapper<'a> {
    /// Create a mapper for a dialect and database
    pub fn new(statement_builder: &'a dyn StatementBuilder, database: DatabaseInfo) -> Self {
        Self {
            statement_builder,
            database,
        }
    }

    fn is_spatial(&self, value_type: ValueType) -> bool {
        value_type.is_geo() && self.database.spatial_support
    }

    /// Column type for values of `value_type`
    pub fn column_type(&self, value_type: ValueType) -> ColumnDataType {
        if value_type.is_decimal() {
            ColumnDataType::Double
        } else if value_type.is_integer() {
            ColumnDataType::BigInt
        } else if value_type.is_boolean() {
            ColumnDataType::Integer
        } else if value_type.is_date() {
            ColumnDataType::Timestamp
        } else if self.is_spatial(value_type) {
            ColumnDataType::GeometryPoint
        } else {
            ColumnDataType::Text
        }
    }

    /// Select expression reading `column` as the column type of `value_type`
    pub fn select_clause(&self, value_type: ValueType, column: &str) -> String {
        if value_type.is_decimal() {
            format!(
                "cast({column} as {})",
                self.statement_builder.double_column_type()
            )
        } else if value_type.is_integer() {
            format!("cast({column} as bigint)")
        } else if value_type.is_boolean() {
            format!(
                "case when {column} = 'true' then 1 when {column} = 'false' then 0 else null end"
            )
        } else if value_type.is_date() {
            format!("cast({column} as timestamp)")
        } else if self.is_spatial(value_type) {
            format!(
                "ST_GeomFromGeoJSON('{{\"type\":\"Point\", \"coordinates\":' || ({column}) || ', \
                 \"crs\":{{\"type\":\"name\", \"properties\":{{\"name\":\"EPSG:4326\"}}}}}}')"
            )
        } else if value_type.is_organisation_unit() {
            format!("(select ou.name from organisationunit ou where ou.uid = {column})")
        } else {
            column.to_string()
        }
    }
}

impl fmt::Debug for ValueTypeSqlMapper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTypeSqlMapper")
            .field("database", &self.database)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PostgreSqlStatementBuilder;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn mapper(spatial_support: bool) -> ValueTypeSqlMapper<'static> {
        ValueTypeSqlMapper::new(&PostgreSqlStatementBuilder, DatabaseInfo { spatial_support })
    }

    #[rstest]
    #[case(ValueType::Number, ColumnDataType::Double)]
    #[case(ValueType::Percentage, ColumnDataType::Double)]
    #[case(ValueType::Integer, ColumnDataType::BigInt)]
    #[case(ValueType::IntegerZeroOrPositive, ColumnDataType::BigInt)]
    #[case(ValueType::TrueOnly, ColumnDataType::Integer)]
    #[case(ValueType::Age, ColumnDataType::Timestamp)]
    #[case(ValueType::Coordinate, ColumnDataType::GeometryPoint)]
    #[case(ValueType::OrganisationUnit, ColumnDataType::Text)]
    #[case(ValueType::Email, ColumnDataType::Text)]
    fn test_column_type(#[case] value_type: ValueType, #[case] expected: ColumnDataType) {
        assert_eq!(mapper(true).column_type(value_type), expected);
    }

    #[test]
    fn test_geo_without_spatial_support_is_text() {
        let mapper = mapper(false);
        assert_eq!(mapper.column_type(ValueType::Coordinate), ColumnDataType::Text);
        assert_eq!(mapper.select_clause(ValueType::Coordinate, "geo"), "geo");
    }

    #[rstest]
    #[case(ValueType::Number, "cast(x as double precision)")]
    #[case(ValueType::Integer, "cast(x as bigint)")]
    #[case(
        ValueType::Boolean,
        "case when x = 'true' then 1 when x = 'false' then 0 else null end"
    )]
    #[case(ValueType::Date, "cast(x as timestamp)")]
    #[case(
        ValueType::OrganisationUnit,
        "(select ou.name from organisationunit ou where ou.uid = x)"
    )]
    #[case(ValueType::Text, "x")]
    fn test_select_clause(#[case] value_type: ValueType, #[case] expected: &str) {
        assert_eq!(mapper(false).select_clause(value_type, "x"), expected);
    }

    #[test]
    fn test_spatial_select_clause() {
        assert_eq!(
            mapper(true).select_clause(ValueType::Coordinate, "c"),
            "ST_GeomFromGeoJSON('{\"type\":\"Point\", \"coordinates\":' || (c) || ', \
             \"crs\":{\"type\":\"name\", \"properties\":{\"name\":\"EPSG:4326\"}}}')"
        );
    }
}
