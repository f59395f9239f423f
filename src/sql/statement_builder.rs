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

//! Database dialect hooks used while generating SQL

use crate::model::metadata::{AnalyticsPeriodBoundary, ProgramIndicator, ReportingWindow};
use crate::model::value::DATE_FORMAT;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Alias of the analytics table in generated queries
pub const ANALYTICS_TBL_ALIAS: &str = "ax";

/// Unit of a date difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateUnit {
    /// Whole days
    Days,
    /// Whole weeks
    Weeks,
    /// Whole months
    Months,
    /// Whole years
    Years,
    /// Minutes
    Minutes,
}

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL with optional PostGIS
    #[default]
    PostgreSql,
}

impl Dialect {
    /// Statement builder for this dialect
    pub fn statement_builder(self) -> &'static dyn StatementBuilder {
        match self {
            Self::PostgreSql => &PostgreSqlStatementBuilder,
        }
    }
}

/// Dialect-specific SQL fragments
pub trait StatementBuilder: Send + Sync {
    /// Quote an identifier
    fn quote(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    /// Quote a text value as a string literal
    fn encode(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Column type for double precision numbers
    fn double_column_type(&self) -> &'static str;

    /// Boolean literal
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }

    /// Date literal
    fn date_literal(&self, date: NaiveDate) -> String {
        self.encode(&date.format(DATE_FORMAT).to_string())
    }

    /// Difference between two date expressions in the given unit
    fn date_difference(&self, start: &str, end: &str, unit: DateUnit) -> String;

    /// Condition restricting a date column by a period boundary
    fn boundary_condition(
        &self,
        boundary: &AnalyticsPeriodBoundary,
        window: &ReportingWindow,
    ) -> String {
        let operator = if boundary.is_start_boundary() { ">=" } else { "<" };
        format!(
            "{} {} cast({} as date)",
            self.quote(boundary.column()),
            operator,
            self.date_literal(boundary.boundary_date(window))
        )
    }

    /// Latest non-null value of `column` from the events of the current
    /// enrollment, optionally within one program stage
    fn event_subselect(
        &self,
        column: &str,
        program_stage_uid: Option<&str>,
        indicator: &ProgramIndicator,
        window: Option<&ReportingWindow>,
    ) -> String {
        let table = indicator.event_table_name();
        let mut sql = format!(
            "(select {column} from {table} where {table}.pi = {ANALYTICS_TBL_ALIAS}.pi and {column} is not null"
        );
        if let Some(stage) = program_stage_uid {
            let _ = write!(sql, " and ps = {}", self.encode(stage));
        }
        if let Some(window) = window {
            for boundary in indicator.event_boundaries() {
                let _ = write!(sql, " and {}", self.boundary_condition(boundary, window));
            }
        }
        sql.push_str(" order by executiondate desc limit 1 )");
        sql
    }
}

/// PostgreSQL statement builder
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgreSqlStatementBuilder;

impl StatementBuilder for PostgreSqlStatementBuilder {
    fn double_column_type(&self) -> &'static str {
        "double precision"
    }

    fn date_difference(&self, start: &str, end: &str, unit: DateUnit) -> String {
        let age = format!("age(cast({end} as date), cast({start} as date))");
        match unit {
            DateUnit::Days => format!("(cast({end} as date) - cast({start} as date))"),
            DateUnit::Weeks => format!("((cast({end} as date) - cast({start} as date))/7)"),
            DateUnit::Months => format!(
                "((date_part('year',{age})) * 12 + date_part('month',{age}))"
            ),
            DateUnit::Years => format!("(date_part('year',{age}))"),
            DateUnit::Minutes => format!(
                "(extract(epoch from (cast({end} as timestamp) - cast({start} as timestamp))) / 60)"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::metadata::{AnalyticsType, BoundaryTarget, BoundaryType};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_and_encode_escape() {
        let builder = PostgreSqlStatementBuilder;
        assert_eq!(builder.quote("a\"b"), "\"a\"\"b\"");
        assert_eq!(builder.encode("O'Neil"), "'O''Neil'");
        assert_eq!(builder.boolean_literal(true), "true");
    }

    #[test]
    fn test_date_difference() {
        let builder = PostgreSqlStatementBuilder;
        assert_eq!(
            builder.date_difference("\"a\"", "\"b\"", DateUnit::Days),
            "(cast(\"b\" as date) - cast(\"a\" as date))"
        );
        assert_eq!(
            builder.date_difference("x", "y", DateUnit::Years),
            "(date_part('year',age(cast(y as date), cast(x as date))))"
        );
    }

    #[test]
    fn test_event_subselect_with_boundary() {
        let builder = PostgreSqlStatementBuilder;
        let indicator = ProgramIndicator::new("pi", "Indicator", "Prog", "1")
            .with_analytics_type(AnalyticsType::Enrollment)
            .with_boundary(AnalyticsPeriodBoundary::new(
                BoundaryTarget::EventDate,
                BoundaryType::BeforeEndOfReportingPeriod,
            ));
        let window = ReportingWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );

        assert_eq!(
            builder.event_subselect("\"de\"", Some("ps"), &indicator, Some(&window)),
            "(select \"de\" from analytics_event_prog where analytics_event_prog.pi = ax.pi \
             and \"de\" is not null and ps = 'ps' and \"executiondate\" < cast('2025-01-01' as date) \
             order by executiondate desc limit 1 )"
        );
    }
}
