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

//! d2:daysBetween() and related date difference functions

use crate::ast::ExpressionNode;
use crate::error::{ExpressionError, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ValueKind};
use crate::registry::function::ExpressionFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};
use crate::sql::DateUnit;
use chrono::{Datelike, NaiveDate};

/// Whole units between two dates, truncated toward zero
pub fn units_between(start: NaiveDate, end: NaiveDate, unit: DateUnit) -> i64 {
    let days = (end - start).num_days();
    match unit {
        DateUnit::Days => days,
        DateUnit::Weeks => days / 7,
        DateUnit::Months => months_between(start, end),
        DateUnit::Years => months_between(start, end) / 12,
        DateUnit::Minutes => days * 24 * 60,
    }
}

fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut months = i64::from(end.year() - start.year()) * 12
        + i64::from(end.month()) - i64::from(start.month());
    if months > 0 && end.day() < start.day() {
        months -= 1;
    } else if months < 0 && end.day() > start.day() {
        months += 1;
    }
    months
}

/// Date difference function for one unit
pub struct DateBetweenFunction {
    unit: DateUnit,
    signature: FunctionSignature,
}

impl DateBetweenFunction {
    /// Create the function for `unit`
    pub fn new(unit: DateUnit) -> Self {
        Self {
            unit,
            signature: FunctionSignature::new(
                Self::function_name(unit),
                vec![
                    ParameterInfo::required("startDate", ParameterKind::Value(ValueKind::Date)),
                    ParameterInfo::required("endDate", ParameterKind::Value(ValueKind::Date)),
                ],
                Some(ValueKind::Number),
            ),
        }
    }

    fn function_name(unit: DateUnit) -> &'static str {
        match unit {
            DateUnit::Days => "d2:daysBetween",
            DateUnit::Weeks => "d2:weeksBetween",
            DateUnit::Months => "d2:monthsBetween",
            DateUnit::Years => "d2:yearsBetween",
            DateUnit::Minutes => "d2:minutesBetween",
        }
    }

    fn date_argument(&self, value: ExpressionValue) -> Result<Option<NaiveDate>> {
        if value.is_null() {
            return Ok(None);
        }
        value.as_date().map(Some).ok_or_else(|| {
            ExpressionError::type_mismatch(
                ValueKind::Date.type_name(),
                value.type_name(),
                format!("argument of {}", self.name()),
            )
        })
    }
}

impl ExpressionFunction for DateBetweenFunction {
    fn name(&self) -> &str {
        Self::function_name(self.unit)
    }

    fn human_friendly_name(&self) -> &str {
        match self.unit {
            DateUnit::Days => "Days Between",
            DateUnit::Weeks => "Weeks Between",
            DateUnit::Months => "Months Between",
            DateUnit::Years => "Years Between",
            DateUnit::Minutes => "Minutes Between",
        }
    }

    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn evaluate(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let [start, end] = args else {
            return Err(self.arity_error(args.len()));
        };
        let start = compiler.visit_value(start)?;
        let end = compiler.visit_value(end)?;
        match (self.date_argument(start)?, self.date_argument(end)?) {
            (Some(start), Some(end)) => Ok(ExpressionValue::Number(
                units_between(start, end, self.unit) as f64,
            )),
            _ => Ok(ExpressionValue::Null),
        }
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let [start, end] = args else {
            return Err(self.arity_error(args.len()));
        };
        let start = compiler.visit_sql_raw(start)?;
        let end = compiler.visit_sql_raw(end)?;
        Ok(compiler
            .context()
            .statement_builder
            .date_difference(&start, &end, self.unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(DateUnit::Days, date(2024, 1, 1), date(2024, 3, 1), 60)]
    #[case(DateUnit::Weeks, date(2024, 1, 1), date(2024, 1, 20), 2)]
    #[case(DateUnit::Months, date(2024, 1, 31), date(2024, 2, 29), 0)]
    #[case(DateUnit::Months, date(2024, 1, 15), date(2024, 3, 15), 2)]
    #[case(DateUnit::Months, date(2024, 3, 15), date(2024, 1, 16), -1)]
    #[case(DateUnit::Years, date(2000, 6, 1), date(2024, 5, 31), 23)]
    #[case(DateUnit::Minutes, date(2024, 1, 1), date(2024, 1, 2), 1440)]
    fn test_units_between(
        #[case] unit: DateUnit,
        #[case] start: NaiveDate,
        #[case] end: NaiveDate,
        #[case] expected: i64,
    ) {
        assert_eq!(units_between(start, end, unit), expected);
    }

    #[test]
    fn test_names() {
        assert_eq!(DateBetweenFunction::new(DateUnit::Weeks).name(), "d2:weeksBetween");
        assert_eq!(
            DateBetweenFunction::new(DateUnit::Minutes).signature().max_arity,
            Some(2)
        );
    }
}
