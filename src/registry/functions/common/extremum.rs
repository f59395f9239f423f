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

//! greatest() and least() functions
//!
//! Null arguments are skipped, as in SQL.

use super::common_kind;
use crate::ast::{BinaryOperator, ExpressionNode};
use crate::error::Result;
use crate::evaluator::ExpressionCompiler;
use crate::evaluator::operators::compare_values;
use crate::model::ExpressionValue;
use crate::registry::function::{ExpressionFunction, describe_arguments};
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};
use std::cmp::Ordering;

fn extremum(
    args: &[ExpressionNode],
    compiler: &mut ExpressionCompiler<'_>,
    keep: Ordering,
) -> Result<ExpressionValue> {
    let mut best = ExpressionValue::Null;
    for arg in args {
        let value = compiler.visit_value(arg)?;
        if value.is_null() {
            continue;
        }
        if best.is_null() || compare_values(BinaryOperator::GreaterThan, &value, &best)? == keep {
            best = value;
        }
    }
    Ok(best)
}

fn sql_call(
    sql_name: &str,
    args: &[ExpressionNode],
    compiler: &mut ExpressionCompiler<'_>,
) -> Result<String> {
    let sql = args
        .iter()
        .map(|arg| compiler.visit_sql(arg))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("{sql_name}({})", sql.join(",")))
}

/// greatest() function - largest non-null argument
pub struct GreatestFunction;

impl ExpressionFunction for GreatestFunction {
    fn name(&self) -> &str {
        "greatest"
    }

    fn human_friendly_name(&self) -> &str {
        "Greatest"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::variadic(
                "greatest",
                vec![ParameterInfo::required("value", ParameterKind::Any)],
                None,
            )
        });
        &SIG
    }

    fn evaluate(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        extremum(args, compiler, Ordering::Greater)
    }

    fn describe(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let values = describe_arguments(self.signature(), args, compiler)?;
        common_kind(self.name(), &values)
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        sql_call("greatest", args, compiler)
    }
}

/// least() function - smallest non-null argument
pub struct LeastFunction;

impl ExpressionFunction for LeastFunction {
    fn name(&self) -> &str {
        "least"
    }

    fn human_friendly_name(&self) -> &str {
        "Least"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::variadic(
                "least",
                vec![ParameterInfo::required("value", ParameterKind::Any)],
                None,
            )
        });
        &SIG
    }

    fn evaluate(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        extremum(args, compiler, Ordering::Less)
    }

    fn describe(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let values = describe_arguments(self.signature(), args, compiler)?;
        common_kind(self.name(), &values)
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        sql_call("least", args, compiler)
    }
}
