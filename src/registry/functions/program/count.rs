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

//! d2:count(), d2:countIfValue() and d2:countIfCondition() functions
//!
//! In SQL each count is a sub-select on the program's event analytics table.

use super::{event_count_sql, stage_element};
use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue};
use crate::error::{ExpressionError, Result};
use crate::evaluator::ExpressionCompiler;
use crate::evaluator::operators::evaluate_binary;
use crate::model::{ExpressionValue, ValueKind};
use crate::registry::function::{ExpressionFunction, describe_arguments};
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};

fn stage_values(
    function_name: &str,
    arg: &ExpressionNode,
    compiler: &ExpressionCompiler<'_>,
) -> Result<Vec<ExpressionValue>> {
    let (program_stage_uid, data_element_uid) = stage_element(function_name, arg)?;
    Ok(compiler
        .context()
        .require_values()?
        .stage_element_values(program_stage_uid, data_element_uid)
        .into_iter()
        .filter(|value| !value.is_null())
        .collect())
}

/// d2:count() function - number of events with a value
pub struct CountFunction;

impl ExpressionFunction for CountFunction {
    fn name(&self) -> &str {
        "d2:count"
    }

    fn human_friendly_name(&self) -> &str {
        "Count"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::new(
                "d2:count",
                vec![ParameterInfo::required("dataElement", ParameterKind::StageElement)],
                Some(ValueKind::Number),
            )
        });
        &SIG
    }

    fn evaluate(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let [item] = args else {
            return Err(self.arity_error(args.len()));
        };
        let values = stage_values(self.name(), item, compiler)?;
        Ok(ExpressionValue::Number(values.len() as f64))
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let [item] = args else {
            return Err(self.arity_error(args.len()));
        };
        let (program_stage_uid, data_element_uid) = stage_element(self.name(), item)?;
        event_count_sql(compiler, program_stage_uid, data_element_uid, "")
    }
}

/// d2:countIfValue() function - number of events with a given value
pub struct CountIfValueFunction;

impl ExpressionFunction for CountIfValueFunction {
    fn name(&self) -> &str {
        "d2:countIfValue"
    }

    fn human_friendly_name(&self) -> &str {
        "Count If Value"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::new(
                "d2:countIfValue",
                vec![
                    ParameterInfo::required("dataElement", ParameterKind::StageElement),
                    ParameterInfo::required("value", ParameterKind::Any),
                ],
                Some(ValueKind::Number),
            )
        });
        &SIG
    }

    fn evaluate(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let [item, expected] = args else {
            return Err(self.arity_error(args.len()));
        };
        let expected = compiler.visit_value(expected)?;
        let mut count = 0;
        for value in stage_values(self.name(), item, compiler)? {
            if evaluate_binary(BinaryOperator::Equal, &value, &expected)?
                == ExpressionValue::Boolean(true)
            {
                count += 1;
            }
        }
        Ok(ExpressionValue::Number(f64::from(count)))
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let [item, expected] = args else {
            return Err(self.arity_error(args.len()));
        };
        let (program_stage_uid, data_element_uid) = stage_element(self.name(), item)?;
        let condition = format!(" = {}", compiler.visit_sql(expected)?);
        event_count_sql(compiler, program_stage_uid, data_element_uid, &condition)
    }
}

/// d2:countIfCondition() function - number of events whose value satisfies
/// a condition given as text, e.g. `'> 5'`
pub struct CountIfConditionFunction;

impl CountIfConditionFunction {
    /// Parse the condition as `0 <condition>` and split off operator and operand
    fn condition(
        &self,
        args: &[ExpressionNode],
        compiler: &ExpressionCompiler<'_>,
    ) -> Result<(BinaryOperator, ExpressionNode)> {
        let text = args
            .get(1)
            .and_then(ExpressionNode::as_string_literal)
            .ok_or_else(|| self.arity_error(args.len()))?;
        let parsed = compiler.parse_nested(&format!("0{text}"))?;
        match parsed {
            ExpressionNode::BinaryOp(data)
                if data.op.is_comparison()
                    && data.left == ExpressionNode::literal(LiteralValue::Integer(0)) =>
            {
                Ok((data.op, data.right))
            }
            _ => Err(ExpressionError::invalid_argument(
                self.name(),
                format!("'{text}' is not a comparison such as '> 5'"),
            )),
        }
    }
}

impl ExpressionFunction for CountIfConditionFunction {
    fn name(&self) -> &str {
        "d2:countIfCondition"
    }

    fn human_friendly_name(&self) -> &str {
        "Count If Condition"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::new(
                "d2:countIfCondition",
                vec![
                    ParameterInfo::required("dataElement", ParameterKind::StageElement),
                    ParameterInfo::required("condition", ParameterKind::StringLiteral),
                ],
                Some(ValueKind::Number),
            )
        });
        &SIG
    }

    fn evaluate(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let (op, operand) = self.condition(args, compiler)?;
        let operand = compiler.visit_value(&operand)?;
        let item = args.first().ok_or_else(|| self.arity_error(args.len()))?;
        let mut count = 0;
        for value in stage_values(self.name(), item, compiler)? {
            if evaluate_binary(op, &value, &operand)? == ExpressionValue::Boolean(true) {
                count += 1;
            }
        }
        Ok(ExpressionValue::Number(f64::from(count)))
    }

    fn describe(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        describe_arguments(self.signature(), args, compiler)?;
        let (_, operand) = self.condition(args, compiler)?;
        compiler.visit_value(&operand)?;
        Ok(ValueKind::Number.default_value())
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let (op, operand) = self.condition(args, compiler)?;
        let condition = format!(" {} {}", op.sql_symbol(), compiler.visit_sql(&operand)?);
        let item = args.first().ok_or_else(|| self.arity_error(args.len()))?;
        let (program_stage_uid, data_element_uid) = stage_element(self.name(), item)?;
        event_count_sql(compiler, program_stage_uid, data_element_uid, &condition)
    }
}
