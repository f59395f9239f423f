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

//! d2:condition() function - conditional value with the condition as text

use crate::ast::ExpressionNode;
use crate::error::{ExpressionError, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ValueKind};
use crate::registry::function::{ExpressionFunction, describe_arguments};
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};

/// d2:condition() function
pub struct ConditionFunction;

impl ConditionFunction {
    fn condition(
        &self,
        args: &[ExpressionNode],
        compiler: &ExpressionCompiler<'_>,
    ) -> Result<ExpressionNode> {
        let text = args
            .first()
            .and_then(ExpressionNode::as_string_literal)
            .ok_or_else(|| self.arity_error(args.len()))?;
        compiler.parse_nested(text)
    }
}

impl ExpressionFunction for ConditionFunction {
    fn name(&self) -> &str {
        "d2:condition"
    }

    fn human_friendly_name(&self) -> &str {
        "Condition"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::new(
                "d2:condition",
                vec![
                    ParameterInfo::required("condition", ParameterKind::StringLiteral),
                    ParameterInfo::required("trueValue", ParameterKind::Any),
                    ParameterInfo::required("falseValue", ParameterKind::Any),
                ],
                None,
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Evaluates the boolean expression given as text; returns the second argument when it is true, otherwise the third."
    }

    fn evaluate(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let [_, when_true, when_false] = args else {
            return Err(self.arity_error(args.len()));
        };
        let condition = self.condition(args, compiler)?;
        match compiler.visit_value(&condition)? {
            ExpressionValue::Boolean(true) => compiler.visit_value(when_true),
            ExpressionValue::Boolean(false) | ExpressionValue::Null => {
                compiler.visit_value(when_false)
            }
            other => Err(ExpressionError::type_mismatch(
                ValueKind::Boolean.type_name(),
                other.type_name(),
                "condition of d2:condition",
            )),
        }
    }

    fn describe(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let condition = self.condition(args, compiler)?;
        let tested = compiler.visit_value(&condition)?;
        if let Some(kind) = tested.kind().filter(|kind| *kind != ValueKind::Boolean) {
            return Err(ExpressionError::type_mismatch(
                ValueKind::Boolean.type_name(),
                kind.type_name(),
                "condition of d2:condition",
            ));
        }
        let values = describe_arguments(self.signature(), args, compiler)?;
        Ok(values
            .into_iter()
            .skip(1)
            .find(|value| !value.is_null())
            .unwrap_or(ExpressionValue::Null))
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let [_, when_true, when_false] = args else {
            return Err(self.arity_error(args.len()));
        };
        let condition = self.condition(args, compiler)?;
        Ok(format!(
            "case when ({}) then {} else {} end",
            compiler.visit_sql(&condition)?,
            compiler.visit_sql(when_true)?,
            compiler.visit_sql(when_false)?
        ))
    }
}
