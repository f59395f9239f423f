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

//! d2:oizp() function

use crate::ast::ExpressionNode;
use crate::error::{ExpressionError, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ValueKind};
use crate::registry::function::ExpressionFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};

/// d2:oizp() function - one if zero or positive, otherwise zero
pub struct OizpFunction;

impl ExpressionFunction for OizpFunction {
    fn name(&self) -> &str {
        "d2:oizp"
    }

    fn human_friendly_name(&self) -> &str {
        "One If Zero Or Positive"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::new(
                "d2:oizp",
                vec![ParameterInfo::required(
                    "value",
                    ParameterKind::Value(ValueKind::Number),
                )],
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
        let [arg] = args else {
            return Err(self.arity_error(args.len()));
        };
        let result = match compiler.visit_value(arg)? {
            ExpressionValue::Null => 0.0,
            ExpressionValue::Number(n) if n >= 0.0 => 1.0,
            ExpressionValue::Number(_) => 0.0,
            other => {
                return Err(ExpressionError::type_mismatch(
                    ValueKind::Number.type_name(),
                    other.type_name(),
                    "argument of d2:oizp",
                ));
            }
        };
        Ok(ExpressionValue::Number(result))
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let [arg] = args else {
            return Err(self.arity_error(args.len()));
        };
        Ok(format!(
            "coalesce(case when {} >= 0 then 1 else 0 end, 0)",
            compiler.visit_sql(arg)?
        ))
    }
}
