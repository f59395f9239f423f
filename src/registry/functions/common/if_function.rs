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

//! if() function - conditional value

use crate::ast::ExpressionNode;
use crate::error::{ExpressionError, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ValueKind};
use crate::registry::function::{ExpressionFunction, describe_arguments};
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};

/// if() function - conditional value
pub struct IfFunction;

impl ExpressionFunction for IfFunction {
    fn name(&self) -> &str {
        "if"
    }

    fn human_friendly_name(&self) -> &str {
        "If"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::new(
                "if",
                vec![
                    ParameterInfo::required("condition", ParameterKind::Value(ValueKind::Boolean)),
                    ParameterInfo::required("trueValue", ParameterKind::Any),
                    ParameterInfo::required("falseValue", ParameterKind::Any),
                ],
                None,
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the second argument when the condition is true, otherwise the third. A null condition counts as false."
    }

    fn evaluate(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let [condition, when_true, when_false] = args else {
            return Err(self.arity_error(args.len()));
        };
        match compiler.visit_value(condition)? {
            ExpressionValue::Boolean(true) => compiler.visit_value(when_true),
            ExpressionValue::Boolean(false) | ExpressionValue::Null => {
                compiler.visit_value(when_false)
            }
            other => Err(ExpressionError::type_mismatch(
                ValueKind::Boolean.type_name(),
                other.type_name(),
                "condition of if",
            )),
        }
    }

    fn describe(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let values = describe_arguments(self.signature(), args, compiler)?;
        let [_, when_true, when_false] = values.as_slice() else {
            return Err(self.arity_error(values.len()));
        };
        if let (Some(t), Some(f)) = (when_true.kind(), when_false.kind()) {
            if !t.accepts(f) && !f.accepts(t) {
                return Err(ExpressionError::type_mismatch(
                    t.type_name(),
                    f.type_name(),
                    "branches of if",
                ));
            }
        }
        Ok(if when_true.is_null() {
            when_false.clone()
        } else {
            when_true.clone()
        })
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let [condition, when_true, when_false] = args else {
            return Err(self.arity_error(args.len()));
        };
        Ok(format!(
            "case when {} then {} else {} end",
            compiler.visit_sql(condition)?,
            compiler.visit_sql(when_true)?,
            compiler.visit_sql(when_false)?
        ))
    }
}
