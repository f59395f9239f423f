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

//! d2:zing() function

use crate::ast::ExpressionNode;
use crate::error::{ExpressionError, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ValueKind};
use crate::registry::function::ExpressionFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};

/// d2:zing() function - zero if negative, zero for null
pub struct ZingFunction;

impl ExpressionFunction for ZingFunction {
    fn name(&self) -> &str {
        "d2:zing"
    }

    fn human_friendly_name(&self) -> &str {
        "Zero If Negative"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::new(
                "d2:zing",
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
        match compiler.visit_value(arg)? {
            ExpressionValue::Null => Ok(ExpressionValue::Number(0.0)),
            ExpressionValue::Number(n) => Ok(ExpressionValue::Number(n.max(0.0))),
            other => Err(ExpressionError::type_mismatch(
                ValueKind::Number.type_name(),
                other.type_name(),
                "argument of d2:zing",
            )),
        }
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let [arg] = args else {
            return Err(self.arity_error(args.len()));
        };
        let sql = compiler.visit_sql(arg)?;
        Ok(format!("coalesce(case when {sql} < 0 then 0 else {sql} end, 0)"))
    }
}
