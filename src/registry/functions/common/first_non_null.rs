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

//! firstNonNull() function

use super::common_kind;
use crate::ast::ExpressionNode;
use crate::error::Result;
use crate::evaluator::ExpressionCompiler;
use crate::model::ExpressionValue;
use crate::registry::function::{ExpressionFunction, describe_arguments};
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};

/// firstNonNull() function - first argument with a value
pub struct FirstNonNullFunction;

impl ExpressionFunction for FirstNonNullFunction {
    fn name(&self) -> &str {
        "firstNonNull"
    }

    fn human_friendly_name(&self) -> &str {
        "First Non Null"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::variadic(
                "firstNonNull",
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
        for arg in args {
            let value = compiler.visit_value(arg)?;
            if !value.is_null() {
                return Ok(value);
            }
        }
        Ok(ExpressionValue::Null)
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
        let sql = args
            .iter()
            .map(|arg| compiler.visit_sql(arg))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("coalesce({})", sql.join(",")))
    }
}
