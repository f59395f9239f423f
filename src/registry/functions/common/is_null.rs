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

//! isNull() and isNotNull() functions

use crate::ast::ExpressionNode;
use crate::error::Result;
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ValueKind};
use crate::registry::function::ExpressionFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};

/// isNull() function - true when the item has no value
pub struct IsNullFunction;

impl ExpressionFunction for IsNullFunction {
    fn name(&self) -> &str {
        "isNull"
    }

    fn human_friendly_name(&self) -> &str {
        "Is Null"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::new(
                "isNull",
                vec![ParameterInfo::required("item", ParameterKind::Item)],
                Some(ValueKind::Boolean),
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
        Ok(ExpressionValue::Boolean(compiler.visit_value(item)?.is_null()))
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let [item] = args else {
            return Err(self.arity_error(args.len()));
        };
        Ok(format!("{} is null", compiler.visit_sql_raw(item)?))
    }
}

/// isNotNull() function - true when the item has a value
pub struct IsNotNullFunction;

impl ExpressionFunction for IsNotNullFunction {
    fn name(&self) -> &str {
        "isNotNull"
    }

    fn human_friendly_name(&self) -> &str {
        "Is Not Null"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::new(
                "isNotNull",
                vec![ParameterInfo::required("item", ParameterKind::Item)],
                Some(ValueKind::Boolean),
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
        Ok(ExpressionValue::Boolean(!compiler.visit_value(item)?.is_null()))
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let [item] = args else {
            return Err(self.arity_error(args.len()));
        };
        Ok(format!("{} is not null", compiler.visit_sql_raw(item)?))
    }
}
