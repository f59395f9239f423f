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

//! d2:zpvc() function

use crate::ast::ExpressionNode;
use crate::error::{ExpressionError, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ValueKind};
use crate::registry::function::ExpressionFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};

/// d2:zpvc() function - number of zero or positive values among the items
///
/// Returns null rather than zero when no item qualifies.
pub struct ZpvcFunction;

impl ExpressionFunction for ZpvcFunction {
    fn name(&self) -> &str {
        "d2:zpvc"
    }

    fn human_friendly_name(&self) -> &str {
        "Zero Or Positive Value Count"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::variadic(
                "d2:zpvc",
                vec![ParameterInfo::required("item", ParameterKind::Item)],
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
        let mut count = 0;
        for arg in args {
            match compiler.visit_value(arg)? {
                ExpressionValue::Number(n) if n >= 0.0 => count += 1,
                ExpressionValue::Number(_) | ExpressionValue::Null => {}
                other => {
                    return Err(ExpressionError::type_mismatch(
                        ValueKind::Number.type_name(),
                        other.type_name(),
                        "argument of d2:zpvc",
                    ));
                }
            }
        }
        Ok(if count == 0 {
            ExpressionValue::Null
        } else {
            ExpressionValue::Number(f64::from(count))
        })
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let mut terms = Vec::with_capacity(args.len());
        for arg in args {
            terms.push(format!(
                "case when {} >= 0 then 1 else 0 end",
                compiler.visit_sql_raw(arg)?
            ));
        }
        Ok(format!(
            "nullif(cast(({}) as {}),0)",
            terms.join(" + "),
            compiler.context().statement_builder.double_column_type()
        ))
    }
}
