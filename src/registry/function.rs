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

//! Function capability trait and function registry

use super::signature::{FunctionSignature, ParameterKind};
use crate::ast::{ExpressionNode, ItemReference};
use crate::error::{ExpressionError, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ValueKind};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A function callable from expressions
///
/// Implementations are stateless. Arguments arrive unevaluated so that each
/// function decides how to compile them; `ExpressionCompiler::visit_value` and
/// `ExpressionCompiler::visit_sql` compile an argument in the active mode.
pub trait ExpressionFunction: Send + Sync {
    /// Function name as written in expressions, including the namespace
    fn name(&self) -> &str;

    /// Get the human-friendly name for the function (for documentation)
    fn human_friendly_name(&self) -> &str;

    /// Get the function signature
    fn signature(&self) -> &FunctionSignature;

    /// Get function documentation
    fn documentation(&self) -> &str {
        ""
    }

    /// Kind of the result, `None` when it depends on the arguments
    fn type_of(&self) -> Option<ValueKind> {
        self.signature().return_kind
    }

    /// Arity error for a call with `actual` arguments
    fn arity_error(&self, actual: usize) -> ExpressionError {
        ExpressionError::Arity {
            function_name: self.name().to_string(),
            expected: self.signature().arity_text(),
            actual,
        }
    }

    /// Check argument count and argument shapes
    fn validate_args(&self, args: &[ExpressionNode]) -> Result<()> {
        let sig = self.signature();
        if !sig.accepts_arity(args.len()) {
            return Err(self.arity_error(args.len()));
        }

        for (index, arg) in args.iter().enumerate() {
            let Some(param) = sig.parameter_at(index) else {
                continue;
            };
            let shape_ok = match param.kind {
                ParameterKind::Item => arg.as_item().is_some(),
                ParameterKind::StageElement => {
                    matches!(arg.as_item(), Some(ItemReference::StageElement { .. }))
                }
                ParameterKind::StringLiteral => arg.as_string_literal().is_some(),
                ParameterKind::Value(_) | ParameterKind::Any => true,
            };
            if !shape_ok {
                return Err(ExpressionError::invalid_argument(
                    self.name(),
                    format!("argument '{}' must be a {}, got {arg}", param.name, param.kind),
                ));
            }
        }
        Ok(())
    }

    /// Compute the value from live data
    fn evaluate(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue>;

    /// Type-check the arguments and return a typed stand-in value
    fn describe(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        describe_arguments(self.signature(), args, compiler)?;
        Ok(self
            .type_of()
            .map_or(ExpressionValue::Null, ValueKind::default_value))
    }

    /// Render the call as SQL; fails for functions without a SQL form
    fn to_sql(
        &self,
        _args: &[ExpressionNode],
        _compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        Err(ExpressionError::sql_unsupported(self.name()))
    }
}

/// Compile every argument in describe mode and check it against its parameter
pub fn describe_arguments(
    signature: &FunctionSignature,
    args: &[ExpressionNode],
    compiler: &mut ExpressionCompiler<'_>,
) -> Result<Vec<ExpressionValue>> {
    let mut values = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        let value = compiler.visit_value(arg)?;
        if let (Some(param), Some(actual)) = (signature.parameter_at(index), value.kind()) {
            if let ParameterKind::Value(expected) = param.kind {
                if !expected.accepts(actual) {
                    return Err(ExpressionError::type_mismatch(
                        expected.type_name(),
                        actual.type_name(),
                        format!("argument '{}' of {}", param.name, signature.name),
                    ));
                }
            }
        }
        values.push(value);
    }
    Ok(values)
}

/// Registry of functions keyed by name
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, Arc<dyn ExpressionFunction>>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("function_count", &self.functions.len())
            .finish()
    }
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under its name; a later registration replaces an earlier one
    pub fn register<F: ExpressionFunction + 'static>(&mut self, function: F) {
        let name = function.name().to_string();
        self.functions.insert(name, Arc::new(function));
    }

    /// Look up a function
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ExpressionFunction>> {
        self.functions.get(name)
    }

    /// Check if a function is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{CompilationContext, CompilationMode};
    use crate::model::InMemoryMetadata;
    use crate::registry::signature::ParameterInfo;

    struct ValueOnlyFunction;

    impl ExpressionFunction for ValueOnlyFunction {
        fn name(&self) -> &str {
            "valueOnly"
        }

        fn human_friendly_name(&self) -> &str {
            "Value Only"
        }

        fn signature(&self) -> &FunctionSignature {
            static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
                FunctionSignature::new(
                    "valueOnly",
                    vec![ParameterInfo::required("value", ParameterKind::Any)],
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
            compiler.visit_value(arg)
        }
    }

    #[test]
    fn test_function_without_sql_form_fails() {
        let metadata = InMemoryMetadata::new();
        let mut compiler = ExpressionCompiler::new(CompilationContext::new(
            &metadata,
            CompilationMode::GetSql,
        ));
        let args = [ExpressionNode::literal(crate::ast::LiteralValue::Integer(1))];

        let error = ValueOnlyFunction.to_sql(&args, &mut compiler).unwrap_err();
        assert!(matches!(
            error,
            ExpressionError::SqlUnsupported { ref name } if name == "valueOnly"
        ));
        assert_eq!(error.to_string(), "'valueOnly' cannot be rendered as SQL");
    }
}
