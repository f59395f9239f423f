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

//! Functions without a namespace, shared by every expression type

mod extremum;
mod first_non_null;
mod if_function;
mod is_null;

pub use extremum::{GreatestFunction, LeastFunction};
pub use first_non_null::FirstNonNullFunction;
pub use if_function::IfFunction;
pub use is_null::{IsNotNullFunction, IsNullFunction};

use crate::error::{ExpressionError, Result};
use crate::model::ExpressionValue;
use crate::registry::function::FunctionRegistry;

/// First non-null stand-in, after checking all stand-ins share a kind
fn common_kind(function_name: &str, values: &[ExpressionValue]) -> Result<ExpressionValue> {
    let mut result = ExpressionValue::Null;
    for value in values {
        match (result.kind(), value.kind()) {
            (None, Some(_)) => result = value.clone(),
            (Some(expected), Some(actual))
                if !expected.accepts(actual) && !actual.accepts(expected) =>
            {
                return Err(ExpressionError::type_mismatch(
                    expected.type_name(),
                    actual.type_name(),
                    format!("arguments of {function_name}"),
                ));
            }
            _ => {}
        }
    }
    Ok(result)
}

/// Register all common functions
pub fn register_common_functions(registry: &mut FunctionRegistry) {
    registry.register(IfFunction);
    registry.register(IsNullFunction);
    registry.register(IsNotNullFunction);
    registry.register(FirstNonNullFunction);
    registry.register(GreatestFunction);
    registry.register(LeastFunction);
}
