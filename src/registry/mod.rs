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

//! Function, variable and item registries for program indicator expressions
//!
//! Functions and `V{..}` variables share one name-keyed registry; placeholder
//! items are keyed by their kind.

#![warn(missing_docs)]

pub mod function;
pub mod functions;
pub mod item;
pub mod items;
pub mod signature;
pub mod variables;

pub use function::{ExpressionFunction, FunctionRegistry};
pub use item::{ExpressionItem, ItemRegistry};
pub use signature::{FunctionSignature, ParameterInfo, ParameterKind};
pub use variables::ProgramVariableFunction;

use crate::ast::ItemKind;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Functions, variables and items available to the compiler
#[derive(Debug, Clone, Default)]
pub struct ExpressionRegistry {
    functions: FunctionRegistry,
    items: ItemRegistry,
}

impl ExpressionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Function registry, including variables
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Item registry
    pub fn items(&self) -> &ItemRegistry {
        &self.items
    }

    /// Function or variable by registry key
    pub fn function(&self, name: &str) -> Option<&Arc<dyn ExpressionFunction>> {
        self.functions.get(name)
    }

    /// Item handler of a placeholder kind
    pub fn item(&self, kind: ItemKind) -> Option<&Arc<dyn ExpressionItem>> {
        self.items.get(kind)
    }

    /// Add or replace a function
    pub fn register_function<F: ExpressionFunction + 'static>(&mut self, function: F) {
        self.functions.register(function);
    }

    /// Add or replace an item handler
    pub fn register_item<I: ExpressionItem + 'static>(&mut self, item: I) {
        self.items.register(item);
    }
}

/// Registry key of the program variable `name`
pub fn variable_key(name: &str) -> String {
    format!("V{{{name}}}")
}

/// Create a registry with every built-in function, variable and item
pub fn create_program_indicator_registry() -> ExpressionRegistry {
    let mut registry = ExpressionRegistry::new();

    functions::register_common_functions(&mut registry.functions);
    functions::register_aggregate_functions(&mut registry.functions);
    functions::register_program_functions(&mut registry.functions);
    variables::register_variables(&mut registry.functions);
    items::register_items(&mut registry.items);

    registry
}

static PROGRAM_INDICATOR_REGISTRY: Lazy<ExpressionRegistry> =
    Lazy::new(create_program_indicator_registry);

/// Shared built-in registry
pub fn program_indicator_registry() -> &'static ExpressionRegistry {
    &PROGRAM_INDICATOR_REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProgramVariable;

    #[test]
    fn test_builtin_registry_contents() {
        let registry = program_indicator_registry();
        for name in ["if", "firstNonNull", "avg", "stddev", "d2:zpvc", "d2:countIfCondition"] {
            assert!(registry.functions().contains(name), "missing {name}");
        }
        for variable in ProgramVariable::ALL {
            assert!(registry.functions().contains(&variable_key(variable.name())));
        }
        assert_eq!(registry.items().len(), 4);
    }

    #[test]
    fn test_variable_key() {
        assert_eq!(variable_key("event_count"), "V{event_count}");
    }
}
