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

//! Placeholder item capability trait and item registry

use crate::ast::{ItemKind, ItemReference};
use crate::error::Result;
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ValueKind};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Handler for one kind of placeholder
pub trait ExpressionItem: Send + Sync {
    /// Placeholder kind handled
    fn kind(&self) -> ItemKind;

    /// Kind of the item's value
    fn type_of(&self, item: &ItemReference, compiler: &ExpressionCompiler<'_>)
    -> Result<ValueKind>;

    /// Read the live value through the value source
    fn evaluate(
        &self,
        item: &ItemReference,
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue>;

    /// Display label of the item
    fn label(&self, item: &ItemReference, compiler: &ExpressionCompiler<'_>) -> Result<String>;

    /// Record the item's label and return a typed stand-in value
    fn describe(
        &self,
        item: &ItemReference,
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let label = self.label(item, compiler)?;
        let kind = self.type_of(item, compiler)?;
        compiler
            .context_mut()
            .item_descriptions
            .insert(item.text(), label);
        Ok(kind.default_value())
    }

    /// Render the item as SQL
    fn to_sql(&self, item: &ItemReference, compiler: &mut ExpressionCompiler<'_>) -> Result<String>;
}

/// Registry of item handlers keyed by placeholder kind
#[derive(Clone, Default)]
pub struct ItemRegistry {
    items: FxHashMap<ItemKind, Arc<dyn ExpressionItem>>,
}

impl std::fmt::Debug for ItemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemRegistry")
            .field("item_count", &self.items.len())
            .finish()
    }
}

impl ItemRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for its kind
    pub fn register<I: ExpressionItem + 'static>(&mut self, item: I) {
        self.items.insert(item.kind(), Arc::new(item));
    }

    /// Look up the handler of a kind
    pub fn get(&self, kind: ItemKind) -> Option<&Arc<dyn ExpressionItem>> {
        self.items.get(&kind)
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
