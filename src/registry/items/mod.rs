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

//! Handlers for the placeholder items `#{..}`, `A{..}`, `C{..}` and
//! `PS_EVENTDATE:..`

mod attribute;
mod constant;
mod stage_element;
mod stage_event_date;

pub use attribute::AttributeItem;
pub use constant::ConstantItem;
pub use stage_element::StageElementItem;
pub use stage_event_date::StageEventDateItem;

use super::item::ItemRegistry;
use crate::ast::ItemReference;
use crate::error::{ExpressionError, ReferenceKind};
use crate::evaluator::ExpressionCompiler;
use crate::model::ValueKind;

/// Error for a reference routed to the wrong handler
fn unexpected_item(item: &ItemReference) -> ExpressionError {
    ExpressionError::unresolved(ReferenceKind::Item, item.text())
}

/// Wrap a column in `coalesce(column, <default>)` when null replacement is on
///
/// Dates have no neutral default and stay unwrapped.
fn replace_nulls(column: String, kind: ValueKind, compiler: &ExpressionCompiler<'_>) -> String {
    if !compiler.context().replace_nulls || kind == ValueKind::Date {
        return column;
    }
    format!(
        "coalesce({column}, {})",
        compiler.value_sql(&kind.default_value())
    )
}

/// Register every item handler
pub fn register_items(registry: &mut ItemRegistry) {
    registry.register(AttributeItem);
    registry.register(ConstantItem);
    registry.register(StageElementItem);
    registry.register(StageEventDateItem);
}
