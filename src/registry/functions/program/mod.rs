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

//! Program indicator functions in the `d2:` namespace

mod condition;
mod count;
mod date_between;
mod has_value;
mod oizp;
mod relationship_count;
mod zing;
mod zpvc;

pub use condition::ConditionFunction;
pub use count::{CountFunction, CountIfConditionFunction, CountIfValueFunction};
pub use date_between::DateBetweenFunction;
pub use has_value::HasValueFunction;
pub use oizp::OizpFunction;
pub use relationship_count::RelationshipCountFunction;
pub use zing::ZingFunction;
pub use zpvc::ZpvcFunction;

use crate::ast::{ExpressionNode, ItemReference};
use crate::error::{ExpressionError, Result};
use crate::evaluator::ExpressionCompiler;
use crate::registry::function::FunctionRegistry;
use crate::sql::{ANALYTICS_TBL_ALIAS, DateUnit};
use std::fmt::Write;

/// `(programStageUid, dataElementUid)` of a `#{..}` argument
fn stage_element<'n>(function_name: &str, arg: &'n ExpressionNode) -> Result<(&'n str, &'n str)> {
    match arg.as_item() {
        Some(ItemReference::StageElement {
            program_stage_uid,
            data_element_uid,
        }) => Ok((program_stage_uid, data_element_uid)),
        _ => Err(ExpressionError::invalid_argument(
            function_name,
            format!("expected a program stage data element, got {arg}"),
        )),
    }
}

/// Count of events of the current enrollment where the column has a value
/// matching `condition`, e.g. ` > 5`
fn event_count_sql(
    compiler: &ExpressionCompiler<'_>,
    program_stage_uid: &str,
    data_element_uid: &str,
    condition: &str,
) -> Result<String> {
    let context = compiler.context();
    let indicator = context.require_indicator()?;
    let builder = context.statement_builder;
    let table = indicator.event_table_name();
    let column = builder.quote(data_element_uid);

    let mut sql = format!(
        "(select count({column}) from {table} where {table}.pi = {ANALYTICS_TBL_ALIAS}.pi and {column} is not null"
    );
    if !condition.is_empty() {
        let _ = write!(sql, " and {column}{condition}");
    }
    if let Some(window) = context.window {
        for boundary in indicator.event_boundaries() {
            let _ = write!(sql, " and {}", builder.boundary_condition(boundary, &window));
        }
    }
    let _ = write!(sql, " and ps = {})", builder.encode(program_stage_uid));
    Ok(sql)
}

/// Register all `d2:` functions
pub fn register_program_functions(registry: &mut FunctionRegistry) {
    registry.register(ConditionFunction);
    registry.register(CountFunction);
    registry.register(CountIfConditionFunction);
    registry.register(CountIfValueFunction);
    registry.register(DateBetweenFunction::new(DateUnit::Days));
    registry.register(DateBetweenFunction::new(DateUnit::Weeks));
    registry.register(DateBetweenFunction::new(DateUnit::Months));
    registry.register(DateBetweenFunction::new(DateUnit::Years));
    registry.register(DateBetweenFunction::new(DateUnit::Minutes));
    registry.register(HasValueFunction);
    registry.register(OizpFunction);
    registry.register(RelationshipCountFunction);
    registry.register(ZingFunction);
    registry.register(ZpvcFunction);
}
