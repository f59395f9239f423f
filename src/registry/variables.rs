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

//! Program variables `V{name}`
//!
//! Variables are zero-argument functions registered under their `V{name}`
//! key, so they share resolution and dispatch with functions.

use super::function::{ExpressionFunction, FunctionRegistry};
use super::signature::FunctionSignature;
use super::variable_key;
use crate::ast::ExpressionNode;
use crate::error::Result;
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ProgramVariable};
use crate::sql::StatementBuilder;
use indexmap::IndexSet;

/// A program variable
pub struct ProgramVariableFunction {
    variable: ProgramVariable,
    key: String,
    signature: FunctionSignature,
}

impl ProgramVariableFunction {
    /// Create the handler of `variable`
    pub fn new(variable: ProgramVariable) -> Self {
        let key = variable_key(variable.name());
        Self {
            variable,
            signature: FunctionSignature::new(key.clone(), Vec::new(), Some(variable.kind())),
            key,
        }
    }

    /// Variable handled
    pub fn variable(&self) -> ProgramVariable {
        self.variable
    }
}

/// `nullif(cast((case when <test> then 1 else 0 end + ...) as double precision),0)`
fn value_count_sql(
    identifiers: &IndexSet<String>,
    builder: &dyn StatementBuilder,
    test: &str,
) -> String {
    if identifiers.is_empty() {
        return "0".to_string();
    }
    let terms = identifiers
        .iter()
        .map(|uid| format!("case when {} {test} then 1 else 0 end", builder.quote(uid)))
        .collect::<Vec<_>>()
        .join(" + ");
    format!("nullif(cast(({terms}) as {}),0)", builder.double_column_type())
}

impl ExpressionFunction for ProgramVariableFunction {
    fn name(&self) -> &str {
        &self.key
    }

    fn human_friendly_name(&self) -> &str {
        self.variable.label()
    }

    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn evaluate(
        &self,
        _args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let context = compiler.context();
        match self.variable {
            ProgramVariable::AnalyticsPeriodStart => {
                Ok(ExpressionValue::Date(context.require_window()?.start))
            }
            ProgramVariable::AnalyticsPeriodEnd => {
                Ok(ExpressionValue::Date(context.require_window()?.end))
            }
            ProgramVariable::CurrentDate => Ok(ExpressionValue::Date(context.current_date)),
            variable => Ok(context
                .require_values()?
                .variable_value(variable)
                .unwrap_or(ExpressionValue::Null)),
        }
    }

    fn describe(
        &self,
        _args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        compiler
            .context_mut()
            .item_descriptions
            .insert(self.key.clone(), self.variable.label().to_string());
        Ok(self.variable.kind().default_value())
    }

    fn to_sql(
        &self,
        _args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let context = compiler.context();
        let builder = context.statement_builder;
        let enrollment = context.is_enrollment();
        let sql = match self.variable {
            ProgramVariable::AnalyticsPeriodStart => {
                builder.date_literal(context.require_window()?.start)
            }
            ProgramVariable::AnalyticsPeriodEnd => {
                builder.date_literal(context.require_window()?.end)
            }
            ProgramVariable::CreationDate => "created".to_string(),
            ProgramVariable::CurrentDate => builder.date_literal(context.current_date),
            ProgramVariable::DueDate => "duedate".to_string(),
            ProgramVariable::EnrollmentCount if enrollment => "pi".to_string(),
            ProgramVariable::EnrollmentCount => "distinct pi".to_string(),
            ProgramVariable::EnrollmentDate => "enrollmentdate".to_string(),
            ProgramVariable::EnrollmentStatus => "enrollmentstatus".to_string(),
            ProgramVariable::EventCount => "distinct psi".to_string(),
            ProgramVariable::ExecutionDate | ProgramVariable::EventDate if enrollment => builder
                .event_subselect(
                    "executiondate",
                    None,
                    context.require_indicator()?,
                    context.window.as_ref(),
                ),
            ProgramVariable::ExecutionDate | ProgramVariable::EventDate => {
                "executiondate".to_string()
            }
            ProgramVariable::IncidentDate => "incidentdate".to_string(),
            ProgramVariable::OrgUnitCount => "distinct ou".to_string(),
            ProgramVariable::ProgramStageId | ProgramVariable::ProgramStageName if enrollment => {
                "''".to_string()
            }
            ProgramVariable::ProgramStageId => "ps".to_string(),
            ProgramVariable::ProgramStageName => {
                "(select name from programstage where uid = ps)".to_string()
            }
            ProgramVariable::SyncDate => "lastupdated".to_string(),
            ProgramVariable::TeiCount => "distinct tei".to_string(),
            ProgramVariable::ValueCount => {
                value_count_sql(&context.identifiers, builder, "is not null")
            }
            ProgramVariable::ZeroPosValueCount => {
                value_count_sql(&context.identifiers, builder, ">= 0")
            }
        };
        Ok(sql)
    }
}

/// Register every program variable
pub fn register_variables(registry: &mut FunctionRegistry) {
    for variable in ProgramVariable::ALL {
        registry.register(ProgramVariableFunction::new(variable));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PostgreSqlStatementBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_and_signature() {
        let function = ProgramVariableFunction::new(ProgramVariable::EventCount);
        assert_eq!(function.name(), "V{event_count}");
        assert_eq!(function.signature().max_arity, Some(0));
        assert_eq!(function.variable(), ProgramVariable::EventCount);
    }

    #[test]
    fn test_value_count_sql() {
        let builder = PostgreSqlStatementBuilder;
        assert_eq!(value_count_sql(&IndexSet::new(), &builder, "is not null"), "0");
        assert_eq!(
            value_count_sql(&IndexSet::from(["a".to_string(), "b".to_string()]), &builder, ">= 0"),
            "nullif(cast((case when \"a\" >= 0 then 1 else 0 end + \
             case when \"b\" >= 0 then 1 else 0 end) as double precision),0)"
        );
    }
}
