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

//! Program indicator engine - the main entry point for describing, validating,
//! evaluating and translating indicator expressions

use crate::analyzer::{any_value_exists_clause, collect_identifiers};
use crate::config::EngineConfig;
use crate::error::{ExpressionError, Result};
use crate::evaluator::{CompilationContext, CompilationMode, ExpressionCompiler};
use crate::model::{
    AnalyticsType, ExpressionValue, MetadataProvider, ProgramIndicator, ReportingWindow,
    ResultType, TypeCoercion, ValueSource,
};
use crate::parser::parse;
use crate::store::ProgramIndicatorStore;
use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

/// Program indicator engine
///
/// Every call parses and compiles its expression afresh; nothing is shared
/// between calls apart from the read-only built-in registry.
#[derive(Clone)]
pub struct ProgramIndicatorEngine {
    metadata: Arc<dyn MetadataProvider>,
    store: Arc<dyn ProgramIndicatorStore>,
    config: EngineConfig,
}

impl ProgramIndicatorEngine {
    /// Create an engine with the default configuration
    pub fn new(metadata: Arc<dyn MetadataProvider>, store: Arc<dyn ProgramIndicatorStore>) -> Self {
        Self::with_config(metadata, store, EngineConfig::default())
    }

    /// Create an engine with a custom configuration
    pub fn with_config(
        metadata: Arc<dyn MetadataProvider>,
        store: Arc<dyn ProgramIndicatorStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            metadata,
            store,
            config,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn context(&self, mode: CompilationMode) -> CompilationContext<'_> {
        CompilationContext::new(self.metadata.as_ref(), mode)
            .with_statement_builder(self.config.statement_builder())
    }

    // Store delegation

    /// Save a new indicator and return its id
    pub fn add_program_indicator(&self, indicator: ProgramIndicator) -> u64 {
        self.store.save(indicator)
    }

    /// Replace a stored indicator; `false` when its id is unknown
    pub fn update_program_indicator(&self, indicator: ProgramIndicator) -> bool {
        self.store.update(indicator)
    }

    /// Remove a stored indicator
    pub fn delete_program_indicator(&self, id: u64) -> Option<ProgramIndicator> {
        self.store.delete(id)
    }

    /// Indicator by id
    pub fn program_indicator(&self, id: u64) -> Option<ProgramIndicator> {
        self.store.get(id)
    }

    /// Indicator by uid
    pub fn program_indicator_by_uid(&self, uid: &str) -> Option<ProgramIndicator> {
        self.store.get_by_uid(uid)
    }

    /// Indicator by display name
    pub fn program_indicator_by_name(&self, name: &str) -> Option<ProgramIndicator> {
        self.store.get_by_name(name)
    }

    /// Every stored indicator
    pub fn all_program_indicators(&self) -> Vec<ProgramIndicator> {
        self.store.all()
    }

    // Expression operations

    /// Type-check `expression` against `expected` and return the label of
    /// every item and variable it references, keyed by source text
    pub fn validate(
        &self,
        expression: &str,
        expected: Option<ResultType>,
    ) -> Result<IndexMap<String, String>> {
        let expr = parse(expression)?;
        let mut compiler = ExpressionCompiler::new(self.context(CompilationMode::Validate));
        let result = compiler.compile(&expr)?;
        let value = result.as_value().cloned().unwrap_or(ExpressionValue::Null);
        TypeCoercion::coerce(value, expected)?;
        Ok(compiler.into_context().item_descriptions)
    }

    fn description(&self, expression: &str, expected: Option<ResultType>) -> Result<String> {
        let descriptions = self.validate(expression, expected)?;
        Ok(descriptions
            .iter()
            .fold(expression.to_string(), |text, (item, label)| {
                text.replace(item.as_str(), label)
            }))
    }

    fn is_valid(&self, expression: &str, expected: ResultType) -> bool {
        match self.validate(expression, Some(expected)) {
            Ok(_) => true,
            Err(error) => {
                log::debug!("'{expression}' is not a valid {expected} expression: {error}");
                false
            }
        }
    }

    /// Description without a result type check
    pub fn untyped_description(&self, expression: &str) -> Result<String> {
        self.description(expression, None)
    }

    /// Description of a numeric expression
    pub fn expression_description(&self, expression: &str) -> Result<String> {
        self.description(expression, Some(ResultType::Double))
    }

    /// Description of a boolean filter
    pub fn filter_description(&self, expression: &str) -> Result<String> {
        self.description(expression, Some(ResultType::Boolean))
    }

    /// Whether `expression` is a valid numeric expression
    pub fn expression_is_valid(&self, expression: &str) -> bool {
        self.is_valid(expression, ResultType::Double)
    }

    /// Whether `filter` is a valid boolean filter
    pub fn filter_is_valid(&self, filter: &str) -> bool {
        self.is_valid(filter, ResultType::Boolean)
    }

    /// Data element and attribute uids read by `expression`
    pub fn data_element_and_attribute_identifiers(
        &self,
        expression: &str,
        analytics_type: AnalyticsType,
    ) -> Result<IndexSet<String>> {
        Ok(collect_identifiers(expression, analytics_type)?)
    }

    /// SQL fragment computing `expression` for `indicator` over a reporting period
    pub fn analytics_sql(
        &self,
        expression: &str,
        indicator: &ProgramIndicator,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<String> {
        let expr = parse(expression)?;
        let identifiers = collect_identifiers(expression, indicator.analytics_type)?;
        let context = self
            .context(CompilationMode::GetSql)
            .with_indicator(indicator)
            .with_window(ReportingWindow::new(start, end))
            .with_replace_nulls(self.config.replace_nulls)
            .with_identifiers(identifiers);

        let sql = ExpressionCompiler::new(context).compile(&expr)?.to_string();
        log::debug!("analytics SQL for '{expression}': {sql}");
        Ok(sql)
    }

    /// `"a" is not null or "b" is not null` over the identifiers of `expression`
    ///
    /// `None` when there are no identifiers or the expression does not parse.
    pub fn any_value_exists_clause(
        &self,
        expression: &str,
        analytics_type: AnalyticsType,
    ) -> Option<String> {
        match collect_identifiers(expression, analytics_type) {
            Ok(identifiers) => {
                any_value_exists_clause(&identifiers, self.config.statement_builder())
            }
            Err(error) => {
                log::debug!("no value exists clause for '{expression}': {error}");
                None
            }
        }
    }

    /// Compute `expression` from live values and check it against `expected`
    pub fn evaluate(
        &self,
        expression: &str,
        values: &dyn ValueSource,
        expected: Option<ResultType>,
        window: Option<ReportingWindow>,
    ) -> Result<ExpressionValue> {
        let expr = parse(expression)?;
        let mut context = self.context(CompilationMode::Evaluate).with_values(values);
        if let Some(window) = window {
            context = context.with_window(window);
        }

        let value = ExpressionCompiler::new(context)
            .compile(&expr)?
            .as_value()
            .cloned()
            .ok_or_else(|| ExpressionError::type_mismatch("value", "SQL fragment", expression))?;
        TypeCoercion::coerce(value, expected)
    }
}

impl std::fmt::Debug for ProgramIndicatorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramIndicatorEngine")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Constant, DataElement, InMemoryMetadata, InMemoryValues, ProgramStage,
        TrackedEntityAttribute, ValueType,
    };
    use crate::store::InMemoryProgramIndicatorStore;
    use pretty_assertions::assert_eq;

    fn engine() -> ProgramIndicatorEngine {
        let metadata = InMemoryMetadata::new()
            .with_program_stage(ProgramStage {
                uid: "ps1".to_string(),
                name: "Birth".to_string(),
                program_uid: Some("prog".to_string()),
            })
            .with_data_element(DataElement {
                uid: "de1".to_string(),
                name: "Weight".to_string(),
                value_type: ValueType::Number,
            })
            .with_attribute(TrackedEntityAttribute {
                uid: "at1".to_string(),
                name: "Gender".to_string(),
                value_type: ValueType::Text,
            })
            .with_constant(Constant {
                uid: "c1".to_string(),
                name: "Ten".to_string(),
                value: 10.0,
            });
        ProgramIndicatorEngine::new(
            Arc::new(metadata),
            Arc::new(InMemoryProgramIndicatorStore::new()),
        )
    }

    #[test]
    fn test_expression_description() {
        let description = engine()
            .expression_description("#{ps1.de1} * C{c1} + V{event_count}")
            .unwrap();
        assert_eq!(description, "Birth.Weight * Ten + Event count");
    }

    #[test]
    fn test_validity_by_result_type() {
        let engine = engine();
        assert!(engine.expression_is_valid("#{ps1.de1} + 1"));
        assert!(!engine.expression_is_valid("#{ps1.de1} > 1"));
        assert!(engine.filter_is_valid("#{ps1.de1} > 1 and A{at1} == 'F'"));
        assert!(!engine.filter_is_valid("2 + "));
        assert!(!engine.expression_is_valid("#{ps1.missing}"));
    }

    #[test]
    fn test_evaluate() {
        let values = InMemoryValues::new().with_stage_value("ps1", "de1", 3.5);
        let value = engine()
            .evaluate("#{ps1.de1} * 2", &values, Some(ResultType::Double), None)
            .unwrap();
        assert_eq!(value, ExpressionValue::Number(7.0));
    }

    #[test]
    fn test_any_value_exists_clause_degrades_to_none() {
        let engine = engine();
        assert_eq!(
            engine.any_value_exists_clause("#{ps1.de1} + A{at1}", AnalyticsType::Event),
            Some("\"de1\" is not null or \"at1\" is not null".to_string())
        );
        assert_eq!(engine.any_value_exists_clause("1 + 1", AnalyticsType::Event), None);
        assert_eq!(engine.any_value_exists_clause("1 +", AnalyticsType::Event), None);
    }

    #[test]
    fn test_store_delegation() {
        let engine = engine();
        let id = engine.add_program_indicator(ProgramIndicator::new("pi", "Name", "prog", "1"));
        assert_eq!(engine.program_indicator_by_uid("pi").map(|pi| pi.id), Some(id));
        assert_eq!(engine.all_program_indicators().len(), 1);
    }
}
