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

//! Per-call compilation context

use crate::error::{ExpressionError, Result};
use crate::model::{MetadataProvider, ProgramIndicator, ReportingWindow, ValueSource};
use crate::sql::{PostgreSqlStatementBuilder, StatementBuilder};
use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};

/// How function calls and operators are compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionStrategy {
    /// Compute values
    Evaluate,
    /// Type-check and return typed stand-ins
    Describe,
    /// Render SQL
    GetSql,
}

/// How placeholder items are compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStrategy {
    /// Read live values
    Evaluate,
    /// Record display labels
    GetDescription,
    /// Render SQL
    GetSql,
}

/// How literals are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LiteralStrategy {
    /// Native values
    #[default]
    Default,
    /// SQL literals
    Sql,
}

/// Common strategy combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilationMode {
    /// Compute a value from live data
    Evaluate,
    /// Type-check and collect item descriptions
    Validate,
    /// Render SQL for analytics queries
    GetSql,
    /// Any combination of strategies
    Custom {
        /// Function strategy
        function: FunctionStrategy,
        /// Item strategy
        item: ItemStrategy,
        /// Literal strategy
        literal: LiteralStrategy,
    },
}

impl CompilationMode {
    /// Strategies selected by this mode
    pub fn strategies(self) -> (FunctionStrategy, ItemStrategy, LiteralStrategy) {
        match self {
            Self::Evaluate => (
                FunctionStrategy::Evaluate,
                ItemStrategy::Evaluate,
                LiteralStrategy::Default,
            ),
            Self::Validate => (
                FunctionStrategy::Describe,
                ItemStrategy::GetDescription,
                LiteralStrategy::Default,
            ),
            Self::GetSql => (
                FunctionStrategy::GetSql,
                ItemStrategy::GetSql,
                LiteralStrategy::Sql,
            ),
            Self::Custom {
                function,
                item,
                literal,
            } => (function, item, literal),
        }
    }
}

/// State of a single compilation call
///
/// Nothing in here outlives the call; the accumulated descriptions and
/// identifiers are handed back through [`crate::evaluator::ExpressionCompiler::into_context`].
pub struct CompilationContext<'a> {
    /// Function strategy
    pub function_strategy: FunctionStrategy,
    /// Item strategy
    pub item_strategy: ItemStrategy,
    /// Literal strategy
    pub literal_strategy: LiteralStrategy,
    /// Metadata lookups
    pub metadata: &'a dyn MetadataProvider,
    /// Live values for evaluate mode
    pub values: Option<&'a dyn ValueSource>,
    /// Dialect hooks for SQL mode
    pub statement_builder: &'a dyn StatementBuilder,
    /// Indicator being compiled
    pub indicator: Option<&'a ProgramIndicator>,
    /// Reporting window
    pub window: Option<ReportingWindow>,
    /// Date used for `V{current_date}`
    pub current_date: NaiveDate,
    /// Wrap item columns in `coalesce` in SQL mode
    pub replace_nulls: bool,
    /// Item text to display label, in first-seen order
    pub item_descriptions: IndexMap<String, String>,
    /// Data element and attribute uids used by value count variables
    pub identifiers: IndexSet<String>,
}

impl<'a> CompilationContext<'a> {
    /// Create a context for `mode` reading metadata from `metadata`
    pub fn new(metadata: &'a dyn MetadataProvider, mode: CompilationMode) -> Self {
        let (function_strategy, item_strategy, literal_strategy) = mode.strategies();
        Self {
            function_strategy,
            item_strategy,
            literal_strategy,
            metadata,
            values: None,
            statement_builder: &PostgreSqlStatementBuilder,
            indicator: None,
            window: None,
            current_date: chrono::Local::now().date_naive(),
            replace_nulls: false,
            item_descriptions: IndexMap::new(),
            identifiers: IndexSet::new(),
        }
    }

    /// Set the value source
    pub fn with_values(mut self, values: &'a dyn ValueSource) -> Self {
        self.values = Some(values);
        self
    }

    /// Set the statement builder
    pub fn with_statement_builder(mut self, statement_builder: &'a dyn StatementBuilder) -> Self {
        self.statement_builder = statement_builder;
        self
    }

    /// Set the indicator
    pub fn with_indicator(mut self, indicator: &'a ProgramIndicator) -> Self {
        self.indicator = Some(indicator);
        self
    }

    /// Set the reporting window
    pub fn with_window(mut self, window: ReportingWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Set the date used for `V{current_date}`
    pub fn with_current_date(mut self, current_date: NaiveDate) -> Self {
        self.current_date = current_date;
        self
    }

    /// Enable or disable null replacement
    pub fn with_replace_nulls(mut self, replace_nulls: bool) -> Self {
        self.replace_nulls = replace_nulls;
        self
    }

    /// Set the identifiers used by value count variables
    pub fn with_identifiers(mut self, identifiers: IndexSet<String>) -> Self {
        self.identifiers = identifiers;
        self
    }

    /// Value source, required in evaluate mode
    pub fn require_values(&self) -> Result<&'a dyn ValueSource> {
        self.values
            .ok_or_else(|| ExpressionError::missing_context("value source"))
    }

    /// Indicator, required by SQL forms that reference the event table
    pub fn require_indicator(&self) -> Result<&'a ProgramIndicator> {
        self.indicator
            .ok_or_else(|| ExpressionError::missing_context("program indicator"))
    }

    /// Reporting window, required by period variables
    pub fn require_window(&self) -> Result<ReportingWindow> {
        self.window
            .ok_or_else(|| ExpressionError::missing_context("reporting window"))
    }

    /// Whether the indicator aggregates per enrollment
    pub fn is_enrollment(&self) -> bool {
        self.indicator.is_some_and(|indicator| {
            indicator.analytics_type == crate::model::AnalyticsType::Enrollment
        })
    }
}

impl std::fmt::Debug for CompilationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationContext")
            .field("function_strategy", &self.function_strategy)
            .field("item_strategy", &self.item_strategy)
            .field("literal_strategy", &self.literal_strategy)
            .field("indicator", &self.indicator.map(|i| i.uid.as_str()))
            .field("window", &self.window)
            .field("replace_nulls", &self.replace_nulls)
            .field("item_descriptions", &self.item_descriptions)
            .field("identifiers", &self.identifiers)
            .finish()
    }
}
