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

//! Program indicator expressions in Rust
//!
//! Parses indicator expressions and compiles them into descriptions,
//! validity checks, computed values or SQL fragments for analytics queries.
//! Also maps value types to analytics table columns.

pub mod analytics;
pub mod analyzer;
pub mod ast;
pub mod config;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod registry;
pub mod sql;
pub mod store;

// Re-export main types
pub use analytics::{ColumnDataType, DatabaseInfo, ValueTypeSqlMapper};
pub use analyzer::{IdentifierCollector, any_value_exists_clause, collect_identifiers};
pub use evaluator::{CompilationContext, CompilationMode, Compiled, ExpressionCompiler};
pub use model::{
    AnalyticsType, ExpressionValue, MetadataProvider, ProgramIndicator, ReportingWindow,
    ResultType, ValueSource, ValueType,
};
pub use parser::{ParseError, parse};
pub use registry::{ExpressionRegistry, program_indicator_registry};
pub use store::{InMemoryProgramIndicatorStore, ProgramIndicatorStore};

pub mod engine;
pub mod error;

pub use config::EngineConfig;
pub use engine::*;
pub use error::*;
