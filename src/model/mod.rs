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

//! Data model: values, value types, metadata and the providers the compiler
//! reads them through

pub mod metadata;
pub mod mock_provider;
pub mod provider;
pub mod type_coercion;
pub mod types;
pub mod value;
pub mod variable;

pub use metadata::{
    AnalyticsPeriodBoundary, AnalyticsType, BoundaryTarget, BoundaryType, Constant, DataElement,
    ProgramIndicator, ProgramStage, RelationshipType, ReportingWindow, TrackedEntityAttribute,
};
pub use mock_provider::{InMemoryMetadata, InMemoryValues, MetadataDocument};
pub use provider::{MetadataProvider, ValueSource};
pub use type_coercion::{ResultType, TypeCoercion};
pub use types::{ValueKind, ValueType};
pub use value::ExpressionValue;
pub use variable::ProgramVariable;
