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

//! Provider traits through which the compiler reaches metadata and live data
//!
//! Both traits are synchronous; lookups return `None` when nothing is known.

use super::metadata::{
    Constant, DataElement, ProgramStage, RelationshipType, TrackedEntityAttribute,
};
use super::value::ExpressionValue;
use super::variable::ProgramVariable;
use chrono::NaiveDate;

/// Metadata lookup by uid
pub trait MetadataProvider: Send + Sync {
    /// Data element by uid
    fn data_element(&self, uid: &str) -> Option<DataElement>;

    /// Program stage by uid
    fn program_stage(&self, uid: &str) -> Option<ProgramStage>;

    /// Tracked entity attribute by uid
    fn attribute(&self, uid: &str) -> Option<TrackedEntityAttribute>;

    /// Constant by uid
    fn constant(&self, uid: &str) -> Option<Constant>;

    /// Relationship type by uid
    fn relationship_type(&self, uid: &str) -> Option<RelationshipType>;
}

/// Live values for evaluate mode
///
/// A `None` return is read as the null value.
pub trait ValueSource: Send + Sync {
    /// Latest value of a data element in a program stage
    fn stage_element_value(
        &self,
        program_stage_uid: &str,
        data_element_uid: &str,
    ) -> Option<ExpressionValue>;

    /// All values of a data element in a program stage, used by aggregates
    fn stage_element_values(
        &self,
        program_stage_uid: &str,
        data_element_uid: &str,
    ) -> Vec<ExpressionValue> {
        self.stage_element_value(program_stage_uid, data_element_uid)
            .into_iter()
            .collect()
    }

    /// Value of a tracked entity attribute
    fn attribute_value(&self, attribute_uid: &str) -> Option<ExpressionValue>;

    /// Event date of the latest event in a program stage
    fn stage_event_date(&self, program_stage_uid: &str) -> Option<NaiveDate>;

    /// Value of a program variable
    fn variable_value(&self, variable: ProgramVariable) -> Option<ExpressionValue>;

    /// Number of relationships, optionally of one type
    fn relationship_count(&self, relationship_type_uid: Option<&str>) -> Option<f64>;
}
