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

//! In-memory providers for testing and the command line tool

use super::metadata::{
    Constant, DataElement, ProgramStage, RelationshipType, TrackedEntityAttribute,
};
use super::provider::{MetadataProvider, ValueSource};
use super::value::ExpressionValue;
use super::variable::ProgramVariable;
use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Metadata as stored in a JSON document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataDocument {
    /// Data elements
    pub data_elements: Vec<DataElement>,
    /// Program stages
    pub program_stages: Vec<ProgramStage>,
    /// Tracked entity attributes
    pub attributes: Vec<TrackedEntityAttribute>,
    /// Constants
    pub constants: Vec<Constant>,
    /// Relationship types
    pub relationship_types: Vec<RelationshipType>,
}

/// Metadata provider backed by hash maps
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadata {
    data_elements: FxHashMap<String, DataElement>,
    program_stages: FxHashMap<String, ProgramStage>,
    attributes: FxHashMap<String, TrackedEntityAttribute>,
    constants: FxHashMap<String, Constant>,
    relationship_types: FxHashMap<String, RelationshipType>,
}

impl InMemoryMetadata {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a data element
    pub fn with_data_element(mut self, data_element: DataElement) -> Self {
        self.data_elements
            .insert(data_element.uid.clone(), data_element);
        self
    }

    /// Add a program stage
    pub fn with_program_stage(mut self, program_stage: ProgramStage) -> Self {
        self.program_stages
            .insert(program_stage.uid.clone(), program_stage);
        self
    }

    /// Add a tracked entity attribute
    pub fn with_attribute(mut self, attribute: TrackedEntityAttribute) -> Self {
        self.attributes.insert(attribute.uid.clone(), attribute);
        self
    }

    /// Add a constant
    pub fn with_constant(mut self, constant: Constant) -> Self {
        self.constants.insert(constant.uid.clone(), constant);
        self
    }

    /// Add a relationship type
    pub fn with_relationship_type(mut self, relationship_type: RelationshipType) -> Self {
        self.relationship_types
            .insert(relationship_type.uid.clone(), relationship_type);
        self
    }

    /// Build from a metadata document
    pub fn from_document(document: MetadataDocument) -> Self {
        let mut metadata = Self::new();
        for data_element in document.data_elements {
            metadata = metadata.with_data_element(data_element);
        }
        for program_stage in document.program_stages {
            metadata = metadata.with_program_stage(program_stage);
        }
        for attribute in document.attributes {
            metadata = metadata.with_attribute(attribute);
        }
        for constant in document.constants {
            metadata = metadata.with_constant(constant);
        }
        for relationship_type in document.relationship_types {
            metadata = metadata.with_relationship_type(relationship_type);
        }
        metadata
    }

    /// Parse a JSON metadata document
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let document: MetadataDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(document))
    }
}

impl MetadataProvider for InMemoryMetadata {
    fn data_element(&self, uid: &str) -> Option<DataElement> {
        self.data_elements.get(uid).cloned()
    }

    fn program_stage(&self, uid: &str) -> Option<ProgramStage> {
        self.program_stages.get(uid).cloned()
    }

    fn attribute(&self, uid: &str) -> Option<TrackedEntityAttribute> {
        self.attributes.get(uid).cloned()
    }

    fn constant(&self, uid: &str) -> Option<Constant> {
        self.constants.get(uid).cloned()
    }

    fn relationship_type(&self, uid: &str) -> Option<RelationshipType> {
        self.relationship_types.get(uid).cloned()
    }
}

/// Value source backed by hash maps
///
/// Stage values are keyed `programStageUid.dataElementUid`, latest value last.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InMemoryValues {
    stage_values: FxHashMap<String, Vec<ExpressionValue>>,
    attributes: FxHashMap<String, ExpressionValue>,
    event_dates: FxHashMap<String, NaiveDate>,
    variables: FxHashMap<String, ExpressionValue>,
    relationship_counts: FxHashMap<String, f64>,
}

impl InMemoryValues {
    /// Create an empty value source
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value of a data element in a program stage
    pub fn with_stage_value(
        mut self,
        program_stage_uid: &str,
        data_element_uid: &str,
        value: impl Into<ExpressionValue>,
    ) -> Self {
        self.stage_values
            .entry(stage_key(program_stage_uid, data_element_uid))
            .or_default()
            .push(value.into());
        self
    }

    /// Set an attribute value
    pub fn with_attribute(
        mut self,
        attribute_uid: &str,
        value: impl Into<ExpressionValue>,
    ) -> Self {
        self.attributes
            .insert(attribute_uid.to_string(), value.into());
        self
    }

    /// Set the latest event date of a program stage
    pub fn with_event_date(mut self, program_stage_uid: &str, date: NaiveDate) -> Self {
        self.event_dates.insert(program_stage_uid.to_string(), date);
        self
    }

    /// Set a program variable value
    pub fn with_variable(
        mut self,
        variable: ProgramVariable,
        value: impl Into<ExpressionValue>,
    ) -> Self {
        self.variables
            .insert(variable.name().to_string(), value.into());
        self
    }

    /// Set a relationship count; an empty type uid counts all relationships
    pub fn with_relationship_count(mut self, relationship_type_uid: &str, count: f64) -> Self {
        self.relationship_counts
            .insert(relationship_type_uid.to_string(), count);
        self
    }

    /// Parse a JSON value document
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn stage_key(program_stage_uid: &str, data_element_uid: &str) -> String {
    format!("{program_stage_uid}.{data_element_uid}")
}

impl ValueSource for InMemoryValues {
    fn stage_element_value(
        &self,
        program_stage_uid: &str,
        data_element_uid: &str,
    ) -> Option<ExpressionValue> {
        self.stage_values
            .get(&stage_key(program_stage_uid, data_element_uid))
            .and_then(|values| values.last().cloned())
    }

    fn stage_element_values(
        &self,
        program_stage_uid: &str,
        data_element_uid: &str,
    ) -> Vec<ExpressionValue> {
        self.stage_values
            .get(&stage_key(program_stage_uid, data_element_uid))
            .cloned()
            .unwrap_or_default()
    }

    fn attribute_value(&self, attribute_uid: &str) -> Option<ExpressionValue> {
        self.attributes.get(attribute_uid).cloned()
    }

    fn stage_event_date(&self, program_stage_uid: &str) -> Option<NaiveDate> {
        self.event_dates.get(program_stage_uid).copied()
    }

    fn variable_value(&self, variable: ProgramVariable) -> Option<ExpressionValue> {
        self.variables.get(variable.name()).cloned()
    }

    fn relationship_count(&self, relationship_type_uid: Option<&str>) -> Option<f64> {
        self.relationship_counts
            .get(relationship_type_uid.unwrap_or(""))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::ValueType;

    #[test]
    fn test_metadata_from_json() {
        let metadata = InMemoryMetadata::from_json(
            r#"{
                "dataElements": [{"uid": "a3kGcGDCuk6", "name": "MCH Apgar Score", "valueType": "NUMBER"}],
                "programStages": [{"uid": "A03MvHHogjR", "name": "Birth"}]
            }"#,
        )
        .unwrap();

        let data_element = metadata.data_element("a3kGcGDCuk6").unwrap();
        assert_eq!(data_element.value_type, ValueType::Number);
        assert_eq!(metadata.program_stage("A03MvHHogjR").unwrap().name, "Birth");
        assert!(metadata.constant("missing").is_none());
    }

    #[test]
    fn test_values_latest_last() {
        let values = InMemoryValues::new()
            .with_stage_value("ps", "de", 3.0)
            .with_stage_value("ps", "de", 5.0)
            .with_relationship_count("", 2.0);

        assert_eq!(
            values.stage_element_value("ps", "de"),
            Some(ExpressionValue::Number(5.0))
        );
        assert_eq!(values.stage_element_values("ps", "de").len(), 2);
        assert_eq!(values.relationship_count(None), Some(2.0));
        assert_eq!(values.relationship_count(Some("other")), None);
    }

    #[test]
    fn test_values_from_json() {
        let values = InMemoryValues::from_json(
            r#"{
                "stageValues": {"ps.de": [1, 2]},
                "variables": {"event_count": 4},
                "eventDates": {"ps": "2024-02-01"}
            }"#,
        )
        .unwrap();
        assert_eq!(
            values.variable_value(ProgramVariable::EventCount),
            Some(ExpressionValue::Number(4.0))
        );
        assert_eq!(
            values.stage_event_date("ps"),
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
    }
}
