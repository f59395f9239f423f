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

//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use indicator_expression::model::{
    Constant, DataElement, InMemoryMetadata, ProgramStage, RelationshipType,
    TrackedEntityAttribute, ValueType,
};
use indicator_expression::{
    EngineConfig, InMemoryProgramIndicatorStore, ProgramIndicatorEngine,
};
use std::sync::Arc;

/// Program all fixture stages belong to
pub const PROGRAM: &str = "Prog";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn data_element(uid: &str, name: &str, value_type: ValueType) -> DataElement {
    DataElement {
        uid: uid.to_string(),
        name: name.to_string(),
        value_type,
    }
}

fn attribute(uid: &str, name: &str, value_type: ValueType) -> TrackedEntityAttribute {
    TrackedEntityAttribute {
        uid: uid.to_string(),
        name: name.to_string(),
        value_type,
    }
}

fn stage(uid: &str, name: &str) -> ProgramStage {
    ProgramStage {
        uid: uid.to_string(),
        name: name.to_string(),
        program_uid: Some(PROGRAM.to_string()),
    }
}

/// Metadata with two stages, three data elements, two attributes, a constant
/// and a relationship type
pub fn metadata() -> InMemoryMetadata {
    InMemoryMetadata::new()
        .with_program_stage(stage("ps1", "Birth"))
        .with_program_stage(stage("ps2", "Follow-up"))
        .with_data_element(data_element("de1", "Weight", ValueType::Number))
        .with_data_element(data_element("de2", "Smoker", ValueType::Boolean))
        .with_data_element(data_element("de3", "Notes", ValueType::Text))
        .with_attribute(attribute("at1", "Gender", ValueType::Text))
        .with_attribute(attribute("at2", "Score", ValueType::Integer))
        .with_constant(Constant {
            uid: "c1".to_string(),
            name: "Ten".to_string(),
            value: 10.0,
        })
        .with_relationship_type(RelationshipType {
            uid: "rt1".to_string(),
            name: "Mother-child".to_string(),
        })
}

pub fn engine_with_config(config: EngineConfig) -> ProgramIndicatorEngine {
    ProgramIndicatorEngine::with_config(
        Arc::new(metadata()),
        Arc::new(InMemoryProgramIndicatorStore::new()),
        config,
    )
}

/// Engine with the default configuration, null replacement on
pub fn engine() -> ProgramIndicatorEngine {
    engine_with_config(EngineConfig::default())
}
