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

//! Program variables referenced as `V{name}`

use super::types::ValueKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in program variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramVariable {
    /// Last day of the reporting period
    AnalyticsPeriodEnd,
    /// First day of the reporting period
    AnalyticsPeriodStart,
    /// Creation date of the event or enrollment
    CreationDate,
    /// Date the query runs
    CurrentDate,
    /// Event due date
    DueDate,
    /// Number of enrollments
    EnrollmentCount,
    /// Enrollment date
    EnrollmentDate,
    /// Enrollment status
    EnrollmentStatus,
    /// Number of events
    EventCount,
    /// Event execution date
    ExecutionDate,
    /// Event date
    EventDate,
    /// Incident date
    IncidentDate,
    /// Number of organisation units
    OrgUnitCount,
    /// Program stage uid of the event
    ProgramStageId,
    /// Program stage name of the event
    ProgramStageName,
    /// Last synchronisation date
    SyncDate,
    /// Number of tracked entity instances
    TeiCount,
    /// Number of non-null values among referenced items
    ValueCount,
    /// Number of zero or positive values among referenced items
    ZeroPosValueCount,
}

impl ProgramVariable {
    /// Every variable, in name order
    pub const ALL: [ProgramVariable; 19] = [
        Self::AnalyticsPeriodEnd,
        Self::AnalyticsPeriodStart,
        Self::CreationDate,
        Self::CurrentDate,
        Self::DueDate,
        Self::EnrollmentCount,
        Self::EnrollmentDate,
        Self::EnrollmentStatus,
        Self::EventCount,
        Self::ExecutionDate,
        Self::EventDate,
        Self::IncidentDate,
        Self::OrgUnitCount,
        Self::ProgramStageId,
        Self::ProgramStageName,
        Self::SyncDate,
        Self::TeiCount,
        Self::ValueCount,
        Self::ZeroPosValueCount,
    ];

    /// Name as written inside `V{}`
    pub fn name(self) -> &'static str {
        match self {
            Self::AnalyticsPeriodEnd => "analytics_period_end",
            Self::AnalyticsPeriodStart => "analytics_period_start",
            Self::CreationDate => "creation_date",
            Self::CurrentDate => "current_date",
            Self::DueDate => "due_date",
            Self::EnrollmentCount => "enrollment_count",
            Self::EnrollmentDate => "enrollment_date",
            Self::EnrollmentStatus => "enrollment_status",
            Self::EventCount => "event_count",
            Self::ExecutionDate => "execution_date",
            Self::EventDate => "event_date",
            Self::IncidentDate => "incident_date",
            Self::OrgUnitCount => "org_unit_count",
            Self::ProgramStageId => "program_stage_id",
            Self::ProgramStageName => "program_stage_name",
            Self::SyncDate => "sync_date",
            Self::TeiCount => "tei_count",
            Self::ValueCount => "value_count",
            Self::ZeroPosValueCount => "zero_pos_value_count",
        }
    }

    /// Look up a variable by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|variable| variable.name() == name)
    }

    /// Label used in descriptions
    pub fn label(self) -> &'static str {
        match self {
            Self::AnalyticsPeriodEnd => "Analytics period end",
            Self::AnalyticsPeriodStart => "Analytics period start",
            Self::CreationDate => "Creation date",
            Self::CurrentDate => "Current date",
            Self::DueDate => "Due date",
            Self::EnrollmentCount => "Enrollment count",
            Self::EnrollmentDate => "Enrollment date",
            Self::EnrollmentStatus => "Enrollment status",
            Self::EventCount => "Event count",
            Self::ExecutionDate => "Execution date",
            Self::EventDate => "Event date",
            Self::IncidentDate => "Incident date",
            Self::OrgUnitCount => "Organisation unit count",
            Self::ProgramStageId => "Program stage id",
            Self::ProgramStageName => "Program stage name",
            Self::SyncDate => "Sync date",
            Self::TeiCount => "Tracked entity instance count",
            Self::ValueCount => "Value count",
            Self::ZeroPosValueCount => "Zero or positive value count",
        }
    }

    /// Kind of the variable's value
    pub fn kind(self) -> ValueKind {
        match self {
            Self::AnalyticsPeriodEnd
            | Self::AnalyticsPeriodStart
            | Self::CreationDate
            | Self::CurrentDate
            | Self::DueDate
            | Self::EnrollmentDate
            | Self::ExecutionDate
            | Self::EventDate
            | Self::IncidentDate
            | Self::SyncDate => ValueKind::Date,
            Self::EnrollmentStatus | Self::ProgramStageId | Self::ProgramStageName => {
                ValueKind::Text
            }
            Self::EnrollmentCount
            | Self::EventCount
            | Self::OrgUnitCount
            | Self::TeiCount
            | Self::ValueCount
            | Self::ZeroPosValueCount => ValueKind::Number,
        }
    }
}

impl fmt::Display for ProgramVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip_covers_all() {
        for variable in ProgramVariable::ALL {
            assert_eq!(ProgramVariable::from_name(variable.name()), Some(variable));
        }
        assert_eq!(ProgramVariable::from_name("no_such_variable"), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(ProgramVariable::EventDate.kind(), ValueKind::Date);
        assert_eq!(ProgramVariable::TeiCount.kind(), ValueKind::Number);
        assert_eq!(ProgramVariable::EnrollmentStatus.kind(), ValueKind::Text);
    }
}
