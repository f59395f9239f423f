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

//! Metadata objects referenced from expressions

use super::types::ValueType;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Prefix of per-program event analytics tables
pub const EVENT_TABLE_PREFIX: &str = "analytics_event_";

/// Data element captured in events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataElement {
    /// Uid
    pub uid: String,
    /// Display name
    pub name: String,
    /// Declared value type
    pub value_type: ValueType,
}

/// Program stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramStage {
    /// Uid
    pub uid: String,
    /// Display name
    pub name: String,
    /// Owning program uid
    #[serde(default)]
    pub program_uid: Option<String>,
}

/// Tracked entity attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEntityAttribute {
    /// Uid
    pub uid: String,
    /// Display name
    pub name: String,
    /// Declared value type
    pub value_type: ValueType,
}

/// Named numeric constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constant {
    /// Uid
    pub uid: String,
    /// Display name
    pub name: String,
    /// Constant value
    pub value: f64,
}

/// Relationship type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipType {
    /// Uid
    pub uid: String,
    /// Display name
    pub name: String,
}

/// Level at which an indicator is aggregated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalyticsType {
    /// One row per event
    #[default]
    Event,
    /// One row per enrollment
    Enrollment,
}

/// Date column a period boundary applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundaryTarget {
    /// Event date
    EventDate,
    /// Enrollment date
    EnrollmentDate,
    /// Incident date
    IncidentDate,
}

/// Position of a boundary relative to the reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundaryType {
    /// Strictly before the first day of the period
    BeforeStartOfReportingPeriod,
    /// On or before the last day of the period
    BeforeEndOfReportingPeriod,
    /// On or after the first day of the period
    AfterStartOfReportingPeriod,
    /// Strictly after the last day of the period
    AfterEndOfReportingPeriod,
}

/// Reporting window a query is generated for, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingWindow {
    /// First day of the period
    pub start: NaiveDate,
    /// Last day of the period
    pub end: NaiveDate,
}

impl ReportingWindow {
    /// Create a reporting window
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

/// Restricts the events or enrollments an indicator looks at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPeriodBoundary {
    /// Date column the boundary applies to
    pub boundary_target: BoundaryTarget,
    /// Position relative to the reporting period
    pub boundary_type: BoundaryType,
    /// Shift of the boundary in days
    #[serde(default)]
    pub offset_days: i64,
}

impl AnalyticsPeriodBoundary {
    /// Create a boundary without offset
    pub fn new(boundary_target: BoundaryTarget, boundary_type: BoundaryType) -> Self {
        Self {
            boundary_target,
            boundary_type,
            offset_days: 0,
        }
    }

    /// Start boundaries keep dates on or after the boundary date
    pub fn is_start_boundary(&self) -> bool {
        matches!(
            self.boundary_type,
            BoundaryType::AfterStartOfReportingPeriod | BoundaryType::AfterEndOfReportingPeriod
        )
    }

    /// Analytics column the boundary compares
    pub fn column(&self) -> &'static str {
        match self.boundary_target {
            BoundaryTarget::EventDate => "executiondate",
            BoundaryTarget::EnrollmentDate => "enrollmentdate",
            BoundaryTarget::IncidentDate => "incidentdate",
        }
    }

    /// Date compared against; end-of-period boundaries point at the day after the period
    pub fn boundary_date(&self, window: &ReportingWindow) -> NaiveDate {
        let base = match self.boundary_type {
            BoundaryType::BeforeStartOfReportingPeriod
            | BoundaryType::AfterStartOfReportingPeriod => window.start,
            BoundaryType::BeforeEndOfReportingPeriod | BoundaryType::AfterEndOfReportingPeriod => {
                window.end.checked_add_days(Days::new(1)).unwrap_or(window.end)
            }
        };
        shift_days(base, self.offset_days)
    }
}

fn shift_days(date: NaiveDate, offset: i64) -> NaiveDate {
    let shifted = if offset >= 0 {
        date.checked_add_days(Days::new(offset.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(offset.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Program indicator definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramIndicator {
    /// Store-assigned numeric id
    #[serde(default)]
    pub id: u64,
    /// Uid
    pub uid: String,
    /// Display name
    pub name: String,
    /// Program the indicator belongs to
    pub program_uid: String,
    /// Numeric expression
    pub expression: String,
    /// Optional boolean filter
    #[serde(default)]
    pub filter: Option<String>,
    /// Aggregation level
    #[serde(default)]
    pub analytics_type: AnalyticsType,
    /// Period boundaries
    #[serde(default)]
    pub boundaries: Vec<AnalyticsPeriodBoundary>,
}

impl ProgramIndicator {
    /// Create an event indicator without filter and boundaries
    pub fn new(
        uid: impl Into<String>,
        name: impl Into<String>,
        program_uid: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            uid: uid.into(),
            name: name.into(),
            program_uid: program_uid.into(),
            expression: expression.into(),
            filter: None,
            analytics_type: AnalyticsType::Event,
            boundaries: Vec::new(),
        }
    }

    /// Set the filter
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the analytics type
    pub fn with_analytics_type(mut self, analytics_type: AnalyticsType) -> Self {
        self.analytics_type = analytics_type;
        self
    }

    /// Add a period boundary
    pub fn with_boundary(mut self, boundary: AnalyticsPeriodBoundary) -> Self {
        self.boundaries.push(boundary);
        self
    }

    /// Event analytics table of the indicator's program
    pub fn event_table_name(&self) -> String {
        format!("{EVENT_TABLE_PREFIX}{}", self.program_uid.to_lowercase())
    }

    /// Boundaries on the event date
    pub fn event_boundaries(&self) -> impl Iterator<Item = &AnalyticsPeriodBoundary> {
        self.boundaries
            .iter()
            .filter(|b| b.boundary_target == BoundaryTarget::EventDate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> ReportingWindow {
        ReportingWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
    }

    #[test]
    fn test_boundary_dates() {
        let before_end = AnalyticsPeriodBoundary::new(
            BoundaryTarget::EventDate,
            BoundaryType::BeforeEndOfReportingPeriod,
        );
        assert!(!before_end.is_start_boundary());
        assert_eq!(
            before_end.boundary_date(&window()),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
        );

        let after_start = AnalyticsPeriodBoundary {
            boundary_target: BoundaryTarget::EnrollmentDate,
            boundary_type: BoundaryType::AfterStartOfReportingPeriod,
            offset_days: -10,
        };
        assert!(after_start.is_start_boundary());
        assert_eq!(after_start.column(), "enrollmentdate");
        assert_eq!(
            after_start.boundary_date(&window()),
            NaiveDate::from_ymd_opt(2023, 12, 22).unwrap()
        );
    }

    #[test]
    fn test_indicator_from_json() {
        let json = r#"{
            "uid": "Uvn6LCg7dVU",
            "name": "ANC visits",
            "programUid": "IpHINAT79UW",
            "expression": "d2:count(#{A03MvHHogjR.a3kGcGDCuk6})",
            "analyticsType": "ENROLLMENT",
            "boundaries": [
                {"boundaryTarget": "EVENT_DATE", "boundaryType": "AFTER_START_OF_REPORTING_PERIOD"}
            ]
        }"#;
        let indicator: ProgramIndicator = serde_json::from_str(json).unwrap();
        assert_eq!(indicator.analytics_type, AnalyticsType::Enrollment);
        assert_eq!(indicator.event_table_name(), "analytics_event_iphinat79uw");
        assert_eq!(indicator.event_boundaries().count(), 1);
        assert_eq!(indicator.filter, None);
    }
}
