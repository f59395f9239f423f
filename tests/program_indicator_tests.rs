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

//! End-to-end tests of the program indicator engine

mod common;

use common::{PROGRAM, date, engine, engine_with_config};
use indicator_expression::model::{
    AnalyticsPeriodBoundary, BoundaryTarget, BoundaryType, InMemoryValues, ProgramVariable,
};
use indicator_expression::{
    AnalyticsType, EngineConfig, ExpressionError, ExpressionValue, ProgramIndicator,
    ReferenceKind, ReportingWindow, ResultType,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn event_indicator() -> ProgramIndicator {
    ProgramIndicator::new("pi1", "Weight indicator", PROGRAM, "#{ps1.de1}")
}

fn enrollment_indicator() -> ProgramIndicator {
    event_indicator().with_analytics_type(AnalyticsType::Enrollment)
}

fn window() -> ReportingWindow {
    ReportingWindow::new(date(2024, 1, 1), date(2024, 3, 31))
}

fn sql(expression: &str, indicator: &ProgramIndicator) -> String {
    engine()
        .analytics_sql(expression, indicator, date(2024, 1, 1), date(2024, 3, 31))
        .unwrap()
}

fn values() -> InMemoryValues {
    InMemoryValues::new()
        .with_stage_value("ps1", "de1", 2.0)
        .with_stage_value("ps1", "de1", 4.0)
        .with_stage_value("ps1", "de1", 9.0)
        .with_stage_value("ps2", "de1", -3.0)
        .with_attribute("at1", "F")
        .with_event_date("ps1", date(2024, 3, 1))
        .with_variable(ProgramVariable::EnrollmentDate, date(2024, 1, 15))
        .with_relationship_count("rt1", 3.0)
        .with_relationship_count("", 5.0)
}

fn evaluate(expression: &str) -> ExpressionValue {
    engine()
        .evaluate(expression, &values(), None, Some(window()))
        .unwrap()
}

// Descriptions

#[test]
fn describes_items_constants_and_variables() {
    let engine = engine();
    assert_eq!(
        engine
            .expression_description("#{ps1.de1} + A{at2} * C{c1} - V{tei_count}")
            .unwrap(),
        "Birth.Weight + Score * Ten - Tracked entity instance count"
    );
    assert_eq!(
        engine
            .filter_description("A{at1} == 'F' and PS_EVENTDATE:ps1 > V{enrollment_date}")
            .unwrap(),
        "Gender == 'F' and Birth event date > Enrollment date"
    );
}

#[test]
fn validation_reports_item_labels() {
    let descriptions = engine()
        .validate("d2:hasValue(#{ps1.de2}) && #{ps2.de3} != ''", Some(ResultType::Boolean))
        .unwrap();
    assert_eq!(
        descriptions.get("#{ps1.de2}").map(String::as_str),
        Some("Birth.Smoker")
    );
    assert_eq!(
        descriptions.get("#{ps2.de3}").map(String::as_str),
        Some("Follow-up.Notes")
    );
}

#[rstest]
#[case("#{ps1.de1} * 2", true)]
#[case("d2:count(#{ps1.de1}) / V{event_count}", true)]
#[case("d2:daysBetween(V{enrollment_date}, PS_EVENTDATE:ps1)", true)]
#[case("d2:condition('#{ps1.de2}', 1, 0)", true)]
#[case("#{ps1.de1} > 2", false)]
#[case("A{at1}", false)]
#[case("d2:nope(1)", false)]
#[case("#{ps1.de1} +", false)]
fn expression_validity(#[case] expression: &str, #[case] valid: bool) {
    assert_eq!(engine().expression_is_valid(expression), valid);
}

#[rstest]
#[case("A{at1} == 'M'", true)]
#[case("d2:hasValue(A{at2}) and #{ps1.de1} >= 4", true)]
#[case("#{ps1.de1}", false)]
#[case("V{nope} == 1", false)]
fn filter_validity(#[case] filter: &str, #[case] valid: bool) {
    assert_eq!(engine().filter_is_valid(filter), valid);
}

// Errors

#[test]
fn unresolved_references_name_their_kind() {
    let engine = engine();
    let cases = [
        ("d2:nope(1)", ReferenceKind::Function, "d2:nope"),
        ("V{nope}", ReferenceKind::Variable, "nope"),
        ("#{ps1.nope}", ReferenceKind::DataElement, "nope"),
        ("#{nope.de1}", ReferenceKind::ProgramStage, "nope"),
        ("A{nope}", ReferenceKind::Attribute, "nope"),
        ("C{nope}", ReferenceKind::Constant, "nope"),
    ];
    for (expression, expected_kind, expected_identifier) in cases {
        match engine.validate(expression, None) {
            Err(ExpressionError::UnresolvedReference { kind, identifier }) => {
                assert_eq!(kind, expected_kind, "{expression}");
                assert_eq!(identifier, expected_identifier, "{expression}");
            }
            other => panic!("expected unresolved reference for {expression}, got {other:?}"),
        }
    }
}

#[test]
fn argument_errors() {
    let engine = engine();
    assert!(matches!(
        engine.validate("d2:count(A{at1})", None),
        Err(ExpressionError::InvalidArgument { .. })
    ));
    assert!(matches!(
        engine.validate("d2:count(#{ps1.de1}, 1)", None),
        Err(ExpressionError::Arity { .. })
    ));
    assert!(matches!(
        engine.validate("d2:countIfCondition(#{ps1.de1}, '+ 5')", None),
        Err(ExpressionError::InvalidArgument { .. })
    ));
    assert!(matches!(
        engine.validate("d2:relationshipCount('missing')", None),
        Err(ExpressionError::UnresolvedReference {
            kind: ReferenceKind::RelationshipType,
            ..
        })
    ));
}

#[test]
fn type_errors() {
    let engine = engine();
    assert!(matches!(
        engine.validate("1 + true", None),
        Err(ExpressionError::TypeMismatch { .. })
    ));
    assert!(matches!(
        engine.evaluate("1 + true", &values(), None, None),
        Err(ExpressionError::TypeMismatch { .. })
    ));
}

#[test]
fn parse_errors_are_reported() {
    assert!(matches!(
        engine().validate("(1 + 2", None),
        Err(ExpressionError::Parse(_))
    ));
    assert!(matches!(
        engine().filter_description("PS_EVENTDATE: ps1 > V{enrollment_date}"),
        Err(ExpressionError::Parse(_))
    ));
}

// SQL

#[test]
fn event_sql_replaces_nulls() {
    let indicator = event_indicator();
    assert_eq!(sql("#{ps1.de1} * 2", &indicator), "coalesce(\"de1\", 0) * 2");
    assert_eq!(sql("A{at1}", &indicator), "coalesce(\"at1\", '')");
    assert_eq!(sql("C{c1} + 1", &indicator), "10 + 1");
}

#[test]
fn sql_keeps_nulls_when_configured() {
    let sql = engine_with_config(EngineConfig::raw_nulls())
        .analytics_sql(
            "#{ps1.de1} * 2",
            &event_indicator(),
            date(2024, 1, 1),
            date(2024, 3, 31),
        )
        .unwrap();
    assert_eq!(sql, "\"de1\" * 2");
}

#[test]
fn count_sql() {
    let indicator = event_indicator();
    assert_eq!(
        sql("d2:count(#{ps1.de1})", &indicator),
        "(select count(\"de1\") from analytics_event_prog where analytics_event_prog.pi = ax.pi \
         and \"de1\" is not null and ps = 'ps1')"
    );
    assert_eq!(
        sql("d2:countIfCondition(#{ps1.de1}, '>5')", &indicator),
        "(select count(\"de1\") from analytics_event_prog where analytics_event_prog.pi = ax.pi \
         and \"de1\" is not null and \"de1\" > 5 and ps = 'ps1')"
    );
    assert_eq!(
        sql("d2:countIfValue(#{ps1.de1}, 3)", &indicator),
        "(select count(\"de1\") from analytics_event_prog where analytics_event_prog.pi = ax.pi \
         and \"de1\" is not null and \"de1\" = 3 and ps = 'ps1')"
    );
}

#[test]
fn enrollment_sql_uses_latest_event_subselect() {
    let indicator = enrollment_indicator().with_boundary(AnalyticsPeriodBoundary::new(
        BoundaryTarget::EventDate,
        BoundaryType::BeforeEndOfReportingPeriod,
    ));
    assert_eq!(
        sql("d2:hasValue(#{ps1.de1})", &indicator),
        "((select \"de1\" from analytics_event_prog where analytics_event_prog.pi = ax.pi \
         and \"de1\" is not null and ps = 'ps1' \
         and \"executiondate\" < cast('2024-04-01' as date) \
         order by executiondate desc limit 1 ) is not null)"
    );
}

#[test]
fn variable_sql() {
    let indicator = event_indicator();
    assert_eq!(
        sql("d2:daysBetween(V{enrollment_date}, V{event_date})", &indicator),
        "(cast(executiondate as date) - cast(enrollmentdate as date))"
    );
    assert_eq!(sql("V{analytics_period_start}", &indicator), "'2024-01-01'");
    assert_eq!(sql("V{event_count}", &indicator), "distinct psi");
    assert_eq!(sql("V{enrollment_count}", &indicator), "distinct pi");
    assert_eq!(sql("V{enrollment_count}", &enrollment_indicator()), "pi");
}

#[test]
fn value_count_sql_covers_collected_identifiers() {
    assert_eq!(
        sql("#{ps1.de1} + A{at2} + V{value_count}", &event_indicator()),
        "coalesce(\"de1\", 0) + coalesce(\"at2\", 0) + \
         nullif(cast((case when \"de1\" is not null then 1 else 0 end + \
         case when \"at2\" is not null then 1 else 0 end) as double precision),0)"
    );
    assert_eq!(sql("V{value_count}", &event_indicator()), "0");
}

#[test]
fn zpvc_sql() {
    assert_eq!(
        sql("d2:zpvc(#{ps1.de1}, A{at2})", &event_indicator()),
        "nullif(cast((case when \"de1\" >= 0 then 1 else 0 end + \
         case when \"at2\" >= 0 then 1 else 0 end) as double precision),0)"
    );
}

#[test]
fn sql_is_deterministic() {
    let expression = "d2:zing(#{ps1.de1}) + d2:oizp(A{at2}) + V{zero_pos_value_count}";
    let indicator = enrollment_indicator();
    assert_eq!(sql(expression, &indicator), sql(expression, &indicator));
}

// Evaluation

#[rstest]
#[case("#{ps1.de1}", ExpressionValue::Number(9.0))]
#[case("avg(#{ps1.de1})", ExpressionValue::Number(5.0))]
#[case("d2:count(#{ps1.de1})", ExpressionValue::Number(3.0))]
#[case("d2:countIfCondition(#{ps1.de1}, '>3')", ExpressionValue::Number(2.0))]
#[case("d2:countIfValue(#{ps1.de1}, 4)", ExpressionValue::Number(1.0))]
#[case("d2:zing(#{ps2.de1})", ExpressionValue::Number(0.0))]
#[case("d2:oizp(#{ps1.de1})", ExpressionValue::Number(1.0))]
#[case("d2:condition('#{ps1.de1} > 5', 1, 0)", ExpressionValue::Number(1.0))]
#[case("d2:hasValue(#{ps1.de3})", ExpressionValue::Boolean(false))]
#[case("A{at1} == 'F'", ExpressionValue::Boolean(true))]
#[case("d2:daysBetween(PS_EVENTDATE:ps1, V{analytics_period_end})", ExpressionValue::Number(30.0))]
#[case("d2:monthsBetween(V{enrollment_date}, PS_EVENTDATE:ps1)", ExpressionValue::Number(1.0))]
#[case("d2:relationshipCount('rt1')", ExpressionValue::Number(3.0))]
#[case("d2:relationshipCount()", ExpressionValue::Number(5.0))]
fn evaluates_against_values(#[case] expression: &str, #[case] expected: ExpressionValue) {
    assert_eq!(evaluate(expression), expected);
}

#[test]
fn evaluation_checks_result_type() {
    let engine = engine();
    assert!(
        engine
            .evaluate("#{ps1.de1} > 1", &values(), Some(ResultType::Double), None)
            .is_err()
    );
    assert_eq!(
        engine
            .evaluate("#{ps1.de1} > 1", &values(), Some(ResultType::Boolean), None)
            .unwrap(),
        ExpressionValue::Boolean(true)
    );
}

#[test]
fn period_variables_need_a_window() {
    assert!(matches!(
        engine().evaluate("V{analytics_period_start}", &values(), None, None),
        Err(ExpressionError::MissingContext { .. })
    ));
}

// Identifiers

#[test]
fn identifiers_by_analytics_type() {
    let engine = engine();
    let expression = "#{ps1.de1} + A{at2} + d2:count(#{ps2.de3})";
    let event: Vec<_> = engine
        .data_element_and_attribute_identifiers(expression, AnalyticsType::Event)
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(event, vec!["de1", "at2", "de3"]);

    let enrollment: Vec<_> = engine
        .data_element_and_attribute_identifiers(expression, AnalyticsType::Enrollment)
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(enrollment, vec!["at2"]);

    assert_eq!(
        engine.any_value_exists_clause(expression, AnalyticsType::Enrollment),
        Some("\"at2\" is not null".to_string())
    );
}

// Store

#[test]
fn store_round_trip() {
    let engine = engine();
    let id = engine.add_program_indicator(event_indicator());
    let mut stored = engine.program_indicator(id).unwrap();
    assert_eq!(stored.name, "Weight indicator");

    stored.expression = "#{ps1.de1} * 2".to_string();
    assert!(engine.update_program_indicator(stored));
    assert_eq!(
        engine
            .program_indicator_by_name("Weight indicator")
            .map(|pi| pi.expression),
        Some("#{ps1.de1} * 2".to_string())
    );

    assert!(engine.delete_program_indicator(id).is_some());
    assert!(engine.program_indicator_by_uid("pi1").is_none());
}
