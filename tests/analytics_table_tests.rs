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

//! Analytics table population from declared value types

use indicator_expression::analytics::{
    AnalyticsTableColumn, AnalyticsTablePartition, SqlExecutor, apply_aggregation_levels,
    populate_table, vacuum_tables,
};
use indicator_expression::{ColumnDataType, EngineConfig, ValueType, ValueTypeSqlMapper};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

#[derive(Default)]
struct RecordingExecutor {
    statements: Mutex<Vec<String>>,
}

impl SqlExecutor for RecordingExecutor {
    fn execute(&self, sql: &str) -> indicator_expression::Result<()> {
        self.statements.lock().push(sql.to_string());
        Ok(())
    }
}

fn value_column(
    mapper: &ValueTypeSqlMapper<'_>,
    uid: &str,
    value_type: ValueType,
) -> AnalyticsTableColumn {
    let json = format!("eventdatavalues #>> '{{{uid}, value}}'");
    AnalyticsTableColumn::new(
        format!("\"{uid}\""),
        mapper.column_type(value_type),
        mapper.select_clause(value_type, &json),
    )
}

#[test]
fn populates_columns_for_every_value_type() {
    let config = EngineConfig::spatial();
    let mapper = ValueTypeSqlMapper::new(config.statement_builder(), config.database_info());
    let columns = vec![
        value_column(&mapper, "weight", ValueType::Number),
        value_column(&mapper, "smoker", ValueType::Boolean),
        value_column(&mapper, "clinic", ValueType::OrganisationUnit),
        value_column(&mapper, "home", ValueType::Coordinate),
    ];
    assert_eq!(
        columns
            .iter()
            .map(|column| column.data_type)
            .collect::<Vec<_>>(),
        vec![
            ColumnDataType::Double,
            ColumnDataType::Integer,
            ColumnDataType::Text,
            ColumnDataType::GeometryPoint,
        ]
    );

    let executor = RecordingExecutor::default();
    let partition = AnalyticsTablePartition::new("analytics_event_2024_prog");
    populate_table(
        &executor,
        &partition,
        &columns,
        "from programstageinstance psi",
    )
    .unwrap();

    let statements = executor.statements.lock();
    assert_eq!(statements.len(), 1);
    let sql = &statements[0];
    assert!(sql.starts_with(
        "insert into analytics_event_2024_prog_temp (\"weight\",\"smoker\",\"clinic\",\"home\") select "
    ));
    assert!(sql.contains("cast(eventdatavalues #>> '{weight, value}' as double precision)"));
    assert!(sql.contains(
        "(select ou.name from organisationunit ou where ou.uid = eventdatavalues #>> '{clinic, value}')"
    ));
    assert!(sql.contains("ST_GeomFromGeoJSON("));
    assert!(sql.ends_with(" from programstageinstance psi"));
}

#[test]
fn without_spatial_support_geometry_is_text() {
    let config = EngineConfig::default();
    let mapper = ValueTypeSqlMapper::new(config.statement_builder(), config.database_info());
    let column = value_column(&mapper, "home", ValueType::Coordinate);
    assert_eq!(column.data_type, ColumnDataType::Text);
    assert_eq!(column.alias, "eventdatavalues #>> '{home, value}'");
}

#[test]
fn failed_population_executes_nothing() {
    let executor = RecordingExecutor::default();
    let partition = AnalyticsTablePartition::new("t");
    assert!(populate_table(&executor, &partition, &[], "from x").is_err());
    assert!(executor.statements.lock().is_empty());
}

#[tokio::test]
async fn maintenance_steps_complete_immediately() {
    let partitions = vec![
        AnalyticsTablePartition::new("analytics_event_2023_prog"),
        AnalyticsTablePartition::new("analytics_event_2024_prog"),
    ];
    let data_elements = vec!["weight".to_string()];

    apply_aggregation_levels(&partitions, &data_elements, 3)
        .await
        .unwrap();
    vacuum_tables(&partitions).await.unwrap();
}
