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

//! Analytics table partitions and the statement that populates them

use super::column_type::ColumnDataType;
use crate::error::{ExpressionError, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;

/// Column of an analytics table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTableColumn {
    /// Quoted column name
    pub name: String,
    /// Column type
    pub data_type: ColumnDataType,
    /// Select expression filling the column
    pub alias: String,
}

impl AnalyticsTableColumn {
    /// Create a column
    pub fn new(
        name: impl Into<String>,
        data_type: ColumnDataType,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            alias: alias.into(),
        }
    }
}

/// One partition of an analytics table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTablePartition {
    /// Final table name
    pub table_name: String,
    /// Staging table populated before the swap
    pub temp_table_name: String,
}

impl AnalyticsTablePartition {
    /// Create a partition whose staging table is `<table_name>_temp`
    pub fn new(table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        Self {
            temp_table_name: format!("{table_name}_temp"),
            table_name,
        }
    }
}

/// Executes statements against the analytics database
pub trait SqlExecutor: Send + Sync {
    /// Execute one statement
    fn execute(&self, sql: &str) -> Result<()>;
}

/// `insert into <temp table> (<names>) select <aliases> <join>`
///
/// Fails for an empty column list or a repeated column name.
pub fn populate_table_statement(
    partition: &AnalyticsTablePartition,
    columns: &[AnalyticsTableColumn],
    join_statement: &str,
) -> Result<String> {
    if columns.is_empty() {
        return Err(ExpressionError::analytics_table(format!(
            "no columns to populate {}",
            partition.temp_table_name
        )));
    }

    let mut seen = FxHashSet::default();
    if let Some(duplicate) = columns.iter().find(|column| !seen.insert(column.name.as_str())) {
        return Err(ExpressionError::analytics_table(format!(
            "duplicate column {} in {}",
            duplicate.name, partition.temp_table_name
        )));
    }

    let names = columns
        .iter()
        .map(|column| column.name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let aliases = columns
        .iter()
        .map(|column| column.alias.as_str())
        .collect::<Vec<_>>()
        .join(",");

    Ok(format!(
        "insert into {} ({names}) select {aliases} {join_statement}",
        partition.temp_table_name
    ))
}

/// Build and run the populate statement of a partition, logging the time taken
pub fn populate_table(
    executor: &dyn SqlExecutor,
    partition: &AnalyticsTablePartition,
    columns: &[AnalyticsTableColumn],
    join_statement: &str,
) -> Result<()> {
    let sql = populate_table_statement(partition, columns, join_statement)?;
    log::debug!("populate SQL: {sql}");

    let start = Instant::now();
    executor.execute(&sql)?;
    log::info!(
        "Populate {} in {:.3}s",
        partition.temp_table_name,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Aggregation levels do not apply to event tables; completes immediately
pub fn apply_aggregation_levels(
    partitions: &[AnalyticsTablePartition],
    data_elements: &[String],
    aggregation_level: u32,
) -> impl Future<Output = Result<()>> + use<> {
    log::trace!(
        "skipping aggregation level {aggregation_level} for {} data elements in {} partitions",
        data_elements.len(),
        partitions.len()
    );
    futures::future::ready(Ok(()))
}

/// Event tables are not vacuumed; completes immediately
pub fn vacuum_tables(
    partitions: &[AnalyticsTablePartition],
) -> impl Future<Output = Result<()>> + use<> {
    log::trace!("skipping vacuum of {} partitions", partitions.len());
    futures::future::ready(Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingExecutor {
        statements: Mutex<Vec<String>>,
    }

    impl SqlExecutor for RecordingExecutor {
        fn execute(&self, sql: &str) -> Result<()> {
            self.statements.lock().push(sql.to_string());
            Ok(())
        }
    }

    fn columns() -> Vec<AnalyticsTableColumn> {
        vec![
            AnalyticsTableColumn::new("\"psi\"", ColumnDataType::Text, "psi.uid"),
            AnalyticsTableColumn::new(
                "\"de1\"",
                ColumnDataType::Double,
                "cast(eventdatavalues #>> '{de1, value}' as double precision)",
            ),
        ]
    }

    #[test]
    fn test_populate_statement() {
        let partition = AnalyticsTablePartition::new("analytics_event_2024_prog");
        let sql = populate_table_statement(
            &partition,
            &columns(),
            "from programstageinstance psi",
        )
        .unwrap();
        assert_eq!(
            sql,
            "insert into analytics_event_2024_prog_temp (\"psi\",\"de1\") select psi.uid,\
             cast(eventdatavalues #>> '{de1, value}' as double precision) from programstageinstance psi"
        );
    }

    #[test]
    fn test_rejects_empty_and_duplicate_columns() {
        let partition = AnalyticsTablePartition::new("t");
        assert!(matches!(
            populate_table_statement(&partition, &[], ""),
            Err(ExpressionError::AnalyticsTable { .. })
        ));

        let mut duplicated = columns();
        duplicated.push(duplicated[0].clone());
        let error = populate_table_statement(&partition, &duplicated, "").unwrap_err();
        assert!(error.to_string().contains("duplicate column \"psi\""));
    }

    #[test]
    fn test_populate_table_executes_once() {
        let executor = RecordingExecutor::default();
        let partition = AnalyticsTablePartition::new("t");
        populate_table(&executor, &partition, &columns(), "from x").unwrap();
        let statements = executor.statements.lock();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("insert into t_temp ("));
    }
}
