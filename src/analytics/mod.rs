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

//! Analytics table support: column types of captured values and the
//! statements that populate table partitions

pub mod column_type;
pub mod table;

pub use column_type::{ColumnDataType, DatabaseInfo, ValueTypeSqlMapper};
pub use table::{
    AnalyticsTableColumn, AnalyticsTablePartition, SqlExecutor, apply_aggregation_levels,
    populate_table, populate_table_statement, vacuum_tables,
};
