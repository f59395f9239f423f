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

//! Engine configuration

use crate::analytics::DatabaseInfo;
use crate::sql::{Dialect, StatementBuilder};
use serde::{Deserialize, Serialize};

/// Settings for SQL generation and analytics tables
///
/// Loaded from TOML; every field has a default:
///
/// ```toml
/// dialect = "postgresql"
/// spatial_support = true
/// replace_nulls = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQL dialect of the analytics database
    pub dialect: Dialect,

    /// Whether the database has PostGIS for geometry columns
    pub spatial_support: bool,

    /// Whether item columns are wrapped in `coalesce` in generated SQL
    pub replace_nulls: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::PostgreSql,
            spatial_support: false,
            replace_nulls: true,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with custom settings
    pub fn new(dialect: Dialect, spatial_support: bool, replace_nulls: bool) -> Self {
        Self {
            dialect,
            spatial_support,
            replace_nulls,
        }
    }

    /// Create a configuration for PostgreSQL with PostGIS
    pub fn spatial() -> Self {
        Self {
            spatial_support: true,
            ..Self::default()
        }
    }

    /// Create a configuration that leaves nulls in generated SQL
    pub fn raw_nulls() -> Self {
        Self {
            replace_nulls: false,
            ..Self::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Statement builder of the configured dialect
    pub fn statement_builder(&self) -> &'static dyn StatementBuilder {
        self.dialect.statement_builder()
    }

    /// Database capabilities
    pub fn database_info(&self) -> DatabaseInfo {
        DatabaseInfo {
            spatial_support: self.spatial_support,
        }
    }
}
