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

//! Collection of the data element and attribute identifiers an expression reads

use crate::ast::{ExpressionNode, ItemReference, Visitor};
use crate::model::AnalyticsType;
use crate::parser::{ParseResult, parse};
use crate::sql::StatementBuilder;
use indexmap::IndexSet;
use std::convert::Infallible;

/// Gathers identifiers in first-seen order
///
/// Event analytics read data elements and attributes as columns of the
/// analytics table. Enrollment analytics read data elements through event
/// sub-selects, so only attributes are columns there.
#[derive(Debug)]
pub struct IdentifierCollector {
    analytics_type: AnalyticsType,
    identifiers: IndexSet<String>,
}

impl IdentifierCollector {
    /// Create a collector for the given analytics type
    pub fn new(analytics_type: AnalyticsType) -> Self {
        Self {
            analytics_type,
            identifiers: IndexSet::new(),
        }
    }

    /// Collect from a parsed expression
    pub fn collect(mut self, expr: &ExpressionNode) -> IndexSet<String> {
        let _ = self.visit_expression(expr);
        self.identifiers
    }
}

impl Visitor for IdentifierCollector {
    type Error = Infallible;

    fn visit_item(&mut self, item: &ItemReference) -> Result<(), Self::Error> {
        match item {
            ItemReference::StageElement {
                data_element_uid, ..
            } if self.analytics_type == AnalyticsType::Event => {
                self.identifiers.insert(data_element_uid.clone());
            }
            ItemReference::Attribute { attribute_uid } => {
                self.identifiers.insert(attribute_uid.clone());
            }
            _ => {}
        }
        Ok(())
    }
}

/// Parse `text` and collect its identifiers
pub fn collect_identifiers(
    text: &str,
    analytics_type: AnalyticsType,
) -> ParseResult<IndexSet<String>> {
    let expr = parse(text)?;
    Ok(IdentifierCollector::new(analytics_type).collect(&expr))
}

/// `"a" is not null or "b" is not null`; `None` without identifiers
pub fn any_value_exists_clause(
    identifiers: &IndexSet<String>,
    builder: &dyn StatementBuilder,
) -> Option<String> {
    if identifiers.is_empty() {
        return None;
    }
    let clause = identifiers
        .iter()
        .map(|uid| format!("{} is not null", builder.quote(uid)))
        .collect::<Vec<_>>()
        .join(" or ");
    Some(clause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PostgreSqlStatementBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_collects_elements_and_attributes() {
        let identifiers = collect_identifiers(
            "#{ps1.de1} + d2:zing(d2:oizp(#{ps2.de2})) + A{at1} + C{const} + #{ps1.de1}",
            AnalyticsType::Event,
        )
        .unwrap();
        assert_eq!(
            identifiers.into_iter().collect::<Vec<_>>(),
            vec!["de1".to_string(), "de2".to_string(), "at1".to_string()]
        );
    }

    #[test]
    fn test_enrollment_collects_attributes_only() {
        let identifiers =
            collect_identifiers("#{ps1.de1} + A{at1}", AnalyticsType::Enrollment).unwrap();
        assert_eq!(identifiers.into_iter().collect::<Vec<_>>(), vec!["at1".to_string()]);
    }

    #[test]
    fn test_nesting_does_not_change_result() {
        let flat = collect_identifiers("#{p.a} + A{b}", AnalyticsType::Event).unwrap();
        let nested = collect_identifiers(
            "if(d2:hasValue(#{p.a}), greatest(d2:zing(#{p.a}), A{b}), 0)",
            AnalyticsType::Event,
        )
        .unwrap();
        assert_eq!(flat, nested);
    }

    #[test]
    fn test_exists_clause() {
        let builder = PostgreSqlStatementBuilder;
        let identifiers = collect_identifiers("#{p.a} + A{b}", AnalyticsType::Event).unwrap();
        assert_eq!(
            any_value_exists_clause(&identifiers, &builder).as_deref(),
            Some("\"a\" is not null or \"b\" is not null")
        );
        assert_eq!(any_value_exists_clause(&IndexSet::new(), &builder), None);
    }
}
