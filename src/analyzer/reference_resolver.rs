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

//! Reference resolution pass
//!
//! Runs before compilation so that an unknown function, variable, placeholder
//! kind or metadata uid fails the call before any handler runs.

use crate::ast::{ExpressionNode, ItemReference, Visitor};
use crate::error::{ExpressionError, ReferenceKind};
use crate::model::MetadataProvider;
use crate::registry::{ExpressionRegistry, variable_key};

/// Checks every reference of an expression against the registry and metadata
pub struct ReferenceResolver<'a> {
    registry: &'a ExpressionRegistry,
    metadata: &'a dyn MetadataProvider,
}

impl<'a> ReferenceResolver<'a> {
    /// Create a resolver
    pub fn new(registry: &'a ExpressionRegistry, metadata: &'a dyn MetadataProvider) -> Self {
        Self { registry, metadata }
    }

    /// Resolve every reference in `expr`
    pub fn resolve(&mut self, expr: &ExpressionNode) -> Result<(), ExpressionError> {
        self.visit_expression(expr)
    }

    fn require_stage(&self, program_stage_uid: &str) -> Result<(), ExpressionError> {
        self.metadata
            .program_stage(program_stage_uid)
            .map(|_| ())
            .ok_or_else(|| {
                ExpressionError::unresolved(ReferenceKind::ProgramStage, program_stage_uid)
            })
    }
}

impl Visitor for ReferenceResolver<'_> {
    type Error = ExpressionError;

    fn visit_function_call(
        &mut self,
        name: &str,
        args: &[ExpressionNode],
    ) -> Result<(), Self::Error> {
        if !self.registry.functions().contains(name) {
            return Err(ExpressionError::unresolved(ReferenceKind::Function, name));
        }
        for arg in args {
            self.visit_expression(arg)?;
        }
        Ok(())
    }

    fn visit_variable(&mut self, name: &str) -> Result<(), Self::Error> {
        if self.registry.functions().contains(&variable_key(name)) {
            Ok(())
        } else {
            Err(ExpressionError::unresolved(ReferenceKind::Variable, name))
        }
    }

    fn visit_item(&mut self, item: &ItemReference) -> Result<(), Self::Error> {
        if self.registry.item(item.kind()).is_none() {
            return Err(ExpressionError::unresolved(ReferenceKind::Item, item.text()));
        }

        match item {
            ItemReference::StageElement {
                program_stage_uid,
                data_element_uid,
            } => {
                self.require_stage(program_stage_uid)?;
                if self.metadata.data_element(data_element_uid).is_none() {
                    return Err(ExpressionError::unresolved(
                        ReferenceKind::DataElement,
                        data_element_uid.as_str(),
                    ));
                }
                Ok(())
            }
            ItemReference::Attribute { attribute_uid } => self
                .metadata
                .attribute(attribute_uid)
                .map(|_| ())
                .ok_or_else(|| {
                    ExpressionError::unresolved(ReferenceKind::Attribute, attribute_uid.as_str())
                }),
            ItemReference::Constant { constant_uid } => self
                .metadata
                .constant(constant_uid)
                .map(|_| ())
                .ok_or_else(|| {
                    ExpressionError::unresolved(ReferenceKind::Constant, constant_uid.as_str())
                }),
            ItemReference::StageEventDate { program_stage_uid } => {
                self.require_stage(program_stage_uid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataElement, InMemoryMetadata, ProgramStage, ValueType};
    use crate::parser::parse;
    use crate::registry::program_indicator_registry;

    fn metadata() -> InMemoryMetadata {
        InMemoryMetadata::new()
            .with_program_stage(ProgramStage {
                uid: "A03MvHHogjR".to_string(),
                name: "Birth".to_string(),
                program_uid: None,
            })
            .with_data_element(DataElement {
                uid: "a3kGcGDCuk6".to_string(),
                name: "Apgar score".to_string(),
                value_type: ValueType::Number,
            })
    }

    fn resolve(text: &str) -> Result<(), ExpressionError> {
        let metadata = metadata();
        let expr = parse(text)?;
        ReferenceResolver::new(program_indicator_registry(), &metadata).resolve(&expr)
    }

    #[test]
    fn test_known_references_resolve() {
        assert!(resolve("d2:hasValue(#{A03MvHHogjR.a3kGcGDCuk6}) and V{event_count} > 0").is_ok());
        assert!(resolve("PS_EVENTDATE:A03MvHHogjR > '2024-01-01'").is_ok());
    }

    #[test]
    fn test_unknown_references_fail() {
        assert_eq!(
            resolve("#{A03MvHHogjR.missing}"),
            Err(ExpressionError::unresolved(ReferenceKind::DataElement, "missing"))
        );
        assert_eq!(
            resolve("#{missing.a3kGcGDCuk6}"),
            Err(ExpressionError::unresolved(ReferenceKind::ProgramStage, "missing"))
        );
        assert_eq!(
            resolve("C{nope} + 1"),
            Err(ExpressionError::unresolved(ReferenceKind::Constant, "nope"))
        );
        assert_eq!(
            resolve("d2:unknown(1)"),
            Err(ExpressionError::unresolved(ReferenceKind::Function, "d2:unknown"))
        );
    }
}
