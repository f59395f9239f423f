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

//! `#{programStageUid.dataElementUid}` items

use super::{replace_nulls, unexpected_item};
use crate::ast::{ItemKind, ItemReference};
use crate::error::{ExpressionError, ReferenceKind, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::{DataElement, ExpressionValue, ProgramStage, ValueKind};
use crate::registry::item::ExpressionItem;

/// Data element captured in a program stage
///
/// Event analytics read it as a column of the event row. Enrollment
/// analytics read the latest value from the program's event table.
pub struct StageElementItem;

impl StageElementItem {
    fn resolve(
        &self,
        item: &ItemReference,
        compiler: &ExpressionCompiler<'_>,
    ) -> Result<(ProgramStage, DataElement)> {
        let ItemReference::StageElement {
            program_stage_uid,
            data_element_uid,
        } = item
        else {
            return Err(unexpected_item(item));
        };
        let metadata = compiler.context().metadata;
        let stage = metadata.program_stage(program_stage_uid).ok_or_else(|| {
            ExpressionError::unresolved(ReferenceKind::ProgramStage, program_stage_uid.as_str())
        })?;
        let element = metadata.data_element(data_element_uid).ok_or_else(|| {
            ExpressionError::unresolved(ReferenceKind::DataElement, data_element_uid.as_str())
        })?;
        Ok((stage, element))
    }
}

impl ExpressionItem for StageElementItem {
    fn kind(&self) -> ItemKind {
        ItemKind::StageElement
    }

    fn type_of(
        &self,
        item: &ItemReference,
        compiler: &ExpressionCompiler<'_>,
    ) -> Result<ValueKind> {
        Ok(self.resolve(item, compiler)?.1.value_type.kind())
    }

    fn evaluate(
        &self,
        item: &ItemReference,
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let (stage, element) = self.resolve(item, compiler)?;
        Ok(compiler
            .context()
            .require_values()?
            .stage_element_value(&stage.uid, &element.uid)
            .unwrap_or(ExpressionValue::Null))
    }

    fn label(&self, item: &ItemReference, compiler: &ExpressionCompiler<'_>) -> Result<String> {
        let (stage, element) = self.resolve(item, compiler)?;
        Ok(format!("{}.{}", stage.name, element.name))
    }

    fn to_sql(
        &self,
        item: &ItemReference,
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let (stage, element) = self.resolve(item, compiler)?;
        let context = compiler.context();
        let builder = context.statement_builder;
        let column = builder.quote(&element.uid);
        let column = if context.is_enrollment() {
            builder.event_subselect(
                &column,
                Some(&stage.uid),
                context.require_indicator()?,
                context.window.as_ref(),
            )
        } else {
            column
        };
        Ok(replace_nulls(column, element.value_type.kind(), compiler))
    }
}
