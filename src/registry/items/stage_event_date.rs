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

//! `PS_EVENTDATE:programStageUid` items

use super::unexpected_item;
use crate::ast::{ItemKind, ItemReference};
use crate::error::{ExpressionError, ReferenceKind, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ProgramStage, ValueKind};
use crate::registry::item::ExpressionItem;

/// Event date of the latest event in a program stage
pub struct StageEventDateItem;

impl StageEventDateItem {
    fn stage(
        &self,
        item: &ItemReference,
        compiler: &ExpressionCompiler<'_>,
    ) -> Result<ProgramStage> {
        let ItemReference::StageEventDate { program_stage_uid } = item else {
            return Err(unexpected_item(item));
        };
        compiler
            .context()
            .metadata
            .program_stage(program_stage_uid)
            .ok_or_else(|| {
                ExpressionError::unresolved(ReferenceKind::ProgramStage, program_stage_uid.as_str())
            })
    }
}

impl ExpressionItem for StageEventDateItem {
    fn kind(&self) -> ItemKind {
        ItemKind::StageEventDate
    }

    fn type_of(
        &self,
        _item: &ItemReference,
        _compiler: &ExpressionCompiler<'_>,
    ) -> Result<ValueKind> {
        Ok(ValueKind::Date)
    }

    fn evaluate(
        &self,
        item: &ItemReference,
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let stage = self.stage(item, compiler)?;
        Ok(compiler
            .context()
            .require_values()?
            .stage_event_date(&stage.uid)
            .map_or(ExpressionValue::Null, ExpressionValue::Date))
    }

    fn label(&self, item: &ItemReference, compiler: &ExpressionCompiler<'_>) -> Result<String> {
        Ok(format!("{} event date", self.stage(item, compiler)?.name))
    }

    fn to_sql(
        &self,
        item: &ItemReference,
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let stage = self.stage(item, compiler)?;
        let context = compiler.context();
        Ok(context.statement_builder.event_subselect(
            "executiondate",
            Some(&stage.uid),
            context.require_indicator()?,
            context.window.as_ref(),
        ))
    }
}
