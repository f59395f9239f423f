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

//! `C{constantUid}` items

use super::unexpected_item;
use crate::ast::{ItemKind, ItemReference};
use crate::error::{ExpressionError, ReferenceKind, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::value::format_number;
use crate::model::{Constant, ExpressionValue, ValueKind};
use crate::registry::item::ExpressionItem;

/// Constant, substituted by its value in every mode
pub struct ConstantItem;

impl ConstantItem {
    fn constant(
        &self,
        item: &ItemReference,
        compiler: &ExpressionCompiler<'_>,
    ) -> Result<Constant> {
        let ItemReference::Constant { constant_uid } = item else {
            return Err(unexpected_item(item));
        };
        compiler
            .context()
            .metadata
            .constant(constant_uid)
            .ok_or_else(|| {
                ExpressionError::unresolved(ReferenceKind::Constant, constant_uid.as_str())
            })
    }
}

impl ExpressionItem for ConstantItem {
    fn kind(&self) -> ItemKind {
        ItemKind::Constant
    }

    fn type_of(
        &self,
        _item: &ItemReference,
        _compiler: &ExpressionCompiler<'_>,
    ) -> Result<ValueKind> {
        Ok(ValueKind::Number)
    }

    fn evaluate(
        &self,
        item: &ItemReference,
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        Ok(ExpressionValue::Number(self.constant(item, compiler)?.value))
    }

    fn label(&self, item: &ItemReference, compiler: &ExpressionCompiler<'_>) -> Result<String> {
        Ok(self.constant(item, compiler)?.name)
    }

    fn to_sql(
        &self,
        item: &ItemReference,
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        Ok(format_number(self.constant(item, compiler)?.value))
    }
}
