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

//! `A{attributeUid}` items

use super::{replace_nulls, unexpected_item};
use crate::ast::{ItemKind, ItemReference};
use crate::error::{ExpressionError, ReferenceKind, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, TrackedEntityAttribute, ValueKind};
use crate::registry::item::ExpressionItem;

/// Tracked entity attribute, a column of both analytics tables
pub struct AttributeItem;

impl AttributeItem {
    fn attribute(
        &self,
        item: &ItemReference,
        compiler: &ExpressionCompiler<'_>,
    ) -> Result<TrackedEntityAttribute> {
        let ItemReference::Attribute { attribute_uid } = item else {
            return Err(unexpected_item(item));
        };
        compiler
            .context()
            .metadata
            .attribute(attribute_uid)
            .ok_or_else(|| {
                ExpressionError::unresolved(ReferenceKind::Attribute, attribute_uid.as_str())
            })
    }
}

impl ExpressionItem for AttributeItem {
    fn kind(&self) -> ItemKind {
        ItemKind::Attribute
    }

    fn type_of(
        &self,
        item: &ItemReference,
        compiler: &ExpressionCompiler<'_>,
    ) -> Result<ValueKind> {
        Ok(self.attribute(item, compiler)?.value_type.kind())
    }

    fn evaluate(
        &self,
        item: &ItemReference,
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let attribute = self.attribute(item, compiler)?;
        Ok(compiler
            .context()
            .require_values()?
            .attribute_value(&attribute.uid)
            .unwrap_or(ExpressionValue::Null))
    }

    fn label(&self, item: &ItemReference, compiler: &ExpressionCompiler<'_>) -> Result<String> {
        Ok(self.attribute(item, compiler)?.name)
    }

    fn to_sql(
        &self,
        item: &ItemReference,
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let attribute = self.attribute(item, compiler)?;
        let column = compiler.context().statement_builder.quote(&attribute.uid);
        Ok(replace_nulls(column, attribute.value_type.kind(), compiler))
    }
}
