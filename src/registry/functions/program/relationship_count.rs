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

//! d2:relationshipCount() function

use crate::ast::ExpressionNode;
use crate::error::{ExpressionError, ReferenceKind, Result};
use crate::evaluator::ExpressionCompiler;
use crate::model::{ExpressionValue, ValueKind};
use crate::registry::function::{ExpressionFunction, describe_arguments};
use crate::registry::signature::{FunctionSignature, ParameterInfo, ParameterKind};
use crate::sql::ANALYTICS_TBL_ALIAS;

/// d2:relationshipCount() function - relationships of the tracked entity,
/// optionally of one relationship type
pub struct RelationshipCountFunction;

impl RelationshipCountFunction {
    fn relationship_type<'n>(
        &self,
        args: &'n [ExpressionNode],
        compiler: &ExpressionCompiler<'_>,
    ) -> Result<Option<&'n str>> {
        let Some(uid) = args.first().and_then(ExpressionNode::as_string_literal) else {
            return Ok(None);
        };
        if compiler.context().metadata.relationship_type(uid).is_none() {
            return Err(ExpressionError::unresolved(ReferenceKind::RelationshipType, uid));
        }
        Ok(Some(uid))
    }
}

impl ExpressionFunction for RelationshipCountFunction {
    fn name(&self) -> &str {
        "d2:relationshipCount"
    }

    fn human_friendly_name(&self) -> &str {
        "Relationship Count"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: std::sync::LazyLock<FunctionSignature> = std::sync::LazyLock::new(|| {
            FunctionSignature::new(
                "d2:relationshipCount",
                vec![ParameterInfo::optional(
                    "relationshipType",
                    ParameterKind::StringLiteral,
                )],
                Some(ValueKind::Number),
            )
        });
        &SIG
    }

    fn evaluate(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        let relationship_type = self.relationship_type(args, compiler)?;
        Ok(compiler
            .context()
            .require_values()?
            .relationship_count(relationship_type)
            .map_or(ExpressionValue::Null, ExpressionValue::Number))
    }

    fn describe(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<ExpressionValue> {
        self.relationship_type(args, compiler)?;
        describe_arguments(self.signature(), args, compiler)?;
        Ok(ValueKind::Number.default_value())
    }

    fn to_sql(
        &self,
        args: &[ExpressionNode],
        compiler: &mut ExpressionCompiler<'_>,
    ) -> Result<String> {
        let relationship_type = self.relationship_type(args, compiler)?;
        let mut sql = format!(
            "(select count(*) from relationship r \
             join relationshiptype rty on r.relationshiptypeid = rty.relationshiptypeid \
             join relationshipitem rifrom on rifrom.relationshipid = r.relationshipid \
             join trackedentityinstance tei on rifrom.trackedentityinstanceid = tei.trackedentityinstanceid \
             and tei.uid = {ANALYTICS_TBL_ALIAS}.tei"
        );
        if let Some(uid) = relationship_type {
            sql.push_str(" and rty.uid = ");
            sql.push_str(&compiler.context().statement_builder.encode(uid));
        }
        sql.push(')');
        Ok(sql)
    }
}
