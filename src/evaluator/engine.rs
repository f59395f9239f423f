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

//! Multi-mode expression compiler
//!
//! One walk over the AST; every node is dispatched by its kind and the
//! strategy of the context. Operators follow the function strategy, literals
//! the literal strategy and placeholders the item strategy.

use super::context::{CompilationContext, FunctionStrategy, ItemStrategy, LiteralStrategy};
use super::operators;
use crate::analyzer::ReferenceResolver;
use crate::ast::{BinaryOperator, ExpressionNode, ItemReference, LiteralValue, UnaryOperator};
use crate::error::{ExpressionError, ReferenceKind, Result};
use crate::model::ExpressionValue;
use crate::model::value::format_number;
use crate::parser::ParseError;
use crate::registry::{ExpressionRegistry, program_indicator_registry, variable_key};
use std::fmt;

/// Output of compiling one node
#[derive(Debug, Clone, PartialEq)]
pub enum Compiled {
    /// A value, in evaluate and describe modes
    Value(ExpressionValue),
    /// A SQL fragment, in SQL mode
    Sql(String),
}

impl Compiled {
    /// The value, if this is one
    pub fn as_value(&self) -> Option<&ExpressionValue> {
        match self {
            Self::Value(value) => Some(value),
            Self::Sql(_) => None,
        }
    }

    /// The SQL fragment, if this is one
    pub fn as_sql(&self) -> Option<&str> {
        match self {
            Self::Sql(sql) => Some(sql),
            Self::Value(_) => None,
        }
    }
}

impl fmt::Display for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::Sql(sql) => f.write_str(sql),
        }
    }
}

/// Expression compiler bound to a registry and a per-call context
pub struct ExpressionCompiler<'a> {
    registry: &'a ExpressionRegistry,
    context: CompilationContext<'a>,
}

impl<'a> ExpressionCompiler<'a> {
    /// Create a compiler over the program indicator registry
    pub fn new(context: CompilationContext<'a>) -> Self {
        Self::with_registry(program_indicator_registry(), context)
    }

    /// Create a compiler over a custom registry
    pub fn with_registry(
        registry: &'a ExpressionRegistry,
        context: CompilationContext<'a>,
    ) -> Self {
        Self { registry, context }
    }

    /// The registry in use
    pub fn registry(&self) -> &'a ExpressionRegistry {
        self.registry
    }

    /// The compilation context
    pub fn context(&self) -> &CompilationContext<'a> {
        &self.context
    }

    /// The compilation context, mutably
    pub fn context_mut(&mut self) -> &mut CompilationContext<'a> {
        &mut self.context
    }

    /// Give the context back, with the descriptions recorded during compilation
    pub fn into_context(self) -> CompilationContext<'a> {
        self.context
    }

    /// Resolve every reference, then compile the whole tree
    pub fn compile(&mut self, expr: &ExpressionNode) -> Result<Compiled> {
        log::debug!(
            "compiling '{expr}' with {:?} functions and {:?} items",
            self.context.function_strategy,
            self.context.item_strategy
        );
        ReferenceResolver::new(self.registry, self.context.metadata).resolve(expr)?;
        self.visit(expr)
    }

    /// Parse and resolve expression text embedded in a string argument
    pub fn parse_nested(&self, text: &str) -> Result<ExpressionNode> {
        let expr = crate::parser::parse(text)?;
        ReferenceResolver::new(self.registry, self.context.metadata).resolve(&expr)?;
        Ok(expr)
    }

    /// Compile one node in the active mode
    pub fn visit(&mut self, expr: &ExpressionNode) -> Result<Compiled> {
        match expr {
            ExpressionNode::Literal(literal) => self.compile_literal(literal),
            ExpressionNode::FunctionCall(data) => {
                self.compile_function(&data.name, &data.args, ReferenceKind::Function)
            }
            ExpressionNode::Variable(name) => {
                self.compile_function(&variable_key(name), &[], ReferenceKind::Variable)
            }
            ExpressionNode::Item(item) => self.compile_item(item),
            ExpressionNode::BinaryOp(data) => self.compile_binary(data.op, &data.left, &data.right),
            ExpressionNode::UnaryOp { op, operand } => self.compile_unary(*op, expr, operand),
            ExpressionNode::Between(data) => {
                self.compile_between(expr, &data.value, &data.low, &data.high)
            }
            ExpressionNode::In(data) => self.compile_in(expr, &data.value, &data.list),
        }
    }

    /// Compile a node that must produce a value
    ///
    /// Items and literals rendered as SQL under a value-producing function
    /// strategy stand in with the default value of their type.
    pub fn visit_value(&mut self, expr: &ExpressionNode) -> Result<ExpressionValue> {
        match self.visit(expr)? {
            Compiled::Value(value) => Ok(value),
            Compiled::Sql(sql) => match expr {
                ExpressionNode::Item(item) => self.item_stand_in(item),
                ExpressionNode::Literal(literal) => literal_value(literal),
                _ => Err(ExpressionError::type_mismatch(
                    "value",
                    "SQL fragment",
                    format!("'{sql}'"),
                )),
            },
        }
    }

    fn item_stand_in(&self, item: &ItemReference) -> Result<ExpressionValue> {
        let handler = self
            .registry
            .item(item.kind())
            .ok_or_else(|| ExpressionError::unresolved(ReferenceKind::Item, item.text()))?;
        Ok(handler.type_of(item, self)?.default_value())
    }

    /// Compile a node to SQL; values are rendered as SQL literals
    pub fn visit_sql(&mut self, expr: &ExpressionNode) -> Result<String> {
        Ok(match self.visit(expr)? {
            Compiled::Sql(sql) => sql,
            Compiled::Value(value) => self.value_sql(&value),
        })
    }

    /// Compile a node to SQL without null replacement
    pub fn visit_sql_raw(&mut self, expr: &ExpressionNode) -> Result<String> {
        let replace_nulls = std::mem::replace(&mut self.context.replace_nulls, false);
        let result = self.visit_sql(expr);
        self.context.replace_nulls = replace_nulls;
        result
    }

    /// Render a value as a SQL literal
    pub fn value_sql(&self, value: &ExpressionValue) -> String {
        let builder = self.context.statement_builder;
        match value {
            ExpressionValue::Null => "null".to_string(),
            ExpressionValue::Boolean(b) => builder.boolean_literal(*b).to_string(),
            ExpressionValue::Number(n) => format_number(*n),
            ExpressionValue::Date(d) => builder.date_literal(*d),
            ExpressionValue::String(s) => builder.encode(s),
        }
    }

    fn compile_literal(&mut self, literal: &LiteralValue) -> Result<Compiled> {
        if self.context.literal_strategy == LiteralStrategy::Sql {
            let builder = self.context.statement_builder;
            let sql = match literal {
                LiteralValue::Boolean(b) => builder.boolean_literal(*b).to_string(),
                LiteralValue::Integer(i) => i.to_string(),
                LiteralValue::Decimal(d) => d.clone(),
                LiteralValue::String(s) => builder.encode(s),
            };
            return Ok(Compiled::Sql(sql));
        }

        literal_value(literal).map(Compiled::Value)
    }

    fn compile_function(
        &mut self,
        name: &str,
        args: &[ExpressionNode],
        kind: ReferenceKind,
    ) -> Result<Compiled> {
        let registry = self.registry;
        let function = registry
            .function(name)
            .ok_or_else(|| ExpressionError::unresolved(kind, name))?;
        function.validate_args(args)?;

        match self.context.function_strategy {
            FunctionStrategy::Evaluate => function.evaluate(args, self).map(Compiled::Value),
            FunctionStrategy::Describe => function.describe(args, self).map(Compiled::Value),
            FunctionStrategy::GetSql => function.to_sql(args, self).map(Compiled::Sql),
        }
    }

    fn compile_item(&mut self, item: &ItemReference) -> Result<Compiled> {
        let registry = self.registry;
        let handler = registry
            .item(item.kind())
            .ok_or_else(|| ExpressionError::unresolved(ReferenceKind::Item, item.text()))?;

        match self.context.item_strategy {
            ItemStrategy::Evaluate => handler.evaluate(item, self).map(Compiled::Value),
            ItemStrategy::GetDescription => handler.describe(item, self).map(Compiled::Value),
            ItemStrategy::GetSql => handler.to_sql(item, self).map(Compiled::Sql),
        }
    }

    fn compile_binary(
        &mut self,
        op: BinaryOperator,
        left: &ExpressionNode,
        right: &ExpressionNode,
    ) -> Result<Compiled> {
        match self.context.function_strategy {
            FunctionStrategy::GetSql if op == BinaryOperator::Power => {
                let l = self.visit_sql(left)?;
                let r = self.visit_sql(right)?;
                Ok(Compiled::Sql(format!("power({l}, {r})")))
            }
            FunctionStrategy::GetSql => {
                let precedence = op.precedence();
                let (left_min, right_min) = if op.is_right_associative() {
                    (precedence + 1, precedence)
                } else {
                    (precedence, precedence + 1)
                };
                let l = self.operand_sql(left, left_min)?;
                let r = self.operand_sql(right, right_min)?;
                Ok(Compiled::Sql(format!("{l} {} {r}", op.sql_symbol())))
            }
            strategy => {
                let l = self.visit_value(left)?;
                let r = self.visit_value(right)?;
                let value = if strategy == FunctionStrategy::Evaluate {
                    operators::evaluate_binary(op, &l, &r)?
                } else {
                    operators::describe_binary(op, &l, &r)?
                };
                Ok(Compiled::Value(value))
            }
        }
    }

    fn compile_unary(
        &mut self,
        op: UnaryOperator,
        expr: &ExpressionNode,
        operand: &ExpressionNode,
    ) -> Result<Compiled> {
        match self.context.function_strategy {
            FunctionStrategy::GetSql => {
                let mut sql = self.operand_sql(operand, expr.precedence())?;
                // `--` opens a SQL comment
                if matches!(operand, ExpressionNode::UnaryOp { .. })
                    || sql.starts_with(['-', '+'])
                {
                    sql = format!("({sql})");
                }
                Ok(Compiled::Sql(format!("{}{sql}", op.sql_prefix())))
            }
            FunctionStrategy::Evaluate => {
                let value = self.visit_value(operand)?;
                operators::evaluate_unary(op, &value).map(Compiled::Value)
            }
            FunctionStrategy::Describe => {
                let value = self.visit_value(operand)?;
                operators::describe_unary(op, &value).map(Compiled::Value)
            }
        }
    }

    fn compile_between(
        &mut self,
        expr: &ExpressionNode,
        value: &ExpressionNode,
        low: &ExpressionNode,
        high: &ExpressionNode,
    ) -> Result<Compiled> {
        match self.context.function_strategy {
            FunctionStrategy::GetSql => {
                let min = expr.precedence() + 1;
                let value = self.operand_sql(value, min)?;
                let low = self.operand_sql(low, min)?;
                let high = self.operand_sql(high, min)?;
                Ok(Compiled::Sql(format!("{value} between {low} and {high}")))
            }
            strategy => {
                let value = self.visit_value(value)?;
                let low = self.visit_value(low)?;
                let high = self.visit_value(high)?;
                let result = if strategy == FunctionStrategy::Evaluate {
                    operators::evaluate_between(&value, &low, &high)?
                } else {
                    operators::describe_between(&value, &low, &high)?
                };
                Ok(Compiled::Value(result))
            }
        }
    }

    fn compile_in(
        &mut self,
        expr: &ExpressionNode,
        value: &ExpressionNode,
        list: &[ExpressionNode],
    ) -> Result<Compiled> {
        match self.context.function_strategy {
            FunctionStrategy::GetSql => {
                let value = self.operand_sql(value, expr.precedence() + 1)?;
                let items = list
                    .iter()
                    .map(|item| self.visit_sql(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Compiled::Sql(format!("{value} in ({})", items.join(", "))))
            }
            strategy => {
                let value = self.visit_value(value)?;
                let items = list
                    .iter()
                    .map(|item| self.visit_value(item))
                    .collect::<Result<Vec<_>>>()?;
                let result = if strategy == FunctionStrategy::Evaluate {
                    operators::evaluate_in(&value, &items)?
                } else {
                    operators::describe_in(&value, &items)?
                };
                Ok(Compiled::Value(result))
            }
        }
    }

    fn operand_sql(&mut self, node: &ExpressionNode, min_precedence: u8) -> Result<String> {
        let sql = self.visit_sql(node)?;
        Ok(if node.precedence() < min_precedence {
            format!("({sql})")
        } else {
            sql
        })
    }
}

fn literal_value(literal: &LiteralValue) -> Result<ExpressionValue> {
    Ok(match literal {
        LiteralValue::Boolean(b) => ExpressionValue::Boolean(*b),
        LiteralValue::Integer(i) => ExpressionValue::Number(*i as f64),
        LiteralValue::Decimal(d) => {
            let number = d.parse::<f64>().map_err(|_| ParseError::InvalidLiteral {
                literal_type: "decimal".to_string(),
                value: d.clone(),
                position: 0,
            })?;
            ExpressionValue::Number(number)
        }
        LiteralValue::String(s) => ExpressionValue::String(s.clone()),
    })
}
