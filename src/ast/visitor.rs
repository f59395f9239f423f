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

//! Visitor pattern for read-only AST traversal
//!
//! Every `visit_*` method defaults to walking the node's children, so analyzers
//! only override the node kinds they care about.

use super::expression::{ExpressionNode, ItemReference, LiteralValue};
use super::operator::{BinaryOperator, UnaryOperator};

/// Trait for visiting AST nodes
pub trait Visitor: Sized {
    /// Error that aborts the walk
    type Error;

    /// Visit an expression node
    fn visit_expression(&mut self, expr: &ExpressionNode) -> Result<(), Self::Error> {
        walk_expression(self, expr)
    }

    /// Visit a literal expression
    fn visit_literal(&mut self, _literal: &LiteralValue) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Visit a function call
    fn visit_function_call(
        &mut self,
        _name: &str,
        args: &[ExpressionNode],
    ) -> Result<(), Self::Error> {
        for arg in args {
            self.visit_expression(arg)?;
        }
        Ok(())
    }

    /// Visit a program variable
    fn visit_variable(&mut self, _name: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Visit a placeholder item
    fn visit_item(&mut self, _item: &ItemReference) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Visit a binary operation
    fn visit_binary_op(
        &mut self,
        _op: BinaryOperator,
        left: &ExpressionNode,
        right: &ExpressionNode,
    ) -> Result<(), Self::Error> {
        self.visit_expression(left)?;
        self.visit_expression(right)
    }

    /// Visit a unary operation
    fn visit_unary_op(
        &mut self,
        _op: UnaryOperator,
        operand: &ExpressionNode,
    ) -> Result<(), Self::Error> {
        self.visit_expression(operand)
    }

    /// Visit a range test
    fn visit_between(
        &mut self,
        value: &ExpressionNode,
        low: &ExpressionNode,
        high: &ExpressionNode,
    ) -> Result<(), Self::Error> {
        self.visit_expression(value)?;
        self.visit_expression(low)?;
        self.visit_expression(high)
    }

    /// Visit a membership test
    fn visit_in(
        &mut self,
        value: &ExpressionNode,
        list: &[ExpressionNode],
    ) -> Result<(), Self::Error> {
        self.visit_expression(value)?;
        for item in list {
            self.visit_expression(item)?;
        }
        Ok(())
    }
}

/// Default implementation of walking an expression tree
pub fn walk_expression<V: Visitor>(visitor: &mut V, expr: &ExpressionNode) -> Result<(), V::Error> {
    match expr {
        ExpressionNode::Literal(lit) => visitor.visit_literal(lit),
        ExpressionNode::FunctionCall(data) => visitor.visit_function_call(&data.name, &data.args),
        ExpressionNode::Variable(name) => visitor.visit_variable(name),
        ExpressionNode::Item(item) => visitor.visit_item(item),
        ExpressionNode::BinaryOp(data) => visitor.visit_binary_op(data.op, &data.left, &data.right),
        ExpressionNode::UnaryOp { op, operand } => visitor.visit_unary_op(*op, operand),
        ExpressionNode::Between(data) => visitor.visit_between(&data.value, &data.low, &data.high),
        ExpressionNode::In(data) => visitor.visit_in(&data.value, &data.list),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Default)]
    struct ItemCounter {
        items: usize,
        functions: usize,
    }

    impl Visitor for ItemCounter {
        type Error = Infallible;

        fn visit_item(&mut self, _item: &ItemReference) -> Result<(), Self::Error> {
            self.items += 1;
            Ok(())
        }

        fn visit_function_call(
            &mut self,
            _name: &str,
            args: &[ExpressionNode],
        ) -> Result<(), Self::Error> {
            self.functions += 1;
            for arg in args {
                self.visit_expression(arg)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_default_walk_reaches_nested_items() {
        let expr = ExpressionNode::binary_op(
            BinaryOperator::Add,
            ExpressionNode::function_call(
                "d2:zing",
                vec![ExpressionNode::stage_element("ps", "de")],
            ),
            ExpressionNode::between(
                ExpressionNode::attribute("attr"),
                ExpressionNode::constant("low"),
                ExpressionNode::literal(LiteralValue::Integer(5)),
            ),
        );

        let mut counter = ItemCounter::default();
        counter.visit_expression(&expr).unwrap();
        assert_eq!(counter.items, 3);
        assert_eq!(counter.functions, 1);
    }
}
