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

//! Expression AST node definitions

use super::operator::{BinaryOperator, UnaryOperator};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// AST representation of indicator expressions
///
/// Large variants are boxed to keep the enum small.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionNode {
    /// Literal value (number, string, boolean)
    Literal(LiteralValue),

    /// Function call such as `d2:count(...)` or `if(...)` (boxed for size optimization)
    FunctionCall(Box<FunctionCallData>),

    /// Program variable reference (`V{name}`)
    Variable(String),

    /// Placeholder item reference (`#{..}`, `A{..}`, `C{..}`, `PS_EVENTDATE:..`)
    Item(ItemReference),

    /// Binary operation (arithmetic, comparison, logical) (boxed for size optimization)
    BinaryOp(Box<BinaryOpData>),

    /// Unary operation (negation, not)
    UnaryOp {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Box<ExpressionNode>,
    },

    /// Range test `value between low and high`
    Between(Box<BetweenData>),

    /// Membership test `value in (a, b, ...)`
    In(Box<InData>),
}

/// Binary operation data (separate struct to optimize enum size)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOpData {
    /// The operator
    pub op: BinaryOperator,
    /// Left operand
    pub left: ExpressionNode,
    /// Right operand
    pub right: ExpressionNode,
}

/// Function call data (separate struct to optimize enum size)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallData {
    /// Function name, including its namespace (`d2:count`)
    pub name: String,
    /// Function arguments (SmallVec for common case of 1-4 args)
    pub args: SmallVec<[ExpressionNode; 4]>,
}

/// Range test data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetweenData {
    /// Tested value
    pub value: ExpressionNode,
    /// Inclusive lower bound
    pub low: ExpressionNode,
    /// Inclusive upper bound
    pub high: ExpressionNode,
}

/// Membership test data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InData {
    /// Tested value
    pub value: ExpressionNode,
    /// Candidate values, never empty
    pub list: SmallVec<[ExpressionNode; 4]>,
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Decimal literal (stored as written)
    Decimal(String),
    /// String literal with escapes already processed
    String(String),
}

/// Kinds of placeholder items; each kind has one handler in the item registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// `C{constantUid}`
    Constant,
    /// `#{programStageUid.dataElementUid}`
    StageElement,
    /// `A{attributeUid}`
    Attribute,
    /// `PS_EVENTDATE:programStageUid`
    StageEventDate,
}

/// A resolved-by-uid placeholder reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemReference {
    /// Constant reference
    Constant {
        /// Constant uid
        constant_uid: String,
    },
    /// Data element captured in a program stage
    StageElement {
        /// Program stage uid
        program_stage_uid: String,
        /// Data element uid
        data_element_uid: String,
    },
    /// Tracked entity attribute reference
    Attribute {
        /// Attribute uid
        attribute_uid: String,
    },
    /// Event date of the latest event in a program stage
    StageEventDate {
        /// Program stage uid
        program_stage_uid: String,
    },
}

impl ItemReference {
    /// Registry key of this reference
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Constant { .. } => ItemKind::Constant,
            Self::StageElement { .. } => ItemKind::StageElement,
            Self::Attribute { .. } => ItemKind::Attribute,
            Self::StageEventDate { .. } => ItemKind::StageEventDate,
        }
    }

    /// Source text of the item; used as the key of item descriptions
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ItemReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant { constant_uid } => write!(f, "C{{{constant_uid}}}"),
            Self::StageElement {
                program_stage_uid,
                data_element_uid,
            } => write!(f, "#{{{program_stage_uid}.{data_element_uid}}}"),
            Self::Attribute { attribute_uid } => write!(f, "A{{{attribute_uid}}}"),
            Self::StageEventDate { program_stage_uid } => {
                write!(f, "PS_EVENTDATE:{program_stage_uid}")
            }
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constant => "constant",
            Self::StageElement => "program stage data element",
            Self::Attribute => "tracked entity attribute",
            Self::StageEventDate => "program stage event date",
        };
        f.write_str(name)
    }
}

impl ExpressionNode {
    /// Create a literal expression
    pub fn literal(value: LiteralValue) -> Self {
        Self::Literal(value)
    }

    /// Create a function call expression
    pub fn function_call(
        name: impl Into<String>,
        args: impl Into<SmallVec<[ExpressionNode; 4]>>,
    ) -> Self {
        Self::FunctionCall(Box::new(FunctionCallData {
            name: name.into(),
            args: args.into(),
        }))
    }

    /// Create a program variable reference
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Create a stage data element reference
    pub fn stage_element(
        program_stage_uid: impl Into<String>,
        data_element_uid: impl Into<String>,
    ) -> Self {
        Self::Item(ItemReference::StageElement {
            program_stage_uid: program_stage_uid.into(),
            data_element_uid: data_element_uid.into(),
        })
    }

    /// Create an attribute reference
    pub fn attribute(attribute_uid: impl Into<String>) -> Self {
        Self::Item(ItemReference::Attribute {
            attribute_uid: attribute_uid.into(),
        })
    }

    /// Create a constant reference
    pub fn constant(constant_uid: impl Into<String>) -> Self {
        Self::Item(ItemReference::Constant {
            constant_uid: constant_uid.into(),
        })
    }

    /// Create a stage event date reference
    pub fn stage_event_date(program_stage_uid: impl Into<String>) -> Self {
        Self::Item(ItemReference::StageEventDate {
            program_stage_uid: program_stage_uid.into(),
        })
    }

    /// Create a binary operation expression
    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::BinaryOp(Box::new(BinaryOpData { op, left, right }))
    }

    /// Create a unary operation expression
    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode) -> Self {
        Self::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a range test expression
    pub fn between(value: ExpressionNode, low: ExpressionNode, high: ExpressionNode) -> Self {
        Self::Between(Box::new(BetweenData { value, low, high }))
    }

    /// Create a membership test expression
    pub fn in_list(value: ExpressionNode, list: impl Into<SmallVec<[ExpressionNode; 4]>>) -> Self {
        Self::In(Box::new(InData {
            value,
            list: list.into(),
        }))
    }

    /// Get the literal value if this is a literal expression
    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Get the string content if this is a string literal
    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(LiteralValue::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Get the item reference if this is a placeholder
    pub fn as_item(&self) -> Option<&ItemReference> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    /// Binding strength of the node when rendered as infix text
    pub fn precedence(&self) -> u8 {
        match self {
            Self::BinaryOp(data) => data.op.precedence(),
            Self::Between(_) | Self::In(_) => BinaryOperator::LessThan.precedence(),
            Self::UnaryOp { .. } => 7,
            _ => u8::MAX,
        }
    }
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    node: &ExpressionNode,
    min_precedence: u8,
) -> fmt::Result {
    if node.precedence() < min_precedence {
        write!(f, "({node})")
    } else {
        write!(f, "{node}")
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Decimal(value) => f.write_str(value),
            Self::String(value) => {
                f.write_str("'")?;
                for ch in value.chars() {
                    match ch {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        _ => write!(f, "{ch}")?,
                    }
                }
                f.write_str("'")
            }
        }
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::FunctionCall(data) => {
                write!(f, "{}(", data.name)?;
                for (i, arg) in data.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Self::Variable(name) => write!(f, "V{{{name}}}"),
            Self::Item(item) => write!(f, "{item}"),
            Self::BinaryOp(data) => {
                let precedence = data.op.precedence();
                let (left_min, right_min) = if data.op.is_right_associative() {
                    (precedence + 1, precedence)
                } else {
                    (precedence, precedence + 1)
                };
                write_operand(f, &data.left, left_min)?;
                write!(f, " {} ", data.op)?;
                write_operand(f, &data.right, right_min)
            }
            Self::UnaryOp { op, operand } => {
                match op {
                    UnaryOperator::Not => f.write_str("not ")?,
                    other => f.write_str(other.symbol())?,
                }
                write_operand(f, operand, self.precedence())
            }
            Self::Between(data) => {
                let precedence = self.precedence() + 1;
                write_operand(f, &data.value, precedence)?;
                f.write_str(" between ")?;
                write_operand(f, &data.low, precedence)?;
                f.write_str(" and ")?;
                write_operand(f, &data.high, precedence)
            }
            Self::In(data) => {
                write_operand(f, &data.value, self.precedence() + 1)?;
                f.write_str(" in (")?;
                for (i, item) in data.list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_text() {
        let item = ItemReference::StageElement {
            program_stage_uid: "A03MvHHogjR".to_string(),
            data_element_uid: "a3kGcGDCuk6".to_string(),
        };
        assert_eq!(item.text(), "#{A03MvHHogjR.a3kGcGDCuk6}");
        assert_eq!(item.kind(), ItemKind::StageElement);

        let event_date = ItemReference::StageEventDate {
            program_stage_uid: "A03MvHHogjR".to_string(),
        };
        assert_eq!(event_date.text(), "PS_EVENTDATE:A03MvHHogjR");
    }

    #[test]
    fn test_display_adds_required_parentheses() {
        let sum = ExpressionNode::binary_op(
            BinaryOperator::Add,
            ExpressionNode::literal(LiteralValue::Integer(2)),
            ExpressionNode::literal(LiteralValue::Integer(3)),
        );
        let product = ExpressionNode::binary_op(
            BinaryOperator::Multiply,
            sum,
            ExpressionNode::literal(LiteralValue::Integer(4)),
        );
        assert_eq!(product.to_string(), "(2 + 3) * 4");
    }

    #[test]
    fn test_display_function_call() {
        let call = ExpressionNode::function_call(
            "d2:hasValue",
            vec![ExpressionNode::attribute("w75KJ2mc4zz")],
        );
        assert_eq!(call.to_string(), "d2:hasValue(A{w75KJ2mc4zz})");
    }
}
