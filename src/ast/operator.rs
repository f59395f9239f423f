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

//! Operator definitions for indicator expressions
//!
//! Binary and unary operators together with their binding strength, used both by
//! the parser and by the SQL renderer when deciding where parentheses are needed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators in indicator expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Arithmetic operators
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Subtract,
    /// Multiplication (*)
    Multiply,
    /// Division (/)
    Divide,
    /// Modulo (%)
    Modulo,
    /// Exponentiation (^)
    Power,

    // Comparison operators
    /// Equality (= or ==)
    Equal,
    /// Inequality (!=)
    NotEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,

    // Logical operators
    /// Logical AND (and, &&)
    And,
    /// Logical OR (or, ||)
    Or,
}

/// Unary operators in indicator expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Arithmetic negation (-)
    Negate,
    /// Positive sign (+)
    Positive,
    /// Logical negation (not, !)
    Not,
}

impl BinaryOperator {
    /// Get the precedence level of this operator (higher = binds tighter)
    pub fn precedence(self) -> u8 {
        match self {
            Self::Power => 8,
            Self::Multiply | Self::Divide | Self::Modulo => 6,
            Self::Add | Self::Subtract => 5,
            Self::LessThan
            | Self::LessThanOrEqual
            | Self::GreaterThan
            | Self::GreaterThanOrEqual => {
                4
            }
            Self::Equal | Self::NotEqual => 3,
            Self::And => 2,
            Self::Or => 1,
        }
    }

    /// Check if this operator is right-associative
    pub fn is_right_associative(self) -> bool {
        matches!(self, Self::Power)
    }

    /// Check if this operator is arithmetic
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo | Self::Power
        )
    }

    /// Check if this operator is a comparison
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::LessThan
                | Self::LessThanOrEqual
                | Self::GreaterThan
                | Self::GreaterThanOrEqual
        )
    }

    /// Check if this operator is an ordering comparison
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::LessThan | Self::LessThanOrEqual | Self::GreaterThan | Self::GreaterThanOrEqual
        )
    }

    /// Check if this operator is logical
    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// Get the expression-language symbol of this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Power => "^",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// Get the SQL spelling of this operator
    pub fn sql_symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            other => other.symbol(),
        }
    }
}

impl UnaryOperator {
    /// Get the expression-language symbol of this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Positive => "+",
            Self::Not => "not",
        }
    }

    /// Get the SQL prefix for this operator
    pub fn sql_prefix(&self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Positive => "+",
            Self::Not => "not ",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_order() {
        assert!(BinaryOperator::Power.precedence() > BinaryOperator::Multiply.precedence());
        assert!(BinaryOperator::Multiply.precedence() > BinaryOperator::Add.precedence());
        assert!(BinaryOperator::Add.precedence() > BinaryOperator::LessThan.precedence());
        assert!(BinaryOperator::LessThan.precedence() > BinaryOperator::Equal.precedence());
        assert!(BinaryOperator::Equal.precedence() > BinaryOperator::And.precedence());
        assert!(BinaryOperator::And.precedence() > BinaryOperator::Or.precedence());
    }

    #[test]
    fn test_sql_symbols() {
        assert_eq!(BinaryOperator::Equal.sql_symbol(), "=");
        assert_eq!(BinaryOperator::NotEqual.sql_symbol(), "!=");
        assert_eq!(UnaryOperator::Not.sql_prefix(), "not ");
    }
}
