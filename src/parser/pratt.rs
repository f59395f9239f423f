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

//! Pratt parser for indicator expressions
//!
//! The parser builds the AST only. Function names, variables and uids are not
//! resolved here; that happens when the tree is compiled.

use super::error::{ParseError, ParseResult};
use super::span::Spanned;
use super::tokenizer::{Token, Tokenizer};
use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};
use smallvec::SmallVec;

/// Namespace of the program indicator functions
pub const D2_NAMESPACE: &str = "d2";

/// Prefix of the program stage event date placeholder
pub const STAGE_EVENT_DATE_PREFIX: &str = "PS_EVENTDATE";

/// Operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Logical OR (or, ||)
    Or = 1,
    /// Logical AND (and, &&)
    And = 2,
    /// Equality operators (==, !=)
    Equality = 3,
    /// Comparison operators (<, >, <=, >=) and the between / in tests
    Comparison = 4,
    /// Additive operators (+, -)
    Additive = 5,
    /// Multiplicative operators (*, /, %)
    Multiplicative = 6,
    /// Prefix operators (-, +, not)
    Unary = 7,
    /// Exponentiation (right associative)
    Power = 8,
}

impl Precedence {
    /// Convert precedence to raw u8 for fast comparison
    #[inline(always)]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the next higher precedence level for left-associative operators
    #[inline(always)]
    pub const fn next_level(self) -> Self {
        match self {
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Unary,
            Precedence::Unary => Precedence::Power,
            Precedence::Power => Precedence::Power,
        }
    }

    /// Check if this precedence is right associative
    #[inline(always)]
    pub const fn is_right_associative(self) -> bool {
        matches!(self, Precedence::Power)
    }
}

/// Precedence of a token used in infix position
#[inline(always)]
fn get_precedence(token: &Token<'_>) -> Option<Precedence> {
    match token {
        Token::Plus | Token::Minus => Some(Precedence::Additive),
        Token::Multiply | Token::Divide | Token::Modulo => Some(Precedence::Multiplicative),
        Token::Equal | Token::NotEqual => Some(Precedence::Equality),
        Token::LessThan
        | Token::LessThanOrEqual
        | Token::GreaterThan
        | Token::GreaterThanOrEqual
        | Token::Between
        | Token::In => Some(Precedence::Comparison),
        Token::And => Some(Precedence::And),
        Token::Or => Some(Precedence::Or),
        Token::Power => Some(Precedence::Power),
        _ => None,
    }
}

/// Convert token to binary operator
#[inline(always)]
fn token_to_binary_op(token: &Token<'_>) -> Option<BinaryOperator> {
    match token {
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        Token::Multiply => Some(BinaryOperator::Multiply),
        Token::Divide => Some(BinaryOperator::Divide),
        Token::Modulo => Some(BinaryOperator::Modulo),
        Token::Power => Some(BinaryOperator::Power),
        Token::Equal => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        Token::LessThan => Some(BinaryOperator::LessThan),
        Token::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
        Token::GreaterThan => Some(BinaryOperator::GreaterThan),
        Token::GreaterThanOrEqual => Some(BinaryOperator::GreaterThanOrEqual),
        Token::And => Some(BinaryOperator::And),
        Token::Or => Some(BinaryOperator::Or),
        _ => None,
    }
}

/// Pratt parser over a token stream
///
/// ### Precedence Levels (highest to lowest):
/// - **Power** (8): `^`, right associative, so `-2^2` is `-(2^2)`
/// - **Unary** (7): prefix `-`, `+`, `not`, `!`
/// - **Multiplicative** (6): `*`, `/`, `%`
/// - **Additive** (5): `+`, `-`
/// - **Comparison** (4): `<`, `>`, `<=`, `>=`, `between`, `in`
/// - **Equality** (3): `==`, `!=`
/// - **And** (2): `and`, `&&`
/// - **Or** (1): `or`, `||`
pub struct PrattParser<'input> {
    input: &'input str,
    tokenizer: Tokenizer<'input>,
    current_token: Option<Spanned<Token<'input>>>,
}

impl<'input> PrattParser<'input> {
    /// Create new parser
    #[inline]
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            tokenizer: Tokenizer::new(input),
            current_token: None,
        }
    }

    #[inline(always)]
    fn advance(&mut self) -> ParseResult<()> {
        self.current_token = self.tokenizer.next_token()?;
        Ok(())
    }

    #[inline(always)]
    fn current(&self) -> Option<&Token<'input>> {
        self.current_token.as_ref().map(|t| &t.value)
    }

    /// Start offset of the current token, or the input length at end of input
    #[inline(always)]
    fn current_position(&self) -> usize {
        self.current_token
            .as_ref()
            .map_or(self.input.len(), |t| t.start)
    }

    /// Error for the current token when it cannot be used here
    fn unexpected(&self) -> ParseError {
        match &self.current_token {
            Some(token) => ParseError::UnexpectedToken {
                token: token.text(self.input).to_string(),
                position: token.start,
            },
            None => ParseError::UnexpectedEndOfInput {
                position: self.input.len(),
            },
        }
    }

    /// Consume a closing parenthesis matching the one opened at `open_position`
    fn expect_closing_paren(&mut self, open_position: usize) -> ParseResult<()> {
        match self.current() {
            Some(Token::RightParen) => self.advance(),
            Some(_) => Err(self.unexpected()),
            None => Err(ParseError::UnbalancedParenthesis {
                position: open_position,
            }),
        }
    }

    /// Parse a parenthesized, comma separated list; the current token is `(`
    fn parse_argument_list(&mut self) -> ParseResult<SmallVec<[ExpressionNode; 4]>> {
        let open_position = self.current_position();
        self.advance()?;

        let mut args = SmallVec::new();
        if let Some(Token::RightParen) = self.current() {
            self.advance()?;
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression_with_precedence(Precedence::Or)?);
            match self.current() {
                Some(Token::Comma) => self.advance()?,
                _ => {
                    self.expect_closing_paren(open_position)?;
                    return Ok(args);
                }
            }
        }
    }

    /// Parse `name(args...)`; the current token is `(`
    fn parse_function_call(&mut self, name: String) -> ParseResult<ExpressionNode> {
        let args = self.parse_argument_list()?;
        Ok(ExpressionNode::function_call(name, args))
    }

    /// Parse what follows `namespace:`; the current token is the colon
    ///
    /// Namespace, colon and name form one word, so no whitespace between them.
    fn parse_namespaced(
        &mut self,
        namespace: &str,
        position: usize,
    ) -> ParseResult<ExpressionNode> {
        let colon_start = self.current_position();
        if colon_start != position + namespace.len() {
            return Err(self.unexpected());
        }
        self.advance()?;

        let name = match self.current() {
            Some(Token::Identifier(name)) if self.current_position() == colon_start + 1 => *name,
            _ => return Err(self.unexpected()),
        };

        match namespace {
            D2_NAMESPACE => {
                self.advance()?;
                match self.current() {
                    Some(Token::LeftParen) => {
                        self.parse_function_call(format!("{D2_NAMESPACE}:{name}"))
                    }
                    _ => Err(self.unexpected()),
                }
            }
            STAGE_EVENT_DATE_PREFIX => {
                self.advance()?;
                Ok(ExpressionNode::stage_event_date(name))
            }
            _ => Err(ParseError::UnknownNamespace {
                namespace: namespace.to_string(),
                position,
            }),
        }
    }

    /// Parse primary expression: literals, placeholders, calls, parentheses and prefix operators
    fn parse_primary(&mut self) -> ParseResult<ExpressionNode> {
        let Some(spanned) = self.current_token.clone() else {
            return Err(self.unexpected());
        };
        let position = spanned.start;

        match spanned.value {
            Token::Integer(value) => {
                self.advance()?;
                Ok(ExpressionNode::literal(LiteralValue::Integer(value)))
            }
            Token::Decimal(value) => {
                if value.parse::<f64>().is_err() {
                    return Err(ParseError::InvalidLiteral {
                        literal_type: "decimal".to_string(),
                        value: value.to_string(),
                        position,
                    });
                }
                self.advance()?;
                Ok(ExpressionNode::literal(LiteralValue::Decimal(
                    value.to_string(),
                )))
            }
            Token::String(value) => {
                let processed = Self::process_string_escapes(value, position)?;
                self.advance()?;
                Ok(ExpressionNode::literal(LiteralValue::String(processed)))
            }
            Token::True => {
                self.advance()?;
                Ok(ExpressionNode::literal(LiteralValue::Boolean(true)))
            }
            Token::False => {
                self.advance()?;
                Ok(ExpressionNode::literal(LiteralValue::Boolean(false)))
            }

            Token::StageElement {
                program_stage,
                data_element,
            } => {
                self.advance()?;
                Ok(ExpressionNode::stage_element(program_stage, data_element))
            }
            Token::Attribute(uid) => {
                self.advance()?;
                Ok(ExpressionNode::attribute(uid))
            }
            Token::Constant(uid) => {
                self.advance()?;
                Ok(ExpressionNode::constant(uid))
            }
            Token::Variable(name) => {
                self.advance()?;
                Ok(ExpressionNode::variable(name))
            }

            Token::Identifier(name) => {
                self.advance()?;
                match self.current() {
                    Some(Token::Colon) => self.parse_namespaced(name, position),
                    Some(Token::LeftParen) => self.parse_function_call(name.to_string()),
                    _ => Err(ParseError::UnknownIdentifier {
                        identifier: name.to_string(),
                        position,
                    }),
                }
            }

            Token::LeftParen => {
                self.advance()?;
                let expr = self.parse_expression_with_precedence(Precedence::Or)?;
                self.expect_closing_paren(position)?;
                Ok(expr)
            }

            Token::Minus | Token::Plus | Token::Not => {
                let op = match spanned.value {
                    Token::Minus => UnaryOperator::Negate,
                    Token::Plus => UnaryOperator::Positive,
                    _ => UnaryOperator::Not,
                };
                self.advance()?;
                let operand =
                    self.parse_expression_with_precedence(Precedence::Unary.next_level())?;
                Ok(ExpressionNode::unary_op(op, operand))
            }

            Token::RightParen => Err(ParseError::UnbalancedParenthesis { position }),

            _ => Err(self.unexpected()),
        }
    }

    /// Parse `between low and high` after the tested value; the current token is `between`
    fn parse_between(&mut self, value: ExpressionNode) -> ParseResult<ExpressionNode> {
        self.advance()?;
        let low = self.parse_expression_with_precedence(Precedence::Additive)?;
        match self.current() {
            Some(Token::And) => self.advance()?,
            _ => return Err(self.unexpected()),
        }
        let high = self.parse_expression_with_precedence(Precedence::Additive)?;
        Ok(ExpressionNode::between(value, low, high))
    }

    /// Parse `in (a, b, ...)` after the tested value; the current token is `in`
    fn parse_in(&mut self, value: ExpressionNode) -> ParseResult<ExpressionNode> {
        self.advance()?;
        if !matches!(self.current(), Some(Token::LeftParen)) {
            return Err(self.unexpected());
        }
        let list = self.parse_argument_list()?;
        if list.is_empty() {
            return Err(ParseError::UnexpectedToken {
                token: ")".to_string(),
                position: self.current_position().saturating_sub(1),
            });
        }
        Ok(ExpressionNode::in_list(value, list))
    }

    /// Core Pratt parsing loop
    fn parse_expression_with_precedence(
        &mut self,
        min_precedence: Precedence,
    ) -> ParseResult<ExpressionNode> {
        let mut left = self.parse_primary()?;

        while let Some(current_token) = self.current() {
            let precedence = match get_precedence(current_token) {
                Some(prec) if prec.as_u8() >= min_precedence.as_u8() => prec,
                _ => break,
            };

            match current_token {
                Token::Between => {
                    left = self.parse_between(left)?;
                    continue;
                }
                Token::In => {
                    left = self.parse_in(left)?;
                    continue;
                }
                _ => {}
            }

            let op = token_to_binary_op(current_token).ok_or_else(|| self.unexpected())?;
            self.advance()?;

            let next_min_precedence = if precedence.is_right_associative() {
                precedence
            } else {
                precedence.next_level()
            };

            let right = self.parse_expression_with_precedence(next_min_precedence)?;
            left = ExpressionNode::binary_op(op, left, right);
        }

        Ok(left)
    }

    /// Parse complete input
    pub fn parse(&mut self) -> ParseResult<ExpressionNode> {
        self.advance()?;
        let expr = self.parse_expression_with_precedence(Precedence::Or)?;

        match &self.current_token {
            None => Ok(expr),
            Some(token) if token.value == Token::RightParen => {
                Err(ParseError::UnbalancedParenthesis {
                    position: token.start,
                })
            }
            Some(_) => Err(self.unexpected()),
        }
    }

    /// Process escape sequences in string literals, including Unicode escapes
    fn process_string_escapes(input: &str, position: usize) -> ParseResult<String> {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars();

        while let Some(ch) = chars.next() {
            if ch != '\\' {
                result.push(ch);
                continue;
            }
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('\'') => result.push('\''),
                Some('"') => result.push('"'),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    let decoded = (hex.len() == 4)
                        .then(|| u32::from_str_radix(&hex, 16).ok())
                        .flatten()
                        .and_then(char::from_u32);
                    match decoded {
                        Some(unicode_char) => result.push(unicode_char),
                        None => {
                            return Err(ParseError::InvalidEscape {
                                sequence: format!("\\u{hex}"),
                                position,
                            });
                        }
                    }
                }
                Some(escaped_ch) => {
                    // Unknown escape sequence is kept literally
                    result.push('\\');
                    result.push(escaped_ch);
                }
                None => {
                    return Err(ParseError::InvalidEscape {
                        sequence: "\\".to_string(),
                        position,
                    });
                }
            }
        }

        Ok(result)
    }
}

/// Parse an expression with the Pratt parser
#[inline]
pub fn parse_expression_pratt(input: &str) -> ParseResult<ExpressionNode> {
    PrattParser::new(input).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ItemReference;

    fn parse(input: &str) -> ExpressionNode {
        parse_expression_pratt(input).unwrap()
    }

    #[test]
    fn test_precedence_ordering() {
        assert!(Precedence::Power > Precedence::Unary);
        assert!(Precedence::Multiplicative > Precedence::Additive);
        assert!(Precedence::Additive > Precedence::Comparison);
        assert!(Precedence::Comparison > Precedence::Equality);
        assert!(Precedence::Equality > Precedence::And);
        assert!(Precedence::And > Precedence::Or);
    }

    #[test]
    fn test_basic_expressions() {
        let result = parse("2 + 3 * 4");
        // Should parse as: 2 + (3 * 4) due to precedence
        if let ExpressionNode::BinaryOp(data) = result {
            assert_eq!(data.op, BinaryOperator::Add);
            assert!(matches!(
                data.left,
                ExpressionNode::Literal(LiteralValue::Integer(2))
            ));
            assert!(matches!(
                &data.right,
                ExpressionNode::BinaryOp(inner) if inner.op == BinaryOperator::Multiply
            ));
        } else {
            panic!("Expected addition with multiplication on right");
        }
    }

    #[test]
    fn test_unary_and_power() {
        assert_eq!(parse("-2^2").to_string(), "-2 ^ 2");
        if let ExpressionNode::UnaryOp { op, operand } = parse("-2^2") {
            assert_eq!(op, UnaryOperator::Negate);
            assert!(matches!(*operand, ExpressionNode::BinaryOp(_)));
        } else {
            panic!("Expected negation of a power");
        }

        // Right associative: 2 ^ (3 ^ 2)
        if let ExpressionNode::BinaryOp(data) = parse("2 ^ 3 ^ 2") {
            assert!(matches!(data.left, ExpressionNode::Literal(_)));
            assert!(matches!(data.right, ExpressionNode::BinaryOp(_)));
        } else {
            panic!("Expected power");
        }
    }

    #[test]
    fn test_logical_precedence() {
        let result = parse("1 < 2 and 3 > 4 || !true");
        if let ExpressionNode::BinaryOp(data) = result {
            assert_eq!(data.op, BinaryOperator::Or);
            assert!(matches!(
                &data.left,
                ExpressionNode::BinaryOp(inner) if inner.op == BinaryOperator::And
            ));
            assert!(matches!(
                data.right,
                ExpressionNode::UnaryOp {
                    op: UnaryOperator::Not,
                    ..
                }
            ));
        } else {
            panic!("Expected or at the root");
        }
    }

    #[test]
    fn test_function_calls() {
        let result = parse("d2:daysBetween(#{ps.de}, V{event_date})");
        match result {
            ExpressionNode::FunctionCall(data) => {
                assert_eq!(data.name, "d2:daysBetween");
                assert_eq!(data.args.len(), 2);
                assert!(matches!(data.args[1], ExpressionNode::Variable(_)));
            }
            other => panic!("Expected function call, got {other:?}"),
        }

        let result = parse("if(true, 1, 2)");
        assert!(matches!(result, ExpressionNode::FunctionCall(_)));

        let result = parse("d2:relationshipCount()");
        assert!(matches!(result, ExpressionNode::FunctionCall(data) if data.args.is_empty()));
    }

    #[test]
    fn test_stage_event_date() {
        let result = parse("PS_EVENTDATE:A03MvHHogjR");
        assert_eq!(
            result.as_item(),
            Some(&ItemReference::StageEventDate {
                program_stage_uid: "A03MvHHogjR".to_string()
            })
        );
    }

    #[test]
    fn test_between_and_in() {
        let result = parse("A{a} between 1 and 5 and C{c} in (1, 2)");
        if let ExpressionNode::BinaryOp(data) = result {
            assert_eq!(data.op, BinaryOperator::And);
            assert!(matches!(data.left, ExpressionNode::Between(_)));
            assert!(matches!(&data.right, ExpressionNode::In(inner) if inner.list.len() == 2));
        } else {
            panic!("Expected and of between and in");
        }
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            parse(r"'it\'s A'"),
            ExpressionNode::literal(LiteralValue::String("it's A".to_string()))
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_expression_pratt("2 + "),
            Err(ParseError::UnexpectedEndOfInput { position: 4 })
        ));
        assert!(matches!(
            parse_expression_pratt("(1 + 2"),
            Err(ParseError::UnbalancedParenthesis { position: 0 })
        ));
        assert!(matches!(
            parse_expression_pratt("1 + 2)"),
            Err(ParseError::UnbalancedParenthesis { position: 5 })
        ));
        assert!(matches!(
            parse_expression_pratt("foo:bar(1)"),
            Err(ParseError::UnknownNamespace { ref namespace, position: 0 }) if namespace == "foo"
        ));
        assert!(matches!(
            parse_expression_pratt("PS_EVENTDATE: ps1"),
            Err(ParseError::UnexpectedToken { ref token, position: 14 }) if token == "ps1"
        ));
        assert!(matches!(
            parse_expression_pratt("d2 :count(#{ps1.de1})"),
            Err(ParseError::UnexpectedToken { ref token, position: 3 }) if token == ":"
        ));
        assert!(matches!(
            parse_expression_pratt("value + 1"),
            Err(ParseError::UnknownIdentifier { .. })
        ));
        assert!(matches!(
            parse_expression_pratt("1 2"),
            Err(ParseError::UnexpectedToken { ref token, position: 2 }) if token == "2"
        ));
        assert!(matches!(
            parse_expression_pratt("A{a} in ()"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_expression_pratt(""),
            Err(ParseError::UnexpectedEndOfInput { position: 0 })
        ));
    }
}
