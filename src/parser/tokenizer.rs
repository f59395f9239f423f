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

//! Byte-level tokenizer for indicator expressions
//!
//! Tokens borrow from the input: string literals keep their raw text and escapes
//! are processed by the parser. Placeholders (`#{ps.de}`, `A{uid}`, `C{uid}`,
//! `V{name}`) are recognized here as single tokens.

use super::error::{ParseError, ParseResult};
use super::span::Spanned;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::fmt;

/// Token produced by the tokenizer
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    // Literals
    /// Integer literal (e.g., 42)
    Integer(i64),
    /// Decimal literal as string slice, parsed on demand (e.g., 3.14, 1e3)
    Decimal(&'input str),
    /// String literal content without quotes, escapes unprocessed
    String(&'input str),
    /// Boolean literal true
    True,
    /// Boolean literal false
    False,

    /// Identifier (function name, namespace, uid after a colon)
    Identifier(&'input str),

    // Placeholders
    /// `#{programStageUid.dataElementUid}`
    StageElement {
        /// Program stage uid
        program_stage: &'input str,
        /// Data element uid
        data_element: &'input str,
    },
    /// `A{attributeUid}`
    Attribute(&'input str),
    /// `C{constantUid}`
    Constant(&'input str),
    /// `V{variableName}`
    Variable(&'input str),

    // Operators
    /// Addition operator (+)
    Plus,
    /// Subtraction operator (-)
    Minus,
    /// Multiplication operator (*)
    Multiply,
    /// Division operator (/)
    Divide,
    /// Modulo operator (%)
    Modulo,
    /// Power operator (^)
    Power,
    /// Equality operator (= or ==)
    Equal,
    /// Inequality operator (!=)
    NotEqual,
    /// Less than operator (<)
    LessThan,
    /// Less than or equal operator (<=)
    LessThanOrEqual,
    /// Greater than operator (>)
    GreaterThan,
    /// Greater than or equal operator (>=)
    GreaterThanOrEqual,
    /// Logical AND operator (and, &&)
    And,
    /// Logical OR operator (or, ||)
    Or,
    /// Logical NOT operator (not, !)
    Not,
    /// Range keyword (between)
    Between,
    /// Membership keyword (in)
    In,

    // Punctuation
    /// Left parenthesis (
    LeftParen,
    /// Right parenthesis )
    RightParen,
    /// Comma separator (,)
    Comma,
    /// Colon (:) separating a namespace from a function name
    Colon,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Integer(value) => write!(f, "{value}"),
            Token::Decimal(value) | Token::Identifier(value) => f.write_str(value),
            Token::String(value) => write!(f, "'{value}'"),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::StageElement {
                program_stage,
                data_element,
            } => write!(f, "#{{{program_stage}.{data_element}}}"),
            Token::Attribute(uid) => write!(f, "A{{{uid}}}"),
            Token::Constant(uid) => write!(f, "C{{{uid}}}"),
            Token::Variable(name) => write!(f, "V{{{name}}}"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Multiply => f.write_str("*"),
            Token::Divide => f.write_str("/"),
            Token::Modulo => f.write_str("%"),
            Token::Power => f.write_str("^"),
            Token::Equal => f.write_str("=="),
            Token::NotEqual => f.write_str("!="),
            Token::LessThan => f.write_str("<"),
            Token::LessThanOrEqual => f.write_str("<="),
            Token::GreaterThan => f.write_str(">"),
            Token::GreaterThanOrEqual => f.write_str(">="),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
            Token::Not => f.write_str("not"),
            Token::Between => f.write_str("between"),
            Token::In => f.write_str("in"),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Colon => f.write_str(":"),
        }
    }
}

/// Shared keyword table
static KEYWORD_TABLE: Lazy<FxHashMap<&'static str, Token<'static>>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    map.insert("and", Token::And);
    map.insert("or", Token::Or);
    map.insert("not", Token::Not);
    map.insert("true", Token::True);
    map.insert("false", Token::False);
    map.insert("between", Token::Between);
    map.insert("in", Token::In);
    map
});

/// Tokenizer over the bytes of an expression
#[derive(Clone)]
pub struct Tokenizer<'input> {
    input: &'input str,
    bytes: &'input [u8],
    pos: usize,
    end: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a new tokenizer
    #[inline]
    pub fn new(input: &'input str) -> Self {
        let bytes = input.as_bytes();
        Self {
            input,
            bytes,
            pos: 0,
            end: bytes.len(),
        }
    }

    /// Get input string slice from byte positions
    #[inline(always)]
    fn slice(&self, start: usize, end: usize) -> &'input str {
        self.input.get(start..end).unwrap_or("")
    }

    /// Keyword lookup using the shared table
    #[inline(always)]
    fn keyword_lookup(word: &str) -> Option<Token<'static>> {
        if word.len() < 2 || word.len() > 7 {
            return None;
        }
        KEYWORD_TABLE.get(word).cloned()
    }

    #[inline(always)]
    fn is_id_start(ch: u8) -> bool {
        matches!(ch, b'A'..=b'Z' | b'a'..=b'z' | b'_')
    }

    #[inline(always)]
    fn is_id_continue(ch: u8) -> bool {
        matches!(ch, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_')
    }

    #[inline(always)]
    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.end {
            match self.bytes[self.pos] {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn scan_digits(&mut self) {
        while self.pos < self.end && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
    }

    /// Number literal: digits, optional fraction, optional exponent
    fn parse_number(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        self.scan_digits();

        let mut is_decimal = false;
        if self.peek_byte(0) == Some(b'.') && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit())
        {
            is_decimal = true;
            self.pos += 1;
            self.scan_digits();
        }

        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_byte(1), Some(b'+' | b'-')));
            if self
                .peek_byte(1 + sign)
                .is_some_and(|b| b.is_ascii_digit())
            {
                is_decimal = true;
                self.pos += 1 + sign;
                self.scan_digits();
            }
        }

        let text = self.slice(start, self.pos);
        if is_decimal {
            return Ok(Token::Decimal(text));
        }

        text.parse::<i64>()
            .map(Token::Integer)
            .map_err(|_| ParseError::InvalidLiteral {
                literal_type: "integer".to_string(),
                value: text.to_string(),
                position: start,
            })
    }

    fn parse_identifier(&mut self) -> &'input str {
        let start = self.pos;
        while self.pos < self.end && Self::is_id_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
        self.slice(start, self.pos)
    }

    /// String literal in single or double quotes
    fn parse_string_literal(&mut self, quote: u8) -> ParseResult<&'input str> {
        let opening = self.pos;
        self.pos += 1;
        let start = self.pos;

        while self.pos < self.end {
            match self.bytes[self.pos] {
                b if b == quote => {
                    let content = self.slice(start, self.pos);
                    self.pos += 1;
                    return Ok(content);
                }
                b'\\' => {
                    self.pos += if self.pos + 1 < self.end { 2 } else { 1 };
                }
                _ => self.pos += 1,
            }
        }

        Err(ParseError::UnclosedString { position: opening })
    }

    /// Placeholder body between `{` and `}`; `self.pos` points at the prefix
    fn parse_placeholder_body(&mut self, prefix_len: usize) -> ParseResult<(&'input str, usize)> {
        let start = self.pos;
        let body_start = start + prefix_len + 1;
        let close = self.bytes[body_start.min(self.end)..]
            .iter()
            .position(|b| *b == b'}')
            .map(|offset| body_start + offset);

        match close {
            Some(close) => {
                self.pos = close + 1;
                Ok((self.slice(body_start, close), start))
            }
            None => Err(ParseError::UnclosedPlaceholder {
                text: self.slice(start, self.end).to_string(),
                position: start,
            }),
        }
    }

    fn is_uid(text: &str) -> bool {
        !text.is_empty() && text.bytes().all(Self::is_id_continue)
    }

    fn invalid_placeholder(&self, start: usize) -> ParseError {
        ParseError::InvalidPlaceholder {
            text: self.slice(start, self.pos).to_string(),
            position: start,
        }
    }

    fn parse_stage_element(&mut self) -> ParseResult<Token<'input>> {
        let (body, start) = self.parse_placeholder_body(1)?;
        match body.split_once('.') {
            Some((program_stage, data_element))
                if Self::is_uid(program_stage) && Self::is_uid(data_element) =>
            {
                Ok(Token::StageElement {
                    program_stage,
                    data_element,
                })
            }
            _ => Err(self.invalid_placeholder(start)),
        }
    }

    fn parse_single_uid_placeholder(&mut self, prefix: u8) -> ParseResult<Token<'input>> {
        let (body, start) = self.parse_placeholder_body(1)?;
        if !Self::is_uid(body) {
            return Err(self.invalid_placeholder(start));
        }
        Ok(match prefix {
            b'A' => Token::Attribute(body),
            b'C' => Token::Constant(body),
            _ => Token::Variable(body),
        })
    }

    /// Produce the next token, or `None` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Spanned<Token<'input>>>> {
        self.skip_whitespace();

        if self.pos >= self.end {
            return Ok(None);
        }

        let start = self.pos;
        let byte = self.bytes[self.pos];
        let token = match byte {
            b'(' => {
                self.pos += 1;
                Token::LeftParen
            }
            b')' => {
                self.pos += 1;
                Token::RightParen
            }
            b',' => {
                self.pos += 1;
                Token::Comma
            }
            b':' => {
                self.pos += 1;
                Token::Colon
            }
            b'+' => {
                self.pos += 1;
                Token::Plus
            }
            b'-' => {
                self.pos += 1;
                Token::Minus
            }
            b'*' => {
                self.pos += 1;
                Token::Multiply
            }
            b'/' => {
                self.pos += 1;
                Token::Divide
            }
            b'%' => {
                self.pos += 1;
                Token::Modulo
            }
            b'^' => {
                self.pos += 1;
                Token::Power
            }
            b'=' => {
                self.pos += if self.peek_byte(1) == Some(b'=') { 2 } else { 1 };
                Token::Equal
            }
            b'!' => {
                if self.peek_byte(1) == Some(b'=') {
                    self.pos += 2;
                    Token::NotEqual
                } else {
                    self.pos += 1;
                    Token::Not
                }
            }
            b'<' => {
                if self.peek_byte(1) == Some(b'=') {
                    self.pos += 2;
                    Token::LessThanOrEqual
                } else {
                    self.pos += 1;
                    Token::LessThan
                }
            }
            b'>' => {
                if self.peek_byte(1) == Some(b'=') {
                    self.pos += 2;
                    Token::GreaterThanOrEqual
                } else {
                    self.pos += 1;
                    Token::GreaterThan
                }
            }
            b'&' if self.peek_byte(1) == Some(b'&') => {
                self.pos += 2;
                Token::And
            }
            b'|' if self.peek_byte(1) == Some(b'|') => {
                self.pos += 2;
                Token::Or
            }
            b'\'' | b'"' => Token::String(self.parse_string_literal(byte)?),
            b'#' if self.peek_byte(1) == Some(b'{') => self.parse_stage_element()?,
            b'A' | b'C' | b'V' if self.peek_byte(1) == Some(b'{') => {
                self.parse_single_uid_placeholder(byte)?
            }
            b'0'..=b'9' => self.parse_number()?,
            b if Self::is_id_start(b) => {
                let word = self.parse_identifier();
                let keyword: Option<Token<'input>> = Self::keyword_lookup(word);
                keyword.unwrap_or(Token::Identifier(word))
            }
            _ => {
                let character = self
                    .input
                    .get(start..)
                    .and_then(|rest| rest.chars().next())
                    .unwrap_or('\0');
                return Err(ParseError::UnknownCharacter {
                    character,
                    position: start,
                });
            }
        };

        Ok(Some(Spanned::new(token, start, self.pos)))
    }

    /// Tokenize the whole input
    pub fn tokenize_all(&mut self) -> ParseResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Current byte offset
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Tokenize an expression into spanned tokens
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned<Token<'_>>>> {
    Tokenizer::new(input).tokenize_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn test_tokenizer_basic() {
        let mut tokenizer = Tokenizer::new("d2:count(#{ps1.de1})");

        assert_eq!(
            tokenizer.next_token().unwrap().unwrap().value,
            Token::Identifier("d2")
        );
        assert_eq!(tokenizer.next_token().unwrap().unwrap().value, Token::Colon);
        assert_eq!(
            tokenizer.next_token().unwrap().unwrap().value,
            Token::Identifier("count")
        );
        assert_eq!(
            tokenizer.next_token().unwrap().unwrap().value,
            Token::LeftParen
        );
        let item = tokenizer.next_token().unwrap().unwrap();
        assert_eq!(
            item.value,
            Token::StageElement {
                program_stage: "ps1",
                data_element: "de1"
            }
        );
        assert_eq!((item.start, item.end), (9, 19));
        assert_eq!(
            tokenizer.next_token().unwrap().unwrap().value,
            Token::RightParen
        );
        assert!(tokenizer.next_token().unwrap().is_none());
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            values("= == != < <= > >= && || ! and or not"),
            vec![
                Token::Equal,
                Token::Equal,
                Token::NotEqual,
                Token::LessThan,
                Token::LessThanOrEqual,
                Token::GreaterThan,
                Token::GreaterThanOrEqual,
                Token::And,
                Token::Or,
                Token::Not,
                Token::And,
                Token::Or,
                Token::Not,
            ]
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            values("A{w75KJ2mc4zz} C{Gfd3ppDfq8E} V{event_date}"),
            vec![
                Token::Attribute("w75KJ2mc4zz"),
                Token::Constant("Gfd3ppDfq8E"),
                Token::Variable("event_date"),
            ]
        );
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            values("'hello world' \"it's\""),
            vec![Token::String("hello world"), Token::String("it's")]
        );
        assert_eq!(values(r"'a\'b'"), vec![Token::String(r"a\'b")]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            values("42 3.14 1e3 0"),
            vec![
                Token::Integer(42),
                Token::Decimal("3.14"),
                Token::Decimal("1e3"),
                Token::Integer(0),
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            tokenize("'open"),
            Err(ParseError::UnclosedString { position: 0 })
        ));
        assert!(matches!(
            tokenize("1 + #{ps.de"),
            Err(ParseError::UnclosedPlaceholder { position: 4, .. })
        ));
        assert!(matches!(
            tokenize("#{onlyone}"),
            Err(ParseError::InvalidPlaceholder { .. })
        ));
        assert!(matches!(
            tokenize("1 $ 2"),
            Err(ParseError::UnknownCharacter {
                character: '$',
                position: 2
            })
        ));
        assert!(matches!(
            tokenize("99999999999999999999"),
            Err(ParseError::InvalidLiteral { .. })
        ));
    }
}
