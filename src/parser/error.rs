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

//! Parser error types

use thiserror::Error;

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse error with location information
///
/// Positions are byte offsets into the expression text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Unexpected token
    #[error("Unexpected token '{token}' at position {position}")]
    UnexpectedToken {
        /// The unexpected token that was found
        token: String,
        /// Position where the token was found
        position: usize,
    },

    /// Unexpected end of input at specific position
    #[error("Unexpected end of input at position {position}")]
    UnexpectedEndOfInput {
        /// Position where more input was expected
        position: usize,
    },

    /// Character that starts no token
    #[error("Unknown character '{character}' at position {position}")]
    UnknownCharacter {
        /// The offending character
        character: char,
        /// Position of the character
        position: usize,
    },

    /// Invalid literal value
    #[error("Invalid {literal_type} literal at position {position}: {value}")]
    InvalidLiteral {
        /// Type of literal that failed to parse
        literal_type: String,
        /// The invalid value that was encountered
        value: String,
        /// Position where the invalid literal was found
        position: usize,
    },

    /// Invalid escape sequence
    #[error("Invalid escape sequence at position {position}: {sequence}")]
    InvalidEscape {
        /// The invalid escape sequence
        sequence: String,
        /// Position where the escape sequence was found
        position: usize,
    },

    /// Unclosed string literal
    #[error("Unclosed string literal starting at position {position}")]
    UnclosedString {
        /// Position where the unclosed string started
        position: usize,
    },

    /// Placeholder without its closing brace
    #[error("Unclosed placeholder '{text}' starting at position {position}")]
    UnclosedPlaceholder {
        /// Placeholder text up to the end of input
        text: String,
        /// Position where the placeholder started
        position: usize,
    },

    /// Placeholder whose content is not a valid uid reference
    #[error("Invalid placeholder '{text}' at position {position}")]
    InvalidPlaceholder {
        /// Full placeholder text
        text: String,
        /// Position where the placeholder started
        position: usize,
    },

    /// Parenthesis opened but never closed, or closed without being opened
    #[error("Unbalanced parenthesis at position {position}")]
    UnbalancedParenthesis {
        /// Position of the unmatched parenthesis
        position: usize,
    },

    /// Function namespace other than `d2`
    #[error("Unknown function namespace '{namespace}' at position {position}")]
    UnknownNamespace {
        /// The namespace prefix
        namespace: String,
        /// Position of the namespace
        position: usize,
    },

    /// Identifier that is neither a function call nor a keyword
    #[error("Unknown identifier '{identifier}' at position {position}")]
    UnknownIdentifier {
        /// The identifier
        identifier: String,
        /// Position of the identifier
        position: usize,
    },
}

impl ParseError {
    /// Byte offset the error refers to
    pub fn position(&self) -> usize {
        match self {
            Self::UnexpectedToken { position, .. }
            | Self::UnexpectedEndOfInput { position }
            | Self::UnknownCharacter { position, .. }
            | Self::InvalidLiteral { position, .. }
            | Self::InvalidEscape { position, .. }
            | Self::UnclosedString { position }
            | Self::UnclosedPlaceholder { position, .. }
            | Self::InvalidPlaceholder { position, .. }
            | Self::UnbalancedParenthesis { position }
            | Self::UnknownNamespace { position, .. }
            | Self::UnknownIdentifier { position, .. } => *position,
        }
    }

    /// Up to `width` characters of `input` starting at the error position
    pub fn excerpt<'a>(&self, input: &'a str, width: usize) -> &'a str {
        let start = self.position().min(input.len());
        let start = (0..=start)
            .rev()
            .find(|i| input.is_char_boundary(*i))
            .unwrap_or(0);
        let rest = &input[start..];
        match rest.char_indices().nth(width) {
            Some((end, _)) => &rest[..end],
            None => rest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_and_excerpt() {
        let err = ParseError::UnknownCharacter {
            character: '$',
            position: 4,
        };
        assert_eq!(err.position(), 4);
        assert_eq!(err.excerpt("1 + $foo", 3), "$fo");
        assert_eq!(err.excerpt("1 + $", 10), "$");
    }

    #[test]
    fn test_display() {
        let err = ParseError::UnknownNamespace {
            namespace: "foo".to_string(),
            position: 0,
        };
        assert_eq!(
            err.to_string(),
            "Unknown function namespace 'foo' at position 0"
        );
    }
}
