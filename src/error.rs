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

//! Error types for expression compilation
//!
//! This module defines the error types used throughout the compiler, the
//! indicator engine and the analytics table pipeline.

use crate::parser::ParseError;
use std::fmt;
use thiserror::Error;

/// Result type alias for compiler operations
pub type Result<T> = std::result::Result<T, ExpressionError>;

/// What kind of name failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Function name
    Function,
    /// Program variable name
    Variable,
    /// Placeholder kind without a registered handler
    Item,
    /// Data element uid
    DataElement,
    /// Program stage uid
    ProgramStage,
    /// Tracked entity attribute uid
    Attribute,
    /// Constant uid
    Constant,
    /// Relationship type uid
    RelationshipType,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Function => "function",
            Self::Variable => "program variable",
            Self::Item => "item",
            Self::DataElement => "data element",
            Self::ProgramStage => "program stage",
            Self::Attribute => "tracked entity attribute",
            Self::Constant => "constant",
            Self::RelationshipType => "relationship type",
        };
        f.write_str(name)
    }
}

/// Comprehensive error type for expression compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Malformed expression text
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// A name or uid did not resolve
    #[error("Unresolved {kind} reference: {identifier}")]
    UnresolvedReference {
        /// Kind of the reference
        kind: ReferenceKind,
        /// The identifier as written
        identifier: String,
    },

    /// Operand or result of an unexpected type
    #[error("Type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        actual: String,
        /// Operator or function where the mismatch occurred
        context: String,
    },

    /// Wrong number of function arguments
    #[error("Function '{function_name}' expects {expected} arguments, got {actual}")]
    Arity {
        /// Function name
        function_name: String,
        /// Accepted argument count, e.g. `1` or `1..3` or `1..`
        expected: String,
        /// Number of arguments given
        actual: usize,
    },

    /// Argument of the right type but unusable shape or value
    #[error("Invalid argument to '{function_name}': {message}")]
    InvalidArgument {
        /// Function name
        function_name: String,
        /// What is wrong with the argument
        message: String,
    },

    /// Handler has no SQL form
    #[error("'{name}' cannot be rendered as SQL")]
    SqlUnsupported {
        /// Function or item name
        name: String,
    },

    /// Compilation needs context the caller did not supply
    #[error("Missing compilation context: {what}")]
    MissingContext {
        /// Description of the missing piece
        what: String,
    },

    /// Analytics table statement could not be built or executed
    #[error("Analytics table error: {message}")]
    AnalyticsTable {
        /// Error message
        message: String,
    },
}

impl ExpressionError {
    /// Create an unresolved reference error
    pub fn unresolved(kind: ReferenceKind, identifier: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind,
            identifier: identifier.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        expected: impl Into<String>,
        actual: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
            context: context.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(function_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function_name: function_name.into(),
            message: message.into(),
        }
    }

    /// Create an error for a handler without a SQL form
    pub fn sql_unsupported(name: impl Into<String>) -> Self {
        Self::SqlUnsupported { name: name.into() }
    }

    /// Create a missing context error
    pub fn missing_context(what: impl Into<String>) -> Self {
        Self::MissingContext { what: what.into() }
    }

    /// Create an analytics table error
    pub fn analytics_table(message: impl Into<String>) -> Self {
        Self::AnalyticsTable {
            message: message.into(),
        }
    }

    /// Check if this is a parse error
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_conversion() {
        let err: ExpressionError = ParseError::UnexpectedEndOfInput { position: 4 }.into();
        assert!(err.is_parse_error());
        assert_eq!(
            err.to_string(),
            "Parse error: Unexpected end of input at position 4"
        );
    }

    #[test]
    fn test_unresolved_display() {
        let err = ExpressionError::unresolved(ReferenceKind::DataElement, "a3kGcGDCuk6");
        assert_eq!(
            err.to_string(),
            "Unresolved data element reference: a3kGcGDCuk6"
        );
    }
}
