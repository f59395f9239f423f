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

//! Function signatures for arity and type checking

use crate::model::ValueKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Function signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Parameters; for variadic functions the last one repeats
    pub parameters: Vec<ParameterInfo>,
    /// Return kind, `None` when it depends on the arguments
    pub return_kind: Option<ValueKind>,
    /// Minimum number of arguments
    pub min_arity: usize,
    /// Maximum number of arguments (None for variadic)
    pub max_arity: Option<usize>,
}

/// Shape an argument must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Any expression producing a value of this kind
    Value(ValueKind),
    /// Any expression
    Any,
    /// A placeholder item
    Item,
    /// A `#{stage.element}` placeholder
    StageElement,
    /// A string literal
    StringLiteral,
}

/// Parameter information for functions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// Accepted argument shape
    pub kind: ParameterKind,
    /// Whether this parameter is optional
    pub optional: bool,
}

impl FunctionSignature {
    /// Create a fixed arity signature; optional parameters lower the minimum
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<ParameterInfo>,
        return_kind: Option<ValueKind>,
    ) -> Self {
        let min_arity = parameters.iter().filter(|p| !p.optional).count();
        let max_arity = Some(parameters.len());

        Self {
            name: name.into(),
            parameters,
            return_kind,
            min_arity,
            max_arity,
        }
    }

    /// Create a variadic signature
    pub fn variadic(
        name: impl Into<String>,
        parameters: Vec<ParameterInfo>,
        return_kind: Option<ValueKind>,
    ) -> Self {
        let min_arity = parameters.iter().filter(|p| !p.optional).count();

        Self {
            name: name.into(),
            parameters,
            return_kind,
            min_arity,
            max_arity: None,
        }
    }

    /// Parameter that applies to the argument at `index`
    pub fn parameter_at(&self, index: usize) -> Option<&ParameterInfo> {
        match self.max_arity {
            None => self.parameters.get(index).or_else(|| self.parameters.last()),
            Some(_) => self.parameters.get(index),
        }
    }

    /// Whether `count` arguments are accepted
    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.min_arity && self.max_arity.is_none_or(|max| count <= max)
    }

    /// Accepted argument count as text, e.g. `1`, `1..3` or `1..`
    pub fn arity_text(&self) -> String {
        match self.max_arity {
            Some(max) if max == self.min_arity => max.to_string(),
            Some(max) => format!("{}..{max}", self.min_arity),
            None => format!("{}..", self.min_arity),
        }
    }
}

impl ParameterInfo {
    /// Create a required parameter
    pub fn required(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
        }
    }

    /// Create an optional parameter
    pub fn optional(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: true,
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(kind) => write!(f, "{kind}"),
            Self::Any => f.write_str("Any"),
            Self::Item => f.write_str("Item"),
            Self::StageElement => f.write_str("StageElement"),
            Self::StringLiteral => f.write_str("StringLiteral"),
        }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param.name, param.kind)?;
            if param.optional {
                write!(f, "?")?;
            }
        }
        if self.max_arity.is_none() {
            write!(f, "...")?;
        }
        match self.return_kind {
            Some(kind) => write!(f, ") -> {kind}"),
            None => write!(f, ") -> Any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        let sig = FunctionSignature::new(
            "d2:relationshipCount",
            vec![ParameterInfo::optional(
                "relationshipType",
                ParameterKind::StringLiteral,
            )],
            Some(ValueKind::Number),
        );
        assert!(sig.accepts_arity(0));
        assert!(sig.accepts_arity(1));
        assert!(!sig.accepts_arity(2));
        assert_eq!(sig.arity_text(), "0..1");
    }

    #[test]
    fn test_variadic_repeats_last_parameter() {
        let sig = FunctionSignature::variadic(
            "firstNonNull",
            vec![ParameterInfo::required("value", ParameterKind::Any)],
            None,
        );
        assert_eq!(sig.parameter_at(5).map(|p| p.kind), Some(ParameterKind::Any));
        assert_eq!(sig.arity_text(), "1..");
        assert_eq!(sig.to_string(), "firstNonNull(value: Any...) -> Any");
    }
}
