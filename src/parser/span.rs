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

//! Source location tracking for parser

/// A value with source location information
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// The value
    pub value: T,
    /// Start position in the input
    pub start: usize,
    /// End position in the input
    pub end: usize,
}

impl<T> Spanned<T> {
    /// Create a new spanned value
    pub fn new(value: T, start: usize, end: usize) -> Self {
        Self { value, start, end }
    }

    /// Get the span length
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Source text covered by this span
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        input.get(self.start..self.end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_text() {
        let spanned = Spanned::new((), 4, 7);
        assert_eq!(spanned.len(), 3);
        assert!(!spanned.is_empty());
        assert_eq!(spanned.text("1 + abc"), "abc");
    }
}
