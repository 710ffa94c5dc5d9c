//! Source locations attached to parsed nodes
#![allow(clippy::must_use_candidate)] // Constructor helpers are clear at call sites without #[must_use].

use serde::Serialize;
use std::fmt;

/// Position of a parsed node within its source document
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    /// Document name or identifier, when known
    pub source: Option<String>,

    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new location
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            source: None,
            line,
            column,
        }
    }

    /// Attach the document name
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{source}:{}:{}", self.line, self.column),
            None => write!(f, "({}, {})", self.line, self.column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = SourceLocation::new(3, 14);
        assert_eq!(loc.to_string(), "(3, 14)");

        let named = loc.with_source("model.xml");
        assert_eq!(named.to_string(), "model.xml:3:14");
    }
}
