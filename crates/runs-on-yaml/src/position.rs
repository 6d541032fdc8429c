//! Source positions for YAML nodes.

use std::fmt;

/// Position of a token in the original source text.
///
/// Both fields are 1-based. Nodes that were synthesized rather than read
/// from a token carry no position at all (`Option<Position>::None`), so a
/// `Position` is never a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Line number (1-based)
    pub line: usize,

    /// Column number (1-based, in characters)
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Create a Position from a yaml-rust2 marker.
    ///
    /// yaml-rust2 counts lines from 1 and columns from 0.
    pub fn from_marker(marker: &yaml_rust2::scanner::Marker) -> Self {
        Self {
            line: marker.line().max(1),
            column: marker.col() + 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Position::new(3, 7).to_string(), "3:7");
    }

    #[test]
    fn test_ordering_is_line_major() {
        assert!(Position::new(1, 40) < Position::new(2, 1));
        assert!(Position::new(2, 1) < Position::new(2, 2));
    }
}
