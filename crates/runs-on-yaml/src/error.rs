//! Error types for YAML parsing with source positions.

use crate::Position;
use thiserror::Error;

/// Result type alias for runs-on-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during YAML parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// YAML syntax error reported by the scanner or parser
    #[error("{message}")]
    Scan {
        message: String,
        position: Option<Position>,
    },

    /// The same key appears twice in one mapping
    #[error("mapping key \"{key}\" already defined at line {first_line}")]
    DuplicateKey {
        key: String,
        first_line: usize,
        position: Option<Position>,
    },

    /// Well-formed YAML that cannot be represented as a value tree
    #[error("{message}")]
    InvalidStructure {
        message: String,
        position: Option<Position>,
    },
}

impl Error {
    /// Where in the source the error was detected, if known.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Scan { position, .. }
            | Error::DuplicateKey { position, .. }
            | Error::InvalidStructure { position, .. } => *position,
        }
    }
}

impl From<yaml_rust2::ScanError> for Error {
    fn from(err: yaml_rust2::ScanError) -> Self {
        Error::Scan {
            message: err.to_string(),
            position: Some(Position::from_marker(err.marker())),
        }
    }
}
