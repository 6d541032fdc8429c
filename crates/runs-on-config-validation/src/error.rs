// Error types for runs-on.yml validation

use runs_on_yaml::Position;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while loading or compiling the schema.
///
/// These are startup failures: a schema that does not compile makes every
/// document unvalidatable, so they are never turned into diagnostics.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema text is not valid YAML
    #[error("schema is not valid YAML: {0}")]
    Yaml(#[from] runs_on_yaml::Error),

    /// Unknown schema type name
    #[error("unknown schema type '{name}'{}", at(.position))]
    InvalidType {
        name: String,
        position: Option<Position>,
    },

    /// Malformed schema structure
    #[error("invalid schema structure: {message}{}", at(.position))]
    InvalidStructure {
        message: String,
        position: Option<Position>,
    },

    /// A `pattern` that is not a valid regular expression
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    /// `ref` to a definition that does not exist
    #[error("unresolved schema reference '{name}'")]
    UnresolvedRef { name: String },

    /// `ref` chain that leads back to itself
    #[error("cyclic schema reference '{name}'")]
    CyclicRef { name: String },

    /// No schema text available, embedded or on disk
    #[error("failed to read schema file (searched: {})", .searched.join(", "))]
    NotFound { searched: Vec<String> },
}

fn at(position: &Option<Position>) -> String {
    match position {
        Some(p) => format!(" at line {}, column {}", p.line, p.column),
        None => String::new(),
    }
}

/// Result type for schema parsing operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Failures of a validation call that are not diagnostics: the document
/// could not be read, or the schema could not be loaded.
#[derive(Debug, Error)]
pub enum LintError {
    #[error("failed to read {source_name}: {source}")]
    Io {
        source_name: String,
        source: std::io::Error,
    },

    #[error("failed to load schema: {0}")]
    Schema(#[from] SchemaError),
}

/// Structured validation error kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    /// Value has the wrong runtime type
    TypeMismatch { expected: String, got: String },

    /// String does not match the schema pattern
    PatternMismatch { value: String, pattern: String },

    /// Integer below the schema's lower bound
    BelowMinimum { value: i64, minimum: i64 },

    /// String not in the schema's fixed set
    InvalidEnumValue { value: String, allowed: Vec<String> },

    /// None of a union's alternatives matched
    NoMatchingAlternative { expected: String, got: String },

    /// Required field absent from a struct
    MissingRequiredField { field: String },

    /// Field not declared by a closed struct
    UnknownField { field: String },
}

impl ValidationErrorKind {
    /// Stable identifier for this kind of violation.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationErrorKind::TypeMismatch { .. } => "type-mismatch",
            ValidationErrorKind::PatternMismatch { .. } => "pattern-mismatch",
            ValidationErrorKind::BelowMinimum { .. } => "below-minimum",
            ValidationErrorKind::InvalidEnumValue { .. } => "invalid-enum-value",
            ValidationErrorKind::NoMatchingAlternative { .. } => "no-matching-alternative",
            ValidationErrorKind::MissingRequiredField { .. } => "missing-required-field",
            ValidationErrorKind::UnknownField { .. } => "unknown-field",
        }
    }

    /// Format a human-readable message from this error kind
    pub fn message(&self) -> String {
        match self {
            ValidationErrorKind::TypeMismatch { expected, got }
            | ValidationErrorKind::NoMatchingAlternative { expected, got } => {
                format!("expected {}, got {}", expected, got)
            }
            ValidationErrorKind::PatternMismatch { value, pattern } => {
                format!("expected string matching /{}/, got {}", pattern, value)
            }
            ValidationErrorKind::BelowMinimum { value, minimum } => {
                format!("expected integer >= {}, got {}", minimum, value)
            }
            ValidationErrorKind::InvalidEnumValue { value, allowed } => {
                format!("expected one of {}, got {}", quote_all(allowed), value)
            }
            ValidationErrorKind::MissingRequiredField { field } => {
                format!("missing required field '{}'", field)
            }
            ValidationErrorKind::UnknownField { field } => {
                format!("unknown field '{}'", field)
            }
        }
    }
}

pub(crate) fn quote_all(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("{:?}", v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validation error with source position information
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// The structured error kind
    pub kind: ValidationErrorKind,
    /// Instance path where the error occurred (e.g., runners.small.cpu)
    pub instance_path: InstancePath,
    /// Position of the offending node, if it came from the source
    pub position: Option<Position>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(
        kind: ValidationErrorKind,
        instance_path: InstancePath,
        position: Option<Position>,
    ) -> Self {
        Self {
            kind,
            instance_path,
            position,
        }
    }

    /// Human-readable message, prefixed with the instance path.
    pub fn message(&self) -> String {
        format!("{}: {}", self.instance_path, self.kind.message())
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Instance path (e.g., `pools.default.schedule[0].hot`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstancePath {
    segments: Vec<PathSegment>,
}

impl InstancePath {
    /// Create a new empty instance path
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Push a key segment onto the path
    pub fn push_key(&mut self, key: impl Into<String>) {
        self.segments.push(PathSegment::Key(key.into()));
    }

    /// Push an index segment onto the path
    pub fn push_index(&mut self, index: usize) {
        self.segments.push(PathSegment::Index(index));
    }

    /// Pop the last segment from the path
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    /// A copy of this path with one more key segment
    pub fn child_key(&self, key: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.push_key(key);
        child
    }

    /// Get the segments as a slice
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Check if the path is empty
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Get the length of the path
    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "(root)");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i > 0 => write!(f, ".{}", key)?,
                PathSegment::Key(key) => write!(f, "{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// A segment in an instance path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Mapping key
    Key(String),
    /// Sequence index
    Index(usize),
}
