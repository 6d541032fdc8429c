//! Diagnostics reported for a runs-on.yml document.
//!
//! Every finding of a validation run (parse failure, schema violation or
//! deprecated field) becomes a [`Diagnostic`]. A [`ValidationReport`] holds
//! them in reporting order and decides the pass/fail verdict.

use std::collections::HashSet;
use std::fmt;

use runs_on_yaml::Position;
use serde::{Deserialize, Serialize};

use crate::deprecation::Deprecation;
use crate::error::ValidationError;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The document does not satisfy the schema
    Error,
    /// Accepted, but should be changed
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single reported issue.
///
/// `line` and `column` are 1-based, or 0 when the position is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Dotted instance path, `(root)` for the document itself
    pub path: String,
    pub line: usize,
    pub column: usize,
    /// Full message, starting with the path
    pub message: String,
    pub severity: Severity,
    /// Kebab-case identifier of the kind of finding
    pub code: String,
}

/// Code of the diagnostic produced when the document is not valid YAML.
pub const PARSE_ERROR_CODE: &str = "parse-error";

/// Code of the diagnostics produced for deprecated fields.
pub const DEPRECATED_FIELD_CODE: &str = "deprecated-field";

impl Diagnostic {
    fn at(
        path: String,
        position: Option<Position>,
        message: String,
        severity: Severity,
        code: &str,
    ) -> Self {
        let (line, column) = position.map_or((0, 0), |p| (p.line, p.column));
        Self {
            path,
            line,
            column,
            message,
            severity,
            code: code.to_string(),
        }
    }

    /// The single diagnostic for a document that failed to parse.
    pub fn parse_error(error: &runs_on_yaml::Error) -> Self {
        Self::at(
            "(root)".to_string(),
            error.position(),
            format!("YAML parse error: {}", error),
            Severity::Error,
            PARSE_ERROR_CODE,
        )
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Whether the diagnostic points at a known position.
    pub fn has_position(&self) -> bool {
        self.line > 0
    }
}

impl From<&ValidationError> for Diagnostic {
    fn from(error: &ValidationError) -> Self {
        Self::at(
            error.instance_path.to_string(),
            error.position,
            error.message(),
            Severity::Error,
            error.code(),
        )
    }
}

impl From<&Deprecation> for Diagnostic {
    fn from(deprecation: &Deprecation) -> Self {
        Self::at(
            deprecation.instance_path.to_string(),
            deprecation.position,
            deprecation.message(),
            Severity::Warning,
            DEPRECATED_FIELD_CODE,
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_position() {
            write!(f, "{}:{}: ", self.line, self.column)?;
        }
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// The outcome of validating one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// Build a report from structural violations and deprecation hits.
    ///
    /// Structural diagnostics come first, then deprecation diagnostics, each
    /// in the order they were found. A diagnostic identical to an earlier
    /// one (same path, message and position) is dropped.
    pub fn from_findings(structural: &[ValidationError], deprecations: &[Deprecation]) -> Self {
        let candidates = structural
            .iter()
            .map(Diagnostic::from)
            .chain(deprecations.iter().map(Diagnostic::from));

        let mut seen = HashSet::new();
        let diagnostics = candidates
            .filter(|d| seen.insert((d.path.clone(), d.message.clone(), d.line, d.column)))
            .collect();
        Self { diagnostics }
    }

    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// A document is valid when no diagnostic has `Error` severity.
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
