//! Entry points that run the whole validation pipeline on a document.

use std::borrow::Cow;
use std::io::Read;
use std::path::Path;

use crate::deprecation::scan_deprecations;
use crate::diagnostic::{Diagnostic, ValidationReport};
use crate::error::{LintError, SchemaError};
use crate::normalize::normalize;
use crate::schema::CompiledSchema;
use crate::validator::validate;

/// Validates runs-on.yml documents against a compiled schema.
///
/// A validator is immutable and can be shared between threads; each call
/// is independent of every other.
#[derive(Debug, Clone)]
pub struct ConfigValidator {
    schema: Cow<'static, CompiledSchema>,
}

impl ConfigValidator {
    /// A validator using the process-wide runs-on.yml schema.
    ///
    /// # Errors
    ///
    /// Fails if the schema cannot be loaded or compiled.
    pub fn new() -> Result<Self, SchemaError> {
        Ok(Self {
            schema: Cow::Borrowed(CompiledSchema::global()?),
        })
    }

    /// A validator using a caller-supplied schema.
    pub fn with_schema(schema: CompiledSchema) -> Self {
        Self {
            schema: Cow::Owned(schema),
        }
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    /// Validate document text.
    ///
    /// ```
    /// use runs_on_config_validation::ConfigValidator;
    ///
    /// let validator = ConfigValidator::new().unwrap();
    /// let report = validator.validate_str("runners:\n  r:\n    cpu: [2]\n    ram: [16]\n");
    /// assert!(report.is_valid());
    /// ```
    pub fn validate_str(&self, content: &str) -> ValidationReport {
        self.validate_document(content, None)
    }

    /// Read a document from `reader` and validate it.
    ///
    /// # Errors
    ///
    /// Fails only if the reader fails; violations are diagnostics.
    pub fn validate_reader(
        &self,
        mut reader: impl Read,
        source_name: &str,
    ) -> Result<ValidationReport, LintError> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|source| LintError::Io {
                source_name: source_name.to_string(),
                source,
            })?;
        Ok(self.validate_document(&content, Some(source_name)))
    }

    /// Read the file at `path` and validate it.
    ///
    /// # Errors
    ///
    /// Fails only if the file cannot be read.
    pub fn validate_file(&self, path: impl AsRef<Path>) -> Result<ValidationReport, LintError> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| LintError::Io {
            source_name: source_name.clone(),
            source,
        })?;
        Ok(self.validate_document(&content, Some(&source_name)))
    }

    fn validate_document(&self, content: &str, source_name: Option<&str>) -> ValidationReport {
        let parsed = match source_name {
            Some(name) => runs_on_yaml::parse_file(content, name),
            None => runs_on_yaml::parse(content),
        };
        let root = match parsed {
            Ok(root) => root,
            Err(err) => {
                tracing::debug!(source = source_name, error = %err, "document failed to parse");
                return ValidationReport::from_diagnostics(vec![Diagnostic::parse_error(&err)]);
            }
        };

        let normalized = normalize(&root);
        let structural = validate(&normalized, self.schema.root());
        let deprecations = scan_deprecations(&root);
        let report = ValidationReport::from_findings(&structural, &deprecations);

        tracing::debug!(
            source = source_name,
            errors = report.error_count(),
            warnings = report.warning_count(),
            "validated document"
        );
        report
    }
}

/// Validate document text with the process-wide schema.
///
/// # Errors
///
/// Fails if the schema cannot be loaded or compiled.
pub fn validate_str(content: &str) -> Result<ValidationReport, LintError> {
    Ok(ConfigValidator::new()?.validate_str(content))
}
