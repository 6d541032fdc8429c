//! # runs-on-config-validation
//!
//! Validation of `runs-on.yml` documents.
//!
//! A document goes through a fixed pipeline:
//!
//! 1. parsed into a position-aware tree ([`runs_on_yaml`]);
//! 2. polymorphic fields canonicalized on a copy ([`normalize`]);
//! 3. checked against the compiled schema ([`validate`]);
//! 4. scanned for deprecated fields on the original tree
//!    ([`scan_deprecations`]);
//! 5. mapped to an ordered, deduplicated list of [`Diagnostic`]s.
//!
//! ## Example
//!
//! ```rust
//! use runs_on_config_validation::{ConfigValidator, Severity};
//!
//! let validator = ConfigValidator::new().unwrap();
//! let report = validator.validate_str(
//!     "runners:\n  small:\n    cpu: [2]\n    ram: [16]\n    disk: large\n",
//! );
//!
//! assert!(report.is_valid());
//! assert_eq!(report.diagnostics()[0].severity, Severity::Warning);
//! ```

pub mod deprecation;
pub mod diagnostic;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod validator;

pub use deprecation::{DEPRECATED_FIELDS, DeprecatedField, Deprecation, scan_deprecations};
pub use diagnostic::{Diagnostic, Severity, ValidationReport};
pub use error::{
    InstancePath, LintError, PathSegment, SchemaError, SchemaResult, ValidationError,
    ValidationErrorKind,
};
pub use normalize::normalize;
pub use pipeline::{ConfigValidator, validate_str};
pub use schema::{CompiledSchema, SchemaNode};
pub use validator::{ValidationContext, validate};
