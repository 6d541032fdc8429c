//! Where the runs-on.yml schema comes from
//!
//! The schema ships inside the binary. Development builds that blank the
//! embedded copy fall back to reading it from a short list of paths, which
//! lets the schema be edited without recompiling.

use std::borrow::Cow;
use std::path::Path;
use std::str::FromStr;

use once_cell::sync::OnceCell;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::{SchemaNode, compile};

/// Schema text compiled into the crate.
pub const EMBEDDED_SCHEMA: &str = include_str!("../../schema/runs-on.yml");

/// Relative paths searched, in order, when the embedded schema is empty.
pub const DEV_SCHEMA_PATHS: &[&str] = &[
    "schema/runs-on.yml",
    "../../schema/runs-on.yml",
    "runs-on.yml",
];

static GLOBAL_SCHEMA: OnceCell<CompiledSchema> = OnceCell::new();

/// Return the schema text, preferring the embedded copy.
///
/// # Errors
///
/// Returns [`SchemaError::NotFound`] if the embedded copy is blank and none
/// of [`DEV_SCHEMA_PATHS`] can be read.
pub fn load_schema_text() -> SchemaResult<Cow<'static, str>> {
    select_schema_text(EMBEDDED_SCHEMA, Path::new(""), DEV_SCHEMA_PATHS)
}

/// Use `embedded` unless it is blank, else the first readable candidate
/// under `base`.
fn select_schema_text(
    embedded: &'static str,
    base: &Path,
    candidates: &[&str],
) -> SchemaResult<Cow<'static, str>> {
    if !embedded.trim().is_empty() {
        return Ok(Cow::Borrowed(embedded));
    }
    for candidate in candidates {
        let path = base.join(candidate);
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                tracing::debug!(path = %path.display(), "loaded schema from disk");
                return Ok(Cow::Owned(text));
            }
            Err(err) => {
                tracing::trace!(
                    path = %path.display(),
                    error = %err,
                    "schema candidate not readable"
                );
            }
        }
    }
    Err(SchemaError::NotFound {
        searched: candidates.iter().map(|p| p.to_string()).collect(),
    })
}

/// A compiled schema ready for validation.
///
/// Compiled trees are immutable, so one instance can be shared by any number
/// of concurrent validations.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    root: SchemaNode,
}

impl CompiledSchema {
    pub fn new(root: SchemaNode) -> Self {
        Self { root }
    }

    /// Load and compile the runs-on.yml schema.
    pub fn load() -> SchemaResult<Self> {
        let text = load_schema_text()?;
        text.parse()
    }

    /// The process-wide schema, compiled on first use.
    ///
    /// A failed load is not cached; the next call tries again.
    pub fn global() -> SchemaResult<&'static CompiledSchema> {
        GLOBAL_SCHEMA.get_or_try_init(CompiledSchema::load)
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }
}

impl FromStr for CompiledSchema {
    type Err = SchemaError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(compile(text)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_schema_compiles() {
        let schema = CompiledSchema::load().unwrap();
        let root = schema.root().as_struct().unwrap();
        assert!(root.open);
        let names: Vec<_> = root.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["_extends", "runners", "images", "pools", "admins"]);
    }

    #[test]
    fn test_non_blank_embedded_text_wins() {
        let text = select_schema_text("root: Config\n", Path::new("/nonexistent"), &[]).unwrap();
        assert!(matches!(text, Cow::Borrowed("root: Config\n")));
    }

    #[test]
    fn test_blank_embedded_falls_back_to_disk() {
        let base = Path::new(env!("CARGO_MANIFEST_DIR"));
        let text = select_schema_text(" \n", base, &["missing.yml", "schema/runs-on.yml"]).unwrap();
        assert!(matches!(text, Cow::Owned(_)));
        assert_eq!(text, EMBEDDED_SCHEMA);
    }

    #[test]
    fn test_blank_embedded_without_candidates_is_not_found() {
        let base = Path::new(env!("CARGO_MANIFEST_DIR"));
        let err = select_schema_text("", base, &["missing.yml", "also-missing.yml"]).unwrap_err();
        match err {
            SchemaError::NotFound { searched } => {
                assert_eq!(searched, vec!["missing.yml", "also-missing.yml"]);
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_global_is_shared() {
        let a = CompiledSchema::global().unwrap();
        let b = CompiledSchema::global().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_runner_spec_is_closed() {
        let schema = CompiledSchema::load().unwrap();
        let runners = &schema.root().as_struct().unwrap().field("runners").unwrap().schema;
        let SchemaNode::MapOf(runner) = runners else {
            panic!("runners should be a mapOf schema");
        };
        let runner = runner.as_struct().unwrap();
        assert!(!runner.open);
        assert!(runner.field("disk").is_some());
        assert!(runner.field("volume").is_some());
    }
}
