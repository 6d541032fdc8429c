// Structural validation of runs-on.yml trees

use crate::error::{InstancePath, PathSegment, ValidationError, ValidationErrorKind};
use crate::schema::{Constraint, ScalarKind, ScalarSchema, SchemaNode, StructSchema};
use runs_on_yaml::{Position, YamlNode, YamlValue};

/// Validates a YAML tree against a schema, returning every violation found.
///
/// Violations come out in traversal order: declared struct fields in
/// declaration order, then undeclared keys in document order, sequence items
/// by index and map-of entries in document order.
pub fn validate(value: &YamlNode, schema: &SchemaNode) -> Vec<ValidationError> {
    let mut context = ValidationContext::new();
    validate_node(value, schema, &mut context);
    context.into_errors()
}

/// Validation context tracks state during validation
pub struct ValidationContext {
    /// Current instance path (e.g., ["runners", "small", "cpu"])
    instance_path: InstancePath,
    /// Collected validation errors
    errors: Vec<ValidationError>,
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationContext {
    /// Create a new validation context
    pub fn new() -> Self {
        Self::at(InstancePath::new())
    }

    /// A context that starts at `instance_path`, used to try union
    /// alternatives without touching the parent's errors
    fn at(instance_path: InstancePath) -> Self {
        Self {
            instance_path,
            errors: Vec::new(),
        }
    }

    /// Add an error at the current instance path
    pub fn add_error(&mut self, kind: ValidationErrorKind, position: Option<Position>) {
        let error = ValidationError::new(kind, self.instance_path.clone(), position);
        tracing::trace!(code = error.code(), path = %error.instance_path, "violation");
        self.errors.push(error);
    }

    /// Execute a function with a new instance path segment
    pub fn with_instance_path<F, R>(&mut self, segment: PathSegment, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        match segment {
            PathSegment::Key(key) => self.instance_path.push_key(key),
            PathSegment::Index(index) => self.instance_path.push_index(index),
        }
        let result = f(self);
        self.instance_path.pop();
        result
    }

    /// Get the collected errors
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Check if validation failed
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

/// Main validation dispatcher
fn validate_node(value: &YamlNode, schema: &SchemaNode, context: &mut ValidationContext) {
    match schema {
        SchemaNode::Scalar(s) => validate_scalar(value, s, context),
        SchemaNode::Union(alternatives) => validate_union(value, schema, alternatives, context),
        SchemaNode::Struct(s) => validate_struct(value, schema, s, context),
        SchemaNode::Array(element) => validate_array(value, schema, element, context),
        SchemaNode::MapOf(element) => validate_map_of(value, schema, element, context),
    }
}

fn type_mismatch(value: &YamlNode, schema: &SchemaNode, context: &mut ValidationContext) {
    context.add_error(
        ValidationErrorKind::TypeMismatch {
            expected: schema.describe(),
            got: value.to_string(),
        },
        value.position,
    );
}

/// Validate a scalar: kind first, then the constraint
fn validate_scalar(value: &YamlNode, schema: &ScalarSchema, context: &mut ValidationContext) {
    let kind_matches = matches!(
        (schema.kind, &value.value),
        (ScalarKind::Bool, YamlValue::Bool(_))
            | (ScalarKind::Int, YamlValue::Int(_))
            | (ScalarKind::String, YamlValue::String(_))
    );
    if !kind_matches {
        context.add_error(
            ValidationErrorKind::TypeMismatch {
                expected: schema.describe(),
                got: value.to_string(),
            },
            value.position,
        );
        return;
    }

    let kind = match (&schema.constraint, &value.value) {
        (Some(Constraint::Pattern(re)), YamlValue::String(s)) if !re.is_match(s) => {
            ValidationErrorKind::PatternMismatch {
                value: value.to_string(),
                pattern: re.as_str().to_string(),
            }
        }
        (Some(Constraint::Minimum(minimum)), YamlValue::Int(n)) if n < minimum => {
            ValidationErrorKind::BelowMinimum {
                value: *n,
                minimum: *minimum,
            }
        }
        (Some(Constraint::OneOf(allowed)), YamlValue::String(s))
            if !allowed.iter().any(|a| a == s) =>
        {
            ValidationErrorKind::InvalidEnumValue {
                value: value.to_string(),
                allowed: allowed.clone(),
            }
        }
        _ => return,
    };
    context.add_error(kind, value.position);
}

/// Validate a union: the first alternative with no violations wins
fn validate_union(
    value: &YamlNode,
    schema: &SchemaNode,
    alternatives: &[SchemaNode],
    context: &mut ValidationContext,
) {
    for alternative in alternatives {
        let mut sub_context = ValidationContext::at(context.instance_path.clone());
        validate_node(value, alternative, &mut sub_context);
        if !sub_context.has_errors() {
            return;
        }
    }

    // Report the field once rather than every alternative's failure
    context.add_error(
        ValidationErrorKind::NoMatchingAlternative {
            expected: schema.describe(),
            got: value.to_string(),
        },
        value.position,
    );
}

/// Validate a struct: declared fields, then undeclared keys if closed
fn validate_struct(
    value: &YamlNode,
    schema: &SchemaNode,
    struct_schema: &StructSchema,
    context: &mut ValidationContext,
) {
    let Some(entries) = value.as_mapping() else {
        type_mismatch(value, schema, context);
        return;
    };

    for field in &struct_schema.fields {
        match value.get(&field.name) {
            Some(field_value) => {
                context.with_instance_path(PathSegment::Key(field.name.clone()), |ctx| {
                    validate_node(field_value, &field.schema, ctx)
                });
            }
            None if field.required => {
                context.add_error(
                    ValidationErrorKind::MissingRequiredField {
                        field: field.name.clone(),
                    },
                    value.position,
                );
            }
            None => {}
        }
    }

    if struct_schema.open {
        return;
    }
    for entry in entries {
        if struct_schema.field(&entry.key).is_none() {
            context.with_instance_path(PathSegment::Key(entry.key.clone()), |ctx| {
                ctx.add_error(
                    ValidationErrorKind::UnknownField {
                        field: entry.key.clone(),
                    },
                    entry.key_position,
                )
            });
        }
    }
}

/// Validate an array value
fn validate_array(
    value: &YamlNode,
    schema: &SchemaNode,
    element: &SchemaNode,
    context: &mut ValidationContext,
) {
    let Some(items) = value.as_sequence() else {
        type_mismatch(value, schema, context);
        return;
    };

    for (i, item) in items.iter().enumerate() {
        context.with_instance_path(PathSegment::Index(i), |ctx| {
            validate_node(item, element, ctx)
        });
    }
}

/// Validate a mapping whose values all follow one schema
fn validate_map_of(
    value: &YamlNode,
    schema: &SchemaNode,
    element: &SchemaNode,
    context: &mut ValidationContext,
) {
    let Some(entries) = value.as_mapping() else {
        type_mismatch(value, schema, context);
        return;
    };

    for entry in entries {
        context.with_instance_path(PathSegment::Key(entry.key.clone()), |ctx| {
            validate_node(&entry.value, element, ctx)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, compile};
    use regex::Regex;
    use runs_on_yaml::parse;

    fn int() -> SchemaNode {
        SchemaNode::Scalar(ScalarSchema {
            kind: ScalarKind::Int,
            constraint: None,
        })
    }

    fn string() -> SchemaNode {
        SchemaNode::Scalar(ScalarSchema {
            kind: ScalarKind::String,
            constraint: None,
        })
    }

    fn messages(errors: &[ValidationError]) -> Vec<String> {
        errors.iter().map(ValidationError::message).collect()
    }

    #[test]
    fn test_scalar_kind_mismatch() {
        let doc = parse("\"12\"").unwrap();
        let errors = validate(&doc, &int());
        assert_eq!(messages(&errors), vec!["(root): expected integer, got \"12\""]);
        assert_eq!(errors[0].position, doc.position);
    }

    #[test]
    fn test_scalar_constraints() {
        let minimum = SchemaNode::Scalar(ScalarSchema {
            kind: ScalarKind::Int,
            constraint: Some(Constraint::Minimum(0)),
        });
        let errors = validate(&parse("-5").unwrap(), &minimum);
        assert_eq!(
            errors[0].kind,
            ValidationErrorKind::BelowMinimum {
                value: -5,
                minimum: 0
            }
        );
        assert!(validate(&parse("0").unwrap(), &minimum).is_empty());

        let pattern = SchemaNode::Scalar(ScalarSchema {
            kind: ScalarKind::String,
            constraint: Some(Constraint::Pattern(Regex::new("^ami-[0-9a-f]+$").unwrap())),
        });
        let errors = validate(&parse("ami-xyz").unwrap(), &pattern);
        assert_eq!(
            messages(&errors),
            vec!["(root): expected string matching /^ami-[0-9a-f]+$/, got \"ami-xyz\""]
        );

        let one_of = SchemaNode::Scalar(ScalarSchema {
            kind: ScalarKind::String,
            constraint: Some(Constraint::OneOf(vec!["x64".into(), "arm64".into()])),
        });
        let errors = validate(&parse("x86").unwrap(), &one_of);
        assert_eq!(errors[0].code(), "invalid-enum-value");
    }

    #[test]
    fn test_union_first_match_wins_and_reports_once() {
        let union = SchemaNode::Union(vec![
            int(),
            string(),
            SchemaNode::Array(Box::new(int())),
            SchemaNode::Array(Box::new(string())),
        ]);
        assert!(validate(&parse("2").unwrap(), &union).is_empty());
        assert!(validate(&parse("\"2+4\"").unwrap(), &union).is_empty());
        assert!(validate(&parse("[2, 4]").unwrap(), &union).is_empty());

        let errors = validate(&parse("{a: 1}").unwrap(), &union);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message(),
            "(root): expected integer or string or array of integer or array of string, got mapping"
        );

        // Mixed arrays match neither array alternative
        let errors = validate(&parse("[2, x]").unwrap(), &union);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "no-matching-alternative");
    }

    fn pool_schema() -> SchemaNode {
        SchemaNode::Struct(StructSchema {
            name: Some("PoolSpec".into()),
            fields: vec![
                FieldSchema {
                    name: "runner".into(),
                    schema: string(),
                    required: true,
                },
                FieldSchema {
                    name: "max_surge".into(),
                    schema: int(),
                    required: false,
                },
            ],
            open: false,
        })
    }

    #[test]
    fn test_struct_missing_and_unknown_fields() {
        let doc = parse("max_surge: x\nbogus: 1\nother: 2\n").unwrap();
        let errors = validate(&doc, &pool_schema());
        assert_eq!(
            messages(&errors),
            vec![
                "(root): missing required field 'runner'",
                "max_surge: expected integer, got \"x\"",
                "bogus: unknown field 'bogus'",
                "other: unknown field 'other'",
            ]
        );
        // Unknown fields point at the key
        let bogus = doc.entry("bogus").unwrap();
        assert_eq!(errors[2].position, bogus.key_position);
    }

    #[test]
    fn test_open_struct_accepts_unknown_fields() {
        let mut schema = pool_schema();
        if let SchemaNode::Struct(s) = &mut schema {
            s.open = true;
        }
        let doc = parse("runner: r\nx-anything: [1, 2]\n").unwrap();
        assert!(validate(&doc, &schema).is_empty());
    }

    #[test]
    fn test_struct_type_mismatch_uses_name() {
        let errors = validate(&parse("just-a-string").unwrap(), &pool_schema());
        assert_eq!(
            messages(&errors),
            vec!["(root): expected PoolSpec, got \"just-a-string\""]
        );
    }

    #[test]
    fn test_paths_through_collections() {
        let schema = compile(
            "root: Root\ndefinitions:\n  Root:\n    mapOf:\n      arrayOf:\n        integer:\n          minimum: 0\n",
        )
        .unwrap();
        let doc = parse("p:\n  - 1\n  - -3\nq: [0, 2, -1]\n").unwrap();
        let errors = validate(&doc, &schema);
        assert_eq!(
            messages(&errors),
            vec![
                "p[1]: expected integer >= 0, got -3",
                "q[2]: expected integer >= 0, got -1",
            ]
        );
    }

    #[test]
    fn test_context_restores_path() {
        let mut context = ValidationContext::new();
        context.with_instance_path(PathSegment::Key("runners".into()), |ctx| {
            ctx.with_instance_path(PathSegment::Index(3), |ctx| {
                ctx.add_error(
                    ValidationErrorKind::UnknownField { field: "x".into() },
                    None,
                );
            });
        });
        assert_eq!(context.errors()[0].instance_path.to_string(), "runners[3]");
        assert!(context.instance_path.is_empty());
    }
}
