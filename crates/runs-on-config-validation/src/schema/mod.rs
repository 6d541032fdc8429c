//! Schema model for runs-on.yml
//!
//! The schema is a small tree of composable checkers:
//! - `Scalar`: boolean, integer or string, optionally constrained
//! - `Union`: first matching alternative wins (polymorphic fields)
//! - `Struct`: named fields, open or closed to unknown keys
//! - `Array` and `MapOf`: homogeneous collections
//!
//! Schemas are written in a YAML dialect (see `schema/runs-on.yml`) and
//! compiled into this tree once. Named definitions are inlined at compile
//! time, so the compiled tree has no references left in it.

use regex::Regex;

mod parser;
mod source;

pub use parser::compile;
pub use source::{CompiledSchema, DEV_SCHEMA_PATHS, EMBEDDED_SCHEMA, load_schema_text};

use crate::error::quote_all;

/// A compiled schema node.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Scalar(ScalarSchema),
    /// Alternatives in declaration order
    Union(Vec<SchemaNode>),
    Struct(StructSchema),
    Array(Box<SchemaNode>),
    MapOf(Box<SchemaNode>),
}

/// Runtime kind a scalar schema accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    String,
}

#[derive(Debug, Clone)]
pub struct ScalarSchema {
    pub kind: ScalarKind,
    pub constraint: Option<Constraint>,
}

/// Extra condition on a scalar of the right kind.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// String must match the regex (unanchored unless the pattern anchors)
    Pattern(Regex),
    /// Integer lower bound, inclusive
    Minimum(i64),
    /// String must be one of the listed values
    OneOf(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct StructSchema {
    /// Definition name, used to describe the struct in messages
    pub name: Option<String>,
    /// Fields in declaration order
    pub fields: Vec<FieldSchema>,
    /// Whether undeclared keys are accepted
    pub open: bool,
}

#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub schema: SchemaNode,
    pub required: bool,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "boolean",
            ScalarKind::Int => "integer",
            ScalarKind::String => "string",
        }
    }
}

impl StructSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl SchemaNode {
    /// Short description of the shapes this node accepts, for messages.
    ///
    /// ```
    /// use runs_on_config_validation::schema::{ScalarKind, ScalarSchema, SchemaNode};
    ///
    /// let int = SchemaNode::Scalar(ScalarSchema { kind: ScalarKind::Int, constraint: None });
    /// let node = SchemaNode::Union(vec![int.clone(), SchemaNode::Array(Box::new(int))]);
    /// assert_eq!(node.describe(), "integer or array of integer");
    /// ```
    pub fn describe(&self) -> String {
        match self {
            SchemaNode::Scalar(scalar) => scalar.describe(),
            SchemaNode::Union(alternatives) => alternatives
                .iter()
                .map(SchemaNode::describe)
                .collect::<Vec<_>>()
                .join(" or "),
            SchemaNode::Struct(s) => s.name.clone().unwrap_or_else(|| "mapping".to_string()),
            SchemaNode::Array(element) => format!("array of {}", element.describe()),
            SchemaNode::MapOf(value) => format!("mapping of {}", value.describe()),
        }
    }

    /// The struct schema, if this node is one.
    pub fn as_struct(&self) -> Option<&StructSchema> {
        match self {
            SchemaNode::Struct(s) => Some(s),
            _ => None,
        }
    }
}

impl ScalarSchema {
    pub fn describe(&self) -> String {
        match &self.constraint {
            None => self.kind.name().to_string(),
            Some(Constraint::Pattern(re)) => format!("string matching /{}/", re.as_str()),
            Some(Constraint::Minimum(min)) => format!("{} >= {}", self.kind.name(), min),
            Some(Constraint::OneOf(values)) => format!("one of {}", quote_all(values)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(kind: ScalarKind, constraint: Option<Constraint>) -> SchemaNode {
        SchemaNode::Scalar(ScalarSchema { kind, constraint })
    }

    #[test]
    fn test_describe_scalars() {
        assert_eq!(scalar(ScalarKind::Bool, None).describe(), "boolean");
        assert_eq!(
            scalar(ScalarKind::Int, Some(Constraint::Minimum(0))).describe(),
            "integer >= 0"
        );
        assert_eq!(
            scalar(
                ScalarKind::String,
                Some(Constraint::OneOf(vec!["lp".into(), "co".into()]))
            )
            .describe(),
            "one of \"lp\", \"co\""
        );
        assert_eq!(
            scalar(
                ScalarKind::String,
                Some(Constraint::Pattern(Regex::new("^ami-").unwrap()))
            )
            .describe(),
            "string matching /^ami-/"
        );
    }

    #[test]
    fn test_describe_collections() {
        let runner = SchemaNode::Struct(StructSchema {
            name: Some("RunnerSpec".into()),
            fields: vec![],
            open: false,
        });
        assert_eq!(
            SchemaNode::MapOf(Box::new(runner)).describe(),
            "mapping of RunnerSpec"
        );

        let anonymous = SchemaNode::Struct(StructSchema {
            name: None,
            fields: vec![],
            open: true,
        });
        assert_eq!(anonymous.describe(), "mapping");
    }
}
