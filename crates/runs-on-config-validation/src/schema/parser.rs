//! Compiler for the YAML schema dialect
//!
//! The dialect supports these forms:
//! - Short forms: `boolean`, `integer`, `string`
//! - Constrained scalars: `{integer: {minimum: N}}`, `{string: {pattern: RE}}`
//! - Enums: `{enum: [..]}` or an inline array `[..]`
//! - Combinators: `{anyOf: [..]}`, `{arrayOf: S}`, `{mapOf: S}`
//! - Structs: `{object: {properties: {..}, required: [..], open: bool}}`
//! - References: `{ref: NAME}` into the top-level `definitions`
//!
//! References are inlined, so a definition used twice is compiled once and
//! cloned. A reference chain that leads back to itself is an error.

use std::collections::HashMap;

use regex::Regex;
use runs_on_yaml::{YamlEntry, YamlNode, YamlValue};

use crate::error::{SchemaError, SchemaResult};
use crate::schema::{Constraint, FieldSchema, ScalarKind, ScalarSchema, SchemaNode, StructSchema};

/// Compile schema dialect text into a schema tree.
///
/// The text must be a mapping with a `root` definition name and a
/// `definitions` mapping.
pub fn compile(text: &str) -> SchemaResult<SchemaNode> {
    let document = runs_on_yaml::parse_file(text, "schema")?;

    let root_name = document
        .get("root")
        .and_then(YamlNode::as_str)
        .ok_or_else(|| SchemaError::InvalidStructure {
            message: "schema must name its root definition with 'root'".to_string(),
            position: document.position,
        })?;

    let definitions = document
        .get("definitions")
        .and_then(YamlNode::as_mapping)
        .ok_or_else(|| SchemaError::InvalidStructure {
            message: "schema must have a 'definitions' mapping".to_string(),
            position: document.position,
        })?;

    let mut compiler = SchemaCompiler::new(definitions);
    let root = compiler.resolve(root_name)?;
    tracing::debug!(
        root = root_name,
        definitions = definitions.len(),
        "compiled schema"
    );
    Ok(root)
}

struct SchemaCompiler<'a> {
    definitions: HashMap<&'a str, &'a YamlNode>,
    resolved: HashMap<String, SchemaNode>,
    /// Definitions currently being compiled, innermost last
    resolving: Vec<String>,
}

impl<'a> SchemaCompiler<'a> {
    fn new(definitions: &'a [YamlEntry]) -> Self {
        Self {
            definitions: definitions
                .iter()
                .map(|entry| (entry.key.as_str(), &entry.value))
                .collect(),
            resolved: HashMap::new(),
            resolving: Vec::new(),
        }
    }

    fn resolve(&mut self, name: &str) -> SchemaResult<SchemaNode> {
        if let Some(node) = self.resolved.get(name) {
            return Ok(node.clone());
        }
        if self.resolving.iter().any(|n| n == name) {
            return Err(SchemaError::CyclicRef {
                name: name.to_string(),
            });
        }
        let definition =
            *self
                .definitions
                .get(name)
                .ok_or_else(|| SchemaError::UnresolvedRef {
                    name: name.to_string(),
                })?;

        self.resolving.push(name.to_string());
        let compiled = self.compile_node(definition, Some(name));
        self.resolving.pop();

        let node = compiled?;
        self.resolved.insert(name.to_string(), node.clone());
        Ok(node)
    }

    /// Compile one schema expression. `name` is set when the expression is
    /// the body of a named definition.
    fn compile_node(&mut self, yaml: &YamlNode, name: Option<&str>) -> SchemaResult<SchemaNode> {
        match &yaml.value {
            YamlValue::String(short) => match short.as_str() {
                "boolean" => Ok(scalar(ScalarKind::Bool, None)),
                "integer" => Ok(scalar(ScalarKind::Int, None)),
                "string" => Ok(scalar(ScalarKind::String, None)),
                other => Err(SchemaError::InvalidType {
                    name: other.to_string(),
                    position: yaml.position,
                }),
            },
            YamlValue::Sequence(items) => parse_enum(items),
            YamlValue::Mapping(entries) => {
                let [entry] = entries.as_slice() else {
                    return Err(SchemaError::InvalidStructure {
                        message: format!(
                            "schema mapping must have exactly one key, found {}",
                            entries.len()
                        ),
                        position: yaml.position,
                    });
                };
                self.compile_keyword(entry, name)
            }
            _ => Err(invalid(
                format!("expected a schema, got {}", yaml.type_name()),
                yaml,
            )),
        }
    }

    fn compile_keyword(
        &mut self,
        entry: &YamlEntry,
        name: Option<&str>,
    ) -> SchemaResult<SchemaNode> {
        let value = &entry.value;
        match entry.key.as_str() {
            "boolean" => {
                expect_no_options(value, "boolean")?;
                Ok(scalar(ScalarKind::Bool, None))
            }
            "integer" => parse_integer_options(value),
            "string" => parse_string_options(value),
            "enum" => {
                let items = value
                    .as_sequence()
                    .ok_or_else(|| invalid("enum values must be an array", value))?;
                parse_enum(items)
            }
            "anyOf" => {
                let items = value
                    .as_sequence()
                    .ok_or_else(|| invalid("anyOf alternatives must be an array", value))?;
                if items.is_empty() {
                    return Err(invalid("anyOf needs at least one alternative", value));
                }
                let alternatives = items
                    .iter()
                    .map(|item| self.compile_node(item, None))
                    .collect::<SchemaResult<Vec<_>>>()?;
                Ok(SchemaNode::Union(alternatives))
            }
            "arrayOf" => Ok(SchemaNode::Array(Box::new(self.compile_node(value, None)?))),
            "mapOf" => Ok(SchemaNode::MapOf(Box::new(self.compile_node(value, None)?))),
            "object" => self.compile_object(value, name),
            "ref" => {
                let target = value
                    .as_str()
                    .ok_or_else(|| invalid("ref must name a definition", value))?;
                self.resolve(target)
            }
            other => Err(SchemaError::InvalidType {
                name: other.to_string(),
                position: entry.key_position,
            }),
        }
    }

    fn compile_object(&mut self, yaml: &YamlNode, name: Option<&str>) -> SchemaResult<SchemaNode> {
        let options = if yaml.is_null() {
            &[][..]
        } else {
            yaml.as_mapping()
                .ok_or_else(|| invalid("object options must be a mapping", yaml))?
        };

        let mut properties: &[YamlEntry] = &[];
        let mut required: Vec<(&str, &YamlNode)> = Vec::new();
        let mut open = false;

        for option in options {
            match option.key.as_str() {
                "properties" => {
                    properties = option
                        .value
                        .as_mapping()
                        .ok_or_else(|| invalid("properties must be a mapping", &option.value))?;
                }
                "required" => {
                    let items = option
                        .value
                        .as_sequence()
                        .ok_or_else(|| invalid("required must be an array", &option.value))?;
                    for item in items {
                        let field = item
                            .as_str()
                            .ok_or_else(|| invalid("required entries must be strings", item))?;
                        required.push((field, item));
                    }
                }
                "open" => {
                    open = option
                        .value
                        .as_bool()
                        .ok_or_else(|| invalid("open must be a boolean", &option.value))?;
                }
                other => {
                    return Err(SchemaError::InvalidStructure {
                        message: format!("unknown object option '{}'", other),
                        position: option.key_position,
                    });
                }
            }
        }

        for (field, node) in &required {
            if !properties.iter().any(|p| p.key == *field) {
                return Err(invalid(
                    format!("required field '{}' is not a declared property", field),
                    node,
                ));
            }
        }

        let mut fields = Vec::with_capacity(properties.len());
        for property in properties {
            fields.push(FieldSchema {
                name: property.key.clone(),
                schema: self.compile_node(&property.value, None)?,
                required: required.iter().any(|(field, _)| *field == property.key),
            });
        }

        Ok(SchemaNode::Struct(StructSchema {
            name: name.map(str::to_string),
            fields,
            open,
        }))
    }
}

fn scalar(kind: ScalarKind, constraint: Option<Constraint>) -> SchemaNode {
    SchemaNode::Scalar(ScalarSchema { kind, constraint })
}

fn invalid(message: impl Into<String>, yaml: &YamlNode) -> SchemaError {
    SchemaError::InvalidStructure {
        message: message.into(),
        position: yaml.position,
    }
}

fn expect_no_options(yaml: &YamlNode, keyword: &str) -> SchemaResult<()> {
    if yaml.is_null() || (yaml.is_empty() && yaml.as_mapping().is_some()) {
        Ok(())
    } else {
        Err(invalid(format!("{} takes no options", keyword), yaml))
    }
}

fn option_entries<'y>(yaml: &'y YamlNode, keyword: &str) -> SchemaResult<&'y [YamlEntry]> {
    if yaml.is_null() {
        return Ok(&[]);
    }
    yaml.as_mapping()
        .ok_or_else(|| invalid(format!("{} options must be a mapping", keyword), yaml))
}

fn parse_integer_options(yaml: &YamlNode) -> SchemaResult<SchemaNode> {
    let mut constraint = None;
    for option in option_entries(yaml, "integer")? {
        match option.key.as_str() {
            "minimum" => {
                let minimum = option
                    .value
                    .as_i64()
                    .ok_or_else(|| invalid("minimum must be an integer", &option.value))?;
                constraint = Some(Constraint::Minimum(minimum));
            }
            other => {
                return Err(SchemaError::InvalidStructure {
                    message: format!("unknown integer option '{}'", other),
                    position: option.key_position,
                });
            }
        }
    }
    Ok(scalar(ScalarKind::Int, constraint))
}

fn parse_string_options(yaml: &YamlNode) -> SchemaResult<SchemaNode> {
    let mut constraint = None;
    for option in option_entries(yaml, "string")? {
        match option.key.as_str() {
            "pattern" => {
                let pattern = option
                    .value
                    .as_str()
                    .ok_or_else(|| invalid("pattern must be a string", &option.value))?;
                let regex = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
                constraint = Some(Constraint::Pattern(regex));
            }
            other => {
                return Err(SchemaError::InvalidStructure {
                    message: format!("unknown string option '{}'", other),
                    position: option.key_position,
                });
            }
        }
    }
    Ok(scalar(ScalarKind::String, constraint))
}

/// Enum values are compared as strings, so scalar items are stringified.
fn parse_enum(items: &[YamlNode]) -> SchemaResult<SchemaNode> {
    let values = items
        .iter()
        .map(|item| match &item.value {
            YamlValue::String(s) => Ok(s.clone()),
            YamlValue::Bool(b) => Ok(b.to_string()),
            YamlValue::Int(n) => Ok(n.to_string()),
            _ => Err(invalid(
                format!("enum values must be scalars, got {}", item.type_name()),
                item,
            )),
        })
        .collect::<SchemaResult<Vec<_>>>()?;
    if values.is_empty() {
        return Err(SchemaError::InvalidStructure {
            message: "enum needs at least one value".to_string(),
            position: None,
        });
    }
    Ok(scalar(ScalarKind::String, Some(Constraint::OneOf(values))))
}
