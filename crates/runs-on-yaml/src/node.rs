//! YAML value tree with source position tracking.

use crate::Position;
use std::fmt;

/// A YAML value together with the position of the token it was read from.
///
/// Every node produced by the parser has `position: Some(..)`. Code that
/// rewrites a tree should either copy the position of the node it replaces
/// or leave it `None`; diagnostics fall back to a document-level location
/// for position-less nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlNode {
    pub value: YamlValue,
    pub position: Option<Position>,
}

/// The YAML data model after anchors, aliases and merge keys are expanded.
#[derive(Debug, Clone, PartialEq)]
pub enum YamlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<YamlNode>),
    /// Entries in source order.
    Mapping(Vec<YamlEntry>),
}

/// A key-value pair in a mapping.
///
/// Keys are always scalars in runs-on.yml, so they are stored in their
/// string form along with the position of the key token.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlEntry {
    pub key: String,
    pub key_position: Option<Position>,
    pub value: YamlNode,
}

impl YamlNode {
    pub fn new(value: YamlValue, position: Option<Position>) -> Self {
        Self { value, position }
    }

    /// A node with no source position.
    pub fn synthesized(value: YamlValue) -> Self {
        Self {
            value,
            position: None,
        }
    }

    pub fn null() -> Self {
        Self::synthesized(YamlValue::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, YamlValue::Null)
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self.value, YamlValue::Sequence(_) | YamlValue::Mapping(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            YamlValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            YamlValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            YamlValue::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[YamlNode]> {
        match &self.value {
            YamlValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[YamlEntry]> {
        match &self.value {
            YamlValue::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a mapping entry by key.
    pub fn entry(&self, key: &str) -> Option<&YamlEntry> {
        self.as_mapping()?.iter().find(|entry| entry.key == key)
    }

    /// Look up a mapping value by key.
    ///
    /// Returns None if this is not a mapping or the key is absent.
    pub fn get(&self, key: &str) -> Option<&YamlNode> {
        self.entry(key).map(|entry| &entry.value)
    }

    /// Number of children (sequence length or mapping entry count).
    pub fn len(&self) -> usize {
        match &self.value {
            YamlValue::Sequence(items) => items.len(),
            YamlValue::Mapping(entries) => entries.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable name of the node's type, as used in messages.
    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }
}

impl YamlValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            YamlValue::Null => "null",
            YamlValue::Bool(_) => "boolean",
            YamlValue::Int(_) => "integer",
            YamlValue::Float(_) => "float",
            YamlValue::String(_) => "string",
            YamlValue::Sequence(_) => "array",
            YamlValue::Mapping(_) => "mapping",
        }
    }
}

/// Renders scalars as literals (`"maybe"`, `-5`, `true`) and collections by
/// their type name, which keeps messages short for large subtrees.
impl fmt::Display for YamlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YamlValue::Null => write!(f, "null"),
            YamlValue::Bool(b) => write!(f, "{}", b),
            YamlValue::Int(n) => write!(f, "{}", n),
            YamlValue::Float(x) => write!(f, "{}", x),
            YamlValue::String(s) => write!(f, "{:?}", s),
            YamlValue::Sequence(items) => write!(f, "array of {} item(s)", items.len()),
            YamlValue::Mapping(_) => write!(f, "mapping"),
        }
    }
}

impl fmt::Display for YamlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl YamlEntry {
    pub fn new(key: impl Into<String>, key_position: Option<Position>, value: YamlNode) -> Self {
        Self {
            key: key.into(),
            key_position,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(s: &str) -> YamlNode {
        YamlNode::synthesized(YamlValue::String(s.into()))
    }

    #[test]
    fn test_scalar_creation() {
        let node = YamlNode::new(YamlValue::Int(4), Some(Position::new(1, 6)));
        assert!(node.is_scalar());
        assert_eq!(node.as_i64(), Some(4));
        assert_eq!(node.position, Some(Position::new(1, 6)));
        assert_eq!(node.len(), 0);
    }

    #[test]
    fn test_mapping_lookup() {
        let node = YamlNode::synthesized(YamlValue::Mapping(vec![
            YamlEntry::new("image", None, string("ubuntu22-full-x64")),
            YamlEntry::new("spot", None, string("lp")),
        ]));

        assert!(!node.is_scalar());
        assert_eq!(node.len(), 2);
        assert_eq!(node.get("spot").and_then(YamlNode::as_str), Some("lp"));
        assert!(node.get("cpu").is_none());
        assert!(string("x").get("spot").is_none());
    }

    #[test]
    fn test_display_literals() {
        assert_eq!(string("maybe").to_string(), "\"maybe\"");
        assert_eq!(YamlValue::Int(-5).to_string(), "-5");
        assert_eq!(YamlValue::Bool(true).to_string(), "true");
        assert_eq!(YamlValue::Null.to_string(), "null");
        assert_eq!(
            YamlValue::Sequence(vec![string("a"), string("b")]).to_string(),
            "array of 2 item(s)"
        );
    }

    #[test]
    fn test_type_names() {
        assert_eq!(YamlValue::Float(1.5).type_name(), "float");
        assert_eq!(YamlValue::Mapping(vec![]).type_name(), "mapping");
        assert_eq!(YamlValue::Sequence(vec![]).type_name(), "array");
    }
}
