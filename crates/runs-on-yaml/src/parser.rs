//! YAML parser that builds YamlNode trees.

use crate::{Error, Position, Result, YamlEntry, YamlNode, YamlValue};
use std::collections::{HashMap, HashSet};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// Key that splices the entries of other mappings into the current one.
const MERGE_KEY: &str = "<<";

/// Nodes that alias expansion may produce regardless of input size.
const MIN_ALIAS_BUDGET: usize = 10_000;

/// Nodes that alias expansion may produce per byte of input.
const ALIAS_NODES_PER_BYTE: usize = 10;

/// Parse YAML from a string, producing a YamlNode tree.
///
/// Only the first document of the stream is read. An empty stream yields a
/// `Null` root without position.
///
/// # Example
///
/// ```rust
/// use runs_on_yaml::parse;
///
/// let yaml = parse("admins: [alice]").unwrap();
/// assert_eq!(yaml.get("admins").map(|a| a.len()), Some(1));
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is malformed, repeats a key within one
/// mapping, uses a non-scalar mapping key, uses a merge key with a value
/// that is not a mapping or a sequence of mappings, or expands aliases into
/// far more nodes than the input could hold on its own.
pub fn parse(content: &str) -> Result<YamlNode> {
    parse_impl(content, None)
}

/// Parse YAML from a string with an associated filename.
///
/// The filename is only used for logging; positions are the same as for
/// [`parse`].
///
/// # Errors
///
/// Same as [`parse`].
pub fn parse_file(content: &str, filename: &str) -> Result<YamlNode> {
    parse_impl(content, Some(filename))
}

fn parse_impl(content: &str, filename: Option<&str>) -> Result<YamlNode> {
    let mut parser = Parser::new_from_str(content);
    let alias_budget = (content.len() * ALIAS_NODES_PER_BYTE).max(MIN_ALIAS_BUDGET);
    let mut builder = YamlBuilder::new(alias_budget);

    parser
        .load(&mut builder, false) // false = single document only
        .map_err(Error::from)?;

    let root = builder.result()?;
    tracing::debug!(
        file = filename.unwrap_or("<memory>"),
        root = root.type_name(),
        "parsed YAML document"
    );
    Ok(root)
}

/// Builder that implements MarkedEventReceiver to construct YamlNode trees.
struct YamlBuilder {
    /// Stack of collections being constructed
    stack: Vec<BuildNode>,

    /// Completed anchored subtrees and their node counts, by anchor id
    anchors: HashMap<usize, (YamlNode, usize)>,

    /// Nodes alias expansion may still produce
    alias_budget: usize,

    /// The completed root node
    root: Option<YamlNode>,

    /// First structural error; later events are ignored once set
    error: Option<Error>,
}

/// A collection being constructed during parsing.
enum BuildNode {
    Sequence {
        anchor_id: usize,
        position: Position,
        items: Vec<YamlNode>,
    },

    Mapping {
        anchor_id: usize,
        position: Position,
        entries: Vec<(YamlNode, Option<YamlNode>)>,
    },
}

/// A mapping entry before merge keys are expanded.
enum PendingEntry {
    Explicit(YamlEntry),
    Merge(YamlNode),
}

impl YamlBuilder {
    fn new(alias_budget: usize) -> Self {
        Self {
            stack: Vec::new(),
            anchors: HashMap::new(),
            alias_budget,
            root: None,
            error: None,
        }
    }

    fn result(self) -> Result<YamlNode> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(self.root.unwrap_or_else(YamlNode::null))
    }

    fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn push_complete(&mut self, node: YamlNode, anchor_id: usize) {
        if anchor_id != 0 {
            self.anchors
                .insert(anchor_id, (node.clone(), node_count(&node)));
        }

        match self.stack.last_mut() {
            None => {
                // Only the first document is loaded, so the first completed
                // top-level node is the root.
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(BuildNode::Sequence { items, .. }) => items.push(node),
            Some(BuildNode::Mapping { entries, .. }) => match entries.last_mut() {
                Some((_, value @ None)) => *value = Some(node),
                _ => entries.push((node, None)),
            },
        }
    }

    fn finish_sequence(&mut self) {
        match self.stack.pop() {
            Some(BuildNode::Sequence {
                anchor_id,
                position,
                items,
            }) => {
                let node = YamlNode::new(YamlValue::Sequence(items), Some(position));
                self.push_complete(node, anchor_id);
            }
            _ => self.fail(Error::InvalidStructure {
                message: "sequence end without matching start".into(),
                position: None,
            }),
        }
    }

    fn finish_mapping(&mut self) {
        match self.stack.pop() {
            Some(BuildNode::Mapping {
                anchor_id,
                position,
                entries,
            }) => match build_mapping(entries) {
                Ok(entries) => {
                    let node = YamlNode::new(YamlValue::Mapping(entries), Some(position));
                    self.push_complete(node, anchor_id);
                }
                Err(error) => self.fail(error),
            },
            _ => self.fail(Error::InvalidStructure {
                message: "mapping end without matching start".into(),
                position: None,
            }),
        }
    }
}

impl MarkedEventReceiver for YamlBuilder {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }

        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, style, anchor_id, tag) => {
                let value = resolve_scalar(&value, style, tag.as_ref());
                let node = YamlNode::new(value, Some(Position::from_marker(&marker)));
                self.push_complete(node, anchor_id);
            }

            Event::SequenceStart(anchor_id, _tag) => {
                self.stack.push(BuildNode::Sequence {
                    anchor_id,
                    position: Position::from_marker(&marker),
                    items: Vec::new(),
                });
            }

            Event::SequenceEnd => self.finish_sequence(),

            Event::MappingStart(anchor_id, _tag) => {
                self.stack.push(BuildNode::Mapping {
                    anchor_id,
                    position: Position::from_marker(&marker),
                    entries: Vec::new(),
                });
            }

            Event::MappingEnd => self.finish_mapping(),

            Event::Alias(anchor_id) => match self.anchors.get(&anchor_id) {
                Some((_, size)) if *size > self.alias_budget => {
                    self.fail(Error::InvalidStructure {
                        message: "document contains excessive aliasing".into(),
                        position: Some(Position::from_marker(&marker)),
                    });
                }
                Some((anchored, size)) => {
                    self.alias_budget -= size;
                    let copy = anchored.clone();
                    self.push_complete(copy, 0);
                }
                None => self.fail(Error::InvalidStructure {
                    message: "alias refers to an unknown or unfinished anchor".into(),
                    position: Some(Position::from_marker(&marker)),
                }),
            },
        }
    }
}

/// Number of nodes in a subtree, mapping keys included.
fn node_count(node: &YamlNode) -> usize {
    1 + match &node.value {
        YamlValue::Sequence(items) => items.iter().map(node_count).sum(),
        YamlValue::Mapping(entries) => entries.iter().map(|e| 1 + node_count(&e.value)).sum(),
        _ => 0,
    }
}

/// Turn raw key/value pairs into mapping entries, rejecting duplicate keys
/// and expanding `<<` merge keys in place.
///
/// Explicit keys win over merged ones wherever they appear in the mapping;
/// among several merge sources the earlier one wins.
fn build_mapping(raw: Vec<(YamlNode, Option<YamlNode>)>) -> Result<Vec<YamlEntry>> {
    let mut first_seen: HashMap<String, Option<Position>> = HashMap::new();
    let mut pending = Vec::with_capacity(raw.len());

    for (key_node, value) in raw {
        let value = value.unwrap_or_else(YamlNode::null);
        let key = key_string(&key_node)?;

        if key == MERGE_KEY {
            pending.push(PendingEntry::Merge(value));
            continue;
        }

        if let Some(first) = first_seen.get(&key) {
            return Err(Error::DuplicateKey {
                first_line: first.map_or(0, |p| p.line),
                key,
                position: key_node.position,
            });
        }
        first_seen.insert(key.clone(), key_node.position);
        pending.push(PendingEntry::Explicit(YamlEntry::new(
            key,
            key_node.position,
            value,
        )));
    }

    let mut present: HashSet<String> = first_seen.into_keys().collect();
    let mut entries = Vec::with_capacity(pending.len());
    for item in pending {
        match item {
            PendingEntry::Explicit(entry) => entries.push(entry),
            PendingEntry::Merge(source) => {
                for entry in merge_source_entries(source)? {
                    if present.insert(entry.key.clone()) {
                        entries.push(entry);
                    }
                }
            }
        }
    }

    Ok(entries)
}

fn merge_source_entries(source: YamlNode) -> Result<Vec<YamlEntry>> {
    let invalid = |position| Error::InvalidStructure {
        message: "map merge requires map or sequence of maps as the value".into(),
        position,
    };

    match source.value {
        YamlValue::Mapping(entries) => Ok(entries),
        YamlValue::Sequence(items) => {
            let mut merged = Vec::new();
            for item in items {
                match item.value {
                    YamlValue::Mapping(entries) => merged.extend(entries),
                    _ => return Err(invalid(item.position)),
                }
            }
            Ok(merged)
        }
        _ => Err(invalid(source.position)),
    }
}

fn key_string(key: &YamlNode) -> Result<String> {
    match &key.value {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Int(n) => Ok(n.to_string()),
        YamlValue::Float(x) => Ok(x.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => Err(Error::InvalidStructure {
            message: format!("mapping keys must be scalars, found {}", key.type_name()),
            position: key.position,
        }),
    }
}

/// Resolve a scalar into a typed value.
///
/// Plain scalars follow the YAML 1.2 core schema; quoted and block scalars
/// are always strings, as is anything tagged `!!str`.
fn resolve_scalar(value: &str, style: TScalarStyle, tag: Option<&Tag>) -> YamlValue {
    if let Some(tag) = tag
        && is_core_tag(tag, "str")
    {
        return YamlValue::String(value.to_string());
    }

    if style != TScalarStyle::Plain {
        return YamlValue::String(value.to_string());
    }

    match value {
        "" | "~" | "null" | "Null" | "NULL" => return YamlValue::Null,
        "true" | "True" | "TRUE" => return YamlValue::Bool(true),
        "false" | "False" | "FALSE" => return YamlValue::Bool(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            return YamlValue::Float(f64::INFINITY);
        }
        "-.inf" | "-.Inf" | "-.INF" => return YamlValue::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return YamlValue::Float(f64::NAN),
        _ => {}
    }

    if let Some(n) = parse_int(value) {
        return YamlValue::Int(n);
    }

    if looks_like_float(value)
        && let Ok(x) = value.parse::<f64>()
    {
        return YamlValue::Float(x);
    }

    YamlValue::String(value.to_string())
}

fn is_core_tag(tag: &Tag, suffix: &str) -> bool {
    matches!(tag.handle.as_str(), "!!" | "tag:yaml.org,2002:") && tag.suffix == suffix
}

fn parse_int(value: &str) -> Option<i64> {
    let radix_digits = |digits: &str, radix: u32| {
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        i64::from_str_radix(digits, radix).ok()
    };
    if let Some(hex) = value.strip_prefix("0x") {
        return radix_digits(hex, 16);
    }
    if let Some(oct) = value.strip_prefix("0o") {
        return radix_digits(oct, 8);
    }
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<i64>().ok()
}

/// Rust's float parser also accepts words like `inf` and `NaN`; YAML plain
/// scalars only become floats when they are written as numbers.
fn looks_like_float(value: &str) -> bool {
    value.bytes().any(|b| b.is_ascii_digit())
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar() {
        let yaml = parse("hello").unwrap();
        assert!(yaml.is_scalar());
        assert_eq!(yaml.as_str(), Some("hello"));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse("42").unwrap().as_i64(), Some(42));
        assert_eq!(parse("-5").unwrap().as_i64(), Some(-5));
        assert_eq!(parse("0x1f").unwrap().as_i64(), Some(31));
        assert_eq!(parse("0o17").unwrap().as_i64(), Some(15));
    }

    #[test]
    fn test_signed_radix_literal_is_a_string() {
        assert_eq!(parse("0x-1").unwrap().as_str(), Some("0x-1"));
        assert_eq!(parse("0x+1f").unwrap().as_str(), Some("0x+1f"));
        assert_eq!(parse("0o-7").unwrap().as_str(), Some("0o-7"));
        assert_eq!(parse("0x").unwrap().as_str(), Some("0x"));
    }

    #[test]
    fn test_parse_boolean_core_schema_only() {
        assert_eq!(parse("true").unwrap().as_bool(), Some(true));
        assert_eq!(parse("False").unwrap().as_bool(), Some(false));
        // YAML 1.1 booleans stay strings
        assert_eq!(parse("yes").unwrap().as_str(), Some("yes"));
        assert_eq!(parse("off").unwrap().as_str(), Some("off"));
    }

    #[test]
    fn test_quoted_scalars_are_strings() {
        let yaml = parse("a: \"false\"\nb: '4'\nc: false").unwrap();
        assert_eq!(yaml.get("a").and_then(YamlNode::as_str), Some("false"));
        assert_eq!(yaml.get("b").and_then(YamlNode::as_str), Some("4"));
        assert_eq!(yaml.get("c").and_then(YamlNode::as_bool), Some(false));
    }

    #[test]
    fn test_str_tag_forces_string() {
        let yaml = parse("cpu: !!str 4").unwrap();
        assert_eq!(yaml.get("cpu").and_then(YamlNode::as_str), Some("4"));
    }

    #[test]
    fn test_plus_joined_value_is_a_string() {
        let yaml = parse("cpu: 2+4").unwrap();
        assert_eq!(yaml.get("cpu").and_then(YamlNode::as_str), Some("2+4"));
    }

    #[test]
    fn test_float_and_null() {
        let yaml = parse("a: 1.5\nb: ~\nc:\nd: inf").unwrap();
        assert_eq!(yaml.get("a").map(|n| &n.value), Some(&YamlValue::Float(1.5)));
        assert!(yaml.get("b").unwrap().is_null());
        assert!(yaml.get("c").unwrap().is_null());
        assert_eq!(yaml.get("d").and_then(YamlNode::as_str), Some("inf"));
    }

    #[test]
    fn test_parse_array() {
        let yaml = parse("[1, 2, 3]").unwrap();
        let items = yaml.as_sequence().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_i64(), Some(1));
        assert_eq!(items[2].as_i64(), Some(3));
    }

    #[test]
    fn test_mapping_keeps_source_order() {
        let yaml = parse("zeta: 1\nalpha: 2\nmid: 3").unwrap();
        let keys: Vec<&str> = yaml
            .as_mapping()
            .unwrap()
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_positions_are_tracked() {
        let yaml = parse("runners:\n  small:\n    disk: large\n").unwrap();
        let runners = yaml.entry("runners").unwrap();
        let small = runners.value.entry("small").unwrap();
        let disk = small.value.entry("disk").unwrap();

        let runners_line = runners.key_position.unwrap().line;
        assert_eq!(small.key_position.unwrap().line, runners_line + 1);
        assert_eq!(disk.key_position.unwrap().line, runners_line + 2);
        assert_eq!(disk.key_position.unwrap().column, 5);
        assert_eq!(disk.value.position.unwrap().column, 11);
    }

    #[test]
    fn test_empty_document_is_null_root() {
        let yaml = parse("").unwrap();
        assert!(yaml.is_null());
        assert!(yaml.position.is_none());
    }

    #[test]
    fn test_only_first_document_is_read() {
        let yaml = parse("a: 1\n---\nb: 2\n").unwrap();
        assert!(yaml.get("a").is_some());
        assert!(yaml.get("b").is_none());
    }

    #[test]
    fn test_alias_is_deep_copy() {
        let yaml = parse("base: &b [2, 4]\ncpu: *b\n").unwrap();
        assert_eq!(yaml.get("cpu").map(|n| &n.value), yaml.get("base").map(|n| &n.value));
    }

    #[test]
    fn test_excessive_aliasing_is_rejected() {
        let mut content = String::from("a0: &a0 [x, x, x, x, x, x, x, x, x, x]\n");
        for i in 1..8 {
            let prev = format!("*a{}", i - 1);
            let items = vec![prev.as_str(); 10].join(", ");
            content.push_str(&format!("a{i}: &a{i} [{items}]\n"));
        }

        let err = parse(&content).unwrap_err();
        assert!(matches!(err, Error::InvalidStructure { .. }));
        assert_eq!(err.to_string(), "document contains excessive aliasing");
        assert!(err.position().is_some_and(|p| p.line > 1));
    }

    #[test]
    fn test_moderate_aliasing_is_accepted() {
        let mut content =
            String::from("x-base: &base\n  cpu: [2, 4]\n  ram: [16]\n  spot: lp\nrunners:\n");
        for i in 0..50 {
            content.push_str(&format!("  r{i}:\n    <<: *base\n    family: [c7a]\n"));
        }

        let yaml = parse(&content).unwrap();
        assert_eq!(yaml.get("runners").map(YamlNode::len), Some(50));
        assert_eq!(node_count(&parse("a: [1, 2]").unwrap()), 5);
    }

    #[test]
    fn test_merge_key_expands_entries() {
        let yaml = parse(
            r#"
defaults: &defaults
  cpu: [2]
  ram: [16]
runner:
  <<: *defaults
  ram: [32]
"#,
        )
        .unwrap();

        let runner = yaml.get("runner").unwrap();
        let keys: Vec<&str> = runner
            .as_mapping()
            .unwrap()
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(keys, vec!["cpu", "ram"]);
        let ram = runner.get("ram").unwrap().as_sequence().unwrap();
        assert_eq!(ram[0].as_i64(), Some(32));
    }

    #[test]
    fn test_merge_sequence_earlier_source_wins() {
        let yaml = parse(
            r#"
a: &a {spot: lp}
b: &b {spot: co, ssh: true}
r:
  <<: [*a, *b]
"#,
        )
        .unwrap();
        let r = yaml.get("r").unwrap();
        assert_eq!(r.get("spot").and_then(YamlNode::as_str), Some("lp"));
        assert_eq!(r.get("ssh").and_then(YamlNode::as_bool), Some(true));
    }

    #[test]
    fn test_merge_rejects_scalar() {
        let err = parse("a: &a 1\nb:\n  <<: *a\n").unwrap_err();
        assert!(err.to_string().contains("map merge requires"));
    }

    #[test]
    fn test_duplicate_key_is_error() {
        let err = parse("runners: {}\nrunners: {}\n").unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { ref key, .. } if key == "runners"));
        assert!(err.to_string().contains("already defined"));
        assert!(err.position().is_some());
    }

    #[test]
    fn test_complex_key_is_error() {
        let err = parse("? [a, b]\n: 1\n").unwrap_err();
        assert!(matches!(err, Error::InvalidStructure { .. }));
    }

    #[test]
    fn test_scan_error_has_position() {
        let err = parse("runners:\n  r:\n    cpu: [2]\n   ram: [16]\n").unwrap_err();
        assert!(matches!(err, Error::Scan { .. }));
        assert!(err.position().is_some());
    }
}
