//! Canonicalization of polymorphic fields before validation
//!
//! Some fields accept literal shapes the schema cannot express directly. A
//! static table of rules rewrites those shapes on a copy of the tree; the
//! document the caller passed in is never touched.
//!
//! Shapes the schema can express (like plus-joined strings in `cpu` or
//! `extras`) are left to the schema unions and have no rule here.

use runs_on_yaml::{YamlEntry, YamlNode, YamlValue};

/// One segment of a rule's path pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathPattern {
    /// Matches exactly this mapping key
    Key(&'static str),
    /// Matches any mapping key
    AnyKey,
}

impl PathPattern {
    fn matches(self, key: &str) -> bool {
        match self {
            PathPattern::Key(expected) => expected == key,
            PathPattern::AnyKey => true,
        }
    }
}

/// A rewrite applied to every node whose path matches `pattern`.
///
/// `rewrite` returns the replacement value, or `None` to keep the node.
pub(crate) struct NormalizationRule {
    pub name: &'static str,
    pub pattern: &'static [PathPattern],
    pub rewrite: fn(&YamlNode) -> Option<YamlValue>,
}

pub(crate) const NORMALIZATION_RULES: &[NormalizationRule] = &[NormalizationRule {
    name: "spot-boolean",
    pattern: &[
        PathPattern::Key("runners"),
        PathPattern::AnyKey,
        PathPattern::Key("spot"),
    ],
    rewrite: spot_bool_to_string,
}];

/// `spot: true` and `spot: false` are spelled as strings in the schema enum.
fn spot_bool_to_string(node: &YamlNode) -> Option<YamlValue> {
    node.as_bool()
        .map(|b| YamlValue::String(if b { "true" } else { "false" }.to_string()))
}

/// Return a normalized copy of `root`.
///
/// Rewritten nodes keep the position of the node they replace. Normalizing
/// an already normalized tree returns an equal tree.
pub fn normalize(root: &YamlNode) -> YamlNode {
    normalize_with(root, NORMALIZATION_RULES)
}

pub(crate) fn normalize_with(root: &YamlNode, rules: &[NormalizationRule]) -> YamlNode {
    let mut path = Vec::new();
    normalize_node(root, &mut path, rules)
}

fn normalize_node<'a>(
    node: &'a YamlNode,
    path: &mut Vec<&'a str>,
    rules: &[NormalizationRule],
) -> YamlNode {
    for rule in rules.iter().filter(|r| pattern_matches(r.pattern, path.as_slice())) {
        if let Some(value) = (rule.rewrite)(node) {
            tracing::debug!(
                rule = rule.name,
                path = %path.join("."),
                "normalized field"
            );
            return YamlNode::new(value, node.position);
        }
    }

    let YamlValue::Mapping(entries) = &node.value else {
        return node.clone();
    };

    let entries = entries
        .iter()
        .map(|entry| {
            path.push(&entry.key);
            let value = if rules.iter().any(|r| pattern_has_prefix(r.pattern, path.as_slice())) {
                normalize_node(&entry.value, path, rules)
            } else {
                entry.value.clone()
            };
            path.pop();
            YamlEntry::new(entry.key.clone(), entry.key_position, value)
        })
        .collect();

    YamlNode::new(YamlValue::Mapping(entries), node.position)
}

fn pattern_matches(pattern: &[PathPattern], path: &[&str]) -> bool {
    pattern.len() == path.len() && pattern_has_prefix(pattern, path)
}

fn pattern_has_prefix(pattern: &[PathPattern], path: &[&str]) -> bool {
    pattern.len() >= path.len()
        && pattern
            .iter()
            .zip(path)
            .all(|(segment, key)| segment.matches(key))
}
