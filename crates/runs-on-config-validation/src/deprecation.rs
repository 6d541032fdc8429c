//! Deprecated field detection
//!
//! Deprecated fields are still valid, so this scan runs over the original
//! tree whether or not structural validation passed, and its findings never
//! fail a document.

use crate::error::InstancePath;
use runs_on_yaml::{Position, YamlNode};

/// `<collection>.*.<field>` is deprecated in favor of `replacement`.
#[derive(Debug, Clone, Copy)]
pub struct DeprecatedField {
    pub collection: &'static str,
    pub field: &'static str,
    pub replacement: &'static str,
}

pub const DEPRECATED_FIELDS: &[DeprecatedField] = &[
    DeprecatedField {
        collection: "runners",
        field: "disk",
        replacement: "volume",
    },
    DeprecatedField {
        collection: "pools",
        field: "environment",
        replacement: "env",
    },
];

/// A deprecated field found in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Deprecation {
    /// Path to the deprecated key, e.g. `runners.small.disk`
    pub instance_path: InstancePath,
    pub field: &'static str,
    pub replacement: &'static str,
    /// Position of the key token
    pub position: Option<Position>,
}

impl Deprecation {
    pub fn message(&self) -> String {
        format!(
            "{}: field '{}' is deprecated, use '{}' instead",
            self.instance_path, self.field, self.replacement
        )
    }
}

/// Find every deprecated field in document order.
pub fn scan_deprecations(root: &YamlNode) -> Vec<Deprecation> {
    let mut found = Vec::new();
    let Some(sections) = root.as_mapping() else {
        return found;
    };

    for section in sections {
        let rules: Vec<_> = DEPRECATED_FIELDS
            .iter()
            .filter(|d| d.collection == section.key)
            .collect();
        if rules.is_empty() {
            continue;
        }
        let Some(items) = section.value.as_mapping() else {
            continue;
        };
        for item in items {
            let Some(fields) = item.value.as_mapping() else {
                continue;
            };
            for field in fields {
                if let Some(rule) = rules.iter().find(|d| d.field == field.key) {
                    let instance_path = InstancePath::new()
                        .child_key(section.key.as_str())
                        .child_key(item.key.as_str())
                        .child_key(field.key.as_str());
                    tracing::trace!(path = %instance_path, "deprecated field");
                    found.push(Deprecation {
                        instance_path,
                        field: rule.field,
                        replacement: rule.replacement,
                        position: field.key_position,
                    });
                }
            }
        }
    }
    found
}
