//! # runs-on-yaml
//!
//! YAML parsing with source position tracking.
//!
//! This crate turns `runs-on.yml` text into a [`YamlNode`] tree: an explicit
//! tagged union over the YAML data model where every node built from a
//! source token remembers the line and column it started at. Anchors,
//! aliases and `<<` merge keys are expanded while the tree is built, so
//! consumers never see an alias.
//!
//! ## Example
//!
//! ```rust
//! use runs_on_yaml::{parse, YamlValue};
//!
//! let content = r#"
//! runners:
//!   small:
//!     cpu: [2]
//! "#;
//!
//! let root = parse(content).unwrap();
//! let cpu = root.get("runners").and_then(|r| r.get("small")).and_then(|s| s.get("cpu")).unwrap();
//! assert!(matches!(cpu.value, YamlValue::Sequence(_)));
//! assert!(cpu.position.is_some());
//! ```

mod error;
mod node;
mod parser;
mod position;

pub use error::{Error, Result};
pub use node::{YamlEntry, YamlNode, YamlValue};
pub use parser::{parse, parse_file};
pub use position::Position;
