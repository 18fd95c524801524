//! Core types for compound document resolution.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level member holding primary data.
pub const DATA: &str = "data";

/// Top-level member holding side-loaded resources.
pub const INCLUDED: &str = "included";

/// Resource member holding relationship linkage.
pub const RELATIONSHIPS: &str = "relationships";

/// Request headers forwarded to every batch fetch.
pub type Headers = BTreeMap<String, String>;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Identity of a fetchable resource: its `(type, id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceReference {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ResourceReference {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Read a `{type, id}` pair from a resource or identifier object.
    ///
    /// Returns `None` unless both members are present, are strings, and are non-empty.
    pub fn from_value(value: &Value) -> Option<Self> {
        let resource_type = value.get("type")?.as_str()?;
        let id = value.get("id")?.as_str()?;
        if resource_type.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self::new(resource_type, id))
    }
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.id)
    }
}

/// What to do when a per-type batch fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStrategy {
    /// Abort the whole resolution on the first failure.
    #[default]
    Fail,
    /// Drop the failing type's contribution and keep going.
    Ignore,
}

impl ErrorStrategy {
    /// Parse a strategy name (`fail` or `ignore`, case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Some(ErrorStrategy::Fail),
            "ignore" => Some(ErrorStrategy::Ignore),
            _ => None,
        }
    }
}

/// How the `data` member of a document is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentMode {
    /// `data` holds resource objects; linkage lives under their `relationships`.
    PrimaryResource,
    /// `data` holds resource identifiers of the named relationship.
    Relationship(String),
}

/// A client-requested chain of relationship names, e.g. `citizenships.currencies`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IncludePath {
    segments: Vec<String>,
}

impl IncludePath {
    /// Parse a dot-separated path.
    ///
    /// Returns `None` for an empty path or one with an empty segment (`a..b`).
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<String> = path.split('.').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for IncludePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Parse a comma-separated `include` query value into a set of paths.
///
/// Malformed entries are dropped.
pub fn parse_include_param(param: &str) -> BTreeSet<IncludePath> {
    param.split(',').filter_map(IncludePath::parse).collect()
}
