//! Domain types shared by the ingestion, retrieval and recommendation paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type UnitId = String;
pub type PlaceId = i64;

/// Loosely typed metadata as produced by parsers, before sanitization.
pub type RawMeta = serde_json::Map<String, serde_json::Value>;

/// Sanitized metadata: only scalar primitives, never null.
pub type Metadata = BTreeMap<String, MetaValue>;

/// The scalar union accepted at the vector index boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Converts a JSON scalar. Null, arrays and objects have no scalar form.
    pub fn from_json_scalar(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(MetaValue::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(MetaValue::Int)
                .or_else(|| n.as_f64().map(MetaValue::Float)),
            serde_json::Value::String(s) => Some(MetaValue::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Float(x) => write!(f, "{x}"),
            MetaValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Str(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Str(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

/// How a unit may be treated downstream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// One tabular row; stored as-is, never split.
    Atomic,
    /// Free text subject to chunking.
    Splittable,
}

impl UnitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::Atomic => "atomic",
            UnitKind::Splittable => "splittable",
        }
    }
}

/// A retrievable text unit ready to be embedded and stored.
///
/// - `id`: `{source}::chunk{n}` for chunks, `{source}::row{n}` for table rows
/// - `source`: basename of the originating document
/// - `page`: page or 1-based row number, 0 when unknown
/// - `metadata`: unsanitized fields; the index boundary cleans them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextUnit {
    pub id: UnitId,
    pub source: String,
    pub page: i64,
    pub text: String,
    pub kind: UnitKind,
    pub metadata: RawMeta,
}

/// A nearest-neighbour match. Lower `distance` is closer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: UnitId,
    pub text: String,
    pub source: String,
    pub page: i64,
    pub metadata: Metadata,
    pub distance: f32,
}

/// One turn of a conversation, oldest first when passed as history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}
