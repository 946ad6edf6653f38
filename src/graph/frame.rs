//! Frames: the immutable attribute bag identifying one call-stack position.
//!
//! Attributes are kept in a sorted map, so equality, ordering and hashing
//! all work over the canonical (key, value) sequence.

use crate::utils::config::DEFAULT_FRAME_TYPE;
use crate::utils::error::GraphError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Floating-point attribute with a total order
///
/// Compared with `f64::total_cmp` and hashed by bit pattern, so `-0.0` and
/// `0.0` are distinct and every NaN payload equals itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrFloat(pub f64);

impl PartialEq for AttrFloat {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AttrFloat {}

impl PartialOrd for AttrFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttrFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for AttrFloat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// A single frame attribute value
///
/// Integers are tried before floats, so `3` reads as `Int` and `3.0` as `Float`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(AttrFloat),
    Str(String),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(x) => write!(f, "{}", x.0),
            AttrValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(AttrFloat(value))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// Identity-bearing attribute set for one call-stack position
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frame {
    attrs: BTreeMap<String, AttrValue>,
}

impl Frame {
    /// Build a frame from an attribute map
    ///
    /// A missing `type` attribute is filled with `"None"`.
    ///
    /// # Errors
    /// * `GraphError::EmptyFrame` - no attributes were given
    pub fn new(mut attrs: BTreeMap<String, AttrValue>) -> Result<Self, GraphError> {
        if attrs.is_empty() {
            return Err(GraphError::EmptyFrame);
        }
        attrs
            .entry("type".to_string())
            .or_insert_with(|| AttrValue::Str(DEFAULT_FRAME_TYPE.to_string()));
        Ok(Self { attrs })
    }

    /// Build a frame from `(key, value)` pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self, GraphError>
    where
        K: Into<String>,
        V: Into<AttrValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Shorthand for a frame carrying only a name
    pub fn named(name: impl Into<String>) -> Self {
        let mut attrs = BTreeMap::new();
        attrs.insert("name".to_string(), AttrValue::Str(name.into()));
        attrs.insert(
            "type".to_string(),
            AttrValue::Str(DEFAULT_FRAME_TYPE.to_string()),
        );
        Self { attrs }
    }

    pub fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// The `name` attribute, when it is a string
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(AttrValue::as_str)
    }

    /// Attribute values for several keys at once, in the order requested
    pub fn values(&self, keys: &[&str]) -> Vec<Option<&AttrValue>> {
        keys.iter().map(|k| self.attrs.get(*k)).collect()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .attrs
            .iter()
            .map(|(k, v)| format!("'{}': '{}'", k, v))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
