//! Typed cell values and column declarations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    Bool,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::Bool => "bool",
        };
        write!(f, "{}", s)
    }
}

/// Name and kind of one table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Numeric)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Text)
    }
}

/// One cell of the metric table
///
/// `Null` marks an absent value; it fits every column kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Number(f64),
    Text(String),
    #[default]
    Null,
}

impl MetricValue {
    /// The column kind this value belongs to, `None` for `Null`
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            MetricValue::Bool(_) => Some(ColumnKind::Bool),
            MetricValue::Number(_) => Some(ColumnKind::Numeric),
            MetricValue::Text(_) => Some(ColumnKind::Text),
            MetricValue::Null => None,
        }
    }

    pub fn fits(&self, kind: ColumnKind) -> bool {
        self.kind().map_or(true, |k| k == kind)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MetricValue::Null)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Bool(b) => write!(f, "{}", b),
            MetricValue::Number(n) => write!(f, "{}", n),
            MetricValue::Text(s) => write!(f, "{}", s),
            MetricValue::Null => write!(f, "NaN"),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Number(value as f64)
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        MetricValue::Bool(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_fits_every_kind() {
        assert!(MetricValue::Null.fits(ColumnKind::Numeric));
        assert!(MetricValue::Null.fits(ColumnKind::Text));
        assert!(!MetricValue::from(1.0).fits(ColumnKind::Text));
    }

    #[test]
    fn test_untagged_json() {
        let values: Vec<MetricValue> = serde_json::from_str(r#"[1.5, "main", true, null, 3]"#).unwrap();
        assert_eq!(
            values,
            vec![
                MetricValue::Number(1.5),
                MetricValue::from("main"),
                MetricValue::Bool(true),
                MetricValue::Null,
                MetricValue::Number(3.0),
            ]
        );
    }
}
