//! Snapshot value model
//!
//! Live metric snapshots are maps of named values. Rather than an opaque
//! JSON blob, values are a closed tagged variant so downstream consumers can
//! introspect snapshot structure without reflection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single value inside a metric snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
    List(Vec<MetricValue>),
    Map(BTreeMap<String, MetricValue>),
}

/// A named mapping of snapshot values, ordered for stable serialization
pub type Snapshot = BTreeMap<String, MetricValue>;

impl MetricValue {
    /// Numeric view of this value, if it holds a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integer view of this value, if it holds an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetricValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean view of this value, if it holds a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetricValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String view of this value, if it holds text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Map view of this value, if it holds a nested mapping
    pub fn as_map(&self) -> Option<&BTreeMap<String, MetricValue>> {
        match self {
            MetricValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Number(v)
    }
}

impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        MetricValue::Number(v as f64)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<u32> for MetricValue {
    fn from(v: u32) -> Self {
        MetricValue::Int(v as i64)
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::Int(v as i64)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

impl From<Snapshot> for MetricValue {
    fn from(v: Snapshot) -> Self {
        MetricValue::Map(v)
    }
}

impl<T: Into<MetricValue>> From<Vec<T>> for MetricValue {
    fn from(v: Vec<T>) -> Self {
        MetricValue::List(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_views() {
        assert_eq!(MetricValue::Number(1.5).as_f64(), Some(1.5));
        assert_eq!(MetricValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(MetricValue::Int(3).as_i64(), Some(3));
        assert_eq!(MetricValue::Text("x".into()).as_f64(), None);
    }

    #[test]
    fn test_serialization_is_untagged() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("score".to_string(), 87.5.into());
        snapshot.insert("samples".to_string(), 42u32.into());
        snapshot.insert("recording".to_string(), true.into());

        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"recording":true,"samples":42,"score":87.5}"#);
    }

    #[test]
    fn test_nested_map_round_trip() {
        let mut inner = Snapshot::new();
        inner.insert("left".to_string(), 1.0.into());
        inner.insert("right".to_string(), 2.0.into());

        let mut snapshot = Snapshot::new();
        snapshot.insert("hands".to_string(), inner.into());

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();

        let hands = parsed["hands"].as_map().unwrap();
        assert_eq!(hands["left"].as_f64(), Some(1.0));
        assert_eq!(hands["right"].as_f64(), Some(2.0));
    }

    #[test]
    fn test_list_from_vec() {
        let value: MetricValue = vec![1.0, 2.0, 3.0].into();
        match value {
            MetricValue::List(items) => assert_eq!(items.len(), 3),
            other => panic!("expected list, got {:?}", other),
        }
    }
}
