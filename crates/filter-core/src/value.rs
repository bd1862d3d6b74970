//! Typed values for per-exchange storage and user attributes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A value stored in an exchange's key-value map or attribute accumulator.
///
/// Serializes to plain JSON (`"text"`, `42`, `true`, `[..]`, `{..}`), which is
/// the form exported to access-log properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// Absent value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    String(String),
    /// Ordered list of values.
    List(Vec<ContextValue>),
    /// Nested string-keyed map.
    Map(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    /// Get as a boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as a string slice, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as an integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a float. Integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Check if this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(ContextValue::to_json).collect())
            }
            Self::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Plain rendering used for trace properties: text is written raw,
/// `Null` renders empty, lists and maps render as JSON.
impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
            Self::List(_) | Self::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for ContextValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for ContextValue {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for ContextValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl<T: Into<ContextValue>> From<Vec<T>> for ContextValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, ContextValue>> for ContextValue {
    fn from(map: BTreeMap<String, ContextValue>) -> Self {
        Self::Map(map)
    }
}

impl<T: Into<ContextValue>> From<Option<T>> for ContextValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert_eq!(ContextValue::from(true), ContextValue::Bool(true));
        assert_eq!(ContextValue::from(7i32), ContextValue::Int(7));
        assert_eq!(ContextValue::from("x"), ContextValue::String("x".to_string()));
        assert_eq!(ContextValue::from(None::<i64>), ContextValue::Null);
        assert_eq!(
            ContextValue::from(vec!["a", "b"]),
            ContextValue::List(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_accessors() {
        assert_eq!(ContextValue::Bool(true).as_bool(), Some(true));
        assert_eq!(ContextValue::Int(3).as_bool(), None);
        assert_eq!(ContextValue::from("v").as_str(), Some("v"));
        assert_eq!(ContextValue::Int(3).as_f64(), Some(3.0));
        assert!(ContextValue::Null.is_null());
    }

    #[test]
    fn test_display_for_trace() {
        assert_eq!(ContextValue::from("plain").to_string(), "plain");
        assert_eq!(ContextValue::Int(42).to_string(), "42");
        assert_eq!(ContextValue::Bool(false).to_string(), "false");
        assert_eq!(ContextValue::Null.to_string(), "");
        assert_eq!(ContextValue::from(vec![1i64, 2]).to_string(), "[1,2]");
    }

    #[test]
    fn test_serializes_as_plain_json() {
        let mut map = BTreeMap::new();
        map.insert("n".to_string(), ContextValue::Int(1));
        map.insert("s".to_string(), ContextValue::from("x"));
        let json = serde_json::to_string(&ContextValue::Map(map)).unwrap();
        assert_eq!(json, r#"{"n":1,"s":"x"}"#);
    }

    #[test]
    fn test_deserializes_untagged() {
        let value: ContextValue = serde_json::from_str(r#"{"a":[1,2.5,"t",null,true]}"#).unwrap();
        let ContextValue::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(
            map["a"],
            ContextValue::List(vec![
                ContextValue::Int(1),
                ContextValue::Float(2.5),
                ContextValue::from("t"),
                ContextValue::Null,
                ContextValue::Bool(true),
            ])
        );
    }
}
