//! Dynamically-typed answer values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved answer or computed variable.
///
/// Deserializes from any JSON/YAML scalar or sequence; `null` and mappings are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of the value. Numeric strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// True for an empty string or an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }

    /// Boolean coercion used by bare-field condition checks.
    ///
    /// Zero is falsy regardless of how the number was written (`0`, `-0`, `0.0`).
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::String(s) => {
                matches!(s.to_ascii_lowercase().as_str(), "true" | "yes" | "y" | "1")
            }
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::List(_) => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = String;

    fn try_from(value: serde_json::Value) -> std::result::Result<Self, Self::Error> {
        match value {
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => Ok(Value::Number(n)),
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Array(items) => {
                items.into_iter().map(Value::try_from).collect::<Result<_, _>>().map(Value::List)
            }
            serde_json::Value::Null => Err("null is not a supported answer value".to_string()),
            serde_json::Value::Object(_) => {
                Err("objects are not supported answer values".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_falsy_for_every_number_form() {
        assert!(!Value::from(0i32).is_truthy());
        assert!(!Value::from(0i64).is_truthy());
        assert!(!Value::from(0u64).is_truthy());
        assert!(!Value::Number(serde_json::Number::from_f64(0.0).unwrap()).is_truthy());
        assert!(Value::from(-3i64).is_truthy());
    }

    #[test]
    fn string_truthiness_is_case_insensitive() {
        for s in ["true", "TRUE", "Yes", "y", "1"] {
            assert!(Value::from(s).is_truthy(), "{s}");
        }
        for s in ["false", "no", "0", "", "on"] {
            assert!(!Value::from(s).is_truthy(), "{s}");
        }
    }

    #[test]
    fn display_stringifies_numbers_naturally() {
        assert_eq!(Value::from(8080i64).to_string(), "8080");
        assert_eq!(Value::from(vec![Value::from("a"), Value::from(2i64)]).to_string(), "a,2");
    }
}
