//! Constraint attribute values.

use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single constraint attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean attribute.
    Bool(bool),
    /// Integral attribute.
    Int(i64),
    /// Floating point attribute.
    Float(f64),
    /// Text attribute.
    String(String),
    /// Array attribute.
    List(Vec<AttributeValue>),
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Int(i64::from(i))
    }
}

impl From<f64> for AttributeValue {
    fn from(x: f64) -> Self {
        AttributeValue::Float(x)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

/// The attribute set of one constraint declaration, defaults included.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintAttributes(IndexMap<String, AttributeValue>);

impl ConstraintAttributes {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Sets an attribute and returns self for chaining.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the raw attribute.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    /// Returns true if the attribute is set.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Reads an integral attribute. Floats with no fractional part qualify.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.0.get(name)? {
            AttributeValue::Int(i) => Some(*i),
            AttributeValue::Float(x) if x.fract() == 0.0 => Some(*x as i64),
            _ => None,
        }
    }

    /// Reads a numeric attribute as a float.
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.0.get(name)? {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Reads a text attribute.
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.0.get(name)? {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Reads a boolean attribute.
    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.0.get(name)? {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Fills in every attribute from `defaults` that is not already set.
    pub fn merge_defaults(&mut self, defaults: &ConstraintAttributes) {
        for (name, value) in &defaults.0 {
            if !self.0.contains_key(name) {
                self.0.insert(name.clone(), value.clone());
            }
        }
    }

    /// Iterates name/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for ConstraintAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let attrs = ConstraintAttributes::new()
            .with("min", 2)
            .with("ratio", 0.5)
            .with("whole", 3.0)
            .with("regexp", "^a+$")
            .with("strict", true);

        assert_eq!(attrs.int("min"), Some(2));
        assert_eq!(attrs.int("whole"), Some(3));
        assert_eq!(attrs.int("ratio"), None);
        assert_eq!(attrs.number("min"), Some(2.0));
        assert_eq!(attrs.string("regexp"), Some("^a+$"));
        assert_eq!(attrs.bool("strict"), Some(true));
        assert_eq!(attrs.string("min"), None);
    }

    #[test]
    fn test_merge_defaults_keeps_explicit() {
        let mut attrs = ConstraintAttributes::new().with("max", 5);
        let defaults = ConstraintAttributes::new().with("min", 0).with("max", 100);
        attrs.merge_defaults(&defaults);
        assert_eq!(attrs.int("max"), Some(5));
        assert_eq!(attrs.int("min"), Some(0));
    }

    #[test]
    fn test_deserialize_untagged() {
        let attrs: ConstraintAttributes =
            serde_json::from_str(r#"{"min": 1, "regexp": "x", "flags": ["A", "B"]}"#).unwrap();
        assert_eq!(attrs.int("min"), Some(1));
        assert_eq!(attrs.string("regexp"), Some("x"));
        assert_eq!(attrs.get("flags").unwrap().to_string(), "[A, B]");
    }
}
