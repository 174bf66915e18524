//! The dynamic object model validated by the engine.
//!
//! [`Value`] covers scalars, containers and beans. Beans are shared through
//! [`BeanRef`] (`Arc<dyn Bean>`), so object graphs may contain diamonds and
//! cycles; the engine tells instances apart by [`BeanId`], the address of the
//! shared allocation.

use std::fmt::{self, Display};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::types::TypeKey;

/// A shared bean instance.
pub type BeanRef = Arc<dyn Bean>;

/// A validated object: something with a type and named members.
///
/// Implement this for domain types to make them validatable, or use
/// [`DynBean`] for ad-hoc objects.
pub trait Bean: Send + Sync + fmt::Debug {
    /// The runtime type of this instance.
    fn bean_type(&self) -> TypeKey;

    /// Reads a field. `None` means the bean has no such member.
    fn field(&self, name: &str) -> Option<Value>;

    /// Invokes the zero-argument accessor for a property.
    ///
    /// Defaults to reading the field of the same name.
    fn getter(&self, property: &str) -> Option<Value> {
        self.field(property)
    }
}

/// Reference identity of a bean instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BeanId(usize);

impl BeanId {
    /// Returns the identity of a bean.
    pub fn of(bean: &BeanRef) -> Self {
        Self(Arc::as_ptr(bean) as *const () as usize)
    }
}

/// An enum constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumValue {
    /// The enum type.
    pub enum_type: TypeKey,
    /// The constant's name.
    pub constant: String,
}

impl EnumValue {
    /// Creates an enum constant.
    pub fn new(enum_type: impl Into<TypeKey>, constant: impl Into<String>) -> Self {
        Self {
            enum_type: enum_type.into(),
            constant: constant.into(),
        }
    }
}

/// A map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    /// Text key.
    String(String),
    /// Integral key.
    Int(i64),
    /// Boolean key.
    Bool(bool),
    /// Enum constant key.
    Enum(EnumValue),
}

impl Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::String(s) => f.write_str(s),
            MapKey::Int(i) => write!(f, "{}", i),
            MapKey::Bool(b) => write!(f, "{}", b),
            MapKey::Enum(e) => f.write_str(&e.constant),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::String(s.to_string())
    }
}

impl From<String> for MapKey {
    fn from(s: String) -> Self {
        MapKey::String(s)
    }
}

impl From<i64> for MapKey {
    fn from(i: i64) -> Self {
        MapKey::Int(i)
    }
}

impl From<EnumValue> for MapKey {
    fn from(e: EnumValue) -> Self {
        MapKey::Enum(e)
    }
}

/// Ordered map storage used by [`Value::Map`].
pub type ValueMap = IndexMap<MapKey, Value>;

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    String(String),
    /// Enum constant.
    Enum(EnumValue),
    /// Positionally ordered collection.
    List(Vec<Value>),
    /// Unordered collection; element positions carry no meaning.
    Set(Vec<Value>),
    /// Fixed-size object array.
    Array(Vec<Value>),
    /// Key/value container.
    Map(ValueMap),
    /// Shared reference to a bean.
    Bean(BeanRef),
}

impl Value {
    /// Wraps a bean.
    pub fn bean<B: Bean + 'static>(bean: B) -> Self {
        Value::Bean(Arc::new(bean))
    }

    /// Builds a map value from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<MapKey>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the bean, if this is one.
    pub fn as_bean(&self) -> Option<&BeanRef> {
        match self {
            Value::Bean(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the bean identity, if this is a bean.
    pub fn bean_id(&self) -> Option<BeanId> {
        self.as_bean().map(BeanId::of)
    }

    /// Returns the text, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the number as a float, for integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Number of elements of a container or characters of a string.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::List(items) | Value::Set(items) | Value::Array(items) => Some(items.len()),
            Value::Map(m) => Some(m.len()),
            _ => None,
        }
    }

    /// Returns true if the container or string is empty. `None` for other values.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|n| n == 0)
    }

    /// Converts JSON into a value: objects become string-keyed maps.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => Value::Map(
                obj.iter()
                    .map(|(k, v)| (MapKey::String(k.clone()), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Renders the value as JSON. Beans render as `{"$type": ..}` without
    /// their members, which keeps the output finite for cyclic graphs.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::Float(f) => json!(f),
            Value::String(s) => json!(s),
            Value::Enum(e) => json!(e.constant),
            Value::List(items) | Value::Set(items) | Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect(),
            ),
            Value::Bean(b) => json!({ "$type": b.bean_type().name() }),
        }
    }
}

/// Structural equality; beans compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::List(a), Value::List(b))
            | (Value::Set(a), Value::Set(b))
            | (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Bean(a), Value::Bean(b)) => BeanId::of(a) == BeanId::of(b),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::Enum(e) => f.write_str(&e.constant),
            Value::Bean(b) => write!(f, "{}@{:x}", b.bean_type(), BeanId::of(b).0),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
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

impl From<EnumValue> for Value {
    fn from(e: EnumValue) -> Self {
        Value::Enum(e)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Bean + 'static> From<Arc<T>> for Value {
    fn from(bean: Arc<T>) -> Self {
        Value::Bean(bean)
    }
}

/// A general-purpose bean backed by a field map.
///
/// Fields live behind a lock so references can be wired after construction,
/// which is how cyclic graphs are built.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use beanval::value::{Bean, DynBean, Value};
///
/// let a = Arc::new(DynBean::new("Node").with("name", "a"));
/// let b = Arc::new(DynBean::new("Node").with("name", "b"));
/// a.set("next", b.clone());
/// b.set("next", a.clone());
///
/// assert_eq!(a.field("name"), Some(Value::from("a")));
/// ```
pub struct DynBean {
    bean_type: TypeKey,
    fields: RwLock<IndexMap<String, Value>>,
    getters: IndexMap<String, Value>,
}

impl DynBean {
    /// Creates a bean of the given type with no fields.
    pub fn new(bean_type: impl Into<TypeKey>) -> Self {
        Self {
            bean_type: bean_type.into(),
            fields: RwLock::new(IndexMap::new()),
            getters: IndexMap::new(),
        }
    }

    /// Sets a field and returns self for chaining.
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.write().insert(name.into(), value.into());
        self
    }

    /// Makes the accessor for `property` return `value` instead of the field.
    pub fn with_getter(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.getters.insert(property.into(), value.into());
        self
    }

    /// Sets or replaces a field on a shared bean.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.write().insert(name.into(), value.into());
    }

    /// Wraps the bean into a shared [`Value`].
    pub fn into_value(self) -> Value {
        Value::bean(self)
    }
}

impl Bean for DynBean {
    fn bean_type(&self) -> TypeKey {
        self.bean_type.clone()
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.fields.read().get(name).cloned()
    }

    fn getter(&self, property: &str) -> Option<Value> {
        self.getters
            .get(property)
            .cloned()
            .or_else(|| self.field(property))
    }
}

// Field values may point back at this bean, so only names are printed.
impl fmt::Debug for DynBean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields.read();
        f.debug_struct("DynBean")
            .field("type", &self.bean_type)
            .field("fields", &fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<Value>();
    assert_sync::<Value>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bean_identity_not_equality() {
        let a = DynBean::new("Node").with("x", 1).into_value();
        let b = DynBean::new("Node").with("x", 1).into_value();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.bean_id(), a.clone().bean_id());
    }

    #[test]
    fn test_cyclic_graph_debug_terminates() {
        let a = Arc::new(DynBean::new("Node"));
        let b = Arc::new(DynBean::new("Node"));
        a.set("next", b.clone());
        b.set("next", a.clone());
        let rendered = format!("{:?}", Value::from(a));
        assert!(rendered.contains("next"));
    }

    #[test]
    fn test_getter_overrides_field() {
        let bean = DynBean::new("Person")
            .with("name", "raw")
            .with_getter("name", "computed");
        assert_eq!(bean.field("name"), Some(Value::from("raw")));
        assert_eq!(bean.getter("name"), Some(Value::from("computed")));
        assert_eq!(bean.getter("missing"), None);
    }

    #[test]
    fn test_from_json() {
        let value = Value::from_json(&json!({"a": [1, 2.5, "x"], "b": null}));
        let Value::Map(map) = &value else {
            panic!("expected map");
        };
        assert_eq!(
            map.get(&MapKey::from("a")),
            Some(&Value::List(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::from("x")
            ]))
        );
        assert_eq!(map.get(&MapKey::from("b")), Some(&Value::Null));
    }

    #[test]
    fn test_len() {
        assert_eq!(Value::from("héllo").len(), Some(5));
        assert_eq!(Value::List(vec![Value::Null]).len(), Some(1));
        assert_eq!(Value::Int(3).len(), None);
        assert_eq!(Value::Map(ValueMap::new()).is_empty(), Some(true));
    }

    #[test]
    fn test_to_json_bean_is_shallow() {
        let bean = DynBean::new("Address").with("zip", "123").into_value();
        assert_eq!(bean.to_json(), json!({"$type": "Address"}));
    }

    #[test]
    fn test_map_key_display() {
        assert_eq!(MapKey::from("home").to_string(), "home");
        assert_eq!(MapKey::Int(3).to_string(), "3");
        assert_eq!(
            MapKey::Enum(EnumValue::new("Kind", "HOME")).to_string(),
            "HOME"
        );
    }
}
