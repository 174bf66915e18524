//! Type identities and the type hierarchy.
//!
//! Constraint dispatch, implicit grouping and metadata inheritance all need to
//! answer "is `A` a supertype of `B`?". This module provides [`TypeKey`] (an
//! interned type name), [`TypeInfo`] (one node of the hierarchy), [`TypeRef`]
//! (a declared, possibly generic type) and the [`TypeSystem`] that ties them
//! together.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{self, Display};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::value::Value;

/// Names of the types every [`TypeSystem`] knows about.
pub mod names {
    /// Root of the class hierarchy.
    pub const OBJECT: &str = "Object";
    /// Interface implemented by ordered scalar types.
    pub const COMPARABLE: &str = "Comparable";
    /// Interface implemented by text types.
    pub const CHAR_SEQUENCE: &str = "CharSequence";
    /// Text values.
    pub const STRING: &str = "String";
    /// Abstract numeric supertype.
    pub const NUMBER: &str = "Number";
    /// Integral values.
    pub const INTEGER: &str = "Integer";
    /// Floating point values.
    pub const DOUBLE: &str = "Double";
    /// Boolean values.
    pub const BOOLEAN: &str = "Boolean";
    /// Abstract supertype of every enum type.
    pub const ENUM: &str = "Enum";
    /// Anything that can be iterated.
    pub const ITERABLE: &str = "Iterable";
    /// Sized iterables.
    pub const COLLECTION: &str = "Collection";
    /// Positionally ordered collections.
    pub const LIST: &str = "List";
    /// Unordered collections.
    pub const SET: &str = "Set";
    /// Key/value containers.
    pub const MAP: &str = "Map";
    /// Fixed-size object arrays.
    pub const ARRAY: &str = "Array";
    /// Marker of the default validation group.
    pub const DEFAULT_GROUP: &str = "Default";
}

/// The identity of a type, compared by name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(Arc<str>);

impl TypeKey {
    /// Creates a type key from a type name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// The `Object` type key.
    pub fn object() -> Self {
        Self::new(names::OBJECT)
    }

    /// Returns true if this key names `Object`.
    pub fn is_object(&self) -> bool {
        &*self.0 == names::OBJECT
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeKey {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&TypeKey> for TypeKey {
    fn from(key: &TypeKey) -> Self {
        key.clone()
    }
}

/// What sort of type a [`TypeInfo`] describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// A concrete, instantiable type.
    Class,
    /// A type that can only be instantiated through a subtype.
    AbstractClass,
    /// A pure contract; also the kind of group marker types.
    Interface,
    /// An enumeration with a fixed set of constant names.
    Enum {
        /// The declared constant names.
        constants: Vec<String>,
    },
}

/// One node of the type hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// The type's identity.
    pub key: TypeKey,
    /// What sort of type this is.
    pub kind: TypeKind,
    /// Direct superclass, `None` only for `Object` and interfaces.
    pub superclass: Option<TypeKey>,
    /// Directly implemented (or, for interfaces, extended) interfaces.
    pub interfaces: Vec<TypeKey>,
}

impl TypeInfo {
    /// Describes a concrete class extending `Object`.
    pub fn class(key: impl Into<TypeKey>) -> Self {
        Self {
            key: key.into(),
            kind: TypeKind::Class,
            superclass: Some(TypeKey::object()),
            interfaces: Vec::new(),
        }
    }

    /// Describes an abstract class extending `Object`.
    pub fn abstract_class(key: impl Into<TypeKey>) -> Self {
        Self {
            kind: TypeKind::AbstractClass,
            ..Self::class(key)
        }
    }

    /// Describes an interface with no super-interfaces.
    pub fn interface(key: impl Into<TypeKey>) -> Self {
        Self {
            key: key.into(),
            kind: TypeKind::Interface,
            superclass: None,
            interfaces: Vec::new(),
        }
    }

    /// Describes an enum type with the given constants.
    pub fn enumeration<I, S>(key: impl Into<TypeKey>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            kind: TypeKind::Enum {
                constants: constants.into_iter().map(Into::into).collect(),
            },
            superclass: Some(TypeKey::new(names::ENUM)),
            interfaces: Vec::new(),
        }
    }

    /// Sets the superclass.
    pub fn extends(mut self, superclass: impl Into<TypeKey>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Adds an implemented (or extended, for interfaces) interface.
    pub fn implements(mut self, interface: impl Into<TypeKey>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Returns true for interfaces.
    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    /// Returns true for types that cannot be instantiated directly.
    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Interface | TypeKind::AbstractClass)
    }

    /// Returns true for enum types.
    pub fn is_enum(&self) -> bool {
        matches!(self.kind, TypeKind::Enum { .. })
    }
}

/// The registry of known types and their hierarchy.
///
/// A `TypeSystem` is populated during configuration and then shared read-only
/// (behind an `Arc`) by every validation run.
///
/// # Example
///
/// ```rust
/// use beanval::types::{TypeInfo, TypeKey, TypeSystem};
///
/// let mut types = TypeSystem::new();
/// types.register(TypeInfo::interface("Named")).unwrap();
/// types.register(TypeInfo::class("Person").implements("Named")).unwrap();
///
/// assert!(types.is_assignable_from(&TypeKey::from("Named"), &TypeKey::from("Person")));
/// assert!(types.is_assignable_from(&TypeKey::object(), &TypeKey::from("Person")));
/// ```
#[derive(Debug, Clone)]
pub struct TypeSystem {
    types: HashMap<TypeKey, TypeInfo>,
}

impl TypeSystem {
    /// Creates a type system seeded with the built-in types.
    pub fn new() -> Self {
        use names::*;

        let builtins = [
            TypeInfo {
                key: TypeKey::object(),
                kind: TypeKind::Class,
                superclass: None,
                interfaces: Vec::new(),
            },
            TypeInfo::interface(COMPARABLE),
            TypeInfo::interface(CHAR_SEQUENCE),
            TypeInfo::class(STRING)
                .implements(CHAR_SEQUENCE)
                .implements(COMPARABLE),
            TypeInfo::abstract_class(NUMBER),
            TypeInfo::class(INTEGER).extends(NUMBER).implements(COMPARABLE),
            TypeInfo::class(DOUBLE).extends(NUMBER).implements(COMPARABLE),
            TypeInfo::class(BOOLEAN).implements(COMPARABLE),
            TypeInfo::abstract_class(ENUM).implements(COMPARABLE),
            TypeInfo::interface(ITERABLE),
            TypeInfo::interface(COLLECTION).implements(ITERABLE),
            TypeInfo::interface(LIST).implements(COLLECTION),
            TypeInfo::interface(SET).implements(COLLECTION),
            TypeInfo::interface(MAP),
            TypeInfo::class(ARRAY),
            TypeInfo::interface(DEFAULT_GROUP),
        ];

        Self {
            types: builtins
                .into_iter()
                .map(|info| (info.key.clone(), info))
                .collect(),
        }
    }

    /// Registers a type.
    ///
    /// Supertypes must already be registered, which also rules out cycles.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateType` if the name is taken and
    /// `ConfigError::UnknownType` if a supertype is not registered.
    pub fn register(&mut self, info: TypeInfo) -> Result<(), ConfigError> {
        if self.types.contains_key(&info.key) {
            return Err(ConfigError::DuplicateType(info.key));
        }
        for parent in info.superclass.iter().chain(info.interfaces.iter()) {
            if !self.types.contains_key(parent) {
                return Err(ConfigError::UnknownType(parent.clone()));
            }
        }
        self.types.insert(info.key.clone(), info);
        Ok(())
    }

    /// Registers several types in order.
    pub fn register_all(
        &mut self,
        infos: impl IntoIterator<Item = TypeInfo>,
    ) -> Result<(), ConfigError> {
        infos.into_iter().try_for_each(|info| self.register(info))
    }

    /// Looks up a type.
    pub fn get(&self, key: &TypeKey) -> Option<&TypeInfo> {
        self.types.get(key)
    }

    /// Looks up a type, failing with `ConfigError::UnknownType`.
    pub fn require(&self, key: &TypeKey) -> Result<&TypeInfo, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::UnknownType(key.clone()))
    }

    /// Returns true if the type is registered.
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.types.contains_key(key)
    }

    /// Returns true if `target` is `source` or one of its supertypes.
    ///
    /// `Object` is assignable from every registered type, interfaces included.
    pub fn is_assignable_from(&self, target: &TypeKey, source: &TypeKey) -> bool {
        if target == source || target.is_object() {
            return true;
        }
        self.supertypes(source).contains(target)
    }

    /// Returns every strict supertype of `key`, nearest first.
    pub fn supertypes(&self, key: &TypeKey) -> Vec<TypeKey> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(key.clone());

        while let Some(current) = queue.pop_front() {
            let Some(info) = self.types.get(&current) else {
                continue;
            };
            for parent in info.superclass.iter().chain(info.interfaces.iter()) {
                if seen.insert(parent.clone()) {
                    out.push(parent.clone());
                    queue.push_back(parent.clone());
                }
            }
        }
        out
    }

    /// Returns the superclass chain of `key` from the most general ancestor
    /// down to `key` itself. Interfaces yield just themselves.
    pub fn class_chain(&self, key: &TypeKey) -> Vec<TypeKey> {
        let mut chain = vec![key.clone()];
        let mut current = self.types.get(key).and_then(|i| i.superclass.clone());
        while let Some(parent) = current {
            if chain.contains(&parent) {
                break;
            }
            current = self.types.get(&parent).and_then(|i| i.superclass.clone());
            chain.push(parent);
        }
        chain.reverse();
        chain
    }

    /// Returns the interfaces `key` declares directly plus all of their
    /// super-interfaces, super-interfaces first.
    pub fn interfaces_of(&self, key: &TypeKey) -> Vec<TypeKey> {
        let mut out = Vec::new();
        if let Some(info) = self.types.get(key) {
            for iface in &info.interfaces {
                self.collect_interface(iface, &mut out);
            }
        }
        out
    }

    fn collect_interface(&self, iface: &TypeKey, out: &mut Vec<TypeKey>) {
        if out.contains(iface) {
            return;
        }
        if let Some(info) = self.types.get(iface) {
            for parent in &info.interfaces {
                self.collect_interface(parent, out);
            }
        }
        if !out.contains(iface) {
            out.push(iface.clone());
        }
    }

    /// Returns the runtime type of a value.
    pub fn runtime_type(&self, value: &Value) -> TypeKey {
        runtime_type_of(value)
    }

    /// Returns true if `key` is registered as an enum type.
    pub fn is_enum(&self, key: &TypeKey) -> bool {
        self.get(key).is_some_and(TypeInfo::is_enum)
    }
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the runtime type of a value.
pub fn runtime_type_of(value: &Value) -> TypeKey {
    use names::*;

    match value {
        Value::Null => TypeKey::object(),
        Value::Bool(_) => TypeKey::new(BOOLEAN),
        Value::Int(_) => TypeKey::new(INTEGER),
        Value::Float(_) => TypeKey::new(DOUBLE),
        Value::String(_) => TypeKey::new(STRING),
        Value::Enum(e) => e.enum_type.clone(),
        Value::List(_) => TypeKey::new(LIST),
        Value::Set(_) => TypeKey::new(SET),
        Value::Array(_) => TypeKey::new(ARRAY),
        Value::Map(_) => TypeKey::new(MAP),
        Value::Bean(bean) => bean.bean_type(),
    }
}

/// A declared type, possibly parameterized (`List<Address>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeRef {
    raw: TypeKey,
    args: Vec<TypeRef>,
}

impl TypeRef {
    /// A plain, non-generic type.
    pub fn named(raw: impl Into<TypeKey>) -> Self {
        Self {
            raw: raw.into(),
            args: Vec::new(),
        }
    }

    /// A generic type with explicit arguments.
    pub fn generic(raw: impl Into<TypeKey>, args: Vec<TypeRef>) -> Self {
        Self {
            raw: raw.into(),
            args,
        }
    }

    /// `Object`.
    pub fn object() -> Self {
        Self::named(names::OBJECT)
    }

    /// `List<element>`.
    pub fn list_of(element: TypeRef) -> Self {
        Self::generic(names::LIST, vec![element])
    }

    /// `Set<element>`.
    pub fn set_of(element: TypeRef) -> Self {
        Self::generic(names::SET, vec![element])
    }

    /// `Array<element>`.
    pub fn array_of(element: TypeRef) -> Self {
        Self::generic(names::ARRAY, vec![element])
    }

    /// `Map<key, value>`.
    pub fn map_of(key: TypeRef, value: TypeRef) -> Self {
        Self::generic(names::MAP, vec![key, value])
    }

    /// The raw (erased) type.
    pub fn raw(&self) -> &TypeKey {
        &self.raw
    }

    /// The type arguments.
    pub fn args(&self) -> &[TypeRef] {
        &self.args
    }

    /// The declared key type of a map type.
    pub fn map_key_type(&self, types: &TypeSystem) -> Option<&TypeRef> {
        if types.is_assignable_from(&TypeKey::new(names::MAP), &self.raw) {
            self.args.first()
        } else {
            None
        }
    }

    /// The type cascaded into when validating a value of this declared type:
    /// the value type of a map, the element type of an iterable or array, or
    /// the type itself. `None` when a container has no declared element type.
    pub fn cascade_element(&self, types: &TypeSystem) -> Option<&TypeRef> {
        if types.is_assignable_from(&TypeKey::new(names::MAP), &self.raw) {
            self.args.get(1)
        } else if types.is_assignable_from(&TypeKey::new(names::ITERABLE), &self.raw)
            || self.raw.name() == names::ARRAY
        {
            self.args.first()
        } else {
            Some(self)
        }
    }

    /// Parses a declared type such as `Map<String, List<Address>>`.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let mut parser = TypeRefParser {
            input,
            chars: input.char_indices().peekable(),
        };
        let parsed = parser.parse_type()?;
        parser.skip_ws();
        if parser.chars.peek().is_some() {
            return Err(parser.error("trailing characters"));
        }
        Ok(parsed)
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl From<&str> for TypeRef {
    fn from(raw: &str) -> Self {
        Self::named(raw)
    }
}

impl From<TypeKey> for TypeRef {
    fn from(raw: TypeKey) -> Self {
        Self::named(raw)
    }
}

impl<'de> Deserialize<'de> for TypeRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        TypeRef::parse(&text).map_err(serde::de::Error::custom)
    }
}

struct TypeRefParser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl TypeRefParser<'_> {
    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn error(&self, reason: &str) -> ConfigError {
        ConfigError::InvalidTypeRef {
            input: self.input.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse_type(&mut self) -> Result<TypeRef, ConfigError> {
        self.skip_ws();
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' || c == '$' {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(self.error("expected a type name"));
        }

        self.skip_ws();
        let mut args = Vec::new();
        if self.chars.peek().is_some_and(|(_, c)| *c == '<') {
            self.chars.next();
            loop {
                args.push(self.parse_type()?);
                self.skip_ws();
                match self.chars.next() {
                    Some((_, ',')) => continue,
                    Some((_, '>')) => break,
                    _ => return Err(self.error("unterminated type arguments")),
                }
            }
        }
        Ok(TypeRef::generic(name, args))
    }
}
