//! Value access strategies.
//!
//! An [`AccessStrategy`] reads one logical member from an instance: a field,
//! an accessor, a container position or a map entry. Strategies compare
//! equal when they address the same member, which is what the validation
//! context keys its value cache on.

use std::fmt::{self, Display};

use crate::error::AccessError;
use crate::types::{names, runtime_type_of, TypeKey, TypeRef};
use crate::value::{MapKey, Value};

/// The kind of element a strategy reads, as reported to traversable
/// resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// The bean itself (class-level constraints).
    Type,
    /// A field.
    Field,
    /// An accessor method.
    Method,
    /// A constructor or method parameter.
    Parameter,
    /// An element of a container.
    ContainerElement,
}

/// How a value is read from an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessStrategy {
    /// Direct field access.
    Field {
        /// Field name.
        name: String,
        /// Declared field type.
        declared_type: TypeRef,
    },
    /// Zero-argument accessor.
    Getter {
        /// Property name.
        property: String,
        /// Declared return type.
        declared_type: TypeRef,
    },
    /// Position in a list or array.
    Indexed {
        /// Element position.
        index: usize,
    },
    /// Entry of a map.
    Keyed {
        /// The requested key.
        key: MapKey,
        /// Enum type of the map keys, when declared.
        enum_keys: Option<TypeKey>,
    },
    /// Constructor parameter; values cannot be read through it.
    ConstructorParameter {
        /// Parameter position.
        index: usize,
        /// Parameter name.
        name: String,
        /// Declared parameter type.
        declared_type: TypeRef,
    },
}

impl AccessStrategy {
    /// Field access.
    pub fn field(name: impl Into<String>, declared_type: impl Into<TypeRef>) -> Self {
        AccessStrategy::Field {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    /// Accessor access.
    pub fn getter(property: impl Into<String>, declared_type: impl Into<TypeRef>) -> Self {
        AccessStrategy::Getter {
            property: property.into(),
            declared_type: declared_type.into(),
        }
    }

    /// Indexed access.
    pub fn indexed(index: usize) -> Self {
        AccessStrategy::Indexed { index }
    }

    /// Keyed access.
    pub fn keyed(key: impl Into<MapKey>) -> Self {
        AccessStrategy::Keyed {
            key: key.into(),
            enum_keys: None,
        }
    }

    /// Keyed access into a map whose keys are constants of `enum_type`: a
    /// text key is read as a constant name.
    pub fn keyed_enum(key: impl Into<MapKey>, enum_type: impl Into<TypeKey>) -> Self {
        AccessStrategy::Keyed {
            key: key.into(),
            enum_keys: Some(enum_type.into()),
        }
    }

    /// Constructor parameter placeholder.
    pub fn constructor_parameter(
        index: usize,
        name: impl Into<String>,
        declared_type: impl Into<TypeRef>,
    ) -> Self {
        AccessStrategy::ConstructorParameter {
            index,
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    /// Reads the value from `instance`.
    ///
    /// Field and accessor access also read string keys of a map, which is how
    /// maps are validated like beans.
    ///
    /// # Errors
    ///
    /// Fails for members the instance does not have, for instances of the
    /// wrong shape, and always for constructor parameters.
    pub fn get(&self, instance: &Value) -> Result<Value, AccessError> {
        match self {
            AccessStrategy::Field { name, .. } => match instance {
                Value::Bean(bean) => bean.field(name).ok_or_else(|| AccessError::MissingMember {
                    bean_type: bean.bean_type(),
                    member: name.clone(),
                }),
                Value::Map(map) => Ok(map
                    .get(&MapKey::String(name.clone()))
                    .cloned()
                    .unwrap_or_default()),
                other => Err(self.wrong_shape(other)),
            },
            AccessStrategy::Getter { property, .. } => match instance {
                Value::Bean(bean) => {
                    bean.getter(property)
                        .ok_or_else(|| AccessError::MissingMember {
                            bean_type: bean.bean_type(),
                            member: property.clone(),
                        })
                }
                Value::Map(map) => Ok(map
                    .get(&MapKey::String(property.clone()))
                    .cloned()
                    .unwrap_or_default()),
                other => Err(self.wrong_shape(other)),
            },
            AccessStrategy::Indexed { index } => match instance {
                Value::List(items) | Value::Array(items) | Value::Set(items) => {
                    Ok(items.get(*index).cloned().unwrap_or_default())
                }
                other => Err(self.wrong_shape(other)),
            },
            AccessStrategy::Keyed { key, enum_keys } => match instance {
                Value::Map(map) => Ok(lookup_key(map, key, enum_keys.as_ref())
                    .cloned()
                    .unwrap_or_default()),
                other => Err(self.wrong_shape(other)),
            },
            AccessStrategy::ConstructorParameter { .. } => {
                Err(AccessError::Unsupported(self.to_string()))
            }
        }
    }

    /// The kind of element read.
    pub fn element_kind(&self) -> ElementKind {
        match self {
            AccessStrategy::Field { .. } => ElementKind::Field,
            AccessStrategy::Getter { .. } => ElementKind::Method,
            AccessStrategy::Indexed { .. } | AccessStrategy::Keyed { .. } => {
                ElementKind::ContainerElement
            }
            AccessStrategy::ConstructorParameter { .. } => ElementKind::Parameter,
        }
    }

    /// The declared type of the member, `Object` for container elements.
    pub fn declared_type(&self) -> TypeRef {
        match self {
            AccessStrategy::Field { declared_type, .. }
            | AccessStrategy::Getter { declared_type, .. }
            | AccessStrategy::ConstructorParameter { declared_type, .. } => declared_type.clone(),
            AccessStrategy::Indexed { .. } | AccessStrategy::Keyed { .. } => {
                TypeRef::named(names::OBJECT)
            }
        }
    }

    /// The property name, for named members.
    pub fn property_name(&self) -> Option<&str> {
        match self {
            AccessStrategy::Field { name, .. } => Some(name),
            AccessStrategy::Getter { property, .. } => Some(property),
            AccessStrategy::ConstructorParameter { name, .. } => Some(name),
            AccessStrategy::Indexed { .. } | AccessStrategy::Keyed { .. } => None,
        }
    }

    fn wrong_shape(&self, instance: &Value) -> AccessError {
        AccessError::WrongShape {
            access: self.to_string(),
            found: runtime_type_of(instance),
        }
    }
}

fn lookup_key<'m>(
    map: &'m crate::value::ValueMap,
    key: &MapKey,
    enum_keys: Option<&TypeKey>,
) -> Option<&'m Value> {
    if let (MapKey::String(name), Some(enum_type)) = (key, enum_keys) {
        return map.iter().find_map(|(k, v)| match k {
            MapKey::Enum(e) if &e.enum_type == enum_type && &e.constant == name => Some(v),
            _ => None,
        });
    }
    if let Some(v) = map.get(key) {
        return Some(v);
    }
    let wanted = key.to_string();
    map.iter()
        .find_map(|(k, v)| (k.to_string() == wanted).then_some(v))
}

impl Display for AccessStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessStrategy::Field { name, .. } => write!(f, "field '{}'", name),
            AccessStrategy::Getter { property, .. } => write!(f, "accessor '{}'", property),
            AccessStrategy::Indexed { index } => write!(f, "index [{}]", index),
            AccessStrategy::Keyed { key, .. } => write!(f, "key [{}]", key),
            AccessStrategy::ConstructorParameter { index, name, .. } => {
                write!(f, "constructor parameter {} '{}'", index, name)
            }
        }
    }
}
