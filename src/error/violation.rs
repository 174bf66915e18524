//! Constraint violation records.
//!
//! This module provides [`ConstraintViolation`] for a single failed constraint
//! and [`ConstraintViolations`] for a non-empty collection of them.

use std::fmt::{self, Display};
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::Serialize;
use stillwater::prelude::*;

use crate::metadata::ConstraintDescriptor;
use crate::path::PropertyPath;
use crate::types::TypeKey;
use crate::value::{BeanId, BeanRef, Value};

/// A single constraint violation with full context.
///
/// - **path**: where in the object graph the violation occurred
/// - **message**: the interpolated, human-readable message
/// - **message_template**: the uninterpolated template (the violation's reason)
/// - **leaf_bean**: the bean owning the violated property (or the bean itself
///   for class-level constraints)
/// - **invalid_value**: the value that failed
/// - **constraint**: a serializable description of the violated constraint
///
/// # Example
///
/// ```rust
/// use beanval::{ConstraintViolation, PropertyPath, Value};
///
/// let violation = ConstraintViolation::new(PropertyPath::from_property("zip"), "may not be null")
///     .with_template("{beanval.NotNull.message}")
///     .with_invalid_value(Value::Null);
///
/// assert_eq!(violation.to_string(), "zip: may not be null");
/// ```
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    /// The interpolated message.
    pub message: String,
    /// The message template the message was produced from.
    pub message_template: String,
    /// Type of the root object of the validation call.
    pub root_type: Option<TypeKey>,
    /// The bean owning the violated property.
    pub leaf_bean: Option<BeanRef>,
    /// Name of the violated property, `None` for class-level constraints.
    pub property: Option<String>,
    /// Full path from the root to the invalid value.
    pub path: PropertyPath,
    /// The value that failed validation.
    pub invalid_value: Value,
    /// The violated constraint.
    pub constraint: Option<Arc<ConstraintDescriptor>>,
}

impl ConstraintViolation {
    /// Creates a violation with the given path and message.
    ///
    /// The template defaults to the message itself.
    pub fn new(path: PropertyPath, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            message_template: message.clone(),
            message,
            root_type: None,
            leaf_bean: None,
            property: None,
            path,
            invalid_value: Value::Null,
            constraint: None,
        }
    }

    /// Sets the message template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.message_template = template.into();
        self
    }

    /// Sets the root type.
    pub fn with_root_type(mut self, root_type: TypeKey) -> Self {
        self.root_type = Some(root_type);
        self
    }

    /// Sets the owning bean.
    pub fn with_leaf_bean(mut self, bean: BeanRef) -> Self {
        self.leaf_bean = Some(bean);
        self
    }

    /// Sets the violated property name.
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Sets the invalid value.
    pub fn with_invalid_value(mut self, value: Value) -> Self {
        self.invalid_value = value;
        self
    }

    /// Sets the constraint descriptor.
    pub fn with_constraint(mut self, descriptor: Arc<ConstraintDescriptor>) -> Self {
        self.constraint = Some(descriptor);
        self
    }

    /// Identity of the owning bean.
    pub fn leaf_bean_id(&self) -> Option<BeanId> {
        self.leaf_bean.as_ref().map(BeanId::of)
    }

    /// Name of the violated constraint, if known.
    pub fn constraint_name(&self) -> Option<&str> {
        self.constraint.as_deref().map(|c| c.constraint.as_str())
    }
}

/// Structural equality; the owning bean compares by identity.
impl PartialEq for ConstraintViolation {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && self.message_template == other.message_template
            && self.root_type == other.root_type
            && self.leaf_bean_id() == other.leaf_bean_id()
            && self.property == other.property
            && self.path == other.path
            && self.invalid_value == other.invalid_value
            && self.constraint == other.constraint
    }
}

impl Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path_str = if self.path.is_root() {
            "(root)".to_string()
        } else {
            self.path.to_string()
        };
        write!(f, "{}: {}", path_str, self.message)
    }
}

impl std::error::Error for ConstraintViolation {}

impl Serialize for ConstraintViolation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("ConstraintViolation", 6)?;
        s.serialize_field("path", &self.path)?;
        s.serialize_field("message", &self.message)?;
        s.serialize_field("messageTemplate", &self.message_template)?;
        s.serialize_field("property", &self.property)?;
        s.serialize_field("invalidValue", &self.invalid_value.to_json())?;
        s.serialize_field("constraint", &self.constraint)?;
        s.end()
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<ConstraintViolation>();
    assert_sync::<ConstraintViolation>();
};

/// A non-empty collection of constraint violations.
///
/// `ConstraintViolations` wraps a `NonEmptyVec` so a
/// `Validation<T, ConstraintViolations>` failure always carries at least one
/// violation. It implements `Semigroup`, so results of independent validations
/// can be combined:
///
/// ```rust
/// use beanval::{ConstraintViolation, ConstraintViolations, PropertyPath};
/// use stillwater::prelude::*;
///
/// let a = ConstraintViolations::single(ConstraintViolation::new(
///     PropertyPath::from_property("name"),
///     "may not be null",
/// ));
/// let b = ConstraintViolations::single(ConstraintViolation::new(
///     PropertyPath::from_property("email"),
///     "not a well-formed email address",
/// ));
///
/// assert_eq!(a.combine(b).len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintViolations(NonEmptyVec<ConstraintViolation>);

impl ConstraintViolations {
    /// Creates a collection holding one violation.
    pub fn single(violation: ConstraintViolation) -> Self {
        Self(NonEmptyVec::singleton(violation))
    }

    /// Creates a collection from a `Vec`, or `None` if it is empty.
    pub fn from_vec(violations: Vec<ConstraintViolation>) -> Option<Self> {
        let mut iter = violations.into_iter();
        let head = NonEmptyVec::singleton(iter.next()?);
        Some(Self(iter.fold(head, |acc, v| {
            acc.combine(NonEmptyVec::singleton(v))
        })))
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; the collection is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates the violations.
    pub fn iter(&self) -> impl Iterator<Item = &ConstraintViolation> {
        self.0.iter()
    }

    /// Violations at exactly the given path.
    pub fn at_path(&self, path: &PropertyPath) -> Vec<&ConstraintViolation> {
        self.0.iter().filter(|v| &v.path == path).collect()
    }

    /// Violations produced from the given message template.
    pub fn with_template(&self, template: &str) -> Vec<&ConstraintViolation> {
        self.0
            .iter()
            .filter(|v| v.message_template == template)
            .collect()
    }

    /// The first violation.
    pub fn first(&self) -> &ConstraintViolation {
        self.0.head()
    }

    /// Converts into a `Vec`.
    pub fn into_vec(self) -> Vec<ConstraintViolation> {
        self.0.into_vec()
    }
}

impl Semigroup for ConstraintViolations {
    fn combine(self, other: Self) -> Self {
        ConstraintViolations(self.0.combine(other.0))
    }
}

impl Display for ConstraintViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation failed with {} violation(s):", self.len())?;
        for (i, violation) in self.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConstraintViolations {}

impl IntoIterator for ConstraintViolations {
    type Item = ConstraintViolation;
    type IntoIter = std::vec::IntoIter<ConstraintViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_vec().into_iter()
    }
}
