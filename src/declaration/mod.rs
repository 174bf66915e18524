//! Constraint declarations: the raw input metadata is built from.
//!
//! Declarations play the role of annotations. A [`DeclarationSource`] hands
//! out the [`BeanDeclaration`] of a type; [`DeclarationRegistry`] is the
//! in-memory source, and [`mapping`] turns external JSON descriptors into one.
//!
//! # Example
//!
//! ```rust
//! use beanval::declaration::{
//!     BeanDeclaration, ConstraintDeclaration, DeclarationRegistry, PropertyDeclaration,
//! };
//! use beanval::types::TypeRef;
//!
//! let declarations = DeclarationRegistry::new();
//! declarations
//!     .declare(
//!         BeanDeclaration::new("Address")
//!             .property(
//!                 PropertyDeclaration::field("zip", TypeRef::named("String"))
//!                     .constraint(ConstraintDeclaration::new("NotNull"))
//!                     .constraint(ConstraintDeclaration::new("Size").attr("max", 5)),
//!             ),
//!     )
//!     .unwrap();
//! ```

pub mod mapping;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::constraint::{AttributeValue, ConstraintAttributes};
use crate::error::ConfigError;
use crate::types::{TypeKey, TypeRef};

/// How a declared property is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    /// Direct field access.
    #[default]
    Field,
    /// Zero-argument accessor method.
    Getter,
}

/// One constraint annotation instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDeclaration {
    /// Name of the constraint definition in the catalog.
    pub constraint: String,
    /// Explicit attribute values; definition defaults fill the rest.
    pub attributes: ConstraintAttributes,
    /// Groups the constraint belongs to; empty means `Default`.
    pub groups: Vec<TypeKey>,
    /// Opaque payload classifiers.
    pub payload: Vec<TypeKey>,
    /// Message template overriding the definition's default.
    pub message: Option<String>,
}

impl ConstraintDeclaration {
    /// Declares a constraint with no explicit attributes.
    pub fn new(constraint: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
            attributes: ConstraintAttributes::new(),
            groups: Vec::new(),
            payload: Vec::new(),
            message: None,
        }
    }

    /// Sets an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name, value);
        self
    }

    /// Adds a group.
    pub fn group(mut self, group: impl Into<TypeKey>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Adds a payload classifier.
    pub fn payload(mut self, payload: impl Into<TypeKey>) -> Self {
        self.payload.push(payload.into());
        self
    }

    /// Overrides the message template.
    pub fn message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(template.into());
        self
    }
}

/// An annotation found on a type or property.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// A single constraint.
    Constraint(ConstraintDeclaration),
    /// A multi-valued container holding several constraints of one kind.
    List {
        /// Name of the container annotation.
        container: String,
        /// The contained constraints.
        values: Vec<ConstraintDeclaration>,
    },
}

impl Annotation {
    /// The constraint declarations carried by this annotation.
    pub fn declarations(&self) -> &[ConstraintDeclaration] {
        match self {
            Annotation::Constraint(decl) => std::slice::from_ref(decl),
            Annotation::List { values, .. } => values,
        }
    }
}

impl From<ConstraintDeclaration> for Annotation {
    fn from(decl: ConstraintDeclaration) -> Self {
        Annotation::Constraint(decl)
    }
}

/// Declarations attached to one property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDeclaration {
    /// The property name.
    pub name: String,
    /// Field or getter.
    pub access: AccessKind,
    /// The declared property type.
    pub declared_type: TypeRef,
    /// Constraint annotations.
    pub annotations: Vec<Annotation>,
    /// Whether the property value is cascaded into.
    pub cascade: bool,
}

impl PropertyDeclaration {
    /// Declares a field.
    pub fn field(name: impl Into<String>, declared_type: impl Into<TypeRef>) -> Self {
        Self::with_access(name, declared_type, AccessKind::Field)
    }

    /// Declares an accessor method.
    pub fn getter(name: impl Into<String>, declared_type: impl Into<TypeRef>) -> Self {
        Self::with_access(name, declared_type, AccessKind::Getter)
    }

    fn with_access(
        name: impl Into<String>,
        declared_type: impl Into<TypeRef>,
        access: AccessKind,
    ) -> Self {
        Self {
            name: name.into(),
            access,
            declared_type: declared_type.into(),
            annotations: Vec::new(),
            cascade: false,
        }
    }

    /// Adds a constraint.
    pub fn constraint(mut self, decl: ConstraintDeclaration) -> Self {
        self.annotations.push(Annotation::Constraint(decl));
        self
    }

    /// Adds a multi-valued container annotation.
    pub fn constraint_list(
        mut self,
        container: impl Into<String>,
        values: Vec<ConstraintDeclaration>,
    ) -> Self {
        self.annotations.push(Annotation::List {
            container: container.into(),
            values,
        });
        self
    }

    /// Marks the property for cascaded validation.
    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }
}

/// Declarations attached to one type.
#[derive(Debug, Clone, PartialEq)]
pub struct BeanDeclaration {
    /// The declared type.
    pub bean_type: TypeKey,
    /// Optional string identifier the metadata can be looked up by.
    pub id: Option<String>,
    /// Class-level constraint annotations.
    pub class_annotations: Vec<Annotation>,
    /// Property declarations.
    pub properties: Vec<PropertyDeclaration>,
    /// On a class: the redefined default group sequence.
    /// On an interface: the group sequence the interface stands for.
    pub group_sequence: Option<Vec<TypeKey>>,
    /// When set on an external declaration, annotation-sourced declarations
    /// of the same type are ignored.
    pub ignore_annotations: bool,
}

impl BeanDeclaration {
    /// Starts an empty declaration for a type.
    pub fn new(bean_type: impl Into<TypeKey>) -> Self {
        Self {
            bean_type: bean_type.into(),
            id: None,
            class_annotations: Vec::new(),
            properties: Vec::new(),
            group_sequence: None,
            ignore_annotations: false,
        }
    }

    /// Sets the string identifier.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a class-level constraint.
    pub fn constraint(mut self, decl: ConstraintDeclaration) -> Self {
        self.class_annotations.push(Annotation::Constraint(decl));
        self
    }

    /// Adds a class-level multi-valued container annotation.
    pub fn constraint_list(
        mut self,
        container: impl Into<String>,
        values: Vec<ConstraintDeclaration>,
    ) -> Self {
        self.class_annotations.push(Annotation::List {
            container: container.into(),
            values,
        });
        self
    }

    /// Adds a property.
    pub fn property(mut self, property: PropertyDeclaration) -> Self {
        self.properties.push(property);
        self
    }

    /// Declares a group sequence.
    pub fn group_sequence<I, K>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<TypeKey>,
    {
        self.group_sequence = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Makes this declaration replace annotation-sourced ones.
    pub fn ignore_annotations(mut self) -> Self {
        self.ignore_annotations = true;
        self
    }
}

/// Supplies declarations for types.
///
/// Implementations must be idempotent: asking twice for the same type yields
/// the same declaration.
pub trait DeclarationSource: Send + Sync {
    /// The declaration of a type, if this source has one.
    fn bean_declaration(&self, bean_type: &TypeKey) -> Option<BeanDeclaration>;

    /// The type declared with the given id, if any.
    fn type_for_id(&self, _id: &str) -> Option<TypeKey> {
        None
    }
}

/// An in-memory, thread-safe [`DeclarationSource`].
#[derive(Debug, Default)]
pub struct DeclarationRegistry {
    beans: RwLock<IndexMap<TypeKey, BeanDeclaration>>,
}

impl DeclarationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateDeclaration` if the type is already declared.
    pub fn declare(&self, declaration: BeanDeclaration) -> Result<(), ConfigError> {
        let mut beans = self.beans.write();
        if beans.contains_key(&declaration.bean_type) {
            return Err(ConfigError::DuplicateDeclaration(declaration.bean_type));
        }
        beans.insert(declaration.bean_type.clone(), declaration);
        Ok(())
    }

    /// Adds a declaration and returns self for chaining.
    pub fn with(self, declaration: BeanDeclaration) -> Result<Self, ConfigError> {
        self.declare(declaration)?;
        Ok(self)
    }

    /// Number of declared types.
    pub fn len(&self) -> usize {
        self.beans.read().len()
    }

    /// Returns true if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.beans.read().is_empty()
    }

    /// The declared types, in declaration order.
    pub fn declared_types(&self) -> Vec<TypeKey> {
        self.beans.read().keys().cloned().collect()
    }
}

impl DeclarationSource for DeclarationRegistry {
    fn bean_declaration(&self, bean_type: &TypeKey) -> Option<BeanDeclaration> {
        self.beans.read().get(bean_type).cloned()
    }

    fn type_for_id(&self, id: &str) -> Option<TypeKey> {
        self.beans
            .read()
            .values()
            .find(|decl| decl.id.as_deref() == Some(id))
            .map(|decl| decl.bean_type.clone())
    }
}
