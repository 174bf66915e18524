//! # Beanval
//!
//! A constraint validation engine for dynamic object graphs.
//!
//! ## Overview
//!
//! Beanval validates graphs of [`Value`]s against constraints declared per
//! type and per property. Validation walks the graph, cascading into
//! properties marked for it, and reports every violation it finds rather
//! than stopping at the first. Constraints can be scoped to groups, groups
//! can be ordered into fail-fast sequences, and constraints can be composed
//! of other constraints.
//!
//! ## Core Types
//!
//! - [`Validator`] / [`ValidatorBuilder`]: the entry point
//! - [`Value`] and the [`Bean`] trait: the validated object model
//! - [`TypeSystem`](types::TypeSystem): the type hierarchy constraints are
//!   resolved against
//! - [`DeclarationRegistry`](declaration::DeclarationRegistry) and
//!   [`MappingDocument`](declaration::mapping::MappingDocument): where
//!   constraint declarations come from
//! - [`ConstraintViolation`]: one failed constraint with its [`PropertyPath`]
//!
//! ## Example
//!
//! ```rust
//! use beanval::declaration::{BeanDeclaration, ConstraintDeclaration, DeclarationRegistry, PropertyDeclaration};
//! use beanval::types::{TypeInfo, TypeRef, TypeSystem};
//! use beanval::value::DynBean;
//! use beanval::{Value, ValidatorBuilder};
//!
//! let mut types = TypeSystem::new();
//! types.register(TypeInfo::class("Address")).unwrap();
//! types.register(TypeInfo::class("Person")).unwrap();
//!
//! let declarations = DeclarationRegistry::new()
//!     .with(BeanDeclaration::new("Address").property(
//!         PropertyDeclaration::field("zip", "String")
//!             .constraint(ConstraintDeclaration::new("Pattern").attr("regexp", "[0-9]{5}")),
//!     ))
//!     .unwrap()
//!     .with(BeanDeclaration::new("Person").property(
//!         PropertyDeclaration::field("addresses", TypeRef::list_of("Address".into())).cascade(),
//!     ))
//!     .unwrap();
//!
//! let validator = ValidatorBuilder::new()
//!     .with_type_system(types)
//!     .with_declarations(declarations)
//!     .build();
//!
//! let person = DynBean::new("Person")
//!     .with(
//!         "addresses",
//!         Value::List(vec![
//!             DynBean::new("Address").with("zip", "12345").into_value(),
//!             DynBean::new("Address").with("zip", "oops").into_value(),
//!         ]),
//!     )
//!     .into_value();
//!
//! let results = validator.validate(&person, &[]).unwrap();
//! assert_eq!(results.len(), 1);
//! assert_eq!(results.violations()[0].path.to_string(), "addresses[1].zip");
//! ```

pub mod access;
pub mod constraint;
pub mod context;
pub mod declaration;
mod engine;
pub mod error;
pub mod group;
pub mod interpolation;
pub mod listener;
pub mod metadata;
pub mod path;
pub mod traversable;
pub mod types;
pub mod validator;
pub mod value;

pub use error::{
    AccessError, ConfigError, ConstraintViolation, ConstraintViolations, PredicateError,
    ValidationError,
};
pub use group::Group;
pub use listener::{ValidationListener, ValidationResults};
pub use path::{PathNode, PropertyPath};
pub use validator::{Validator, ValidatorBuilder, ValidatorConfig};
pub use value::{Bean, BeanRef, DynBean, Value};

/// Type alias for validation outcomes using [`ConstraintViolations`].
pub type ValidationResult<T> = stillwater::Validation<T, ConstraintViolations>;
