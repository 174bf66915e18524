//! Constraint definitions, validator predicates and the constraint catalog.
//!
//! A constraint is described once by a [`ConstraintDefinition`]: its
//! validator candidates (one per supported type), the constraints it is
//! composed of, and its default message and attributes. Definitions live in a
//! [`ConstraintCatalog`]. At metadata-build time each declaration is turned
//! into an immutable [`ConstraintNode`] holding the most specific validator
//! for the validated type.
//!
//! # Example
//!
//! ```rust
//! use beanval::constraint::{ConstraintCatalog, ConstraintDefinition, ValidatorCandidate};
//! use beanval::value::Value;
//!
//! let mut catalog = ConstraintCatalog::with_builtins();
//! catalog
//!     .register(
//!         ConstraintDefinition::new("Even")
//!             .message("must be even")
//!             .validator(ValidatorCandidate::from_fn("EvenValidator", "Integer", |value, _| {
//!                 Ok(value.as_i64().map_or(true, |i| i % 2 == 0))
//!             })),
//!     )
//!     .unwrap();
//!
//! assert!(catalog.get("Even").is_some());
//! ```

mod attributes;
pub mod builtin;
mod node;
mod resolution;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

pub use attributes::{AttributeValue, ConstraintAttributes};
pub use node::ConstraintNode;
pub use resolution::resolve_validator;

use crate::declaration::ConstraintDeclaration;
use crate::error::{ConfigError, PredicateError};
use crate::types::TypeKey;
use crate::value::Value;

/// An executable constraint check.
///
/// Validators are created from a [`ValidatorCandidate`], initialized once
/// with the declaration's attributes, and then shared read-only across
/// validation runs.
///
/// By convention `Null` is valid for every validator except the dedicated
/// not-null family.
pub trait ConstraintValidator: Send + Sync {
    /// Reads the declaration's attributes.
    ///
    /// Invalid attributes are reported as configuration errors.
    fn initialize(&mut self, _attributes: &ConstraintAttributes) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Checks a value.
    ///
    /// Returning `Ok(false)` records a violation. An `Err` is a broken
    /// validator and aborts the validation call.
    fn is_valid(
        &self,
        value: &Value,
        context: &mut ConstraintValidatorContext,
    ) -> Result<bool, PredicateError>;
}

/// A violation added by a validator in place of, or next to, the default one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomViolation {
    /// Message template.
    pub template: String,
    /// Sub-property the violation is reported on, if any.
    pub property: Option<String>,
}

/// Per-call context handed to [`ConstraintValidator::is_valid`].
#[derive(Debug, Clone)]
pub struct ConstraintValidatorContext {
    default_template: String,
    default_disabled: bool,
    custom: Vec<CustomViolation>,
}

impl ConstraintValidatorContext {
    /// Creates a context whose default violation uses `default_template`.
    pub fn new(default_template: impl Into<String>) -> Self {
        Self {
            default_template: default_template.into(),
            default_disabled: false,
            custom: Vec::new(),
        }
    }

    /// The template of the default violation.
    pub fn default_message_template(&self) -> &str {
        &self.default_template
    }

    /// Suppresses the default violation.
    pub fn disable_default_violation(&mut self) {
        self.default_disabled = true;
    }

    /// Adds a violation at the validated value's path.
    pub fn add_violation(&mut self, template: impl Into<String>) {
        self.custom.push(CustomViolation {
            template: template.into(),
            property: None,
        });
    }

    /// Adds a violation on a sub-property of the validated value.
    pub fn add_property_violation(
        &mut self,
        template: impl Into<String>,
        property: impl Into<String>,
    ) {
        self.custom.push(CustomViolation {
            template: template.into(),
            property: Some(property.into()),
        });
    }

    /// Returns true unless the default violation was disabled.
    pub fn is_default_enabled(&self) -> bool {
        !self.default_disabled
    }

    /// Custom violations added so far.
    pub fn custom_violations(&self) -> &[CustomViolation] {
        &self.custom
    }
}

type ValidatorFactory = Arc<dyn Fn() -> Box<dyn ConstraintValidator> + Send + Sync>;

/// One validator implementation of a constraint, and the type it supports.
#[derive(Clone)]
pub struct ValidatorCandidate {
    name: String,
    supported_type: TypeKey,
    factory: ValidatorFactory,
}

impl ValidatorCandidate {
    /// Creates a candidate from a factory producing fresh validators.
    pub fn new<V, F>(name: impl Into<String>, supported_type: impl Into<TypeKey>, factory: F) -> Self
    where
        V: ConstraintValidator + 'static,
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            supported_type: supported_type.into(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn ConstraintValidator>),
        }
    }

    /// Creates a candidate for a default-constructible validator.
    pub fn of<V>(supported_type: impl Into<TypeKey>) -> Self
    where
        V: ConstraintValidator + Default + 'static,
    {
        let name = std::any::type_name::<V>()
            .rsplit("::")
            .next()
            .unwrap_or("validator")
            .to_string();
        Self::new(name, supported_type, V::default)
    }

    /// Creates a candidate from a predicate closure. The closure receives the
    /// value and the declaration's attributes.
    pub fn from_fn<F>(name: impl Into<String>, supported_type: impl Into<TypeKey>, predicate: F) -> Self
    where
        F: Fn(&Value, &ConstraintAttributes) -> Result<bool, PredicateError>
            + Send
            + Sync
            + 'static,
    {
        let predicate = Arc::new(predicate);
        Self::new(name, supported_type, move || FnValidator {
            predicate: predicate.clone(),
            attributes: ConstraintAttributes::new(),
        })
    }

    /// The validator's name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type this validator accepts.
    pub fn supported_type(&self) -> &TypeKey {
        &self.supported_type
    }

    /// Creates a fresh, uninitialized validator.
    pub fn instantiate(&self) -> Box<dyn ConstraintValidator> {
        (self.factory)()
    }
}

impl fmt::Debug for ValidatorCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorCandidate")
            .field("name", &self.name)
            .field("supported_type", &self.supported_type)
            .finish()
    }
}

type Predicate = dyn Fn(&Value, &ConstraintAttributes) -> Result<bool, PredicateError> + Send + Sync;

struct FnValidator {
    predicate: Arc<Predicate>,
    attributes: ConstraintAttributes,
}

impl ConstraintValidator for FnValidator {
    fn initialize(&mut self, attributes: &ConstraintAttributes) -> Result<(), ConfigError> {
        self.attributes = attributes.clone();
        Ok(())
    }

    fn is_valid(
        &self,
        value: &Value,
        _context: &mut ConstraintValidatorContext,
    ) -> Result<bool, PredicateError> {
        (self.predicate)(value, &self.attributes)
    }
}

/// Forwards an attribute of a composite constraint to one of its composing
/// constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeOverride {
    /// Attribute of the composite.
    pub attribute: String,
    /// Name of the composing constraint receiving the value.
    pub constraint: String,
    /// Position among composing constraints of that name; `None` targets all.
    pub index: Option<usize>,
    /// Attribute of the composing constraint to set.
    pub target: String,
}

/// Everything known about one constraint.
#[derive(Debug, Clone)]
pub struct ConstraintDefinition {
    /// Constraint name, as referenced by declarations.
    pub name: String,
    /// Validator implementations, one per supported type.
    pub validators: Vec<ValidatorCandidate>,
    /// Composing constraints.
    pub composed_of: Vec<ConstraintDeclaration>,
    /// Report a single violation for failing composing constraints.
    pub report_as_single_violation: bool,
    /// Message template used when a declaration does not set one.
    pub default_message: String,
    /// Attribute defaults.
    pub default_attributes: ConstraintAttributes,
    /// Attribute overrides of composing constraints.
    pub overrides: Vec<AttributeOverride>,
}

impl ConstraintDefinition {
    /// Starts a definition. The default message is `{beanval.<name>.message}`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            default_message: format!("{{beanval.{}.message}}", name),
            name,
            validators: Vec::new(),
            composed_of: Vec::new(),
            report_as_single_violation: false,
            default_attributes: ConstraintAttributes::new(),
            overrides: Vec::new(),
        }
    }

    /// Adds a validator candidate.
    pub fn validator(mut self, candidate: ValidatorCandidate) -> Self {
        self.validators.push(candidate);
        self
    }

    /// Adds a composing constraint.
    pub fn composed_of(mut self, decl: ConstraintDeclaration) -> Self {
        self.composed_of.push(decl);
        self
    }

    /// Reports failing composing constraints as one violation.
    pub fn report_as_single_violation(mut self) -> Self {
        self.report_as_single_violation = true;
        self
    }

    /// Sets the default message template.
    pub fn message(mut self, template: impl Into<String>) -> Self {
        self.default_message = template.into();
        self
    }

    /// Sets an attribute default.
    pub fn default_attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.default_attributes.insert(name, value);
        self
    }

    /// Forwards `attribute` to `target` on every composing `constraint`.
    pub fn override_attribute(
        mut self,
        attribute: impl Into<String>,
        constraint: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.overrides.push(AttributeOverride {
            attribute: attribute.into(),
            constraint: constraint.into(),
            index: None,
            target: target.into(),
        });
        self
    }

    /// Returns true if the constraint is composed of other constraints.
    pub fn is_composite(&self) -> bool {
        !self.composed_of.is_empty()
    }

    /// Applies the overrides to a composing declaration.
    ///
    /// `position` is the declaration's position among composing constraints
    /// with the same name.
    pub(crate) fn apply_overrides(
        &self,
        composite: &ConstraintAttributes,
        composing: &mut ConstraintDeclaration,
        position: usize,
    ) {
        for o in &self.overrides {
            if o.constraint != composing.constraint || o.index.is_some_and(|i| i != position) {
                continue;
            }
            if let Some(value) = composite.get(&o.attribute) {
                composing.attributes.insert(o.target.clone(), value.clone());
            }
        }
    }
}

/// The set of known constraint definitions.
#[derive(Debug, Clone, Default)]
pub struct ConstraintCatalog {
    definitions: IndexMap<String, Arc<ConstraintDefinition>>,
}

impl ConstraintCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in constraints.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for def in builtin::definitions() {
            catalog
                .definitions
                .insert(def.name.clone(), Arc::new(def));
        }
        catalog
    }

    /// Registers a definition.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateConstraint` if the name is taken and
    /// `ConfigError::MalformedConstraint` for a definition with neither
    /// validators nor composing constraints.
    pub fn register(&mut self, definition: ConstraintDefinition) -> Result<(), ConfigError> {
        if self.definitions.contains_key(&definition.name) {
            return Err(ConfigError::DuplicateConstraint(definition.name));
        }
        if definition.validators.is_empty() && definition.composed_of.is_empty() {
            return Err(ConfigError::MalformedConstraint {
                constraint: definition.name,
                reason: "no validator and no composing constraint".to_string(),
            });
        }
        self.definitions
            .insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Registers a definition and returns self for chaining.
    pub fn with(mut self, definition: ConstraintDefinition) -> Result<Self, ConfigError> {
        self.register(definition)?;
        Ok(self)
    }

    /// Looks up a definition.
    pub fn get(&self, name: &str) -> Option<Arc<ConstraintDefinition>> {
        self.definitions.get(name).cloned()
    }

    /// Looks up a definition, failing with `ConfigError::UnknownConstraint`.
    pub fn require(&self, name: &str) -> Result<Arc<ConstraintDefinition>, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::UnknownConstraint(name.to_string()))
    }

    /// Names of all registered constraints.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}
