//! The validation facade.
//!
//! A [`Validator`] bundles a type system, a constraint catalog, declaration
//! sources and the pluggable collaborators (traversable resolver, message
//! interpolator). It is `Send + Sync`; metadata is built lazily on first use
//! and shared by every call.
//!
//! # Example
//!
//! ```rust
//! use beanval::declaration::{BeanDeclaration, ConstraintDeclaration, DeclarationRegistry, PropertyDeclaration};
//! use beanval::types::{TypeInfo, TypeSystem};
//! use beanval::value::DynBean;
//! use beanval::ValidatorBuilder;
//!
//! let mut types = TypeSystem::new();
//! types.register(TypeInfo::class("Address")).unwrap();
//!
//! let declarations = DeclarationRegistry::new()
//!     .with(BeanDeclaration::new("Address").property(
//!         PropertyDeclaration::field("zip", "String")
//!             .constraint(ConstraintDeclaration::new("NotNull")),
//!     ))
//!     .unwrap();
//!
//! let validator = ValidatorBuilder::new()
//!     .with_type_system(types)
//!     .with_declarations(declarations)
//!     .build();
//!
//! let address = DynBean::new("Address").with("zip", None::<String>).into_value();
//! let results = validator.validate(&address, &[]).unwrap();
//!
//! assert_eq!(results.len(), 1);
//! assert_eq!(results.violations()[0].to_string(), "zip: may not be null");
//! ```

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::constraint::ConstraintCatalog;
use crate::context::{Services, ValidationContext};
use crate::declaration::DeclarationSource;
use crate::engine;
use crate::error::{ConfigError, ValidationError};
use crate::group::{Group, GroupResolver, Groups};
use crate::interpolation::{DefaultMessageInterpolator, MessageInterpolator};
use crate::listener::{ValidationListener, ValidationResults};
use crate::metadata::{BeanDescriptor, MetaBean, MetaBeanCache};
use crate::path::PropertyPath;
use crate::traversable::{DefaultTraversableResolver, TraversableResolver};
use crate::types::{TypeKey, TypeSystem};
use crate::value::Value;

/// Behavior switches of a [`Validator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Validate maps as beans whose properties are the string keys, instead
    /// of cascading into their values.
    pub treat_maps_like_beans: bool,
}

/// Configures and builds a [`Validator`].
pub struct ValidatorBuilder {
    types: TypeSystem,
    catalog: ConstraintCatalog,
    declarations: Vec<Arc<dyn DeclarationSource>>,
    mappings: Vec<Arc<dyn DeclarationSource>>,
    resolver: Arc<dyn TraversableResolver>,
    interpolator: Arc<dyn MessageInterpolator>,
    config: ValidatorConfig,
}

impl ValidatorBuilder {
    /// Starts from the built-in types and constraints, the allow-all
    /// traversable resolver and the default message bundle.
    pub fn new() -> Self {
        Self {
            types: TypeSystem::new(),
            catalog: ConstraintCatalog::with_builtins(),
            declarations: Vec::new(),
            mappings: Vec::new(),
            resolver: Arc::new(DefaultTraversableResolver),
            interpolator: Arc::new(DefaultMessageInterpolator::new()),
            config: ValidatorConfig::default(),
        }
    }

    /// Sets the type system.
    pub fn with_type_system(mut self, types: TypeSystem) -> Self {
        self.types = types;
        self
    }

    /// Sets the constraint catalog.
    pub fn with_catalog(mut self, catalog: ConstraintCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Adds an annotation-style declaration source.
    pub fn with_declarations(mut self, source: impl DeclarationSource + 'static) -> Self {
        self.declarations.push(Arc::new(source));
        self
    }

    /// Adds an external mapping, applied after annotation-style declarations.
    pub fn with_mapping(mut self, source: impl DeclarationSource + 'static) -> Self {
        self.mappings.push(Arc::new(source));
        self
    }

    /// Sets the traversable resolver.
    pub fn with_traversable_resolver(mut self, resolver: impl TraversableResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Sets the message interpolator.
    pub fn with_message_interpolator(
        mut self,
        interpolator: impl MessageInterpolator + 'static,
    ) -> Self {
        self.interpolator = Arc::new(interpolator);
        self
    }

    /// Sets [`ValidatorConfig::treat_maps_like_beans`].
    pub fn treat_maps_like_beans(mut self, enabled: bool) -> Self {
        self.config.treat_maps_like_beans = enabled;
        self
    }

    /// Sets the whole configuration.
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the validator.
    ///
    /// Building never fails: metadata is built, and configuration errors are
    /// reported, on first use of each type.
    pub fn build(self) -> Validator {
        Validator {
            cache: Arc::new(MetaBeanCache::new(
                Arc::new(self.types),
                Arc::new(self.catalog),
                self.declarations,
                self.mappings,
            )),
            resolver: self.resolver,
            interpolator: self.interpolator,
            config: self.config,
        }
    }
}

impl Default for ValidatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates object graphs.
///
/// # Thread Safety
///
/// `Validator` is `Send + Sync`. Each call gets its own traversal context;
/// only the metadata cache is shared.
#[derive(Clone)]
pub struct Validator {
    cache: Arc<MetaBeanCache>,
    resolver: Arc<dyn TraversableResolver>,
    interpolator: Arc<dyn MessageInterpolator>,
    config: ValidatorConfig,
}

impl Validator {
    /// Starts a [`ValidatorBuilder`].
    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::new()
    }

    /// The configuration.
    pub fn config(&self) -> ValidatorConfig {
        self.config
    }

    /// The type system.
    pub fn types(&self) -> &TypeSystem {
        self.cache.types()
    }

    /// Validates `root` and everything reachable through cascaded properties.
    ///
    /// Metadata comes from the root's runtime type; a root collection is
    /// validated element by element. An empty `groups` slice means `Default`.
    ///
    /// # Errors
    ///
    /// Fails on a null root, on configuration errors in any metadata the
    /// traversal needs, and on failures of accessors, resolvers or
    /// validators. Violations are never errors.
    pub fn validate(&self, root: &Value, groups: &[Group]) -> Result<ValidationResults, ValidationError> {
        let mut results = ValidationResults::new();
        self.validate_with_listener(root, groups, &mut results)?;
        Ok(results)
    }

    /// Like [`validate`](Self::validate), reporting into `listener`.
    pub fn validate_with_listener(
        &self,
        root: &Value,
        groups: &[Group],
        listener: &mut dyn ValidationListener,
    ) -> Result<(), ValidationError> {
        let meta = match root {
            Value::Null => return Err(ValidationError::NullRoot),
            Value::List(_) | Value::Set(_) | Value::Array(_) => None,
            Value::Map(_) if !self.config.treat_maps_like_beans => None,
            other => Some(self.cache.get(&self.types().runtime_type(other))?),
        };
        self.run(root, meta, groups, listener)
    }

    /// Validates `root` against the metadata of `bean_type` instead of its
    /// runtime type.
    pub fn validate_as(
        &self,
        root: &Value,
        bean_type: impl Into<TypeKey>,
        groups: &[Group],
    ) -> Result<ValidationResults, ValidationError> {
        if root.is_null() {
            return Err(ValidationError::NullRoot);
        }
        let meta = self.cache.get(&bean_type.into())?;
        let mut results = ValidationResults::new();
        self.run(root, Some(meta), groups, &mut results)?;
        Ok(results)
    }

    /// Validates `root` against the metadata of the type declared with `id`.
    pub fn validate_by_id(
        &self,
        root: &Value,
        id: &str,
        groups: &[Group],
    ) -> Result<ValidationResults, ValidationError> {
        if root.is_null() {
            return Err(ValidationError::NullRoot);
        }
        let meta = self.cache.get_by_id(id)?;
        let mut results = ValidationResults::new();
        self.run(root, Some(meta), groups, &mut results)?;
        Ok(results)
    }

    /// Validates only the constraints of the property at `path`, e.g.
    /// `addresses[2].zip`. Nothing is cascaded into.
    ///
    /// A null value on the way to the property yields no violations. An
    /// index or key on the last node is ignored.
    ///
    /// # Errors
    ///
    /// Fails on a malformed path and on names that are not validated
    /// properties, besides the errors of [`validate`](Self::validate).
    pub fn validate_property(
        &self,
        root: &Value,
        path: &str,
        groups: &[Group],
    ) -> Result<ValidationResults, ValidationError> {
        if root.is_null() {
            return Err(ValidationError::NullRoot);
        }
        let path = PropertyPath::parse(path)?;
        let meta = self.cache.get(&self.types().runtime_type(root))?;
        let groups = self.resolve_groups(groups)?;

        let mut results = ValidationResults::new();
        let mut ctx = self.context(&mut results);
        ctx.set_root_type(meta.bean_type().clone());
        engine::validate_property(&mut ctx, root, meta, &path, &groups)?;
        Ok(results)
    }

    /// Validates `value` as if it were the value of `property` on a
    /// `bean_type` instance.
    pub fn validate_value(
        &self,
        bean_type: impl Into<TypeKey>,
        property: &str,
        value: Value,
        groups: &[Group],
    ) -> Result<ValidationResults, ValidationError> {
        let meta = self.cache.get(&bean_type.into())?;
        let groups = self.resolve_groups(groups)?;

        let mut results = ValidationResults::new();
        let mut ctx = self.context(&mut results);
        ctx.set_root_type(meta.bean_type().clone());
        engine::validate_property_value(&mut ctx, meta, property, value, &groups)?;
        Ok(results)
    }

    /// Validates several roots in parallel. Results keep the input order.
    pub fn validate_batch(
        &self,
        roots: &[Value],
        groups: &[Group],
    ) -> Vec<Result<ValidationResults, ValidationError>> {
        debug!(roots = roots.len(), "validating batch");
        roots
            .par_iter()
            .map(|root| self.validate(root, groups))
            .collect()
    }

    /// Returns the metadata of a type.
    pub fn meta_bean(&self, bean_type: impl Into<TypeKey>) -> Result<Arc<MetaBean>, ConfigError> {
        self.cache.get(&bean_type.into())
    }

    /// Returns the serializable description of a type's metadata.
    pub fn describe(&self, bean_type: impl Into<TypeKey>) -> Result<BeanDescriptor, ConfigError> {
        let meta = self.meta_bean(bean_type)?;
        Ok(meta.descriptor().cloned().unwrap_or_else(|| meta.describe()))
    }

    /// Adds an external mapping. Metadata built so far is discarded.
    pub fn add_mapping(&self, source: impl DeclarationSource + 'static) {
        self.cache.add_mapping(Arc::new(source));
    }

    fn run(
        &self,
        root: &Value,
        meta: Option<Arc<MetaBean>>,
        groups: &[Group],
        listener: &mut dyn ValidationListener,
    ) -> Result<(), ValidationError> {
        let groups = self.resolve_groups(groups)?;
        let mut ctx = self.context(listener);
        ctx.set_root_type(match &meta {
            Some(meta) => meta.bean_type().clone(),
            None => self.types().runtime_type(root),
        });
        engine::validate_groups(&mut ctx, root, meta.as_ref(), &groups)
    }

    fn resolve_groups(&self, groups: &[Group]) -> Result<Groups, ConfigError> {
        GroupResolver::new(self.cache.types(), self.cache.as_ref()).resolve(groups)
    }

    fn context<'a>(&'a self, listener: &'a mut dyn ValidationListener) -> ValidationContext<'a> {
        ValidationContext::new(
            Services {
                cache: &self.cache,
                resolver: self.resolver.as_ref(),
                interpolator: self.interpolator.as_ref(),
                treat_maps_like_beans: self.config.treat_maps_like_beans,
            },
            listener,
        )
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<Validator>();
    assert_sync::<Validator>();
};
