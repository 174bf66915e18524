//! The per-validator metadata cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::builder::MetaBeanBuilder;
use super::MetaBean;
use crate::constraint::ConstraintCatalog;
use crate::declaration::DeclarationSource;
use crate::error::ConfigError;
use crate::group::GroupSequenceSource;
use crate::types::{TypeKey, TypeSystem};

type MetaBeanMap = Arc<RwLock<HashMap<TypeKey, Arc<MetaBean>>>>;

/// Builds [`MetaBean`]s on first request and shares them afterwards.
///
/// # Thread Safety
///
/// The cache uses `Arc<RwLock<...>>` internally:
/// - Lookups of cached metadata take a read lock only
/// - Metadata is built outside of any lock; when two threads build the same
///   type concurrently the first insert wins and both get the same `Arc`
/// - Adding a mapping invalidates everything built so far
pub struct MetaBeanCache {
    types: Arc<TypeSystem>,
    catalog: Arc<ConstraintCatalog>,
    annotations: Vec<Arc<dyn DeclarationSource>>,
    mappings: RwLock<Vec<Arc<dyn DeclarationSource>>>,
    beans: MetaBeanMap,
}

impl MetaBeanCache {
    /// Creates an empty cache.
    ///
    /// `annotations` are consulted before `mappings` at every hierarchy level.
    pub fn new(
        types: Arc<TypeSystem>,
        catalog: Arc<ConstraintCatalog>,
        annotations: Vec<Arc<dyn DeclarationSource>>,
        mappings: Vec<Arc<dyn DeclarationSource>>,
    ) -> Self {
        Self {
            types,
            catalog,
            annotations,
            mappings: RwLock::new(mappings),
            beans: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The type system metadata is built against.
    pub fn types(&self) -> &TypeSystem {
        &self.types
    }

    /// The constraint catalog.
    pub fn catalog(&self) -> &ConstraintCatalog {
        &self.catalog
    }

    /// Returns the metadata of a type, building it on first use.
    ///
    /// # Errors
    ///
    /// Propagates any configuration error found while building; failed builds
    /// are not cached.
    pub fn get(&self, bean_type: &TypeKey) -> Result<Arc<MetaBean>, ConfigError> {
        if let Some(meta) = self.beans.read().get(bean_type) {
            return Ok(Arc::clone(meta));
        }

        let mappings = self.mappings.read().clone();
        let built = MetaBeanBuilder {
            types: &self.types,
            catalog: &self.catalog,
            annotations: &self.annotations,
            mappings: &mappings,
        }
        .build(bean_type)?;

        let mut beans = self.beans.write();
        let meta = beans
            .entry(bean_type.clone())
            .or_insert_with(|| Arc::new(built));
        Ok(Arc::clone(meta))
    }

    /// Returns the metadata of the type declared with `id`.
    ///
    /// Mappings are searched before annotation-sourced declarations.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownBeanId` if no declaration carries the id.
    pub fn get_by_id(&self, id: &str) -> Result<Arc<MetaBean>, ConfigError> {
        let bean_type = self
            .mappings
            .read()
            .iter()
            .chain(self.annotations.iter())
            .find_map(|source| source.type_for_id(id))
            .ok_or_else(|| ConfigError::UnknownBeanId(id.to_string()))?;
        self.get(&bean_type)
    }

    /// Adds an external mapping and drops all cached metadata.
    pub fn add_mapping(&self, source: Arc<dyn DeclarationSource>) {
        self.mappings.write().push(source);
        self.invalidate();
    }

    /// Drops all cached metadata.
    pub fn invalidate(&self) {
        let mut beans = self.beans.write();
        debug!(cached = beans.len(), "invalidating bean metadata");
        beans.clear();
    }

    /// Number of types with cached metadata.
    pub fn len(&self) -> usize {
        self.beans.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.beans.read().is_empty()
    }

    /// Returns true if metadata for the type is cached.
    pub fn contains(&self, bean_type: &TypeKey) -> bool {
        self.beans.read().contains_key(bean_type)
    }
}

impl GroupSequenceSource for MetaBeanCache {
    fn group_sequence(&self, group: &TypeKey) -> Result<Option<Vec<TypeKey>>, ConfigError> {
        let mappings = self.mappings.read().clone();
        let builder = MetaBeanBuilder {
            types: &self.types,
            catalog: &self.catalog,
            annotations: &self.annotations,
            mappings: &mappings,
        };
        Ok(builder
            .declarations_for(group)
            .into_iter()
            .rev()
            .find_map(|decl| decl.group_sequence))
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<MetaBeanCache>();
    assert_sync::<MetaBeanCache>();
};
