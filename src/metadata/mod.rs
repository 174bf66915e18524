//! The validation metadata model.
//!
//! A [`MetaBean`] records, for one type, its validated properties
//! ([`MetaProperty`]), its class-level constraints and a typed feature map.
//! Metadata is built by [`builder`] from declarations and cached by
//! [`MetaBeanCache`]; once built it is shared read-only behind an `Arc`.

mod builder;
mod cache;
mod descriptor;

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;

pub use cache::MetaBeanCache;
pub use descriptor::{BeanDescriptor, ConstraintDescriptor, PropertyDescriptor};

use crate::access::AccessStrategy;
use crate::constraint::ConstraintNode;
use crate::group::Group;
use crate::types::{TypeKey, TypeRef};

/// A typed key into a [`Features`] map.
pub struct FeatureKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FeatureKey<T> {
    /// Creates a key.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// The key's name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for FeatureKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FeatureKey<T> {}

impl<T> fmt::Debug for FeatureKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureKey({})", self.name)
    }
}

/// The redefined default group sequence of a class.
pub const GROUP_SEQUENCE: FeatureKey<Vec<Group>> = FeatureKey::new("group-sequence");

/// The serializable description computed when the metadata was built.
pub const DESCRIPTOR: FeatureKey<BeanDescriptor> = FeatureKey::new("descriptor");

/// Extensible typed annotations attached to metadata.
#[derive(Default, Clone)]
pub struct Features {
    values: IndexMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

impl Features {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a feature.
    pub fn get<T: Any + Send + Sync>(&self, key: &FeatureKey<T>) -> Option<&T> {
        self.values.get(key.name)?.downcast_ref::<T>()
    }

    /// Sets a feature, replacing any previous value.
    pub fn put<T: Any + Send + Sync>(&mut self, key: &FeatureKey<T>, value: T) {
        self.values.insert(key.name, Arc::new(value));
    }

    /// Returns true if the feature is set.
    pub fn contains<T>(&self, key: &FeatureKey<T>) -> bool {
        self.values.contains_key(key.name)
    }

    /// Names of the features that are set.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }
}

impl fmt::Debug for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Which metadata applies to a cascaded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeTarget {
    /// The declared element type is concrete; its metadata applies.
    Static(TypeKey),
    /// The declared element type is open (interface, abstract, `Object` or
    /// missing); metadata is looked up from each value's runtime type.
    Dynamic,
}

/// One validated property of a type.
#[derive(Debug)]
pub struct MetaProperty {
    name: String,
    declared_type: TypeRef,
    constraints: Vec<Arc<ConstraintNode>>,
    cascade: Option<CascadeTarget>,
    cascade_accesses: Vec<AccessStrategy>,
    features: Features,
}

impl MetaProperty {
    /// Creates a property with no constraints.
    pub fn new(name: impl Into<String>, declared_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            declared_type,
            constraints: Vec::new(),
            cascade: None,
            cascade_accesses: Vec::new(),
            features: Features::new(),
        }
    }

    /// The property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    pub fn declared_type(&self) -> &TypeRef {
        &self.declared_type
    }

    /// Constraints on this property.
    pub fn constraints(&self) -> &[Arc<ConstraintNode>] {
        &self.constraints
    }

    /// The cascade target, if the property is cascaded into.
    pub fn cascade(&self) -> Option<&CascadeTarget> {
        self.cascade.as_ref()
    }

    /// The accesses cascading reads the related value through.
    pub fn cascade_accesses(&self) -> &[AccessStrategy] {
        &self.cascade_accesses
    }

    /// The access used to read this property outside of a constraint: the
    /// first cascade access, else the first constraint's, else the field.
    pub fn primary_access(&self) -> AccessStrategy {
        self.cascade_accesses
            .first()
            .or_else(|| self.constraints.iter().find_map(|c| c.access()))
            .cloned()
            .unwrap_or_else(|| AccessStrategy::field(&self.name, self.declared_type.clone()))
    }

    /// The feature map.
    pub fn features(&self) -> &Features {
        &self.features
    }

    /// The feature map, for population during construction.
    pub fn features_mut(&mut self) -> &mut Features {
        &mut self.features
    }

    pub(crate) fn set_declared_type(&mut self, declared_type: TypeRef) {
        self.declared_type = declared_type;
    }

    pub(crate) fn add_constraint(&mut self, node: ConstraintNode) {
        self.constraints.push(Arc::new(node));
    }

    pub(crate) fn set_cascade(&mut self, target: CascadeTarget, access: AccessStrategy) {
        self.cascade = Some(target);
        if !self.cascade_accesses.contains(&access) {
            self.cascade_accesses.push(access);
        }
    }
}

/// Validation metadata of one type.
#[derive(Debug)]
pub struct MetaBean {
    bean_type: TypeKey,
    id: Option<String>,
    properties: IndexMap<String, MetaProperty>,
    constraints: Vec<Arc<ConstraintNode>>,
    features: Features,
}

impl MetaBean {
    /// Creates empty metadata for a type.
    pub fn new(bean_type: impl Into<TypeKey>) -> Self {
        Self {
            bean_type: bean_type.into(),
            id: None,
            properties: IndexMap::new(),
            constraints: Vec::new(),
            features: Features::new(),
        }
    }

    /// The described type.
    pub fn bean_type(&self) -> &TypeKey {
        &self.bean_type
    }

    /// The declared id.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Looks up a property.
    pub fn property(&self, name: &str) -> Option<&MetaProperty> {
        self.properties.get(name)
    }

    /// Adds or replaces a property.
    pub fn put_property(&mut self, property: MetaProperty) {
        self.properties.insert(property.name.clone(), property);
    }

    /// All properties.
    pub fn properties(&self) -> impl Iterator<Item = &MetaProperty> {
        self.properties.values()
    }

    /// Class-level constraints.
    pub fn constraints(&self) -> &[Arc<ConstraintNode>] {
        &self.constraints
    }

    /// The feature map.
    pub fn features(&self) -> &Features {
        &self.features
    }

    /// The feature map, for population during construction.
    pub fn features_mut(&mut self) -> &mut Features {
        &mut self.features
    }

    /// The redefined default group sequence, if any.
    pub fn group_sequence(&self) -> Option<&[Group]> {
        self.features.get(&GROUP_SEQUENCE).map(Vec::as_slice)
    }

    /// The description computed at build time.
    pub fn descriptor(&self) -> Option<&BeanDescriptor> {
        self.features.get(&DESCRIPTOR)
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    pub(crate) fn property_mut(&mut self, name: &str) -> Option<&mut MetaProperty> {
        self.properties.get_mut(name)
    }

    pub(crate) fn add_constraint(&mut self, node: ConstraintNode) {
        self.constraints.push(Arc::new(node));
    }

    /// Builds the serializable description of the current state.
    pub(crate) fn describe(&self) -> BeanDescriptor {
        BeanDescriptor {
            bean_type: self.bean_type.clone(),
            id: self.id.clone(),
            constraints: self
                .constraints
                .iter()
                .map(|c| c.descriptor().as_ref().clone())
                .collect(),
            properties: self
                .properties
                .values()
                .map(|p| {
                    let mut d = PropertyDescriptor::new(&p.name, &p.declared_type);
                    d.cascaded = p.cascade.is_some();
                    d.constraints = p
                        .constraints
                        .iter()
                        .map(|c| c.descriptor().as_ref().clone())
                        .collect();
                    d
                })
                .collect(),
            group_sequence: self
                .group_sequence()
                .map(|seq| seq.iter().map(|g| g.key().clone()).collect()),
        }
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<MetaBean>();
    assert_sync::<MetaBean>();
};
