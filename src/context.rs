//! Per-call traversal state.
//!
//! A [`ValidationContext`] lives for exactly one validation call. It tracks
//! the bean and property under validation, the current group, the property
//! path, the set of beans already validated in the current group (cycle
//! protection), the constraint nodes already evaluated per bean, and the
//! traversable resolver's answers. Violations go straight to the call's
//! [`ValidationListener`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::trace;

use crate::access::{AccessStrategy, ElementKind};
use crate::constraint::ConstraintNode;
use crate::error::{ConstraintViolation, ValidationError};
use crate::group::{self, Group};
use crate::interpolation::{MessageContext, MessageInterpolator};
use crate::listener::ValidationListener;
use crate::metadata::{MetaBean, MetaBeanCache};
use crate::path::PropertyPath;
use crate::traversable::{TraversableRequest, TraversableResolver};
use crate::types::{TypeKey, TypeSystem};
use crate::value::{BeanId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Traversal {
    Reachable,
    Cascadable,
}

impl Traversal {
    fn operation(self) -> &'static str {
        match self {
            Traversal::Reachable => "is_reachable",
            Traversal::Cascadable => "is_cascadable",
        }
    }
}

type TraversalKey = (Option<BeanId>, String, ElementKind, Traversal);

/// The collaborators a validation call runs with.
#[derive(Clone, Copy)]
pub(crate) struct Services<'a> {
    pub(crate) cache: &'a MetaBeanCache,
    pub(crate) resolver: &'a dyn TraversableResolver,
    pub(crate) interpolator: &'a dyn MessageInterpolator,
    pub(crate) treat_maps_like_beans: bool,
}

/// State saved when entering a bean, restored when leaving it.
pub(crate) struct SavedBean {
    bean: Value,
    meta_bean: Option<Arc<MetaBean>>,
    property: Option<String>,
}

/// Traversal state of one validation call.
pub struct ValidationContext<'a> {
    services: Services<'a>,
    listener: &'a mut dyn ValidationListener,
    root_type: Option<TypeKey>,
    bean: Value,
    meta_bean: Option<Arc<MetaBean>>,
    property: Option<String>,
    value_cache: Option<(AccessStrategy, Value)>,
    value_override: Option<Value>,
    path: PropertyPath,
    group: Group,
    visited: HashSet<BeanId>,
    processed: HashSet<(BeanId, usize)>,
    traversals: HashMap<TraversalKey, bool>,
    isolated: Vec<usize>,
    violation_count: usize,
}

impl<'a> ValidationContext<'a> {
    pub(crate) fn new(services: Services<'a>, listener: &'a mut dyn ValidationListener) -> Self {
        Self {
            services,
            listener,
            root_type: None,
            bean: Value::Null,
            meta_bean: None,
            property: None,
            value_cache: None,
            value_override: None,
            path: PropertyPath::root(),
            group: Group::default_group(),
            visited: HashSet::new(),
            processed: HashSet::new(),
            traversals: HashMap::new(),
            isolated: Vec::new(),
            violation_count: 0,
        }
    }

    /// The bean currently validated.
    pub fn bean(&self) -> &Value {
        &self.bean
    }

    /// Metadata of the current bean.
    pub fn meta_bean(&self) -> Option<&Arc<MetaBean>> {
        self.meta_bean.as_ref()
    }

    /// The property currently validated.
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// Path from the root to the current element.
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    /// The group currently validated.
    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Type of the root object.
    pub fn root_type(&self) -> Option<&TypeKey> {
        self.root_type.as_ref()
    }

    /// Violations reported so far, duplicates included.
    pub fn violation_count(&self) -> usize {
        self.violation_count
    }

    pub(crate) fn types(&self) -> &'a TypeSystem {
        self.services.cache.types()
    }

    pub(crate) fn cache(&self) -> &'a MetaBeanCache {
        self.services.cache
    }

    pub(crate) fn treat_maps_like_beans(&self) -> bool {
        self.services.treat_maps_like_beans
    }

    pub(crate) fn set_root_type(&mut self, root_type: TypeKey) {
        self.root_type = Some(root_type);
    }

    pub(crate) fn set_group(&mut self, group: Group) {
        self.group = group;
    }

    pub(crate) fn set_path(&mut self, path: PropertyPath) {
        self.path = path;
    }

    pub(crate) fn path_mut(&mut self) -> &mut PropertyPath {
        &mut self.path
    }

    /// Forgets which beans were validated; each requested group walks the
    /// whole graph again.
    pub(crate) fn reset_visited(&mut self) {
        self.visited.clear();
    }

    /// Marks a bean as validated in the current group. Returns false if it
    /// already was.
    pub(crate) fn mark_visited(&mut self, id: BeanId) -> bool {
        self.visited.insert(id)
    }

    /// Makes `bean` the current bean.
    pub(crate) fn enter_bean(&mut self, bean: Value, meta_bean: Arc<MetaBean>) -> SavedBean {
        self.value_cache = None;
        SavedBean {
            bean: std::mem::replace(&mut self.bean, bean),
            meta_bean: self.meta_bean.replace(meta_bean),
            property: self.property.take(),
        }
    }

    /// Restores the state saved by [`enter_bean`](Self::enter_bean).
    pub(crate) fn leave_bean(&mut self, saved: SavedBean) {
        self.value_cache = None;
        self.bean = saved.bean;
        self.meta_bean = saved.meta_bean;
        self.property = saved.property;
    }

    /// Moves to a property of the current bean.
    pub(crate) fn enter_property(&mut self, name: &str) {
        self.path.add_node(name);
        self.property = Some(name.to_string());
    }

    /// Returns from a property to its bean.
    pub(crate) fn leave_property(&mut self) {
        self.path.remove_leaf();
        self.property = None;
    }

    /// Makes every property read return `value`.
    pub(crate) fn set_value_override(&mut self, value: Option<Value>) {
        self.value_override = value;
        self.value_cache = None;
    }

    pub(crate) fn is_member(&self, node: &ConstraintNode) -> bool {
        group::is_member(self.types(), node.groups(), node.owner(), &self.group)
    }

    /// Records that `node` is evaluated on the current bean. Returns false if
    /// it already was during this call.
    pub(crate) fn collect_validated(&mut self, node: &ConstraintNode) -> bool {
        match self.bean.bean_id() {
            Some(id) => self
                .processed
                .insert((id, node as *const ConstraintNode as usize)),
            None => true,
        }
    }

    /// Reads a property of the current bean.
    pub(crate) fn property_value(&mut self, access: &AccessStrategy) -> Result<Value, ValidationError> {
        if let Some(value) = &self.value_override {
            return Ok(value.clone());
        }
        if let Some((cached, value)) = &self.value_cache {
            if cached == access {
                return Ok(value.clone());
            }
        }
        let value = access
            .get(&self.bean)
            .map_err(|source| ValidationError::Access {
                path: self.path.to_string(),
                source,
            })?;
        self.value_cache = Some((access.clone(), value.clone()));
        Ok(value)
    }

    /// Asks the resolver whether the current property may be read.
    pub(crate) fn is_reachable(&mut self, access: &AccessStrategy) -> Result<bool, ValidationError> {
        self.traversable(Traversal::Reachable, access.element_kind())
    }

    /// Asks the resolver whether the current property may be cascaded into.
    pub(crate) fn is_cascadable(&mut self, access: &AccessStrategy) -> Result<bool, ValidationError> {
        self.traversable(Traversal::Cascadable, access.element_kind())
    }

    fn traversable(&mut self, traversal: Traversal, element_kind: ElementKind) -> Result<bool, ValidationError> {
        let key = (
            self.bean.bean_id(),
            self.path.to_string(),
            element_kind,
            traversal,
        );
        if let Some(&answer) = self.traversals.get(&key) {
            return Ok(answer);
        }

        let path_to_bean = self.path.without_leaf();
        let request = TraversableRequest {
            bean: &self.bean,
            node: self.path.leaf(),
            root_type: self.root_type.as_ref(),
            path_to_bean: &path_to_bean,
            element_kind,
        };
        let resolver = self.services.resolver;
        let answer = match traversal {
            Traversal::Reachable => resolver.is_reachable(&request),
            Traversal::Cascadable => resolver.is_cascadable(&request),
        }
        .map_err(|source| ValidationError::TraversableResolver {
            operation: traversal.operation(),
            bean: self.bean.to_string(),
            source,
        })?;

        trace!(path = %self.path, operation = traversal.operation(), answer, "traversable");
        self.traversals.insert(key, answer);
        Ok(answer)
    }

    /// Runs `f` with reporting suspended. Returns whether anything inside
    /// failed.
    pub(crate) fn isolate<F>(&mut self, f: F) -> Result<bool, ValidationError>
    where
        F: FnOnce(&mut Self) -> Result<(), ValidationError>,
    {
        self.isolated.push(0);
        let outcome = f(self);
        let failures = self.isolated.pop().unwrap_or_default();
        outcome.map(|()| failures > 0)
    }

    /// Reports a violation of `node` at the current path, or at
    /// `sub_property` below it.
    pub(crate) fn report(
        &mut self,
        node: &ConstraintNode,
        template: &str,
        sub_property: Option<&str>,
        value: &Value,
    ) {
        if let Some(failures) = self.isolated.last_mut() {
            *failures += 1;
            return;
        }

        let mut path = self.path.clone();
        if let Some(sub) = sub_property {
            path.add_node(sub);
        }
        let message = self
            .services
            .interpolator
            .interpolate(template, &MessageContext::new(node.descriptor(), value));

        let mut violation = ConstraintViolation::new(path, message)
            .with_template(template)
            .with_invalid_value(value.clone())
            .with_constraint(Arc::clone(node.descriptor()));
        if let Some(root_type) = &self.root_type {
            violation = violation.with_root_type(root_type.clone());
        }
        if let Some(bean) = self.bean.as_bean() {
            violation = violation.with_leaf_bean(Arc::clone(bean));
        }
        if let Some(property) = sub_property.or(self.property.as_deref()) {
            violation = violation.with_property(property);
        }

        trace!(path = %violation.path, constraint = node.constraint(), "violation");
        self.listener.add_violation(violation);
        self.violation_count += 1;
    }
}
