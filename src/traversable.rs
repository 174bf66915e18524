//! Traversable resolvers decide which properties the engine may read.
//!
//! Before a constraint reads a property the engine asks
//! [`TraversableResolver::is_reachable`]; before it cascades into a property
//! it asks `is_reachable` and then [`TraversableResolver::is_cascadable`].
//! Answers are cached for the duration of one validation call.

use crate::access::ElementKind;
use crate::error::ResolverError;
use crate::path::{PathNode, PropertyPath};
use crate::types::TypeKey;
use crate::value::Value;

/// The element a resolver is asked about.
#[derive(Debug, Clone, Copy)]
pub struct TraversableRequest<'a> {
    /// The bean owning the property.
    pub bean: &'a Value,
    /// The property's path node.
    pub node: &'a PathNode,
    /// Type of the root object of the call.
    pub root_type: Option<&'a TypeKey>,
    /// Path from the root to `bean`.
    pub path_to_bean: &'a PropertyPath,
    /// What kind of element the property is read through.
    pub element_kind: ElementKind,
}

/// Decides whether properties may be read and cascaded into.
///
/// Errors abort the validation call with
/// [`ValidationError::TraversableResolver`](crate::error::ValidationError::TraversableResolver).
pub trait TraversableResolver: Send + Sync {
    /// Whether the property may be read at all.
    fn is_reachable(&self, request: &TraversableRequest<'_>) -> Result<bool, ResolverError>;

    /// Whether the engine may cascade into the property.
    fn is_cascadable(&self, request: &TraversableRequest<'_>) -> Result<bool, ResolverError>;
}

/// Allows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTraversableResolver;

impl TraversableResolver for DefaultTraversableResolver {
    fn is_reachable(&self, _request: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
        Ok(true)
    }

    fn is_cascadable(&self, _request: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
        Ok(true)
    }
}

impl<F> TraversableResolver for F
where
    F: Fn(&TraversableRequest<'_>) -> Result<bool, ResolverError> + Send + Sync,
{
    fn is_reachable(&self, request: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
        self(request)
    }

    fn is_cascadable(&self, request: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
        self(request)
    }
}
