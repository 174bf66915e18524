//! Object graph traversal.
//!
//! Every requested group walks the whole graph from the root. Within one
//! group a bean is validated at most once (the first path reaching it wins),
//! which is what makes cyclic graphs terminate. A bean that redefines its
//! default group sequence runs that sequence, fail-fast, in place of
//! `Default` for its own constraints; cascading from it still happens under
//! `Default`.

use std::sync::Arc;

use tracing::trace;

use crate::access::AccessStrategy;
use crate::context::ValidationContext;
use crate::error::ValidationError;
use crate::group::{Group, Groups};
use crate::metadata::{CascadeTarget, MetaBean, MetaProperty};
use crate::path::{PathKey, PropertyPath};
use crate::types::runtime_type_of;
use crate::value::{MapKey, Value};

/// Validates `root` in every requested group.
///
/// `meta` is the root bean's metadata; `None` validates a root container
/// element by element.
pub(crate) fn validate_groups(
    ctx: &mut ValidationContext<'_>,
    root: &Value,
    meta: Option<&Arc<MetaBean>>,
    groups: &Groups,
) -> Result<(), ValidationError> {
    for_each_group(ctx, groups, |ctx| match meta {
        Some(meta) => validate_bean_net(ctx, root.clone(), Arc::clone(meta)),
        None => validate_value(ctx, root, &CascadeTarget::Dynamic),
    })
}

/// Validates the constraints of the property addressed by `path`.
///
/// Intermediate nodes are navigated, never validated. A null intermediate
/// value ends the call without violations.
pub(crate) fn validate_property(
    ctx: &mut ValidationContext<'_>,
    root: &Value,
    meta: Arc<MetaBean>,
    path: &PropertyPath,
    groups: &Groups,
) -> Result<(), ValidationError> {
    let nodes: Vec<_> = path.nodes().cloned().collect();
    let Some((last, intermediate)) = nodes.split_last() else {
        return Ok(());
    };

    let mut bean = root.clone();
    let mut meta = meta;
    let mut walked = PropertyPath::root();
    for node in intermediate {
        let name = node.name().ok_or_else(|| unknown_property(&meta, ""))?;
        let property = meta
            .property(name)
            .ok_or_else(|| unknown_property(&meta, name))?;
        walked.push(node.clone());

        let mut value = read(&property.primary_access(), &bean, &walked)?;
        if node.is_in_iterable() {
            let Some(access) = element_access(ctx, property, node.index(), node.key()) else {
                return Ok(());
            };
            value = read(&access, &value, &walked)?;
        }
        if value.is_null() || !is_bean_like(ctx, &value) {
            trace!(path = %walked, "property path ends at a non-bean value");
            return Ok(());
        }
        meta = ctx.cache().get(&runtime_type_of(&value))?;
        bean = value;
    }

    let name = last.name().ok_or_else(|| unknown_property(&meta, ""))?;
    let Some(property) = meta.property(name) else {
        return Err(unknown_property(&meta, name));
    };

    ctx.set_path(walked);
    let saved = ctx.enter_bean(bean, Arc::clone(&meta));
    ctx.enter_property(name);
    let outcome = for_each_group(ctx, groups, |ctx| {
        with_default_sequence(ctx, &meta, |ctx| validate_constraints(ctx, property))
    });
    ctx.leave_property();
    ctx.leave_bean(saved);
    outcome
}

/// Validates `value` against the constraints of one property, without an
/// instance.
pub(crate) fn validate_property_value(
    ctx: &mut ValidationContext<'_>,
    meta: Arc<MetaBean>,
    property: &str,
    value: Value,
    groups: &Groups,
) -> Result<(), ValidationError> {
    let Some(found) = meta.property(property) else {
        return Err(unknown_property(&meta, property));
    };

    ctx.set_value_override(Some(value));
    let saved = ctx.enter_bean(Value::Null, Arc::clone(&meta));
    ctx.enter_property(property);
    let outcome = for_each_group(ctx, groups, |ctx| {
        with_default_sequence(ctx, &meta, |ctx| validate_constraints(ctx, found))
    });
    ctx.leave_property();
    ctx.leave_bean(saved);
    ctx.set_value_override(None);
    outcome
}

/// Runs `f` once per requested group, then each sequence fail-fast.
fn for_each_group<'a, F>(
    ctx: &mut ValidationContext<'a>,
    groups: &Groups,
    mut f: F,
) -> Result<(), ValidationError>
where
    F: FnMut(&mut ValidationContext<'a>) -> Result<(), ValidationError>,
{
    let outcome = run_groups(ctx, groups, &mut f);
    ctx.set_group(Group::default_group());
    outcome
}

fn run_groups<'a, F>(
    ctx: &mut ValidationContext<'a>,
    groups: &Groups,
    f: &mut F,
) -> Result<(), ValidationError>
where
    F: FnMut(&mut ValidationContext<'a>) -> Result<(), ValidationError>,
{
    for group in groups.groups() {
        ctx.reset_visited();
        ctx.set_group(group.clone());
        f(ctx)?;
    }
    for sequence in groups.sequences() {
        for group in sequence {
            ctx.reset_visited();
            ctx.set_group(group.clone());
            let before = ctx.violation_count();
            f(ctx)?;
            if ctx.violation_count() > before {
                trace!(group = %group, "group sequence stopped");
                break;
            }
        }
    }
    Ok(())
}

/// Runs `f` under the bean's redefined default sequence when validating
/// `Default`, else once under the current group.
fn with_default_sequence<'a, F>(
    ctx: &mut ValidationContext<'a>,
    meta: &MetaBean,
    mut f: F,
) -> Result<(), ValidationError>
where
    F: FnMut(&mut ValidationContext<'a>) -> Result<(), ValidationError>,
{
    let sequence = match meta.group_sequence() {
        Some(sequence) if ctx.group().is_default() => sequence,
        _ => return f(ctx),
    };

    let mut outcome = Ok(());
    for group in sequence {
        ctx.set_group(group.clone());
        let before = ctx.violation_count();
        outcome = f(ctx);
        if outcome.is_err() || ctx.violation_count() > before {
            break;
        }
    }
    ctx.set_group(Group::default_group());
    outcome
}

/// Validates a cascaded value: containers element by element, beans
/// directly. Map keys are never validated.
fn validate_value(
    ctx: &mut ValidationContext<'_>,
    value: &Value,
    target: &CascadeTarget,
) -> Result<(), ValidationError> {
    match value {
        Value::Null => Ok(()),
        Value::Map(map) if !ctx.treat_maps_like_beans() => {
            for (key, element) in map {
                if element.is_null() {
                    continue;
                }
                ctx.path_mut().set_leaf_key(key.clone());
                validate_element(ctx, element, target)?;
            }
            ctx.path_mut().clear_leaf_iterable();
            Ok(())
        }
        Value::List(items) | Value::Array(items) => {
            for (index, element) in items.iter().enumerate() {
                if element.is_null() {
                    continue;
                }
                ctx.path_mut().set_leaf_index(Some(index));
                validate_element(ctx, element, target)?;
            }
            ctx.path_mut().clear_leaf_iterable();
            Ok(())
        }
        Value::Set(items) => {
            for element in items.iter().filter(|e| !e.is_null()) {
                ctx.path_mut().set_leaf_index(None);
                validate_element(ctx, element, target)?;
            }
            ctx.path_mut().clear_leaf_iterable();
            Ok(())
        }
        other => validate_element(ctx, other, target),
    }
}

fn validate_element(
    ctx: &mut ValidationContext<'_>,
    element: &Value,
    target: &CascadeTarget,
) -> Result<(), ValidationError> {
    if !is_bean_like(ctx, element) {
        trace!(path = %ctx.path(), "skipping non-bean element");
        return Ok(());
    }
    let meta = match target {
        CascadeTarget::Static(bean_type) => ctx.cache().get(bean_type)?,
        CascadeTarget::Dynamic => ctx.cache().get(&runtime_type_of(element))?,
    };
    validate_bean_net(ctx, element.clone(), meta)
}

fn validate_bean_net(
    ctx: &mut ValidationContext<'_>,
    bean: Value,
    meta: Arc<MetaBean>,
) -> Result<(), ValidationError> {
    if let Some(id) = bean.bean_id() {
        if !ctx.mark_visited(id) {
            trace!(path = %ctx.path(), group = %ctx.group(), "bean already validated");
            return Ok(());
        }
    }

    let saved = ctx.enter_bean(bean, Arc::clone(&meta));
    let outcome = with_default_sequence(ctx, &meta, |ctx| validate_own(ctx, &meta))
        .and_then(|()| validate_cascades(ctx, &meta));
    ctx.leave_bean(saved);
    outcome
}

/// Property constraints, then class-level constraints.
fn validate_own(ctx: &mut ValidationContext<'_>, meta: &MetaBean) -> Result<(), ValidationError> {
    for property in meta.properties() {
        if property.constraints().is_empty() {
            continue;
        }
        ctx.enter_property(property.name());
        let outcome = property
            .constraints()
            .iter()
            .try_for_each(|node| node.validate(ctx));
        ctx.leave_property();
        outcome?;
    }
    meta.constraints()
        .iter()
        .try_for_each(|node| node.validate(ctx))
}

fn validate_cascades(ctx: &mut ValidationContext<'_>, meta: &MetaBean) -> Result<(), ValidationError> {
    for property in meta.properties() {
        let Some(target) = property.cascade() else {
            continue;
        };
        ctx.enter_property(property.name());
        let outcome = cascade_property(ctx, property, target);
        ctx.leave_property();
        outcome?;
    }
    Ok(())
}

fn cascade_property(
    ctx: &mut ValidationContext<'_>,
    property: &MetaProperty,
    target: &CascadeTarget,
) -> Result<(), ValidationError> {
    for access in property.cascade_accesses() {
        if !ctx.is_reachable(access)? || !ctx.is_cascadable(access)? {
            trace!(path = %ctx.path(), "not traversable");
            continue;
        }
        let value = ctx.property_value(access)?;
        if value.is_null() {
            continue;
        }
        validate_value(ctx, &value, target)?;
    }
    Ok(())
}

fn validate_constraints(
    ctx: &mut ValidationContext<'_>,
    property: &MetaProperty,
) -> Result<(), ValidationError> {
    property
        .constraints()
        .iter()
        .try_for_each(|node| node.validate(ctx))
}

fn is_bean_like(ctx: &ValidationContext<'_>, value: &Value) -> bool {
    match value {
        Value::Bean(_) => true,
        Value::Map(_) => ctx.treat_maps_like_beans(),
        _ => false,
    }
}

/// Builds the access reading one element of a container property.
fn element_access(
    ctx: &ValidationContext<'_>,
    property: &MetaProperty,
    index: Option<usize>,
    key: Option<&PathKey>,
) -> Option<AccessStrategy> {
    if let Some(index) = index {
        return Some(AccessStrategy::indexed(index));
    }
    let key = match key? {
        PathKey::Map(key) => return Some(AccessStrategy::keyed(key.clone())),
        PathKey::Name(name) => name,
    };
    let types = ctx.types();
    match property.declared_type().map_key_type(types) {
        Some(key_type) if types.is_enum(key_type.raw()) => {
            Some(AccessStrategy::keyed_enum(key.as_str(), key_type.raw().clone()))
        }
        _ => Some(AccessStrategy::keyed(MapKey::String(key.clone()))),
    }
}

fn read(access: &AccessStrategy, instance: &Value, path: &PropertyPath) -> Result<Value, ValidationError> {
    access.get(instance).map_err(|source| ValidationError::Access {
        path: path.to_string(),
        source,
    })
}

fn unknown_property(meta: &MetaBean, property: &str) -> ValidationError {
    ValidationError::UnknownProperty {
        bean_type: meta.bean_type().clone(),
        property: property.to_string(),
    }
}
