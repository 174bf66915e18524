//! Resolved, immutable constraint nodes and their evaluation.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::{ConstraintValidator, ConstraintValidatorContext};
use crate::access::AccessStrategy;
use crate::context::ValidationContext;
use crate::error::ValidationError;
use crate::group::Group;
use crate::metadata::ConstraintDescriptor;
use crate::types::TypeKey;
use crate::value::Value;

struct ResolvedValidator {
    name: String,
    instance: Box<dyn ConstraintValidator>,
}

/// One declared constraint, bound to its validator.
///
/// Nodes are built once per declaration and shared by every validation run,
/// so nothing in a node changes after construction.
pub struct ConstraintNode {
    descriptor: Arc<ConstraintDescriptor>,
    validator: Option<ResolvedValidator>,
    owner: TypeKey,
    groups: Vec<Group>,
    access: Option<AccessStrategy>,
    composing: Vec<ConstraintNode>,
}

impl ConstraintNode {
    pub(crate) fn new(
        descriptor: ConstraintDescriptor,
        validator: Option<(String, Box<dyn ConstraintValidator>)>,
        owner: TypeKey,
        access: Option<AccessStrategy>,
        composing: Vec<ConstraintNode>,
    ) -> Self {
        let groups = descriptor.groups.iter().cloned().map(Group::new).collect();
        Self {
            descriptor: Arc::new(descriptor),
            validator: validator.map(|(name, instance)| ResolvedValidator { name, instance }),
            owner,
            groups,
            access,
            composing,
        }
    }

    /// The constraint name.
    pub fn constraint(&self) -> &str {
        &self.descriptor.constraint
    }

    /// The serializable description of this node.
    pub fn descriptor(&self) -> &Arc<ConstraintDescriptor> {
        &self.descriptor
    }

    /// The type declaring the constraint.
    pub fn owner(&self) -> &TypeKey {
        &self.owner
    }

    /// Groups the constraint belongs to.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Payload classifiers.
    pub fn payload(&self) -> &[TypeKey] {
        &self.descriptor.payload
    }

    /// The message template.
    pub fn message_template(&self) -> &str {
        &self.descriptor.message_template
    }

    /// Whether failing composing constraints yield one violation.
    pub fn report_as_single_violation(&self) -> bool {
        self.descriptor.report_as_single_violation
    }

    /// Composing constraints.
    pub fn composing(&self) -> &[ConstraintNode] {
        &self.composing
    }

    /// How the validated value is read; `None` for class-level constraints.
    pub fn access(&self) -> Option<&AccessStrategy> {
        self.access.as_ref()
    }

    /// Name of the resolved validator, `None` for purely composed constraints.
    pub fn validator_name(&self) -> Option<&str> {
        self.validator.as_ref().map(|v| v.name.as_str())
    }

    /// Evaluates this node against the context's current bean or property.
    pub(crate) fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<(), ValidationError> {
        if !ctx.is_member(self) {
            trace!(constraint = self.constraint(), group = %ctx.group(), "not in group");
            return Ok(());
        }
        if !ctx.collect_validated(self) {
            return Ok(());
        }
        let value = match &self.access {
            Some(access) => {
                if !ctx.is_reachable(access)? || !ctx.is_cascadable(access)? {
                    trace!(constraint = self.constraint(), path = %ctx.path(), "not traversable");
                    return Ok(());
                }
                ctx.property_value(access)?
            }
            None => ctx.bean().clone(),
        };
        self.evaluate(ctx, &value)
    }

    fn evaluate(&self, ctx: &mut ValidationContext<'_>, value: &Value) -> Result<(), ValidationError> {
        if !self.composing.is_empty() {
            if self.report_as_single_violation() {
                let failed = ctx.isolate(|ctx| {
                    self.composing
                        .iter()
                        .try_for_each(|composing| composing.evaluate(ctx, value))
                })?;
                if failed {
                    ctx.report(self, self.message_template(), None, value);
                    return Ok(());
                }
            } else {
                for composing in &self.composing {
                    composing.evaluate(ctx, value)?;
                }
            }
        }

        let Some(validator) = &self.validator else {
            return Ok(());
        };
        let mut validator_ctx = ConstraintValidatorContext::new(self.message_template());
        let valid = validator
            .instance
            .is_valid(value, &mut validator_ctx)
            .map_err(|source| ValidationError::Predicate {
                constraint: self.constraint().to_string(),
                validator: validator.name.clone(),
                path: ctx.path().to_string(),
                source,
            })?;
        if !valid {
            for custom in validator_ctx.custom_violations() {
                ctx.report(self, &custom.template, custom.property.as_deref(), value);
            }
            if validator_ctx.is_default_enabled() {
                ctx.report(self, self.message_template(), None, value);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ConstraintNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintNode")
            .field("constraint", &self.descriptor.constraint)
            .field("validator", &self.validator_name())
            .field("owner", &self.owner)
            .field("groups", &self.groups)
            .field("access", &self.access)
            .field("composing", &self.composing)
            .finish()
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<ConstraintNode>();
    assert_sync::<ConstraintNode>();
};
