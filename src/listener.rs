//! Violation listeners.
//!
//! The engine hands every violation to a [`ValidationListener`] as soon as
//! it is found. [`ValidationResults`] is the standard listener: it drops
//! duplicates and indexes violations by message template and by owning bean
//! and property.

use std::collections::HashMap;

use stillwater::Validation;

use crate::error::{ConstraintViolation, ConstraintViolations};
use crate::path::PropertyPath;
use crate::ValidationResult;
use crate::value::BeanId;

/// Receives violations during a validation call.
pub trait ValidationListener: Send {
    /// Records one violation.
    fn add_violation(&mut self, violation: ConstraintViolation);
}

impl ValidationListener for Vec<ConstraintViolation> {
    fn add_violation(&mut self, violation: ConstraintViolation) {
        self.push(violation);
    }
}

/// Owner key of the by-owner index: the owning bean, if any.
type OwnerKey = Option<BeanId>;

/// Hashable projection of a violation used to find duplicates.
type ViolationKey = (String, String, PropertyPath, OwnerKey, Option<String>);

fn violation_key(violation: &ConstraintViolation) -> ViolationKey {
    (
        violation.message_template.clone(),
        violation.message.clone(),
        violation.path.clone(),
        violation.leaf_bean_id(),
        violation.property.clone(),
    )
}

/// Collected violations of one validation call.
///
/// # Example
///
/// ```rust
/// use beanval::listener::{ValidationListener, ValidationResults};
/// use beanval::{ConstraintViolation, PropertyPath};
///
/// let mut results = ValidationResults::new();
/// let violation = ConstraintViolation::new(PropertyPath::from_property("zip"), "may not be null")
///     .with_property("zip");
/// results.add_violation(violation.clone());
/// results.add_violation(violation);
///
/// assert_eq!(results.len(), 1);
/// assert_eq!(results.by_reason("may not be null").len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationResults {
    violations: Vec<ConstraintViolation>,
    by_reason: HashMap<String, Vec<usize>>,
    by_owner: HashMap<OwnerKey, HashMap<Option<String>, Vec<usize>>>,
    seen: HashMap<ViolationKey, Vec<usize>>,
}

impl ValidationResults {
    /// Creates empty results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no violation was recorded.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of distinct violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// All violations, in the order they were found.
    pub fn violations(&self) -> &[ConstraintViolation] {
        &self.violations
    }

    /// Violations whose message template is `reason`.
    pub fn by_reason(&self, reason: &str) -> Vec<&ConstraintViolation> {
        self.lookup(self.by_reason.get(reason))
    }

    /// Violations of one property of one bean. `property` is `None` for
    /// class-level violations.
    pub fn by_owner_property(
        &self,
        owner: Option<BeanId>,
        property: Option<&str>,
    ) -> Vec<&ConstraintViolation> {
        self.lookup(
            self.by_owner
                .get(&owner)
                .and_then(|properties| properties.get(&property.map(str::to_string))),
        )
    }

    /// Violations of a property on any bean.
    pub fn for_property(&self, property: &str) -> Vec<&ConstraintViolation> {
        self.violations
            .iter()
            .filter(|v| v.property.as_deref() == Some(property))
            .collect()
    }

    /// Moves in all violations of `other`.
    pub fn merge(&mut self, other: ValidationResults) {
        for violation in other.violations {
            self.add_violation(violation);
        }
    }

    /// Converts into the recorded violations.
    pub fn into_violations(self) -> Vec<ConstraintViolation> {
        self.violations
    }

    /// Converts into a `Validation`: success when nothing was recorded.
    pub fn into_validation(self) -> ValidationResult<()> {
        match ConstraintViolations::from_vec(self.violations) {
            Some(violations) => Validation::Failure(violations),
            None => Validation::Success(()),
        }
    }

    fn lookup(&self, indices: Option<&Vec<usize>>) -> Vec<&ConstraintViolation> {
        indices
            .map(|indices| indices.iter().map(|&i| &self.violations[i]).collect())
            .unwrap_or_default()
    }
}

impl ValidationListener for ValidationResults {
    fn add_violation(&mut self, violation: ConstraintViolation) {
        let index = self.violations.len();
        // Same projection, then full equality for the invalid value and constraint.
        let candidates = self.seen.entry(violation_key(&violation)).or_default();
        if candidates.iter().any(|&i| self.violations[i] == violation) {
            return;
        }
        candidates.push(index);
        self.by_reason
            .entry(violation.message_template.clone())
            .or_default()
            .push(index);
        self.by_owner
            .entry(violation.leaf_bean_id())
            .or_default()
            .entry(violation.property.clone())
            .or_default()
            .push(index);
        self.violations.push(violation);
    }
}
