//! Serializable descriptions of validation metadata.

use serde::Serialize;

use crate::constraint::ConstraintAttributes;
use crate::types::{TypeKey, TypeRef};

/// Describes one constraint declaration after defaults and overrides were
/// applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintDescriptor {
    /// Constraint name.
    pub constraint: String,
    /// Effective attributes.
    pub attributes: ConstraintAttributes,
    /// Groups; never empty.
    pub groups: Vec<TypeKey>,
    /// Payload classifiers.
    pub payload: Vec<TypeKey>,
    /// Message template.
    pub message_template: String,
    /// Whether failing composing constraints are reported as one violation.
    pub report_as_single_violation: bool,
    /// Composing constraints.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub composing: Vec<ConstraintDescriptor>,
}

/// Describes one validated property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    /// Property name.
    pub name: String,
    /// Declared type, rendered as text.
    pub declared_type: String,
    /// Whether the property is cascaded into.
    pub cascaded: bool,
    /// Constraints on the property.
    pub constraints: Vec<ConstraintDescriptor>,
}

/// Describes the validation metadata of one type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeanDescriptor {
    /// The described type.
    pub bean_type: TypeKey,
    /// Declared id, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Class-level constraints.
    pub constraints: Vec<ConstraintDescriptor>,
    /// Validated properties.
    pub properties: Vec<PropertyDescriptor>,
    /// Redefined default group sequence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_sequence: Option<Vec<TypeKey>>,
}

impl BeanDescriptor {
    /// Returns true if the type has any constraint or cascaded property.
    pub fn is_constrained(&self) -> bool {
        !self.constraints.is_empty()
            || self
                .properties
                .iter()
                .any(|p| p.cascaded || !p.constraints.is_empty())
    }

    /// Looks up a property description.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
}

impl PropertyDescriptor {
    pub(crate) fn new(name: &str, declared_type: &TypeRef) -> Self {
        Self {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            cascaded: false,
            constraints: Vec::new(),
        }
    }
}
