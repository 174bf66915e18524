//! Validator selection by validated type.

use tracing::trace;

use super::{ConstraintDefinition, ValidatorCandidate};
use crate::error::ConfigError;
use crate::types::{TypeKey, TypeSystem};

/// Picks the validator of `definition` for values of type `target`.
///
/// Candidates whose supported type is not a supertype of `target` are
/// dropped. Of the rest, a candidate is dropped when its supported type is a
/// strict supertype of another remaining candidate's, keeping only the most
/// specific ones. Exactly one candidate must remain.
///
/// # Errors
///
/// `ConfigError::NoValidatorForType` when nothing applies,
/// `ConfigError::AmbiguousValidators` when several candidates remain.
pub fn resolve_validator<'d>(
    types: &TypeSystem,
    definition: &'d ConstraintDefinition,
    target: &TypeKey,
) -> Result<&'d ValidatorCandidate, ConfigError> {
    let applicable: Vec<&ValidatorCandidate> = definition
        .validators
        .iter()
        .filter(|c| types.is_assignable_from(c.supported_type(), target))
        .collect();

    let most_specific: Vec<&ValidatorCandidate> = applicable
        .iter()
        .copied()
        .filter(|c| {
            !applicable.iter().any(|other| {
                other.supported_type() != c.supported_type()
                    && types.is_assignable_from(c.supported_type(), other.supported_type())
            })
        })
        .collect();

    match most_specific.as_slice() {
        [] => Err(ConfigError::NoValidatorForType {
            constraint: definition.name.clone(),
            target: target.clone(),
        }),
        [single] => {
            trace!(
                constraint = %definition.name,
                target = %target,
                validator = single.name(),
                "resolved validator"
            );
            Ok(single)
        }
        several => Err(ConfigError::AmbiguousValidators {
            constraint: definition.name.clone(),
            target: target.clone(),
            candidates: several.iter().map(|c| c.name().to_string()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInfo;

    fn candidate(name: &str, supported: &str) -> ValidatorCandidate {
        ValidatorCandidate::from_fn(name, supported, |_, _| Ok(true))
    }

    fn size() -> ConstraintDefinition {
        ConstraintDefinition::new("Size")
            .validator(candidate("SizeOfObject", "Object"))
            .validator(candidate("SizeOfCharSequence", "CharSequence"))
            .validator(candidate("SizeOfCollection", "Collection"))
            .validator(candidate("SizeOfMap", "Map"))
    }

    #[test]
    fn test_most_specific_wins() {
        let types = TypeSystem::new();
        let def = size();
        let pick = |t: &str| {
            resolve_validator(&types, &def, &TypeKey::from(t))
                .unwrap()
                .name()
                .to_string()
        };
        assert_eq!(pick("String"), "SizeOfCharSequence");
        assert_eq!(pick("List"), "SizeOfCollection");
        assert_eq!(pick("Map"), "SizeOfMap");
        assert_eq!(pick("Integer"), "SizeOfObject");
    }

    #[test]
    fn test_no_validator() {
        let types = TypeSystem::new();
        let def = ConstraintDefinition::new("Pattern").validator(candidate("P", "CharSequence"));
        assert!(matches!(
            resolve_validator(&types, &def, &TypeKey::from("Integer")),
            Err(ConfigError::NoValidatorForType { .. })
        ));
    }

    #[test]
    fn test_unrelated_candidates_are_ambiguous() {
        let mut types = TypeSystem::new();
        types
            .register_all([
                TypeInfo::interface("Audited"),
                TypeInfo::interface("Versioned"),
                TypeInfo::class("Document")
                    .implements("Audited")
                    .implements("Versioned"),
            ])
            .unwrap();
        let def = ConstraintDefinition::new("Consistent")
            .validator(candidate("ForAudited", "Audited"))
            .validator(candidate("ForVersioned", "Versioned"));

        match resolve_validator(&types, &def, &TypeKey::from("Document")) {
            Err(ConfigError::AmbiguousValidators { candidates, .. }) => {
                assert_eq!(candidates, vec!["ForAudited", "ForVersioned"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_same_supported_type_is_ambiguous() {
        let types = TypeSystem::new();
        let def = ConstraintDefinition::new("Twice")
            .validator(candidate("A", "String"))
            .validator(candidate("B", "String"));
        assert!(matches!(
            resolve_validator(&types, &def, &TypeKey::from("String")),
            Err(ConfigError::AmbiguousValidators { .. })
        ));
    }
}
