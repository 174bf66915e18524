//! Validation groups and group sequences.
//!
//! A [`Group`] is a marker type. Requested groups are resolved into
//! [`Groups`]: plain groups, validated independently, plus group sequences,
//! validated element by element and stopped at the first element that
//! produces a violation.

use std::fmt::{self, Display};

use tracing::debug;

use crate::error::{ConfigError, GroupSequenceDefect};
use crate::types::{names, TypeKey, TypeSystem};

/// A validation group, identified by its marker type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Group(TypeKey);

impl Group {
    /// Creates a group for a marker type.
    pub fn new(marker: impl Into<TypeKey>) -> Self {
        Self(marker.into())
    }

    /// The `Default` group.
    pub fn default_group() -> Self {
        Self(TypeKey::new(names::DEFAULT_GROUP))
    }

    /// Returns true for the `Default` group.
    pub fn is_default(&self) -> bool {
        self.0.name() == names::DEFAULT_GROUP
    }

    /// The marker type.
    pub fn key(&self) -> &TypeKey {
        &self.0
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Group {
    fn from(marker: &str) -> Self {
        Self::new(marker)
    }
}

impl From<TypeKey> for Group {
    fn from(marker: TypeKey) -> Self {
        Self(marker)
    }
}

/// Groups to validate, as produced by [`GroupResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Groups {
    groups: Vec<Group>,
    sequences: Vec<Vec<Group>>,
}

impl Groups {
    /// Just the `Default` group.
    pub fn default_only() -> Self {
        Self {
            groups: vec![Group::default_group()],
            sequences: Vec::new(),
        }
    }

    /// Plain groups, each validated over the whole graph.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Sequences, each validated element by element with fail-fast.
    pub fn sequences(&self) -> &[Vec<Group>] {
        &self.sequences
    }

    fn add_group(&mut self, group: Group) {
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
    }
}

/// Looks up group sequence definitions.
pub trait GroupSequenceSource {
    /// Returns the sequence defined on a group marker interface, if any.
    fn group_sequence(&self, group: &TypeKey) -> Result<Option<Vec<TypeKey>>, ConfigError>;
}

/// Expands requested groups into [`Groups`].
pub struct GroupResolver<'a> {
    types: &'a TypeSystem,
    source: &'a dyn GroupSequenceSource,
}

impl<'a> GroupResolver<'a> {
    /// Creates a resolver.
    pub fn new(types: &'a TypeSystem, source: &'a dyn GroupSequenceSource) -> Self {
        Self { types, source }
    }

    /// Resolves requested groups. An empty request means `Default`.
    ///
    /// Groups whose marker interface carries a group sequence become
    /// sequences; nested sequences are flattened in place.
    ///
    /// # Errors
    ///
    /// Fails on unknown group types and cyclic sequence definitions.
    pub fn resolve(&self, requested: &[Group]) -> Result<Groups, ConfigError> {
        if requested.is_empty() {
            return Ok(Groups::default_only());
        }

        let mut resolved = Groups::default();
        for group in requested {
            if group.is_default() {
                resolved.add_group(group.clone());
                continue;
            }
            self.types.require(group.key())?;
            match self.sequence_of(group.key())? {
                Some(_) => {
                    let mut stack = Vec::new();
                    let expanded = self.expand(group.key(), &mut stack)?;
                    if !resolved.sequences.contains(&expanded) {
                        resolved.sequences.push(expanded);
                    }
                }
                None => resolved.add_group(group.clone()),
            }
        }

        debug!(
            groups = ?resolved.groups,
            sequences = ?resolved.sequences,
            "resolved validation groups"
        );
        Ok(resolved)
    }

    fn sequence_of(&self, group: &TypeKey) -> Result<Option<Vec<TypeKey>>, ConfigError> {
        // Only interfaces define sequences; on classes a sequence redefines Default.
        if !self.types.get(group).is_some_and(|info| info.is_interface()) {
            return Ok(None);
        }
        self.source.group_sequence(group)
    }

    fn expand(&self, group: &TypeKey, stack: &mut Vec<TypeKey>) -> Result<Vec<Group>, ConfigError> {
        if stack.contains(group) {
            return Err(ConfigError::CyclicGroupSequence(group.clone()));
        }
        let Some(members) = self.sequence_of(group)? else {
            return Ok(vec![Group::new(group.clone())]);
        };

        stack.push(group.clone());
        let mut out = Vec::new();
        for member in &members {
            self.types.require(member)?;
            for g in self.expand(member, stack)? {
                if !out.contains(&g) {
                    out.push(g);
                }
            }
        }
        stack.pop();
        Ok(out)
    }
}

/// Checks a class's redefined default group sequence.
///
/// The sequence must name the hosting type (its stand-in for `Default`) and
/// must not name `Default` itself.
pub fn validate_default_sequence(
    host: &TypeKey,
    sequence: &[TypeKey],
) -> Result<Vec<Group>, ConfigError> {
    let defect = |defect| ConfigError::InvalidGroupSequence {
        host: host.clone(),
        defect,
    };

    if sequence.is_empty() {
        return Err(defect(GroupSequenceDefect::Empty));
    }
    if sequence.iter().any(|g| g.name() == names::DEFAULT_GROUP) {
        return Err(defect(GroupSequenceDefect::ContainsDefault));
    }
    if !sequence.contains(host) {
        return Err(defect(GroupSequenceDefect::MissingHostType));
    }
    Ok(sequence.iter().cloned().map(Group::new).collect())
}

/// Decides whether a constraint applies while validating `current`.
///
/// A constraint applies when one of its declared groups is `current` or a
/// supertype of it (group inheritance). A constraint in `Default` also
/// applies to any group marker its owner is assignable from: validating the
/// stand-in of a redefined default sequence runs the `Default` constraints
/// declared on that type, its superclasses and its interfaces.
pub fn is_member(
    types: &TypeSystem,
    declared: &[Group],
    owner: &TypeKey,
    current: &Group,
) -> bool {
    let explicit = declared.iter().any(|g| {
        g == current || (!g.is_default() && types.is_assignable_from(g.key(), current.key()))
    });
    if explicit {
        return true;
    }
    !current.is_default()
        && declared.iter().any(Group::is_default)
        && types.is_assignable_from(owner, current.key())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::TypeInfo;

    struct Sequences(HashMap<TypeKey, Vec<TypeKey>>);

    impl GroupSequenceSource for Sequences {
        fn group_sequence(&self, group: &TypeKey) -> Result<Option<Vec<TypeKey>>, ConfigError> {
            Ok(self.0.get(group).cloned())
        }
    }

    fn keys(names: &[&str]) -> Vec<TypeKey> {
        names.iter().map(|n| TypeKey::from(*n)).collect()
    }

    fn types() -> TypeSystem {
        let mut types = TypeSystem::new();
        types
            .register_all([
                TypeInfo::interface("Basic"),
                TypeInfo::interface("Extended").implements("Basic"),
                TypeInfo::interface("Complete"),
                TypeInfo::interface("Loop"),
                TypeInfo::interface("Named"),
                TypeInfo::class("Person").implements("Named"),
            ])
            .unwrap();
        types
    }

    #[test]
    fn test_empty_request_is_default() {
        let types = types();
        let source = Sequences(HashMap::new());
        let groups = GroupResolver::new(&types, &source).resolve(&[]).unwrap();
        assert_eq!(groups, Groups::default_only());
    }

    #[test]
    fn test_sequence_expansion() {
        let types = types();
        let source = Sequences(HashMap::from([(
            TypeKey::from("Complete"),
            keys(&["Basic", "Extended"]),
        )]));
        let groups = GroupResolver::new(&types, &source)
            .resolve(&[Group::from("Complete"), Group::default_group()])
            .unwrap();
        assert_eq!(groups.groups(), &[Group::default_group()]);
        assert_eq!(
            groups.sequences(),
            &[vec![Group::from("Basic"), Group::from("Extended")]]
        );
    }

    #[test]
    fn test_cyclic_sequence_rejected() {
        let types = types();
        let source = Sequences(HashMap::from([
            (TypeKey::from("Complete"), keys(&["Basic", "Loop"])),
            (TypeKey::from("Loop"), keys(&["Complete"])),
        ]));
        let err = GroupResolver::new(&types, &source)
            .resolve(&[Group::from("Complete")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::CyclicGroupSequence(_)));
    }

    #[test]
    fn test_unknown_group_rejected() {
        let types = types();
        let source = Sequences(HashMap::new());
        assert!(matches!(
            GroupResolver::new(&types, &source).resolve(&[Group::from("Nope")]),
            Err(ConfigError::UnknownType(_))
        ));
    }

    #[test]
    fn test_default_sequence_checks() {
        let host = TypeKey::from("Order");
        assert!(validate_default_sequence(&host, &keys(&["Order", "Basic"])).is_ok());
        assert!(matches!(
            validate_default_sequence(&host, &keys(&["Default", "Order"])),
            Err(ConfigError::InvalidGroupSequence {
                defect: GroupSequenceDefect::ContainsDefault,
                ..
            })
        ));
        assert!(matches!(
            validate_default_sequence(&host, &keys(&["Basic"])),
            Err(ConfigError::InvalidGroupSequence {
                defect: GroupSequenceDefect::MissingHostType,
                ..
            })
        ));
        assert!(matches!(
            validate_default_sequence(&host, &[]),
            Err(ConfigError::InvalidGroupSequence {
                defect: GroupSequenceDefect::Empty,
                ..
            })
        ));
    }

    #[test]
    fn test_membership() {
        let types = types();
        let default = vec![Group::default_group()];
        let basic = vec![Group::from("Basic")];
        let person = TypeKey::from("Person");
        let named = TypeKey::from("Named");

        assert!(is_member(&types, &default, &person, &Group::default_group()));
        assert!(!is_member(&types, &basic, &person, &Group::default_group()));
        assert!(is_member(&types, &basic, &person, &Group::from("Extended")));
        assert!(!is_member(&types, &basic, &person, &Group::from("Complete")));

        // implicit grouping: Default constraints on Person and Named apply to Person
        assert!(is_member(&types, &default, &person, &Group::from("Person")));
        assert!(is_member(&types, &default, &named, &Group::from("Person")));
        assert!(!is_member(&types, &basic, &person, &Group::from("Person")));
    }
}
