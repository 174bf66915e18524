//! Fatal errors.
//!
//! None of these are retried or converted into violations: they propagate out
//! of the top-level call and the partial result is discarded.

use std::fmt::{self, Display};

use crate::path::PathParseError;
use crate::types::TypeKey;

/// Error raised by a [`TraversableResolver`](crate::traversable::TraversableResolver).
pub type ResolverError = Box<dyn std::error::Error + Send + Sync>;

/// What is wrong with a redefined default group sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSequenceDefect {
    /// The sequence lists `Default` itself, which would be circular.
    ContainsDefault,
    /// The sequence does not list the hosting type as the Default stand-in.
    MissingHostType,
    /// The sequence is empty.
    Empty,
}

impl Display for GroupSequenceDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupSequenceDefect::ContainsDefault => {
                f.write_str("the Default group cannot appear in a redefined default sequence")
            }
            GroupSequenceDefect::MissingHostType => {
                f.write_str("the sequence must contain the hosting type")
            }
            GroupSequenceDefect::Empty => f.write_str("the sequence is empty"),
        }
    }
}

/// Configuration and definition errors, raised while building metadata.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A referenced type is not registered in the type system.
    #[error("unknown type '{0}'")]
    UnknownType(TypeKey),

    /// A type was registered twice.
    #[error("type '{0}' already registered")]
    DuplicateType(TypeKey),

    /// A declared type expression could not be parsed.
    #[error("invalid type '{input}': {reason}")]
    InvalidTypeRef {
        /// The rejected text.
        input: String,
        /// What was wrong.
        reason: String,
    },

    /// A declaration names a constraint that is not in the catalog.
    #[error("unknown constraint '{0}'")]
    UnknownConstraint(String),

    /// A constraint definition was registered twice.
    #[error("constraint '{0}' already registered")]
    DuplicateConstraint(String),

    /// No validator candidate supports the validated type.
    #[error("no validator for constraint '{constraint}' supports type '{target}'")]
    NoValidatorForType {
        /// The constraint being resolved.
        constraint: String,
        /// The validated type.
        target: TypeKey,
    },

    /// More than one equally specific validator supports the validated type.
    #[error("ambiguous validators {candidates:?} for constraint '{constraint}' on type '{target}'")]
    AmbiguousValidators {
        /// The constraint being resolved.
        constraint: String,
        /// The validated type.
        target: TypeKey,
        /// Names of the remaining candidates.
        candidates: Vec<String>,
    },

    /// A constraint definition or declaration is not usable.
    #[error("malformed constraint '{constraint}': {reason}")]
    MalformedConstraint {
        /// The offending constraint.
        constraint: String,
        /// What was wrong.
        reason: String,
    },

    /// A constraint is (transitively) composed of itself.
    #[error("constraint composition cycle: {}", chain.join(" -> "))]
    CyclicComposition {
        /// The composition chain that closes the cycle.
        chain: Vec<String>,
    },

    /// A class redefines its default group sequence incorrectly.
    #[error("invalid default group sequence on '{host}': {defect}")]
    InvalidGroupSequence {
        /// The type declaring the sequence.
        host: TypeKey,
        /// What was wrong.
        defect: GroupSequenceDefect,
    },

    /// Group sequences reference each other in a cycle.
    #[error("cyclic group sequence definition involving '{0}'")]
    CyclicGroupSequence(TypeKey),

    /// A bean type was declared twice in the same declaration source.
    #[error("bean '{0}' already declared")]
    DuplicateDeclaration(TypeKey),

    /// No bean declaration carries the requested id.
    #[error("no bean declared with id '{0}'")]
    UnknownBeanId(String),

    /// A declaration merge found incompatible information.
    #[error("conflicting metadata for '{bean_type}.{property}': {reason}")]
    ConflictingMetadata {
        /// The bean type.
        bean_type: TypeKey,
        /// The property.
        property: String,
        /// What conflicts.
        reason: String,
    },
}

/// A property value could not be read.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccessError {
    /// The instance has no such member.
    #[error("'{bean_type}' has no member '{member}'")]
    MissingMember {
        /// Type of the accessed instance.
        bean_type: TypeKey,
        /// The member name.
        member: String,
    },

    /// The access strategy cannot read values.
    #[error("{0} does not support reading values")]
    Unsupported(String),

    /// The instance is not of a shape the strategy can read from.
    #[error("cannot read {access} from a value of type '{found}'")]
    WrongShape {
        /// Description of the access strategy.
        access: String,
        /// Runtime type of the instance.
        found: TypeKey,
    },
}

/// An unexpected failure inside a validator predicate.
///
/// This signals a broken constraint implementation and is never turned into a
/// violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PredicateError {
    /// What went wrong.
    pub message: String,
}

impl PredicateError {
    /// Creates a predicate error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Fatal errors surfaced by a validation call.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Metadata could not be built.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A property value could not be read.
    #[error("cannot access property at '{path}': {source}")]
    Access {
        /// Path of the property being read.
        path: String,
        /// The underlying failure.
        #[source]
        source: AccessError,
    },

    /// The traversable resolver failed.
    #[error("error in TraversableResolver.{operation}() for {bean}")]
    TraversableResolver {
        /// `is_reachable` or `is_cascadable`.
        operation: &'static str,
        /// Description of the bean being traversed.
        bean: String,
        /// The resolver's error.
        #[source]
        source: ResolverError,
    },

    /// A validator predicate failed unexpectedly.
    #[error("validator '{validator}' for constraint '{constraint}' failed at '{path}': {source}")]
    Predicate {
        /// The constraint being evaluated.
        constraint: String,
        /// The validator implementation.
        validator: String,
        /// Path of the validated value.
        path: String,
        /// The predicate's error.
        #[source]
        source: PredicateError,
    },

    /// The root object was null.
    #[error("the validated object cannot be null")]
    NullRoot,

    /// A property path expression was malformed.
    #[error(transparent)]
    InvalidPath(#[from] PathParseError),

    /// A property path names a property the bean type does not declare.
    #[error("'{property}' is not a validated property of '{bean_type}'")]
    UnknownProperty {
        /// The bean type.
        bean_type: TypeKey,
        /// The property name.
        property: String,
    },
}
