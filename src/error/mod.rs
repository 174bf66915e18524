//! Error types.
//!
//! Two families live here: [`ConstraintViolation`]s, which are the normal
//! outcome of validating invalid data, and the fatal errors ([`ConfigError`],
//! [`ValidationError`]) that abort a call because the configuration, a
//! collaborator or a constraint implementation is broken.

mod fatal;
mod violation;

pub use fatal::{
    AccessError, ConfigError, GroupSequenceDefect, PredicateError, ResolverError, ValidationError,
};
pub use violation::{ConstraintViolation, ConstraintViolations};
