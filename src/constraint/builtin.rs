//! Built-in constraints.
//!
//! Every validator here treats `Null` as valid except [`NotNullValidator`],
//! [`NotBlankValidator`] and the `NotEmpty` composite.

use regex::{Regex, RegexBuilder};

use super::{
    ConstraintAttributes, ConstraintDefinition, ConstraintValidator, ConstraintValidatorContext,
    ValidatorCandidate,
};
use crate::declaration::ConstraintDeclaration;
use crate::error::{ConfigError, PredicateError};
use crate::types::names;
use crate::value::Value;

/// Default upper bound of `Size`.
pub const SIZE_MAX: i64 = i32::MAX as i64;

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?$";

fn mismatch(constraint: &str, expected: &str, value: &Value) -> PredicateError {
    PredicateError::new(format!(
        "{} expects {}, got {}",
        constraint,
        expected,
        value.to_json()
    ))
}

fn malformed(constraint: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::MalformedConstraint {
        constraint: constraint.to_string(),
        reason: reason.into(),
    }
}

/// Rejects `Null`.
#[derive(Debug, Default)]
pub struct NotNullValidator;

impl ConstraintValidator for NotNullValidator {
    fn is_valid(&self, value: &Value, _: &mut ConstraintValidatorContext) -> Result<bool, PredicateError> {
        Ok(!value.is_null())
    }
}

/// Accepts only `Null`.
#[derive(Debug, Default)]
pub struct NullValidator;

impl ConstraintValidator for NullValidator {
    fn is_valid(&self, value: &Value, _: &mut ConstraintValidatorContext) -> Result<bool, PredicateError> {
        Ok(value.is_null())
    }
}

/// Requires a boolean to equal `expected`.
#[derive(Debug)]
pub struct AssertValidator {
    expected: bool,
}

impl AssertValidator {
    /// Validator for `AssertTrue`.
    pub fn assert_true() -> Self {
        Self { expected: true }
    }

    /// Validator for `AssertFalse`.
    pub fn assert_false() -> Self {
        Self { expected: false }
    }
}

impl ConstraintValidator for AssertValidator {
    fn is_valid(&self, value: &Value, _: &mut ConstraintValidatorContext) -> Result<bool, PredicateError> {
        match value {
            Value::Null => Ok(true),
            Value::Bool(b) => Ok(*b == self.expected),
            other => Err(mismatch("Assert", "a boolean", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Lower,
    Upper,
}

/// Compares a number against the `value` attribute.
#[derive(Debug)]
pub struct BoundValidator {
    bound: Bound,
    limit: i64,
}

impl BoundValidator {
    /// Validator for `Min`.
    pub fn min() -> Self {
        Self {
            bound: Bound::Lower,
            limit: 0,
        }
    }

    /// Validator for `Max`.
    pub fn max() -> Self {
        Self {
            bound: Bound::Upper,
            limit: 0,
        }
    }

    fn name(&self) -> &'static str {
        match self.bound {
            Bound::Lower => "Min",
            Bound::Upper => "Max",
        }
    }
}

impl ConstraintValidator for BoundValidator {
    fn initialize(&mut self, attributes: &ConstraintAttributes) -> Result<(), ConfigError> {
        self.limit = attributes
            .int("value")
            .ok_or_else(|| malformed(self.name(), "missing integral attribute 'value'"))?;
        Ok(())
    }

    fn is_valid(&self, value: &Value, _: &mut ConstraintValidatorContext) -> Result<bool, PredicateError> {
        let ordering = match value {
            Value::Null => return Ok(true),
            Value::Int(i) => i.cmp(&self.limit),
            Value::Float(x) => match x.partial_cmp(&(self.limit as f64)) {
                Some(ordering) => ordering,
                None => return Ok(false),
            },
            other => return Err(mismatch(self.name(), "a number", other)),
        };
        Ok(match self.bound {
            Bound::Lower => ordering.is_ge(),
            Bound::Upper => ordering.is_le(),
        })
    }
}

/// Checks the length of a string or the size of a container against `min`
/// and `max`.
#[derive(Debug)]
pub struct SizeValidator {
    min: i64,
    max: i64,
}

impl Default for SizeValidator {
    fn default() -> Self {
        Self {
            min: 0,
            max: SIZE_MAX,
        }
    }
}

impl ConstraintValidator for SizeValidator {
    fn initialize(&mut self, attributes: &ConstraintAttributes) -> Result<(), ConfigError> {
        self.min = attributes.int("min").unwrap_or(0);
        self.max = attributes.int("max").unwrap_or(SIZE_MAX);
        if self.min < 0 {
            return Err(malformed("Size", "the min parameter cannot be negative"));
        }
        if self.max < 0 {
            return Err(malformed("Size", "the max parameter cannot be negative"));
        }
        if self.max < self.min {
            return Err(malformed("Size", "the length cannot be negative"));
        }
        Ok(())
    }

    fn is_valid(&self, value: &Value, _: &mut ConstraintValidatorContext) -> Result<bool, PredicateError> {
        if value.is_null() {
            return Ok(true);
        }
        let len = value
            .len()
            .ok_or_else(|| mismatch("Size", "a string or a container", value))?;
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        Ok(len >= self.min && len <= self.max)
    }
}

/// Requires a string to match the `regexp` attribute in full.
///
/// The optional `flags` attribute accepts `CASE_INSENSITIVE`, `MULTILINE`
/// and `DOTALL`.
#[derive(Debug, Default)]
pub struct PatternValidator {
    regex: Option<Regex>,
}

impl ConstraintValidator for PatternValidator {
    fn initialize(&mut self, attributes: &ConstraintAttributes) -> Result<(), ConfigError> {
        let pattern = attributes
            .string("regexp")
            .ok_or_else(|| malformed("Pattern", "missing attribute 'regexp'"))?;

        let mut builder = RegexBuilder::new(&format!("^(?:{})$", pattern));
        if let Some(super::AttributeValue::List(flags)) = attributes.get("flags") {
            for flag in flags {
                match flag.to_string().as_str() {
                    "CASE_INSENSITIVE" => builder.case_insensitive(true),
                    "MULTILINE" => builder.multi_line(true),
                    "DOTALL" => builder.dot_matches_new_line(true),
                    other => return Err(malformed("Pattern", format!("unknown flag '{}'", other))),
                };
            }
        }
        let regex = builder
            .build()
            .map_err(|e| malformed("Pattern", format!("invalid regular expression: {}", e)))?;
        self.regex = Some(regex);
        Ok(())
    }

    fn is_valid(&self, value: &Value, _: &mut ConstraintValidatorContext) -> Result<bool, PredicateError> {
        let Some(regex) = &self.regex else {
            return Err(PredicateError::new("Pattern validator used before initialization"));
        };
        match value {
            Value::Null => Ok(true),
            Value::String(s) => Ok(regex.is_match(s)),
            other => Err(mismatch("Pattern", "a string", other)),
        }
    }
}

/// Requires a well-formed email address.
#[derive(Debug, Default)]
pub struct EmailValidator {
    regex: Option<Regex>,
}

impl ConstraintValidator for EmailValidator {
    fn initialize(&mut self, _: &ConstraintAttributes) -> Result<(), ConfigError> {
        let regex = Regex::new(EMAIL_PATTERN)
            .map_err(|e| malformed("Email", format!("invalid regular expression: {}", e)))?;
        self.regex = Some(regex);
        Ok(())
    }

    fn is_valid(&self, value: &Value, _: &mut ConstraintValidatorContext) -> Result<bool, PredicateError> {
        let Some(regex) = &self.regex else {
            return Err(PredicateError::new("Email validator used before initialization"));
        };
        match value {
            Value::Null => Ok(true),
            Value::String(s) if s.is_empty() => Ok(true),
            Value::String(s) => Ok(regex.is_match(s)),
            other => Err(mismatch("Email", "a string", other)),
        }
    }
}

/// Requires a string with at least one non-whitespace character.
#[derive(Debug, Default)]
pub struct NotBlankValidator;

impl ConstraintValidator for NotBlankValidator {
    fn is_valid(&self, value: &Value, _: &mut ConstraintValidatorContext) -> Result<bool, PredicateError> {
        match value {
            Value::Null => Ok(false),
            Value::String(s) => Ok(!s.trim().is_empty()),
            other => Err(mismatch("NotBlank", "a string", other)),
        }
    }
}

/// The built-in constraint definitions.
pub fn definitions() -> Vec<ConstraintDefinition> {
    use names::*;

    vec![
        ConstraintDefinition::new("NotNull")
            .validator(ValidatorCandidate::of::<NotNullValidator>(OBJECT)),
        ConstraintDefinition::new("Null").validator(ValidatorCandidate::of::<NullValidator>(OBJECT)),
        ConstraintDefinition::new("AssertTrue").validator(ValidatorCandidate::new(
            "AssertTrueValidator",
            BOOLEAN,
            AssertValidator::assert_true,
        )),
        ConstraintDefinition::new("AssertFalse").validator(ValidatorCandidate::new(
            "AssertFalseValidator",
            BOOLEAN,
            AssertValidator::assert_false,
        )),
        ConstraintDefinition::new("Min").validator(ValidatorCandidate::new(
            "MinValidatorForNumber",
            NUMBER,
            BoundValidator::min,
        )),
        ConstraintDefinition::new("Max").validator(ValidatorCandidate::new(
            "MaxValidatorForNumber",
            NUMBER,
            BoundValidator::max,
        )),
        ConstraintDefinition::new("Size")
            .default_attr("min", 0)
            .default_attr("max", SIZE_MAX)
            .validator(ValidatorCandidate::new(
                "SizeValidatorForCharSequence",
                CHAR_SEQUENCE,
                SizeValidator::default,
            ))
            .validator(ValidatorCandidate::new(
                "SizeValidatorForCollection",
                COLLECTION,
                SizeValidator::default,
            ))
            .validator(ValidatorCandidate::new(
                "SizeValidatorForMap",
                MAP,
                SizeValidator::default,
            ))
            .validator(ValidatorCandidate::new(
                "SizeValidatorForArray",
                ARRAY,
                SizeValidator::default,
            )),
        ConstraintDefinition::new("Pattern")
            .default_attr("flags", super::AttributeValue::List(Vec::new()))
            .validator(ValidatorCandidate::of::<PatternValidator>(CHAR_SEQUENCE)),
        ConstraintDefinition::new("Email")
            .validator(ValidatorCandidate::of::<EmailValidator>(CHAR_SEQUENCE)),
        ConstraintDefinition::new("NotBlank")
            .validator(ValidatorCandidate::of::<NotBlankValidator>(CHAR_SEQUENCE)),
        ConstraintDefinition::new("NotEmpty")
            .composed_of(ConstraintDeclaration::new("NotNull"))
            .composed_of(ConstraintDeclaration::new("Size").attr("min", 1))
            .report_as_single_violation(),
    ]
}
