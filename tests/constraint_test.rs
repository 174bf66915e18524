//! Tests for constraint evaluation: composition, custom validators,
//! validator resolution and messages.

use beanval::constraint::{
    ConstraintCatalog, ConstraintDefinition, ConstraintValidator, ConstraintValidatorContext,
    ValidatorCandidate,
};
use beanval::declaration::{
    BeanDeclaration, ConstraintDeclaration, DeclarationRegistry, PropertyDeclaration,
};
use beanval::error::ConfigError;
use beanval::interpolation::{MessageContext, MessageInterpolator};
use beanval::types::{TypeInfo, TypeSystem};
use beanval::{
    Bean, DynBean, PredicateError, ValidationError, ValidationResults, Validator, ValidatorBuilder,
    Value,
};

struct PasswordsMatch;

impl ConstraintValidator for PasswordsMatch {
    fn is_valid(
        &self,
        value: &Value,
        context: &mut ConstraintValidatorContext,
    ) -> Result<bool, PredicateError> {
        let Some(bean) = value.as_bean() else {
            return Ok(true);
        };
        if bean.field("password") == bean.field("confirm") {
            return Ok(true);
        }
        context.disable_default_violation();
        context.add_property_violation("passwords do not match", "confirm");
        Ok(false)
    }
}

fn catalog() -> ConstraintCatalog {
    ConstraintCatalog::with_builtins()
        .with(
            ConstraintDefinition::new("ZipCode")
                .message("invalid zip code")
                .composed_of(ConstraintDeclaration::new("NotNull"))
                .composed_of(ConstraintDeclaration::new("Pattern").attr("regexp", "[0-9]{5}")),
        )
        .unwrap()
        .with(
            ConstraintDefinition::new("Bounded")
                .default_attr("length", 10)
                .composed_of(ConstraintDeclaration::new("Size"))
                .override_attribute("length", "Size", "max"),
        )
        .unwrap()
        .with(
            ConstraintDefinition::new("PasswordsMatch")
                .message("passwords differ")
                .validator(ValidatorCandidate::new(
                    "PasswordsMatchValidator",
                    "Account",
                    || PasswordsMatch,
                )),
        )
        .unwrap()
        .with(
            ConstraintDefinition::new("Exploding").validator(ValidatorCandidate::from_fn(
                "ExplodingValidator",
                "Object",
                |_, _| Err(PredicateError::new("boom")),
            )),
        )
        .unwrap()
        .with(
            ConstraintDefinition::new("Picky")
                .message("picky")
                .validator(ValidatorCandidate::from_fn("AnyValidator", "Object", |_, _| Ok(false)))
                .validator(ValidatorCandidate::from_fn("StringValidator", "String", |v, _| {
                    Ok(v.as_str() != Some("bad"))
                })),
        )
        .unwrap()
        .with(
            ConstraintDefinition::new("Ambiguous")
                .validator(ValidatorCandidate::from_fn("ForText", "CharSequence", |_, _| Ok(true)))
                .validator(ValidatorCandidate::from_fn("ForComparable", "Comparable", |_, _| {
                    Ok(true)
                })),
        )
        .unwrap()
}

fn types() -> TypeSystem {
    let mut types = TypeSystem::new();
    types
        .register_all([TypeInfo::class("Account"), TypeInfo::class("Holder")])
        .unwrap();
    types
}

fn validator_for(account: BeanDeclaration) -> Validator {
    ValidatorBuilder::new()
        .with_type_system(types())
        .with_catalog(catalog())
        .with_declarations(DeclarationRegistry::new().with(account).unwrap())
        .build()
}

fn string_property(constraint: ConstraintDeclaration) -> Validator {
    validator_for(
        BeanDeclaration::new("Account")
            .property(PropertyDeclaration::field("name", "String").constraint(constraint)),
    )
}

fn account(name: impl Into<Value>) -> Value {
    DynBean::new("Account").with("name", name).into_value()
}

fn run(validator: &Validator, root: &Value) -> ValidationResults {
    validator.validate(root, &[]).unwrap()
}

#[test]
fn test_not_empty_reports_a_single_violation() {
    let validator = string_property(ConstraintDeclaration::new("NotEmpty"));

    for value in [Value::Null, Value::from("")] {
        let results = run(&validator, &account(value));
        assert_eq!(results.len(), 1);
        let violation = &results.violations()[0];
        assert_eq!(violation.message, "may not be empty");
        assert_eq!(violation.constraint_name(), Some("NotEmpty"));
    }
    assert!(run(&validator, &account("x")).is_empty());
}

#[test]
fn test_composing_constraints_report_individually() {
    let validator = string_property(ConstraintDeclaration::new("ZipCode"));

    let results = run(&validator, &account(Value::Null));
    let messages: Vec<_> = results.violations().iter().map(|v| v.message.as_str()).collect();
    assert_eq!(messages, vec!["may not be null"]);

    let results = run(&validator, &account("abc"));
    let messages: Vec<_> = results.violations().iter().map(|v| v.message.as_str()).collect();
    assert_eq!(messages, vec!["must match \"[0-9]{5}\""]);
}

#[test]
fn test_attribute_override_reaches_composing_constraint() {
    let validator = string_property(ConstraintDeclaration::new("Bounded").attr("length", 3));
    let results = run(&validator, &account("abcd"));
    assert_eq!(results.len(), 1);
    assert_eq!(results.violations()[0].message, "size must be between 0 and 3");

    let validator = string_property(ConstraintDeclaration::new("Bounded"));
    assert!(run(&validator, &account("abcd")).is_empty());
}

#[test]
fn test_custom_violation_replaces_default() {
    let validator = validator_for(
        BeanDeclaration::new("Account").constraint(ConstraintDeclaration::new("PasswordsMatch")),
    );
    let root = DynBean::new("Account")
        .with("password", "secret")
        .with("confirm", "secrte")
        .into_value();

    let results = run(&validator, &root);
    assert_eq!(results.len(), 1);
    let violation = &results.violations()[0];
    assert_eq!(violation.message, "passwords do not match");
    assert_eq!(violation.path.to_string(), "confirm");
    assert_eq!(violation.property.as_deref(), Some("confirm"));
    assert_eq!(violation.invalid_value, root);
    assert!(results.by_reason("passwords differ").is_empty());
}

#[test]
fn test_predicate_error_aborts_validation() {
    let validator = string_property(ConstraintDeclaration::new("Exploding"));
    match validator.validate(&account("x"), &[]) {
        Err(ValidationError::Predicate {
            constraint,
            validator,
            path,
            source,
        }) => {
            assert_eq!(constraint, "Exploding");
            assert_eq!(validator, "ExplodingValidator");
            assert_eq!(path, "name");
            assert_eq!(source.message, "boom");
        }
        other => panic!("expected predicate error, got {:?}", other.map(|r| r.len())),
    }
}

#[test]
fn test_most_specific_validator_wins() {
    let validator = string_property(ConstraintDeclaration::new("Picky"));
    assert!(run(&validator, &account("fine")).is_empty());
    assert_eq!(run(&validator, &account("bad")).len(), 1);
}

#[test]
fn test_ambiguous_validators() {
    let validator = string_property(ConstraintDeclaration::new("Ambiguous"));
    match validator.validate(&account("x"), &[]) {
        Err(ValidationError::Config(ConfigError::AmbiguousValidators { candidates, .. })) => {
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("expected ambiguity, got {:?}", other.map(|r| r.len())),
    }
}

#[test]
fn test_no_validator_for_type() {
    let validator = validator_for(BeanDeclaration::new("Account").property(
        PropertyDeclaration::field("age", "Integer")
            .constraint(ConstraintDeclaration::new("Pattern").attr("regexp", "x")),
    ));
    let root = DynBean::new("Account").with("age", 3).into_value();
    assert!(matches!(
        validator.validate(&root, &[]),
        Err(ValidationError::Config(ConfigError::NoValidatorForType { .. }))
    ));
}

#[test]
fn test_unknown_constraint_and_bad_attributes() {
    let validator = string_property(ConstraintDeclaration::new("Missing"));
    assert!(matches!(
        validator.validate(&account("x"), &[]),
        Err(ValidationError::Config(ConfigError::UnknownConstraint(_)))
    ));

    let validator = string_property(ConstraintDeclaration::new("Size").attr("min", -1));
    assert!(matches!(
        validator.validate(&account("x"), &[]),
        Err(ValidationError::Config(_))
    ));
}

#[test]
fn test_null_is_valid_for_most_constraints() {
    let validator = validator_for(
        BeanDeclaration::new("Account")
            .property(
                PropertyDeclaration::field("name", "String")
                    .constraint(ConstraintDeclaration::new("Size").attr("min", 2))
                    .constraint(ConstraintDeclaration::new("Email")),
            )
            .property(
                PropertyDeclaration::field("age", "Integer")
                    .constraint(ConstraintDeclaration::new("Min").attr("value", 18)),
            ),
    );
    let root = DynBean::new("Account")
        .with("name", Value::Null)
        .with("age", Value::Null)
        .into_value();
    assert!(run(&validator, &root).is_empty());
}

#[test]
fn test_declared_message_is_interpolated() {
    let validator = validator_for(BeanDeclaration::new("Account").property(
        PropertyDeclaration::field("age", "Integer").constraint(
            ConstraintDeclaration::new("Min")
                .attr("value", 18)
                .message("${validatedValue} is below {value}"),
        ),
    ));
    let root = DynBean::new("Account").with("age", 12).into_value();

    let results = run(&validator, &root);
    assert_eq!(results.violations()[0].message, "12 is below 18");
    assert_eq!(
        results.violations()[0].message_template,
        "${validatedValue} is below {value}"
    );
}

struct Shouting;

impl MessageInterpolator for Shouting {
    fn interpolate(&self, template: &str, context: &MessageContext<'_>) -> String {
        format!("{}: {}", context.descriptor.constraint, template.to_uppercase())
    }
}

#[test]
fn test_custom_message_interpolator() {
    let validator = ValidatorBuilder::new()
        .with_type_system(types())
        .with_declarations(
            DeclarationRegistry::new()
                .with(BeanDeclaration::new("Account").property(
                    PropertyDeclaration::field("name", "String")
                        .constraint(ConstraintDeclaration::new("NotNull").message("required")),
                ))
                .unwrap(),
        )
        .with_message_interpolator(Shouting)
        .build();

    let results = run(&validator, &account(Value::Null));
    assert_eq!(results.violations()[0].message, "NotNull: REQUIRED");
}
