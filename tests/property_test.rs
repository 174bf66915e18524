//! Tests for property-level and value-level validation.

use beanval::declaration::{
    BeanDeclaration, ConstraintDeclaration, DeclarationRegistry, PropertyDeclaration,
};
use beanval::types::{TypeInfo, TypeRef, TypeSystem};
use beanval::value::EnumValue;
use beanval::{DynBean, Group, ValidationError, Validator, ValidatorBuilder, Value};

fn validator() -> Validator {
    let mut types = TypeSystem::new();
    types
        .register_all([
            TypeInfo::interface("Strict"),
            TypeInfo::enumeration("Kind", ["HOME", "WORK"]),
            TypeInfo::class("Address"),
            TypeInfo::class("Person"),
        ])
        .unwrap();

    let declarations = DeclarationRegistry::new()
        .with(
            BeanDeclaration::new("Address").property(
                PropertyDeclaration::field("zip", "String")
                    .constraint(ConstraintDeclaration::new("Pattern").attr("regexp", "[0-9]{5}")),
            ),
        )
        .unwrap()
        .with(
            BeanDeclaration::new("Person")
                .property(
                    PropertyDeclaration::field("name", "String")
                        .constraint(ConstraintDeclaration::new("NotNull"))
                        .constraint(ConstraintDeclaration::new("Size").attr("min", 2))
                        .constraint(ConstraintDeclaration::new("Email").group("Strict")),
                )
                .property(
                    PropertyDeclaration::field("addresses", TypeRef::list_of("Address".into()))
                        .cascade(),
                )
                .property(
                    PropertyDeclaration::field(
                        "contacts",
                        TypeRef::map_of("Kind".into(), "Address".into()),
                    )
                    .cascade(),
                )
                .property(PropertyDeclaration::field("friend", "Person").cascade()),
        )
        .unwrap();

    ValidatorBuilder::new()
        .with_type_system(types)
        .with_declarations(declarations)
        .build()
}

fn address(zip: &str) -> Value {
    DynBean::new("Address").with("zip", zip).into_value()
}

fn person() -> Value {
    DynBean::new("Person")
        .with("name", "A")
        .with("addresses", Value::List(vec![address("bad"), address("worse")]))
        .with(
            "contacts",
            Value::map([(EnumValue::new("Kind", "HOME"), address("nope"))]),
        )
        .with("friend", Value::Null)
        .into_value()
}

fn paths(result: Result<beanval::ValidationResults, ValidationError>) -> Vec<String> {
    result
        .unwrap()
        .violations()
        .iter()
        .map(|v| v.path.to_string())
        .collect()
}

#[test]
fn test_validates_only_the_named_property() {
    let got = paths(validator().validate_property(&person(), "name", &[]));
    assert_eq!(got, vec!["name"]);
}

#[test]
fn test_navigates_into_list_elements() {
    let got = paths(validator().validate_property(&person(), "addresses[1].zip", &[]));
    assert_eq!(got, vec!["addresses[1].zip"]);
}

#[test]
fn test_navigates_into_enum_keyed_maps() {
    let got = paths(validator().validate_property(&person(), "contacts[HOME].zip", &[]));
    assert_eq!(got, vec!["contacts[HOME].zip"]);
}

#[test]
fn test_null_on_the_way_yields_nothing() {
    assert!(paths(validator().validate_property(&person(), "friend.name", &[])).is_empty());
}

#[test]
fn test_property_groups() {
    let validator = validator();
    let results = validator
        .validate_property(&person(), "name", &[Group::from("Strict")])
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results.violations()[0].constraint_name(), Some("Email"));
}

#[test]
fn test_property_errors() {
    let validator = validator();
    assert!(matches!(
        validator.validate_property(&person(), "nickname", &[]),
        Err(ValidationError::UnknownProperty { .. })
    ));
    assert!(matches!(
        validator.validate_property(&person(), "addresses[", &[]),
        Err(ValidationError::InvalidPath(_))
    ));
    assert!(matches!(
        validator.validate_property(&Value::Null, "name", &[]),
        Err(ValidationError::NullRoot)
    ));
}

#[test]
fn test_validate_value_without_instance() {
    let results = validator()
        .validate_value("Person", "name", Value::from("A"), &[])
        .unwrap();
    assert_eq!(results.len(), 1);
    let violation = &results.violations()[0];
    assert_eq!(violation.path.to_string(), "name");
    assert_eq!(violation.invalid_value, Value::from("A"));
    assert_eq!(violation.root_type.as_ref().map(|t| t.name()), Some("Person"));
    assert!(violation.leaf_bean.is_none());

    let results = validator()
        .validate_value("Person", "name", Value::from("Alice"), &[])
        .unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_validate_value_unknown_property() {
    assert!(matches!(
        validator().validate_value("Person", "age", Value::from(3), &[]),
        Err(ValidationError::UnknownProperty { .. })
    ));
}
