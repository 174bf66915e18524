//! Tests for cascaded validation across object graphs.

use std::sync::Arc;

use beanval::declaration::{
    BeanDeclaration, ConstraintDeclaration, DeclarationRegistry, PropertyDeclaration,
};
use beanval::types::{TypeInfo, TypeRef, TypeSystem};
use beanval::value::{BeanId, MapKey};
use beanval::{DynBean, Validator, ValidatorBuilder, Value};

fn types() -> TypeSystem {
    let mut types = TypeSystem::new();
    types
        .register_all([
            TypeInfo::class("Address"),
            TypeInfo::class("Person"),
            TypeInfo::interface("Pet"),
            TypeInfo::class("Dog").implements("Pet"),
            TypeInfo::class("Cat").implements("Pet"),
        ])
        .unwrap();
    types
}

fn declarations() -> DeclarationRegistry {
    DeclarationRegistry::new()
        .with(
            BeanDeclaration::new("Address").property(
                PropertyDeclaration::field("zip", "String")
                    .constraint(ConstraintDeclaration::new("NotNull"))
                    .constraint(ConstraintDeclaration::new("Pattern").attr("regexp", "[0-9]{5}")),
            ),
        )
        .unwrap()
        .with(
            BeanDeclaration::new("Person")
                .property(
                    PropertyDeclaration::field("name", "String")
                        .constraint(ConstraintDeclaration::new("NotNull")),
                )
                .property(
                    PropertyDeclaration::field("addresses", TypeRef::list_of("Address".into()))
                        .cascade(),
                )
                .property(
                    PropertyDeclaration::field(
                        "contacts",
                        TypeRef::map_of("String".into(), "Address".into()),
                    )
                    .cascade(),
                )
                .property(
                    PropertyDeclaration::field("tags", TypeRef::set_of("Address".into())).cascade(),
                )
                .property(PropertyDeclaration::field("friend", "Person").cascade())
                .property(PropertyDeclaration::field("pets", "List").cascade()),
        )
        .unwrap()
        .with(
            BeanDeclaration::new("Dog").property(
                PropertyDeclaration::field("barks", "Boolean")
                    .constraint(ConstraintDeclaration::new("AssertTrue")),
            ),
        )
        .unwrap()
        .with(
            BeanDeclaration::new("Cat").property(
                PropertyDeclaration::field("lives", "Integer")
                    .constraint(ConstraintDeclaration::new("Max").attr("value", 9)),
            ),
        )
        .unwrap()
}

fn validator() -> Validator {
    ValidatorBuilder::new()
        .with_type_system(types())
        .with_declarations(declarations())
        .build()
}

fn address(zip: Option<&str>) -> Value {
    DynBean::new("Address").with("zip", zip).into_value()
}

fn person(name: &str) -> DynBean {
    DynBean::new("Person")
        .with("name", name)
        .with("addresses", Value::Null)
        .with("contacts", Value::Null)
        .with("tags", Value::Null)
        .with("friend", Value::Null)
        .with("pets", Value::Null)
}

fn paths(validator: &Validator, root: &Value) -> Vec<String> {
    validator
        .validate(root, &[])
        .unwrap()
        .violations()
        .iter()
        .map(|v| v.path.to_string())
        .collect()
}

#[test]
fn test_list_element_path() {
    let bad = address(Some("abc"));
    let root = person("Ann")
        .with(
            "addresses",
            Value::List(vec![address(Some("12345")), address(Some("54321")), bad.clone()]),
        )
        .into_value();

    let results = validator().validate(&root, &[]).unwrap();
    assert_eq!(results.len(), 1);
    let violation = &results.violations()[0];
    assert_eq!(violation.path.to_string(), "addresses[2].zip");
    assert_eq!(violation.property.as_deref(), Some("zip"));
    assert_eq!(violation.invalid_value, Value::from("abc"));
    assert_eq!(violation.leaf_bean_id(), bad.bean_id());
    assert_eq!(violation.message, "must match \"[0-9]{5}\"");
}

#[test]
fn test_map_value_path_and_keys_not_validated() {
    let root = person("Ann")
        .with(
            "contacts",
            Value::map([
                ("home", address(None)),
                ("work", address(Some("12345"))),
                ("old", Value::Null),
            ]),
        )
        .into_value();

    assert_eq!(paths(&validator(), &root), vec!["contacts[home].zip"]);
}

#[test]
fn test_set_elements_have_no_index() {
    let root = person("Ann")
        .with("tags", Value::Set(vec![address(Some("x"))]))
        .into_value();

    assert_eq!(paths(&validator(), &root), vec!["tags[].zip"]);
}

#[test]
fn test_root_collection() {
    let root = Value::List(vec![address(Some("12345")), address(None)]);
    assert_eq!(paths(&validator(), &root), vec!["[1].zip"]);

    let root = Value::map([(MapKey::Int(7), address(None))]);
    assert_eq!(paths(&validator(), &root), vec!["[7].zip"]);
}

#[test]
fn test_null_elements_are_skipped() {
    let root = person("Ann")
        .with("addresses", Value::List(vec![Value::Null, address(Some("1"))]))
        .into_value();

    assert_eq!(paths(&validator(), &root), vec!["addresses[1].zip"]);
}

#[test]
fn test_cycle_terminates_and_visits_each_bean_once() {
    let a = Arc::new(person("Ann").with("name", Value::Null));
    let b = Arc::new(person("Bob").with("name", Value::Null));
    a.set("friend", b.clone());
    b.set("friend", a.clone());

    let root = Value::from(a);
    assert_eq!(paths(&validator(), &root), vec!["name", "friend.name"]);
}

#[test]
fn test_self_reference() {
    let me = Arc::new(person("Ann").with("name", Value::Null));
    me.set("friend", me.clone());

    let results = validator().validate(&Value::from(me), &[]).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results.violations()[0].path.to_string(), "name");
}

#[test]
fn test_shared_instance_is_validated_once() {
    let shared = address(None);
    let root = person("Ann")
        .with("addresses", Value::List(vec![shared.clone(), shared.clone()]))
        .with("contacts", Value::map([("home", shared)]))
        .into_value();

    assert_eq!(paths(&validator(), &root), vec!["addresses[0].zip"]);
}

#[test]
fn test_dynamic_cascade_uses_runtime_type() {
    let root = person("Ann")
        .with(
            "pets",
            Value::List(vec![
                DynBean::new("Dog").with("barks", false).into_value(),
                DynBean::new("Cat").with("lives", 12).into_value(),
                Value::from("not a bean"),
            ]),
        )
        .into_value();

    let results = validator().validate(&root, &[]).unwrap();
    let mut got: Vec<_> = results
        .violations()
        .iter()
        .map(|v| (v.path.to_string(), v.message.clone()))
        .collect();
    got.sort();
    assert_eq!(
        got,
        vec![
            ("pets[0].barks".to_string(), "must be true".to_string()),
            ("pets[1].lives".to_string(), "must be less than or equal to 9".to_string()),
        ]
    );
}

#[test]
fn test_maps_validated_like_beans() {
    let declarations = DeclarationRegistry::new()
        .with(BeanDeclaration::new("Map").property(
            PropertyDeclaration::field("zip", "String")
                .constraint(ConstraintDeclaration::new("NotNull")),
        ))
        .unwrap();
    let validator = ValidatorBuilder::new()
        .with_declarations(declarations)
        .treat_maps_like_beans(true)
        .build();

    let root = Value::map([("city", Value::from("Springfield"))]);
    let results = validator.validate(&root, &[]).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results.violations()[0].path.to_string(), "zip");
    assert!(results.violations()[0].leaf_bean.is_none());
}

#[test]
fn test_leaf_bean_identity() {
    let first = address(None);
    let second = address(None);
    let root = person("Ann")
        .with("addresses", Value::List(vec![first.clone(), second.clone()]))
        .into_value();

    let results = validator().validate(&root, &[]).unwrap();
    let owners: Vec<Option<BeanId>> = results.violations().iter().map(|v| v.leaf_bean_id()).collect();
    assert_eq!(owners, vec![first.bean_id(), second.bean_id()]);
    assert_eq!(results.by_owner_property(first.bean_id(), Some("zip")).len(), 1);
}
