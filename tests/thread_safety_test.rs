//! Tests for sharing one validator across threads.

use beanval::declaration::{
    BeanDeclaration, ConstraintDeclaration, DeclarationRegistry, PropertyDeclaration,
};
use beanval::types::{TypeInfo, TypeRef, TypeSystem};
use beanval::{DynBean, Validator, ValidatorBuilder, Value};
use std::sync::Arc;
use std::thread;

fn validator() -> Validator {
    let mut types = TypeSystem::new();
    types
        .register_all([TypeInfo::class("User"), TypeInfo::class("Team")])
        .unwrap();
    let declarations = DeclarationRegistry::new()
        .with(
            BeanDeclaration::new("User")
                .property(
                    PropertyDeclaration::field("name", "String")
                        .constraint(ConstraintDeclaration::new("NotBlank")),
                )
                .property(
                    PropertyDeclaration::field("age", "Integer")
                        .constraint(ConstraintDeclaration::new("Min").attr("value", 0)),
                ),
        )
        .unwrap()
        .with(BeanDeclaration::new("Team").property(
            PropertyDeclaration::field("members", TypeRef::list_of("User".into())).cascade(),
        ))
        .unwrap();
    ValidatorBuilder::new()
        .with_type_system(types)
        .with_declarations(declarations)
        .build()
}

fn user(name: &str, age: i64) -> Value {
    DynBean::new("User")
        .with("name", name)
        .with("age", age)
        .into_value()
}

#[test]
fn test_concurrent_validation() {
    let validator = Arc::new(validator());

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let validator = Arc::clone(&validator);
            thread::spawn(move || {
                let age = if i % 2 == 0 { 20 + i } else { -i };
                let results = validator.validate(&user("Ann", age), &[]).unwrap();
                assert_eq!(results.is_empty(), i % 2 == 0);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_metadata_build() {
    let validator = Arc::new(validator());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let validator = Arc::clone(&validator);
            thread::spawn(move || validator.meta_bean("Team").unwrap())
        })
        .collect();

    let metas: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let cached = validator.meta_bean("Team").unwrap();
    assert!(metas.iter().all(|m| Arc::ptr_eq(m, &cached)));
}

#[test]
fn test_clones_share_metadata() {
    let validator = validator();
    let clone = validator.clone();

    let handle = thread::spawn(move || {
        let violations = clone.validate(&user("", 1), &[]).unwrap().len();
        (violations, clone.meta_bean("User").unwrap())
    });
    let (violations, meta) = handle.join().unwrap();
    assert_eq!(violations, 1);
    assert!(Arc::ptr_eq(&meta, &validator.meta_bean("User").unwrap()));
}

#[test]
fn test_validate_batch_keeps_order() {
    let validator = validator();
    let roots: Vec<Value> = (0..50)
        .map(|i| {
            let name = if i % 5 == 0 { " " } else { "Bob" };
            let members = Value::List(vec![user("Ann", 30), user(name, 40)]);
            DynBean::new("Team").with("members", members).into_value()
        })
        .collect();

    let results = validator.validate_batch(&roots, &[]);
    assert_eq!(results.len(), 50);
    for (i, result) in results.iter().enumerate() {
        let result = result.as_ref().unwrap();
        if i % 5 == 0 {
            assert_eq!(result.len(), 1);
            assert_eq!(result.violations()[0].path.to_string(), "members[1].name");
        } else {
            assert!(result.is_empty());
        }
    }
}

#[test]
fn test_batch_reports_errors_per_root() {
    let validator = validator();
    let results = validator.validate_batch(&[user("Ann", 1), Value::Null], &[]);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}
