//! Tests for traversable resolvers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use beanval::declaration::{
    BeanDeclaration, ConstraintDeclaration, DeclarationRegistry, PropertyDeclaration,
};
use beanval::error::ResolverError;
use beanval::traversable::{TraversableRequest, TraversableResolver};
use beanval::types::{TypeInfo, TypeSystem};
use beanval::{DynBean, ValidationError, Validator, ValidatorBuilder, Value};

fn builder() -> ValidatorBuilder {
    let mut types = TypeSystem::new();
    types
        .register_all([TypeInfo::class("Order"), TypeInfo::class("Customer")])
        .unwrap();
    let declarations = DeclarationRegistry::new()
        .with(
            BeanDeclaration::new("Order")
                .property(
                    PropertyDeclaration::field("number", "String")
                        .constraint(ConstraintDeclaration::new("NotNull"))
                        .constraint(ConstraintDeclaration::new("Size").attr("min", 3)),
                )
                .property(PropertyDeclaration::field("customer", "Customer").cascade()),
        )
        .unwrap()
        .with(
            BeanDeclaration::new("Customer").property(
                PropertyDeclaration::field("name", "String")
                    .constraint(ConstraintDeclaration::new("NotNull")),
            ),
        )
        .unwrap();
    ValidatorBuilder::new()
        .with_type_system(types)
        .with_declarations(declarations)
}

fn order() -> Value {
    DynBean::new("Order")
        .with("number", "x")
        .with(
            "customer",
            DynBean::new("Customer").with("name", Value::Null).into_value(),
        )
        .into_value()
}

fn paths(validator: &Validator) -> Vec<String> {
    validator
        .validate(&order(), &[])
        .unwrap()
        .violations()
        .iter()
        .map(|v| v.path.to_string())
        .collect()
}

#[test]
fn test_default_resolver_allows_everything() {
    assert_eq!(paths(&builder().build()), vec!["number", "customer.name"]);
}

fn skip_number(request: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
    Ok(request.node.name() != Some("number"))
}

fn failing(_: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
    Err("lazy boundary".into())
}

#[test]
fn test_unreachable_property_is_skipped() {
    let validator = builder().with_traversable_resolver(skip_number).build();
    assert_eq!(paths(&validator), vec!["customer.name"]);
}

struct NoCascade;

impl TraversableResolver for NoCascade {
    fn is_reachable(&self, _request: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
        Ok(true)
    }

    fn is_cascadable(&self, request: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
        Ok(request.node.name() != Some("customer"))
    }
}

#[test]
fn test_non_cascadable_property_is_not_entered() {
    let validator = builder().with_traversable_resolver(NoCascade).build();
    assert_eq!(paths(&validator), vec!["number"]);
}

struct NumberNotCascadable;

impl TraversableResolver for NumberNotCascadable {
    fn is_reachable(&self, _request: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
        Ok(true)
    }

    fn is_cascadable(&self, request: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
        Ok(request.node.name() != Some("number"))
    }
}

#[test]
fn test_non_cascadable_property_constraints_are_skipped() {
    let validator = builder().with_traversable_resolver(NumberNotCascadable).build();
    assert_eq!(paths(&validator), vec!["customer.name"]);
}

#[test]
fn test_resolver_error_aborts_validation() {
    let validator = builder().with_traversable_resolver(failing).build();

    match validator.validate(&order(), &[]) {
        Err(ValidationError::TraversableResolver {
            operation, source, ..
        }) => {
            assert_eq!(operation, "is_reachable");
            assert_eq!(source.to_string(), "lazy boundary");
        }
        other => panic!("expected resolver error, got {:?}", other.map(|r| r.len())),
    }
}

#[derive(Default)]
struct Recording {
    reachable_calls: AtomicUsize,
    requests: Mutex<Vec<(String, String, Option<String>)>>,
}

struct Recorder(Arc<Recording>);

impl TraversableResolver for Recorder {
    fn is_reachable(&self, request: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
        self.0.reachable_calls.fetch_add(1, Ordering::SeqCst);
        self.0.requests.lock().unwrap().push((
            request.path_to_bean.to_string(),
            request.node.name().unwrap_or_default().to_string(),
            request.root_type.map(|t| t.to_string()),
        ));
        Ok(true)
    }

    fn is_cascadable(&self, _request: &TraversableRequest<'_>) -> Result<bool, ResolverError> {
        Ok(true)
    }
}

#[test]
fn test_answers_are_cached_per_call() {
    let recording = Arc::new(Recording::default());
    let validator = builder()
        .with_traversable_resolver(Recorder(Arc::clone(&recording)))
        .build();

    validator.validate(&order(), &[]).unwrap();
    // number (asked once for both constraints), customer, customer.name
    assert_eq!(recording.reachable_calls.load(Ordering::SeqCst), 3);

    validator.validate(&order(), &[]).unwrap();
    assert_eq!(recording.reachable_calls.load(Ordering::SeqCst), 6);
}

#[test]
fn test_request_describes_the_property() {
    let recording = Arc::new(Recording::default());
    let validator = builder()
        .with_traversable_resolver(Recorder(Arc::clone(&recording)))
        .build();
    validator.validate(&order(), &[]).unwrap();

    let requests = recording.requests.lock().unwrap();
    let order_type = Some("Order".to_string());
    assert_eq!(
        *requests,
        vec![
            (String::new(), "number".to_string(), order_type.clone()),
            (String::new(), "customer".to_string(), order_type.clone()),
            ("customer".to_string(), "name".to_string(), order_type),
        ]
    );
}
