//! Contract tests for the Binder module.
//!
//! These tests verify the binding resolution contracts:
//! - Parameters are read from the exact enclosing row, in binding order
//! - Rows of the wrong group or shape are rejected
//! - Declared parameter types are enforced per value

use std::sync::Arc;

use nestql::binder::{resolve_binding, resolve_parameters, AncestorScope};
use nestql::catalog::{Catalog, ElementDef, GroupDefinition};
use nestql::row;
use nestql::template::{Binding, TemplateDef};
use nestql::types::{DataType, Value};
use nestql::NestqlError;

/// Creates a catalog with a `region > store > shelf` nesting.
///
/// `shelf` binds the store name, then the region code two levels up.
fn create_test_catalog() -> Catalog {
    let region = GroupDefinition::virtual_group(
        "shop.region",
        vec![
            ElementDef::new("code", DataType::String).unwrap(),
            ElementDef::new("opened", DataType::Date).unwrap(),
        ],
        TemplateDef::uncorrelated("SELECT code, opened FROM region"),
    )
    .unwrap();
    let store = GroupDefinition::virtual_group(
        "shop.store",
        vec![
            ElementDef::new("storeId", DataType::Int64).unwrap(),
            ElementDef::new("storeName", DataType::String).unwrap(),
        ],
        TemplateDef::new(
            "SELECT storeId, storeName FROM store WHERE region = ?",
            vec![Binding::new("shop.region.code")],
        ),
    )
    .unwrap();
    let shelf = GroupDefinition::virtual_group(
        "shop.shelf",
        vec![ElementDef::new("shelfNum", DataType::Int64).unwrap()],
        TemplateDef::new(
            "SELECT shelfNum FROM shelf WHERE store = ? AND region = ? AND since = ?",
            vec![
                Binding::new("shop.store.storeName"),
                Binding::new("shop.region.code"),
                Binding::typed("shop.region.opened", DataType::String),
            ],
        ),
    )
    .unwrap()
    .with_parent("shop.store");

    Catalog::from_definitions(vec![region, store, shelf]).unwrap()
}

fn scope_for(catalog: &Catalog) -> AncestorScope {
    let region = catalog.lookup_group("shop.region").unwrap();
    let store = catalog.lookup_group("shop.store").unwrap();
    AncestorScope::new()
        .child(region, Arc::new(row!["EU", Value::Date(0)]))
        .child(store, Arc::new(row![7, "Central"]))
}

#[test]
fn test_parameters_in_binding_order() {
    let catalog = create_test_catalog();
    let shelf = catalog.lookup_group("shop.shelf").unwrap();
    let template = shelf.template().unwrap();

    let params = resolve_parameters(template, &scope_for(&catalog)).unwrap();
    assert_eq!(
        params,
        vec![
            Value::from("Central"),
            Value::from("EU"),
            Value::from("1970-01-01"),
        ]
    );
}

#[test]
fn test_slot_levels_are_ancestor_distances() {
    let catalog = create_test_catalog();
    let shelf = catalog.lookup_group("shop.shelf").unwrap();
    let levels: Vec<usize> = shelf
        .template()
        .unwrap()
        .slots()
        .iter()
        .map(|s| s.levels_up)
        .collect();
    assert_eq!(levels, vec![0, 1, 1]);
}

#[test]
fn test_uncorrelated_template_needs_no_scope() {
    let catalog = create_test_catalog();
    let region = catalog.lookup_group("shop.region").unwrap();
    let params = resolve_parameters(region.template().unwrap(), &AncestorScope::new()).unwrap();
    assert!(params.is_empty());
}

#[test]
fn test_shallow_scope_rejected() {
    let catalog = create_test_catalog();
    let shelf = catalog.lookup_group("shop.shelf").unwrap();
    let store = catalog.lookup_group("shop.store").unwrap();
    let scope = AncestorScope::new().child(store, Arc::new(row![7, "Central"]));

    let err = resolve_parameters(shelf.template().unwrap(), &scope).unwrap_err();
    assert!(matches!(err, NestqlError::BindingResolutionError(_)));
}

#[test]
fn test_wrong_group_row_rejected() {
    let catalog = create_test_catalog();
    let store = catalog.lookup_group("shop.store").unwrap();
    let region = catalog.lookup_group("shop.region").unwrap();
    let slot = &store.template().unwrap().slots()[0];

    // The slot reads shop.region; a store row must not satisfy it.
    let err = resolve_binding(slot, &row![7, "Central"], &store).unwrap_err();
    assert!(matches!(err, NestqlError::BindingResolutionError(_)));

    let value = resolve_binding(slot, &row!["EU", Value::Date(0)], &region).unwrap();
    assert_eq!(value, Value::from("EU"));
}

#[test]
fn test_row_arity_drift_rejected() {
    let catalog = create_test_catalog();
    let store = catalog.lookup_group("shop.store").unwrap();
    let region = catalog.lookup_group("shop.region").unwrap();
    let slot = &store.template().unwrap().slots()[0];

    let err = resolve_binding(slot, &row!["EU"], &region).unwrap_err();
    assert!(matches!(err, NestqlError::BindingResolutionError(_)));
}

#[test]
fn test_type_mismatch_names_binding() {
    let parent = GroupDefinition::virtual_group(
        "p",
        vec![ElementDef::new("qty", DataType::String).unwrap()],
        TemplateDef::uncorrelated("SELECT qty FROM p"),
    )
    .unwrap();
    let child = GroupDefinition::virtual_group(
        "c",
        vec![ElementDef::new("id", DataType::Int64).unwrap()],
        TemplateDef::new(
            "SELECT id FROM c WHERE qty = ?",
            vec![Binding::typed("p.qty", DataType::Float64)],
        ),
    )
    .unwrap();
    let catalog = Catalog::from_definitions(vec![parent, child]).unwrap();
    let p = catalog.lookup_group("p").unwrap();
    let c = catalog.lookup_group("c").unwrap();
    let slot = &c.template().unwrap().slots()[0];

    assert_eq!(
        resolve_binding(slot, &row!["2.5"], &p).unwrap(),
        Value::Float64(2.5)
    );
    match resolve_binding(slot, &row!["many"], &p).unwrap_err() {
        NestqlError::TypeMismatch {
            expected, detail, ..
        } => {
            assert_eq!(expected, "FLOAT64");
            assert!(detail.contains("p.qty"));
        }
        other => panic!("expected TypeMismatch, got {other}"),
    }
}

#[test]
fn test_scope_path_outermost_first() {
    let catalog = create_test_catalog();
    let scope = scope_for(&catalog);

    assert_eq!(scope.depth(), 2);
    assert_eq!(scope.path(), vec!["shop.region", "shop.store"]);
    assert_eq!(scope.nearest().unwrap().group().name(), "shop.store");
    assert_eq!(scope.frame(1).unwrap().group().name(), "shop.region");
    assert!(scope.frame(2).is_none());
    assert!(scope.contains_group("shop.region"));
    assert!(!scope.contains_group("shop.shelf"));
    assert!(AncestorScope::new().is_empty());
}
