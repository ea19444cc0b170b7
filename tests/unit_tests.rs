//! Unit tests for catalog construction, templates, values and errors.

use nestql::catalog::{Catalog, ElementDef, GroupDefinition, GroupKind};
use nestql::template::{scan_placeholders, split_qualified, Binding, TemplateDef};
use nestql::types::{DataType, Value};
use nestql::NestqlError;

fn element(name: &str, data_type: DataType) -> ElementDef {
    ElementDef::new(name, data_type).expect("valid element")
}

fn items_group() -> GroupDefinition {
    GroupDefinition::virtual_group(
        "xmltest.items",
        vec![
            element("itemNum", DataType::Int64),
            element("itemName", DataType::String),
            element("inStock", DataType::Bool),
        ],
        TemplateDef::uncorrelated("SELECT itemNum, itemName, inStock FROM items"),
    )
    .expect("items group")
}

fn suppliers_group(bindings: Vec<Binding>, query: &str) -> GroupDefinition {
    GroupDefinition::virtual_group(
        "xmltest.suppliers",
        vec![element("supplierNum", DataType::String)],
        TemplateDef::new(query, bindings),
    )
    .expect("suppliers group")
}

// =============================================================================
// Error Tests
// =============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = NestqlError::CyclicDependency {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cyclic dependency: a -> b -> a");
    }

    #[test]
    fn test_location_attached_once() {
        let inner = NestqlError::ExecutionError("boom".into());
        let wrapped = inner
            .at("orders", &["items".to_string()])
            .at("items", &[]);

        match &wrapped {
            NestqlError::Assembly { group, path, .. } => {
                assert_eq!(group, "orders");
                assert_eq!(path, &vec!["items".to_string()]);
            }
            other => panic!("expected Assembly, got {other}"),
        }
        assert!(matches!(
            wrapped.root_cause(),
            NestqlError::ExecutionError(msg) if msg == "boom"
        ));
        assert!(wrapped.to_string().contains("items"));
    }

    #[test]
    fn test_cancelled_is_not_wrapped() {
        let err = NestqlError::Cancelled.at("items", &[]);
        assert!(matches!(err, NestqlError::Cancelled));
    }

    #[test]
    fn test_not_found_kinds() {
        assert_eq!(
            NestqlError::group_not_found("g").to_string(),
            "Group not found: g"
        );
        assert_eq!(
            NestqlError::element_not_found("g.e").to_string(),
            "Element not found: g.e"
        );
    }
}

// =============================================================================
// Value Tests
// =============================================================================

mod value_tests {
    use super::*;

    #[test]
    fn test_null_coerces_to_every_type() {
        for target in [
            DataType::Int64,
            DataType::Float64,
            DataType::Bool,
            DataType::String,
            DataType::Date,
            DataType::Timestamp,
        ] {
            assert_eq!(Value::Null.coerce_to(target).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_numeric_coercions() {
        assert_eq!(
            Value::Int64(3).coerce_to(DataType::Float64).unwrap(),
            Value::Float64(3.0)
        );
        assert_eq!(
            Value::Float64(4.0).coerce_to(DataType::Int64).unwrap(),
            Value::Int64(4)
        );
        assert!(matches!(
            Value::Float64(4.5).coerce_to(DataType::Int64),
            Err(NestqlError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_string_parsing() {
        assert_eq!(
            Value::from("TRUE").coerce_to(DataType::Bool).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            Value::from("1970-01-11").coerce_to(DataType::Date).unwrap(),
            Value::Date(10)
        );
        assert!(Value::from("abc").coerce_to(DataType::Int64).is_err());
    }

    #[test]
    fn test_bool_does_not_become_int() {
        let err = Value::Bool(true).coerce_to(DataType::Int64).unwrap_err();
        match err {
            NestqlError::TypeMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, "INT64");
                assert_eq!(actual, "BOOL");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_date_and_timestamp_display() {
        assert_eq!(Value::Date(0).to_string(), "1970-01-01");
        assert_eq!(Value::Date(31).to_string(), "1970-02-01");
        assert_eq!(
            Value::Timestamp(1_500_000).to_string(),
            "1970-01-01T00:00:01.500000Z"
        );
    }

    #[test]
    fn test_static_coercibility() {
        assert!(DataType::Int64.can_coerce_to(DataType::String));
        assert!(DataType::String.can_coerce_to(DataType::Date));
        assert!(DataType::Date.can_coerce_to(DataType::Timestamp));
        assert!(!DataType::Bool.can_coerce_to(DataType::Int64));
        assert!(!DataType::Timestamp.can_coerce_to(DataType::Date));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}

// =============================================================================
// Template Tests
// =============================================================================

mod template_tests {
    use super::*;

    #[test]
    fn test_split_qualified_uses_last_dot() {
        assert_eq!(
            split_qualified("xmltest.items.itemNum"),
            Some(("xmltest.items", "itemNum"))
        );
        assert_eq!(split_qualified("itemNum"), None);
        assert_eq!(split_qualified("items."), None);
    }

    #[test]
    fn test_placeholders_skip_literals_and_comments() {
        let query = "SELECT '?' AS q, \"a?b\" FROM t -- any?\nWHERE x = ? /* ? */ AND y = ?";
        let found = scan_placeholders(query).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].line, 2);
    }

    #[test]
    fn test_binding_names() {
        let binding = Binding::typed("xmltest.items.itemNum", DataType::String);
        assert_eq!(binding.group_name(), Some("xmltest.items"));
        assert_eq!(binding.element_name(), Some("itemNum"));
        assert_eq!(binding.to_string(), "xmltest.items.itemNum AS STRING");
    }
}

// =============================================================================
// Catalog Tests
// =============================================================================

mod catalog_tests {
    use super::*;

    #[test]
    fn test_nesting_inferred_from_bindings() {
        let catalog = Catalog::from_definitions(vec![
            items_group(),
            suppliers_group(
                vec![Binding::new("xmltest.items.itemNum")],
                "SELECT supplierNum FROM s WHERE item = ?",
            ),
        ])
        .unwrap();

        let suppliers = catalog.lookup_group("xmltest.suppliers").unwrap();
        assert_eq!(suppliers.parent(), Some("xmltest.items"));
        assert_eq!(suppliers.short_name(), "suppliers");
        assert_eq!(
            catalog
                .child_groups_of("xmltest.items")
                .iter()
                .map(|g| g.name().to_string())
                .collect::<Vec<_>>(),
            vec!["xmltest.suppliers"]
        );
        assert_eq!(catalog.root_groups().len(), 1);
    }

    #[test]
    fn test_slots_precomputed() {
        let catalog = Catalog::from_definitions(vec![
            items_group(),
            suppliers_group(
                vec![
                    Binding::new("xmltest.items.itemName"),
                    Binding::typed("xmltest.items.itemNum", DataType::String),
                ],
                "SELECT supplierNum FROM s WHERE name = ? AND item = ?",
            ),
        ])
        .unwrap();

        let suppliers = catalog.lookup_group("xmltest.suppliers").unwrap();
        let template = suppliers.template().expect("virtual");
        let slots = template.slots();
        assert_eq!(slots.len(), 2);
        assert_eq!((slots[0].levels_up, slots[0].position), (0, 1));
        assert_eq!((slots[1].levels_up, slots[1].position), (0, 0));
        assert_eq!(slots[1].source_type, DataType::Int64);
        assert!(template.is_correlated());
    }

    #[test]
    fn test_unknown_element_is_not_found() {
        let err = Catalog::from_definitions(vec![
            items_group(),
            suppliers_group(
                vec![Binding::new("xmltest.items.missing")],
                "SELECT supplierNum FROM s WHERE item = ?",
            ),
        ])
        .unwrap_err();
        assert!(matches!(err, NestqlError::NotFound { kind: "Element", .. }));
    }

    #[test]
    fn test_placeholder_count_mismatch() {
        let err = Catalog::from_definitions(vec![
            items_group(),
            suppliers_group(
                vec![Binding::new("xmltest.items.itemNum")],
                "SELECT supplierNum FROM s WHERE item = ? OR alt = ?",
            ),
        ])
        .unwrap_err();
        assert!(matches!(err, NestqlError::SchemaError(msg) if msg.contains("placeholder")));
    }

    #[test]
    fn test_impossible_coercion_rejected_at_build() {
        let err = Catalog::from_definitions(vec![
            items_group(),
            suppliers_group(
                vec![Binding::typed("xmltest.items.inStock", DataType::Int64)],
                "SELECT supplierNum FROM s WHERE qty = ?",
            ),
        ])
        .unwrap_err();
        assert!(matches!(err, NestqlError::SchemaError(_)));
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let mut builder = Catalog::builder();
        builder.add_group(items_group()).unwrap();
        assert!(matches!(
            builder.add_group(items_group()),
            Err(NestqlError::SchemaError(_))
        ));
    }

    #[test]
    fn test_binding_to_leaf_rejected() {
        let stock = GroupDefinition::leaf("xmltest.stock", vec![element("sku", DataType::String)])
            .unwrap();
        let err = Catalog::from_definitions(vec![
            stock,
            suppliers_group(
                vec![Binding::new("xmltest.stock.sku")],
                "SELECT supplierNum FROM s WHERE sku = ?",
            ),
        ])
        .unwrap_err();
        assert!(matches!(err, NestqlError::SchemaError(_)));
    }

    #[test]
    fn test_leaf_group_kind() {
        let stock = GroupDefinition::leaf("xmltest.stock", vec![element("sku", DataType::String)])
            .unwrap();
        let catalog = Catalog::from_definitions(vec![stock]).unwrap();
        let group = catalog.lookup_group("xmltest.stock").unwrap();
        assert!(matches!(group.kind(), GroupKind::Leaf));
        assert!(catalog.root_groups().is_empty());
    }

    #[test]
    fn test_lookup_element() {
        let catalog = Catalog::from_definitions(vec![items_group()]).unwrap();
        let element = catalog.lookup_element("xmltest.items.itemName").unwrap();
        assert_eq!(element.position, 1);
        assert_eq!(element.element().data_type, DataType::String);
        assert!(matches!(
            catalog.lookup_element("xmltest.items.nope"),
            Err(NestqlError::NotFound { .. })
        ));
        assert!(matches!(
            catalog.lookup_group("nope"),
            Err(NestqlError::NotFound { kind: "Group", .. })
        ));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let catalog = Catalog::from_definitions(vec![
            items_group(),
            suppliers_group(
                vec![Binding::new("xmltest.items.itemNum")],
                "SELECT supplierNum FROM s WHERE item = ?",
            ),
        ])
        .unwrap();

        let bytes = catalog.serialize().unwrap();
        let restored = Catalog::deserialize(&bytes).unwrap();
        assert_eq!(restored.group_names(), catalog.group_names());
        assert_eq!(
            restored.lookup_group("xmltest.suppliers").unwrap().parent(),
            Some("xmltest.items")
        );
        assert!(matches!(
            Catalog::deserialize(&[0xff, 0x01]),
            Err(NestqlError::CatalogError(_))
        ));
    }
}
