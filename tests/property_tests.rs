//! Property-based tests for hydration, URLs and comparison helpers.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{json, Value};

use truck::config::TruckConfig;
use truck::model::{ModelClass, ModelOptions};
use truck::network::mock::MockTransport;
use truck::util::{join_url, loose_eq};
use truck::Truck;

fn section() -> ModelClass {
    Truck::with_transport(TruckConfig::default(), Arc::new(MockTransport::new()))
        .define(ModelOptions::new("section").fields(["name", "position", "visible"]))
        .expect("section schema is valid")
}

/// Strategy for non-blank field values an existing entity keeps verbatim.
fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{1,20}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

/// Strategy for URL segments without slashes.
fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,12}"
}

proptest! {
    #[test]
    fn keyed_instances_survive_serialization(
        id in 1i64..1_000_000,
        name in field_value(),
        position in field_value(),
        visible in field_value(),
    ) {
        let class = section();
        let data = json!({
            "id": id,
            "name": name,
            "position": position,
            "visible": visible,
        });

        let model = class.make(&data);
        prop_assert_eq!(model.get("name"), Some(name));
        prop_assert_eq!(model.get("visible"), Some(visible));

        let copy = class.make(&model.to_object());
        prop_assert!(copy.equals(&model));
        prop_assert_eq!(copy.api_path(), format!("/section/{}", id));
    }

    #[test]
    fn join_url_never_doubles_slashes(parts in prop::collection::vec(segment(), 1..6)) {
        let with_slashes: Vec<String> = parts.iter().map(|p| format!("/{}/", p)).collect();
        let joined = join_url(with_slashes.iter().map(String::as_str));

        prop_assert!(!joined.contains("//"));
        prop_assert_eq!(joined, format!("/{}", parts.join("/")));
    }

    #[test]
    fn loose_eq_matches_numbers_and_their_strings(n in any::<i64>()) {
        let number = Value::from(n);
        let text = Value::from(n.to_string());

        prop_assert!(loose_eq(&number, &text, false));
        prop_assert!(loose_eq(&text, &number, false));
        prop_assert!(!loose_eq(&number, &Value::from(n.wrapping_add(1)), false));
    }

    #[test]
    fn loose_eq_ignore_case_is_symmetric(s in "[a-zA-Z]{1,16}") {
        let upper = Value::from(s.to_uppercase());
        let lower = Value::from(s.to_lowercase());

        prop_assert!(loose_eq(&upper, &lower, true));
        prop_assert!(loose_eq(&lower, &upper, true));
    }
}
