use super::*;
use serde::Deserialize;
use serde_json::json;

fn values(v: Value) -> Values {
    match v {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

#[test]
fn test_merge_values_last_write_wins() {
    let mut base = values(json!({"a": 1}));
    merge_values(&mut base, &values(json!({"a": 2, "b": 3})));
    assert_eq!(Value::Object(base), json!({"a": 2, "b": 3}));
}

#[test]
fn test_merge_values_preserves_insertion_order() {
    let mut base = values(json!({"z": 1, "a": 2}));
    merge_values(&mut base, &values(json!({"m": 3})));
    let keys: Vec<_> = base.keys().cloned().collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn test_typed_getters() {
    let v = values(json!({"name": "tokio", "stable": true, "score": 0.9}));
    assert_eq!(get_str(&v, "name"), Some("tokio"));
    assert_eq!(get_bool(&v, "stable"), Some(true));
    assert_eq!(get_f64(&v, "score"), Some(0.9));
    assert_eq!(get_str(&v, "missing"), None);
    assert_eq!(get_str(&v, "score"), None);
}

#[test]
fn test_get_as_typed_struct() {
    #[derive(Deserialize)]
    struct Build {
        success: bool,
        warnings: u32,
    }

    let v = values(json!({"build": {"success": true, "warnings": 2}}));
    let build: Build = get_as(&v, "build").unwrap();
    assert!(build.success);
    assert_eq!(build.warnings, 2);
    assert!(get_as::<Build>(&v, "absent").is_none());
}
