use lazyorm_model::{LazyField, LazyValue};
use pretty_assertions::assert_eq;

// ── LazyValue ────────────────────────────────────────────────────

#[test]
fn unfetched_is_not_loaded() {
    let v: LazyValue<i32> = LazyValue::Unfetched;
    assert!(!v.is_loaded());
    assert_eq!(v.as_loaded(), None);
    assert_eq!(v.into_loaded(), None);
}

#[test]
fn loaded_exposes_value() {
    let v = LazyValue::Loaded("text".to_string());
    assert!(v.is_loaded());
    assert_eq!(v.as_loaded().map(String::as_str), Some("text"));
}

#[test]
fn map_applies_only_to_loaded() {
    assert_eq!(LazyValue::Loaded(2).map(|n| n * 10), LazyValue::Loaded(20));
    assert_eq!(LazyValue::<i32>::Unfetched.map(|n| n * 10), LazyValue::Unfetched);
}

#[test]
fn unfetched_and_loaded_null_are_distinct() {
    let unfetched: LazyValue<Option<String>> = LazyValue::Unfetched;
    let loaded_none: LazyValue<Option<String>> = LazyValue::Loaded(None);
    assert_ne!(unfetched, loaded_none);
}

#[test]
fn serialized_form_is_tagged() {
    let json = serde_json::to_string(&LazyValue::Loaded(5)).unwrap();
    assert_eq!(json, r#"{"loaded":5}"#);
    let json = serde_json::to_string(&LazyValue::<i32>::Unfetched).unwrap();
    assert_eq!(json, r#""unfetched""#);
}

// ── LazyField ────────────────────────────────────────────────────

#[test]
fn field_replace_returns_previous() {
    let field = LazyField::loaded(1);
    let previous = field.replace(LazyValue::Loaded(2));
    assert_eq!(previous, LazyValue::Loaded(1));
    assert_eq!(field.get(), LazyValue::Loaded(2));
}

#[test]
fn field_with_reads_without_clone() {
    let field = LazyField::loaded(vec![1, 2, 3]);
    assert_eq!(field.with(|v| v.as_loaded().map(Vec::len)), Some(3));
}

#[test]
fn field_serializes_as_its_state() {
    let field = LazyField::loaded("bio".to_string());
    let json = serde_json::to_string(&field).unwrap();
    assert_eq!(json, r#"{"loaded":"bio"}"#);
    let back: LazyField<String> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, field);
}

#[test]
fn field_clone_is_independent() {
    let field = LazyField::loaded(1);
    let cloned = field.clone();
    cloned.set(2);
    assert_eq!(field.get(), LazyValue::Loaded(1));
    assert_eq!(cloned.get(), LazyValue::Loaded(2));
}
