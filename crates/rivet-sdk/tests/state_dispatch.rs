//! State Dispatch Tests
//!
//! Operator dispatch through metatables and registry isolation between
//! states.

use std::sync::Arc;

use rivet_sdk::{
    args, MetaHook, Metatable, NativeFunction, RegistryValue, ScriptError, ScriptValue, State,
    UserData,
};

#[derive(Debug, thiserror::Error)]
#[error("boom")]
struct Boom;

fn cell_metatable() -> Arc<Metatable> {
    let mt = Metatable::new("Cell")
        .with_hook(
            MetaHook::Eq,
            NativeFunction::new("eq", |_, argv| {
                let a = argv[0].as_userdata().and_then(|u| u.downcast_ref::<i64>().copied());
                let b = argv[1].as_userdata().and_then(|u| u.downcast_ref::<i64>().copied());
                Ok(vec![ScriptValue::from(a == b)])
            }),
        )
        .with_hook(
            MetaHook::Call,
            NativeFunction::new("call", |_, argv| {
                let n: i64 = args::check(&argv, 2)?;
                Ok(vec![ScriptValue::from(n + 1)])
            }),
        )
        .with_hook(
            MetaHook::Unm,
            NativeFunction::new("unm", |_, _| Err(ScriptError::host(Boom))),
        );
    Arc::new(mt)
}

fn cell(mt: &Arc<Metatable>, n: i64) -> ScriptValue {
    ScriptValue::UserData(Arc::new(UserData::new(n, Some(mt.clone()))))
}

// ===== Operator Dispatch Tests =====

#[test]
fn test_eq_hook_requires_shared_metatable() {
    let state = State::new();
    let mt = cell_metatable();
    assert!(state.equals(&cell(&mt, 1), &cell(&mt, 1)).unwrap());
    assert!(!state.equals(&cell(&mt, 1), &cell(&mt, 2)).unwrap());

    let other = cell_metatable();
    assert!(!state.equals(&cell(&mt, 1), &cell(&other, 1)).unwrap());
}

#[test]
fn test_call_hook_receives_self_first() {
    let state = State::new();
    let mt = cell_metatable();
    let results = state
        .call(&cell(&mt, 0), vec![ScriptValue::from(41i64)])
        .unwrap();
    assert_eq!(results[0].as_number(), Some(42.0));

    let err = state.call(&cell(&mt, 0), vec![]).unwrap_err();
    assert!(matches!(err, ScriptError::Argument { position: 2, .. }));
}

#[test]
fn test_host_errors_downcast() {
    let state = State::new();
    let mt = cell_metatable();
    let err = state.unm(&cell(&mt, 0)).unwrap_err();
    assert!(err.downcast_ref::<Boom>().is_some());
    assert_eq!(err.to_string(), "boom");
}

#[test]
fn test_call_method_passes_receiver() {
    let state = State::new();
    let table = rivet_sdk::TableRef::new();
    table
        .raw_set(
            ScriptValue::from("name"),
            ScriptValue::from(NativeFunction::new("name", |_, argv| {
                Ok(vec![ScriptValue::from(argv[0].type_name())])
            })),
        )
        .unwrap();
    let target = ScriptValue::from(table);
    let out = state.call_method(&target, "name", vec![]).unwrap();
    assert_eq!(out[0].as_str(), Some("table"));
    assert!(state.call_method(&target, "missing", vec![]).is_err());
}

// ===== Registry Isolation Tests =====

#[test]
fn test_registry_is_per_state() {
    let s1 = State::new();
    let s2 = State::new();
    s1.registry_set("key", Arc::new(1u8) as RegistryValue);
    assert!(s1.registry_get("key").is_some());
    assert!(s2.registry_get("key").is_none());
}
