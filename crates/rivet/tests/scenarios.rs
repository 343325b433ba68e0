//! End-to-end scenarios: host structs, maps and slices driven through the
//! operators a script would use.

use std::sync::Arc;

use rivet::{make_proxy, make_type_constructor, BridgeError, MetatableCache};
use rivet_sdk::{ScriptError, ScriptValue, State};
use rivet_types::{Field, HostType, HostValue, MethodSets, Shape};

fn person_type() -> HostType {
    let person = HostType::declare("Person");
    person
        .define(
            Shape::Struct(vec![
                Field::new("Name", HostType::string()),
                Field::new("Friend", HostType::pointer_to(&person)),
            ]),
            MethodSets::new(),
        )
        .unwrap();
    person
}

fn new_person(person: &HostType, name: &str) -> HostValue {
    let ptr = HostValue::alloc(person);
    ptr.elem()
        .unwrap()
        .field(0)
        .unwrap()
        .set(&HostValue::from(name))
        .unwrap();
    ptr
}

fn payload(v: &ScriptValue) -> HostValue {
    v.as_userdata()
        .and_then(|ud| ud.downcast_ref::<HostValue>())
        .cloned()
        .expect("proxy payload")
}

fn bridge_error(err: &ScriptError) -> &BridgeError {
    err.downcast_ref::<BridgeError>().expect("bridge error")
}

// ===== Struct Scenarios =====

#[test]
fn test_person_friend_scenario() {
    let state = State::new();
    let person = person_type();
    let tim = new_person(&person, "Tim");
    let user1 = make_proxy(&state, tim.clone()).unwrap();

    let ctor = make_type_constructor(&state, &person);
    let user2 = state.call(&ctor, vec![]).unwrap().remove(0);
    state.set_index(&user2, "Name", "John").unwrap();
    state.set_index(&user2, "Friend", user1.clone()).unwrap();

    let friend = state.index(&user2, "Friend").unwrap();
    assert_eq!(state.index(&friend, "Name").unwrap().as_str(), Some("Tim"));
    assert_eq!(state.index(&user2, "name").unwrap().as_str(), Some("John"));
    assert!(state.equals(&friend, &user1).unwrap());

    // the host sees the script's writes
    let john = payload(&user2);
    let friend_ptr = john.elem().unwrap().field(1).unwrap();
    assert_eq!(friend_ptr.pointer(), tim.pointer());
}

#[test]
fn test_map_of_person_pointers() {
    let state = State::new();
    let person = person_type();
    let map_ty = HostType::map_of(&HostType::string(), &HostType::pointer_to(&person));
    let host_map = HostValue::make_map(&map_ty).unwrap();

    let tim = new_person(&person, "Tim");
    let john = new_person(&person, "John");
    let m = make_proxy(&state, host_map.clone()).unwrap();
    state
        .set_index(&m, "tim", make_proxy(&state, tim.clone()).unwrap())
        .unwrap();
    state
        .set_index(&m, "john", make_proxy(&state, john.clone()).unwrap())
        .unwrap();

    assert_eq!(host_map.len().unwrap(), 2);
    assert_eq!(state.len(&m).unwrap().as_number(), Some(2.0));
    let stored = host_map.map_get(&HostValue::from("tim")).unwrap().unwrap();
    assert_eq!(stored.pointer(), tim.pointer());
    let stored = host_map.map_get(&HostValue::from("john")).unwrap().unwrap();
    assert_eq!(stored.pointer(), john.pointer());

    let looked_up = state.index(&m, "tim").unwrap();
    assert_eq!(state.index(&looked_up, "Name").unwrap().as_str(), Some("Tim"));

    state.set_index(&m, "tim", ScriptValue::Nil).unwrap();
    assert_eq!(host_map.len().unwrap(), 1);
    assert!(state.index(&m, "tim").unwrap().is_nil());
}

#[test]
fn test_deref_then_mutate_is_visible_through_pointer() {
    let state = State::new();
    let person = person_type();
    let tim = new_person(&person, "Tim");
    let p = make_proxy(&state, tim.clone()).unwrap();

    let value = state.unm(&p).unwrap();
    state.set_index(&value, "Name", "Timothy").unwrap();
    assert_eq!(state.index(&p, "Name").unwrap().as_str(), Some("Timothy"));
    assert_eq!(
        tim.elem().unwrap().field(0).unwrap().as_string().as_deref(),
        Some("Timothy")
    );
}

#[test]
fn test_deref_assign_replaces_pointee() {
    let state = State::new();
    let person = person_type();
    let target = new_person(&person, "Tim");
    let source = new_person(&person, "Ann");
    let p = make_proxy(&state, target.clone()).unwrap();
    let ann = state.unm(&make_proxy(&state, source).unwrap()).unwrap();

    let updated = state.pow(&p, &ann).unwrap();
    assert_eq!(state.index(&updated, "Name").unwrap().as_str(), Some("Ann"));
    assert_eq!(state.index(&p, "Name").unwrap().as_str(), Some("Ann"));

    let count = HostValue::alloc(&HostType::int());
    let c = make_proxy(&state, count.clone()).unwrap();
    let out = state.pow(&c, &ScriptValue::from(7i64)).unwrap();
    assert_eq!(out.as_number(), Some(7.0));
    assert_eq!(count.elem().unwrap().as_int(), Some(7));
    assert_eq!(state.unm(&c).unwrap().as_number(), Some(7.0));
}

#[test]
fn test_nil_pointer_dereference() {
    let state = State::new();
    let person = person_type();
    let nil = make_proxy(&state, HostValue::zero(&HostType::pointer_to(&person))).unwrap();

    let err = state.unm(&nil).unwrap_err();
    assert_eq!(bridge_error(&err), &BridgeError::NilDereference);
    let err = state.pow(&nil, &ScriptValue::from("x")).unwrap_err();
    assert_eq!(bridge_error(&err), &BridgeError::NilDereference);
    let err = state.index(&nil, "Name").unwrap_err();
    assert_eq!(bridge_error(&err), &BridgeError::NilDereference);

    // an unset Friend reads as a nil pointer proxy
    let tim = make_proxy(&state, new_person(&person, "Tim")).unwrap();
    let friend = state.index(&tim, "Friend").unwrap();
    let err = state.index(&friend, "Name").unwrap_err();
    assert_eq!(bridge_error(&err), &BridgeError::NilDereference);
}

// ===== Aggregate Assignment =====

fn nested_types() -> (HostType, HostType) {
    let inner = HostType::structure("Inner", vec![Field::new("X", HostType::int())]);
    let outer = HostType::structure("Outer", vec![Field::new("In", inner.clone())]);
    (inner, outer)
}

fn inner_value(state: &State, inner: &HostType, x: i64) -> ScriptValue {
    let ptr = make_proxy(state, HostValue::alloc(inner)).unwrap();
    state.set_index(&ptr, "X", x).unwrap();
    state.unm(&ptr).unwrap()
}

#[test]
fn test_field_proxy_survives_deref_assign() {
    let state = State::new();
    let (inner, outer) = nested_types();
    let p = make_proxy(&state, HostValue::alloc(&outer)).unwrap();
    let alias = state.index(&p, "In").unwrap();

    let other = make_proxy(&state, HostValue::alloc(&outer)).unwrap();
    state
        .set_index(&other, "In", inner_value(&state, &inner, 5))
        .unwrap();
    state.pow(&p, &state.unm(&other).unwrap()).unwrap();
    assert_eq!(state.index(&alias, "X").unwrap().as_number(), Some(5.0));

    state.set_index(&alias, "X", 7i64).unwrap();
    let via_ptr = state.index(&p, "In").unwrap();
    assert_eq!(state.index(&via_ptr, "X").unwrap().as_number(), Some(7.0));
    // the source was copied, not shared
    let source = state.index(&other, "In").unwrap();
    assert_eq!(state.index(&source, "X").unwrap().as_number(), Some(5.0));
}

#[test]
fn test_field_proxy_survives_field_assign() {
    let state = State::new();
    let (inner, outer) = nested_types();
    let p = make_proxy(&state, HostValue::alloc(&outer)).unwrap();
    let alias = state.index(&p, "In").unwrap();

    state.set_index(&p, "In", inner_value(&state, &inner, 9)).unwrap();
    assert_eq!(state.index(&alias, "X").unwrap().as_number(), Some(9.0));
    state.set_index(&alias, "X", 1i64).unwrap();
    let via_ptr = state.index(&p, "In").unwrap();
    assert_eq!(state.index(&via_ptr, "X").unwrap().as_number(), Some(1.0));
}

#[test]
fn test_element_proxy_survives_element_assign() {
    let state = State::new();
    let (inner, _) = nested_types();
    let ty = HostType::slice_of(&inner);
    let s = make_proxy(&state, HostValue::make_slice(&ty, 2, 2).unwrap()).unwrap();
    let first = state.index(&s, 0i64).unwrap();

    state.set_index(&s, 0i64, inner_value(&state, &inner, 4)).unwrap();
    assert_eq!(state.index(&first, "X").unwrap().as_number(), Some(4.0));
    state.set_index(&first, "X", 6i64).unwrap();
    let again = state.index(&s, 0i64).unwrap();
    assert_eq!(state.index(&again, "X").unwrap().as_number(), Some(6.0));
}

// ===== Slice Scenarios =====

#[test]
fn test_slice_constructor_lengths() {
    let state = State::new();
    let ints = make_type_constructor(&state, &HostType::slice_of(&HostType::int()));

    let one = state.call(&ints, vec![ScriptValue::from(1i64)]).unwrap().remove(0);
    assert_eq!(state.len(&one).unwrap().as_number(), Some(1.0));

    let reserved = state
        .call(&ints, vec![ScriptValue::from(0i64), ScriptValue::from(10i64)])
        .unwrap()
        .remove(0);
    assert_eq!(state.len(&reserved).unwrap().as_number(), Some(0.0));
    let cap = state.call_method(&reserved, "capacity", vec![]).unwrap();
    assert_eq!(cap[0].as_number(), Some(10.0));
}

#[test]
fn test_slice_index_round_trip_and_bounds() {
    let state = State::new();
    let ty = HostType::slice_of(&HostType::int());
    let host = HostValue::make_slice(&ty, 3, 3).unwrap();
    let s = make_proxy(&state, host.clone()).unwrap();

    for i in 0..3i64 {
        state.set_index(&s, i, i * 10).unwrap();
        assert_eq!(state.index(&s, i).unwrap().as_number(), Some((i * 10) as f64));
    }
    assert_eq!(host.index(2).unwrap().as_int(), Some(20));

    for bad in [3i64, -1] {
        let err = state.index(&s, bad).unwrap_err();
        assert_eq!(bridge_error(&err), &BridgeError::Bounds { index: bad, len: 3 });
        let err = state.set_index(&s, bad, 1i64).unwrap_err();
        assert_eq!(bridge_error(&err), &BridgeError::Bounds { index: bad, len: 3 });
    }
}

#[test]
fn test_slice_append_shares_storage_while_it_fits() {
    let state = State::new();
    let ints = make_type_constructor(&state, &HostType::slice_of(&HostType::int()));
    let s = state
        .call(&ints, vec![ScriptValue::from(1i64), ScriptValue::from(4i64)])
        .unwrap()
        .remove(0);

    let grown = state
        .call_method(&s, "append", vec![ScriptValue::from(5i64), ScriptValue::from(6i64)])
        .unwrap()
        .remove(0);
    assert_eq!(state.len(&grown).unwrap().as_number(), Some(3.0));
    assert_eq!(state.len(&s).unwrap().as_number(), Some(1.0));

    // same backing array: a write through the original is visible
    state.set_index(&s, 0i64, 9i64).unwrap();
    assert_eq!(state.index(&grown, 0i64).unwrap().as_number(), Some(9.0));

    let err = state
        .call_method(&s, "append", vec![ScriptValue::from("x")])
        .unwrap_err();
    assert!(matches!(bridge_error(&err), BridgeError::Conversion { .. }));
}

// ===== Descriptor Reuse =====

#[test]
fn test_proxies_share_cached_descriptor() {
    let state = State::new();
    let person = person_type();
    let a = make_proxy(&state, new_person(&person, "A")).unwrap();
    let generated = MetatableCache::of(&state).generation_count();
    let b = make_proxy(&state, new_person(&person, "B")).unwrap();

    let mt = |v: &ScriptValue| v.as_userdata().and_then(|ud| ud.metatable()).cloned();
    assert!(Arc::ptr_eq(&mt(&a).unwrap(), &mt(&b).unwrap()));
    assert_eq!(MetatableCache::of(&state).generation_count(), generated);
}
