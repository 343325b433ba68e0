//! Descriptor cache behavior observed through the public entry points

use std::sync::Arc;

use rivet::{
    configure, make_proxy, make_type_constructor, AdaptorKind, BridgeConfig, MetatableCache,
};
use rivet_sdk::State;
use rivet_types::{Field, HostType, HostValue};

fn tagged_type() -> HostType {
    HostType::structure(
        "Tagged",
        vec![
            Field::new("Plain", HostType::int()),
            Field::new("Renamed", HostType::int()).with_tag("lua", "alias"),
        ],
    )
}

#[test]
fn test_repeated_requests_return_same_descriptor() {
    let state = State::new();
    let ty = HostType::pointer_to(&tagged_type());
    let cache = MetatableCache::of(&state);

    let first = cache.instance_descriptor(&ty);
    let generated = cache.generation_count();
    for _ in 0..10 {
        make_proxy(&state, HostValue::zero(&ty)).unwrap();
        assert!(Arc::ptr_eq(&first, &cache.instance_descriptor(&ty)));
    }
    assert_eq!(cache.generation_count(), generated);
    assert_eq!(first.kind(), AdaptorKind::Struct);
    assert!(first.has_deref());
    assert!(first.members().field("plain").is_some());
}

#[test]
fn test_type_constructors_use_separate_namespace() {
    let state = State::new();
    let ty = tagged_type();
    let a = make_type_constructor(&state, &ty);
    let b = make_type_constructor(&state, &ty);
    assert!(state.equals(&a, &b).unwrap());

    let cache = MetatableCache::of(&state);
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.generation_count(), 1);
}

#[test]
fn test_configure_changes_names_before_first_use() {
    let state = State::new();
    let config = BridgeConfig {
        tag_key: "lua".to_string(),
        lowercase_aliases: false,
    };
    assert!(configure(&state, config));

    let p = make_proxy(&state, HostValue::alloc(&tagged_type())).unwrap();
    assert_eq!(state.index(&p, "alias").unwrap().as_number(), Some(0.0));
    assert!(state.index(&p, "Renamed").unwrap().is_nil());
    assert!(state.index(&p, "plain").unwrap().is_nil());
    assert_eq!(state.index(&p, "Plain").unwrap().as_number(), Some(0.0));

    assert!(!configure(&state, BridgeConfig::default()));
}

#[test]
fn test_default_configuration_aliases() {
    let state = State::new();
    let p = make_proxy(&state, HostValue::alloc(&tagged_type())).unwrap();
    assert_eq!(state.index(&p, "plain").unwrap().as_number(), Some(0.0));
    assert_eq!(state.index(&p, "renamed").unwrap().as_number(), Some(0.0));
    assert!(state.index(&p, "alias").unwrap().is_nil());
}

#[test]
fn test_proxies_shared_across_threads() {
    let state = Arc::new(State::new());
    let counter = HostValue::alloc(&HostType::int());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let state = state.clone();
            let counter = counter.clone();
            std::thread::spawn(move || {
                let p = make_proxy(&state, counter).unwrap();
                state.unm(&p).unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().as_number(), Some(0.0));
    }
    assert_eq!(MetatableCache::of(&state).len(), 1);
}
