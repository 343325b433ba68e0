//! Map adaptor
//!
//! Keys are converted to the map's key type. A missing key reads as nil,
//! except that a string key with no entry may still name a behavior.
//! Assigning nil removes the entry. Calling the proxy, `m(key)`, returns
//! the element's zero value for a missing key.

use std::sync::Arc;

use rivet_sdk::args::arg;
use rivet_sdk::{MetaHook, Metatable, ScriptValue, State};
use rivet_types::{HostType, HostValue};

use super::{behavior_or_nil, check_value, operator};
use crate::convert::to_host;
use crate::descriptor::Members;
use crate::error::{BridgeError, BridgeResult};
use crate::proxy::to_script;

pub(crate) fn install(mt: &mut Metatable, members: &Arc<Members>) {
    let m = members.clone();
    mt.set_hook(
        MetaHook::Index,
        operator("__index", move |state, args| index(state, &m, args)),
    );
    mt.set_hook(
        MetaHook::NewIndex,
        operator("__newindex", |_, args| {
            let map = check_value(args, 1)?;
            let (key_ty, elem_ty) = parts(map)?;
            let key = to_host(arg(args, 2), key_ty)?;
            let value = arg(args, 3);
            if value.is_nil() {
                map.map_remove(&key)?;
            } else {
                map.map_insert(&key, &to_host(value, elem_ty)?)?;
            }
            Ok(ScriptValue::Nil)
        }),
    );
    mt.set_hook(
        MetaHook::Len,
        operator("__len", |_, args| {
            Ok(ScriptValue::from(check_value(args, 1)?.len()?))
        }),
    );
    mt.set_hook(
        MetaHook::Call,
        operator("__call", |state, args| {
            let map = check_value(args, 1)?;
            let (key_ty, elem_ty) = parts(map)?;
            let key = to_host(arg(args, 2), key_ty)?;
            let found = map
                .map_get(&key)?
                .unwrap_or_else(|| HostValue::zero(elem_ty));
            to_script(state, found)
        }),
    );
    mt.set_hook(
        MetaHook::Eq,
        operator("__eq", |_, args| {
            let (a, b) = (check_value(args, 1)?, check_value(args, 2)?);
            Ok(ScriptValue::from(a.same_reference(b)))
        }),
    );
}

fn index(state: &State, members: &Members, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    let map = check_value(args, 1)?;
    let (key_ty, _) = parts(map)?;
    let raw = arg(args, 2);
    let found = match to_host(raw, key_ty) {
        Ok(key) => map.map_get(&key)?,
        // a string that is not a valid key can only be a behavior name
        Err(_) if raw.as_str().is_some() => None,
        Err(e) => return Err(e),
    };
    match (found, raw.as_str()) {
        (Some(value), _) => to_script(state, value),
        (None, Some(name)) => Ok(behavior_or_nil(members, name)),
        (None, None) => Ok(ScriptValue::Nil),
    }
}

fn parts(map: &HostValue) -> BridgeResult<(&HostType, &HostType)> {
    match (map.ty().key(), map.ty().elem()) {
        (Some(key), Some(elem)) => Ok((key, elem)),
        _ => Err(BridgeError::ArgumentKind {
            position: 1,
            expected: "map".to_string(),
            got: map.ty().to_string(),
        }),
    }
}
