//! Slice adaptor
//!
//! Numeric keys address elements (0-based); string keys resolve to
//! behaviors, starting with the `capacity` and `append` built-ins.

use std::sync::Arc;

use rivet_sdk::args::arg;
use rivet_sdk::{MetaHook, Metatable, NativeFunction, ScriptValue, State};
use rivet_types::Kind;
use rustc_hash::FxHashMap;

use super::{
    behavior_or_nil, bounds, check_kind, check_value, elements_equal, index_key, operator,
    sequence_key, SequenceKey,
};
use crate::convert::to_host;
use crate::descriptor::Members;
use crate::error::{BridgeError, BridgeResult};
use crate::proxy::to_script;

/// Register `capacity()` and `append(...)`
pub(crate) fn builtins(methods: &mut FxHashMap<String, NativeFunction>) {
    methods.insert(
        "capacity".to_string(),
        operator("capacity", |_, args| {
            let slice = check_kind(args, 1, Kind::Slice)?;
            Ok(ScriptValue::from(slice.cap()?))
        }),
    );
    methods.insert("append".to_string(), operator("append", append));
}

/// `s:append(v...)`: a new slice proxy, sharing storage while it fits
fn append(state: &State, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    let slice = check_kind(args, 1, Kind::Slice)?;
    let elem = slice.ty().elem().ok_or_else(|| BridgeError::ArgumentKind {
        position: 1,
        expected: "slice".to_string(),
        got: slice.ty().to_string(),
    })?;
    let values = args
        .iter()
        .skip(1)
        .map(|v| to_host(v, elem))
        .collect::<BridgeResult<Vec<_>>>()?;
    to_script(state, slice.append(&values)?)
}

pub(crate) fn install(mt: &mut Metatable, members: &Arc<Members>) {
    let m = members.clone();
    mt.set_hook(
        MetaHook::Index,
        operator("__index", move |state, args| {
            let slice = check_value(args, 1)?;
            match sequence_key(args, 2)? {
                SequenceKey::Index(i) => {
                    let i = bounds(i, slice.len()?)?;
                    to_script(state, slice.index(i)?)
                }
                SequenceKey::Name(name) => Ok(behavior_or_nil(&m, name)),
            }
        }),
    );
    mt.set_hook(
        MetaHook::NewIndex,
        operator("__newindex", |_, args| {
            let slice = check_value(args, 1)?;
            let i = bounds(index_key(args, 2)?, slice.len()?)?;
            let elem = slice.index(i)?;
            elem.set(&to_host(arg(args, 3), elem.ty())?)?;
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
        MetaHook::Eq,
        operator("__eq", |_, args| {
            let (a, b) = (check_value(args, 1)?, check_value(args, 2)?);
            Ok(ScriptValue::from(elements_equal(a, b)?))
        }),
    );
}
