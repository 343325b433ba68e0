//! Channel adaptor
//!
//! Channels expose `send(v)`, `receive()` and `close()` as behaviors.
//! `receive` returns the value and `true`, or `nil, false` once the channel
//! is closed and drained. Send and receive block the calling thread.

use std::sync::Arc;

use rivet_sdk::args::arg;
use rivet_sdk::{MetaHook, Metatable, NativeFunction, ScriptError, ScriptValue, State};
use rivet_types::{HostValue, Kind};
use rustc_hash::FxHashMap;

use super::{behavior_or_nil, check_kind, check_value, name_key, operator};
use crate::convert::to_host;
use crate::descriptor::Members;
use crate::error::{BridgeError, BridgeResult};
use crate::proxy::to_script;

/// Register `send`, `receive` and `close`
pub(crate) fn builtins(methods: &mut FxHashMap<String, NativeFunction>) {
    methods.insert(
        "send".to_string(),
        operator("send", |_, args| {
            let chan = check_chan(args)?;
            let elem = chan.ty().elem().ok_or_else(|| not_a_channel(chan))?;
            let value = to_host(arg(args, 2), elem)?;
            tracing::trace!(ty = %chan.ty(), "channel send");
            chan.send(&value)?;
            Ok(ScriptValue::Nil)
        }),
    );
    methods.insert(
        "receive".to_string(),
        NativeFunction::new("receive", |state, args| {
            receive(state, &args).map_err(ScriptError::from)
        }),
    );
    methods.insert(
        "close".to_string(),
        operator("close", |_, args| {
            let chan = check_chan(args)?;
            tracing::trace!(ty = %chan.ty(), "channel close");
            chan.close()?;
            Ok(ScriptValue::Nil)
        }),
    );
}

fn receive(state: &State, args: &[ScriptValue]) -> BridgeResult<Vec<ScriptValue>> {
    let chan = check_chan(args)?;
    tracing::trace!(ty = %chan.ty(), "channel receive");
    match chan.recv()? {
        Some(value) => Ok(vec![to_script(state, value)?, ScriptValue::Bool(true)]),
        None => Ok(vec![ScriptValue::Nil, ScriptValue::Bool(false)]),
    }
}

pub(crate) fn install(mt: &mut Metatable, members: &Arc<Members>) {
    let m = members.clone();
    mt.set_hook(
        MetaHook::Index,
        operator("__index", move |_, args| {
            check_chan(args)?;
            Ok(behavior_or_nil(&m, name_key(args, 2)?))
        }),
    );
    mt.set_hook(
        MetaHook::Len,
        operator("__len", |_, args| {
            Ok(ScriptValue::from(check_chan(args)?.len()?))
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

fn check_chan(args: &[ScriptValue]) -> BridgeResult<&HostValue> {
    check_kind(args, 1, Kind::Chan)
}

fn not_a_channel(value: &HostValue) -> BridgeError {
    BridgeError::ArgumentKind {
        position: 1,
        expected: "chan".to_string(),
        got: value.ty().to_string(),
    }
}
