//! Pointer adaptor
//!
//! Pointers to anything but structs and arrays expose their behaviors only.
//! Every pointer-backed proxy, whatever its adaptor, also gets the two
//! dereference operators:
//!
//! - `-p` reads the pointed-to value as a new proxy
//! - `p ^ v` stores `v` into the pointed-to location and returns the
//!   updated value

use std::sync::Arc;

use rivet_sdk::args::arg;
use rivet_sdk::{MetaHook, Metatable, ScriptValue, State};
use rivet_types::{HostValue, Kind};

use super::{behavior_or_nil, check_kind, check_value, name_key, operator};
use crate::convert::to_host;
use crate::descriptor::Members;
use crate::error::{BridgeError, BridgeResult};
use crate::proxy::to_script;

pub(crate) fn install(mt: &mut Metatable, members: &Arc<Members>) {
    let m = members.clone();
    mt.set_hook(
        MetaHook::Index,
        operator("__index", move |_, args| {
            check_pointer(args, 1)?;
            Ok(behavior_or_nil(&m, name_key(args, 2)?))
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

pub(crate) fn install_deref(mt: &mut Metatable) {
    mt.set_hook(MetaHook::Unm, operator("__unm", deref_read));
    mt.set_hook(MetaHook::Pow, operator("__pow", deref_assign));
}

/// Pointer boxed at `position`
pub(crate) fn check_pointer(args: &[ScriptValue], position: usize) -> BridgeResult<&HostValue> {
    check_kind(args, position, Kind::Pointer)
}

fn deref_read(state: &State, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    let target = check_pointer(args, 1)?.elem()?;
    to_script(state, target)
}

fn deref_assign(state: &State, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    let target = check_pointer(args, 1)?.elem()?;
    if !target.can_set() {
        return Err(BridgeError::NotSettable(target.ty().to_string()));
    }
    target.set(&to_host(arg(args, 2), target.ty())?)?;
    to_script(state, target)
}
