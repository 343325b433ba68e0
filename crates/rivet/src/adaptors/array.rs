//! Array adaptor
//!
//! Serves arrays and pointers to arrays. Elements of a plain array proxy
//! are copies and cannot be assigned; through a pointer they alias the
//! pointed-to array.

use std::sync::Arc;

use rivet_sdk::args::arg;
use rivet_sdk::{MetaHook, Metatable, ScriptValue};
use rivet_types::HostValue;

use super::{
    behavior_or_nil, bounds, check_value, elements_equal, index_key, operator, sequence_key,
    SequenceKey,
};
use crate::convert::to_host;
use crate::descriptor::Members;
use crate::error::{BridgeError, BridgeResult};
use crate::proxy::to_script;

pub(crate) fn install(mt: &mut Metatable, deref: bool, members: &Arc<Members>) {
    let m = members.clone();
    mt.set_hook(
        MetaHook::Index,
        operator("__index", move |state, args| {
            let array = target(check_value(args, 1)?, deref)?;
            match sequence_key(args, 2)? {
                SequenceKey::Index(i) => {
                    let i = bounds(i, array.len()?)?;
                    to_script(state, array.index(i)?)
                }
                SequenceKey::Name(name) => Ok(behavior_or_nil(&m, name)),
            }
        }),
    );
    mt.set_hook(
        MetaHook::NewIndex,
        operator("__newindex", move |_, args| {
            let array = target(check_value(args, 1)?, deref)?;
            let i = bounds(index_key(args, 2)?, array.len()?)?;
            let elem = array.index(i)?;
            if !elem.can_set() {
                return Err(BridgeError::NotSettable(format!("element of {}", array.ty())));
            }
            elem.set(&to_host(arg(args, 3), elem.ty())?)?;
            Ok(ScriptValue::Nil)
        }),
    );
    mt.set_hook(
        MetaHook::Len,
        operator("__len", move |_, args| {
            let array = target(check_value(args, 1)?, deref)?;
            Ok(ScriptValue::from(array.len()?))
        }),
    );
    mt.set_hook(
        MetaHook::Eq,
        operator("__eq", move |_, args| {
            let (a, b) = (check_value(args, 1)?, check_value(args, 2)?);
            let equal = if deref {
                a.same_reference(b)
            } else {
                elements_equal(a, b)?
            };
            Ok(ScriptValue::from(equal))
        }),
    );
}

/// The array itself, following the pointer for pointer-backed proxies
fn target(value: &HostValue, deref: bool) -> BridgeResult<HostValue> {
    if deref {
        Ok(value.elem()?)
    } else {
        Ok(value.clone())
    }
}
