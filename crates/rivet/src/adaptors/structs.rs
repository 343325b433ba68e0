//! Struct adaptor
//!
//! Serves structs and pointers to structs. Names resolve to fields first,
//! through the flattened access paths, then to behaviors.

use std::sync::Arc;

use rivet_sdk::args::arg;
use rivet_sdk::{MetaHook, Metatable, ScriptValue, State};

use super::{behavior_or_nil, check_value, name_key, operator};
use crate::convert::to_host;
use crate::descriptor::Members;
use crate::error::{BridgeError, BridgeResult};
use crate::proxy::to_script;

pub(crate) fn install(mt: &mut Metatable, deref: bool, members: &Arc<Members>) {
    let m = members.clone();
    mt.set_hook(
        MetaHook::Index,
        operator("__index", move |state, args| index(state, &m, args)),
    );
    let m = members.clone();
    mt.set_hook(
        MetaHook::NewIndex,
        operator("__newindex", move |_, args| {
            new_index(&m, args)?;
            Ok(ScriptValue::Nil)
        }),
    );
    mt.set_hook(
        MetaHook::Eq,
        operator("__eq", move |_, args| {
            let (a, b) = (check_value(args, 1)?, check_value(args, 2)?);
            let equal = if deref {
                a.same_reference(b)
            } else {
                a.slot().same(b.slot())
            };
            Ok(ScriptValue::from(equal))
        }),
    );
}

fn index(state: &State, members: &Members, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
    let value = check_value(args, 1)?;
    let name = name_key(args, 2)?;
    match members.field(name) {
        Some(path) => to_script(state, value.field_by_path(path.as_slice())?),
        None => Ok(behavior_or_nil(members, name)),
    }
}

fn new_index(members: &Members, args: &[ScriptValue]) -> BridgeResult<()> {
    let value = check_value(args, 1)?;
    let name = name_key(args, 2)?;
    let path = members.field(name).ok_or_else(|| BridgeError::UnknownField {
        ty: value.ty().to_string(),
        name: name.to_string(),
    })?;
    let field = value.field_by_path(path.as_slice())?;
    if !field.can_set() {
        return Err(BridgeError::NotSettable(format!("field {}", name)));
    }
    field.set(&to_host(arg(args, 3), field.ty())?)?;
    Ok(())
}
