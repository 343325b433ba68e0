//! Proxy construction
//!
//! Host values cross into script code here. Scalars and functions become
//! native script values; everything else is boxed as a [`UserData`] whose
//! payload is the [`HostValue`] and whose metatable comes from the cached
//! descriptor of the value's type.

use std::sync::Arc;

use rivet_sdk::{ScriptValue, State, UserData};
use rivet_types::{HostType, HostValue, Kind};

use crate::cache::MetatableCache;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::function::wrap_func;

/// Expose a host value to script code
///
/// Fails with [`BridgeError::Inaccessible`] when the value was reached
/// through a hidden field.
pub fn make_proxy(state: &State, value: HostValue) -> BridgeResult<ScriptValue> {
    to_script(state, value)
}

/// Expose a host type as a callable constructor
///
/// Calling it makes a slice, map or channel of that type, or allocates a
/// pointer to a zero value for any other type.
pub fn make_type_constructor(state: &State, ty: &HostType) -> ScriptValue {
    let metatable = MetatableCache::of(state).type_metatable(ty);
    ScriptValue::UserData(Arc::new(UserData::new(ty.clone(), Some(metatable))))
}

/// Install the bridge configuration for `state`
///
/// Returns `false`, leaving the configuration unchanged, once any
/// descriptor has been generated.
pub fn configure(state: &State, config: BridgeConfig) -> bool {
    MetatableCache::of(state).configure(config)
}

/// Host-to-script conversion used by every operator that returns a value
pub(crate) fn to_script(state: &State, value: HostValue) -> BridgeResult<ScriptValue> {
    if !value.can_interface() {
        return Err(BridgeError::Inaccessible(value.ty().to_string()));
    }
    let kind = value.kind();
    // named scalars carrying methods keep them by staying proxies
    let plain = value.ty().methods().value.is_empty();
    match kind {
        Kind::Invalid => Ok(ScriptValue::Nil),
        Kind::Bool if plain => Ok(ScriptValue::Bool(value.as_bool().unwrap_or_default())),
        Kind::String if plain => Ok(ScriptValue::from(value.as_string().unwrap_or_default())),
        _ if kind.is_numeric() && plain => {
            Ok(ScriptValue::Number(value.as_float().unwrap_or_default()))
        }
        Kind::Func if value.is_nil() => Ok(ScriptValue::Nil),
        Kind::Func => Ok(ScriptValue::Function(wrap_func(
            &value.ty().to_string(),
            value.func()?,
        ))),
        Kind::Interface if value.is_nil() => Ok(ScriptValue::Nil),
        Kind::Interface => to_script(state, value.elem()?),
        _ => Ok(wrap(state, value)),
    }
}

fn wrap(state: &State, value: HostValue) -> ScriptValue {
    let descriptor = MetatableCache::of(state).instance_descriptor(value.ty());
    let metatable = descriptor.metatable().clone();
    ScriptValue::UserData(Arc::new(UserData::new(value, Some(metatable))))
}
