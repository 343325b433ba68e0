//! Type constructors
//!
//! A type proxy boxes a [`HostType`]. Calling it builds a value of that
//! type:
//!
//! - slices: `T(len = 0, cap = len)`
//! - maps: `T()`, an empty map
//! - channels: `T(buffer = 0)`
//! - anything else: a pointer to a fresh zero value

use rivet_sdk::args::{arg, arg_check, opt};
use rivet_sdk::{MetaHook, Metatable, NativeFunction, ScriptResult, ScriptValue, State};
use rivet_types::{HostType, HostValue, Kind};

use super::{operator, PROTECTION_MARKER};
use crate::config::MAX_CONSTRUCT_CAPACITY;
use crate::error::{BridgeError, BridgeResult};
use crate::proxy::to_script;

/// Metatable shared by every constructor proxy of `ty`
pub(crate) fn metatable(ty: &HostType) -> Metatable {
    Metatable::new(ty.to_string())
        .protect(PROTECTION_MARKER)
        .with_hook(MetaHook::Call, NativeFunction::new("__call", construct))
        .with_hook(
            MetaHook::Eq,
            operator("__eq", |_, args| {
                Ok(ScriptValue::from(check_type(args, 1)? == check_type(args, 2)?))
            }),
        )
        .with_hook(
            MetaHook::ToString,
            operator("__tostring", |_, args| {
                Ok(ScriptValue::from(check_type(args, 1)?.to_string()))
            }),
        )
}

fn construct(state: &State, args: Vec<ScriptValue>) -> ScriptResult<Vec<ScriptValue>> {
    let ty = check_type(&args, 1)?;
    let value = match ty.kind() {
        Kind::Slice => {
            let len: i64 = opt(&args, 2, 0)?;
            let cap: i64 = opt(&args, 3, len)?;
            arg_check(len >= 0, 2, "negative length")?;
            arg_check(len <= MAX_CONSTRUCT_CAPACITY, 2, "length too large")?;
            arg_check(cap >= len, 3, "capacity smaller than length")?;
            arg_check(cap <= MAX_CONSTRUCT_CAPACITY, 3, "capacity too large")?;
            HostValue::make_slice(ty, len as usize, cap as usize).map_err(BridgeError::from)?
        }
        Kind::Map => HostValue::make_map(ty).map_err(BridgeError::from)?,
        Kind::Chan => {
            let buffer: i64 = opt(&args, 2, 0)?;
            arg_check(buffer >= 0, 2, "negative buffer size")?;
            arg_check(buffer <= MAX_CONSTRUCT_CAPACITY, 2, "buffer size too large")?;
            HostValue::make_chan(ty, buffer as usize).map_err(BridgeError::from)?
        }
        _ => HostValue::alloc(ty),
    };
    tracing::trace!(ty = %ty, "constructed value");
    Ok(vec![to_script(state, value)?])
}

/// Host type boxed in the type proxy at `position`
fn check_type(args: &[ScriptValue], position: usize) -> BridgeResult<&HostType> {
    let value = arg(args, position);
    value
        .as_userdata()
        .and_then(|ud| ud.downcast_ref::<HostType>())
        .ok_or_else(|| BridgeError::ArgumentKind {
            position,
            expected: "type".to_string(),
            got: value.type_name().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rivet_sdk::{ScriptError, UserData};

    fn ctor(ty: &HostType) -> ScriptValue {
        ScriptValue::UserData(Arc::new(UserData::new(
            ty.clone(),
            Some(Arc::new(metatable(ty))),
        )))
    }

    fn payload(v: &ScriptValue) -> HostValue {
        v.as_userdata()
            .and_then(|ud| ud.downcast_ref::<HostValue>())
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_slice_lengths() {
        let state = State::new();
        let ints = ctor(&HostType::slice_of(&HostType::int()));

        let one = payload(&state.call(&ints, vec![ScriptValue::from(1i64)]).unwrap()[0]);
        assert_eq!(one.len().unwrap(), 1);
        assert_eq!(one.cap().unwrap(), 1);

        let args = vec![ScriptValue::from(0i64), ScriptValue::from(10i64)];
        let reserved = payload(&state.call(&ints, args).unwrap()[0]);
        assert_eq!(reserved.len().unwrap(), 0);
        assert_eq!(reserved.cap().unwrap(), 10);

        let empty = payload(&state.call(&ints, vec![]).unwrap()[0]);
        assert_eq!(empty.len().unwrap(), 0);
        assert!(!empty.is_nil());
    }

    #[test]
    fn test_invalid_sizes_are_argument_errors() {
        let state = State::new();
        let ints = ctor(&HostType::slice_of(&HostType::int()));
        let err = state.call(&ints, vec![ScriptValue::from(-1i64)]).unwrap_err();
        assert!(matches!(err, ScriptError::Argument { position: 2, .. }));

        let args = vec![ScriptValue::from(5i64), ScriptValue::from(2i64)];
        let err = state.call(&ints, args).unwrap_err();
        assert!(matches!(err, ScriptError::Argument { position: 3, .. }));

        let chans = ctor(&HostType::chan_of(&HostType::int()));
        let err = state.call(&chans, vec![ScriptValue::from("x")]).unwrap_err();
        assert!(matches!(err, ScriptError::Argument { position: 2, .. }));
    }

    #[test]
    fn test_oversized_capacity_is_argument_error() {
        let state = State::new();
        let ints = ctor(&HostType::slice_of(&HostType::int()));
        let args = vec![ScriptValue::from(0i64), ScriptValue::from(1e12)];
        let err = state.call(&ints, args).unwrap_err();
        assert!(matches!(err, ScriptError::Argument { position: 3, .. }));
        let err = state.call(&ints, vec![ScriptValue::from(1e12)]).unwrap_err();
        assert!(matches!(err, ScriptError::Argument { position: 2, .. }));

        let chans = ctor(&HostType::chan_of(&HostType::int()));
        let err = state.call(&chans, vec![ScriptValue::from(1e12)]).unwrap_err();
        assert!(matches!(err, ScriptError::Argument { position: 2, .. }));
    }

    #[test]
    fn test_maps_channels_and_pointers() {
        let state = State::new();
        let map_ty = HostType::map_of(&HostType::string(), &HostType::int());
        let map = payload(&state.call(&ctor(&map_ty), vec![]).unwrap()[0]);
        assert_eq!(map.len().unwrap(), 0);
        assert!(!map.is_nil());

        let chan_ty = HostType::chan_of(&HostType::int());
        let chan = payload(&state.call(&ctor(&chan_ty), vec![ScriptValue::from(3i64)]).unwrap()[0]);
        assert_eq!(chan.cap().unwrap(), 3);

        let ptr = payload(&state.call(&ctor(&HostType::int()), vec![]).unwrap()[0]);
        assert_eq!(ptr.ty(), &HostType::pointer_to(&HostType::int()));
        assert_eq!(ptr.elem().unwrap().as_int(), Some(0));
    }

    #[test]
    fn test_type_equality_and_name() {
        let state = State::new();
        let ty = HostType::slice_of(&HostType::string());
        let mt = Arc::new(metatable(&ty));
        let a = ScriptValue::UserData(Arc::new(UserData::new(ty.clone(), Some(mt.clone()))));
        let b = ScriptValue::UserData(Arc::new(UserData::new(ty.clone(), Some(mt))));
        assert!(state.equals(&a, &b).unwrap());
        assert_eq!(state.tostring(&a).unwrap(), "[]string");
        assert_eq!(
            state.get_metatable(&a).as_str(),
            Some(PROTECTION_MARKER)
        );
    }
}
